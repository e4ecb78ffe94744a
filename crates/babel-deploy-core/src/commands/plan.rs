//! Dry run: execute the plan against a simulated ledger.
//!
//! The simulation starts from the deployer's live nonce (or one given
//! explicitly), so the created contracts land where a real deploy from the
//! same state would put them. The factory's spawned trove manager is the
//! exception: the simulated factory creates one child at contract nonce 1,
//! which the real factory need not do.

use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;
use crate::ledger::{LedgerClient, MemoryLedger};
use crate::plan::protocol::factory_spawner;

use super::context::{ContextOverrides, DeployContext};
use super::deploy::{DeployCommand, DeployReport};

/// Chain id simulated when running offline without one configured.
pub const OFFLINE_CHAIN_ID: u64 = 31337;

/// Attached to every dry-run report.
pub const SIMULATED_SPAWN_NOTE: &str = "wiring outputs come from a simulated factory; \
     the spawned trove manager address is not a prediction of the real one";

/// Options for the plan command
#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub config_path: PathBuf,
    pub overrides: ContextOverrides,
    /// Start from this nonce without contacting the node
    pub nonce: Option<u64>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            overrides: ContextOverrides::default(),
            nonce: None,
        }
    }
}

impl PlanOptions {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            ..Self::default()
        }
    }

    pub fn with_overrides(mut self, overrides: ContextOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Run offline from `nonce`.
    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }
}

pub struct PlanCommand;

impl PlanCommand {
    pub fn execute(options: &PlanOptions) -> anyhow::Result<DeployReport> {
        let context = DeployContext::load(&options.config_path, &options.overrides)?;
        let (chain_id, nonce) = match options.nonce {
            Some(nonce) => (
                context.config().network.chain_id.unwrap_or(OFFLINE_CHAIN_ID),
                nonce,
            ),
            None => {
                let ledger = context.connect()?;
                (
                    ledger.chain_id()?,
                    ledger.sequence_number(&context.deployer())?,
                )
            }
        };
        Self::simulate(&context, chain_id, nonce)
    }

    /// Run the context's plan on a fresh simulated ledger.
    pub fn simulate(
        context: &DeployContext,
        chain_id: u64,
        nonce: u64,
    ) -> anyhow::Result<DeployReport> {
        tracing::info!(chain_id, nonce, deployer = %context.deployer(), "simulating deployment");
        let ledger = MemoryLedger::new(chain_id)
            .with_nonce(context.deployer(), nonce)
            .with_spawner(factory_spawner());
        let mut report = DeployCommand::with_ledger(context, ledger)?.execute()?;
        report.notes.push(SIMULATED_SPAWN_NOTE.to_string());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactStore;
    use crate::config::DeployConfig;
    use crate::identity::predict;
    use crate::types::Address;

    #[test]
    fn test_simulation_starts_at_given_nonce() {
        let deployer = Address([0xab; 20]);
        let mut config = DeployConfig::default();
        config.network.deployer = Some(deployer);
        config.collateral.token = Some(Address([1; 20]));
        config.oracle.aggregator = Some(Address([2; 20]));
        let artifacts = [
            "BabelCore",
            "PriceFeed",
            "FeeReceiver",
            "InterimAdmin",
            "GasPool",
        ]
        .iter()
        .chain(crate::plan::protocol::PROTOCOL_BATCH.iter())
        .fold(ArtifactStore::new(), |store, name| store.with(*name, vec![0xfe]));
        let context = DeployContext::from_parts(config, artifacts).unwrap();

        let report = PlanCommand::simulate(&context, 97, 12).unwrap();
        assert!(report.is_complete());
        assert!(report.manifest_path.is_none());
        assert_eq!(report.summary.start_nonce, 12);
        assert_eq!(report.run.address_of("BabelCore"), Some(predict(&deployer, 12)));
        assert_eq!(report.notes, vec![SIMULATED_SPAWN_NOTE.to_string()]);
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["notes"][0].as_str().unwrap().contains("simulated factory"));
    }
}
