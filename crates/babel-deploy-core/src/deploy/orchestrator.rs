//! Batch-by-batch execution of a deployment plan.

use serde::{Deserialize, Serialize};

use crate::identity::SequenceSnapshot;
use crate::ledger::LedgerClient;
use crate::plan::{BatchId, DeploymentPlan};
use crate::types::Address;

use super::driver::{DeployedResource, DeploymentDriver};
use super::resolve::{predict_batch, resolve_constructor};
use super::wiring::{WiringDriver, WiringOutcome};
use super::DeployError;

/// Where an orchestration stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Complete,
    /// Stopped at the first failure; nothing after `at` was attempted.
    Halted { at: String, error: String },
}

impl RunStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, RunStatus::Complete)
    }
}

/// Everything an orchestration produced, complete or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub chain_id: Option<u64>,
    pub status: RunStatus,
    pub deployed: Vec<DeployedResource>,
    pub wiring: Vec<WiringOutcome>,
}

impl RunReport {
    pub fn address_of(&self, name: &str) -> Option<Address> {
        self.deployed
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.address)
    }
}

/// Runs a plan against a ledger exactly once.
///
/// Each batch takes its own fresh sequence snapshot, so calls made between
/// batches never shift predictions. Wiring runs after every creation.
pub struct Orchestrator<'a> {
    ledger: &'a dyn LedgerClient,
    plan: DeploymentPlan,
    deployed: Vec<DeployedResource>,
    wiring: Vec<WiringOutcome>,
    status: RunStatus,
}

impl<'a> Orchestrator<'a> {
    pub fn new(ledger: &'a dyn LedgerClient, plan: DeploymentPlan) -> Self {
        Self {
            ledger,
            plan,
            deployed: Vec::new(),
            wiring: Vec::new(),
            status: RunStatus::Pending,
        }
    }

    pub fn plan(&self) -> &DeploymentPlan {
        &self.plan
    }

    pub fn deployed(&self) -> &[DeployedResource] {
        &self.deployed
    }

    pub fn wiring(&self) -> &[WiringOutcome] {
        &self.wiring
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// Execute every batch then every wiring step.
    ///
    /// On failure the error is returned and also kept in [`Self::status`];
    /// resources created so far stay recorded.
    pub fn run(&mut self) -> Result<(), DeployError> {
        if self.status != RunStatus::Pending {
            return Err(DeployError::AlreadyRun);
        }

        let result = self.execute();
        self.status = match &result {
            Ok(()) => RunStatus::Complete,
            Err(err) => {
                tracing::error!(at = %err.failure_point(), "deployment halted: {err}");
                RunStatus::Halted {
                    at: err.failure_point(),
                    error: err.to_string(),
                }
            }
        };
        result
    }

    fn execute(&mut self) -> Result<(), DeployError> {
        let principal = self.plan.principal();
        for batch in self.plan.batch_ids() {
            self.run_batch(batch)?;
        }

        let mut wiring = WiringDriver::new(self.ledger, principal);
        let result = wiring.wire(&self.plan);
        self.wiring = wiring.into_outcomes();
        result?;

        tracing::info!(
            contracts = self.deployed.len(),
            steps = self.wiring.len(),
            "deployment complete"
        );
        Ok(())
    }

    fn run_batch(&mut self, batch: BatchId) -> Result<(), DeployError> {
        let principal = self.plan.principal();
        let name = self.plan.batch(batch).name().to_string();

        let snapshot = SequenceSnapshot::take(self.ledger, principal).map_err(|source| {
            DeployError::Snapshot {
                batch: name.clone(),
                source,
            }
        })?;
        let window = predict_batch(&mut self.plan, batch, snapshot)?;
        tracing::info!(
            batch = %name,
            start = window.start(),
            count = window.len(),
            "deploying batch"
        );

        let driver = DeploymentDriver::new(self.ledger, principal);
        for slot in self.plan.batch(batch).slots().to_vec() {
            let resolved = resolve_constructor(&self.plan, slot)?;
            let resource = driver.deploy(&resolved)?;
            self.plan.descriptor_mut(slot).set_realized(resource.address)?;
            self.deployed.push(resource);
        }
        Ok(())
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            chain_id: self.ledger.chain_id().ok(),
            status: self.status.clone(),
            deployed: self.deployed.clone(),
            wiring: self.wiring.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactStore;
    use crate::identity::predict;
    use crate::ledger::MemoryLedger;
    use crate::plan::PlanBuilder;

    const PRINCIPAL: Address = Address([0x11; 20]);

    fn pair_plan() -> DeploymentPlan {
        let mut b = PlanBuilder::new(PRINCIPAL);
        let batch = b.batch("pair");
        let a = b.declare(batch, "a", "A");
        let bb = b.declare(batch, "b", "B");
        b.construct(a, vec![bb.into()]);
        b.construct(bb, vec![a.into()]);
        b.build(&ArtifactStore::new().with("A", vec![0xa]).with("B", vec![0xb]))
            .unwrap()
    }

    #[test]
    fn test_mutual_pair_realizes_predictions() {
        let ledger = MemoryLedger::new(31337);
        let mut orchestrator = Orchestrator::new(&ledger, pair_plan());
        orchestrator.run().unwrap();

        let report = orchestrator.report();
        assert!(report.status.is_complete());
        assert_eq!(report.address_of("a"), Some(predict(&PRINCIPAL, 0)));
        assert_eq!(report.address_of("b"), Some(predict(&PRINCIPAL, 1)));
        assert_eq!(report.chain_id, Some(31337));
    }

    #[test]
    fn test_second_run_is_refused() {
        let ledger = MemoryLedger::new(1);
        let mut orchestrator = Orchestrator::new(&ledger, pair_plan());
        orchestrator.run().unwrap();
        assert!(matches!(orchestrator.run(), Err(DeployError::AlreadyRun)));
        assert!(orchestrator.status().is_complete());
    }

    #[test]
    fn test_halt_is_recorded_in_status() {
        let ledger = MemoryLedger::new(1).fail_nth_create(1);
        let mut orchestrator = Orchestrator::new(&ledger, pair_plan());
        let err = orchestrator.run().unwrap_err();

        assert!(matches!(err, DeployError::Creation { position: 1, .. }));
        assert_eq!(orchestrator.deployed().len(), 1);
        match orchestrator.status() {
            RunStatus::Halted { at, .. } => assert!(at.contains("'b'")),
            other => panic!("unexpected status {other:?}"),
        }
    }
}
