//! Deploy context: configuration, artifacts and principal, loaded once.
//!
//! Every command starts from a [`DeployContext`]. It resolves `deploy.toml`,
//! applies command-line overrides, validates the result and loads the
//! compiled artifacts the plan needs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use url::Url;

use crate::artifacts::ArtifactStore;
use crate::config::{DeployConfig, parse_deploy_toml};
use crate::ledger::{RpcLedger, RpcOptions};
use crate::plan::DeploymentPlan;
use crate::plan::protocol::babel_protocol;
use crate::types::Address;

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ContextOverrides {
    pub rpc_url: Option<Url>,
    pub deployer: Option<Address>,
    pub artifacts_dir: Option<PathBuf>,
    pub chain_id: Option<u64>,
}

#[derive(Debug)]
pub struct DeployContext {
    config: DeployConfig,
    artifacts: ArtifactStore,
    deployer: Address,
}

impl DeployContext {
    /// Load `config_path` (defaults apply when it does not exist), apply
    /// overrides and load artifacts.
    ///
    /// A relative artifacts directory from the file is resolved against the
    /// file's directory.
    pub fn load(config_path: &Path, overrides: &ContextOverrides) -> anyhow::Result<Self> {
        let mut config = if config_path.exists() {
            let mut config = parse_deploy_toml(config_path)?;
            if config.artifacts.dir.is_relative()
                && let Some(parent) = config_path.parent()
            {
                config.artifacts.dir = parent.join(&config.artifacts.dir);
            }
            config
        } else {
            tracing::info!(
                path = %config_path.display(),
                "config file not found, using defaults"
            );
            DeployConfig::default()
        };
        apply_overrides(&mut config, overrides);
        config.validate()?;

        let artifacts = ArtifactStore::load_dir(&config.artifacts.dir).with_context(|| {
            format!(
                "Failed to load artifacts from {}",
                config.artifacts.dir.display()
            )
        })?;

        Self::from_parts(config, artifacts)
    }

    /// Build a context from already loaded parts.
    pub fn from_parts(config: DeployConfig, artifacts: ArtifactStore) -> anyhow::Result<Self> {
        let deployer = config.network.deployer.ok_or_else(|| {
            anyhow::anyhow!("No deployer configured: set network.deployer or pass --deployer")
        })?;
        Ok(Self {
            config,
            artifacts,
            deployer,
        })
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn deployer(&self) -> Address {
        self.deployer
    }

    /// Declare and validate the protocol plan.
    pub fn plan(&self) -> anyhow::Result<DeploymentPlan> {
        babel_protocol(&self.config, self.deployer)
            .build(&self.artifacts)
            .context("Invalid deployment plan")
    }

    pub fn rpc_options(&self) -> RpcOptions {
        let network = &self.config.network;
        RpcOptions {
            confirm_timeout: Duration::from_secs(network.confirm_timeout_secs),
            poll_interval: Duration::from_millis(network.poll_interval_ms),
            gas_limit: network.gas_limit,
        }
    }

    pub fn connect(&self) -> anyhow::Result<RpcLedger> {
        let url = self.config.network.rpc_url.clone();
        RpcLedger::connect(url.clone(), self.rpc_options())
            .with_context(|| format!("Failed to set up RPC client for {url}"))
    }
}

fn apply_overrides(config: &mut DeployConfig, overrides: &ContextOverrides) {
    if let Some(url) = &overrides.rpc_url {
        config.network.rpc_url = url.clone();
    }
    if let Some(deployer) = overrides.deployer {
        config.network.deployer = Some(deployer);
    }
    if let Some(dir) = &overrides.artifacts_dir {
        config.artifacts.dir = dir.clone();
    }
    if let Some(chain_id) = overrides.chain_id {
        config.network.chain_id = Some(chain_id);
    }
}
