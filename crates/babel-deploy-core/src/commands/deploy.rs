//! Deploy command implementation.
//!
//! Connects to the configured ledger, checks the chain, builds the protocol
//! plan and runs it. The manifest is written whether the run completes or
//! halts.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use crate::config::DEFAULT_CONFIG_FILE;
use crate::deploy::{Orchestrator, RunReport};
use crate::ledger::{LedgerClient, RpcLedger};
use crate::manifest::DeploymentManifest;
use crate::plan::DeploymentPlan;
use crate::types::Address;

use super::context::{ContextOverrides, DeployContext};

/// Options for the deploy command
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Path to deploy.toml
    pub config_path: PathBuf,
    /// Command-line overrides
    pub overrides: ContextOverrides,
    /// Manifest destination (defaults to `deployments/<chain_id>.json`)
    pub manifest_path: Option<PathBuf>,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            overrides: ContextOverrides::default(),
            manifest_path: None,
        }
    }
}

impl DeployOptions {
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

    pub fn with_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = Some(path.into());
        self
    }
}

/// What is about to be deployed, shown before anything is submitted.
#[derive(Debug, Clone, Serialize)]
pub struct DeploySummary {
    pub chain_id: u64,
    pub deployer: Address,
    pub start_nonce: u64,
    pub contracts: usize,
    pub wiring_steps: usize,
    pub plan: String,
}

/// Result of a deploy or dry run.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub summary: DeploySummary,
    pub run: RunReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<PathBuf>,
    /// Caveats about how far the addresses above can be trusted.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl DeployReport {
    pub fn is_complete(&self) -> bool {
        self.run.status.is_complete()
    }
}

/// A plan bound to a ledger, ready to execute once.
pub struct DeployCommand<L: LedgerClient> {
    ledger: L,
    plan: DeploymentPlan,
    summary: DeploySummary,
    manifest_path: Option<PathBuf>,
}

impl DeployCommand<RpcLedger> {
    /// Load everything and connect to the configured node.
    pub fn connect(options: &DeployOptions) -> anyhow::Result<Self> {
        let context = DeployContext::load(&options.config_path, &options.overrides)?;
        let ledger = context.connect()?;
        let command = Self::with_ledger(&context, ledger)?;
        let manifest_path = options
            .manifest_path
            .clone()
            .unwrap_or_else(|| DeploymentManifest::default_path(command.summary.chain_id));
        Ok(command.with_manifest(manifest_path))
    }
}

impl<L: LedgerClient> DeployCommand<L> {
    /// Bind the context's plan to `ledger`, checking the chain id when the
    /// configuration pins one.
    pub fn with_ledger(context: &DeployContext, ledger: L) -> anyhow::Result<Self> {
        let chain_id = ledger.chain_id().context("Failed to query chain id")?;
        if let Some(expected) = context.config().network.chain_id
            && expected != chain_id
        {
            anyhow::bail!("Connected to chain {chain_id}, but the configuration expects {expected}");
        }

        let deployer = context.deployer();
        let start_nonce = ledger
            .sequence_number(&deployer)
            .with_context(|| format!("Failed to read the nonce of {deployer}"))?;
        let plan = context.plan()?;

        let summary = DeploySummary {
            chain_id,
            deployer,
            start_nonce,
            contracts: plan.descriptors().len(),
            wiring_steps: plan.steps().len(),
            plan: plan.fingerprint(),
        };
        Ok(Self {
            ledger,
            plan,
            summary,
            manifest_path: None,
        })
    }

    /// Write the manifest to `path` after the run.
    pub fn with_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = Some(path.into());
        self
    }

    pub fn summary(&self) -> &DeploySummary {
        &self.summary
    }

    pub fn plan(&self) -> &DeploymentPlan {
        &self.plan
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Run the plan. A halted run is reported, not returned as an error.
    pub fn execute(self) -> anyhow::Result<DeployReport> {
        let Self {
            ledger,
            plan,
            summary,
            manifest_path,
        } = self;

        let mut orchestrator = Orchestrator::new(&ledger, plan);
        if let Err(err) = orchestrator.run() {
            tracing::warn!("run halted at {}", err.failure_point());
        }
        let run = orchestrator.report();

        if let Some(path) = &manifest_path {
            write_manifest(path, &summary, &run)?;
        }

        Ok(DeployReport {
            summary,
            run,
            manifest_path,
            notes: Vec::new(),
        })
    }
}

fn write_manifest(path: &Path, summary: &DeploySummary, run: &RunReport) -> anyhow::Result<()> {
    let manifest =
        DeploymentManifest::from_report(run, summary.chain_id, summary.deployer, &summary.plan);
    manifest.save(path)?;
    tracing::info!(path = %path.display(), "manifest written");
    Ok(())
}
