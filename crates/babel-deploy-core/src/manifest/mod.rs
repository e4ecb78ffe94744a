//! Deployment manifest: the durable record of a run.
//!
//! Written even when a run halts, so operators can see exactly which
//! contracts exist on chain and where the run stopped.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::deploy::{DeployedResource, RunReport, RunStatus, WiringOutcome};
use crate::plan::protocol::TROVE_MANAGERS;
use crate::types::Address;

pub const MANIFEST_VERSION: u32 = 1;

/// Directory manifests are written to unless a path is given.
pub const DEFAULT_MANIFEST_DIR: &str = "deployments";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentManifest {
    /// Manifest format version
    pub version: u32,

    pub generated_at: chrono::DateTime<chrono::Utc>,

    pub chain_id: u64,

    pub deployer: Address,

    /// Fingerprint of the executed plan
    pub plan: String,

    #[serde(flatten)]
    pub status: RunStatus,

    #[serde(default)]
    pub contracts: Vec<DeployedResource>,

    #[serde(default)]
    pub wiring: Vec<WiringOutcome>,

    /// Trove manager spawned by the factory during wiring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trove_manager: Option<Address>,
}

impl DeploymentManifest {
    pub fn from_report(
        report: &RunReport,
        chain_id: u64,
        deployer: Address,
        plan_fingerprint: impl Into<String>,
    ) -> Self {
        let trove_manager = report
            .wiring
            .iter()
            .find(|outcome| outcome.method == TROVE_MANAGERS)
            .and_then(|outcome| outcome.output);

        Self {
            version: MANIFEST_VERSION,
            generated_at: chrono::Utc::now(),
            chain_id,
            deployer,
            plan: plan_fingerprint.into(),
            status: report.status.clone(),
            contracts: report.deployed.clone(),
            wiring: report.wiring.clone(),
            trove_manager,
        }
    }

    /// `deployments/<chain_id>.json`
    pub fn default_path(chain_id: u64) -> PathBuf {
        Path::new(DEFAULT_MANIFEST_DIR).join(format!("{chain_id}.json"))
    }

    pub fn address_of(&self, name: &str) -> Option<Address> {
        self.contracts
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.address)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        let manifest: DeploymentManifest = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;
        if manifest.version != MANIFEST_VERSION {
            anyhow::bail!(
                "Unsupported manifest version {} in {}",
                manifest.version,
                path.display()
            );
        }
        Ok(manifest)
    }

    /// Save atomically (tmp + rename), creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create manifest directory: {}", parent.display())
            })?;
        }

        let bytes = serde_json::to_vec_pretty(self).context("Failed to serialize manifest")?;
        let tmp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
        fs::write(&tmp_path, bytes)
            .with_context(|| format!("Failed to write tmp manifest: {}", tmp_path.display()))?;

        if path.exists() {
            fs::remove_file(path).with_context(|| {
                format!("Failed to remove existing manifest: {}", path.display())
            })?;
        }
        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to rename tmp manifest: {}", tmp_path.display()))?;

        tracing::debug!(path = %path.display(), "manifest written");
        Ok(())
    }
}
