//! Babel Deploy Core Library
//!
//! Deterministic deployment of the Babel protocol: contract addresses are
//! predicted from the deployer's nonce before any transaction is sent, so
//! contracts that reference each other can be constructed in a single pass.

pub mod abi;
pub mod artifacts;
pub mod commands;
pub mod config;
pub mod deploy;
pub mod identity;
pub mod ledger;
pub mod manifest;
pub mod plan;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{DeployConfig, parse_deploy_toml};

    // Identity
    pub use crate::identity::{SequenceSnapshot, SequenceWindow, predict};

    // Plans
    pub use crate::plan::{
        Arg, BatchId, DeploymentPlan, PlanBuilder, PlanError, SlotId, StepId, StepKind, Target,
    };

    // Execution
    pub use crate::deploy::{DeployError, DeployedResource, Orchestrator, RunReport, RunStatus};

    // Ledger
    pub use crate::ledger::{LedgerClient, LedgerError, MemoryLedger, Receipt, RpcLedger};

    // Artifacts and manifest
    pub use crate::artifacts::ArtifactStore;
    pub use crate::manifest::DeploymentManifest;

    // Primitive types
    pub use crate::abi::Token;
    pub use crate::types::{Address, Amount, Selector, TxHash};
}
