//! High-level commands for babel-deploy operations.
//!
//! This module provides the public API the CLI calls: a real deploy, a
//! simulated dry run and offline address prediction.

pub mod context;
pub mod deploy;
pub mod plan;
pub mod predict;

pub use context::{ContextOverrides, DeployContext};
pub use deploy::{DeployCommand, DeployOptions, DeployReport, DeploySummary};
pub use plan::{OFFLINE_CHAIN_ID, PlanCommand, PlanOptions, SIMULATED_SPAWN_NOTE};
pub use predict::predict_range;
