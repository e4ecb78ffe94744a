//! Deployment execution: prediction, creation and wiring.
//!
//! An [`Orchestrator`] walks the batches of a [`crate::plan::DeploymentPlan`]
//! in order. For each batch it takes a fresh sequence snapshot, predicts
//! every slot, resolves constructor arguments and submits one creation at a
//! time through the [`DeploymentDriver`]. Wiring steps run afterwards through
//! the [`WiringDriver`]. The first failure halts the run.

pub mod driver;
pub mod error;
pub mod orchestrator;
pub mod resolve;
pub mod wiring;

pub use driver::{DeployedResource, DeploymentDriver};
pub use error::DeployError;
pub use orchestrator::{Orchestrator, RunReport, RunStatus};
pub use resolve::{ResolvedDescriptor, predict_batch, resolve_constructor, resolve_step};
pub use wiring::{WiringDriver, WiringOutcome};
