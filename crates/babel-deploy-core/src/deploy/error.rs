//! Run-time failures of an orchestration.

use crate::abi::AbiError;
use crate::ledger::LedgerError;
use crate::plan::AlreadyAssigned;
use crate::types::Address;

/// Every variant is fatal: nothing is retried and the run halts where it
/// failed, leaving already created resources in place.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("could not read the sequence number for batch '{batch}': {source}")]
    Snapshot {
        batch: String,
        #[source]
        source: LedgerError,
    },

    #[error("snapshot was taken for {snapshot}, but the plan deploys from {plan}")]
    PrincipalMismatch { snapshot: Address, plan: Address },

    #[error(
        "prediction mismatch for '{name}': predicted {predicted}, ledger created {realized}"
    )]
    PredictionMismatch {
        name: String,
        predicted: Address,
        realized: Address,
    },

    #[error("creating '{name}' (batch '{batch}', position {position}) failed: {source}")]
    Creation {
        batch: String,
        position: usize,
        name: String,
        #[source]
        source: LedgerError,
    },

    #[error("wiring step {index} '{label}' failed: {source}")]
    Wiring {
        index: usize,
        label: String,
        #[source]
        source: LedgerError,
    },

    #[error("wiring step {index} '{label}' returned unusable data: {source}")]
    Decode {
        index: usize,
        label: String,
        #[source]
        source: AbiError,
    },

    #[error("'{dependent}' needs '{dependency}', which has no usable identity yet")]
    DependencyNotReady {
        dependent: String,
        dependency: String,
    },

    #[error("the plan has no wiring step {index}")]
    UnknownStep { index: usize },

    #[error("wiring step {index} '{label}' is a call, not a read")]
    NotARead { index: usize, label: String },

    #[error(transparent)]
    AlreadyAssigned(#[from] AlreadyAssigned),

    #[error("this orchestration has already run")]
    AlreadyRun,
}

impl DeployError {
    /// Short description of where the run stopped.
    pub fn failure_point(&self) -> String {
        match self {
            DeployError::Snapshot { batch, .. } => format!("snapshot of batch '{batch}'"),
            DeployError::PredictionMismatch { name, .. } => format!("creation of '{name}'"),
            DeployError::Creation {
                batch,
                position,
                name,
                ..
            } => format!("creation of '{name}' ({batch}[{position}])"),
            DeployError::Wiring { index, label, .. }
            | DeployError::Decode { index, label, .. }
            | DeployError::NotARead { index, label } => format!("wiring step {index} '{label}'"),
            DeployError::UnknownStep { index } => format!("wiring step {index}"),
            DeployError::DependencyNotReady { dependent, .. } => {
                format!("resolution of '{dependent}'")
            }
            DeployError::PrincipalMismatch { .. } => "sequence snapshot".to_string(),
            DeployError::AlreadyAssigned(err) => format!("identity assignment of '{}'", err.name),
            DeployError::AlreadyRun => "start".to_string(),
        }
    }
}
