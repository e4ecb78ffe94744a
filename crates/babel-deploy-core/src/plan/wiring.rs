//! Post-deployment wiring steps.

use serde::{Deserialize, Serialize};

use crate::types::Address;

use super::{Arg, SlotId};

/// Index of a wiring step in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StepId(pub(crate) usize);

impl StepId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Submitted as a transaction; advances the principal's sequence counter.
    Call,
    /// Executed read-only; its first return word is decoded as an address.
    Read,
}

/// The contract a wiring step talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Slot(SlotId),
    Output(StepId),
    Address(Address),
}

impl Target {
    pub(crate) fn as_arg(&self) -> Arg {
        match self {
            Target::Slot(slot) => Arg::Slot(*slot),
            Target::Output(step) => Arg::Output(*step),
            Target::Address(address) => Arg::address(*address),
        }
    }
}

impl From<SlotId> for Target {
    fn from(slot: SlotId) -> Self {
        Target::Slot(slot)
    }
}

impl From<StepId> for Target {
    fn from(step: StepId) -> Self {
        Target::Output(step)
    }
}

impl From<Address> for Target {
    fn from(address: Address) -> Self {
        Target::Address(address)
    }
}

/// A data-described call completing a relationship constructors could not.
#[derive(Debug, Clone)]
pub struct WiringStep {
    pub(crate) label: String,
    pub(crate) target: Target,
    pub(crate) method: String,
    pub(crate) args: Vec<Arg>,
    pub(crate) kind: StepKind,
}

impl WiringStep {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// Canonical method signature, e.g. `registerReceiver(address,uint256)`.
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }
}
