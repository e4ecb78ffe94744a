//! Deployment plans: resource slots, batches and wiring steps.
//!
//! A plan is an arena of [`Descriptor`] slots grouped into batches. Slots are
//! declared first and given constructor arguments afterwards, so resources in
//! the same batch can reference each other regardless of declaration order.
//! Every reference is checked by [`PlanBuilder::build`] before anything is
//! submitted to the ledger.

pub mod protocol;
pub mod wiring;

use std::collections::HashSet;

use serde::Serialize;

use crate::abi::{self, AbiError, Token};
use crate::artifacts::ArtifactStore;
use crate::types::{Address, Selector};

pub use wiring::{StepId, StepKind, Target, WiringStep};

/// Arena index of a resource slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SlotId(usize);

impl SlotId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Index of a batch in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BatchId(usize);

impl BatchId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// An unresolved argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Arg {
    /// A value known at plan time.
    Literal(Token),
    /// The identity of another resource.
    Slot(SlotId),
    /// The submitting principal.
    Principal,
    /// The address returned by an earlier read step (wiring only).
    Output(StepId),
    Tuple(Vec<Arg>),
}

impl Arg {
    pub fn address(address: Address) -> Self {
        Arg::Literal(Token::Address(address))
    }

    /// An optional integration point; absent values encode as the zero address.
    pub fn optional_address(address: Option<Address>) -> Self {
        Arg::address(address.unwrap_or(Address::ZERO))
    }

    pub fn uint(value: u128) -> Self {
        Arg::Literal(Token::Uint(value))
    }

    pub fn bool(flag: bool) -> Self {
        Arg::Literal(Token::Bool(flag))
    }

    pub fn bytes4(selector: Selector) -> Self {
        Arg::Literal(Token::Bytes4(selector))
    }

    pub fn string(text: impl Into<String>) -> Self {
        Arg::Literal(Token::String(text.into()))
    }

    fn visit_refs(&self, visit: &mut impl FnMut(&Arg)) {
        match self {
            Arg::Tuple(items) => items.iter().for_each(|item| item.visit_refs(visit)),
            Arg::Slot(_) | Arg::Output(_) => visit(self),
            Arg::Literal(_) | Arg::Principal => {}
        }
    }
}

impl From<SlotId> for Arg {
    fn from(slot: SlotId) -> Self {
        Arg::Slot(slot)
    }
}

impl From<StepId> for Arg {
    fn from(step: StepId) -> Self {
        Arg::Output(step)
    }
}

/// Identity predicted for a slot before its creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Prediction {
    pub nonce: u64,
    pub address: Address,
}

#[derive(Debug, thiserror::Error)]
#[error("{phase} identity of '{name}' assigned twice")]
pub struct AlreadyAssigned {
    pub name: String,
    pub phase: &'static str,
}

/// A resource to create.
///
/// Predicted identity is set once, realized identity is set once after it,
/// and neither changes afterwards.
#[derive(Debug, Clone)]
pub struct Descriptor {
    name: String,
    contract: String,
    batch: BatchId,
    args: Vec<Arg>,
    bytecode: Vec<u8>,
    predicted: Option<Prediction>,
    realized: Option<Address>,
}

impl Descriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contract(&self) -> &str {
        &self.contract
    }

    pub fn batch(&self) -> BatchId {
        self.batch
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    pub fn predicted(&self) -> Option<Prediction> {
        self.predicted
    }

    pub fn realized(&self) -> Option<Address> {
        self.realized
    }

    pub(crate) fn set_predicted(&mut self, prediction: Prediction) -> Result<(), AlreadyAssigned> {
        if self.predicted.is_some() {
            return Err(AlreadyAssigned {
                name: self.name.clone(),
                phase: "predicted",
            });
        }
        self.predicted = Some(prediction);
        Ok(())
    }

    pub(crate) fn set_realized(&mut self, address: Address) -> Result<(), AlreadyAssigned> {
        if self.realized.is_some() || self.predicted.is_none() {
            return Err(AlreadyAssigned {
                name: self.name.clone(),
                phase: "realized",
            });
        }
        self.realized = Some(address);
        Ok(())
    }
}

/// Resources predicted from one sequence snapshot.
#[derive(Debug, Clone)]
pub struct Batch {
    name: String,
    slots: Vec<SlotId>,
}

impl Batch {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slots in prediction and submission order.
    pub fn slots(&self) -> &[SlotId] {
        &self.slots
    }
}

/// Errors detected while building a plan, before anything is submitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("resource name '{0}' is declared twice")]
    DuplicateName(String),
    #[error("batch '{0}' declares no resources")]
    EmptyBatch(String),
    #[error("resource '{0}' was declared but never given constructor arguments")]
    Unconstructed(String),
    #[error("resource '{name}' needs artifact '{contract}', which was not found")]
    MissingArtifact { name: String, contract: String },
    #[error("resource '{name}' was declared in batch #{batch}, which does not exist")]
    UnknownBatch { name: String, batch: usize },
    #[error("'{from}' references slot #{slot}, which does not exist")]
    UnknownSlot { from: String, slot: usize },
    #[error("'{from}' (batch '{from_batch}') references '{to}' from later batch '{to_batch}'")]
    ForwardBatchReference {
        from: String,
        from_batch: String,
        to: String,
        to_batch: String,
    },
    #[error("'{from}' references wiring step #{step}, which is not an earlier read")]
    InvalidOutputReference { from: String, step: usize },
    #[error("wiring step '{label}': {method} takes {expected} arguments, got {actual}")]
    ArityMismatch {
        label: String,
        method: String,
        expected: usize,
        actual: usize,
    },
    #[error("wiring step '{label}': {source}")]
    Signature { label: String, source: AbiError },
}

/// Declares slots, batches and wiring steps of a plan.
#[derive(Debug)]
pub struct PlanBuilder {
    principal: Address,
    descriptors: Vec<(Descriptor, bool)>,
    batches: Vec<Batch>,
    steps: Vec<WiringStep>,
    stray_constructs: Vec<SlotId>,
}

impl PlanBuilder {
    pub fn new(principal: Address) -> Self {
        Self {
            principal,
            descriptors: Vec::new(),
            batches: Vec::new(),
            steps: Vec::new(),
            stray_constructs: Vec::new(),
        }
    }

    /// Open a new batch; batches execute in the order they are opened.
    pub fn batch(&mut self, name: impl Into<String>) -> BatchId {
        self.batches.push(Batch {
            name: name.into(),
            slots: Vec::new(),
        });
        BatchId(self.batches.len() - 1)
    }

    /// Reserve a slot in `batch`. Its position in the batch is its
    /// declaration order.
    pub fn declare(
        &mut self,
        batch: BatchId,
        name: impl Into<String>,
        contract: impl Into<String>,
    ) -> SlotId {
        let id = SlotId(self.descriptors.len());
        self.descriptors.push((
            Descriptor {
                name: name.into(),
                contract: contract.into(),
                batch,
                args: Vec::new(),
                bytecode: Vec::new(),
                predicted: None,
                realized: None,
            },
            false,
        ));
        if let Some(b) = self.batches.get_mut(batch.0) {
            b.slots.push(id);
        }
        id
    }

    /// Set the constructor arguments of a declared slot.
    ///
    /// A slot this builder never declared is reported by `build`.
    pub fn construct(&mut self, slot: SlotId, args: Vec<Arg>) {
        match self.descriptors.get_mut(slot.0) {
            Some((descriptor, constructed)) => {
                descriptor.args = args;
                *constructed = true;
            }
            None => self.stray_constructs.push(slot),
        }
    }

    /// Declare and construct in one go, for resources nobody references ahead.
    pub fn define(
        &mut self,
        batch: BatchId,
        name: impl Into<String>,
        contract: impl Into<String>,
        args: Vec<Arg>,
    ) -> SlotId {
        let slot = self.declare(batch, name, contract);
        self.construct(slot, args);
        slot
    }

    /// Append a state-changing wiring call.
    pub fn call(
        &mut self,
        label: impl Into<String>,
        target: impl Into<Target>,
        method: impl Into<String>,
        args: Vec<Arg>,
    ) -> StepId {
        self.push_step(StepKind::Call, label.into(), target.into(), method.into(), args)
    }

    /// Append a read-only wiring step whose address output later steps can use.
    pub fn read(
        &mut self,
        label: impl Into<String>,
        target: impl Into<Target>,
        method: impl Into<String>,
        args: Vec<Arg>,
    ) -> StepId {
        self.push_step(StepKind::Read, label.into(), target.into(), method.into(), args)
    }

    fn push_step(
        &mut self,
        kind: StepKind,
        label: String,
        target: Target,
        method: String,
        args: Vec<Arg>,
    ) -> StepId {
        self.steps.push(WiringStep {
            label,
            target,
            method,
            args,
            kind,
        });
        StepId(self.steps.len() - 1)
    }

    /// Validate every reference and attach bytecode.
    pub fn build(self, artifacts: &ArtifactStore) -> Result<DeploymentPlan, PlanError> {
        if let Some(slot) = self.stray_constructs.first() {
            return Err(PlanError::UnknownSlot {
                from: "constructor".to_string(),
                slot: slot.0,
            });
        }
        let mut seen = HashSet::new();
        for (descriptor, constructed) in &self.descriptors {
            if descriptor.batch.0 >= self.batches.len() {
                return Err(PlanError::UnknownBatch {
                    name: descriptor.name.clone(),
                    batch: descriptor.batch.0,
                });
            }
            if !seen.insert(descriptor.name.as_str()) {
                return Err(PlanError::DuplicateName(descriptor.name.clone()));
            }
            if !constructed {
                return Err(PlanError::Unconstructed(descriptor.name.clone()));
            }
        }
        if let Some(empty) = self.batches.iter().find(|b| b.slots.is_empty()) {
            return Err(PlanError::EmptyBatch(empty.name.clone()));
        }

        for (descriptor, _) in &self.descriptors {
            self.check_constructor_refs(descriptor)?;
        }
        for (index, step) in self.steps.iter().enumerate() {
            self.check_step(index, step)?;
        }

        let mut descriptors = Vec::with_capacity(self.descriptors.len());
        for (mut descriptor, _) in self.descriptors {
            let code = artifacts.bytecode(&descriptor.contract).ok_or_else(|| {
                PlanError::MissingArtifact {
                    name: descriptor.name.clone(),
                    contract: descriptor.contract.clone(),
                }
            })?;
            descriptor.bytecode = code.to_vec();
            descriptors.push(descriptor);
        }

        Ok(DeploymentPlan {
            principal: self.principal,
            descriptors,
            batches: self.batches,
            steps: self.steps,
        })
    }

    fn check_constructor_refs(&self, descriptor: &Descriptor) -> Result<(), PlanError> {
        let mut result = Ok(());
        for arg in &descriptor.args {
            arg.visit_refs(&mut |reference| {
                if result.is_err() {
                    return;
                }
                result = match reference {
                    Arg::Slot(slot) => self.check_slot_order(descriptor, *slot),
                    Arg::Output(step) => Err(PlanError::InvalidOutputReference {
                        from: descriptor.name.clone(),
                        step: step.index(),
                    }),
                    _ => Ok(()),
                };
            });
        }
        result
    }

    fn check_slot_order(&self, from: &Descriptor, slot: SlotId) -> Result<(), PlanError> {
        let (to, _) = self
            .descriptors
            .get(slot.0)
            .ok_or_else(|| PlanError::UnknownSlot {
                from: from.name.clone(),
                slot: slot.0,
            })?;
        if to.batch > from.batch {
            return Err(PlanError::ForwardBatchReference {
                from: from.name.clone(),
                from_batch: self.batch_name(from.batch),
                to: to.name.clone(),
                to_batch: self.batch_name(to.batch),
            });
        }
        Ok(())
    }

    fn check_step(&self, index: usize, step: &WiringStep) -> Result<(), PlanError> {
        let expected = abi::param_count(&step.method).map_err(|source| PlanError::Signature {
            label: step.label.clone(),
            source,
        })?;
        if expected != step.args.len() {
            return Err(PlanError::ArityMismatch {
                label: step.label.clone(),
                method: step.method.clone(),
                expected,
                actual: step.args.len(),
            });
        }

        let mut refs: Vec<Arg> = vec![step.target.as_arg()];
        for arg in &step.args {
            arg.visit_refs(&mut |r| refs.push(r.clone()));
        }
        for reference in refs {
            match reference {
                Arg::Slot(slot) if slot.0 >= self.descriptors.len() => {
                    return Err(PlanError::UnknownSlot {
                        from: step.label.clone(),
                        slot: slot.0,
                    });
                }
                Arg::Output(out) => {
                    let is_earlier_read = out.index() < index
                        && self
                            .steps
                            .get(out.index())
                            .is_some_and(|s| s.kind == StepKind::Read);
                    if !is_earlier_read {
                        return Err(PlanError::InvalidOutputReference {
                            from: step.label.clone(),
                            step: out.index(),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn batch_name(&self, batch: BatchId) -> String {
        self.batches
            .get(batch.0)
            .map(|b| b.name.clone())
            .unwrap_or_else(|| format!("#{}", batch.0))
    }
}

/// A validated plan, ready to execute.
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    principal: Address,
    descriptors: Vec<Descriptor>,
    batches: Vec<Batch>,
    steps: Vec<WiringStep>,
}

impl DeploymentPlan {
    pub fn principal(&self) -> Address {
        self.principal
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Batch ids in execution order.
    pub fn batch_ids(&self) -> Vec<BatchId> {
        (0..self.batches.len()).map(BatchId).collect()
    }

    pub fn batch(&self, id: BatchId) -> &Batch {
        &self.batches[id.0]
    }

    pub fn steps(&self) -> &[WiringStep] {
        &self.steps
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, slot: SlotId) -> &Descriptor {
        &self.descriptors[slot.0]
    }

    pub(crate) fn descriptor_mut(&mut self, slot: SlotId) -> &mut Descriptor {
        &mut self.descriptors[slot.0]
    }

    pub fn slot_by_name(&self, name: &str) -> Option<SlotId> {
        self.descriptors
            .iter()
            .position(|d| d.name == name)
            .map(SlotId)
    }

    /// Stable fingerprint of what this plan would submit.
    ///
    /// Covers names, contracts, bytecode, argument structure and wiring
    /// methods. Predicted and realized identities are excluded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.principal.as_bytes());
        for batch in &self.batches {
            hasher.update(batch.name.as_bytes());
            hasher.update(&[0x00]);
            for slot in &batch.slots {
                let d = &self.descriptors[slot.0];
                hasher.update(d.name.as_bytes());
                hasher.update(&[0x00]);
                hasher.update(d.contract.as_bytes());
                hasher.update(&[0x00]);
                hasher.update(blake3::hash(&d.bytecode).as_bytes());
                hasher.update(&serde_json::to_vec(&d.args).unwrap_or_default());
            }
        }
        for step in &self.steps {
            hasher.update(step.label.as_bytes());
            hasher.update(&[0x00]);
            hasher.update(step.method.as_bytes());
            hasher.update(&serde_json::to_vec(&step.args).unwrap_or_default());
        }
        hasher.finalize().to_hex().to_string()
    }
}
