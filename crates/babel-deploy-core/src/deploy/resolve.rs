//! Batch prediction and argument resolution.

use std::collections::HashMap;

use crate::abi::{self, Token};
use crate::identity::{SequenceSnapshot, SequenceWindow};
use crate::plan::{Arg, BatchId, DeploymentPlan, Prediction, SlotId, StepId, Target};
use crate::types::Address;

use super::DeployError;

/// A descriptor with every argument substituted, ready to submit.
#[derive(Debug, Clone)]
pub struct ResolvedDescriptor {
    pub slot: SlotId,
    pub name: String,
    pub batch: String,
    pub position: usize,
    pub prediction: Prediction,
    pub args: Vec<Token>,
    /// Bytecode followed by the encoded constructor arguments.
    pub init_code: Vec<u8>,
}

/// Consume `snapshot` to predict every slot of `batch`, in declared order.
pub fn predict_batch(
    plan: &mut DeploymentPlan,
    batch: BatchId,
    snapshot: SequenceSnapshot,
) -> Result<SequenceWindow, DeployError> {
    if snapshot.principal() != plan.principal() {
        return Err(DeployError::PrincipalMismatch {
            snapshot: snapshot.principal(),
            plan: plan.principal(),
        });
    }

    let slots = plan.batch(batch).slots().to_vec();
    let window = snapshot.open(slots.len());
    for (slot, (nonce, address)) in slots.into_iter().zip(window.predictions()) {
        let descriptor = plan.descriptor_mut(slot);
        descriptor.set_predicted(Prediction { nonce, address })?;
        tracing::debug!(name = descriptor.name(), nonce, address = %address, "predicted");
    }
    Ok(window)
}

/// Substitute the constructor arguments of `slot`.
///
/// Same-batch references resolve to predictions, earlier ones to realized
/// identities.
pub fn resolve_constructor(
    plan: &DeploymentPlan,
    slot: SlotId,
) -> Result<ResolvedDescriptor, DeployError> {
    let descriptor = plan.descriptor(slot);
    let prediction = descriptor
        .predicted()
        .ok_or_else(|| DeployError::DependencyNotReady {
            dependent: descriptor.name().to_string(),
            dependency: "its own prediction".to_string(),
        })?;

    let lookup = |reference: &Arg| -> Result<Address, DeployError> {
        match reference {
            Arg::Slot(target) => {
                let dependency = plan.descriptor(*target);
                dependency
                    .realized()
                    .or(dependency.predicted().map(|p| p.address))
                    .ok_or_else(|| DeployError::DependencyNotReady {
                        dependent: descriptor.name().to_string(),
                        dependency: dependency.name().to_string(),
                    })
            }
            _ => Err(DeployError::DependencyNotReady {
                dependent: descriptor.name().to_string(),
                dependency: "wiring output".to_string(),
            }),
        }
    };

    let args = descriptor
        .args()
        .iter()
        .map(|arg| resolve_arg(arg, plan.principal(), &lookup))
        .collect::<Result<Vec<_>, _>>()?;

    let mut init_code = descriptor.bytecode().to_vec();
    init_code.extend(abi::encode(&args));

    let batch = plan.batch(descriptor.batch());
    let position = batch
        .slots()
        .iter()
        .position(|s| *s == slot)
        .unwrap_or_default();

    Ok(ResolvedDescriptor {
        slot,
        name: descriptor.name().to_string(),
        batch: batch.name().to_string(),
        position,
        prediction,
        args,
        init_code,
    })
}

/// Resolve a wiring target and arguments against realized identities and
/// earlier read outputs only.
pub fn resolve_step(
    plan: &DeploymentPlan,
    index: usize,
    outputs: &HashMap<StepId, Address>,
) -> Result<(Address, Vec<Token>), DeployError> {
    let step = plan
        .steps()
        .get(index)
        .ok_or(DeployError::UnknownStep { index })?;
    let lookup = |reference: &Arg| -> Result<Address, DeployError> {
        match reference {
            Arg::Slot(slot) => {
                let dependency = plan.descriptor(*slot);
                dependency
                    .realized()
                    .ok_or_else(|| DeployError::DependencyNotReady {
                        dependent: step.label().to_string(),
                        dependency: dependency.name().to_string(),
                    })
            }
            Arg::Output(out) => {
                outputs
                    .get(out)
                    .copied()
                    .ok_or_else(|| DeployError::DependencyNotReady {
                        dependent: step.label().to_string(),
                        dependency: format!("output of wiring step {}", out.index()),
                    })
            }
            _ => Err(DeployError::DependencyNotReady {
                dependent: step.label().to_string(),
                dependency: "non-reference argument".to_string(),
            }),
        }
    };

    let target = match step.target() {
        Target::Address(address) => address,
        Target::Slot(slot) => lookup(&Arg::Slot(slot))?,
        Target::Output(out) => lookup(&Arg::Output(out))?,
    };
    let args = step
        .args()
        .iter()
        .map(|arg| resolve_arg(arg, plan.principal(), &lookup))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((target, args))
}

fn resolve_arg(
    arg: &Arg,
    principal: Address,
    lookup: &dyn Fn(&Arg) -> Result<Address, DeployError>,
) -> Result<Token, DeployError> {
    Ok(match arg {
        Arg::Literal(token) => token.clone(),
        Arg::Principal => Token::Address(principal),
        Arg::Slot(_) | Arg::Output(_) => Token::Address(lookup(arg)?),
        Arg::Tuple(items) => Token::Tuple(
            items
                .iter()
                .map(|item| resolve_arg(item, principal, lookup))
                .collect::<Result<Vec<_>, _>>()?,
        ),
    })
}
