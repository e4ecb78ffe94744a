//! Wiring driver: executes post-deployment steps strictly in order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::abi::{self, Token};
use crate::ledger::LedgerClient;
use crate::plan::{DeploymentPlan, StepId, StepKind};
use crate::types::{Address, TxHash};

use super::DeployError;
use super::resolve::resolve_step;

/// A completed wiring step with the exact values it forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WiringOutcome {
    pub index: usize,
    pub label: String,
    pub method: String,
    pub kind: StepKind,
    pub target: Address,
    pub args: Vec<Token>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Address>,
}

pub struct WiringDriver<'a> {
    ledger: &'a dyn LedgerClient,
    principal: Address,
    outputs: HashMap<StepId, Address>,
    outcomes: Vec<WiringOutcome>,
}

impl<'a> WiringDriver<'a> {
    pub fn new(ledger: &'a dyn LedgerClient, principal: Address) -> Self {
        Self {
            ledger,
            principal,
            outputs: HashMap::new(),
            outcomes: Vec::new(),
        }
    }

    /// Run every step not yet executed, stopping at the first failure.
    pub fn wire(&mut self, plan: &DeploymentPlan) -> Result<(), DeployError> {
        for index in self.outcomes.len()..plan.steps().len() {
            self.execute(plan, index)?;
        }
        Ok(())
    }

    pub fn outcomes(&self) -> &[WiringOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<WiringOutcome> {
        self.outcomes
    }

    fn execute(&mut self, plan: &DeploymentPlan, index: usize) -> Result<(), DeployError> {
        let step = plan
            .steps()
            .get(index)
            .ok_or(DeployError::UnknownStep { index })?;
        let (target, args) = resolve_step(plan, index, &self.outputs)?;
        let calldata = abi::encode_call(step.method(), &args);

        let (tx_hash, output) = match step.kind() {
            StepKind::Call => {
                let receipt = self
                    .ledger
                    .submit_call(&self.principal, &target, &calldata)
                    .map_err(|source| DeployError::Wiring {
                        index,
                        label: step.label().to_string(),
                        source,
                    })?;
                (Some(receipt.tx_hash), None)
            }
            StepKind::Read => {
                let address = self.read(step.label(), index, &target, &calldata)?;
                self.outputs.insert(StepId(index), address);
                (None, Some(address))
            }
        };

        match (tx_hash, output) {
            (Some(tx), _) => tracing::info!(step = index, target = %target, tx = %tx, "{}", step.label()),
            (None, Some(out)) => tracing::info!(step = index, target = %target, output = %out, "{}", step.label()),
            (None, None) => {}
        }

        self.outcomes.push(WiringOutcome {
            index,
            label: step.label().to_string(),
            method: step.method().to_string(),
            kind: step.kind(),
            target,
            args,
            tx_hash,
            output,
        });
        Ok(())
    }

    /// Perform a read step again without recording it.
    ///
    /// Only read steps can be performed this way.
    pub fn read_output(&self, plan: &DeploymentPlan, index: usize) -> Result<Address, DeployError> {
        let step = plan
            .steps()
            .get(index)
            .ok_or(DeployError::UnknownStep { index })?;
        if step.kind() != StepKind::Read {
            return Err(DeployError::NotARead {
                index,
                label: step.label().to_string(),
            });
        }
        let (target, args) = resolve_step(plan, index, &self.outputs)?;
        self.read(
            step.label(),
            index,
            &target,
            &abi::encode_call(step.method(), &args),
        )
    }

    fn read(
        &self,
        label: &str,
        index: usize,
        target: &Address,
        calldata: &[u8],
    ) -> Result<Address, DeployError> {
        let data = self
            .ledger
            .read_call(target, calldata)
            .map_err(|source| DeployError::Wiring {
                index,
                label: label.to_string(),
                source,
            })?;
        abi::decode_address(&data).map_err(|source| DeployError::Decode {
            index,
            label: label.to_string(),
            source,
        })
    }
}
