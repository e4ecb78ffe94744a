//! Deployment driver: one confirmed creation per resolved descriptor.

use serde::{Deserialize, Serialize};

use crate::ledger::{LedgerClient, LedgerError};
use crate::types::{Address, TxHash};

use super::DeployError;
use super::resolve::ResolvedDescriptor;

/// A resource confirmed on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedResource {
    pub name: String,
    pub batch: String,
    pub address: Address,
    pub nonce: u64,
    pub tx_hash: TxHash,
    pub block_number: u64,
}

pub struct DeploymentDriver<'a> {
    ledger: &'a dyn LedgerClient,
    principal: Address,
}

impl<'a> DeploymentDriver<'a> {
    pub fn new(ledger: &'a dyn LedgerClient, principal: Address) -> Self {
        Self { ledger, principal }
    }

    /// Submit the creation, wait for it and check the realized identity.
    ///
    /// A mismatch with the prediction is fatal: every later argument already
    /// embeds the predicted address.
    pub fn deploy(&self, resolved: &ResolvedDescriptor) -> Result<DeployedResource, DeployError> {
        let creation_failed = |source: LedgerError| DeployError::Creation {
            batch: resolved.batch.clone(),
            position: resolved.position,
            name: resolved.name.clone(),
            source,
        };

        let receipt = self
            .ledger
            .submit_create(&self.principal, &resolved.init_code)
            .map_err(creation_failed)?;
        let realized = receipt.contract_address.ok_or_else(|| {
            creation_failed(LedgerError::MissingContractAddress {
                tx_hash: receipt.tx_hash,
            })
        })?;

        if realized != resolved.prediction.address {
            return Err(DeployError::PredictionMismatch {
                name: resolved.name.clone(),
                predicted: resolved.prediction.address,
                realized,
            });
        }

        tracing::info!(
            name = %resolved.name,
            address = %realized,
            nonce = resolved.prediction.nonce,
            tx = %receipt.tx_hash,
            "{} deployed at {}",
            resolved.name,
            realized
        );

        Ok(DeployedResource {
            name: resolved.name.clone(),
            batch: resolved.batch.clone(),
            address: realized,
            nonce: resolved.prediction.nonce,
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
        })
    }
}
