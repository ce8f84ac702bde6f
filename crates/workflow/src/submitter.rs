// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{Result, WorkflowError};
use lotto_evm::{EntityDraft, Ledger, LedgerError, TxReceipt};
use std::sync::Arc;
use tracing::{info, warn};

/// Writes encrypted entities to the ledger and waits for them to land
pub struct ContractSubmitter<L> {
    ledger: Arc<L>,
}

impl<L> Clone for ContractSubmitter<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
        }
    }
}

impl<L: Ledger> ContractSubmitter<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    async fn exists(&self, entity_id: &str) -> Result<bool> {
        let ids = self
            .ledger
            .get_all_entity_ids()
            .await
            .map_err(WorkflowError::from_submission)?;
        Ok(ids.iter().any(|id| id == entity_id))
    }

    /// A revert for an id that is now on the ledger means somebody else created it first
    async fn classify_failure(&self, entity_id: &str, err: LedgerError) -> WorkflowError {
        if matches!(err, LedgerError::Reverted(_)) && matches!(self.exists(entity_id).await, Ok(true))
        {
            warn!(entity_id, "Creation reverted because the entity already exists");
            return WorkflowError::DuplicateEntity(entity_id.to_string());
        }
        WorkflowError::from_submission(err)
    }

    /// Create the entity and wait for confirmation. Never retried.
    pub async fn submit(&self, draft: &EntityDraft) -> Result<TxReceipt> {
        let entity_id = draft.entity_id.as_str();
        if entity_id.is_empty() {
            return Err(WorkflowError::InvalidInput("entity id is empty".into()));
        }

        if self.exists(entity_id).await? {
            return Err(WorkflowError::DuplicateEntity(entity_id.to_string()));
        }

        let pending = match self.ledger.create_entity(draft).await {
            Ok(pending) => pending,
            Err(e) => return Err(self.classify_failure(entity_id, e).await),
        };
        info!(entity_id, tx_hash = %pending.tx_hash(), "Entity creation broadcast");

        match pending.confirm().await {
            Ok(receipt) => {
                info!(
                    entity_id,
                    tx_hash = %receipt.tx_hash,
                    block = ?receipt.block_number,
                    "Entity creation confirmed"
                );
                Ok(receipt)
            }
            Err(e) => Err(self.classify_failure(entity_id, e).await),
        }
    }
}
