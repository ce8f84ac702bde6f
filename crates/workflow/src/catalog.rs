// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{EntityKind, Result, WorkflowError};
use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use lotto_evm::{EntityRecord, LedgerRead};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub creator: Address,
    pub is_verified: bool,
    pub decrypted_value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawSummary {
    pub id: String,
    pub draw_time: DateTime<Utc>,
    pub total_prize: U256,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LotteryStats {
    pub total_tickets: usize,
    pub total_draws: usize,
    pub total_prize: U256,
}

fn block_time(timestamp: u64) -> DateTime<Utc> {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_default()
}

/// Read models over the ledger
pub struct Catalog<L> {
    ledger: Arc<L>,
}

impl<L> Clone for Catalog<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
        }
    }
}

impl<L: LedgerRead> Catalog<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    async fn ids_of(&self, kind: EntityKind) -> Result<Vec<String>> {
        let ids = self
            .ledger
            .get_all_entity_ids()
            .await
            .map_err(WorkflowError::from_submission)?;
        Ok(ids
            .into_iter()
            .filter(|id| EntityKind::of_id(id) == Some(kind))
            .collect())
    }

    async fn records_of(&self, kind: EntityKind) -> Result<Vec<(String, EntityRecord)>> {
        let ids = self.ids_of(kind).await?;
        let reads = ids.into_iter().map(|id| async move {
            let record = self
                .ledger
                .get_entity_data(&id)
                .await
                .map_err(WorkflowError::from_submission)?;
            Ok::<_, WorkflowError>((id, record))
        });
        let records = try_join_all(reads).await?;
        debug!(kind = %kind, count = records.len(), "Loaded records");
        Ok(records)
    }

    pub async fn count(&self, kind: EntityKind) -> Result<usize> {
        Ok(self.ids_of(kind).await?.len())
    }

    pub async fn tickets(&self) -> Result<Vec<TicketSummary>> {
        Ok(self
            .records_of(EntityKind::Ticket)
            .await?
            .into_iter()
            .map(|(id, record)| TicketSummary {
                id,
                created_at: block_time(record.timestamp),
                creator: record.creator,
                is_verified: record.is_verified,
                decrypted_value: record.decrypted_value,
            })
            .collect())
    }

    pub async fn draws(&self) -> Result<Vec<DrawSummary>> {
        Ok(self
            .records_of(EntityKind::Draw)
            .await?
            .into_iter()
            .map(|(id, record)| DrawSummary {
                id,
                draw_time: block_time(record.timestamp),
                total_prize: record.public_value1,
                is_completed: record.is_verified,
            })
            .collect())
    }

    /// Tickets created by `owner`
    pub async fn user_history(&self, owner: Address) -> Result<Vec<TicketSummary>> {
        Ok(self
            .tickets()
            .await?
            .into_iter()
            .filter(|ticket| ticket.creator == owner)
            .collect())
    }

    pub async fn stats(&self) -> Result<LotteryStats> {
        let total_tickets = self.count(EntityKind::Ticket).await?;
        let draws = self.draws().await?;
        let total_prize = draws
            .iter()
            .fold(U256::ZERO, |acc, draw| acc.saturating_add(draw.total_prize));

        Ok(LotteryStats {
            total_tickets,
            total_draws: draws.len(),
            total_prize,
        })
    }

    /// Whether the contract answers at all. Errors count as unavailable.
    pub async fn is_available(&self) -> bool {
        match self.ledger.is_available().await {
            Ok(available) => available,
            Err(e) => {
                warn!(contract = %self.ledger.contract_address(), error = %e, "Contract unavailable");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_time() {
        assert_eq!(block_time(1_700_000_000).timestamp(), 1_700_000_000);
        assert_eq!(block_time(u64::MAX), DateTime::<Utc>::default());
    }
}
