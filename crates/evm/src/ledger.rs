// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::LedgerError;
use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A record as the ledger reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub name: String,
    pub public_value1: U256,
    pub public_value2: U256,
    pub description: String,
    pub creator: Address,
    /// Unix seconds of the block that created the entity
    pub timestamp: u64,
    pub is_verified: bool,
    /// Zero until verification succeeds
    pub decrypted_value: u64,
}

/// Arguments for creating an entity on the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDraft {
    pub entity_id: String,
    pub label: String,
    pub ciphertext: Bytes,
    pub proof: Bytes,
    pub public_value1: U256,
    pub public_value2: U256,
    pub description: String,
}

/// Receipt of a confirmed transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

/// A broadcast transaction that has not been confirmed yet
#[async_trait]
pub trait PendingConfirmation: Send {
    fn tx_hash(&self) -> B256;

    /// Wait until the transaction is included. A reverted receipt is an error.
    async fn confirm(self: Box<Self>) -> Result<TxReceipt, LedgerError>;
}

/// Trait for read-only operations on the lottery contract
#[async_trait]
pub trait LedgerRead: Send + Sync {
    /// Address of the contract the records live in
    fn contract_address(&self) -> Address;

    /// Get every entity id ever created
    async fn get_all_entity_ids(&self) -> Result<Vec<String>, LedgerError>;

    /// Get the record for an entity
    async fn get_entity_data(&self, entity_id: &str) -> Result<EntityRecord, LedgerError>;

    /// Get the handle of the encrypted value stored for an entity
    async fn get_encrypted_value_handle(&self, entity_id: &str) -> Result<B256, LedgerError>;

    /// Check the contract responds
    async fn is_available(&self) -> Result<bool, LedgerError>;
}

/// Trait for write operations on the lottery contract
#[async_trait]
pub trait LedgerWrite: Send + Sync {
    /// The account writes are signed with
    fn signer_address(&self) -> Address;

    /// Broadcast an entity creation
    async fn create_entity(
        &self,
        draft: &EntityDraft,
    ) -> Result<Box<dyn PendingConfirmation>, LedgerError>;

    /// Broadcast decrypted values with their proof for on-chain validation
    async fn submit_decryption_proof(
        &self,
        entity_id: &str,
        clear_values: &Bytes,
        proof: &Bytes,
    ) -> Result<Box<dyn PendingConfirmation>, LedgerError>;
}

/// A ledger that can be both read and written
pub trait Ledger: LedgerRead + LedgerWrite {}

impl<T: LedgerRead + LedgerWrite> Ledger for T {}
