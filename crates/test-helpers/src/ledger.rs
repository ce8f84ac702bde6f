// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::SimulatedFheSdk;
use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use async_trait::async_trait;
use lotto_evm::{
    EntityDraft, EntityRecord, LedgerError, LedgerRead, LedgerWrite, PendingConfirmation,
    TxReceipt,
};
use lotto_fhe::decode_clear_values;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::trace;

/// Block timestamp of the first block
pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

#[derive(Debug, Clone)]
struct StoredEntity {
    record: EntityRecord,
    handle: B256,
}

#[derive(Debug)]
struct LedgerState {
    ids: Vec<String>,
    entities: HashMap<String, StoredEntity>,
    block: u64,
    nonce: u64,
    available: bool,
    reject_next: bool,
    fail_next_write: Option<String>,
    fail_next_read: Option<String>,
    default_delay: Duration,
    delays: HashMap<String, Duration>,
    create_calls: usize,
    proof_calls: usize,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            entities: HashMap::new(),
            block: 0,
            nonce: 0,
            available: true,
            reject_next: false,
            fail_next_write: None,
            fail_next_read: None,
            default_delay: Duration::ZERO,
            delays: HashMap::new(),
            create_calls: 0,
            proof_calls: 0,
        }
    }
}

impl LedgerState {
    fn mine(&mut self) -> u64 {
        self.block += 1;
        self.block
    }

    fn delay_for(&self, entity_id: &str) -> Duration {
        self.delays
            .get(entity_id)
            .copied()
            .unwrap_or(self.default_delay)
    }

    fn check_read(&mut self) -> Result<(), LedgerError> {
        match self.fail_next_read.take() {
            Some(reason) => Err(LedgerError::Transport(reason)),
            None => Ok(()),
        }
    }

    /// Signing and broadcast failures that apply to any write
    fn check_signature(&mut self) -> Result<(), LedgerError> {
        if let Some(reason) = self.fail_next_write.take() {
            return Err(LedgerError::Transport(reason));
        }
        if std::mem::take(&mut self.reject_next) {
            return Err(LedgerError::UserRejected(
                "User denied transaction signature".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
enum PendingWrite {
    Create {
        draft: EntityDraft,
        handle: B256,
    },
    Decryption {
        entity_id: String,
        clear_values: Bytes,
        proof: Bytes,
    },
}

/// A ledger that lives in memory and checks the simulated SDK proofs
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    contract: Address,
    signer: Address,
    state: Arc<Mutex<LedgerState>>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            contract: Address::repeat_byte(0xC0),
            signer: Address::repeat_byte(0xA1),
            state: Arc::new(Mutex::new(LedgerState::default())),
        }
    }

    /// Same records, different signing account
    pub fn with_signer(&self, signer: Address) -> Self {
        Self {
            contract: self.contract,
            signer,
            state: self.state.clone(),
        }
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The next signature request is declined by the wallet
    pub fn reject_next_signature(&self) {
        self.state().reject_next = true;
    }

    /// The next write fails before reaching the chain
    pub fn fail_next_write(&self, reason: &str) {
        self.state().fail_next_write = Some(reason.to_string());
    }

    /// The next read fails as if the RPC endpoint went away
    pub fn fail_next_read(&self, reason: &str) {
        self.state().fail_next_read = Some(reason.to_string());
    }

    pub fn set_available(&self, available: bool) {
        self.state().available = available;
    }

    /// How long every confirmation takes unless overridden per entity
    pub fn set_confirmation_delay(&self, delay: Duration) {
        self.state().default_delay = delay;
    }

    pub fn set_confirmation_delay_for(&self, entity_id: &str, delay: Duration) {
        self.state().delays.insert(entity_id.to_string(), delay);
    }

    /// Put an entity straight on the ledger, bypassing proofs
    pub fn insert_entity(&self, entity_id: &str, record: EntityRecord, handle: B256) {
        let mut state = self.state();
        if !state.entities.contains_key(entity_id) {
            state.ids.push(entity_id.to_string());
        }
        state
            .entities
            .insert(entity_id.to_string(), StoredEntity { record, handle });
    }

    /// Seed a ticket that was verified earlier
    pub fn insert_verified(&self, entity_id: &str, creator: Address, decrypted_value: u64) {
        let record = EntityRecord {
            name: entity_id.to_string(),
            public_value1: U256::ZERO,
            public_value2: U256::ZERO,
            description: String::new(),
            creator,
            timestamp: GENESIS_TIMESTAMP,
            is_verified: true,
            decrypted_value,
        };
        self.insert_entity(entity_id, record, keccak256(entity_id.as_bytes()));
    }

    pub fn create_calls(&self) -> usize {
        self.state().create_calls
    }

    pub fn proof_calls(&self) -> usize {
        self.state().proof_calls
    }

    pub fn write_calls(&self) -> usize {
        let state = self.state();
        state.create_calls + state.proof_calls
    }

    pub fn block_number(&self) -> u64 {
        self.state().block
    }

    fn pending(&self, key: &str, write: PendingWrite) -> Box<dyn PendingConfirmation> {
        let mut state = self.state();
        state.nonce += 1;
        let mut preimage = key.as_bytes().to_vec();
        preimage.extend_from_slice(&state.nonce.to_be_bytes());

        Box::new(InMemoryPendingTx {
            tx_hash: keccak256(preimage),
            delay: state.delay_for(key),
            contract: self.contract,
            signer: self.signer,
            state: self.state.clone(),
            write,
        })
    }
}

#[async_trait]
impl LedgerRead for InMemoryLedger {
    fn contract_address(&self) -> Address {
        self.contract
    }

    async fn get_all_entity_ids(&self) -> Result<Vec<String>, LedgerError> {
        let mut state = self.state();
        state.check_read()?;
        Ok(state.ids.clone())
    }

    async fn get_entity_data(&self, entity_id: &str) -> Result<EntityRecord, LedgerError> {
        let mut state = self.state();
        state.check_read()?;
        state
            .entities
            .get(entity_id)
            .map(|e| e.record.clone())
            .ok_or_else(|| LedgerError::NotFound(entity_id.to_string()))
    }

    async fn get_encrypted_value_handle(&self, entity_id: &str) -> Result<B256, LedgerError> {
        let mut state = self.state();
        state.check_read()?;
        state
            .entities
            .get(entity_id)
            .map(|e| e.handle)
            .ok_or_else(|| LedgerError::NotFound(entity_id.to_string()))
    }

    async fn is_available(&self) -> Result<bool, LedgerError> {
        let mut state = self.state();
        state.check_read()?;
        Ok(state.available)
    }
}

#[async_trait]
impl LedgerWrite for InMemoryLedger {
    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn create_entity(
        &self,
        draft: &EntityDraft,
    ) -> Result<Box<dyn PendingConfirmation>, LedgerError> {
        {
            let mut state = self.state();
            state.check_signature()?;
            state.create_calls += 1;
        }

        let handle = B256::try_from(draft.ciphertext.as_ref()).map_err(|_| {
            LedgerError::InvalidPayload(format!(
                "expected a 32 byte handle, got {} bytes",
                draft.ciphertext.len()
            ))
        })?;

        Ok(self.pending(
            &draft.entity_id,
            PendingWrite::Create {
                draft: draft.clone(),
                handle,
            },
        ))
    }

    async fn submit_decryption_proof(
        &self,
        entity_id: &str,
        clear_values: &Bytes,
        proof: &Bytes,
    ) -> Result<Box<dyn PendingConfirmation>, LedgerError> {
        {
            let mut state = self.state();
            state.check_signature()?;
            state.proof_calls += 1;
        }

        Ok(self.pending(
            entity_id,
            PendingWrite::Decryption {
                entity_id: entity_id.to_string(),
                clear_values: clear_values.clone(),
                proof: proof.clone(),
            },
        ))
    }
}

struct InMemoryPendingTx {
    tx_hash: B256,
    delay: Duration,
    contract: Address,
    signer: Address,
    state: Arc<Mutex<LedgerState>>,
    write: PendingWrite,
}

impl InMemoryPendingTx {
    /// Execute the write the way the contract would
    fn execute(self) -> Result<TxReceipt, LedgerError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match self.write {
            PendingWrite::Create { draft, handle } => {
                if state.entities.contains_key(&draft.entity_id) {
                    return Err(LedgerError::Reverted(
                        "execution reverted: Business ID already exists".into(),
                    ));
                }
                if draft.proof != SimulatedFheSdk::input_proof(handle, self.contract, self.signer) {
                    return Err(LedgerError::Reverted(
                        "execution reverted: Invalid input proof".into(),
                    ));
                }

                let block = state.mine();
                let record = EntityRecord {
                    name: draft.label,
                    public_value1: draft.public_value1,
                    public_value2: draft.public_value2,
                    description: draft.description,
                    creator: self.signer,
                    timestamp: GENESIS_TIMESTAMP + block,
                    is_verified: false,
                    decrypted_value: 0,
                };
                state.ids.push(draft.entity_id.clone());
                state
                    .entities
                    .insert(draft.entity_id, StoredEntity { record, handle });
                Ok(TxReceipt {
                    tx_hash: self.tx_hash,
                    block_number: Some(block),
                })
            }
            PendingWrite::Decryption {
                entity_id,
                clear_values,
                proof,
            } => {
                let Some(stored) = state.entities.get(&entity_id).cloned() else {
                    return Err(LedgerError::Reverted(
                        "execution reverted: Business does not exist".into(),
                    ));
                };
                if stored.record.is_verified {
                    return Err(LedgerError::Reverted(
                        "execution reverted: Already verified".into(),
                    ));
                }
                if proof != SimulatedFheSdk::decryption_proof(&[stored.handle], &clear_values) {
                    return Err(LedgerError::Reverted(
                        "execution reverted: Invalid decryption proof".into(),
                    ));
                }
                let value = decode_clear_values(&clear_values)
                    .ok()
                    .and_then(|values| values.first().copied())
                    .ok_or_else(|| {
                        LedgerError::Reverted("execution reverted: Bad clear values".into())
                    })?;

                let block = state.mine();
                if let Some(entity) = state.entities.get_mut(&entity_id) {
                    entity.record.is_verified = true;
                    entity.record.decrypted_value = value;
                }
                Ok(TxReceipt {
                    tx_hash: self.tx_hash,
                    block_number: Some(block),
                })
            }
        }
    }
}

#[async_trait]
impl PendingConfirmation for InMemoryPendingTx {
    fn tx_hash(&self) -> B256 {
        self.tx_hash
    }

    async fn confirm(self: Box<Self>) -> Result<TxReceipt, LedgerError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        trace!(tx_hash = %self.tx_hash, "in-memory transaction mined");
        (*self).execute()
    }
}
