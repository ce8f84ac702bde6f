// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::primitives::{keccak256, Address, Bytes, B256};
use async_trait::async_trait;
use lotto_fhe::{encode_clear_values, DecryptionBundle, EncryptedInput, FheError, FheSdk, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::trace;

#[derive(Debug, Default)]
struct SdkState {
    initialized: bool,
    fail_initialize: Option<String>,
    fail_encryption: Option<String>,
    fail_decryption: Option<String>,
    clear_values_override: Option<Bytes>,
    decryption_delay: Duration,
    plaintexts: HashMap<B256, u64>,
    nonce: u64,
    initialize_calls: usize,
    encrypt_calls: usize,
    decrypt_calls: usize,
}

/// Stand-in for the FHE SDK. Ciphertexts are 32 byte handles remembered together with their
/// plaintext, proofs are hashes the [`crate::InMemoryLedger`] knows how to check.
#[derive(Debug, Clone, Default)]
pub struct SimulatedFheSdk {
    state: Arc<Mutex<SdkState>>,
}

impl SimulatedFheSdk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialized() -> Self {
        let sdk = Self::new();
        sdk.state().initialized = true;
        sdk
    }

    fn state(&self) -> MutexGuard<'_, SdkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Proof that `handle` was encrypted for `owner` on `contract`
    pub fn input_proof(handle: B256, contract: Address, owner: Address) -> Bytes {
        let mut preimage = Vec::with_capacity(32 + 20 + 20);
        preimage.extend_from_slice(handle.as_slice());
        preimage.extend_from_slice(contract.as_slice());
        preimage.extend_from_slice(owner.as_slice());
        Bytes::from(keccak256(preimage).to_vec())
    }

    /// Proof that `clear_values` is the decryption of `handles`
    pub fn decryption_proof(handles: &[B256], clear_values: &[u8]) -> Bytes {
        let mut preimage = Vec::with_capacity(handles.len() * 32 + clear_values.len());
        for handle in handles {
            preimage.extend_from_slice(handle.as_slice());
        }
        preimage.extend_from_slice(clear_values);
        Bytes::from(keccak256(preimage).to_vec())
    }

    pub fn fail_initialize(&self, reason: &str) {
        self.state().fail_initialize = Some(reason.to_string());
    }

    pub fn fail_encryption(&self, reason: &str) {
        self.state().fail_encryption = Some(reason.to_string());
    }

    pub fn fail_decryption(&self, reason: &str) {
        self.state().fail_decryption = Some(reason.to_string());
    }

    /// The next decryption answers with these clear values, signed as if they were genuine
    pub fn return_clear_values(&self, clear_values: Bytes) {
        self.state().clear_values_override = Some(clear_values);
    }

    /// How long the decryption service takes to answer
    pub fn set_decryption_delay(&self, delay: Duration) {
        self.state().decryption_delay = delay;
    }

    /// Plaintext behind a handle this SDK produced
    pub fn plaintext_of(&self, handle: B256) -> Option<u64> {
        self.state().plaintexts.get(&handle).copied()
    }

    /// Register a ciphertext produced elsewhere so it can be decrypted
    pub fn remember(&self, handle: B256, plaintext: u64) {
        self.state().plaintexts.insert(handle, plaintext);
    }

    pub fn initialize_calls(&self) -> usize {
        self.state().initialize_calls
    }

    pub fn encrypt_calls(&self) -> usize {
        self.state().encrypt_calls
    }

    pub fn decrypt_calls(&self) -> usize {
        self.state().decrypt_calls
    }
}

#[async_trait]
impl FheSdk for SimulatedFheSdk {
    async fn initialize(&self) -> Result<()> {
        let mut state = self.state();
        state.initialize_calls += 1;
        if let Some(reason) = state.fail_initialize.clone() {
            return Err(FheError::Sdk(reason));
        }
        state.initialized = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    async fn encrypt(
        &self,
        contract: Address,
        owner: Address,
        plaintext: u64,
    ) -> Result<EncryptedInput> {
        let mut state = self.state();
        state.encrypt_calls += 1;
        if !state.initialized {
            return Err(FheError::NotInitialized);
        }
        if let Some(reason) = state.fail_encryption.clone() {
            return Err(FheError::Sdk(reason));
        }

        state.nonce += 1;
        let mut preimage = Vec::with_capacity(20 + 20 + 8);
        preimage.extend_from_slice(contract.as_slice());
        preimage.extend_from_slice(owner.as_slice());
        preimage.extend_from_slice(&state.nonce.to_be_bytes());
        let handle = keccak256(preimage);
        state.plaintexts.insert(handle, plaintext);
        trace!(handle = %handle, "simulated encryption");

        Ok(EncryptedInput {
            ciphertext: Bytes::from(handle.to_vec()),
            proof: Self::input_proof(handle, contract, owner),
        })
    }

    async fn request_decryption_proof(
        &self,
        handles: &[B256],
        _contract: Address,
    ) -> Result<DecryptionBundle> {
        let delay = {
            let mut state = self.state();
            state.decrypt_calls += 1;
            state.decryption_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if !state.initialized {
            return Err(FheError::NotInitialized);
        }
        if let Some(reason) = state.fail_decryption.clone() {
            return Err(FheError::Sdk(reason));
        }

        if let Some(clear_values) = state.clear_values_override.take() {
            let proof = Self::decryption_proof(handles, &clear_values);
            return Ok(DecryptionBundle {
                clear_values,
                proof,
            });
        }

        let values = handles
            .iter()
            .map(|handle| {
                state
                    .plaintexts
                    .get(handle)
                    .copied()
                    .ok_or_else(|| FheError::Sdk(format!("unknown handle {}", handle)))
            })
            .collect::<Result<Vec<u64>>>()?;

        let clear_values = encode_clear_values(&values);
        let proof = Self::decryption_proof(handles, &clear_values);
        Ok(DecryptionBundle {
            clear_values,
            proof,
        })
    }
}
