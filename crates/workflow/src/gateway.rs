// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{Result, WorkflowError};
use alloy::primitives::Address;
use lotto_fhe::{EncryptedInput, FheError, FheSdk};
use std::sync::Arc;
use tracing::{debug, error};

pub const DEFAULT_PLAINTEXT_BITS: u32 = 32;

/// Turns plaintext integers into ciphertexts with validity proofs
pub struct EncryptionGateway<S> {
    sdk: Arc<S>,
    plaintext_bits: u32,
}

impl<S> Clone for EncryptionGateway<S> {
    fn clone(&self) -> Self {
        Self {
            sdk: self.sdk.clone(),
            plaintext_bits: self.plaintext_bits,
        }
    }
}

impl<S: FheSdk> EncryptionGateway<S> {
    pub fn new(sdk: Arc<S>, plaintext_bits: u32) -> Self {
        Self {
            sdk,
            plaintext_bits: plaintext_bits.clamp(1, 64),
        }
    }

    pub fn plaintext_bits(&self) -> u32 {
        self.plaintext_bits
    }

    /// Largest plaintext that fits the configured width
    pub fn max_plaintext(&self) -> u64 {
        if self.plaintext_bits >= 64 {
            u64::MAX
        } else {
            (1u64 << self.plaintext_bits) - 1
        }
    }

    /// Encrypt `plaintext` so only `owner` can submit it to `contract`
    pub async fn encrypt(
        &self,
        contract: Address,
        owner: Address,
        plaintext: u64,
    ) -> Result<EncryptedInput> {
        if plaintext > self.max_plaintext() {
            return Err(WorkflowError::InvalidInput(format!(
                "{} does not fit in {} bits",
                plaintext, self.plaintext_bits
            )));
        }

        if !self.sdk.is_initialized() {
            return Err(WorkflowError::EncryptionUnavailable(
                FheError::NotInitialized.to_string(),
            ));
        }

        let input = self
            .sdk
            .encrypt(contract, owner, plaintext)
            .await
            .map_err(|e| {
                error!(contract = %contract, error = %e, "Encryption failed");
                WorkflowError::EncryptionUnavailable(e.to_string())
            })?;

        debug!(
            contract = %contract,
            owner = %owner,
            ciphertext_len = input.ciphertext.len(),
            proof_len = input.proof.len(),
            "Plaintext encrypted"
        );
        Ok(input)
    }
}
