// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::Result;
use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Ciphertext plus the proof that it is well formed. Only usable with the contract and owner it
/// was produced for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedInput {
    pub ciphertext: Bytes,
    pub proof: Bytes,
}

/// Decrypted values and the proof the ledger checks them against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionBundle {
    /// ABI encoded words, one per requested handle
    pub clear_values: Bytes,
    pub proof: Bytes,
}

/// The FHE SDK collaborator
#[async_trait]
pub trait FheSdk: Send + Sync {
    /// Load key material. Must complete before encrypting or decrypting. Idempotent.
    async fn initialize(&self) -> Result<()>;

    fn is_initialized(&self) -> bool;

    /// Encrypt `plaintext` for use by `owner` on `contract`
    async fn encrypt(
        &self,
        contract: Address,
        owner: Address,
        plaintext: u64,
    ) -> Result<EncryptedInput>;

    /// Request the public decryption of `handles` together with a proof of correct decryption
    async fn request_decryption_proof(
        &self,
        handles: &[B256],
        contract: Address,
    ) -> Result<DecryptionBundle>;
}
