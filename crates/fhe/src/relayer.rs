// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::sdk::{DecryptionBundle, EncryptedInput, FheSdk};
use crate::{FheError, Result};
use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EncryptRequest {
    contract_address: Address,
    user_address: Address,
    value: u64,
    bits: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncryptResponse {
    handle: Bytes,
    input_proof: Bytes,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicDecryptRequest<'a> {
    ciphertext_handles: &'a [B256],
    contract_address: Address,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicDecryptResponse {
    abi_encoded_clear_values: Bytes,
    decryption_proof: Bytes,
}

/// FHE SDK backed by the relayer HTTP gateway
pub struct RelayerClient {
    http: Client,
    base_url: String,
    bits: u32,
    initialized: AtomicBool,
}

impl RelayerClient {
    pub fn new(base_url: &str, timeout: Duration, bits: u32) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bits,
            initialized: AtomicBool::new(false),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(FheError::NotInitialized)
        }
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FheError::Relayer {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl FheSdk for RelayerClient {
    async fn initialize(&self) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }

        let response = self.http.get(self.endpoint("keyurl")).send().await?;
        let _keys: serde_json::Value = Self::read_json(response).await?;

        self.initialized.store(true, Ordering::SeqCst);
        info!(relayer = %self.base_url, "FHE key material available");
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    async fn encrypt(
        &self,
        contract: Address,
        owner: Address,
        plaintext: u64,
    ) -> Result<EncryptedInput> {
        self.ensure_initialized()?;

        let request = EncryptRequest {
            contract_address: contract,
            user_address: owner,
            value: plaintext,
            bits: self.bits,
        };
        let response = self
            .http
            .post(self.endpoint("encrypt"))
            .json(&request)
            .send()
            .await?;
        let encrypted: EncryptResponse = Self::read_json(response).await?;

        debug!(contract = %contract, owner = %owner, "input encrypted");
        Ok(EncryptedInput {
            ciphertext: encrypted.handle,
            proof: encrypted.input_proof,
        })
    }

    async fn request_decryption_proof(
        &self,
        handles: &[B256],
        contract: Address,
    ) -> Result<DecryptionBundle> {
        self.ensure_initialized()?;

        let request = PublicDecryptRequest {
            ciphertext_handles: handles,
            contract_address: contract,
        };
        let response = self
            .http
            .post(self.endpoint("public-decrypt"))
            .json(&request)
            .send()
            .await?;
        let decrypted: PublicDecryptResponse = Self::read_json(response).await?;

        debug!(contract = %contract, handles = handles.len(), "decryption proof received");
        Ok(DecryptionBundle {
            clear_values: decrypted.abi_encoded_clear_values,
            proof: decrypted.decryption_proof,
        })
    }
}
