// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::ledger::{
    EntityDraft, EntityRecord, LedgerRead, LedgerWrite, PendingConfirmation, TxReceipt,
};
use crate::LedgerError;
use alloy::providers::fillers::BlobGasFiller;
use alloy::{
    network::{Ethereum, EthereumWallet, ReceiptResponse},
    primitives::{Address, Bytes, B256},
    providers::fillers::{
        ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
    },
    providers::{Identity, PendingTransactionBuilder, Provider, ProviderBuilder, RootProvider},
    signers::local::PrivateKeySigner,
    sol,
};
use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Serializes nonce assignment across writers. Held while broadcasting, never across a
/// confirmation wait.
static NONCE_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

sol! {
    #[derive(Debug)]
    #[sol(rpc)]
    contract LottoCrypt {
        function getAllBusinessIds() external view returns (string[] memory);
        function getBusinessData(string calldata businessId) external view returns (
            string memory name,
            uint256 publicValue1,
            uint256 publicValue2,
            string memory description,
            address creator,
            uint256 timestamp,
            bool isVerified,
            uint32 decryptedValue
        );
        function getEncryptedValue(string calldata businessId) external view returns (bytes32);
        function createBusinessData(
            string calldata businessId,
            string calldata name,
            bytes32 encryptedValue,
            bytes calldata inputProof,
            uint256 publicValue1,
            uint256 publicValue2,
            string calldata description
        ) external;
        function verifyDecryption(
            string calldata businessId,
            bytes memory abiEncodedClearValue,
            bytes memory decryptionProof
        ) external;
        function isAvailable() public view returns (bool);
    }
}

/// Generic type to represent different provider types
pub trait ProviderType: Send {
    type Provider: Provider + Send + Sync + 'static;
}

/// Marker type for read-only provider
#[derive(Clone)]
pub struct ReadOnly;
impl ProviderType for ReadOnly {
    type Provider = LotteryReadOnlyProvider;
}

/// Marker type for read-write provider
#[derive(Clone)]
pub struct ReadWrite;
impl ProviderType for ReadWrite {
    type Provider = LotteryWriteProvider;
}

/// Generic lottery contract
#[derive(Clone)]
pub struct LotteryContract<T: ProviderType> {
    pub provider: Arc<T::Provider>,
    pub contract_address: Address,
    signer: Option<Address>,
    _marker: PhantomData<T>,
}

impl LotteryContract<ReadWrite> {
    pub async fn new(
        http_rpc_url: &str,
        contract_address: Address,
        private_key: &str,
    ) -> Result<LotteryContract<ReadWrite>> {
        LotteryContractFactory::create_write(http_rpc_url, contract_address, private_key).await
    }
}

impl LotteryContract<ReadOnly> {
    pub async fn read_only(
        http_rpc_url: &str,
        contract_address: Address,
    ) -> Result<LotteryContract<ReadOnly>> {
        LotteryContractFactory::create_read(http_rpc_url, contract_address).await
    }
}

/// Type alias for read-only provider
pub type LotteryReadOnlyProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider,
>;

/// Type alias for read-write provider
pub type LotteryWriteProvider = FillProvider<
    JoinFill<
        JoinFill<
            JoinFill<
                Identity,
                JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
            >,
            WalletFiller<EthereumWallet>,
        >,
        NonceFiller,
    >,
    RootProvider<Ethereum>,
    Ethereum,
>;

pub type LotteryReadContract = LotteryContract<ReadOnly>;
pub type LotteryWriteContract = LotteryContract<ReadWrite>;

pub struct LotteryContractFactory;

impl LotteryContractFactory {
    /// Create a write-capable contract
    pub async fn create_write(
        http_rpc_url: &str,
        contract_address: Address,
        private_key: &str,
    ) -> Result<LotteryContract<ReadWrite>> {
        let signer: PrivateKeySigner = private_key.parse()?;
        let signer_address = signer.address();
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .with_cached_nonce_management()
            .connect(http_rpc_url)
            .await?;

        info!(contract = %contract_address, signer = %signer_address, "connected write provider");
        Ok(LotteryContract::<ReadWrite> {
            provider: Arc::new(provider),
            contract_address,
            signer: Some(signer_address),
            _marker: PhantomData,
        })
    }

    /// Create a read-only contract
    pub async fn create_read(
        http_rpc_url: &str,
        contract_address: Address,
    ) -> Result<LotteryContract<ReadOnly>> {
        let provider = ProviderBuilder::new().connect(http_rpc_url).await?;

        Ok(LotteryContract::<ReadOnly> {
            provider: Arc::new(provider),
            contract_address,
            signer: None,
            _marker: PhantomData,
        })
    }
}

/// A transaction broadcast through alloy
pub struct AlloyPendingTx {
    inner: PendingTransactionBuilder<Ethereum>,
}

#[async_trait]
impl PendingConfirmation for AlloyPendingTx {
    fn tx_hash(&self) -> B256 {
        *self.inner.tx_hash()
    }

    async fn confirm(self: Box<Self>) -> Result<TxReceipt, LedgerError> {
        let tx_hash = *self.inner.tx_hash();
        let receipt = self
            .inner
            .get_receipt()
            .await
            .map_err(LedgerError::classify)?;

        if !receipt.status() {
            return Err(LedgerError::Reverted(format!(
                "transaction {tx_hash} was included but reverted"
            )));
        }

        debug!(tx = %tx_hash, block = ?receipt.block_number(), "transaction confirmed");
        Ok(TxReceipt {
            tx_hash: receipt.transaction_hash(),
            block_number: receipt.block_number(),
        })
    }
}

// Implement LedgerRead for any LotteryContract regardless of provider type
#[async_trait]
impl<T: Send + Sync> LedgerRead for LotteryContract<T>
where
    T: ProviderType,
{
    fn contract_address(&self) -> Address {
        self.contract_address
    }

    async fn get_all_entity_ids(&self) -> Result<Vec<String>, LedgerError> {
        let contract = LottoCrypt::new(self.contract_address, &self.provider);
        let ids = contract
            .getAllBusinessIds()
            .call()
            .await
            .map_err(LedgerError::classify)?;
        Ok(ids)
    }

    async fn get_entity_data(&self, entity_id: &str) -> Result<EntityRecord, LedgerError> {
        let contract = LottoCrypt::new(self.contract_address, &self.provider);
        let data = contract
            .getBusinessData(entity_id.to_string())
            .call()
            .await
            .map_err(LedgerError::classify)?;

        Ok(EntityRecord {
            name: data.name,
            public_value1: data.publicValue1,
            public_value2: data.publicValue2,
            description: data.description,
            creator: data.creator,
            timestamp: data.timestamp.saturating_to::<u64>(),
            is_verified: data.isVerified,
            decrypted_value: u64::from(data.decryptedValue),
        })
    }

    async fn get_encrypted_value_handle(&self, entity_id: &str) -> Result<B256, LedgerError> {
        let contract = LottoCrypt::new(self.contract_address, &self.provider);
        let handle = contract
            .getEncryptedValue(entity_id.to_string())
            .call()
            .await
            .map_err(LedgerError::classify)?;
        Ok(handle)
    }

    async fn is_available(&self) -> Result<bool, LedgerError> {
        let contract = LottoCrypt::new(self.contract_address, &self.provider);
        let available = contract
            .isAvailable()
            .call()
            .await
            .map_err(LedgerError::classify)?;
        Ok(available)
    }
}

// Implement LedgerWrite only for contracts with ReadWrite marker
#[async_trait]
impl LedgerWrite for LotteryContract<ReadWrite> {
    fn signer_address(&self) -> Address {
        self.signer.unwrap_or_default()
    }

    async fn create_entity(
        &self,
        draft: &EntityDraft,
    ) -> Result<Box<dyn PendingConfirmation>, LedgerError> {
        let encrypted_value = B256::try_from(draft.ciphertext.as_ref()).map_err(|_| {
            LedgerError::InvalidPayload(format!(
                "expected a 32 byte ciphertext handle, got {} bytes",
                draft.ciphertext.len()
            ))
        })?;

        let contract = LottoCrypt::new(self.contract_address, &self.provider);
        let pending = {
            let _guard = NONCE_LOCK.lock().await;
            contract
                .createBusinessData(
                    draft.entity_id.clone(),
                    draft.label.clone(),
                    encrypted_value,
                    draft.proof.clone(),
                    draft.public_value1,
                    draft.public_value2,
                    draft.description.clone(),
                )
                .send()
                .await
                .map_err(LedgerError::classify)?
        };

        info!(entity = %draft.entity_id, tx = %pending.tx_hash(), "entity creation broadcast");
        Ok(Box::new(AlloyPendingTx { inner: pending }))
    }

    async fn submit_decryption_proof(
        &self,
        entity_id: &str,
        clear_values: &Bytes,
        proof: &Bytes,
    ) -> Result<Box<dyn PendingConfirmation>, LedgerError> {
        let contract = LottoCrypt::new(self.contract_address, &self.provider);
        let pending = {
            let _guard = NONCE_LOCK.lock().await;
            contract
                .verifyDecryption(entity_id.to_string(), clear_values.clone(), proof.clone())
                .send()
                .await
                .map_err(LedgerError::classify)?
        };

        info!(entity = %entity_id, tx = %pending.tx_hash(), "decryption proof broadcast");
        Ok(Box::new(AlloyPendingTx { inner: pending }))
    }
}
