// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use lotto_config::AppConfig;
use lotto_evm::{LotteryContractFactory, LotteryReadContract, LotteryWriteContract};
use lotto_fhe::RelayerClient;
use lotto_workflow::{Catalog, CoordinatorSettings, WorkflowCoordinator, WorkflowStatus};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::debug;

pub mod telemetry;

pub type Coordinator = WorkflowCoordinator<LotteryWriteContract, RelayerClient>;

pub fn settings(config: &AppConfig) -> CoordinatorSettings {
    let workflow = config.workflow();
    CoordinatorSettings {
        status_reset: workflow.status_reset(),
        plaintext_bits: workflow.plaintext_bits,
        prize_per_ticket: workflow.prize_per_ticket,
    }
}

/// Connect a signing client and load the FHE keys
pub async fn connect_coordinator(config: &AppConfig) -> Result<Coordinator> {
    let rpc = config.chain().rpc_url()?;
    let contract = LotteryContractFactory::create_write(
        &rpc.as_http_url()?,
        config.lottery_address()?,
        config.private_key()?,
    )
    .await
    .context("Could not connect the signing provider")?;

    let relayer = config.relayer();
    let sdk = RelayerClient::new(
        &relayer.url,
        relayer.timeout(),
        config.workflow().plaintext_bits,
    )?;

    let coordinator = WorkflowCoordinator::new(Arc::new(contract), Arc::new(sdk), settings(config));
    coordinator
        .initialize()
        .await
        .with_context(|| format!("Relayer at {} is not usable", relayer.url))?;
    Ok(coordinator)
}

/// Connect a read-only client
pub async fn connect_catalog(config: &AppConfig) -> Result<Catalog<LotteryReadContract>> {
    let rpc = config.chain().rpc_url()?;
    let contract =
        LotteryContractFactory::create_read(&rpc.as_http_url()?, config.lottery_address()?)
            .await
            .context("Could not connect the provider")?;
    Ok(Catalog::new(Arc::new(contract)))
}

/// Address of the configured signer
pub fn signer_address(config: &AppConfig) -> Result<Address> {
    let signer: PrivateKeySigner = config
        .private_key()?
        .parse()
        .context("signer.private_key is not a valid private key")?;
    Ok(signer.address())
}

/// Echo progress to stderr. Outcomes are printed by the commands themselves.
pub fn follow_status(mut events: broadcast::Receiver<WorkflowStatus>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let current = match events.recv().await {
                Ok(status) => status,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "status updates skipped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            debug!(phase = %current.phase, entity_id = ?current.entity_id, "status changed");
            if !current.phase.is_terminal() && !current.message.is_empty() {
                eprintln!("{}", current.message);
            }
        }
    })
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
