// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::helpers::{connect_coordinator, follow_status};
use anyhow::Result;
use lotto_config::AppConfig;
use lotto_workflow::VerificationOutcome;

pub async fn execute(config: &AppConfig, id: &str) -> Result<()> {
    let coordinator = connect_coordinator(config).await?;
    let _progress = follow_status(coordinator.events());

    match coordinator.verify(id).await? {
        VerificationOutcome::AlreadyVerified(_) => {
            println!("Ticket already verified");
        }
        VerificationOutcome::Verified {
            receipt,
            decrypted_value,
            ..
        } => {
            println!("Ticket verified successfully!");
            println!("  decrypted value: {}", decrypted_value);
            println!("  tx:              {}", receipt.tx_hash);
        }
    }
    Ok(())
}
