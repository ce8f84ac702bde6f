// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::helpers::{connect_catalog, print_json, signer_address};
use anyhow::Result;
use lotto_config::AppConfig;

pub async fn execute(config: &AppConfig, mine: bool, json: bool) -> Result<()> {
    let catalog = connect_catalog(config).await?;
    let tickets = if mine {
        catalog.user_history(signer_address(config)?).await?
    } else {
        catalog.tickets().await?
    };

    if json {
        return print_json(&tickets);
    }

    if tickets.is_empty() {
        println!("No tickets yet");
        return Ok(());
    }

    for ticket in tickets {
        let status = if ticket.is_verified {
            format!("verified ({})", ticket.decrypted_value)
        } else {
            "pending".to_string()
        };
        println!(
            "{:<24} {}  {}  {}",
            ticket.id,
            ticket.created_at.format("%Y-%m-%d %H:%M:%S"),
            ticket.creator,
            status
        );
    }
    Ok(())
}
