// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::helpers::{connect_coordinator, follow_status};
use anyhow::Result;
use lotto_config::AppConfig;
use lotto_workflow::TicketCommand;

pub async fn execute(config: &AppConfig, numbers: Option<Vec<u8>>) -> Result<()> {
    let command = match numbers {
        Some(numbers) => TicketCommand::new(&numbers)?,
        None => TicketCommand::random(&mut rand::thread_rng()),
    };

    let coordinator = connect_coordinator(config).await?;
    let _progress = follow_status(coordinator.events());
    let created = coordinator.create_ticket(&command).await?;

    println!("Ticket created successfully!");
    println!("  id:      {}", created.submission.entity_id);
    println!("  label:   {}", created.label);
    println!("  numbers: {}", command.numbers());
    println!("  tx:      {}", created.receipt.tx_hash);
    Ok(())
}
