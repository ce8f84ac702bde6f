// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::helpers::{connect_catalog, print_json};
use anyhow::Result;
use lotto_config::AppConfig;

pub async fn execute(config: &AppConfig, json: bool) -> Result<()> {
    let stats = connect_catalog(config).await?.stats().await?;

    if json {
        return print_json(&stats);
    }

    println!("Tickets:     {}", stats.total_tickets);
    println!("Draws:       {}", stats.total_draws);
    println!("Total prize: {}", stats.total_prize);
    Ok(())
}
