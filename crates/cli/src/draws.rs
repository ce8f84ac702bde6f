// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::helpers::{connect_catalog, print_json};
use anyhow::Result;
use lotto_config::AppConfig;

pub async fn execute(config: &AppConfig, json: bool) -> Result<()> {
    let draws = connect_catalog(config).await?.draws().await?;

    if json {
        return print_json(&draws);
    }

    if draws.is_empty() {
        println!("No draws yet");
        return Ok(());
    }

    for draw in draws {
        println!(
            "{:<24} {}  prize {}  {}",
            draw.id,
            draw.draw_time.format("%Y-%m-%d %H:%M:%S"),
            draw.total_prize,
            if draw.is_completed { "completed" } else { "open" }
        );
    }
    Ok(())
}
