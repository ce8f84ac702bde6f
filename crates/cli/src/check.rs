// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::helpers::connect_catalog;
use anyhow::{bail, Result};
use lotto_config::AppConfig;

pub async fn execute(config: &AppConfig) -> Result<()> {
    let address = config.lottery_address()?;
    let rpc = config.chain().rpc_url()?;
    let catalog = connect_catalog(config).await?;

    if !catalog.is_available().await {
        bail!(
            "Lottery contract {} on {} is not responding at {}",
            address,
            config.chain().name,
            rpc.url()
        );
    }

    println!("Lottery contract {} on {} is available", address, config.chain().name);
    Ok(())
}
