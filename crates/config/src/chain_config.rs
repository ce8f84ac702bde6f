// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::rpc::RPC;
use alloy_primitives::Address;
use anyhow::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Hash, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContractAddresses {
    /// The lottery contract holding tickets and draws
    pub lottery: String,
}

#[derive(Debug, Clone, PartialEq, Hash, Eq, Deserialize, Serialize)]
pub struct ChainConfig {
    pub name: String,
    pub rpc_url: String,
    pub contracts: ContractAddresses,
    pub chain_id: Option<u64>,
}

impl ChainConfig {
    pub fn rpc_url(&self) -> Result<RPC> {
        RPC::from_url(&self.rpc_url)
            .map_err(|e| anyhow!("Failed to parse RPC URL for chain {}: {}", self.name, e))
    }

    pub fn lottery_address(&self) -> Result<Address> {
        self.contracts.lottery.parse().map_err(|e| {
            anyhow!(
                "Invalid lottery contract address '{}' for chain {}: {}",
                self.contracts.lottery,
                self.name,
                e
            )
        })
    }
}

/// Signing material for the write provider
#[derive(Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SignerConfig {
    /// Hex encoded private key. Prefer `${LOTTO_PRIVATE_KEY}` over a literal value.
    pub private_key: Option<String>,
}

impl fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerConfig")
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
