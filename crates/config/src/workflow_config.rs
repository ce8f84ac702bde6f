// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_RELAYER_URL: &str = "https://relayer.testnet.zama.cloud";

/// Connection settings for the FHE relayer
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RelayerConfig {
    pub url: String,
    pub timeout_ms: u64,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RELAYER_URL.to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl RelayerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Tuning for the submission and verification workflow
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    /// How long a terminal status stays visible before resetting to idle
    pub status_reset_ms: u64,
    /// Width of the encrypted integer type on the contract (euint32)
    pub plaintext_bits: u32,
    /// Prize pool contribution of every ticket when a draw is created
    pub prize_per_ticket: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            status_reset_ms: 3000,
            plaintext_bits: 32,
            prize_per_ticket: 10,
        }
    }
}

impl WorkflowConfig {
    pub fn status_reset(&self) -> Duration {
        Duration::from_millis(self.status_reset_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.plaintext_bits == 0 || self.plaintext_bits > 64 {
            bail!(
                "workflow.plaintext_bits must be between 1 and 64, got {}",
                self.plaintext_bits
            );
        }
        Ok(())
    }
}
