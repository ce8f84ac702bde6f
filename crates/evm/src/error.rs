// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::fmt::Display;
use thiserror::Error;

/// Failures reported by the ledger collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Signer rejected the request: {0}")]
    UserRejected(String),

    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl LedgerError {
    /// Sort a provider or contract error into the ledger taxonomy by its message. Wallets report
    /// rejection as EIP-1193 code 4001 or with a "user rejected"/"user denied" message.
    pub fn classify(err: impl Display) -> Self {
        let msg = err.to_string();
        let lower = msg.to_lowercase();
        if lower.contains("user rejected")
            || lower.contains("user denied")
            || lower.contains("error code 4001")
        {
            LedgerError::UserRejected(msg)
        } else if lower.contains("revert") {
            LedgerError::Reverted(msg)
        } else {
            LedgerError::Transport(msg)
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, LedgerError::UserRejected(_))
    }
}
