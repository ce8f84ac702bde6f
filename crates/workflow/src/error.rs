// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use lotto_evm::LedgerError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Encryption unavailable: {0}")]
    EncryptionUnavailable(String),

    #[error("Entity '{0}' already exists")]
    DuplicateEntity(String),

    #[error("Request rejected by the signer: {0}")]
    UserRejected(String),

    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Entity '{0}' is already verified")]
    AlreadyVerified(String),

    #[error("Verification of '{0}' is already in progress")]
    VerificationInProgress(String),

    #[error("Decryption proof unavailable: {0}")]
    ProofUnavailable(String),

    #[error("Ledger rejected the decryption proof: {0}")]
    OnChainRejection(String),
}

/// Result that returns a type T or a WorkflowError
pub type Result<T> = std::result::Result<T, WorkflowError>;

impl WorkflowError {
    /// Idempotent short-circuits that callers should treat as success
    pub fn is_success_like(&self) -> bool {
        matches!(self, WorkflowError::AlreadyVerified(_))
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, WorkflowError::UserRejected(_))
    }

    /// Map a failure of an entity creation or any read
    pub(crate) fn from_submission(err: LedgerError) -> Self {
        match err {
            LedgerError::UserRejected(msg) => WorkflowError::UserRejected(msg),
            LedgerError::InvalidPayload(msg) | LedgerError::NotFound(msg) => {
                WorkflowError::InvalidInput(msg)
            }
            LedgerError::Reverted(msg) | LedgerError::Transport(msg) => {
                WorkflowError::SubmissionFailed(msg)
            }
        }
    }

    /// Map a failure while handing a decryption proof to the ledger
    pub(crate) fn from_finalize(err: LedgerError) -> Self {
        match err {
            LedgerError::Reverted(msg) => WorkflowError::OnChainRejection(msg),
            other => WorkflowError::from_submission(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_already_verified_is_success_like() {
        assert!(WorkflowError::AlreadyVerified("ticket-1".into()).is_success_like());
        assert!(!WorkflowError::OnChainRejection("bad proof".into()).is_success_like());
        assert!(!WorkflowError::VerificationInProgress("ticket-1".into()).is_success_like());
    }

    #[test]
    fn test_ledger_mapping() {
        assert_eq!(
            WorkflowError::from_submission(LedgerError::UserRejected("4001".into())),
            WorkflowError::UserRejected("4001".into())
        );
        assert_eq!(
            WorkflowError::from_submission(LedgerError::Reverted("nope".into())),
            WorkflowError::SubmissionFailed("nope".into())
        );
        assert_eq!(
            WorkflowError::from_finalize(LedgerError::Reverted("Invalid proof".into())),
            WorkflowError::OnChainRejection("Invalid proof".into())
        );
        assert_eq!(
            WorkflowError::from_finalize(LedgerError::Transport("timeout".into())),
            WorkflowError::SubmissionFailed("timeout".into())
        );
    }
}
