// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! Client side workflow for submitting FHE encrypted lottery entries and cooperating in their
//! verifiable decryption.
//!
//! The [`WorkflowCoordinator`] is the entry point. It sequences the [`EncryptionGateway`] and the
//! [`ContractSubmitter`] when tickets and draws are created and drives the
//! [`DecryptionVerifier`] state machine when a ticket is verified.

mod catalog;
mod commands;
mod coordinator;
mod error;
mod gateway;
mod lock;
mod status;
mod submitter;
mod verifier;

pub use catalog::*;
pub use commands::*;
pub use coordinator::*;
pub use error::*;
pub use gateway::*;
pub use lock::*;
pub use status::*;
pub use submitter::*;
pub use verifier::*;
