// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{Result, WorkflowError};
use alloy::primitives::{Address, Bytes, B256};
use lotto_evm::{Ledger, TxReceipt};
use lotto_fhe::{decode_clear_values, DecryptionBundle, FheSdk};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};

/// Progress of a verification. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationState {
    Pending,
    AwaitingProof,
    Submitted,
    Verified,
    Failed,
}

impl VerificationState {
    fn rank(&self) -> u8 {
        match self {
            VerificationState::Pending => 0,
            VerificationState::AwaitingProof => 1,
            VerificationState::Submitted => 2,
            VerificationState::Verified | VerificationState::Failed => 3,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VerificationState::Verified | VerificationState::Failed
        )
    }

    pub fn can_advance_to(&self, next: VerificationState) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl fmt::Display for VerificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VerificationState::Pending => "pending",
            VerificationState::AwaitingProof => "awaiting_proof",
            VerificationState::Submitted => "submitted",
            VerificationState::Verified => "verified",
            VerificationState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    pub entity_id: String,
    /// Known once the ledger has handed it out
    pub ciphertext_handle: Option<B256>,
    pub state: VerificationState,
    /// First clear value of the decryption proof, known from `Submitted` on
    pub decrypted_value: Option<u64>,
    /// Set when the request failed
    pub failure: Option<WorkflowError>,
    proof_requested: bool,
}

impl VerificationRequest {
    fn pending(entity_id: &str) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            ciphertext_handle: None,
            state: VerificationState::Pending,
            decrypted_value: None,
            failure: None,
            proof_requested: false,
        }
    }
}

/// Drives the decryption proof protocol for each entity
pub struct DecryptionVerifier<L, S> {
    ledger: Arc<L>,
    sdk: Arc<S>,
    requests: Arc<Mutex<HashMap<String, VerificationRequest>>>,
}

impl<L, S> Clone for DecryptionVerifier<L, S> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            sdk: self.sdk.clone(),
            requests: self.requests.clone(),
        }
    }
}

impl<L: Ledger, S: FheSdk> DecryptionVerifier<L, S> {
    pub fn new(ledger: Arc<L>, sdk: Arc<S>) -> Self {
        Self {
            ledger,
            sdk,
            requests: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn requests(&self) -> MutexGuard<'_, HashMap<String, VerificationRequest>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the request for an entity
    pub fn request(&self, entity_id: &str) -> Option<VerificationRequest> {
        self.requests().get(entity_id).cloned()
    }

    pub fn in_flight(&self) -> usize {
        self.requests()
            .values()
            .filter(|r| !r.state.is_terminal())
            .count()
    }

    /// Remove a finished request and hand it back. In-flight requests stay put.
    pub fn acknowledge(&self, entity_id: &str) -> Option<VerificationRequest> {
        let mut requests = self.requests();
        match requests.get(entity_id) {
            Some(request) if request.state.is_terminal() => requests.remove(entity_id),
            _ => None,
        }
    }

    fn claim(&self, entity_id: &str) -> Result<()> {
        let mut requests = self.requests();
        if let Some(existing) = requests.get(entity_id) {
            if !existing.state.is_terminal() {
                return Err(WorkflowError::VerificationInProgress(entity_id.to_string()));
            }
        }
        requests.insert(entity_id.to_string(), VerificationRequest::pending(entity_id));
        Ok(())
    }

    fn advance(
        &self,
        entity_id: &str,
        next: VerificationState,
        update: impl FnOnce(&mut VerificationRequest),
    ) -> Result<VerificationRequest> {
        let mut requests = self.requests();
        let request = requests.get_mut(entity_id).ok_or_else(|| {
            WorkflowError::InvalidInput(format!("no verification request for '{}'", entity_id))
        })?;

        if !request.state.can_advance_to(next) {
            return Err(WorkflowError::InvalidInput(format!(
                "verification of '{}' cannot move from {} to {}",
                entity_id, request.state, next
            )));
        }

        request.state = next;
        update(request);
        Ok(request.clone())
    }

    fn fail(&self, entity_id: &str, err: WorkflowError) -> WorkflowError {
        let mut requests = self.requests();
        if let Some(request) = requests.get_mut(entity_id) {
            if !request.state.is_terminal() {
                request.state = VerificationState::Failed;
                request.failure = Some(err.clone());
            }
        }
        warn!(entity_id, error = %err, "Verification failed");
        err
    }

    fn expect_state(&self, entity_id: &str, expected: VerificationState) -> Result<()> {
        match self.requests().get(entity_id).map(|r| r.state) {
            Some(state) if state == expected => Ok(()),
            Some(state) => Err(WorkflowError::InvalidInput(format!(
                "verification of '{}' is {}, expected {}",
                entity_id, state, expected
            ))),
            None => Err(WorkflowError::InvalidInput(format!(
                "no verification request for '{}'",
                entity_id
            ))),
        }
    }

    /// Start verifying an entity and return the handle of its ciphertext.
    ///
    /// The slot is claimed before the first await, so a second call for the same entity gets
    /// `VerificationInProgress` until this one reaches a terminal state. A verified entity
    /// short-circuits with `AlreadyVerified` and the request lands in `Verified` without any
    /// SDK or write call.
    pub async fn begin_verification(&self, entity_id: &str) -> Result<B256> {
        self.claim(entity_id)?;

        let record = match self.ledger.get_entity_data(entity_id).await {
            Ok(record) => record,
            Err(e) => return Err(self.fail(entity_id, WorkflowError::from_submission(e))),
        };

        if record.is_verified {
            self.advance(entity_id, VerificationState::Verified, |_| {})?;
            info!(entity_id, "Entity already verified");
            return Err(WorkflowError::AlreadyVerified(entity_id.to_string()));
        }

        let handle = match self.ledger.get_encrypted_value_handle(entity_id).await {
            Ok(handle) => handle,
            Err(e) => return Err(self.fail(entity_id, WorkflowError::from_submission(e))),
        };

        self.advance(entity_id, VerificationState::AwaitingProof, |request| {
            request.ciphertext_handle = Some(handle)
        })?;
        info!(entity_id, handle = %handle, "Verification started");
        Ok(handle)
    }

    /// Mark the proof of `handle` as requested and return its entity. Only one caller gets it.
    fn claim_proof(&self, handle: B256) -> Result<String> {
        let mut requests = self.requests();
        let request = requests
            .values_mut()
            .find(|r| r.ciphertext_handle == Some(handle) && !r.state.is_terminal())
            .ok_or_else(|| {
                WorkflowError::InvalidInput(format!("no verification is awaiting handle {}", handle))
            })?;

        if request.state != VerificationState::AwaitingProof || request.proof_requested {
            return Err(WorkflowError::VerificationInProgress(
                request.entity_id.clone(),
            ));
        }
        request.proof_requested = true;
        Ok(request.entity_id.clone())
    }

    /// Ask the SDK for the decryption of `handle` and the proof binding it. Nothing is
    /// written on-chain here. Clear values that do not decode fail the request.
    pub async fn request_proof(
        &self,
        handle: B256,
        contract: Address,
    ) -> Result<DecryptionBundle> {
        let entity_id = self.claim_proof(handle)?;

        let bundle = match self.sdk.request_decryption_proof(&[handle], contract).await {
            Ok(bundle) => bundle,
            Err(e) => {
                error!(entity_id, error = %e, "Decryption proof request failed");
                return Err(self.fail(&entity_id, WorkflowError::ProofUnavailable(e.to_string())));
            }
        };

        let value = match decode_clear_values(&bundle.clear_values) {
            Ok(values) => match values.first() {
                Some(value) => *value,
                None => {
                    let err = WorkflowError::ProofUnavailable("no clear values returned".into());
                    return Err(self.fail(&entity_id, err));
                }
            },
            Err(e) => {
                let err = WorkflowError::ProofUnavailable(format!("malformed clear values: {}", e));
                return Err(self.fail(&entity_id, err));
            }
        };

        self.advance(&entity_id, VerificationState::Submitted, |request| {
            request.decrypted_value = Some(value)
        })?;
        info!(entity_id, "Decryption proof received");
        Ok(bundle)
    }

    /// Hand the clear values and proof to the ledger and wait for it to accept them
    pub async fn finalize(
        &self,
        entity_id: &str,
        clear_values: &Bytes,
        proof: &Bytes,
    ) -> Result<TxReceipt> {
        self.expect_state(entity_id, VerificationState::Submitted)?;

        let pending = match self
            .ledger
            .submit_decryption_proof(entity_id, clear_values, proof)
            .await
        {
            Ok(pending) => pending,
            Err(e) => return Err(self.fail(entity_id, WorkflowError::from_finalize(e))),
        };

        let receipt = match pending.confirm().await {
            Ok(receipt) => receipt,
            Err(e) => return Err(self.fail(entity_id, WorkflowError::from_finalize(e))),
        };

        self.advance(entity_id, VerificationState::Verified, |_| {})?;
        info!(entity_id, tx_hash = %receipt.tx_hash, "Decryption verified on-chain");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use VerificationState::*;

    #[test]
    fn test_transitions_are_monotonic() {
        assert!(Pending.can_advance_to(AwaitingProof));
        assert!(Pending.can_advance_to(Verified));
        assert!(AwaitingProof.can_advance_to(Failed));
        assert!(Submitted.can_advance_to(Verified));
        assert!(!Submitted.can_advance_to(AwaitingProof));
        assert!(!AwaitingProof.can_advance_to(AwaitingProof));
        assert!(!Verified.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Verified));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(AwaitingProof.to_string(), "awaiting_proof");
        assert!(Failed.is_terminal());
        assert!(!Submitted.is_terminal());
    }
}
