// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    Catalog, ContractSubmitter, DecryptionVerifier, DrawCommand, EncryptionGateway, EntityKind,
    EntityPlan, KeyedLock, Result, StatusBoard, StatusRegistry, TicketCommand,
    VerificationRequest, WorkflowError, WorkflowPhase, WorkflowStatus, DEFAULT_PLAINTEXT_BITS,
    DEFAULT_STATUS_RESET,
};
use alloy::primitives::{Address, Bytes, U256};
use chrono::{DateTime, Utc};
use lotto_evm::{EntityDraft, Ledger, TxReceipt};
use lotto_fhe::FheSdk;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, instrument, warn};

pub const DEFAULT_PRIZE_PER_TICKET: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    pub status_reset: Duration,
    pub plaintext_bits: u32,
    pub prize_per_ticket: u64,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            status_reset: DEFAULT_STATUS_RESET,
            plaintext_bits: DEFAULT_PLAINTEXT_BITS,
            prize_per_ticket: DEFAULT_PRIZE_PER_TICKET,
        }
    }
}

/// An entity as it was handed to the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncryptedSubmission {
    pub entity_id: String,
    pub ciphertext: Bytes,
    pub proof: Bytes,
    pub owner_address: Address,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEntity {
    pub kind: EntityKind,
    pub label: String,
    pub submission: EncryptedSubmission,
    pub receipt: TxReceipt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The ledger had already verified the entity. Nothing was written.
    AlreadyVerified(VerificationRequest),
    Verified {
        request: VerificationRequest,
        receipt: TxReceipt,
        decrypted_value: u64,
    },
}

impl VerificationOutcome {
    pub fn request(&self) -> &VerificationRequest {
        match self {
            VerificationOutcome::AlreadyVerified(request) => request,
            VerificationOutcome::Verified { request, .. } => request,
        }
    }
}

fn verification_failure_message(err: &WorkflowError) -> String {
    if err.is_user_rejection() {
        "Transaction rejected".to_string()
    } else {
        format!("Verification failed: {}", err)
    }
}

/// Where the plan of a creation comes from. Draws need the ledger first.
enum PlanSource<'a> {
    Ready(EntityPlan),
    Draw(&'a DrawCommand),
}

fn failure_message(kind: EntityKind, err: &WorkflowError) -> String {
    match err {
        WorkflowError::UserRejected(_) => "Transaction rejected".to_string(),
        _ => match kind {
            EntityKind::Ticket => format!("Ticket creation failed: {}", err),
            EntityKind::Draw => format!("Draw creation failed: {}", err),
        },
    }
}

/// Sequences encryption, submission and verification for tickets and draws
pub struct WorkflowCoordinator<L, S> {
    ledger: Arc<L>,
    sdk: Arc<S>,
    gateway: EncryptionGateway<S>,
    submitter: ContractSubmitter<L>,
    verifier: DecryptionVerifier<L, S>,
    catalog: Catalog<L>,
    locks: KeyedLock,
    statuses: StatusRegistry,
    setup: StatusBoard,
    prize_per_ticket: u64,
}

impl<L: Ledger, S: FheSdk> WorkflowCoordinator<L, S> {
    pub fn new(ledger: Arc<L>, sdk: Arc<S>, settings: CoordinatorSettings) -> Self {
        let statuses = StatusRegistry::new(settings.status_reset);
        Self {
            gateway: EncryptionGateway::new(sdk.clone(), settings.plaintext_bits),
            submitter: ContractSubmitter::new(ledger.clone()),
            verifier: DecryptionVerifier::new(ledger.clone(), sdk.clone()),
            catalog: Catalog::new(ledger.clone()),
            locks: KeyedLock::new(),
            setup: statuses.detached(),
            statuses,
            prize_per_ticket: settings.prize_per_ticket,
            ledger,
            sdk,
        }
    }

    /// Follow the workflow of one entity. Subscribing before it starts sees every phase.
    pub fn subscribe(&self, entity_id: &str) -> watch::Receiver<WorkflowStatus> {
        self.statuses.subscribe(entity_id)
    }

    pub fn status(&self, entity_id: &str) -> WorkflowStatus {
        self.statuses.current(entity_id)
    }

    /// Every status published by any workflow, including attempts turned away by the lock
    pub fn events(&self) -> broadcast::Receiver<WorkflowStatus> {
        self.statuses.events()
    }

    /// Outcome of [`Self::initialize`]
    pub fn initialization_status(&self) -> WorkflowStatus {
        self.setup.current()
    }

    pub fn catalog(&self) -> &Catalog<L> {
        &self.catalog
    }

    pub fn verifier(&self) -> &DecryptionVerifier<L, S> {
        &self.verifier
    }

    pub fn locks(&self) -> &KeyedLock {
        &self.locks
    }

    pub fn signer_address(&self) -> Address {
        self.ledger.signer_address()
    }

    /// Load the FHE key material. Everything else needs this first.
    pub async fn initialize(&self) -> Result<()> {
        if let Err(e) = self.sdk.initialize().await {
            error!(error = %e, "FHE initialization failed");
            self.setup
                .publish(WorkflowPhase::Failed, "FHE initialization failed", "");
            return Err(WorkflowError::EncryptionUnavailable(e.to_string()));
        }
        info!("FHE SDK initialized");
        self.setup
            .publish(WorkflowPhase::Succeeded, "FHE initialized", "");
        Ok(())
    }

    pub async fn create_ticket(&self, command: &TicketCommand) -> Result<CreatedEntity> {
        self.create(command.plan()).await
    }

    /// Create a draw whose prize pool covers every ticket sold so far
    #[instrument(skip_all, fields(entity_id = %command.entity_id(), kind = %EntityKind::Draw))]
    pub async fn create_draw(&self, command: &DrawCommand) -> Result<CreatedEntity> {
        self.create_from(EntityKind::Draw, &command.entity_id(), PlanSource::Draw(command))
            .await
    }

    #[instrument(skip_all, fields(entity_id = %plan.entity_id, kind = %plan.kind))]
    pub async fn create(&self, plan: EntityPlan) -> Result<CreatedEntity> {
        let kind = plan.kind;
        let entity_id = plan.entity_id.clone();
        self.create_from(kind, &entity_id, PlanSource::Ready(plan))
            .await
    }

    async fn create_from(
        &self,
        kind: EntityKind,
        entity_id: &str,
        source: PlanSource<'_>,
    ) -> Result<CreatedEntity> {
        let Some(_guard) = self.locks.try_acquire(entity_id) else {
            let e = WorkflowError::DuplicateEntity(entity_id.to_string());
            warn!(error = %e, "Creation already in flight");
            self.statuses
                .detached()
                .publish(WorkflowPhase::Failed, failure_message(kind, &e), entity_id);
            return Err(e);
        };
        let status = self.statuses.board(entity_id);

        let result = match source {
            PlanSource::Ready(plan) => self.run_create(&plan, &status).await,
            PlanSource::Draw(command) => match self.catalog.count(EntityKind::Ticket).await {
                Ok(tickets) => {
                    let plan = command.plan(tickets as u64, self.prize_per_ticket);
                    self.run_create(&plan, &status).await
                }
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(created) => {
                let message = match kind {
                    EntityKind::Ticket => "Ticket created successfully!",
                    EntityKind::Draw => "Draw created successfully!",
                };
                status.publish(WorkflowPhase::Succeeded, message, entity_id);
                Ok(created)
            }
            Err(e) => {
                error!(error = %e, "Creation failed");
                status.publish(WorkflowPhase::Failed, failure_message(kind, &e), entity_id);
                Err(e)
            }
        }
    }

    async fn run_create(&self, plan: &EntityPlan, status: &StatusBoard) -> Result<CreatedEntity> {
        let contract = self.ledger.contract_address();
        let owner = self.ledger.signer_address();
        let entity_id = plan.entity_id.as_str();

        status.publish(
            WorkflowPhase::Encrypting,
            format!("Encrypting {} with FHE...", plan.kind),
            entity_id,
        );
        let input = self.gateway.encrypt(contract, owner, plan.plaintext).await?;

        status.publish(
            WorkflowPhase::AwaitingConfirmation,
            "Waiting for blockchain confirmation...",
            entity_id,
        );
        let draft = EntityDraft {
            entity_id: plan.entity_id.clone(),
            label: plan.label.clone(),
            ciphertext: input.ciphertext.clone(),
            proof: input.proof.clone(),
            public_value1: U256::from(plan.public_value1),
            public_value2: U256::from(plan.public_value2),
            description: plan.description.clone(),
        };
        let receipt = self.submitter.submit(&draft).await?;

        Ok(CreatedEntity {
            kind: plan.kind,
            label: plan.label.clone(),
            submission: EncryptedSubmission {
                entity_id: plan.entity_id.clone(),
                ciphertext: input.ciphertext,
                proof: input.proof,
                owner_address: owner,
                created_at: plan.created_at,
            },
            receipt,
        })
    }

    /// Run the whole decryption proof protocol for one entity
    #[instrument(skip(self))]
    pub async fn verify(&self, entity_id: &str) -> Result<VerificationOutcome> {
        let Some(_guard) = self.locks.try_acquire(entity_id) else {
            let e = WorkflowError::VerificationInProgress(entity_id.to_string());
            warn!(error = %e, "Verification already in flight");
            self.statuses.detached().publish(
                WorkflowPhase::Failed,
                verification_failure_message(&e),
                entity_id,
            );
            return Err(e);
        };
        let status = self.statuses.board(entity_id);

        status.publish(WorkflowPhase::Verifying, "Verifying ticket...", entity_id);

        let result = self.run_verify(entity_id).await;
        let request = self.verifier.acknowledge(entity_id);

        let outcome = match (result, request) {
            (Ok(receipt), Some(request)) => match request.decrypted_value {
                Some(decrypted_value) => Ok(VerificationOutcome::Verified {
                    request,
                    receipt,
                    decrypted_value,
                }),
                None => Err(WorkflowError::ProofUnavailable(format!(
                    "verification of '{}' finished without a clear value",
                    entity_id
                ))),
            },
            (Err(WorkflowError::AlreadyVerified(_)), Some(request)) => {
                Ok(VerificationOutcome::AlreadyVerified(request))
            }
            (Err(e), _) => Err(e),
            (Ok(_), None) => Err(WorkflowError::InvalidInput(format!(
                "verification of '{}' finished without a request",
                entity_id
            ))),
        };

        match &outcome {
            Ok(VerificationOutcome::Verified { .. }) => {
                status.publish(
                    WorkflowPhase::Succeeded,
                    "Ticket verified successfully!",
                    entity_id,
                );
            }
            Ok(VerificationOutcome::AlreadyVerified(_)) => {
                status.publish(WorkflowPhase::Succeeded, "Ticket already verified", entity_id);
            }
            Err(e) => {
                error!(error = %e, "Verification failed");
                status.publish(
                    WorkflowPhase::Failed,
                    verification_failure_message(e),
                    entity_id,
                );
            }
        }
        outcome
    }

    async fn run_verify(&self, entity_id: &str) -> Result<TxReceipt> {
        let handle = self.verifier.begin_verification(entity_id).await?;
        let bundle = self
            .verifier
            .request_proof(handle, self.ledger.contract_address())
            .await?;
        self.verifier
            .finalize(entity_id, &bundle.clear_values, &bundle.proof)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages_separate_rejection() {
        assert_eq!(
            failure_message(EntityKind::Ticket, &WorkflowError::UserRejected("4001".into())),
            "Transaction rejected"
        );
        assert_eq!(
            failure_message(
                EntityKind::Draw,
                &WorkflowError::SubmissionFailed("rpc down".into())
            ),
            "Draw creation failed: Submission failed: rpc down"
        );
    }

    #[test]
    fn test_verification_messages() {
        assert_eq!(
            verification_failure_message(&WorkflowError::UserRejected("4001".into())),
            "Transaction rejected"
        );
        assert_eq!(
            verification_failure_message(&WorkflowError::VerificationInProgress(
                "ticket-1".into()
            )),
            "Verification failed: Verification of 'ticket-1' is already in progress"
        );
    }

    #[test]
    fn test_default_settings() {
        let settings = CoordinatorSettings::default();
        assert_eq!(settings.status_reset, Duration::from_millis(3000));
        assert_eq!(settings.plaintext_bits, 32);
        assert_eq!(settings.prize_per_ticket, 10);
    }
}
