// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::primitives::U256;
use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use lotto_evm::{LedgerRead, LedgerWrite};
use lotto_test_helpers::{init_test_tracing, InMemoryLedger, SimulatedFheSdk};
use lotto_workflow::{
    CoordinatorSettings, DrawCommand, TicketCommand, WorkflowCoordinator, WorkflowError,
    WorkflowPhase, WorkflowStatus,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

type Coordinator = WorkflowCoordinator<InMemoryLedger, SimulatedFheSdk>;

fn at(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

fn ticket(numbers: &[u8], millis: i64) -> TicketCommand {
    TicketCommand::new(numbers).unwrap().issued_at(at(millis))
}

async fn setup() -> Result<(Arc<InMemoryLedger>, Arc<SimulatedFheSdk>, Coordinator)> {
    init_test_tracing();
    let ledger = Arc::new(InMemoryLedger::new());
    let sdk = Arc::new(SimulatedFheSdk::new());
    let coordinator =
        WorkflowCoordinator::new(ledger.clone(), sdk.clone(), CoordinatorSettings::default());
    coordinator.initialize().await?;
    Ok((ledger, sdk, coordinator))
}

#[tokio::test]
async fn test_ticket_is_stored_unverified() -> Result<()> {
    let (ledger, sdk, coordinator) = setup().await?;

    let created = coordinator
        .create_ticket(&ticket(&[49, 3, 17, 22, 28, 35], 1_700_000_000_000))
        .await?;

    assert_eq!(created.submission.entity_id, "ticket-1700000000000");
    assert_eq!(created.label, "Ticket-170000");
    assert_eq!(created.submission.owner_address, ledger.signer_address());
    assert!(created.receipt.block_number.is_some());

    let record = ledger.get_entity_data("ticket-1700000000000").await?;
    assert!(!record.is_verified);
    assert_eq!(record.decrypted_value, 0);
    assert_eq!(record.creator, ledger.signer_address());
    assert_eq!(record.name, "Ticket-170000");

    let handle = ledger
        .get_encrypted_value_handle("ticket-1700000000000")
        .await?;
    assert_eq!(sdk.plaintext_of(handle), Some(154));

    let status = coordinator.status("ticket-1700000000000");
    assert_eq!(status.phase, WorkflowPhase::Succeeded);
    assert_eq!(status.message, "Ticket created successfully!");
    Ok(())
}

#[tokio::test]
async fn test_user_rejection_fails_without_entity() -> Result<()> {
    let (ledger, _sdk, coordinator) = setup().await?;
    ledger.reject_next_signature();

    let err = coordinator
        .create_ticket(&ticket(&[1, 2, 3, 4, 5, 6], 1_700_000_000_001))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::UserRejected(_)));
    let status = coordinator.status("ticket-1700000000001");
    assert_eq!(status.phase, WorkflowPhase::Failed);
    assert_eq!(status.message, "Transaction rejected");
    assert!(ledger.get_all_entity_ids().await?.is_empty());
    assert!(!coordinator.locks().is_held("ticket-1700000000001"));
    Ok(())
}

#[tokio::test]
async fn test_infrastructure_failure_message() -> Result<()> {
    let (ledger, _sdk, coordinator) = setup().await?;
    ledger.fail_next_write("connection refused");

    let err = coordinator
        .create_ticket(&ticket(&[1, 2, 3, 4, 5, 6], 1_700_000_000_002))
        .await
        .unwrap_err();

    assert_eq!(err, WorkflowError::SubmissionFailed("connection refused".into()));
    let status = coordinator.status("ticket-1700000000002");
    assert_eq!(status.phase, WorkflowPhase::Failed);
    assert!(status.message.starts_with("Ticket creation failed"));
    Ok(())
}

#[tokio::test]
async fn test_duplicate_ticket_is_rejected() -> Result<()> {
    let (ledger, _sdk, coordinator) = setup().await?;
    let command = ticket(&[5, 10, 15, 20, 25, 30], 1_700_000_000_003);

    coordinator.create_ticket(&command).await?;
    let err = coordinator.create_ticket(&command).await.unwrap_err();

    assert_eq!(
        err,
        WorkflowError::DuplicateEntity("ticket-1700000000003".into())
    );
    assert_eq!(ledger.create_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_uninitialized_sdk_blocks_creation() -> Result<()> {
    let ledger = Arc::new(InMemoryLedger::new());
    let sdk = Arc::new(SimulatedFheSdk::new());
    let coordinator =
        WorkflowCoordinator::new(ledger.clone(), sdk.clone(), CoordinatorSettings::default());

    let err = coordinator
        .create_ticket(&ticket(&[1, 2, 3, 4, 5, 6], 1_700_000_000_004))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::EncryptionUnavailable(_)));
    assert_eq!(
        coordinator.status("ticket-1700000000004").phase,
        WorkflowPhase::Failed
    );
    assert_eq!(sdk.encrypt_calls(), 0);
    assert_eq!(ledger.create_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_initialization_failure() -> Result<()> {
    let ledger = Arc::new(InMemoryLedger::new());
    let sdk = Arc::new(SimulatedFheSdk::new());
    sdk.fail_initialize("key url unreachable");
    let coordinator = WorkflowCoordinator::new(ledger, sdk, CoordinatorSettings::default());

    let err = coordinator.initialize().await.unwrap_err();
    assert_eq!(
        err,
        WorkflowError::EncryptionUnavailable("key url unreachable".into())
    );
    let status = coordinator.initialization_status();
    assert_eq!(status.phase, WorkflowPhase::Failed);
    assert_eq!(status.message, "FHE initialization failed");
    assert_eq!(status.entity_id, None);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_status_walks_through_phases_and_resets() -> Result<()> {
    let (ledger, _sdk, coordinator) = setup().await?;
    ledger.set_confirmation_delay(Duration::from_secs(1));
    let coordinator = Arc::new(coordinator);

    let task = tokio::spawn({
        let coordinator = coordinator.clone();
        async move {
            coordinator
                .create_ticket(&ticket(&[7, 14, 21, 28, 35, 42], 1_700_000_000_005))
                .await
        }
    });

    tokio::time::sleep(Duration::from_millis(500)).await;
    let status = coordinator.status("ticket-1700000000005");
    assert_eq!(status.phase, WorkflowPhase::AwaitingConfirmation);
    assert_eq!(status.message, "Waiting for blockchain confirmation...");
    assert_eq!(status.entity_id.as_deref(), Some("ticket-1700000000005"));
    assert!(coordinator.locks().is_held("ticket-1700000000005"));

    task.await??;
    assert_eq!(
        coordinator.status("ticket-1700000000005").phase,
        WorkflowPhase::Succeeded
    );
    assert!(!coordinator.locks().is_held("ticket-1700000000005"));

    tokio::time::sleep(Duration::from_millis(3001)).await;
    assert_eq!(
        coordinator.status("ticket-1700000000005"),
        WorkflowStatus::idle()
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_same_entity_is_single_flight() -> Result<()> {
    let (ledger, _sdk, coordinator) = setup().await?;
    ledger.set_confirmation_delay(Duration::from_secs(2));
    let command = ticket(&[2, 4, 6, 8, 10, 12], 1_700_000_000_006);
    let mut events = coordinator.events();

    let (first, second) = tokio::join!(
        coordinator.create_ticket(&command),
        coordinator.create_ticket(&command)
    );

    let errors: Vec<WorkflowError> = [first, second]
        .into_iter()
        .filter_map(|result| result.err())
        .collect();
    assert_eq!(
        errors,
        vec![WorkflowError::DuplicateEntity("ticket-1700000000006".into())]
    );
    assert_eq!(ledger.create_calls(), 1);

    // the turned away attempt fails on its own, the winner keeps its status
    let (failed, progress): (Vec<WorkflowStatus>, Vec<WorkflowStatus>) =
        std::iter::from_fn(|| events.try_recv().ok())
            .partition(|status| status.phase == WorkflowPhase::Failed);
    assert_eq!(failed.len(), 1);
    assert_eq!(
        failed[0].message,
        "Ticket creation failed: Entity 'ticket-1700000000006' already exists"
    );
    assert_eq!(failed[0].entity_id.as_deref(), Some("ticket-1700000000006"));
    let phases: Vec<WorkflowPhase> = progress.iter().map(|status| status.phase).collect();
    assert_eq!(
        phases,
        vec![
            WorkflowPhase::Encrypting,
            WorkflowPhase::AwaitingConfirmation,
            WorkflowPhase::Succeeded
        ]
    );
    assert_eq!(
        coordinator.status("ticket-1700000000006").phase,
        WorkflowPhase::Succeeded
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_different_entities_do_not_block() -> Result<()> {
    let (ledger, _sdk, coordinator) = setup().await?;
    ledger.set_confirmation_delay_for("ticket-1700000000010", Duration::from_secs(10));
    ledger.set_confirmation_delay_for("ticket-1700000000011", Duration::from_secs(1));
    let slow = ticket(&[1, 2, 3, 4, 5, 6], 1_700_000_000_010);
    let fast = ticket(&[11, 12, 13, 14, 15, 16], 1_700_000_000_011);

    let start = Instant::now();
    let (slow_done, fast_done) = tokio::join!(
        async {
            coordinator.create_ticket(&slow).await.map(|_| start.elapsed())
        },
        async {
            coordinator.create_ticket(&fast).await.map(|_| start.elapsed())
        }
    );

    let fast_done = fast_done?;
    let slow_done = slow_done?;
    assert!(fast_done < Duration::from_secs(2), "{:?}", fast_done);
    assert!(slow_done >= Duration::from_secs(10));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_interleaved_entities_keep_their_own_status() -> Result<()> {
    const SLOW: &str = "ticket-1700000000030";
    const FAST: &str = "ticket-1700000000031";
    let (ledger, _sdk, coordinator) = setup().await?;
    ledger.set_confirmation_delay_for(SLOW, Duration::from_secs(10));
    ledger.set_confirmation_delay_for(FAST, Duration::from_secs(1));
    let coordinator = Arc::new(coordinator);
    let mut events = coordinator.events();

    let spawn_ticket = |numbers: [u8; 6], millis: i64| {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.create_ticket(&ticket(&numbers, millis)).await })
    };
    let slow = spawn_ticket([1, 2, 3, 4, 5, 6], 1_700_000_000_030);
    let fast = spawn_ticket([7, 8, 9, 10, 11, 12], 1_700_000_000_031);

    // the fast ticket has finished and reset, the slow one is still waiting
    tokio::time::sleep(Duration::from_secs(5)).await;
    let status = coordinator.status(SLOW);
    assert_eq!(status.phase, WorkflowPhase::AwaitingConfirmation);
    assert_eq!(status.entity_id.as_deref(), Some(SLOW));
    assert!(coordinator.locks().is_held(SLOW));
    assert_eq!(coordinator.status(FAST), WorkflowStatus::idle());

    fast.await??;
    slow.await??;
    assert_eq!(coordinator.status(SLOW).phase, WorkflowPhase::Succeeded);

    let mut phases: HashMap<String, Vec<WorkflowPhase>> = HashMap::new();
    while let Ok(status) = events.try_recv() {
        phases
            .entry(status.entity_id.unwrap_or_default())
            .or_default()
            .push(status.phase);
    }
    let expected = vec![
        WorkflowPhase::Encrypting,
        WorkflowPhase::AwaitingConfirmation,
        WorkflowPhase::Succeeded,
    ];
    assert_eq!(phases.len(), 2);
    assert_eq!(phases.get(SLOW), Some(&expected));
    assert_eq!(phases.get(FAST), Some(&expected));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_ledger_collision_reports_duplicate() -> Result<()> {
    init_test_tracing();
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.set_confirmation_delay(Duration::from_secs(1));
    let sdk = Arc::new(SimulatedFheSdk::initialized());
    // Two clients with their own locks racing for one id
    let alice = WorkflowCoordinator::new(ledger.clone(), sdk.clone(), CoordinatorSettings::default());
    let bob = WorkflowCoordinator::new(ledger.clone(), sdk, CoordinatorSettings::default());
    let command = ticket(&[3, 6, 9, 12, 15, 18], 1_700_000_000_020);

    let (a, b) = tokio::join!(alice.create_ticket(&command), bob.create_ticket(&command));

    let errors: Vec<WorkflowError> = [a, b]
        .into_iter()
        .filter_map(|result| result.err())
        .collect();
    assert_eq!(
        errors,
        vec![WorkflowError::DuplicateEntity("ticket-1700000000020".into())]
    );
    assert_eq!(ledger.create_calls(), 2);
    assert_eq!(ledger.get_all_entity_ids().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_draw_prize_pool_counts_tickets() -> Result<()> {
    let (ledger, _sdk, coordinator) = setup().await?;
    for offset in 0..3 {
        coordinator
            .create_ticket(&ticket(&[1, 2, 3, 4, 5, 6], 1_700_000_000_100 + offset))
            .await?;
    }

    let draw = DrawCommand::new(&[8, 16, 24, 32, 40, 48])?.issued_at(at(1_700_000_001_000));
    let created = coordinator.create_draw(&draw).await?;

    assert_eq!(created.submission.entity_id, "draw-1700000001000");
    assert_eq!(created.label, "Draw-170000");
    let record = ledger.get_entity_data("draw-1700000001000").await?;
    assert_eq!(record.public_value1, U256::from(30));
    assert!(!record.is_verified);
    assert_eq!(
        coordinator.status("draw-1700000001000").message,
        "Draw created successfully!"
    );
    Ok(())
}

#[tokio::test]
async fn test_draw_fails_cleanly_when_tickets_cannot_be_counted() -> Result<()> {
    let (ledger, _sdk, coordinator) = setup().await?;
    let draw = DrawCommand::new(&[8, 16, 24, 32, 40, 48])?.issued_at(at(1_700_000_002_000));
    ledger.fail_next_read("rpc down");

    let err = coordinator.create_draw(&draw).await.unwrap_err();

    assert_eq!(err, WorkflowError::SubmissionFailed("rpc down".into()));
    let status = coordinator.status("draw-1700000002000");
    assert_eq!(status.phase, WorkflowPhase::Failed);
    assert_eq!(
        status.message,
        "Draw creation failed: Submission failed: rpc down"
    );
    assert_eq!(ledger.create_calls(), 0);
    assert!(!coordinator.locks().is_held("draw-1700000002000"));

    coordinator.create_draw(&draw).await?;
    assert_eq!(
        coordinator.status("draw-1700000002000").phase,
        WorkflowPhase::Succeeded
    );
    Ok(())
}
