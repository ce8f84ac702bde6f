// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::primitives::{Address, B256, U256};
use anyhow::Result;
use chrono::{TimeZone, Utc};
use lotto_evm::EntityRecord;
use lotto_test_helpers::{InMemoryLedger, SimulatedFheSdk, GENESIS_TIMESTAMP};
use lotto_workflow::{Catalog, CoordinatorSettings, DrawCommand, TicketCommand, WorkflowCoordinator};
use std::sync::Arc;

fn record(creator: Address, prize: u64, verified: bool) -> EntityRecord {
    EntityRecord {
        name: "seeded".to_string(),
        public_value1: U256::from(prize),
        public_value2: U256::ZERO,
        description: String::new(),
        creator,
        timestamp: GENESIS_TIMESTAMP,
        is_verified: verified,
        decrypted_value: 0,
    }
}

#[tokio::test]
async fn test_lists_filter_by_prefix() -> Result<()> {
    let ledger = Arc::new(InMemoryLedger::new());
    let alice = Address::repeat_byte(0x01);
    ledger.insert_entity("ticket-1", record(alice, 0, false), B256::repeat_byte(1));
    ledger.insert_entity("draw-1", record(alice, 30, true), B256::repeat_byte(2));
    ledger.insert_entity("business-1", record(alice, 0, false), B256::repeat_byte(3));
    ledger.insert_entity("ticket-2", record(alice, 0, true), B256::repeat_byte(4));
    let catalog = Catalog::new(ledger);

    let tickets = catalog.tickets().await?;
    let ids: Vec<&str> = tickets.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["ticket-1", "ticket-2"]);
    assert!(tickets[1].is_verified);
    assert_eq!(tickets[0].created_at.timestamp(), GENESIS_TIMESTAMP as i64);

    let draws = catalog.draws().await?;
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].id, "draw-1");
    assert_eq!(draws[0].total_prize, U256::from(30));
    assert!(draws[0].is_completed);
    Ok(())
}

#[tokio::test]
async fn test_user_history_and_stats() -> Result<()> {
    let ledger = Arc::new(InMemoryLedger::new());
    let sdk = Arc::new(SimulatedFheSdk::initialized());
    let alice = ledger.with_signer(Address::repeat_byte(0xAA));
    let bob = ledger.with_signer(Address::repeat_byte(0xBB));
    let as_alice = WorkflowCoordinator::new(
        Arc::new(alice),
        sdk.clone(),
        CoordinatorSettings::default(),
    );
    let as_bob = WorkflowCoordinator::new(Arc::new(bob), sdk, CoordinatorSettings::default());

    let at = |millis: i64| Utc.timestamp_millis_opt(millis).unwrap();
    as_alice
        .create_ticket(&TicketCommand::new(&[1, 2, 3, 4, 5, 6])?.issued_at(at(1)))
        .await?;
    as_bob
        .create_ticket(&TicketCommand::new(&[7, 8, 9, 10, 11, 12])?.issued_at(at(2)))
        .await?;
    as_alice
        .create_ticket(&TicketCommand::new(&[13, 14, 15, 16, 17, 18])?.issued_at(at(3)))
        .await?;
    as_bob
        .create_draw(&DrawCommand::new(&[19, 20, 21, 22, 23, 24])?.issued_at(at(4)))
        .await?;

    let catalog = Catalog::new(ledger.clone());
    let history = catalog.user_history(Address::repeat_byte(0xAA)).await?;
    let ids: Vec<&str> = history.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["ticket-1", "ticket-3"]);

    let stats = catalog.stats().await?;
    assert_eq!(stats.total_tickets, 3);
    assert_eq!(stats.total_draws, 1);
    assert_eq!(stats.total_prize, U256::from(30));
    Ok(())
}

#[tokio::test]
async fn test_availability() {
    let ledger = Arc::new(InMemoryLedger::new());
    let catalog = Catalog::new(ledger.clone());
    assert!(catalog.is_available().await);

    ledger.set_available(false);
    assert!(!catalog.is_available().await);
}
