// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::trace;

pub const DEFAULT_STATUS_RESET: Duration = Duration::from_millis(3000);

/// Statuses buffered per event subscriber before it starts lagging
pub const STATUS_EVENTS_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WorkflowPhase {
    Idle,
    Encrypting,
    AwaitingConfirmation,
    Verifying,
    Succeeded,
    Failed,
}

impl WorkflowPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowPhase::Succeeded | WorkflowPhase::Failed)
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowPhase::Idle => "idle",
            WorkflowPhase::Encrypting => "encrypting",
            WorkflowPhase::AwaitingConfirmation => "awaiting_confirmation",
            WorkflowPhase::Verifying => "verifying",
            WorkflowPhase::Succeeded => "succeeded",
            WorkflowPhase::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowStatus {
    pub phase: WorkflowPhase,
    pub message: String,
    pub entity_id: Option<String>,
}

impl WorkflowStatus {
    pub fn idle() -> Self {
        Self {
            phase: WorkflowPhase::Idle,
            message: String::new(),
            entity_id: None,
        }
    }
}

impl Default for WorkflowStatus {
    fn default() -> Self {
        Self::idle()
    }
}

/// Publishes the status of one workflow and puts terminal statuses back to idle after a window
#[derive(Clone)]
pub struct StatusBoard {
    sender: Arc<watch::Sender<WorkflowStatus>>,
    generation: Arc<AtomicU64>,
    reset_after: Duration,
    events: Option<broadcast::Sender<WorkflowStatus>>,
}

impl StatusBoard {
    pub fn new(reset_after: Duration) -> Self {
        let (sender, _) = watch::channel(WorkflowStatus::idle());
        Self {
            sender: Arc::new(sender),
            generation: Arc::new(AtomicU64::new(0)),
            reset_after,
            events: None,
        }
    }

    /// Also forward every published status to `events`
    pub fn with_events(reset_after: Duration, events: broadcast::Sender<WorkflowStatus>) -> Self {
        Self {
            events: Some(events),
            ..Self::new(reset_after)
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowStatus> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> WorkflowStatus {
        self.sender.borrow().clone()
    }

    /// Publish a status. Terminal phases schedule a reset that only applies if nothing was
    /// published in the meantime. An empty `entity_id` means no entity.
    /// Must be called from within a Tokio runtime.
    pub fn publish(&self, phase: WorkflowPhase, message: impl Into<String>, entity_id: &str) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let status = WorkflowStatus {
            phase,
            message: message.into(),
            entity_id: (!entity_id.is_empty()).then(|| entity_id.to_string()),
        };
        trace!(phase = %status.phase, message = %status.message, generation, "status");
        if let Some(events) = &self.events {
            // no subscribers is fine
            let _ = events.send(status.clone());
        }
        self.sender.send_replace(status);

        if phase.is_terminal() {
            let sender = self.sender.clone();
            let current = self.generation.clone();
            let reset_after = self.reset_after;
            tokio::spawn(async move {
                tokio::time::sleep(reset_after).await;
                sender.send_if_modified(|status| {
                    if current.load(Ordering::SeqCst) != generation {
                        return false;
                    }
                    *status = WorkflowStatus::idle();
                    true
                });
            });
        }
    }
}

/// One status board per entity id plus a stream of everything published on any of them
pub struct StatusRegistry {
    boards: Mutex<HashMap<String, StatusBoard>>,
    events: broadcast::Sender<WorkflowStatus>,
    reset_after: Duration,
}

impl StatusRegistry {
    pub fn new(reset_after: Duration) -> Self {
        let (events, _) = broadcast::channel(STATUS_EVENTS_CAPACITY);
        Self {
            boards: Mutex::new(HashMap::new()),
            events,
            reset_after,
        }
    }

    fn boards(&self) -> MutexGuard<'_, HashMap<String, StatusBoard>> {
        self.boards.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The board of `entity_id`. Only the workflow holding the entity lock publishes here.
    pub fn board(&self, entity_id: &str) -> StatusBoard {
        self.boards()
            .entry(entity_id.to_string())
            .or_insert_with(|| StatusBoard::with_events(self.reset_after, self.events.clone()))
            .clone()
    }

    /// A board owned by no entity. What it publishes only shows up on the event stream.
    pub fn detached(&self) -> StatusBoard {
        StatusBoard::with_events(self.reset_after, self.events.clone())
    }

    pub fn subscribe(&self, entity_id: &str) -> watch::Receiver<WorkflowStatus> {
        self.board(entity_id).subscribe()
    }

    /// Idle for entities nothing was published for
    pub fn current(&self, entity_id: &str) -> WorkflowStatus {
        self.boards()
            .get(entity_id)
            .map(StatusBoard::current)
            .unwrap_or_default()
    }

    pub fn events(&self) -> broadcast::Receiver<WorkflowStatus> {
        self.events.subscribe()
    }
}
