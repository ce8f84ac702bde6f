// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{Result, WorkflowError};
use chrono::{DateTime, Utc};
use rand::seq::index::sample;
use rand::Rng;
use std::fmt;

pub const NUMBERS_PER_ENTRY: usize = 6;
pub const MIN_NUMBER: u8 = 1;
pub const MAX_NUMBER: u8 = 49;

const TICKET_DESCRIPTION: &str = "Encrypted lottery ticket";
const DRAW_DESCRIPTION: &str = "Lottery draw with encrypted winning numbers";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Ticket,
    Draw,
}

impl EntityKind {
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityKind::Ticket => "ticket-",
            EntityKind::Draw => "draw-",
        }
    }

    fn label_prefix(&self) -> &'static str {
        match self {
            EntityKind::Ticket => "Ticket",
            EntityKind::Draw => "Draw",
        }
    }

    /// Which kind of entity an id names, if any
    pub fn of_id(entity_id: &str) -> Option<Self> {
        [EntityKind::Ticket, EntityKind::Draw]
            .into_iter()
            .find(|kind| entity_id.starts_with(kind.id_prefix()))
    }

    /// `ticket-<unix millis>` or `draw-<unix millis>`
    pub fn entity_id(&self, at: DateTime<Utc>) -> String {
        format!("{}{}", self.id_prefix(), at.timestamp_millis())
    }

    /// Short human label built from the first six digits of the id
    pub fn label(&self, entity_id: &str) -> String {
        let digits: String = entity_id
            .strip_prefix(self.id_prefix())
            .unwrap_or(entity_id)
            .chars()
            .take(6)
            .collect();
        format!("{}-{}", self.label_prefix(), digits)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Ticket => write!(f, "ticket"),
            EntityKind::Draw => write!(f, "draw"),
        }
    }
}

/// Six distinct numbers, sorted ascending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberSet([u8; NUMBERS_PER_ENTRY]);

impl NumberSet {
    pub fn new(numbers: &[u8]) -> Result<Self> {
        if numbers.len() != NUMBERS_PER_ENTRY {
            return Err(WorkflowError::InvalidInput(format!(
                "expected {} numbers, got {}",
                NUMBERS_PER_ENTRY,
                numbers.len()
            )));
        }

        let mut sorted = [0u8; NUMBERS_PER_ENTRY];
        sorted.copy_from_slice(numbers);
        sorted.sort_unstable();

        if let Some(n) = sorted
            .iter()
            .find(|n| !(MIN_NUMBER..=MAX_NUMBER).contains(*n))
        {
            return Err(WorkflowError::InvalidInput(format!(
                "number {} is outside {}..={}",
                n, MIN_NUMBER, MAX_NUMBER
            )));
        }
        if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(WorkflowError::InvalidInput(format!(
                "number {} was picked twice",
                pair[0]
            )));
        }

        Ok(Self(sorted))
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let span = (MAX_NUMBER - MIN_NUMBER + 1) as usize;
        let mut picked = [0u8; NUMBERS_PER_ENTRY];
        for (slot, index) in picked
            .iter_mut()
            .zip(sample(rng, span, NUMBERS_PER_ENTRY).into_iter())
        {
            *slot = MIN_NUMBER + index as u8;
        }
        picked.sort_unstable();
        Self(picked)
    }

    pub fn numbers(&self) -> &[u8] {
        &self.0
    }

    /// The value that gets encrypted
    pub fn sum(&self) -> u64 {
        self.0.iter().map(|n| *n as u64).sum()
    }
}

impl fmt::Display for NumberSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Everything the coordinator needs to create one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPlan {
    pub kind: EntityKind,
    pub entity_id: String,
    pub label: String,
    pub plaintext: u64,
    pub public_value1: u64,
    pub public_value2: u64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Buy a ticket with the chosen numbers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketCommand {
    numbers: NumberSet,
    issued_at: DateTime<Utc>,
}

impl TicketCommand {
    pub fn new(numbers: &[u8]) -> Result<Self> {
        Ok(Self {
            numbers: NumberSet::new(numbers)?,
            issued_at: Utc::now(),
        })
    }

    /// Quick pick
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            numbers: NumberSet::random(rng),
            issued_at: Utc::now(),
        }
    }

    /// Pin the moment the id is derived from
    pub fn issued_at(mut self, at: DateTime<Utc>) -> Self {
        self.issued_at = at;
        self
    }

    pub fn numbers(&self) -> &NumberSet {
        &self.numbers
    }

    pub fn entity_id(&self) -> String {
        EntityKind::Ticket.entity_id(self.issued_at)
    }

    pub fn plan(&self) -> EntityPlan {
        let entity_id = self.entity_id();
        EntityPlan {
            kind: EntityKind::Ticket,
            label: EntityKind::Ticket.label(&entity_id),
            entity_id,
            plaintext: self.numbers.sum(),
            public_value1: 0,
            public_value2: 0,
            description: TICKET_DESCRIPTION.to_string(),
            created_at: self.issued_at,
        }
    }
}

/// Run a draw. The prize pool is fixed when the plan is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCommand {
    winning_numbers: NumberSet,
    issued_at: DateTime<Utc>,
}

impl DrawCommand {
    pub fn new(winning_numbers: &[u8]) -> Result<Self> {
        Ok(Self {
            winning_numbers: NumberSet::new(winning_numbers)?,
            issued_at: Utc::now(),
        })
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            winning_numbers: NumberSet::random(rng),
            issued_at: Utc::now(),
        }
    }

    pub fn issued_at(mut self, at: DateTime<Utc>) -> Self {
        self.issued_at = at;
        self
    }

    pub fn winning_numbers(&self) -> &NumberSet {
        &self.winning_numbers
    }

    pub fn entity_id(&self) -> String {
        EntityKind::Draw.entity_id(self.issued_at)
    }

    pub fn plan(&self, ticket_count: u64, prize_per_ticket: u64) -> EntityPlan {
        let entity_id = self.entity_id();
        EntityPlan {
            kind: EntityKind::Draw,
            label: EntityKind::Draw.label(&entity_id),
            entity_id,
            plaintext: self.winning_numbers.sum(),
            public_value1: ticket_count.saturating_mul(prize_per_ticket),
            public_value2: 0,
            description: DRAW_DESCRIPTION.to_string(),
            created_at: self.issued_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn test_ticket_plan() {
        let plan = TicketCommand::new(&[49, 3, 17, 22, 28, 35])
            .unwrap()
            .issued_at(at(1_700_000_000_000))
            .plan();

        assert_eq!(plan.entity_id, "ticket-1700000000000");
        assert_eq!(plan.label, "Ticket-170000");
        assert_eq!(plan.plaintext, 154);
        assert_eq!(plan.kind, EntityKind::Ticket);
        assert!(!plan.description.contains("49"));
    }

    #[test]
    fn test_draw_plan_prize_pool() {
        let plan = DrawCommand::new(&[1, 2, 3, 4, 5, 6])
            .unwrap()
            .issued_at(at(1_700_000_123_456))
            .plan(7, 10);

        assert_eq!(plan.entity_id, "draw-1700000123456");
        assert_eq!(plan.label, "Draw-170000");
        assert_eq!(plan.plaintext, 21);
        assert_eq!(plan.public_value1, 70);
    }

    #[test]
    fn test_rejects_bad_selections() {
        assert!(matches!(
            TicketCommand::new(&[1, 2, 3, 4, 5]),
            Err(WorkflowError::InvalidInput(_))
        ));
        assert!(matches!(
            TicketCommand::new(&[1, 2, 3, 4, 5, 50]),
            Err(WorkflowError::InvalidInput(_))
        ));
        assert!(matches!(
            TicketCommand::new(&[0, 2, 3, 4, 5, 6]),
            Err(WorkflowError::InvalidInput(_))
        ));
        assert!(matches!(
            TicketCommand::new(&[7, 2, 3, 4, 5, 7]),
            Err(WorkflowError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_random_numbers_are_valid() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let set = NumberSet::random(&mut rng);
            assert!(NumberSet::new(set.numbers()).is_ok());
        }
    }

    #[test]
    fn test_kind_of_id() {
        assert_eq!(EntityKind::of_id("ticket-1"), Some(EntityKind::Ticket));
        assert_eq!(EntityKind::of_id("draw-1"), Some(EntityKind::Draw));
        assert_eq!(EntityKind::of_id("business-1"), None);
    }

    #[test]
    fn test_number_set_display() {
        let set = NumberSet::new(&[6, 5, 4, 3, 2, 1]).unwrap();
        assert_eq!(set.to_string(), "1, 2, 3, 4, 5, 6");
    }
}
