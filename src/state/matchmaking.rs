//! Matchmaking slot.
//!
//! Holds at most one waiting participant. A second, distinct participant
//! pairs with the waiting one and the slot empties again.
//!
//! # State Diagram
//!
//! ```text
//!            find_match(p)
//! ┌───────┐ ─────────────────▶ ┌────────────┐
//! │ Empty │                    │ Waiting(p) │──┐ find_match(p)
//! └───────┘ ◀───────────────── └────────────┘◀─┘ (duplicate, no-op)
//!     ▲       disconnect(p)          │
//!     │                              │ find_match(q), q != p
//!     └──────────────────────────────┘ pair -> Battle(p, q)
//! ```

use chrono::{DateTime, Utc};

use super::battle::{Battle, Participant};

/// The participant currently held in the slot.
#[derive(Debug, Clone)]
pub struct Waiting {
    pub participant: Participant,

    /// When the participant started waiting
    pub since: DateTime<Utc>,
}

/// Result of a find-match request.
#[derive(Debug, Clone, PartialEq)]
pub enum FindMatchOutcome {
    /// Requester now holds the slot
    Waiting,

    /// Requester already holds the slot; nothing changed
    Duplicate,

    /// Requester paired with the waiting participant, who moves first
    Paired(Battle),
}

/// Single-capacity matchmaking queue.
///
/// Owned by the application state and passed explicitly; starts empty.
#[derive(Debug, Default)]
pub struct MatchSlot {
    waiting: Option<Waiting>,
}

impl MatchSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a match for a participant.
    pub fn find_match(&mut self, participant: Participant) -> FindMatchOutcome {
        match self.waiting.take() {
            None => {
                self.waiting = Some(Waiting {
                    participant,
                    since: Utc::now(),
                });
                FindMatchOutcome::Waiting
            }
            Some(waiting) if waiting.participant.id == participant.id => {
                self.waiting = Some(waiting);
                FindMatchOutcome::Duplicate
            }
            Some(waiting) => {
                FindMatchOutcome::Paired(Battle::create(&waiting.participant, &participant))
            }
        }
    }

    /// Drop the waiting participant if it is `participant_id`.
    pub fn abandon(&mut self, participant_id: &str) -> Option<Participant> {
        if self.is_waiting(participant_id) {
            self.waiting.take().map(|w| w.participant)
        } else {
            None
        }
    }

    /// Get the waiting participant.
    pub fn waiting(&self) -> Option<&Waiting> {
        self.waiting.as_ref()
    }

    /// Check if a participant holds the slot.
    pub fn is_waiting(&self, participant_id: &str) -> bool {
        self.waiting
            .as_ref()
            .is_some_and(|w| w.participant.id == participant_id)
    }

    /// Check if slot is empty.
    pub fn is_empty(&self) -> bool {
        self.waiting.is_none()
    }
}
