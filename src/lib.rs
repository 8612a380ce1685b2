//! Roast Arena
//!
//! Server-authoritative matchmaking and battle state for Roast Arena, a
//! turn-based contest where two players trade AI-written roasts.
//!
//! # Overview
//!
//! - **State** - Damage resolution, battles and their registry, the
//!   single-slot matchmaking queue, live connections with per-battle
//!   broadcast groups, and a local driver for battles against a scripted
//!   opponent.
//!
//! - **Protocol** - JSON events exchanged over the websocket.
//!
//! - **Engine** - Applies inbound events to the state one at a time and
//!   fans the results out to every player of the battle.
//!
//! - **Server** - axum websocket transport in front of the engine.
//!
//! # Example
//!
//! ```rust
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use roast_arena::state::{DamageTable, FindMatchOutcome, MatchSlot, Participant};
//!
//! let mut slot = MatchSlot::new();
//! slot.find_match(Participant::new("x", "France"));
//!
//! let FindMatchOutcome::Paired(mut battle) = slot.find_match(Participant::new("y", "Germany"))
//! else {
//!     unreachable!()
//! };
//! assert_eq!(battle.turn.as_deref(), Some("x"));
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(1);
//! let outcome = battle
//!     .apply_attack("x", "yo mama so fat...", &DamageTable::default(), &mut rng)
//!     .unwrap();
//! assert!(outcome.is_critical);
//! assert_eq!(battle.turn.as_deref(), Some("y"));
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod server;
pub mod state;

pub use engine::{Engine, EngineCommand, EngineHandle, EngineStats};
pub use error::{GenerationError, ProtocolError, ServerError};
