//! State management module for Roast Arena.
//!
//! This module provides the core state types and managers:
//!
//! - `damage` - Attack text to damage, with critical hits
//! - `battle` - Two-player battles and the registry that owns them
//! - `matchmaking` - Single-slot matchmaking queue
//! - `connection` - Live connections and per-battle broadcast groups
//! - `solo` - Local battles against the scripted opponent
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                             AppState                                 │
//! │                                                                      │
//! │  ┌──────────────────┐  ┌─────────────────┐  ┌─────────────────┐      │
//! │  │ConnectionManager │  │   MatchSlot     │  │ BattleRegistry  │      │
//! │  │                  │  │                 │  │                 │      │
//! │  │ conn_id →        │  │ at most one     │  │ battle_id →     │      │
//! │  │   Connection     │  │ waiting         │  │   Battle        │      │
//! │  │                  │  │ Participant     │  │                 │      │
//! │  │ battle_id →      │  │                 │  │                 │      │
//! │  │   {conn_id}      │  │                 │  │                 │      │
//! │  └──────────────────┘  └─────────────────┘  └─────────────────┘      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `AppState` is owned by the engine task and only touched from there, so
//! there are no locks.

pub mod battle;
pub mod connection;
pub mod damage;
pub mod matchmaking;
pub mod solo;

// Re-export commonly used types
pub use battle::{
    battle_id, AttackOutcome, Battle, BattlePlayer, BattleRegistry, BattleStatus, Participant,
    BOSS_ID, LOCAL_BATTLE_ID, LOCAL_PLAYER_ID, MAX_HP,
};
pub use connection::{Connection, ConnectionManager, Outbox};
pub use damage::{has_crit_keyword, DamageRoll, DamageTable, CRIT_KEYWORDS};
pub use matchmaking::{FindMatchOutcome, MatchSlot, Waiting};
pub use solo::{draw_choices, is_refusal, AttackLogEntry, RoastSource, ScriptedRoasts, SoloBattle};

/// Combined application state.
#[derive(Debug, Default)]
pub struct AppState {
    pub connections: ConnectionManager,
    pub matchmaking: MatchSlot,
    pub battles: BattleRegistry,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly paired battle and subscribe both players to it.
    /// Returns the battle id.
    pub fn open_battle(&mut self, battle: Battle) -> String {
        let id = battle.id.clone();
        for player in battle.players() {
            self.connections.join_group(&id, &player.id);
        }
        self.battles.add(battle);
        id
    }

    /// Retire a battle: drop it from the registry and drop its group.
    pub fn close_battle(&mut self, battle_id: &str) -> Option<Battle> {
        self.connections.drop_group(battle_id);
        self.battles.remove(battle_id)
    }

    /// Forget a connection. Clears the matchmaking slot if it was waiting.
    /// Battles it plays in stay open.
    pub fn drop_connection(&mut self, conn_id: &str) -> DisconnectResult {
        let abandoned_match = self.matchmaking.abandon(conn_id).is_some();
        let open_battles = self.battles.battles_for(conn_id);
        let was_connected = self.connections.remove(conn_id).is_some();

        DisconnectResult {
            was_connected,
            abandoned_match,
            open_battles,
        }
    }
}

/// Result of dropping a connection.
#[derive(Debug, Default)]
pub struct DisconnectResult {
    pub was_connected: bool,
    pub abandoned_match: bool,
    /// Battles left without this player's attacks
    pub open_battles: Vec<String>,
}
