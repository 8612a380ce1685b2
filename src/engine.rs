//! Connection-event layer.
//!
//! The engine owns [`AppState`] and is driven by one command queue. Each
//! command (connect, disconnect, client event, stats query) runs to
//! completion before the next, which gives every mutation a single total
//! order. Outbound events are queued on unbounded per-connection channels,
//! so handlers never wait on a client.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::protocol::{AttackRequest, BattleUpdate, ClientEvent, ServerEvent};
use crate::state::{AppState, Connection, DamageTable, FindMatchOutcome, Outbox, Participant};

/// Depth of the engine command queue.
pub const COMMAND_QUEUE_DEPTH: usize = 1024;

/// Work for the engine.
#[derive(Debug)]
pub enum EngineCommand {
    Connect { conn_id: String, tx: Outbox },
    Disconnect { conn_id: String },
    Client { conn_id: String, event: ClientEvent },
    Stats { reply: oneshot::Sender<EngineStats> },
}

/// Snapshot of engine load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub connections: usize,
    pub waiting: bool,
    pub active_battles: usize,
}

/// Matchmaking and battle-state engine.
pub struct Engine<R = ChaCha8Rng> {
    state: AppState,
    table: DamageTable,
    rng: R,
}

impl Engine<ChaCha8Rng> {
    /// Engine with a ChaCha RNG, seeded when `seed` is given.
    pub fn with_seed(table: DamageTable, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::new(table, rng)
    }
}

impl<R: Rng> Engine<R> {
    pub fn new(table: DamageTable, rng: R) -> Self {
        Self {
            state: AppState::new(),
            table,
            rng,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Process one command to completion.
    pub fn handle(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Connect { conn_id, tx } => self.connect(conn_id, tx),
            EngineCommand::Disconnect { conn_id } => self.disconnect(&conn_id),
            EngineCommand::Client { conn_id, event } => self.dispatch(&conn_id, event),
            EngineCommand::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }

    /// Track a new connection.
    pub fn connect(&mut self, conn_id: String, tx: Outbox) {
        tracing::info!(conn = %conn_id, "participant connected");
        self.state.connections.add(Connection::new(conn_id, tx));
    }

    /// Forget a closed connection.
    pub fn disconnect(&mut self, conn_id: &str) {
        let result = self.state.drop_connection(conn_id);
        if result.abandoned_match {
            tracing::info!(conn = %conn_id, "waiting participant left matchmaking");
        }
        if !result.open_battles.is_empty() {
            tracing::info!(
                conn = %conn_id,
                battles = ?result.open_battles,
                "participant left mid-battle, battles stay open"
            );
        }
        tracing::info!(conn = %conn_id, "participant disconnected");
    }

    /// Apply one client event.
    pub fn dispatch(&mut self, conn_id: &str, event: ClientEvent) {
        if !self.state.connections.contains(conn_id) {
            tracing::debug!(conn = %conn_id, "event from unknown connection dropped");
            return;
        }

        match event {
            ClientEvent::FindMatch(region) => self.find_match(conn_id, region),
            ClientEvent::Attack(AttackRequest { battle_id, text }) => {
                self.attack(conn_id, &battle_id, text)
            }
        }
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            connections: self.state.connections.connected_count(),
            waiting: !self.state.matchmaking.is_empty(),
            active_battles: self.state.battles.active_count(),
        }
    }

    fn find_match(&mut self, conn_id: &str, region: String) {
        match self.state.matchmaking.find_match(Participant::new(conn_id, region)) {
            FindMatchOutcome::Waiting => {
                tracing::info!(conn = %conn_id, "waiting for match");
                self.state
                    .connections
                    .send(conn_id, ServerEvent::WaitingForMatch);
            }
            FindMatchOutcome::Duplicate => {
                tracing::debug!(conn = %conn_id, "duplicate find_match ignored");
            }
            FindMatchOutcome::Paired(battle) => {
                let event = ServerEvent::MatchFound(battle.clone());
                let battle_id = self.state.open_battle(battle);
                tracing::info!(battle = %battle_id, "match found");
                self.state.connections.broadcast(&battle_id, &event);
            }
        }
    }

    fn attack(&mut self, conn_id: &str, battle_id: &str, text: String) {
        let Some(battle) = self.state.battles.get_mut(battle_id) else {
            tracing::debug!(conn = %conn_id, battle = %battle_id, "attack on unknown battle ignored");
            return;
        };
        if !battle.is_player_turn(conn_id) {
            tracing::debug!(conn = %conn_id, battle = %battle_id, "out-of-turn attack ignored");
            return;
        }
        let Some(outcome) = battle.apply_attack(conn_id, &text, &self.table, &mut self.rng) else {
            return;
        };

        let update = ServerEvent::BattleUpdate(BattleUpdate {
            battle: battle.clone(),
            last_attack_text: text,
            attacker_id: conn_id.to_string(),
            damage: outcome.damage,
            is_critical: outcome.is_critical,
        });
        tracing::debug!(
            battle = %battle_id,
            attacker = %conn_id,
            damage = outcome.damage,
            critical = outcome.is_critical,
            "attack landed"
        );
        self.state.connections.broadcast(battle_id, &update);

        if let Some(winner_id) = outcome.winner_id {
            tracing::info!(battle = %battle_id, winner = %winner_id, "battle finished");
            self.state
                .connections
                .broadcast(battle_id, &ServerEvent::BattleFinished { winner_id });
            self.state.close_battle(battle_id);
        }
    }
}

impl<R: Rng + Send + 'static> Engine<R> {
    /// Drain commands until every sender is gone.
    pub async fn run(mut self, mut commands: mpsc::Receiver<EngineCommand>) {
        while let Some(command) = commands.recv().await {
            self.handle(command);
        }
        tracing::info!("engine stopped");
    }

    /// Run the engine on its own task.
    pub fn spawn(self) -> (EngineHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let task = tokio::spawn(self.run(rx));
        (EngineHandle { tx }, task)
    }
}

/// Cloneable sender side of the engine queue.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    /// Queue a command. Returns false if the engine has stopped.
    pub async fn send(&self, command: EngineCommand) -> bool {
        self.tx.send(command).await.is_ok()
    }

    pub async fn stats(&self) -> Option<EngineStats> {
        let (reply, rx) = oneshot::channel();
        if !self.send(EngineCommand::Stats { reply }).await {
            return None;
        }
        rx.await.ok()
    }
}
