//! Wire protocol.
//!
//! Every websocket text frame is one JSON object `{"event": ..., "data": ...}`.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::state::battle::Battle;

/// Events sent by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Ask to be paired; payload is the participant's region
    FindMatch(String),

    /// Submit a finished attack text
    #[serde(alias = "joke_generated")]
    Attack(AttackRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackRequest {
    pub battle_id: String,
    #[serde(alias = "joke")]
    pub text: String,
}

/// Events sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Requester holds the matchmaking slot
    WaitingForMatch,

    /// Pairing made; carries the initial battle
    MatchFound(Battle),

    /// An attack landed
    BattleUpdate(BattleUpdate),

    /// Battle over
    BattleFinished {
        #[serde(rename = "winnerId")]
        winner_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleUpdate {
    pub battle: Battle,
    pub last_attack_text: String,
    pub attacker_id: String,
    pub damage: u32,
    pub is_critical: bool,
}

/// Parse one inbound text frame.
pub fn decode(frame: &str) -> Result<ClientEvent, ProtocolError> {
    Ok(serde_json::from_str(frame)?)
}

/// Render one outbound event as a text frame.
pub fn encode(event: &ServerEvent) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(event)?)
}
