//! Battle state management.
//!
//! A battle is a two-player contest with shared hp state, a turn pointer and
//! a terminal win condition. The [`BattleRegistry`] owns every live battle;
//! callers reach a battle only through its id.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::damage::DamageTable;

/// Starting hp for every player.
pub const MAX_HP: u32 = 100;

/// Id of the human player in a local battle.
pub const LOCAL_PLAYER_ID: &str = "player1";

/// Id of the scripted opponent in a local battle.
pub const BOSS_ID: &str = "boss";

/// Id of the single local battle.
pub const LOCAL_BATTLE_ID: &str = "local";

/// One live connection identity, before it is placed into a battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Connection id (unique per live connection)
    pub id: String,

    /// Free-text region label, used for display only
    pub region: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            region: region.into(),
        }
    }
}

/// Battle lifecycle states held by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleStatus {
    #[default]
    Active,
    Finished,
}

impl BattleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Finished => "finished",
        }
    }

    /// Check if battle can still receive attacks.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// A player inside one battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattlePlayer {
    pub id: String,
    pub region: String,
    pub hp: u32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_boss: bool,
}

impl BattlePlayer {
    fn from_participant(participant: &Participant) -> Self {
        Self {
            id: participant.id.clone(),
            region: participant.region.clone(),
            hp: MAX_HP,
            is_boss: false,
        }
    }

    pub fn is_defeated(&self) -> bool {
        self.hp == 0
    }
}

/// What one accepted attack did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackOutcome {
    pub damage: u32,
    pub is_critical: bool,
    pub defender_id: String,
    pub finished: bool,
    pub winner_id: Option<String>,
}

/// Battle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Battle {
    /// Unique battle ID
    pub id: String,

    /// Current status
    pub status: BattleStatus,

    /// Exactly two players, first mover first
    players: [BattlePlayer; 2],

    /// Player whose attack is accepted next (`None` once finished)
    pub turn: Option<String>,

    /// When battle was created
    pub created_at: DateTime<Utc>,

    /// When battle finished
    pub finished_at: Option<DateTime<Utc>>,
}

/// Build the id of a networked battle from both participant ids.
pub fn battle_id(first_id: &str, second_id: &str) -> String {
    format!("battle_{}_{}", first_id, second_id)
}

impl Battle {
    /// Pair two participants. `first` takes the first turn.
    pub fn create(first: &Participant, second: &Participant) -> Self {
        Self {
            id: battle_id(&first.id, &second.id),
            status: BattleStatus::Active,
            players: [
                BattlePlayer::from_participant(first),
                BattlePlayer::from_participant(second),
            ],
            turn: Some(first.id.clone()),
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Create a local battle against the scripted opponent.
    pub fn local(player_region: &str, opponent_region: &str) -> Self {
        let player = BattlePlayer {
            id: LOCAL_PLAYER_ID.to_string(),
            region: player_region.to_string(),
            hp: MAX_HP,
            is_boss: false,
        };
        let boss = BattlePlayer {
            id: BOSS_ID.to_string(),
            region: opponent_region.to_string(),
            hp: MAX_HP,
            is_boss: true,
        };

        Self {
            id: LOCAL_BATTLE_ID.to_string(),
            status: BattleStatus::Active,
            players: [player, boss],
            turn: Some(LOCAL_PLAYER_ID.to_string()),
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Resolve an attack and apply it in place.
    ///
    /// Returns `None` without touching state if `attacker_id` is not a player
    /// here or the battle is already finished. Turn order is the caller's
    /// concern: the defender is simply the other player.
    pub fn apply_attack<R: Rng + ?Sized>(
        &mut self,
        attacker_id: &str,
        text: &str,
        table: &DamageTable,
        rng: &mut R,
    ) -> Option<AttackOutcome> {
        if !self.status.is_active() {
            return None;
        }
        let attacker_idx = self.players.iter().position(|p| p.id == attacker_id)?;
        let defender_idx = 1 - attacker_idx;

        let roll = table.resolve(text, rng);

        let defender = &mut self.players[defender_idx];
        defender.hp = defender.hp.saturating_sub(roll.damage);
        let defender_id = defender.id.clone();
        let finished = defender.is_defeated();

        if finished {
            self.status = BattleStatus::Finished;
            self.turn = None;
            self.finished_at = Some(Utc::now());
        } else {
            self.turn = Some(defender_id.clone());
        }

        Some(AttackOutcome {
            damage: roll.damage,
            is_critical: roll.is_critical,
            defender_id,
            finished,
            winner_id: finished.then(|| attacker_id.to_string()),
        })
    }

    /// Both players, first mover first.
    pub fn players(&self) -> &[BattlePlayer; 2] {
        &self.players
    }

    /// Get a player.
    pub fn get_player(&self, player_id: &str) -> Option<&BattlePlayer> {
        self.players.iter().find(|p| p.id == player_id)
    }

    /// Get the opponent of a player.
    pub fn opponent_of(&self, player_id: &str) -> Option<&BattlePlayer> {
        let idx = self.players.iter().position(|p| p.id == player_id)?;
        Some(&self.players[1 - idx])
    }

    /// Check if player is in battle.
    pub fn has_player(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    /// Check if it's a player's turn.
    pub fn is_player_turn(&self, player_id: &str) -> bool {
        self.status.is_active() && self.turn.as_deref() == Some(player_id)
    }
}

/// Battle registry - owns all live battles, keyed by id.
///
/// An id absent from the registry is treated like one that never existed.
#[derive(Debug, Default)]
pub struct BattleRegistry {
    battles: HashMap<String, Battle>,
}

impl BattleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a battle, replacing any battle with the same id.
    pub fn add(&mut self, battle: Battle) {
        self.battles.insert(battle.id.clone(), battle);
    }

    /// Get a battle.
    pub fn get(&self, battle_id: &str) -> Option<&Battle> {
        self.battles.get(battle_id)
    }

    /// Get a mutable battle.
    pub fn get_mut(&mut self, battle_id: &str) -> Option<&mut Battle> {
        self.battles.get_mut(battle_id)
    }

    /// Check if a battle is live.
    pub fn contains(&self, battle_id: &str) -> bool {
        self.battles.contains_key(battle_id)
    }

    /// Remove a battle.
    pub fn remove(&mut self, battle_id: &str) -> Option<Battle> {
        self.battles.remove(battle_id)
    }

    /// Ids of live battles a participant plays in.
    pub fn battles_for(&self, participant_id: &str) -> Vec<String> {
        self.battles
            .values()
            .filter(|b| b.has_player(participant_id))
            .map(|b| b.id.clone())
            .collect()
    }

    /// Count active battles.
    pub fn active_count(&self) -> usize {
        self.battles.values().filter(|b| b.status.is_active()).count()
    }

    /// Total battle count.
    pub fn count(&self) -> usize {
        self.battles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn make_battle() -> Battle {
        Battle::create(
            &Participant::new("x", "France"),
            &Participant::new("y", "Germany"),
        )
    }

    fn fixed_table(damage: u32) -> DamageTable {
        DamageTable {
            min_damage: damage,
            damage_range: 0,
            crit_multiplier: 1.5,
            crit_chance: 0.0,
        }
    }

    #[test]
    fn test_battle_create() {
        let battle = make_battle();

        assert_eq!(battle.id, "battle_x_y");
        assert_eq!(battle.status, BattleStatus::Active);
        assert_eq!(battle.turn.as_deref(), Some("x"));
        assert!(battle.players().iter().all(|p| p.hp == MAX_HP && !p.is_boss));
        assert_eq!(battle.players()[0].region, "France");
        assert_eq!(battle.players()[1].region, "Germany");
    }

    #[test]
    fn test_attack_hits_other_player_and_passes_turn() {
        let mut battle = make_battle();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let outcome = battle
            .apply_attack("x", "a polite remark", &fixed_table(20), &mut rng)
            .unwrap();

        assert_eq!(
            outcome,
            AttackOutcome {
                damage: 20,
                is_critical: false,
                defender_id: "y".to_string(),
                finished: false,
                winner_id: None,
            }
        );
        assert_eq!(battle.get_player("y").unwrap().hp, 80);
        assert_eq!(battle.get_player("x").unwrap().hp, 100);
        assert!(battle.is_player_turn("y"));
    }

    #[test]
    fn test_keyword_attack_is_critical() {
        let mut battle = make_battle();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let outcome = battle
            .apply_attack(
                "x",
                "yo mama so fat she needs a passport for each cheek",
                &fixed_table(20),
                &mut rng,
            )
            .unwrap();

        assert!(outcome.is_critical);
        assert_eq!(outcome.damage, 30);
        assert_eq!(battle.get_player("y").unwrap().hp, 70);
        assert_eq!(battle.turn.as_deref(), Some("y"));
    }

    #[test]
    fn test_lethal_attack_finishes_battle() {
        let mut battle = make_battle();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let table = fixed_table(40);

        battle.apply_attack("x", "one", &table, &mut rng).unwrap();
        battle.apply_attack("y", "two", &table, &mut rng).unwrap();
        battle.apply_attack("x", "three", &table, &mut rng).unwrap();
        battle.apply_attack("y", "four", &table, &mut rng).unwrap();
        let outcome = battle.apply_attack("x", "five", &table, &mut rng).unwrap();

        assert!(outcome.finished);
        assert_eq!(outcome.winner_id.as_deref(), Some("x"));
        assert_eq!(battle.get_player("y").unwrap().hp, 0);
        assert_eq!(battle.status, BattleStatus::Finished);
        assert_eq!(battle.turn, None);
        assert!(battle.finished_at.is_some());
    }

    #[test]
    fn test_finished_battle_rejects_attacks() {
        let mut battle = make_battle();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let table = fixed_table(100);

        battle.apply_attack("x", "finisher", &table, &mut rng).unwrap();
        let snapshot = battle.clone();

        assert!(battle.apply_attack("y", "revenge", &table, &mut rng).is_none());
        assert_eq!(battle, snapshot);
    }

    #[test]
    fn test_non_member_attack_is_ignored() {
        let mut battle = make_battle();
        let snapshot = battle.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let outcome = battle.apply_attack("z", "hello", &fixed_table(20), &mut rng);

        assert!(outcome.is_none());
        assert_eq!(battle, snapshot);
    }

    #[test]
    fn test_zero_damage_still_passes_turn() {
        let mut battle = make_battle();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let outcome = battle
            .apply_attack("x", "a polite remark", &fixed_table(0), &mut rng)
            .unwrap();

        assert_eq!(outcome.damage, 0);
        assert!(!outcome.finished);
        assert_eq!(battle.turn.as_deref(), Some("y"));
        assert_eq!(battle.get_player("y").unwrap().hp, MAX_HP);
    }

    #[test]
    fn test_local_battle() {
        let battle = Battle::local("Norway", "Sweden");

        assert_eq!(battle.id, LOCAL_BATTLE_ID);
        assert_eq!(battle.turn.as_deref(), Some(LOCAL_PLAYER_ID));
        assert!(battle.get_player(BOSS_ID).unwrap().is_boss);
        assert_eq!(battle.opponent_of(LOCAL_PLAYER_ID).unwrap().region, "Sweden");
    }

    #[test]
    fn test_battle_json_shape() {
        let json = serde_json::to_value(make_battle()).unwrap();

        assert_eq!(json["id"], "battle_x_y");
        assert_eq!(json["status"], "active");
        assert_eq!(json["turn"], "x");
        assert_eq!(json["players"][1]["region"], "Germany");
        assert_eq!(json["players"][1]["hp"], 100);
        assert!(json["players"][0].get("isBoss").is_none());

        let boss_json = serde_json::to_value(Battle::local("Norway", "Sweden")).unwrap();
        assert_eq!(boss_json["players"][1]["isBoss"], true);
    }

    #[test]
    fn test_registry_basic() {
        let mut registry = BattleRegistry::new();
        registry.add(make_battle());

        assert!(registry.contains("battle_x_y"));
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.active_count(), 1);
        assert_eq!(registry.battles_for("y"), vec!["battle_x_y".to_string()]);
        assert!(registry.get("battle_nope").is_none());

        registry.remove("battle_x_y");
        assert!(registry.get("battle_x_y").is_none());
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_registry_mutation_is_visible_by_id() {
        let mut registry = BattleRegistry::new();
        registry.add(make_battle());
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        registry
            .get_mut("battle_x_y")
            .unwrap()
            .apply_attack("x", "hi", &fixed_table(25), &mut rng);

        assert_eq!(registry.get("battle_x_y").unwrap().get_player("y").unwrap().hp, 75);
    }
}
