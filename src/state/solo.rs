//! Local battle against the scripted opponent.
//!
//! Runs entirely in-process: no matchmaking, no broadcast. Attacks go through
//! the same [`Battle::apply_attack`] and [`DamageTable`] as networked battles.

use rand::Rng;

use super::battle::{AttackOutcome, Battle, BOSS_ID, LOCAL_PLAYER_ID};
use super::damage::DamageTable;
use crate::error::GenerationError;

/// Candidate attacks offered to the player per turn.
pub const CHOICE_SLOTS: usize = 3;

/// Generation attempts per candidate slot.
pub const CHOICE_ATTEMPTS: usize = 3;

/// Candidates this short (in chars, after trimming) are discarded.
pub const MIN_CHOICE_LEN: usize = 10;

const REFUSAL_STARTS: &[&str] = &[
    "i'm sorry, but i can't",
    "i am sorry, but i can't",
    "i'm sorry, i can't",
    "sorry, i can't help with that",
    "i can't help with that",
    "i cannot help with that",
    "i can't assist with that",
    "i cannot assist with that",
    "i'm not able to help",
    "i am not able to help",
    "i won't be able to",
    "i will not help",
    "i don't feel comfortable",
    "as an ai language model",
    "as an ai, i",
];

const REFUSAL_ANYWHERE: &[&str] = &[
    "against my guidelines",
    "violates my",
    "not able to fulfill",
    "cannot fulfill this",
];

/// Produces attack text for one attacker against one target.
pub trait RoastSource {
    fn roast(
        &mut self,
        target_region: &str,
        attacker_region: &str,
    ) -> Result<String, GenerationError>;
}

/// Check whether generated text is a model refusal rather than a roast.
pub fn is_refusal(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    if REFUSAL_STARTS.iter().any(|p| lower.starts_with(p)) {
        return true;
    }
    if REFUSAL_ANYWHERE.iter().any(|p| lower.contains(p)) {
        return true;
    }
    lower.chars().count() < 60 && (lower.contains("can't help") || lower.contains("cannot help"))
}

/// Fill up to `slots` attack candidates, retrying each slot up to `attempts`
/// times. Refusals, failures and too-short texts are skipped.
pub fn draw_choices<S: RoastSource + ?Sized>(
    source: &mut S,
    target_region: &str,
    attacker_region: &str,
    slots: usize,
    attempts: usize,
) -> Vec<String> {
    let mut choices = Vec::with_capacity(slots);

    for slot in 0..slots {
        for attempt in 0..attempts {
            match source.roast(target_region, attacker_region) {
                Ok(text) if !is_refusal(&text) && text.trim().chars().count() > MIN_CHOICE_LEN => {
                    choices.push(text.trim().to_string());
                    break;
                }
                Ok(_) => tracing::debug!(slot, attempt, "discarded unusable roast"),
                Err(err) => tracing::debug!(slot, attempt, %err, "roast generation failed"),
            }
        }
    }

    choices
}

/// Canned roasts for offline play.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRoasts {
    next: usize,
}

impl ScriptedRoasts {
    const LINES: &'static [&'static str] = &[
        "Yo mama so {target}, she queued for the queue and complained it was too short.",
        "Yo mama so {target}, her passport photo asked for a retake.",
        "Yo mama so {target}, the tourist board paid her to stay home.",
        "Yo mama so {target}, even {attacker} felt sorry for her cooking.",
        "Yo mama so {target}, she brought a map to her own kitchen.",
    ];

    pub fn new() -> Self {
        Self::default()
    }
}

impl RoastSource for ScriptedRoasts {
    fn roast(
        &mut self,
        target_region: &str,
        attacker_region: &str,
    ) -> Result<String, GenerationError> {
        let line = Self::LINES[self.next % Self::LINES.len()];
        self.next += 1;
        Ok(line
            .replace("{target}", target_region)
            .replace("{attacker}", attacker_region))
    }
}

/// One resolved attack, as shown in the battle log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackLogEntry {
    pub attacker_region: String,
    pub target_region: String,
    pub text: String,
    pub damage: u32,
    pub is_critical: bool,
}

/// A local battle plus its attack log.
#[derive(Debug, Clone)]
pub struct SoloBattle {
    battle: Battle,
    table: DamageTable,
    /// Newest first
    log: Vec<AttackLogEntry>,
}

impl SoloBattle {
    pub fn new(player_region: &str, opponent_region: &str, table: DamageTable) -> Self {
        Self {
            battle: Battle::local(player_region, opponent_region),
            table,
            log: Vec::new(),
        }
    }

    pub fn battle(&self) -> &Battle {
        &self.battle
    }

    pub fn log(&self) -> &[AttackLogEntry] {
        &self.log
    }

    pub fn is_player_turn(&self) -> bool {
        self.battle.is_player_turn(LOCAL_PLAYER_ID)
    }

    pub fn is_boss_turn(&self) -> bool {
        self.battle.is_player_turn(BOSS_ID)
    }

    pub fn is_finished(&self) -> bool {
        !self.battle.status.is_active()
    }

    /// Player attacks with a chosen text. `None` if it isn't their turn.
    pub fn player_attack<R: Rng + ?Sized>(
        &mut self,
        text: &str,
        rng: &mut R,
    ) -> Option<AttackOutcome> {
        if !self.is_player_turn() {
            return None;
        }
        self.apply(LOCAL_PLAYER_ID, text, rng)
    }

    /// Let the scripted opponent take its turn.
    ///
    /// Returns `Ok(None)` if it isn't the opponent's turn. A generation
    /// failure leaves the battle untouched.
    pub fn boss_turn<S, R>(
        &mut self,
        source: &mut S,
        rng: &mut R,
    ) -> Result<Option<AttackOutcome>, GenerationError>
    where
        S: RoastSource + ?Sized,
        R: Rng + ?Sized,
    {
        if !self.is_boss_turn() {
            return Ok(None);
        }
        let (Some(boss), Some(player)) = (
            self.battle.get_player(BOSS_ID),
            self.battle.get_player(LOCAL_PLAYER_ID),
        ) else {
            return Ok(None);
        };

        let text = source.roast(&player.region, &boss.region)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(GenerationError::Empty);
        }

        Ok(self.apply(BOSS_ID, text, rng))
    }

    /// Attack candidates for the player's current turn.
    pub fn player_choices<S: RoastSource + ?Sized>(&self, source: &mut S) -> Vec<String> {
        let (Some(player), Some(boss)) = (
            self.battle.get_player(LOCAL_PLAYER_ID),
            self.battle.get_player(BOSS_ID),
        ) else {
            return Vec::new();
        };
        draw_choices(source, &boss.region, &player.region, CHOICE_SLOTS, CHOICE_ATTEMPTS)
    }

    fn apply<R: Rng + ?Sized>(
        &mut self,
        attacker_id: &str,
        text: &str,
        rng: &mut R,
    ) -> Option<AttackOutcome> {
        let attacker_region = self.battle.get_player(attacker_id)?.region.clone();
        let target_region = self.battle.opponent_of(attacker_id)?.region.clone();

        let outcome = self.battle.apply_attack(attacker_id, text, &self.table, rng)?;

        self.log.insert(
            0,
            AttackLogEntry {
                attacker_region,
                target_region,
                text: text.to_string(),
                damage: outcome.damage,
                is_critical: outcome.is_critical,
            },
        );

        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::battle::MAX_HP;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct FailingSource;

    impl RoastSource for FailingSource {
        fn roast(&mut self, _: &str, _: &str) -> Result<String, GenerationError> {
            Err(GenerationError::Unavailable("connection refused".to_string()))
        }
    }

    /// Replays a fixed list of responses.
    struct ReplaySource(Vec<Result<String, GenerationError>>);

    impl RoastSource for ReplaySource {
        fn roast(&mut self, _: &str, _: &str) -> Result<String, GenerationError> {
            if self.0.is_empty() {
                return Err(GenerationError::Empty);
            }
            self.0.remove(0)
        }
    }

    fn quiet_table(damage: u32) -> DamageTable {
        DamageTable {
            min_damage: damage,
            damage_range: 0,
            crit_multiplier: 1.5,
            crit_chance: 0.0,
        }
    }

    #[test]
    fn test_is_refusal() {
        assert!(is_refusal("I'm sorry, but I can't write that joke."));
        assert!(is_refusal("  As an AI language model, I must decline"));
        assert!(is_refusal("That request violates my content policy, so no."));
        assert!(is_refusal("Sorry, can't help."));
        assert!(!is_refusal("Yo mama so Dutch, she split the bill with herself."));
    }

    #[test]
    fn test_player_then_boss() {
        let mut solo = SoloBattle::new("Norway", "Sweden", quiet_table(20));
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut source = ScriptedRoasts::new();

        assert!(solo.is_player_turn());
        // Boss can't act out of turn
        assert_eq!(solo.boss_turn(&mut source, &mut rng).unwrap(), None);

        solo.player_attack("a fine opener", &mut rng).unwrap();
        assert!(solo.is_boss_turn());
        assert!(solo.player_attack("again!", &mut rng).is_none());

        let outcome = solo.boss_turn(&mut source, &mut rng).unwrap().unwrap();
        assert_eq!(outcome.defender_id, LOCAL_PLAYER_ID);
        assert!(solo.is_player_turn());

        assert_eq!(solo.log().len(), 2);
        assert_eq!(solo.log()[0].attacker_region, "Sweden");
        assert_eq!(solo.log()[0].target_region, "Norway");
        assert!(solo.log()[0].text.contains("Norway"));
        assert_eq!(solo.log()[1].attacker_region, "Norway");
    }

    #[test]
    fn test_boss_generation_failure_leaves_state() {
        let mut solo = SoloBattle::new("Norway", "Sweden", quiet_table(20));
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        solo.player_attack("a fine opener", &mut rng).unwrap();
        let before = solo.battle().clone();

        let result = solo.boss_turn(&mut FailingSource, &mut rng);

        assert!(matches!(result, Err(GenerationError::Unavailable(_))));
        assert_eq!(solo.battle(), &before);
        assert!(solo.is_boss_turn());
        assert_eq!(solo.log().len(), 1);
    }

    #[test]
    fn test_boss_blank_text_is_rejected() {
        let mut solo = SoloBattle::new("Norway", "Sweden", quiet_table(20));
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        solo.player_attack("a fine opener", &mut rng).unwrap();

        let mut source = ReplaySource(vec![Ok("   ".to_string())]);

        assert_eq!(solo.boss_turn(&mut source, &mut rng), Err(GenerationError::Empty));
        assert_eq!(solo.battle().get_player(LOCAL_PLAYER_ID).unwrap().hp, MAX_HP);
    }

    #[test]
    fn test_solo_battle_finishes() {
        let mut solo = SoloBattle::new("Norway", "Sweden", quiet_table(50));
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut source = ScriptedRoasts::new();

        solo.player_attack("first", &mut rng).unwrap();
        solo.boss_turn(&mut source, &mut rng).unwrap();
        let outcome = solo.player_attack("second", &mut rng).unwrap();

        assert!(outcome.finished);
        assert_eq!(outcome.winner_id.as_deref(), Some(LOCAL_PLAYER_ID));
        assert!(solo.is_finished());
        assert!(!solo.is_player_turn());
        assert!(!solo.is_boss_turn());
    }

    #[test]
    fn test_draw_choices_retries_and_filters() {
        let mut source = ReplaySource(vec![
            Ok("I'm sorry, but I can't do that.".to_string()),
            Ok("  Yo mama so Welsh, she sang the bill.  ".to_string()),
            Err(GenerationError::Unavailable("timeout".to_string())),
            Ok("too short".to_string()),
            Ok("Yo mama so Irish, the rain asked her for shelter.".to_string()),
            Err(GenerationError::Unavailable("timeout".to_string())),
            Err(GenerationError::Unavailable("timeout".to_string())),
            Err(GenerationError::Unavailable("timeout".to_string())),
        ]);

        let choices = draw_choices(&mut source, "Wales", "England", 3, 3);

        assert_eq!(
            choices,
            vec![
                "Yo mama so Welsh, she sang the bill.".to_string(),
                "Yo mama so Irish, the rain asked her for shelter.".to_string(),
            ]
        );
    }

    #[test]
    fn test_player_choices_target_the_boss() {
        let solo = SoloBattle::new("Norway", "Sweden", DamageTable::default());

        let choices = solo.player_choices(&mut ScriptedRoasts::new());

        assert_eq!(choices.len(), CHOICE_SLOTS);
        assert!(choices.iter().all(|c| c.contains("Sweden")));
    }
}
