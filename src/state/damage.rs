//! Damage resolution.
//!
//! Turns one attack text into a damage value. Pure apart from the entropy
//! source, which callers pass in so outcomes can be pinned with a seed.

use rand::Rng;

/// Words that always land a critical hit (case-insensitive substring match).
pub const CRIT_KEYWORDS: &[&str] = &[
    "fat", "ugly", "stupid", "old", "poor", "nasty", "dumb", "smell",
];

/// Lowest base damage.
pub const DEFAULT_MIN_DAMAGE: u32 = 10;

/// Width of the base damage range.
pub const DEFAULT_DAMAGE_RANGE: u32 = 20;

/// Multiplier applied on a critical hit.
pub const DEFAULT_CRIT_MULTIPLIER: f64 = 1.5;

/// Chance of a critical hit regardless of the text.
pub const DEFAULT_CRIT_CHANCE: f64 = 0.1;

/// Result of resolving one attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageRoll {
    pub damage: u32,
    pub is_critical: bool,
}

/// Game-balance constants for damage resolution.
///
/// Shared by networked battles and the solo driver so both resolve attacks
/// with the same formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageTable {
    /// Lowest base damage
    pub min_damage: u32,

    /// Base damage is drawn from `min_damage..min_damage + damage_range`
    pub damage_range: u32,

    /// Critical multiplier (result is floored)
    pub crit_multiplier: f64,

    /// Probability in `[0, 1]` of a random critical
    pub crit_chance: f64,
}

impl Default for DamageTable {
    fn default() -> Self {
        Self {
            min_damage: DEFAULT_MIN_DAMAGE,
            damage_range: DEFAULT_DAMAGE_RANGE,
            crit_multiplier: DEFAULT_CRIT_MULTIPLIER,
            crit_chance: DEFAULT_CRIT_CHANCE,
        }
    }
}

impl DamageTable {
    /// Resolve an attack text into damage.
    ///
    /// Draws the base value first, then the random-critical roll.
    pub fn resolve<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> DamageRoll {
        let base = self.roll_base(rng);
        let random_crit = rng.gen::<f64>() < self.crit_chance;
        let is_critical = has_crit_keyword(text) || random_crit;

        let damage = if is_critical {
            (base as f64 * self.crit_multiplier).floor() as u32
        } else {
            base
        };

        DamageRoll {
            damage,
            is_critical,
        }
    }

    /// Largest base damage this table can roll.
    pub fn max_base(&self) -> u32 {
        self.min_damage
            .saturating_add(self.damage_range.saturating_sub(1))
    }

    /// Largest damage this table can produce, critical included.
    pub fn max_damage(&self) -> u32 {
        let crit = (self.max_base() as f64 * self.crit_multiplier).floor() as u32;
        crit.max(self.max_base())
    }

    fn roll_base<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        if self.damage_range == 0 {
            return self.min_damage;
        }
        self.min_damage
            .saturating_add(rng.gen_range(0..self.damage_range))
    }
}

/// Check whether a text contains any critical keyword.
pub fn has_crit_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    CRIT_KEYWORDS.iter().any(|kw| lower.contains(kw))
}
