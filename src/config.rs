//! Server configuration from flags and environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;

use crate::error::ServerError;
use crate::state::damage::{
    DamageTable, DEFAULT_CRIT_CHANCE, DEFAULT_CRIT_MULTIPLIER, DEFAULT_DAMAGE_RANGE,
    DEFAULT_MIN_DAMAGE,
};

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone, Parser)]
#[command(name = "roast-arena", version, about = "Roast Arena matchmaking and battle server")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "ROAST_ARENA_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Seed for damage rolls (random if unset)
    #[arg(long, env = "ROAST_ARENA_SEED")]
    pub seed: Option<u64>,

    /// Lowest base damage
    #[arg(long, default_value_t = DEFAULT_MIN_DAMAGE)]
    pub min_damage: u32,

    /// Width of the base damage range
    #[arg(long, default_value_t = DEFAULT_DAMAGE_RANGE)]
    pub damage_range: u32,

    /// Chance of a random critical hit, 0.0 to 1.0
    #[arg(long, default_value_t = DEFAULT_CRIT_CHANCE)]
    pub crit_chance: f64,

    /// Critical hit multiplier
    #[arg(long, default_value_t = DEFAULT_CRIT_MULTIPLIER)]
    pub crit_multiplier: f64,
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Validated damage table.
    pub fn damage_table(&self) -> Result<DamageTable, ServerError> {
        if self.min_damage.checked_add(self.damage_range).is_none() {
            return Err(ServerError::Config(format!(
                "min damage {} plus range {} overflows",
                self.min_damage, self.damage_range
            )));
        }
        if !(0.0..=1.0).contains(&self.crit_chance) {
            return Err(ServerError::Config(format!(
                "crit chance must be within 0..=1, got {}",
                self.crit_chance
            )));
        }
        if !self.crit_multiplier.is_finite() || self.crit_multiplier < 1.0 {
            return Err(ServerError::Config(format!(
                "crit multiplier must be at least 1, got {}",
                self.crit_multiplier
            )));
        }

        Ok(DamageTable {
            min_damage: self.min_damage,
            damage_range: self.damage_range,
            crit_multiplier: self.crit_multiplier,
            crit_chance: self.crit_chance,
        })
    }
}
