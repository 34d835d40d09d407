//! Configuration
//!
//! `EngineConfig` holds everything the match engine needs; `ArcadeConfig`
//! adds the network front end. Both read overrides from the environment.

use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::{ArcadeError, ArcadeResult};
use crate::game::bird::BirdTemplate;

/// Tunables for match generation and shot validation.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Arena width in client units.
    pub arena_width: f64,
    /// Arena height in client units.
    pub arena_height: f64,
    /// Slack around the arena accepted on the trusted-id path.
    pub drift_margin: f64,
    /// Shots beyond the arena plus this margin are rejected as spoofed.
    pub spoof_margin: f64,
    /// Max vertical distance for the proximity fallback.
    pub hit_tolerance: f64,
    /// Peak wind before weapon damping.
    pub wind_max: f64,
    /// Birds at level 0.
    pub base_entities: u32,
    /// Extra birds per level.
    pub per_level_entities: u32,
    /// Speed increase per level above 1 (0.15 = +15%).
    pub level_speed_step: f64,
    /// Highest level a match may be started at.
    pub max_level: u32,
    /// Score bonus per combo step (0.1 = +10% per consecutive hit).
    pub combo_bonus_rate: f64,
    /// Reward credited per point, in basis points.
    pub reward_bps: u32,
    /// Spawn catalogue.
    pub birds: Vec<BirdTemplate>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            arena_width: 800.0,
            arena_height: 600.0,
            drift_margin: 60.0,
            spoof_margin: 400.0,
            hit_tolerance: 40.0,
            wind_max: 3.0,
            base_entities: 5,
            per_level_entities: 2,
            level_speed_step: 0.15,
            max_level: 20,
            combo_bonus_rate: 0.1,
            reward_bps: 100,
            birds: BirdTemplate::catalogue(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `ARCADE_*` environment variables.
    pub fn from_env() -> ArcadeResult<Self> {
        let defaults = Self::default();
        let config = Self {
            arena_width: env_or("ARCADE_ARENA_WIDTH", defaults.arena_width)?,
            arena_height: env_or("ARCADE_ARENA_HEIGHT", defaults.arena_height)?,
            hit_tolerance: env_or("ARCADE_HIT_TOLERANCE", defaults.hit_tolerance)?,
            wind_max: env_or("ARCADE_WIND_MAX", defaults.wind_max)?,
            combo_bonus_rate: env_or("ARCADE_COMBO_BONUS_RATE", defaults.combo_bonus_rate)?,
            reward_bps: env_or("ARCADE_REWARD_BPS", defaults.reward_bps)?,
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject geometry and rates the engine cannot work with.
    pub fn validate(&self) -> ArcadeResult<()> {
        let positive = [
            ("arena_width", self.arena_width),
            ("arena_height", self.arena_height),
            ("hit_tolerance", self.hit_tolerance),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(format!("{name} must be a positive number, got {value}")));
            }
        }

        let non_negative = [
            ("drift_margin", self.drift_margin),
            ("spoof_margin", self.spoof_margin),
            ("wind_max", self.wind_max),
            ("level_speed_step", self.level_speed_step),
            ("combo_bonus_rate", self.combo_bonus_rate),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{name} must be >= 0, got {value}")));
            }
        }

        if self.spoof_margin < self.drift_margin {
            return Err(invalid("spoof_margin must be at least drift_margin".to_string()));
        }
        if self.birds.is_empty() {
            return Err(invalid("bird catalogue is empty".to_string()));
        }
        if self.birds.iter().all(|b| b.weight_bps == 0) {
            return Err(invalid("bird catalogue has no weight".to_string()));
        }
        for bird in &self.birds {
            let band_ok = (0.0..=1.0).contains(&bird.min_y)
                && (0.0..=1.0).contains(&bird.max_y)
                && bird.min_y <= bird.max_y;
            if bird.health == 0 || !band_ok {
                return Err(invalid(format!("bird template {:?} is malformed", bird.kind)));
            }
        }
        Ok(())
    }

    /// True if `(x, y)` lies in the arena grown by `margin` on every side.
    pub fn within_arena(&self, x: f64, y: f64, margin: f64) -> bool {
        x >= -margin
            && x <= self.arena_width + margin
            && y >= -margin
            && y <= self.arena_height + margin
    }
}

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ArcadeConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Server version string.
    pub version: String,
    /// Engine tunables.
    pub engine: EngineConfig,
}

impl Default for ArcadeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            version: env!("CARGO_PKG_VERSION").to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl ArcadeConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ArcadeResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            bind_addr: env_or("ARCADE_BIND_ADDR", defaults.bind_addr)?,
            max_connections: env_or("ARCADE_MAX_CONNECTIONS", defaults.max_connections)?,
            version: defaults.version,
            engine: EngineConfig::from_env()?,
        })
    }
}

fn invalid(message: String) -> ArcadeError {
    ArcadeError::InvalidConfig(message)
}

/// Parse `key` from the environment, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> ArcadeResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| invalid(format!("{key}={raw}: {e}"))),
        Err(_) => Ok(default),
    }
}
