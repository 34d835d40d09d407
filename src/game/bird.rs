//! Birds and Match Layout
//!
//! The initial layout of a match is a pure function of the session's secret
//! seed, the level and the engine config:
//!
//! ```text
//! wind     = derive(seed, "wind", 0)           word 0  -> [-WIND_MAX, WIND_MAX]
//! bird[i]  = derive(seed, "birds", i)          word 0  -> kind (weighted bucket)
//!                                              word 1  -> x
//!                                              word 2  -> y within the kind's band
//!                                              word 3  -> speed jitter
//! ```
//!
//! Once generated, bird movement belongs to the client and is never trusted.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::core::fairness::{derive, pick_bucket, word, word_to_bps, word_to_unit};
use crate::game::weapon::WeaponProfile;

/// Message label for the wind derivation.
pub const WIND_LABEL: &str = "wind";

/// Message label for bird derivations.
pub const BIRDS_LABEL: &str = "birds";

/// Species of target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BirdKind {
    /// Common, fragile, low value.
    Sparrow,
    /// Common, sturdy.
    Pigeon,
    /// Flies high.
    Crow,
    /// Fast and tough.
    Hawk,
    /// Rare bonus bird.
    Golden,
}

/// Spawn template for one kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BirdTemplate {
    /// Kind produced.
    pub kind: BirdKind,
    /// Spawn weight in basis points.
    pub weight_bps: u32,
    /// Starting health.
    pub health: u32,
    /// Points for a kill, before combo bonus.
    pub point_value: u32,
    /// Speed at level 1 (arena units per second).
    pub base_speed: f64,
    /// Top of the flight band as a fraction of arena height.
    pub min_y: f64,
    /// Bottom of the flight band as a fraction of arena height.
    pub max_y: f64,
}

impl BirdTemplate {
    /// Stock catalogue. Weights total 100%.
    pub fn catalogue() -> Vec<BirdTemplate> {
        vec![
            BirdTemplate {
                kind: BirdKind::Sparrow,
                weight_bps: 4_000,
                health: 1,
                point_value: 10,
                base_speed: 120.0,
                min_y: 0.45,
                max_y: 0.80,
            },
            BirdTemplate {
                kind: BirdKind::Pigeon,
                weight_bps: 2_800,
                health: 2,
                point_value: 15,
                base_speed: 90.0,
                min_y: 0.35,
                max_y: 0.75,
            },
            BirdTemplate {
                kind: BirdKind::Crow,
                weight_bps: 1_800,
                health: 2,
                point_value: 20,
                base_speed: 140.0,
                min_y: 0.10,
                max_y: 0.45,
            },
            BirdTemplate {
                kind: BirdKind::Hawk,
                weight_bps: 1_100,
                health: 3,
                point_value: 35,
                base_speed: 200.0,
                min_y: 0.05,
                max_y: 0.35,
            },
            BirdTemplate {
                kind: BirdKind::Golden,
                weight_bps: 300,
                health: 2,
                point_value: 100,
                base_speed: 260.0,
                min_y: 0.05,
                max_y: 0.25,
            },
        ]
    }
}

/// A target in the arena.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Index within the match.
    pub id: u32,
    /// Species.
    pub kind: BirdKind,
    /// Spawn x (server's last-known position).
    pub x: f64,
    /// Spawn y (server's last-known position).
    pub y: f64,
    /// Flight speed after level scaling.
    pub speed: f64,
    /// Remaining health.
    pub health: u32,
    /// Points for a kill.
    pub point_value: u32,
    /// False once health reaches zero.
    pub alive: bool,
}

/// Horizontal wind applied to shots, after weapon damping.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    /// Signed horizontal component.
    pub x: f64,
}

/// Wind for a match: raw wind in `[-wind_max, wind_max]`, damped by the
/// weapon's resistance.
pub fn derive_wind(secret_seed: &str, config: &EngineConfig, weapon: &WeaponProfile) -> Wind {
    let raw = derive(secret_seed, WIND_LABEL, 0);
    let unit = word_to_unit(word(&raw, 0));
    let x = (unit * 2.0 - 1.0) * config.wind_max * (1.0 - weapon.wind_resistance);
    Wind { x }
}

/// Number of birds at `level`.
pub fn entity_count(level: u32, config: &EngineConfig) -> u32 {
    config
        .base_entities
        .saturating_add(level.saturating_mul(config.per_level_entities))
}

/// Speed multiplier for `level` (level 1 is unscaled).
pub fn level_speed_factor(level: u32, config: &EngineConfig) -> f64 {
    1.0 + level.saturating_sub(1) as f64 * config.level_speed_step
}

/// Generate the initial birds for a match.
pub fn generate_entities(secret_seed: &str, level: u32, config: &EngineConfig) -> Vec<Entity> {
    let count = entity_count(level, config);
    let speed_factor = level_speed_factor(level, config);
    let weights: Vec<u32> = config.birds.iter().map(|b| b.weight_bps).collect();

    (0..count)
        .filter_map(|index| {
            let raw = derive(secret_seed, BIRDS_LABEL, index as u64);
            let pick = pick_bucket(weights.iter().copied(), word_to_bps(word(&raw, 0)))?;
            let template = &config.birds[pick.index];

            let x = word_to_unit(word(&raw, 1)) * config.arena_width;
            let band = template.min_y + word_to_unit(word(&raw, 2)) * (template.max_y - template.min_y);
            let y = band * config.arena_height;
            let jitter = 0.85 + 0.3 * word_to_unit(word(&raw, 3));

            Some(Entity {
                id: index,
                kind: template.kind,
                x,
                y,
                speed: template.base_speed * speed_factor * jitter,
                health: template.health,
                point_value: template.point_value,
                alive: true,
            })
        })
        .collect()
}
