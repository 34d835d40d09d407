//! Weapon Profiles

use serde::{Deserialize, Serialize};

use crate::error::{ArcadeError, ArcadeResult};

/// Stats of the gun a match is played with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponProfile {
    /// Preset name.
    pub name: String,
    /// Health removed from a bird per hit.
    pub damage: u32,
    /// Shots available for the whole match.
    pub starting_ammo: u32,
    /// Fraction of wind cancelled, 0.0 (none) to 1.0 (all).
    pub wind_resistance: f64,
}

impl WeaponProfile {
    /// Build a custom profile.
    pub fn new(name: impl Into<String>, damage: u32, starting_ammo: u32, wind_resistance: f64) -> Self {
        Self {
            name: name.into(),
            damage,
            starting_ammo,
            wind_resistance,
        }
    }

    /// Light, plenty of ammo, fully exposed to wind.
    pub fn pistol() -> Self {
        Self::new("pistol", 1, 12, 0.0)
    }

    /// Heavier hits, fewer shells.
    pub fn shotgun() -> Self {
        Self::new("shotgun", 2, 8, 0.2)
    }

    /// One-shots most birds, barely moved by wind.
    pub fn rifle() -> Self {
        Self::new("rifle", 3, 6, 0.6)
    }

    /// Look up a preset by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "pistol" => Some(Self::pistol()),
            "shotgun" => Some(Self::shotgun()),
            "rifle" => Some(Self::rifle()),
            _ => None,
        }
    }

    /// Reject profiles the engine cannot run.
    pub fn validate(&self) -> ArcadeResult<()> {
        if self.damage == 0 {
            return Err(ArcadeError::InvalidConfig(format!(
                "weapon {} deals no damage",
                self.name
            )));
        }
        if !(0.0..=1.0).contains(&self.wind_resistance) {
            return Err(ArcadeError::InvalidConfig(format!(
                "weapon {} wind resistance {} outside [0, 1]",
                self.name, self.wind_resistance
            )));
        }
        Ok(())
    }
}
