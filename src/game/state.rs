//! Match Session State
//!
//! A shooting-gallery match is seeded once, then mutated only by shots and
//! by `finish`. All mutation here is synchronous and in-memory; the
//! registry's per-session lock serializes callers.
//!
//! ## Shot validation
//!
//! The server does not simulate bird flight, so it cannot demand a tight
//! spatial match between a shot and a bird. Two paths are tried in order:
//!
//! 1. **Trusted id**: the client names the bird it hit. Accepted if the bird
//!    is alive and the reported point lies inside the arena grown by
//!    `drift_margin`. The bird's own position is not checked.
//! 2. **Proximity**: otherwise, the alive bird closest in y to the shot,
//!    within `hit_tolerance`, wins, provided the shot's x is inside the
//!    arena's horizontal bounds.
//!
//! Shots outside the arena grown by `spoof_margin` are rejected outright.
//! Tightening either path into real hit-testing changes payout odds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::core::hash::{commit_seed, AuditHasher};
use crate::error::{ArcadeError, ArcadeResult};
use crate::game::bird::{derive_wind, generate_entities, Entity, Wind};
use crate::game::registry::SessionId;
use crate::game::weapon::WeaponProfile;
use crate::proof::commitment::PlayerId;

/// Lifecycle of a match. `Completed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Accepting shots.
    Active,
    /// Ended; no further mutation.
    Completed,
}

/// A shot as reported by the client.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    /// Reported x.
    pub x: f64,
    /// Reported y.
    pub y: f64,
    /// Bird the client believes it hit.
    #[serde(default)]
    pub entity_id_hint: Option<u32>,
}

impl Shot {
    /// Shot without an id hint.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            entity_id_hint: None,
        }
    }

    /// Shot naming a bird.
    pub fn at_entity(x: f64, y: f64, entity_id: u32) -> Self {
        Self {
            x,
            y,
            entity_id_hint: Some(entity_id),
        }
    }
}

/// Which validation path accepted a hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitPath {
    /// Client-named bird, bounds-checked.
    TrustedId,
    /// Nearest bird by vertical distance.
    Proximity,
}

/// Result of one shot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShotResult {
    /// Did the shot hit a bird.
    pub hit: bool,
    /// Bird that was hit.
    pub entity_id: Option<u32>,
    /// Score after this shot.
    pub score_after: u64,
    /// Combo after this shot.
    pub combo_after: u32,
    /// Whether the hit bird survived.
    pub entity_still_alive: Option<bool>,
    /// Ammo left after this shot.
    pub ammo_remaining: u32,
    /// Path that accepted the hit.
    pub path: Option<HitPath>,
}

/// Live state of one match.
#[derive(Clone, Debug)]
pub struct MatchSession {
    /// Session id.
    pub id: SessionId,
    /// Player who owns the match.
    pub owner_id: PlayerId,
    secret_seed: String,
    /// Public commitment of the layout seed.
    pub seed_hash: String,
    /// Difficulty level.
    pub level: u32,
    /// Wind after weapon damping.
    pub wind: Wind,
    /// Birds.
    pub entities: Vec<Entity>,
    /// Points so far.
    pub score: u64,
    /// Consecutive hits.
    pub combo: u32,
    /// Best combo this match.
    pub max_combo_seen: u32,
    /// Shots fired.
    pub shots_fired: u32,
    /// Shots that hit.
    pub hits_landed: u32,
    /// Shots left.
    pub ammo_remaining: u32,
    /// Weapon in use.
    pub weapon: WeaponProfile,
    /// Lifecycle state.
    pub status: MatchStatus,
    /// Creation time.
    pub started_at: DateTime<Utc>,
    /// Completion time.
    pub ended_at: Option<DateTime<Utc>>,
    /// Tamper-evidence fingerprint of the current state.
    pub audit_hash: String,
}

impl MatchSession {
    /// Build a match from a known layout seed.
    pub fn with_seed(
        id: SessionId,
        owner_id: PlayerId,
        secret_seed: String,
        level: u32,
        weapon: WeaponProfile,
        config: &EngineConfig,
    ) -> Self {
        let wind = derive_wind(&secret_seed, config, &weapon);
        let entities = generate_entities(&secret_seed, level, config);
        let audit_hash = compute_audit_hash(&secret_seed, 0, 0, 0, None);

        Self {
            id,
            owner_id,
            seed_hash: commit_seed(&secret_seed),
            secret_seed,
            level,
            wind,
            entities,
            score: 0,
            combo: 0,
            max_combo_seen: 0,
            shots_fired: 0,
            hits_landed: 0,
            ammo_remaining: weapon.starting_ammo,
            weapon,
            status: MatchStatus::Active,
            started_at: Utc::now(),
            ended_at: None,
            audit_hash,
        }
    }

    /// True while shots are accepted.
    pub fn is_active(&self) -> bool {
        self.status == MatchStatus::Active
    }

    /// Number of birds still alive.
    pub fn alive_count(&self) -> usize {
        self.entities.iter().filter(|e| e.alive).count()
    }

    /// Resolve one shot.
    ///
    /// Rejected shots (inactive session, spoofed coordinates, empty gun)
    /// leave the session untouched. A miss is a normal result.
    pub fn apply_shot(&mut self, shot: &Shot, config: &EngineConfig) -> ArcadeResult<ShotResult> {
        if !self.is_active() {
            return Err(ArcadeError::SessionNotActive(self.id));
        }
        if !config.within_arena(shot.x, shot.y, config.spoof_margin) {
            return Err(ArcadeError::InvalidCoordinates { x: shot.x, y: shot.y });
        }
        if self.ammo_remaining == 0 {
            return Err(ArcadeError::OutOfAmmo(self.id));
        }

        self.shots_fired += 1;
        self.ammo_remaining -= 1;

        let target = self
            .trusted_target(shot, config)
            .map(|i| (i, HitPath::TrustedId))
            .or_else(|| self.proximity_target(shot, config).map(|i| (i, HitPath::Proximity)));

        let result = match target {
            Some((index, path)) => self.register_hit(index, path, config),
            None => {
                self.combo = 0;
                ShotResult {
                    hit: false,
                    entity_id: None,
                    score_after: self.score,
                    combo_after: 0,
                    entity_still_alive: None,
                    ammo_remaining: self.ammo_remaining,
                    path: None,
                }
            }
        };

        self.refresh_audit_hash();
        debug!(
            session = %self.id,
            hit = result.hit,
            entity = ?result.entity_id,
            score = self.score,
            combo = self.combo,
            "Shot resolved"
        );
        Ok(result)
    }

    fn trusted_target(&self, shot: &Shot, config: &EngineConfig) -> Option<usize> {
        let hint = shot.entity_id_hint?;
        let index = self.entities.iter().position(|e| e.id == hint && e.alive)?;
        config
            .within_arena(shot.x, shot.y, config.drift_margin)
            .then_some(index)
    }

    fn proximity_target(&self, shot: &Shot, config: &EngineConfig) -> Option<usize> {
        if shot.x < 0.0 || shot.x > config.arena_width {
            return None;
        }
        // Birds fly sideways and x is client-simulated, so rank by y first.
        self.entities
            .iter()
            .enumerate()
            .filter(|(_, e)| e.alive)
            .map(|(i, e)| (i, (e.y - shot.y).abs(), (e.x - shot.x).abs()))
            .filter(|(_, dy, _)| *dy <= config.hit_tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.2.total_cmp(&b.2)))
            .map(|(i, _, _)| i)
    }

    fn register_hit(&mut self, index: usize, path: HitPath, config: &EngineConfig) -> ShotResult {
        self.hits_landed += 1;
        self.combo += 1;
        self.max_combo_seen = self.max_combo_seen.max(self.combo);

        let combo = self.combo;
        let damage = self.weapon.damage;
        let entity = &mut self.entities[index];
        entity.health = entity.health.saturating_sub(damage);

        let mut gained = 0;
        if entity.health == 0 {
            entity.alive = false;
            gained = combo_points(entity.point_value, combo, config.combo_bonus_rate);
        }
        let entity_id = entity.id;
        let still_alive = entity.alive;
        self.score = self.score.saturating_add(gained);

        ShotResult {
            hit: true,
            entity_id: Some(entity_id),
            score_after: self.score,
            combo_after: self.combo,
            entity_still_alive: Some(still_alive),
            ammo_remaining: self.ammo_remaining,
            path: Some(path),
        }
    }

    /// Move to `Completed`. Returns false if already completed.
    pub fn finish(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.status = MatchStatus::Completed;
        self.ended_at = Some(Utc::now());
        self.refresh_audit_hash();
        true
    }

    fn refresh_audit_hash(&mut self) {
        self.audit_hash = compute_audit_hash(
            &self.secret_seed,
            self.score,
            self.shots_fired,
            self.hits_landed,
            self.ended_at,
        );
    }

    /// Serializable view. The layout seed is included only once completed.
    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            id: self.id,
            owner_id: self.owner_id.clone(),
            seed_hash: self.seed_hash.clone(),
            revealed_seed: (!self.is_active()).then(|| self.secret_seed.clone()),
            level: self.level,
            wind: self.wind,
            entities: self.entities.clone(),
            score: self.score,
            combo: self.combo,
            max_combo_seen: self.max_combo_seen,
            shots_fired: self.shots_fired,
            hits_landed: self.hits_landed,
            ammo_remaining: self.ammo_remaining,
            weapon: self.weapon.clone(),
            status: self.status,
            started_at: self.started_at,
            ended_at: self.ended_at,
            audit_hash: self.audit_hash.clone(),
        }
    }
}

/// Points for a kill at the given combo: `round(points * (1 + combo * rate))`.
pub fn combo_points(point_value: u32, combo: u32, rate: f64) -> u64 {
    (point_value as f64 * (1.0 + combo as f64 * rate)).round() as u64
}

/// Audit hash over the seed and counters, plus the end time once completed.
pub fn compute_audit_hash(
    secret_seed: &str,
    score: u64,
    shots_fired: u32,
    hits_landed: u32,
    ended_at: Option<DateTime<Utc>>,
) -> String {
    let mut hasher = AuditHasher::for_match();
    hasher.update_str(secret_seed);
    hasher.update_u64(score);
    hasher.update_u32(shots_fired);
    hasher.update_u32(hits_landed);
    if let Some(ended_at) = ended_at {
        hasher.update_bool(true);
        hasher.update_i64(ended_at.timestamp_millis());
    }
    hasher.finalize_hex()
}

/// Public, serializable copy of a match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    /// Session id.
    pub id: SessionId,
    /// Owner.
    pub owner_id: PlayerId,
    /// Commitment of the layout seed.
    pub seed_hash: String,
    /// Layout seed, present once the match is completed.
    pub revealed_seed: Option<String>,
    /// Level.
    pub level: u32,
    /// Wind.
    pub wind: Wind,
    /// Birds.
    pub entities: Vec<Entity>,
    /// Score.
    pub score: u64,
    /// Combo.
    pub combo: u32,
    /// Best combo.
    pub max_combo_seen: u32,
    /// Shots fired.
    pub shots_fired: u32,
    /// Hits landed.
    pub hits_landed: u32,
    /// Ammo left.
    pub ammo_remaining: u32,
    /// Weapon.
    pub weapon: WeaponProfile,
    /// Status.
    pub status: MatchStatus,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// End time.
    pub ended_at: Option<DateTime<Utc>>,
    /// Audit hash.
    pub audit_hash: String,
}
