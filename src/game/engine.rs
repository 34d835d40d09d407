//! Match Engine
//!
//! Creates, mutates and terminates shooting-gallery matches held in a
//! [`SessionRegistry`]. Each operation takes the session's own lock, so
//! shots and `end` on one match are linearized while different matches run
//! in parallel. Nothing here performs I/O under a session lock.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::core::fairness::BPS_SCALE;
use crate::error::{ArcadeError, ArcadeResult};
use crate::game::registry::{SessionId, SessionRegistry};
use crate::game::state::{MatchSession, MatchSnapshot, MatchStatus, Shot, ShotResult};
use crate::game::weapon::WeaponProfile;
use crate::proof::commitment::{generate_secret_seed, PlayerId};

/// Terminal result handed to the wallet and audit trail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Completed snapshot, secret revealed.
    pub snapshot: MatchSnapshot,
    /// Credits earned: `score * reward_bps / 10000`.
    pub reward: u64,
}

/// Shooting-gallery engine.
pub struct MatchEngine {
    config: Arc<EngineConfig>,
    registry: SessionRegistry,
}

impl MatchEngine {
    /// Create an engine. Fails if the config is unusable.
    pub fn new(config: EngineConfig) -> ArcadeResult<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            registry: SessionRegistry::new(),
        })
    }

    /// Engine tunables.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Backing registry.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Start a match with a fresh random layout seed.
    pub async fn create(
        &self,
        owner: PlayerId,
        level: u32,
        weapon: WeaponProfile,
    ) -> ArcadeResult<MatchSnapshot> {
        self.create_with_seed(owner, level, weapon, generate_secret_seed())
            .await
    }

    /// Start a match with a known layout seed.
    pub async fn create_with_seed(
        &self,
        owner: PlayerId,
        level: u32,
        weapon: WeaponProfile,
        secret_seed: String,
    ) -> ArcadeResult<MatchSnapshot> {
        if level > self.config.max_level {
            return Err(ArcadeError::InvalidConfig(format!(
                "level {level} exceeds maximum {}",
                self.config.max_level
            )));
        }
        weapon.validate()?;

        // Build fully before publishing so lookups never see a partial match.
        let mut session =
            MatchSession::with_seed(Uuid::new_v4(), owner, secret_seed, level, weapon, &self.config);
        while !self.registry.insert(session.clone()).await {
            session.id = Uuid::new_v4();
        }

        info!(
            session = %session.id,
            owner = %session.owner_id,
            level,
            weapon = %session.weapon.name,
            birds = session.entities.len(),
            "Match created"
        );
        Ok(session.snapshot())
    }

    /// Resolve one shot. A missing or completed session is `SessionNotActive`.
    pub async fn validate_shot(&self, id: &SessionId, shot: &Shot) -> ArcadeResult<ShotResult> {
        let handle = self
            .registry
            .get(id)
            .await
            .ok_or(ArcadeError::SessionNotActive(*id))?;
        let mut session = handle.lock().await;
        session.apply_shot(shot, &self.config)
    }

    /// Complete a match. Repeated calls return the same terminal snapshot.
    pub async fn end(&self, id: &SessionId) -> ArcadeResult<MatchSnapshot> {
        let handle = self
            .registry
            .get(id)
            .await
            .ok_or(ArcadeError::SessionNotFound(*id))?;
        let mut session = handle.lock().await;

        if session.finish() {
            info!(
                session = %session.id,
                score = session.score,
                shots = session.shots_fired,
                hits = session.hits_landed,
                max_combo = session.max_combo_seen,
                birds_left = session.alive_count(),
                "Match ended"
            );
        }
        Ok(session.snapshot())
    }

    /// Remove a completed match and compute its reward.
    ///
    /// Only one of several concurrent collects succeeds; the rest see
    /// `SessionNotFound`.
    pub async fn collect(&self, id: &SessionId) -> ArcadeResult<MatchResult> {
        let handle = self
            .registry
            .get(id)
            .await
            .ok_or(ArcadeError::SessionNotFound(*id))?;
        if handle.lock().await.status == MatchStatus::Active {
            return Err(ArcadeError::SessionStillActive(*id));
        }

        // Completed is terminal, so the check above cannot go stale.
        let handle = self.registry.remove(id).await.ok_or_else(|| {
            warn!(session = %id, "Match already collected");
            ArcadeError::SessionNotFound(*id)
        })?;
        let snapshot = handle.lock().await.snapshot();
        let reward = self.reward_for(snapshot.score);

        info!(session = %id, score = snapshot.score, reward, "Match collected");
        Ok(MatchResult { snapshot, reward })
    }

    /// Current snapshot of a match.
    pub async fn snapshot(&self, id: &SessionId) -> ArcadeResult<MatchSnapshot> {
        let handle = self
            .registry
            .get(id)
            .await
            .ok_or(ArcadeError::SessionNotFound(*id))?;
        let session = handle.lock().await;
        Ok(session.snapshot())
    }

    /// Owner of a match. Never waits on the match's own lock.
    pub async fn owner_of(&self, id: &SessionId) -> ArcadeResult<PlayerId> {
        self.registry
            .owner_of(id)
            .await
            .ok_or(ArcadeError::SessionNotFound(*id))
    }

    /// Reward for a final score.
    pub fn reward_for(&self, score: u64) -> u64 {
        score.saturating_mul(self.config.reward_bps as u64) / BPS_SCALE as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::bird::{BirdKind, BirdTemplate};

    fn engine() -> MatchEngine {
        MatchEngine::new(EngineConfig::default()).unwrap()
    }

    fn one_hp_engine() -> MatchEngine {
        MatchEngine::new(EngineConfig {
            combo_bonus_rate: 0.0,
            reward_bps: 5_000,
            birds: vec![BirdTemplate {
                kind: BirdKind::Sparrow,
                weight_bps: 10_000,
                health: 1,
                point_value: 10,
                base_speed: 100.0,
                min_y: 0.5,
                max_y: 0.5,
            }],
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_publishes_session() {
        let engine = engine();
        let snapshot = engine
            .create(PlayerId::new("p1"), 2, WeaponProfile::shotgun())
            .await
            .unwrap();

        assert_eq!(snapshot.status, MatchStatus::Active);
        assert_eq!(snapshot.ammo_remaining, 8);
        assert_eq!(snapshot.entities.len(), 9);
        assert!(snapshot.revealed_seed.is_none());
        assert_eq!(engine.registry().session_count().await, 1);
        assert_eq!(engine.owner_of(&snapshot.id).await.unwrap(), PlayerId::new("p1"));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let engine = engine();
        let too_high = engine.config().max_level + 1;
        assert!(matches!(
            engine.create(PlayerId::new("p"), too_high, WeaponProfile::pistol()).await,
            Err(ArcadeError::InvalidConfig(_))
        ));
        assert!(engine
            .create(PlayerId::new("p"), 1, WeaponProfile::new("limp", 0, 1, 0.0))
            .await
            .is_err());
        assert_eq!(engine.registry().session_count().await, 0);
    }

    #[tokio::test]
    async fn test_shot_on_unknown_session() {
        let engine = engine();
        let result = engine.validate_shot(&Uuid::new_v4(), &Shot::at(1.0, 1.0)).await;
        assert!(matches!(result, Err(ArcadeError::SessionNotActive(_))));
        assert!(matches!(
            engine.end(&Uuid::new_v4()).await,
            Err(ArcadeError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_end_is_idempotent() {
        let engine = engine();
        let id = engine
            .create(PlayerId::new("p"), 1, WeaponProfile::pistol())
            .await
            .unwrap()
            .id;

        let first = engine.end(&id).await.unwrap();
        let second = engine.end(&id).await.unwrap();
        assert_eq!(first.status, MatchStatus::Completed);
        assert_eq!(first, second);
        assert!(first.revealed_seed.is_some());
    }

    #[tokio::test]
    async fn test_collect_lifecycle() {
        let engine = one_hp_engine();
        let snapshot = engine
            .create(PlayerId::new("p"), 1, WeaponProfile::new("one", 1, 1, 0.0))
            .await
            .unwrap();
        let id = snapshot.id;
        let bird = &snapshot.entities[0];

        let shot = engine
            .validate_shot(&id, &Shot::at_entity(bird.x, bird.y, bird.id))
            .await
            .unwrap();
        assert!(shot.hit);
        assert_eq!(shot.score_after, 10);

        assert!(matches!(
            engine.collect(&id).await,
            Err(ArcadeError::SessionStillActive(_))
        ));

        engine.end(&id).await.unwrap();
        let result = engine.collect(&id).await.unwrap();
        assert_eq!(result.snapshot.score, 10);
        assert_eq!(result.reward, 5);
        assert_eq!(engine.registry().session_count().await, 0);

        assert!(matches!(
            engine.collect(&id).await,
            Err(ArcadeError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_shots_are_serialized() {
        let engine = Arc::new(engine());
        let snapshot = engine
            .create(PlayerId::new("p"), 5, WeaponProfile::new("mg", 1, 64, 0.0))
            .await
            .unwrap();
        let id = snapshot.id;
        let y = snapshot.entities[0].y;

        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.validate_shot(&id, &Shot::at(400.0, y)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let after = engine.snapshot(&id).await.unwrap();
        assert_eq!(after.shots_fired, 64);
        assert_eq!(after.ammo_remaining, 0);
        assert!(after.hits_landed <= after.shots_fired);
    }

    #[tokio::test]
    async fn test_shot_after_end_rejected() {
        let engine = engine();
        let id = engine
            .create(PlayerId::new("p"), 1, WeaponProfile::pistol())
            .await
            .unwrap()
            .id;
        let terminal = engine.end(&id).await.unwrap();

        assert!(matches!(
            engine.validate_shot(&id, &Shot::at(1.0, 1.0)).await,
            Err(ArcadeError::SessionNotActive(_))
        ));
        assert_eq!(engine.snapshot(&id).await.unwrap(), terminal);
    }

    #[test]
    fn test_reward_for() {
        let engine = engine();
        assert_eq!(engine.reward_for(0), 0);
        assert_eq!(engine.reward_for(250), 2);
        assert_eq!(engine.reward_for(10_000), 100);
    }
}
