//! Arcade Facade
//!
//! The single entry point the transport layer talks to. Binds the seed
//! vault, the prize catalogue, the match engine and the audit sink, and
//! enforces that players only touch their own matches.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::{ArcadeError, ArcadeResult};
use crate::game::engine::{MatchEngine, MatchResult};
use crate::game::prize::{PrizeCatalog, PrizeEntry, PrizeTable};
use crate::game::registry::SessionId;
use crate::game::state::{MatchSnapshot, Shot, ShotResult};
use crate::game::weapon::WeaponProfile;
use crate::game::wheel::{spin, WheelSpin};
use crate::proof::audit::{AuditRecord, AuditSink};
use crate::proof::commitment::{PlayerId, RotationReceipt, SeedCommitment, SeedVault};

/// Both mini-games behind one API.
pub struct Arcade {
    vault: SeedVault,
    catalog: RwLock<PrizeCatalog>,
    engine: MatchEngine,
    audit: Arc<dyn AuditSink>,
}

impl Arcade {
    /// Arcade with the stock wheel as prize table v1.
    pub fn new(config: EngineConfig, audit: Arc<dyn AuditSink>) -> ArcadeResult<Self> {
        Self::with_catalog(config, PrizeCatalog::with_default_wheel(), audit)
    }

    /// Arcade with a caller-supplied catalogue.
    pub fn with_catalog(
        config: EngineConfig,
        catalog: PrizeCatalog,
        audit: Arc<dyn AuditSink>,
    ) -> ArcadeResult<Self> {
        if catalog.is_empty() {
            return Err(ArcadeError::EmptyPrizeTable);
        }
        Ok(Self {
            vault: SeedVault::new(audit.clone()),
            catalog: RwLock::new(catalog),
            engine: MatchEngine::new(config)?,
            audit,
        })
    }

    /// Seed vault.
    pub fn vault(&self) -> &SeedVault {
        &self.vault
    }

    /// Match engine.
    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    // =========================================================================
    // Seeds
    // =========================================================================

    /// Commit a seed pair for a new player; returns the existing one otherwise.
    pub async fn register(&self, player: &PlayerId) -> SeedCommitment {
        self.vault.ensure(player).await
    }

    /// Public commitment of the player's active pair.
    pub async fn commitment(&self, player: &PlayerId) -> ArcadeResult<SeedCommitment> {
        self.vault.commitment(player).await
    }

    /// Replace the player's client seed.
    pub async fn set_client_seed(
        &self,
        player: &PlayerId,
        client_seed: &str,
    ) -> ArcadeResult<SeedCommitment> {
        self.vault.set_client_seed(player, client_seed).await
    }

    /// Reveal the active secret and commit a new one.
    pub async fn rotate_seed(&self, player: &PlayerId) -> ArcadeResult<RotationReceipt> {
        self.vault.rotate(player).await
    }

    // =========================================================================
    // Wheel
    // =========================================================================

    /// Spin the wheel once. A supplied client seed replaces the current one
    /// before the spin; see [`SeedVault::set_client_seed`] for how its nonce
    /// sequence starts.
    pub async fn spin_wheel(
        &self,
        player: &PlayerId,
        client_seed: Option<&str>,
    ) -> ArcadeResult<WheelSpin> {
        if let Some(seed) = client_seed {
            self.vault.set_client_seed(player, seed).await?;
        }
        let table = self.current_table().await?;
        let inputs = self.vault.next_play(player).await?;
        let record = spin(player, &inputs, &table);

        info!(
            player = %player,
            nonce = record.nonce,
            table = record.table_version,
            prize = %record.prize_id,
            "Wheel spun"
        );
        self.emit(AuditRecord::WheelSpin(record.clone()));
        Ok(record)
    }

    /// Prize table currently in effect.
    pub async fn current_table(&self) -> ArcadeResult<Arc<PrizeTable>> {
        let catalog = self.catalog.read().await;
        catalog.current().ok_or(ArcadeError::EmptyPrizeTable)
    }

    /// A historical prize table, for verification.
    pub async fn prize_table(&self, version: u32) -> ArcadeResult<Arc<PrizeTable>> {
        let catalog = self.catalog.read().await;
        catalog.get(version)
    }

    /// Publish a new prize table version.
    pub async fn publish_prize_table(&self, entries: Vec<PrizeEntry>) -> ArcadeResult<Arc<PrizeTable>> {
        let mut catalog = self.catalog.write().await;
        catalog.publish(entries)
    }

    // =========================================================================
    // Shooting gallery
    // =========================================================================

    /// Start a match owned by `player`.
    pub async fn start_match(
        &self,
        player: &PlayerId,
        level: u32,
        weapon: WeaponProfile,
    ) -> ArcadeResult<MatchSnapshot> {
        self.engine.create(player.clone(), level, weapon).await
    }

    /// Fire at one of the player's matches.
    pub async fn shoot(
        &self,
        player: &PlayerId,
        session_id: &SessionId,
        shot: &Shot,
    ) -> ArcadeResult<ShotResult> {
        self.authorize(player, session_id).await.map_err(|e| match e {
            ArcadeError::SessionNotFound(id) => ArcadeError::SessionNotActive(id),
            other => other,
        })?;
        self.engine.validate_shot(session_id, shot).await
    }

    /// End one of the player's matches. Safe to retry.
    pub async fn end_match(
        &self,
        player: &PlayerId,
        session_id: &SessionId,
    ) -> ArcadeResult<MatchSnapshot> {
        self.authorize(player, session_id).await?;
        self.engine.end(session_id).await
    }

    /// Take the terminal result of an ended match, removing it.
    pub async fn collect_match(
        &self,
        player: &PlayerId,
        session_id: &SessionId,
    ) -> ArcadeResult<MatchResult> {
        self.authorize(player, session_id).await?;
        let result = self.engine.collect(session_id).await?;
        self.emit(AuditRecord::MatchCompleted(result.clone()));
        Ok(result)
    }

    /// Matches still held for a player.
    pub async fn matches_for(&self, player: &PlayerId) -> Vec<SessionId> {
        self.engine.registry().sessions_for(player).await
    }

    /// Someone else's match is reported as not found.
    async fn authorize(&self, player: &PlayerId, session_id: &SessionId) -> ArcadeResult<()> {
        let owner = self.engine.owner_of(session_id).await?;
        if &owner != player {
            warn!(player = %player, session = %session_id, "Rejected access to foreign match");
            return Err(ArcadeError::SessionNotFound(*session_id));
        }
        Ok(())
    }

    /// Results are already final when emitted; a failing sink is only logged.
    fn emit(&self, record: AuditRecord) {
        if let Err(e) = self.audit.record(&record) {
            warn!(kind = record.label(), "Audit record dropped: {}", e);
        }
    }
}
