//! Seed Commitment Protocol
//!
//! Each player owns a hidden secret seed. Only its SHA-256 commitment is
//! published until the player rotates, at which point the old secret is
//! revealed so every past play can be recomputed.
//!
//! Lock layout mirrors the session registry: an outer map guarded by a
//! `RwLock`, and one `Mutex` per player so nonce issuance is linearizable
//! without serializing unrelated players.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::core::hash::commit_seed;
use crate::error::{ArcadeError, ArcadeResult};
use crate::proof::audit::{AuditRecord, AuditSink};

/// Bytes of OS entropy in a secret seed (256 bits).
pub const SECRET_SEED_BYTES: usize = 32;

/// Bytes of OS entropy in a generated client seed.
pub const CLIENT_SEED_BYTES: usize = 16;

/// Longest client seed a player may choose.
pub const MAX_CLIENT_SEED_LEN: usize = 64;

/// Opaque player identifier handed to us by the identity collaborator.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Create from any string-like id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fresh hex-encoded secret from the OS CSPRNG.
pub fn generate_secret_seed() -> String {
    random_hex(SECRET_SEED_BYTES)
}

/// Fresh hex-encoded client seed from the OS CSPRNG.
pub fn generate_client_seed() -> String {
    random_hex(CLIENT_SEED_BYTES)
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn check_client_seed(seed: &str) -> ArcadeResult<()> {
    if seed.is_empty() || seed.len() > MAX_CLIENT_SEED_LEN {
        return Err(ArcadeError::InvalidClientSeed(format!(
            "length must be 1..={MAX_CLIENT_SEED_LEN}"
        )));
    }
    if seed.chars().any(|c| c.is_control()) {
        return Err(ArcadeError::InvalidClientSeed(
            "control characters are not allowed".to_string(),
        ));
    }
    Ok(())
}

/// A committed secret/client seed pair.
///
/// `secret_seed` never leaves this struct except through rotation.
#[derive(Clone, Debug)]
pub struct SeedPair {
    secret_seed: String,
    secret_seed_hash: String,
    client_seed: String,
    nonce: u64,
    committed_at: DateTime<Utc>,
    /// Client seeds already played under this secret, with their next nonce.
    retired_client_seeds: BTreeMap<String, u64>,
}

impl SeedPair {
    /// Generate a pair with a fresh secret and a random client seed.
    pub fn generate() -> Self {
        Self::with_seeds(generate_secret_seed(), generate_client_seed())
    }

    /// Build a pair from known seeds (nonce starts at 0).
    pub fn with_seeds(secret_seed: String, client_seed: String) -> Self {
        let secret_seed_hash = commit_seed(&secret_seed);
        Self {
            secret_seed,
            secret_seed_hash,
            client_seed,
            nonce: 0,
            committed_at: Utc::now(),
            retired_client_seeds: BTreeMap::new(),
        }
    }

    /// Public commitment hash of the active secret.
    pub fn secret_seed_hash(&self) -> &str {
        &self.secret_seed_hash
    }

    /// Current client seed.
    pub fn client_seed(&self) -> &str {
        &self.client_seed
    }

    /// Next nonce to be issued.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Public view of this pair.
    pub fn commitment(&self) -> SeedCommitment {
        SeedCommitment {
            secret_seed_hash: self.secret_seed_hash.clone(),
            client_seed: self.client_seed.clone(),
            nonce: self.nonce,
            committed_at: self.committed_at,
        }
    }

    /// Switch client seeds without reissuing a nonce under this secret.
    ///
    /// A fresh seed starts at nonce 0. A seed already played under the
    /// active secret resumes where it left off.
    fn switch_client_seed(&mut self, client_seed: &str) {
        if self.client_seed == client_seed {
            return;
        }
        let previous = std::mem::replace(&mut self.client_seed, client_seed.to_string());
        self.retired_client_seeds.insert(previous, self.nonce);
        self.nonce = self
            .retired_client_seeds
            .remove(client_seed)
            .unwrap_or(0);
    }

    /// Issue the current nonce together with the inputs it binds.
    fn take_play(&mut self) -> PlayInputs {
        let inputs = PlayInputs {
            secret_seed: self.secret_seed.clone(),
            secret_seed_hash: self.secret_seed_hash.clone(),
            client_seed: self.client_seed.clone(),
            nonce: self.nonce,
        };
        self.nonce += 1;
        inputs
    }
}

/// What a player may see about their active pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedCommitment {
    /// SHA-256 of the hidden secret seed.
    pub secret_seed_hash: String,
    /// Current client seed.
    pub client_seed: String,
    /// Next nonce to be used.
    pub nonce: u64,
    /// When the active secret was committed.
    pub committed_at: DateTime<Utc>,
}

/// Inputs bound to exactly one play.
///
/// Holds the secret, so it stays inside the crate's play path.
#[derive(Clone, Debug)]
pub struct PlayInputs {
    pub(crate) secret_seed: String,
    /// Commitment the play was made under.
    pub secret_seed_hash: String,
    /// Client seed in effect.
    pub client_seed: String,
    /// Nonce issued to this play.
    pub nonce: u64,
}

/// Result of a rotation: the revealed secret plus the new commitment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationReceipt {
    /// Player whose pair rotated.
    pub player_id: PlayerId,
    /// The previous secret, now public.
    pub revealed_secret_seed: String,
    /// Commitment the revealed secret was published under.
    pub revealed_secret_seed_hash: String,
    /// Client seed in effect when the old secret retired.
    pub last_client_seed: String,
    /// Number of nonces issued under the last client seed.
    pub nonces_used: u64,
    /// Commitment for the new secret.
    pub new_secret_seed_hash: String,
    /// Rotation time.
    pub rotated_at: DateTime<Utc>,
}

/// Per-player seed pairs.
pub struct SeedVault {
    pairs: RwLock<BTreeMap<PlayerId, Arc<Mutex<SeedPair>>>>,
    audit: Arc<dyn AuditSink>,
}

impl SeedVault {
    /// Create an empty vault that reports rotations to `audit`.
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self {
            pairs: RwLock::new(BTreeMap::new()),
            audit,
        }
    }

    async fn pair(&self, player: &PlayerId) -> ArcadeResult<Arc<Mutex<SeedPair>>> {
        let pairs = self.pairs.read().await;
        pairs
            .get(player)
            .cloned()
            .ok_or_else(|| ArcadeError::NotInitialized(player.clone()))
    }

    /// Commit a pair for `player` unless one already exists.
    ///
    /// Never overwrites an existing pair.
    pub async fn ensure(&self, player: &PlayerId) -> SeedCommitment {
        if let Ok(existing) = self.pair(player).await {
            let commitment = existing.lock().await.commitment();
            return commitment;
        }

        let mut pairs = self.pairs.write().await;
        let pair = pairs
            .entry(player.clone())
            .or_insert_with(|| {
                debug!("Committed new seed pair for {}", player);
                Arc::new(Mutex::new(SeedPair::generate()))
            })
            .clone();
        drop(pairs);

        let commitment = pair.lock().await.commitment();
        commitment
    }

    /// Install a known pair. Used for replays and tests.
    pub async fn insert(&self, player: PlayerId, pair: SeedPair) {
        let mut pairs = self.pairs.write().await;
        pairs.insert(player, Arc::new(Mutex::new(pair)));
    }

    /// Public view of the player's active pair.
    pub async fn commitment(&self, player: &PlayerId) -> ArcadeResult<SeedCommitment> {
        let pair = self.pair(player).await?;
        let commitment = pair.lock().await.commitment();
        Ok(commitment)
    }

    /// Replace the client seed.
    ///
    /// A seed not yet used under the active secret restarts the nonce at 0.
    /// Returning to an earlier seed resumes its sequence, so no
    /// `(secret, client, nonce)` triple is ever issued twice.
    pub async fn set_client_seed(
        &self,
        player: &PlayerId,
        client_seed: &str,
    ) -> ArcadeResult<SeedCommitment> {
        check_client_seed(client_seed)?;
        let pair = self.pair(player).await?;
        let mut pair = pair.lock().await;
        pair.switch_client_seed(client_seed);
        debug!(
            "Player {} set client seed, next nonce {}",
            player, pair.nonce
        );
        Ok(pair.commitment())
    }

    /// Retire the active secret, reveal it, and commit a new one.
    ///
    /// The rotation record must reach the audit sink before the swap; if it
    /// cannot, the old pair stays in place.
    pub async fn rotate(&self, player: &PlayerId) -> ArcadeResult<RotationReceipt> {
        let pair = self.pair(player).await?;
        let mut pair = pair.lock().await;

        let next_secret = generate_secret_seed();
        let next_hash = commit_seed(&next_secret);

        let receipt = RotationReceipt {
            player_id: player.clone(),
            revealed_secret_seed: pair.secret_seed.clone(),
            revealed_secret_seed_hash: pair.secret_seed_hash.clone(),
            last_client_seed: pair.client_seed.clone(),
            nonces_used: pair.nonce,
            new_secret_seed_hash: next_hash.clone(),
            rotated_at: Utc::now(),
        };

        if let Err(e) = self.audit.record(&AuditRecord::SeedRotated(receipt.clone())) {
            warn!("Seed rotation for {} aborted: {}", player, e);
            return Err(ArcadeError::AuditUnavailable(e.to_string()));
        }

        pair.secret_seed = next_secret;
        pair.secret_seed_hash = next_hash;
        pair.nonce = 0;
        pair.retired_client_seeds.clear();
        pair.committed_at = receipt.rotated_at;

        info!(
            player = %player,
            revealed = %receipt.revealed_secret_seed,
            new_hash = %receipt.new_secret_seed_hash,
            "Seed rotated"
        );

        Ok(receipt)
    }

    /// Read-then-increment the player's nonce.
    pub async fn next_nonce(&self, player: &PlayerId) -> ArcadeResult<u64> {
        Ok(self.next_play(player).await?.nonce)
    }

    /// Issue a nonce and snapshot the seeds it binds, in one critical section.
    pub async fn next_play(&self, player: &PlayerId) -> ArcadeResult<PlayInputs> {
        let pair = self.pair(player).await?;
        let inputs = pair.lock().await.take_play();
        Ok(inputs)
    }

    /// Number of players with a committed pair.
    pub async fn player_count(&self) -> usize {
        self.pairs.read().await.len()
    }
}
