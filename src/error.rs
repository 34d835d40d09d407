//! Arcade Errors
//!
//! Every failure the core can report. All of them are local and recoverable;
//! a shot that hits nothing is a normal `ShotResult`, never an error.

use crate::game::registry::SessionId;
use crate::proof::commitment::PlayerId;

/// Errors returned by the seed vault, the prize catalogue and the match engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArcadeError {
    /// No seed pair has been committed for this player.
    #[error("no seed pair committed for player {0}")]
    NotInitialized(PlayerId),

    /// Client seeds must be 1..=64 printable characters.
    #[error("invalid client seed: {0}")]
    InvalidClientSeed(String),

    /// Reported shot coordinates are outside every accepted region.
    #[error("shot coordinates ({x}, {y}) are outside the arena")]
    InvalidCoordinates {
        /// Reported x.
        x: f64,
        /// Reported y.
        y: f64,
    },

    /// No session with this id is registered.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The session is missing or already completed.
    #[error("session {0} is not active")]
    SessionNotActive(SessionId),

    /// The session must be ended before its result can be collected.
    #[error("session {0} is still active")]
    SessionStillActive(SessionId),

    /// The weapon has no ammunition left.
    #[error("session {0} is out of ammo")]
    OutOfAmmo(SessionId),

    /// Prize probabilities do not add up to 100%.
    #[error("prize table probabilities total {total_bps} bps, expected 10000")]
    ConfigurationDrift {
        /// Actual sum of the table, in basis points.
        total_bps: u32,
    },

    /// A prize table must hold at least one entry.
    #[error("prize table is empty")]
    EmptyPrizeTable,

    /// No prize table was ever published under this version.
    #[error("unknown prize table version {0}")]
    UnknownPrizeTable(u32),

    /// The audit sink refused a record that must be durable before proceeding.
    #[error("audit sink unavailable: {0}")]
    AuditUnavailable(String),

    /// Engine or server configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias used throughout the crate.
pub type ArcadeResult<T> = Result<T, ArcadeError>;
