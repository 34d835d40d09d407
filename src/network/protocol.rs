//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every message is one JSON text frame tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::error::ArcadeError;
use crate::game::engine::MatchResult;
use crate::game::registry::SessionId;
use crate::game::state::{MatchSnapshot, ShotResult};
use crate::game::wheel::WheelSpin;
use crate::proof::commitment::{RotationReceipt, SeedCommitment};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Identify the connection. Must come first.
    Hello {
        /// Opaque player id from the identity layer.
        player_id: String,
    },

    /// Replace the client seed.
    SetClientSeed {
        /// New client seed.
        client_seed: String,
    },

    /// Reveal the active secret and commit a new one.
    RotateSeed,

    /// Spin the prize wheel.
    Spin {
        /// Optional client seed to switch to first.
        #[serde(default)]
        client_seed: Option<String>,
    },

    /// Start a shooting match.
    StartMatch {
        /// Difficulty level.
        level: u32,
        /// Weapon preset name.
        weapon: String,
    },

    /// Fire one shot.
    Shoot {
        /// Target match.
        session_id: SessionId,
        /// Reported x.
        x: f64,
        /// Reported y.
        y: f64,
        /// Bird the client believes it hit.
        #[serde(default)]
        entity_id_hint: Option<u32>,
    },

    /// End a match.
    EndMatch {
        /// Target match.
        session_id: SessionId,
    },

    /// Collect an ended match's result.
    Collect {
        /// Target match.
        session_id: SessionId,
    },

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp, echoed back.
        timestamp: u64,
    },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Reply to `hello`.
    Welcome {
        /// Server version.
        server_version: String,
        /// Player's active commitment.
        commitment: SeedCommitment,
    },

    /// Updated commitment after a client seed change.
    Commitment(SeedCommitment),

    /// Rotation receipt with the revealed secret.
    Rotated(RotationReceipt),

    /// Wheel result.
    Spin(WheelSpin),

    /// Newly created match.
    MatchStarted(MatchSnapshot),

    /// Shot outcome.
    ShotResult {
        /// Match the shot was fired in.
        session_id: SessionId,
        /// Outcome.
        result: ShotResult,
    },

    /// Terminal snapshot of an ended match.
    MatchEnded(MatchSnapshot),

    /// Collected match result.
    Collected(MatchResult),

    /// Pong response.
    Pong {
        /// Echoed client timestamp.
        timestamp: u64,
        /// Server time in milliseconds.
        server_time: u64,
    },

    /// Error message.
    Error(ErrorReply),

    /// Server is shutting down.
    Shutdown {
        /// Why.
        reason: String,
    },
}

/// Error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ErrorReply {
    /// Build an error reply.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// No `hello` received yet.
    NotIdentified,
    /// Player has no seed pair.
    NotInitialized,
    /// Malformed message or argument.
    InvalidInput,
    /// Shot outside every accepted bound.
    InvalidCoordinates,
    /// No such match.
    SessionNotFound,
    /// Match missing or already ended.
    SessionNotActive,
    /// Match must be ended before collecting.
    SessionStillActive,
    /// No ammo left.
    OutOfAmmo,
    /// Audit store unavailable; retry later.
    Unavailable,
    /// Server overloaded.
    ServerOverloaded,
    /// Internal error.
    InternalError,
}

impl From<&ArcadeError> for ErrorReply {
    fn from(err: &ArcadeError) -> Self {
        let code = match err {
            ArcadeError::NotInitialized(_) => ErrorCode::NotInitialized,
            ArcadeError::InvalidClientSeed(_) | ArcadeError::InvalidConfig(_) => ErrorCode::InvalidInput,
            ArcadeError::InvalidCoordinates { .. } => ErrorCode::InvalidCoordinates,
            ArcadeError::SessionNotFound(_) => ErrorCode::SessionNotFound,
            ArcadeError::SessionNotActive(_) => ErrorCode::SessionNotActive,
            ArcadeError::SessionStillActive(_) => ErrorCode::SessionStillActive,
            ArcadeError::OutOfAmmo(_) => ErrorCode::OutOfAmmo,
            ArcadeError::AuditUnavailable(_) => ErrorCode::Unavailable,
            ArcadeError::ConfigurationDrift { .. }
            | ArcadeError::EmptyPrizeTable
            | ArcadeError::UnknownPrizeTable(_) => ErrorCode::InternalError,
        };
        Self::new(code, err.to_string())
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
