//! # Fair Arcade
//!
//! Provably-fair prize wheel and shooting gallery, with a WebSocket front end.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       FAIR ARCADE                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fairness.rs - HMAC-SHA256 derivation, bucket walk       │
//! │  └── hash.rs     - Seed commitments and audit hashing        │
//! │                                                              │
//! │  game/           - Game logic                                │
//! │  ├── prize.rs    - Versioned prize tables                    │
//! │  ├── wheel.rs    - Prize wheel spins                         │
//! │  ├── weapon.rs   - Weapon presets                            │
//! │  ├── bird.rs     - Bird catalogue and match layout           │
//! │  ├── state.rs    - Match state machine, shot validation      │
//! │  ├── registry.rs - Concurrent session store                  │
//! │  └── engine.rs   - Match lifecycle                           │
//! │                                                              │
//! │  proof/          - Commit-reveal and audit                   │
//! │  ├── commitment.rs - Seed vault, nonces, rotation            │
//! │  ├── audit.rs    - Audit records and sinks                   │
//! │  └── verify.rs   - Post-hoc verification                     │
//! │                                                              │
//! │  arcade.rs       - Facade used by the transport              │
//! │  network/        - WebSocket server and JSON protocol        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fairness Guarantee
//!
//! Every wheel outcome is `HMAC-SHA256(secret, client_seed:nonce)`, walked
//! through the prize table in integer basis points. The secret is committed
//! (SHA-256) before play and revealed on rotation, so anyone holding the
//! revealed secret can recompute every spin made under it. Match layouts
//! follow the same commit-reveal scheme with a per-match secret.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod arcade;
pub mod config;
pub mod core;
pub mod error;
pub mod game;
pub mod network;
pub mod proof;

// Re-export commonly used types
pub use arcade::Arcade;
pub use config::{ArcadeConfig, EngineConfig};
pub use crate::core::fairness::{derive, to_decimal, Outcome};
pub use error::{ArcadeError, ArcadeResult};
pub use game::engine::{MatchEngine, MatchResult};
pub use game::prize::{select_prize, PrizeCatalog, PrizeEntry, PrizeTable};
pub use game::registry::{SessionId, SessionRegistry};
pub use game::state::{MatchSnapshot, Shot, ShotResult};
pub use game::weapon::WeaponProfile;
pub use game::wheel::WheelSpin;
pub use proof::commitment::{PlayerId, SeedCommitment, SeedVault};
pub use proof::verify::{verify_layout, verify_spin, VerificationError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
