//! Game Logic Module
//!
//! Both mini-games. Outcome derivation and layout generation are pure;
//! the only shared mutable state is the session registry.
//!
//! ## Module Structure
//!
//! - `prize`: Versioned, weighted prize tables
//! - `wheel`: Prize wheel spins
//! - `weapon`: Weapon presets
//! - `bird`: Bird catalogue and deterministic match layout
//! - `state`: Match session state machine and shot validation
//! - `registry`: Concurrent session store
//! - `engine`: Match lifecycle (create, shoot, end, collect)

pub mod bird;
pub mod engine;
pub mod prize;
pub mod registry;
pub mod state;
pub mod weapon;
pub mod wheel;

// Re-export key types
pub use bird::{BirdKind, BirdTemplate, Entity, Wind};
pub use engine::{MatchEngine, MatchResult};
pub use prize::{select_prize, Payout, PayoutKind, PrizeCatalog, PrizeEntry, PrizeTable};
pub use registry::{SessionId, SessionRegistry};
pub use state::{HitPath, MatchSession, MatchSnapshot, MatchStatus, Shot, ShotResult};
pub use weapon::WeaponProfile;
pub use wheel::WheelSpin;
