//! Core deterministic primitives.
//!
//! Pure functions only: keyed outcome derivation and audit hashing.
//! Nothing in this module touches clocks, locks or the OS entropy source.

pub mod fairness;
pub mod hash;

// Re-export core types
pub use fairness::{derive, pick_bucket, to_decimal, BucketPick, Outcome, RawHash, BPS_SCALE};
pub use hash::{commit_seed, AuditHasher, Digest32};
