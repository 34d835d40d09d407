//! Provable Fairness
//!
//! Commit-reveal seed management, the audit trail, and post-hoc
//! verification.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    FAIRNESS PROOFS                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  commitment.rs  - Per-player seed pairs, nonces, rotation   │
//! │  audit.rs       - Audit records and sinks                   │
//! │  verify.rs      - Recompute spins and layouts from reveals  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod audit;
pub mod commitment;
pub mod verify;

// Re-export key types
pub use audit::{AuditError, AuditRecord, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use commitment::{
    PlayInputs, PlayerId, RotationReceipt, SeedCommitment, SeedPair, SeedVault,
};
pub use verify::{verify_commitment, verify_layout, verify_spin, VerificationError};
