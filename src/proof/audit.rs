//! Audit Trail
//!
//! The durable store for outcomes lives outside this crate. `AuditSink` is
//! the seam it plugs into: seed rotations, wheel spins and completed
//! matches are handed over as `AuditRecord`s.
//!
//! Sinks are called outside session locks. Rotation is the exception: its
//! record must be accepted before the new secret is swapped in.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::game::engine::MatchResult;
use crate::game::wheel::WheelSpin;
use crate::proof::commitment::RotationReceipt;

/// One auditable event.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditRecord {
    /// A secret seed was retired and revealed.
    SeedRotated(RotationReceipt),
    /// A wheel outcome was derived.
    WheelSpin(WheelSpin),
    /// A shooting match reached its terminal state and was collected.
    MatchCompleted(MatchResult),
}

impl AuditRecord {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SeedRotated(_) => "seed_rotated",
            Self::WheelSpin(_) => "wheel_spin",
            Self::MatchCompleted(_) => "match_completed",
        }
    }
}

/// The sink refused or failed to store a record.
#[derive(Debug, Clone, thiserror::Error)]
#[error("audit sink rejected {label}: {reason}")]
pub struct AuditError {
    /// Record label.
    pub label: &'static str,
    /// Why it failed.
    pub reason: String,
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Store one record. Must be idempotent for retried records.
    fn record(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Writes every record to the tracing log as JSON.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let json = serde_json::to_string(record).map_err(|e| AuditError {
            label: record.label(),
            reason: e.to_string(),
        })?;
        info!(target: "audit", kind = record.label(), "{}", json);
        Ok(())
    }
}

/// Keeps records in memory. Can be built to refuse everything.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
    refuse: bool,
}

impl MemoryAuditSink {
    /// Accepting sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that rejects every record, standing in for an unavailable store.
    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            refuse: true,
        }
    }

    /// Snapshot of everything stored so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        if self.refuse {
            return Err(AuditError {
                label: record.label(),
                reason: "store unavailable".to_string(),
            });
        }
        let mut records = self.records.lock().map_err(|_| AuditError {
            label: record.label(),
            reason: "record buffer poisoned".to_string(),
        })?;
        records.push(record.clone());
        Ok(())
    }
}
