//! Prize Tables
//!
//! Ordered, versioned catalogues of wheel prizes. Entry order defines the
//! bucket boundaries, so a table is immutable once published; edits publish
//! a new version and old versions stay available for verification.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::fairness::{decimal_to_bps, pick_bucket, word_to_bps, BucketPick, BPS_SCALE};
use crate::core::hash::{AuditHasher, TABLE_DOMAIN};
use crate::error::{ArcadeError, ArcadeResult};

/// What the wallet should credit for a prize.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PayoutKind {
    /// No payout.
    Nothing = 0,
    /// Flat credit amount.
    Credits = 1,
    /// Multiplier applied to the stake by the wallet.
    Multiplier = 2,
    /// Number of free spins.
    FreeSpin = 3,
}

/// Payout instruction handed to the wallet collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// Kind of payout.
    pub payout_kind: PayoutKind,
    /// Amount, interpreted according to `payout_kind`.
    pub payout_value: u64,
}

/// One slice of the wheel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeEntry {
    /// Stable prize id.
    pub id: String,
    /// Probability in basis points (10000 = 100%).
    pub probability_bps: u32,
    /// Kind of payout.
    pub payout_kind: PayoutKind,
    /// Payout amount.
    pub payout_value: u64,
}

impl PrizeEntry {
    /// Build from a percentage (0–100, decimals allowed).
    ///
    /// Percentages are converted once, here, to integer basis points.
    pub fn new(id: impl Into<String>, probability: f64, kind: PayoutKind, value: u64) -> Self {
        let bps = (probability.clamp(0.0, 100.0) * 100.0).round() as u32;
        Self::with_bps(id, bps, kind, value)
    }

    /// Build from basis points directly.
    pub fn with_bps(id: impl Into<String>, probability_bps: u32, kind: PayoutKind, value: u64) -> Self {
        Self {
            id: id.into(),
            probability_bps,
            payout_kind: kind,
            payout_value: value,
        }
    }

    /// Wallet payout for this entry.
    pub fn payout(&self) -> Payout {
        Payout {
            payout_kind: self.payout_kind,
            payout_value: self.payout_value,
        }
    }
}

/// A published, immutable prize table. Never empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PrizeTableRecord")]
pub struct PrizeTable {
    /// Monotonic version number.
    pub version: u32,
    /// When this version took effect.
    pub published_at: DateTime<Utc>,
    entries: Vec<PrizeEntry>,
}

/// Wire form of a table, checked before it becomes a [`PrizeTable`].
#[derive(Deserialize)]
struct PrizeTableRecord {
    version: u32,
    published_at: DateTime<Utc>,
    entries: Vec<PrizeEntry>,
}

impl TryFrom<PrizeTableRecord> for PrizeTable {
    type Error = ArcadeError;

    fn try_from(record: PrizeTableRecord) -> ArcadeResult<Self> {
        let mut table = PrizeTable::new(record.version, record.entries)?;
        table.published_at = record.published_at;
        Ok(table)
    }
}

impl PrizeTable {
    /// Build a table. Rejects empty tables; drift is allowed but reported
    /// by [`PrizeTable::check_drift`].
    pub fn new(version: u32, entries: Vec<PrizeEntry>) -> ArcadeResult<Self> {
        if entries.is_empty() {
            return Err(ArcadeError::EmptyPrizeTable);
        }
        Ok(Self {
            version,
            published_at: Utc::now(),
            entries,
        })
    }

    /// The stock wheel.
    pub fn default_wheel(version: u32) -> Self {
        let entries = vec![
            PrizeEntry::new("miss", 35.0, PayoutKind::Nothing, 0),
            PrizeEntry::new("coins_10", 25.0, PayoutKind::Credits, 10),
            PrizeEntry::new("coins_25", 18.0, PayoutKind::Credits, 25),
            PrizeEntry::new("coins_50", 10.0, PayoutKind::Credits, 50),
            PrizeEntry::new("free_spin", 7.0, PayoutKind::FreeSpin, 1),
            PrizeEntry::new("double", 4.0, PayoutKind::Multiplier, 2),
            PrizeEntry::new("jackpot", 1.0, PayoutKind::Credits, 500),
        ];
        Self {
            version,
            published_at: Utc::now(),
            entries,
        }
    }

    /// Entries in bucket order.
    pub fn entries(&self) -> &[PrizeEntry] {
        &self.entries
    }

    /// Sum of all probabilities in basis points.
    pub fn total_bps(&self) -> u32 {
        self.entries
            .iter()
            .fold(0u32, |acc, e| acc.saturating_add(e.probability_bps))
    }

    /// `ConfigurationDrift` unless the probabilities total exactly 100%.
    pub fn check_drift(&self) -> ArcadeResult<()> {
        let total_bps = self.total_bps();
        if total_bps != BPS_SCALE {
            return Err(ArcadeError::ConfigurationDrift { total_bps });
        }
        Ok(())
    }

    /// Fingerprint over version and entries in order.
    ///
    /// Reordering entries changes the fingerprint, as it changes buckets.
    pub fn fingerprint(&self) -> String {
        let mut hasher = AuditHasher::new(TABLE_DOMAIN);
        hasher.update_u32(self.version);
        hasher.update_u32(self.entries.len() as u32);
        for entry in &self.entries {
            hasher.update_str(&entry.id);
            hasher.update_u32(entry.probability_bps);
            hasher.update_u8(entry.payout_kind as u8);
            hasher.update_u64(entry.payout_value);
        }
        hasher.finalize_hex()
    }

    /// Walk the table against a threshold in basis points.
    pub fn pick_bps(&self, threshold_bps: u32) -> BucketPick {
        let pick = pick_bucket(self.entries.iter().map(|e| e.probability_bps), threshold_bps)
            .unwrap_or(BucketPick {
                index: 0,
                upper_bps: 0,
                fallback: true,
            });
        if pick.fallback {
            warn!(
                version = self.version,
                total_bps = self.total_bps(),
                threshold_bps,
                "Prize table drift: threshold not reached, falling back to first entry"
            );
        }
        pick
    }

    /// Walk the table with the leading word of a raw hash.
    pub fn pick_word(&self, word: u32) -> BucketPick {
        self.pick_bps(word_to_bps(word))
    }

    /// Entry at `index`. Panics only if the index did not come from this
    /// table; picks always index a non-empty table.
    pub fn entry(&self, index: usize) -> &PrizeEntry {
        &self.entries[index]
    }
}

/// Select the prize for `decimal` in [0, 1).
///
/// Returns the first entry whose cumulative probability reaches
/// `decimal * 100`. If the table sums to less than that, the FIRST entry is
/// returned: misconfigured tables are biased toward entry one, and a
/// warning is logged every time that happens.
pub fn select_prize(table: &PrizeTable, decimal: f64) -> &PrizeEntry {
    let pick = table.pick_bps(decimal_to_bps(decimal));
    table.entry(pick.index)
}

/// Every prize table ever published, by version.
#[derive(Debug, Default)]
pub struct PrizeCatalog {
    tables: BTreeMap<u32, Arc<PrizeTable>>,
}

impl PrizeCatalog {
    /// Catalogue holding only the stock wheel as version 1.
    pub fn with_default_wheel() -> Self {
        let mut tables = BTreeMap::new();
        tables.insert(1, Arc::new(PrizeTable::default_wheel(1)));
        Self { tables }
    }

    /// Publish `entries` as the next version.
    ///
    /// Drift does not block publication; it is surfaced as a warning.
    pub fn publish(&mut self, entries: Vec<PrizeEntry>) -> ArcadeResult<Arc<PrizeTable>> {
        let version = self.tables.keys().next_back().map_or(1, |v| v + 1);
        let table = Arc::new(PrizeTable::new(version, entries)?);

        if let Err(ArcadeError::ConfigurationDrift { total_bps }) = table.check_drift() {
            warn!(
                version,
                total_bps,
                "Publishing prize table whose probabilities do not total 100%"
            );
        }
        info!(version, entries = table.entries.len(), "Prize table published");

        self.tables.insert(version, table.clone());
        Ok(table)
    }

    /// Table currently in effect.
    pub fn current(&self) -> Option<Arc<PrizeTable>> {
        self.tables.values().next_back().cloned()
    }

    /// Table for a historical version.
    pub fn get(&self, version: u32) -> ArcadeResult<Arc<PrizeTable>> {
        self.tables
            .get(&version)
            .cloned()
            .ok_or(ArcadeError::UnknownPrizeTable(version))
    }

    /// Number of versions published.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True if nothing has been published.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
