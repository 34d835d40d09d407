//! Provably-Fair Derivation
//!
//! `secret_seed` keys an HMAC-SHA256 over `client_seed:nonce`. The 32-byte
//! output is the raw hash shown to the player; its first four bytes become a
//! uniform decimal in [0, 1) and a threshold in basis points.
//!
//! Everything here is a pure function. Given a revealed secret seed, anyone
//! can recompute the raw hash and the selected bucket.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Raw HMAC output (256 bits / 32 bytes).
pub type RawHash = [u8; 32];

/// Basis points in 100%.
pub const BPS_SCALE: u32 = 10_000;

/// 2^32 as f64.
const TWO_POW_32: f64 = 4_294_967_296.0;

/// Derive the raw hash for one play.
///
/// HMAC-SHA256 keyed by `secret_seed` over the message `client_seed:nonce`.
pub fn derive(secret_seed: &str, client_seed: &str, nonce: u64) -> RawHash {
    let mut mac = HmacSha256::new_from_slice(secret_seed.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(client_seed.as_bytes());
    mac.update(b":");
    mac.update(nonce.to_string().as_bytes());
    mac.finalize().into_bytes().into()
}

/// Read the big-endian u32 at word position `index` (0..8) of a raw hash.
#[inline]
pub fn word(raw: &RawHash, index: usize) -> u32 {
    let i = (index % 8) * 4;
    u32::from_be_bytes([raw[i], raw[i + 1], raw[i + 2], raw[i + 3]])
}

/// Map a 32-bit word to [0, 1).
#[inline]
pub fn word_to_unit(word: u32) -> f64 {
    word as f64 / TWO_POW_32
}

/// First four bytes of the raw hash as a decimal in [0, 1).
#[inline]
pub fn to_decimal(raw: &RawHash) -> f64 {
    word_to_unit(word(raw, 0))
}

/// Threshold in basis points for a 32-bit word: `ceil(word * 10000 / 2^32)`.
///
/// Integer-only, so the bucket walk is reproducible in any language.
/// Rounding up keeps `cumulative >= decimal * 10000` exact for integer
/// cumulative sums.
#[inline]
pub fn word_to_bps(word: u32) -> u32 {
    ((word as u64 * BPS_SCALE as u64 + (u32::MAX as u64)) >> 32) as u32
}

/// Threshold in basis points for a decimal in [0, 1].
pub fn decimal_to_bps(decimal: f64) -> u32 {
    let scaled = (decimal.clamp(0.0, 1.0) * BPS_SCALE as f64).ceil();
    scaled as u32
}

/// Result of a cumulative-bucket walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BucketPick {
    /// Index of the selected bucket.
    pub index: usize,
    /// Cumulative weight (bps) at the selected bucket's upper edge.
    pub upper_bps: u32,
    /// True when no bucket reached the threshold and the first was returned.
    pub fallback: bool,
}

/// Walk `weights` in order, returning the first bucket whose cumulative sum
/// reaches `threshold_bps`.
///
/// When the weights sum to less than the threshold the first bucket is
/// returned and `fallback` is set. This is an intentional bias toward the
/// first entry under misconfiguration; callers must surface it.
///
/// Returns `None` only for an empty weight list.
pub fn pick_bucket<I>(weights: I, threshold_bps: u32) -> Option<BucketPick>
where
    I: IntoIterator<Item = u32>,
{
    let mut cumulative: u32 = 0;
    let mut first_upper = None;

    for (index, weight) in weights.into_iter().enumerate() {
        cumulative = cumulative.saturating_add(weight);
        if first_upper.is_none() {
            first_upper = Some(cumulative);
        }
        if cumulative >= threshold_bps {
            return Some(BucketPick {
                index,
                upper_bps: cumulative,
                fallback: false,
            });
        }
    }

    first_upper.map(|upper_bps| BucketPick {
        index: 0,
        upper_bps,
        fallback: true,
    })
}

/// The auditable result of one derivation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Index of the selected entry.
    pub index: usize,
    /// Cumulative weight (bps) bounding the selected bucket.
    pub weight_bucket: u32,
    /// Hex-encoded HMAC output.
    pub raw_hash: String,
    /// First 32 bits of the raw hash mapped into [0, 1).
    pub decimal: f64,
}

impl Outcome {
    /// Build an outcome record from a raw hash and the bucket it selected.
    pub fn new(raw: &RawHash, pick: BucketPick) -> Self {
        Self {
            index: pick.index,
            weight_bucket: pick.upper_bps,
            raw_hash: hex::encode(raw),
            decimal: to_decimal(raw),
        }
    }
}
