//! Verification API
//!
//! Post-hoc checks a player (or auditor) can run once a secret has been
//! revealed: the secret must match its earlier commitment, and recomputing
//! the derivation must reproduce exactly what was shown at play time.
//!
//! Records usually arrive as JSON, and a float does not always survive a
//! JSON round-trip bit for bit. Integer and hex fields are compared exactly;
//! floats derived from them are compared within [`FLOAT_TOLERANCE`].

use thiserror::Error;

use crate::config::EngineConfig;
use crate::core::hash::commit_seed;
use crate::game::bird::{derive_wind, generate_entities};
use crate::game::prize::PrizeTable;
use crate::game::state::MatchSnapshot;
use crate::game::wheel::{evaluate, WheelSpin};

/// Relative tolerance for recomputed floats.
pub const FLOAT_TOLERANCE: f64 = 1e-9;

/// `true` if two recomputed floats agree up to serialization noise.
fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= FLOAT_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

/// Why a verification failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VerificationError {
    /// Revealed secret does not hash to the commitment.
    #[error("revealed secret does not match commitment {committed}")]
    CommitmentMismatch {
        /// Commitment published before play.
        committed: String,
        /// Hash of the revealed secret.
        computed: String,
    },

    /// Spin was recorded against a different table.
    #[error("spin used table v{recorded}, verifier was given v{supplied}")]
    TableMismatch {
        /// Version in the spin record.
        recorded: u32,
        /// Version supplied for verification.
        supplied: u32,
    },

    /// Table content changed since the spin.
    #[error("prize table v{version} fingerprint changed")]
    TableFingerprintMismatch {
        /// Table version.
        version: u32,
    },

    /// Recomputed raw hash differs.
    #[error("raw hash mismatch: recorded {recorded}, computed {computed}")]
    HashMismatch {
        /// Hash shown to the player.
        recorded: String,
        /// Hash recomputed now.
        computed: String,
    },

    /// Recomputed prize differs.
    #[error("prize mismatch: recorded {recorded}, computed {computed}")]
    PrizeMismatch {
        /// Prize shown to the player.
        recorded: String,
        /// Prize recomputed now.
        computed: String,
    },

    /// Snapshot carries a different revealed seed.
    #[error("snapshot reveals a different seed")]
    RevealMismatch,

    /// Recomputed wind differs.
    #[error("wind mismatch")]
    WindMismatch,

    /// Recomputed bird layout differs.
    #[error("layout mismatch at bird {index}")]
    LayoutMismatch {
        /// First differing bird (or the count when lengths differ).
        index: usize,
    },
}

/// Check a revealed secret against the hash committed before play.
pub fn verify_commitment(revealed_secret: &str, committed_hash: &str) -> Result<(), VerificationError> {
    let computed = commit_seed(revealed_secret);
    if computed != committed_hash {
        return Err(VerificationError::CommitmentMismatch {
            committed: committed_hash.to_string(),
            computed,
        });
    }
    Ok(())
}

/// Recompute a wheel spin from its revealed secret.
pub fn verify_spin(
    revealed_secret: &str,
    spin: &WheelSpin,
    table: &PrizeTable,
) -> Result<(), VerificationError> {
    verify_commitment(revealed_secret, &spin.secret_seed_hash)?;

    if spin.table_version != table.version {
        return Err(VerificationError::TableMismatch {
            recorded: spin.table_version,
            supplied: table.version,
        });
    }
    if spin.table_fingerprint != table.fingerprint() {
        return Err(VerificationError::TableFingerprintMismatch {
            version: table.version,
        });
    }

    let (outcome, prize) = evaluate(revealed_secret, &spin.client_seed, spin.nonce, table);
    let recorded = &spin.outcome;
    let same = outcome.raw_hash == recorded.raw_hash
        && outcome.index == recorded.index
        && outcome.weight_bucket == recorded.weight_bucket
        && close(outcome.decimal, recorded.decimal);
    if !same {
        return Err(VerificationError::HashMismatch {
            recorded: spin.outcome.raw_hash.clone(),
            computed: outcome.raw_hash,
        });
    }
    if prize.id != spin.prize_id || prize.payout() != spin.payout {
        return Err(VerificationError::PrizeMismatch {
            recorded: spin.prize_id.clone(),
            computed: prize.id.clone(),
        });
    }
    Ok(())
}

/// Regenerate a match's wind and initial layout and compare to a snapshot.
///
/// Health and liveness change during play, so only spawn fields are
/// compared.
pub fn verify_layout(
    revealed_secret: &str,
    snapshot: &MatchSnapshot,
    config: &EngineConfig,
) -> Result<(), VerificationError> {
    verify_commitment(revealed_secret, &snapshot.seed_hash)?;
    if let Some(revealed) = &snapshot.revealed_seed {
        if revealed != revealed_secret {
            return Err(VerificationError::RevealMismatch);
        }
    }

    let wind = derive_wind(revealed_secret, config, &snapshot.weapon);
    if !close(wind.x, snapshot.wind.x) {
        return Err(VerificationError::WindMismatch);
    }

    let expected = generate_entities(revealed_secret, snapshot.level, config);
    if expected.len() != snapshot.entities.len() {
        return Err(VerificationError::LayoutMismatch {
            index: expected.len().min(snapshot.entities.len()),
        });
    }
    for (index, (want, got)) in expected.iter().zip(&snapshot.entities).enumerate() {
        let same = want.id == got.id
            && want.kind == got.kind
            && close(want.x, got.x)
            && close(want.y, got.y)
            && close(want.speed, got.speed)
            && want.point_value == got.point_value;
        if !same {
            return Err(VerificationError::LayoutMismatch { index });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::prize::{PayoutKind, PrizeEntry};
    use crate::game::state::{MatchSession, Shot};
    use crate::game::wheel::spin;
    use crate::game::weapon::WeaponProfile;
    use crate::proof::commitment::{PlayInputs, PlayerId};
    use uuid::Uuid;

    fn inputs(secret: &str, nonce: u64) -> PlayInputs {
        PlayInputs {
            secret_seed: secret.into(),
            secret_seed_hash: commit_seed(secret),
            client_seed: "client".into(),
            nonce,
        }
    }

    #[test]
    fn test_verify_spin_accepts_honest_record() {
        let table = PrizeTable::default_wheel(1);
        for nonce in 0..20 {
            let record = spin(&PlayerId::new("p"), &inputs("secret", nonce), &table);
            assert_eq!(verify_spin("secret", &record, &table), Ok(()));
        }
    }

    #[test]
    fn test_verify_spin_after_json_round_trip() {
        let table = PrizeTable::default_wheel(1);
        for nonce in 0..2_000 {
            let record = spin(&PlayerId::new("p"), &inputs("secret", nonce), &table);
            let json = serde_json::to_string(&record).unwrap();
            let parsed: WheelSpin = serde_json::from_str(&json).unwrap();
            assert_eq!(verify_spin("secret", &parsed, &table), Ok(()), "nonce {nonce}");
        }
    }

    #[test]
    fn test_verify_spin_rejects_forged_decimal() {
        let table = PrizeTable::default_wheel(1);
        let mut record = spin(&PlayerId::new("p"), &inputs("secret", 7), &table);
        record.outcome.decimal = (record.outcome.decimal + 0.25) % 1.0;
        assert!(matches!(
            verify_spin("secret", &record, &table),
            Err(VerificationError::HashMismatch { .. })
        ));
    }

    #[test]
    fn test_verify_spin_rejects_wrong_secret() {
        let table = PrizeTable::default_wheel(1);
        let record = spin(&PlayerId::new("p"), &inputs("secret", 0), &table);
        assert!(matches!(
            verify_spin("other", &record, &table),
            Err(VerificationError::CommitmentMismatch { .. })
        ));
    }

    #[test]
    fn test_verify_spin_rejects_tampering() {
        let table = PrizeTable::default_wheel(1);
        let mut record = spin(&PlayerId::new("p"), &inputs("secret", 3), &table);
        record.nonce = 4;
        assert!(matches!(
            verify_spin("secret", &record, &table),
            Err(VerificationError::HashMismatch { .. })
        ));

        let record = spin(&PlayerId::new("p"), &inputs("secret", 3), &table);
        let mut forged = record.clone();
        forged.prize_id = "jackpot".into();
        if record.prize_id != "jackpot" {
            assert!(matches!(
                verify_spin("secret", &forged, &table),
                Err(VerificationError::PrizeMismatch { .. })
            ));
        }
    }

    #[test]
    fn test_verify_spin_rejects_other_table() {
        let table = PrizeTable::default_wheel(1);
        let record = spin(&PlayerId::new("p"), &inputs("secret", 0), &table);

        let next = PrizeTable::default_wheel(2);
        assert!(matches!(
            verify_spin("secret", &record, &next),
            Err(VerificationError::TableMismatch { .. })
        ));

        let reordered = PrizeTable::new(
            1,
            table.entries().iter().rev().cloned().collect(),
        )
        .unwrap();
        assert!(matches!(
            verify_spin("secret", &record, &reordered),
            Err(VerificationError::TableFingerprintMismatch { .. })
        ));

        let single = PrizeTable::new(1, vec![PrizeEntry::new("x", 100.0, PayoutKind::Nothing, 0)]).unwrap();
        assert!(verify_spin("secret", &record, &single).is_err());
    }

    #[test]
    fn test_verify_layout_after_play() {
        let config = EngineConfig::default();
        let mut session = MatchSession::with_seed(
            Uuid::new_v4(),
            PlayerId::new("p"),
            "layout".into(),
            3,
            WeaponProfile::rifle(),
            &config,
        );
        let bird = session.entities[0].clone();
        session
            .apply_shot(&Shot::at_entity(bird.x, bird.y, bird.id), &config)
            .unwrap();
        session.finish();

        let snapshot = session.snapshot();
        assert_eq!(verify_layout("layout", &snapshot, &config), Ok(()));
        assert!(matches!(
            verify_layout("forged", &snapshot, &config),
            Err(VerificationError::CommitmentMismatch { .. })
        ));

        for secret in ["layout-a", "layout-b", "layout-c", "layout-d"] {
            let mut session = MatchSession::with_seed(
                Uuid::new_v4(),
                PlayerId::new("p"),
                secret.into(),
                config.max_level,
                WeaponProfile::shotgun(),
                &config,
            );
            session.finish();
            let json = serde_json::to_string(&session.snapshot()).unwrap();
            let parsed: MatchSnapshot = serde_json::from_str(&json).unwrap();
            assert_eq!(verify_layout(secret, &parsed, &config), Ok(()));
        }

        let mut moved = snapshot.clone();
        moved.entities[1].x += 1.0;
        assert_eq!(
            verify_layout("layout", &moved, &config),
            Err(VerificationError::LayoutMismatch { index: 1 })
        );
    }
}
