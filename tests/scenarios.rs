//! End-to-end checks through the public API.

use std::collections::BTreeSet;
use std::sync::Arc;

use fair_arcade::core::hash::commit_seed;
use fair_arcade::game::bird::{BirdKind, BirdTemplate};
use fair_arcade::game::prize::PayoutKind;
use fair_arcade::game::state::MatchStatus;
use fair_arcade::proof::audit::{AuditRecord, MemoryAuditSink};
use fair_arcade::proof::verify::verify_commitment;
use fair_arcade::{
    derive, select_prize, to_decimal, verify_layout, verify_spin, Arcade, ArcadeError,
    EngineConfig, MatchSnapshot, PlayerId, PrizeEntry, PrizeTable, Shot, VerificationError,
    WeaponProfile, WheelSpin,
};

fn arcade_with(config: EngineConfig) -> (Arcade, Arc<MemoryAuditSink>) {
    let sink = Arc::new(MemoryAuditSink::new());
    let arcade = Arcade::new(config, sink.clone()).unwrap();
    (arcade, sink)
}

/// Every bird has 1 hp and is worth 10 points; no combo bonus.
fn flat_config() -> EngineConfig {
    EngineConfig {
        combo_bonus_rate: 0.0,
        birds: vec![BirdTemplate {
            kind: BirdKind::Sparrow,
            weight_bps: 10_000,
            health: 1,
            point_value: 10,
            base_speed: 100.0,
            min_y: 0.3,
            max_y: 0.7,
        }],
        ..Default::default()
    }
}

#[test]
fn scenario_a_derivation_is_deterministic_and_buckets_split() {
    let first = derive("S1", "C1", 0);
    let second = derive("S1", "C1", 0);
    assert_eq!(first, second);

    let decimal = to_decimal(&first);
    assert!((0.0..1.0).contains(&decimal));

    let table = PrizeTable::new(
        1,
        vec![
            PrizeEntry::new("A", 50.0, PayoutKind::Credits, 1),
            PrizeEntry::new("B", 50.0, PayoutKind::Credits, 2),
        ],
    )
    .unwrap();
    assert_eq!(select_prize(&table, 0.3).id, "A");
    assert_eq!(select_prize(&table, 0.7).id, "B");
    assert_eq!(select_prize(&table, 0.5).id, "A");

    let expected = if decimal <= 0.5 { "A" } else { "B" };
    assert_eq!(select_prize(&table, decimal).id, expected);
}

#[tokio::test]
async fn scenario_b_single_shot_kill_and_reward() {
    let (arcade, _) = arcade_with(flat_config());
    let player = PlayerId::new("shooter");
    let snapshot = arcade
        .start_match(&player, 1, WeaponProfile::new("single", 1, 1, 0.0))
        .await
        .unwrap();
    assert_eq!(snapshot.ammo_remaining, 1);

    let bird = snapshot.entities[0].clone();
    let result = arcade
        .shoot(&player, &snapshot.id, &Shot::at_entity(bird.x, bird.y, bird.id))
        .await
        .unwrap();
    assert!(result.hit);
    assert_eq!(result.entity_id, Some(bird.id));
    assert_eq!(result.entity_still_alive, Some(false));
    assert_eq!(result.score_after, 10);
    assert_eq!(result.combo_after, 1);

    let ended = arcade.end_match(&player, &snapshot.id).await.unwrap();
    assert_eq!(ended.status, MatchStatus::Completed);
    assert!(!ended.entities[0].alive);

    let collected = arcade.collect_match(&player, &snapshot.id).await.unwrap();
    assert_eq!(collected.snapshot.score, 10);
    assert_eq!(collected.reward, arcade.engine().reward_for(10));
}

#[tokio::test]
async fn scenario_c_end_twice_returns_same_snapshot() {
    let (arcade, _) = arcade_with(EngineConfig::default());
    let player = PlayerId::new("p");
    let id = arcade
        .start_match(&player, 3, WeaponProfile::shotgun())
        .await
        .unwrap()
        .id;
    arcade.shoot(&player, &id, &Shot::at(100.0, 100.0)).await.unwrap();

    let first = arcade.end_match(&player, &id).await.unwrap();
    let second = arcade.end_match(&player, &id).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(second.shots_fired, 1);
}

#[tokio::test]
async fn scenario_d_rotation_changes_the_secret() {
    let (arcade, sink) = arcade_with(EngineConfig::default());
    let player = PlayerId::new("p");
    let before = arcade.register(&player).await;

    let receipt = arcade.rotate_seed(&player).await.unwrap();
    let after = arcade.commitment(&player).await.unwrap();

    assert_eq!(commit_seed(&receipt.revealed_secret_seed), before.secret_seed_hash);
    assert_eq!(after.secret_seed_hash, receipt.new_secret_seed_hash);
    assert_ne!(commit_seed(&receipt.revealed_secret_seed), after.secret_seed_hash);
    assert!(matches!(
        verify_commitment(&receipt.revealed_secret_seed, &after.secret_seed_hash),
        Err(VerificationError::CommitmentMismatch { .. })
    ));
    assert_eq!(after.nonce, 0);

    assert!(matches!(sink.records().as_slice(), [AuditRecord::SeedRotated(_)]));
}

#[tokio::test]
async fn spins_verify_after_rotation() {
    let (arcade, _) = arcade_with(EngineConfig::default());
    let player = PlayerId::new("p");
    arcade.register(&player).await;

    let mut spins = Vec::new();
    for _ in 0..10 {
        spins.push(arcade.spin_wheel(&player, None).await.unwrap());
    }
    spins.push(arcade.spin_wheel(&player, Some("new-client")).await.unwrap());

    // Published after the spins; verification must use the original version.
    arcade
        .publish_prize_table(vec![PrizeEntry::new("all", 100.0, PayoutKind::Nothing, 0)])
        .await
        .unwrap();

    let receipt = arcade.rotate_seed(&player).await.unwrap();
    for spin in &spins {
        let table = arcade.prize_table(spin.table_version).await.unwrap();
        assert_eq!(verify_spin(&receipt.revealed_secret_seed, spin, &table), Ok(()));
    }

    let latest = arcade.current_table().await.unwrap();
    assert!(verify_spin(&receipt.revealed_secret_seed, &spins[0], &latest).is_err());
}

#[tokio::test]
async fn records_verify_after_json_round_trip() {
    let (arcade, _) = arcade_with(EngineConfig::default());
    let player = PlayerId::new("p");
    arcade.register(&player).await;

    let mut wire = Vec::new();
    for _ in 0..500 {
        let spin = arcade.spin_wheel(&player, None).await.unwrap();
        wire.push(serde_json::to_string(&spin).unwrap());
    }
    let receipt = arcade.rotate_seed(&player).await.unwrap();
    let table = arcade.current_table().await.unwrap();
    for json in &wire {
        let spin: WheelSpin = serde_json::from_str(json).unwrap();
        assert_eq!(verify_spin(&receipt.revealed_secret_seed, &spin, &table), Ok(()));
    }

    let id = arcade
        .start_match(&player, 10, WeaponProfile::rifle())
        .await
        .unwrap()
        .id;
    arcade.end_match(&player, &id).await.unwrap();
    let result = arcade.collect_match(&player, &id).await.unwrap();
    let json = serde_json::to_string(&result.snapshot).unwrap();
    let parsed: MatchSnapshot = serde_json::from_str(&json).unwrap();
    let revealed = parsed.revealed_seed.clone().unwrap();
    assert_eq!(
        verify_layout(&revealed, &parsed, arcade.engine().config()),
        Ok(())
    );
}

#[tokio::test]
async fn concurrent_spins_never_share_a_nonce() {
    let (arcade, _) = arcade_with(EngineConfig::default());
    let arcade = Arc::new(arcade);
    let player = PlayerId::new("racer");
    arcade.register(&player).await;

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let arcade = arcade.clone();
            let player = player.clone();
            tokio::spawn(async move { arcade.spin_wheel(&player, None).await.unwrap().nonce })
        })
        .collect();

    let mut nonces = BTreeSet::new();
    for task in tasks {
        assert!(nonces.insert(task.await.unwrap()));
    }
    assert_eq!(nonces, (0..32).collect());
}

#[tokio::test]
async fn completed_match_is_frozen_and_verifiable() {
    let (arcade, sink) = arcade_with(EngineConfig::default());
    let player = PlayerId::new("p");
    let snapshot = arcade
        .start_match(&player, 4, WeaponProfile::pistol())
        .await
        .unwrap();
    for bird in snapshot.entities.iter().take(3) {
        arcade
            .shoot(&player, &snapshot.id, &Shot::at(bird.x, bird.y))
            .await
            .unwrap();
    }

    let terminal = arcade.end_match(&player, &snapshot.id).await.unwrap();
    assert!(matches!(
        arcade.shoot(&player, &snapshot.id, &Shot::at(1.0, 1.0)).await,
        Err(ArcadeError::SessionNotActive(_))
    ));
    assert_eq!(arcade.end_match(&player, &snapshot.id).await.unwrap(), terminal);

    let result = arcade.collect_match(&player, &snapshot.id).await.unwrap();
    let revealed = result.snapshot.revealed_seed.clone().unwrap();
    assert_eq!(result.snapshot.seed_hash, snapshot.seed_hash);
    assert_eq!(
        verify_layout(&revealed, &result.snapshot, arcade.engine().config()),
        Ok(())
    );

    assert!(matches!(
        arcade.collect_match(&player, &snapshot.id).await,
        Err(ArcadeError::SessionNotFound(_))
    ));
    assert!(sink
        .records()
        .iter()
        .any(|r| matches!(r, AuditRecord::MatchCompleted(m) if m.snapshot.id == snapshot.id)));
}

#[tokio::test]
async fn concurrent_collect_has_one_winner() {
    let (arcade, _) = arcade_with(EngineConfig::default());
    let arcade = Arc::new(arcade);
    let player = PlayerId::new("p");
    let id = arcade
        .start_match(&player, 1, WeaponProfile::pistol())
        .await
        .unwrap()
        .id;
    arcade.end_match(&player, &id).await.unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let arcade = arcade.clone();
            let player = player.clone();
            tokio::spawn(async move { arcade.collect_match(&player, &id).await })
        })
        .collect();

    let mut wins = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => wins += 1,
            Err(ArcadeError::SessionNotFound(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(wins, 1);
}
