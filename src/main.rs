//! Fair Arcade Server
//!
//! Serves the prize wheel and shooting gallery over WebSocket.
//! `--demo` instead plays a short offline session and verifies it.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fair_arcade::{
    game::state::Shot,
    network::ArcadeServer,
    proof::audit::TracingAuditSink,
    verify_layout, verify_spin, Arcade, ArcadeConfig, PlayerId, WeaponProfile, VERSION,
};

const DEFAULT_FILTER: &str = if cfg!(feature = "debug-tracing") {
    "debug"
} else {
    "info"
};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ArcadeConfig::from_env().context("loading configuration")?;
    let arcade = Arc::new(
        Arcade::new(config.engine.clone(), Arc::new(TracingAuditSink))
            .context("building arcade")?,
    );

    info!("Fair Arcade Server v{}", VERSION);

    if std::env::args().any(|arg| arg == "--demo") {
        return demo(&arcade).await;
    }

    let server = ArcadeServer::new(config, arcade);
    server.run().await?;
    Ok(())
}

/// Play a few spins and one match, reveal the secrets, and verify both.
async fn demo(arcade: &Arcade) -> Result<()> {
    info!("=== Wheel ===");
    let player = PlayerId::new("demo-player");
    let commitment = arcade.register(&player).await;
    info!("Committed secret hash: {}", commitment.secret_seed_hash);

    let mut spins = Vec::new();
    for _ in 0..5 {
        let spin = arcade.spin_wheel(&player, None).await?;
        info!(
            "Nonce {}: decimal {:.6} -> {} ({:?} {})",
            spin.nonce,
            spin.outcome.decimal,
            spin.prize_id,
            spin.payout.payout_kind,
            spin.payout.payout_value
        );
        spins.push(spin);
    }

    let receipt = arcade.rotate_seed(&player).await?;
    info!("Revealed secret: {}", receipt.revealed_secret_seed);
    for spin in &spins {
        let table = arcade.prize_table(spin.table_version).await?;
        verify_spin(&receipt.revealed_secret_seed, spin, &table)
            .with_context(|| format!("spin nonce {}", spin.nonce))?;
    }
    info!("All {} spins verified", spins.len());

    info!("=== Shooting Gallery ===");
    let snapshot = arcade.start_match(&player, 2, WeaponProfile::rifle()).await?;
    info!(
        "Match {} committed layout {} with {} birds, wind {:.3}",
        snapshot.id,
        snapshot.seed_hash,
        snapshot.entities.len(),
        snapshot.wind.x
    );

    for bird in snapshot.entities.iter().take(snapshot.weapon.starting_ammo as usize) {
        let result = arcade
            .shoot(&player, &snapshot.id, &Shot::at_entity(bird.x, bird.y, bird.id))
            .await?;
        info!(
            "Shot at bird {} ({:?}): hit={} score={} combo={}",
            bird.id, bird.kind, result.hit, result.score_after, result.combo_after
        );
    }

    arcade.end_match(&player, &snapshot.id).await?;
    let result = arcade.collect_match(&player, &snapshot.id).await?;
    let Some(revealed) = result.snapshot.revealed_seed.as_deref() else {
        bail!("completed match did not reveal its seed");
    };
    verify_layout(revealed, &result.snapshot, arcade.engine().config())
        .context("match layout")?;
    info!(
        "Match verified: score {} -> reward {}",
        result.snapshot.score, result.reward
    );

    Ok(())
}
