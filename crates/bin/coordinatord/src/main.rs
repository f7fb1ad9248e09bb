use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bitcoin::consensus::encode::serialize_hex;
use bitcoin::Transaction;
use clap::Parser;
use coinjoin_coordinator::{
    Arena, ArenaConfig, ArenaEvent, Secp256k1OwnershipVerifier, Secp256k1WitnessValidator,
    TransactionBroadcaster,
};
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "coordinatord")]
#[command(about = "coinjoin round coordinator", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long, default_value = "coordinator.toml", env = "COORDINATORD_CONFIG")]
    config: PathBuf,

    /// tracing filter, overrides RUST_LOG
    #[arg(long)]
    log_filter: Option<String>,
}

/// hands finished coinjoins to the operator through the log
struct LogBroadcaster;

impl TransactionBroadcaster for LogBroadcaster {
    fn broadcast(&self, transaction: &Transaction) {
        info!(
            txid = %transaction.compute_txid(),
            hex = %serialize_hex(transaction),
            "coinjoin ready for broadcast"
        );
    }
}

fn log_event(event: &ArenaEvent) {
    match event {
        ArenaEvent::RoundEnded {
            round_id,
            end_state,
        } if !end_state.is_success() => {
            warn!(round = %round_id, %end_state, "round failed")
        }
        ArenaEvent::InputsBanned { round_id, inputs } => {
            warn!(round = %round_id, count = inputs.len(), "inputs banned")
        }
        other => debug!(event = ?other, "arena event"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match &args.log_filter {
        Some(filter) => tracing_subscriber::EnvFilter::new(filter),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "coordinatord=info,coinjoin_coordinator=info".into()),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ArenaConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    info!("starting coordinatord");
    info!("config: {}", args.config.display());
    info!("tick interval: {}s", config.tick_interval_secs);
    info!(
        "inputs per round: {}..={}",
        config.round.min_input_count, config.round.max_input_count
    );

    let tick_interval = config.tick_interval();
    let arena = Arc::new(Arena::new(
        config,
        Arc::new(Secp256k1OwnershipVerifier::new()),
        Arc::new(Secp256k1WitnessValidator::new()),
        Arc::new(LogBroadcaster),
    )?);

    let ticker = arena.clone();
    let tick_loop = tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            for event in ticker.tick().await {
                log_event(&event);
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    info!("shutting down");
    tick_loop.abort();
    Ok(())
}
