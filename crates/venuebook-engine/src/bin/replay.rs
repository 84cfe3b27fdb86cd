//! Venuebook event replay
//!
//! Rebuilds books offline from recorded chain events:
//! - optionally loads a JSON array of active orders as the starting book
//! - feeds a newline-delimited `ChainEvent` file through the event pipeline
//! - runs one expiry sweep
//! - publishes and prints the aggregated book(s) as JSON on stdout
//!
//! Usage:
//!   venuebook-replay --events events.ndjson --snapshot orders.json --asset 42

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use venuebook_engine::{
    ChannelSink, VenueEngine, event_channel, forward_events, publish_snapshot, shared,
    spawn_event_consumer, sweep_once, telemetry::init_tracing,
};
use venuebook_types::{
    AssetId, BookSnapshot, ChainEvent, EngineConfig, Order, OrderSide, constants,
};

#[derive(Parser)]
#[command(name = "venuebook-replay", version)]
#[command(about = "Replay chain events into an in-memory venuebook and print the books")]
struct Args {
    /// Newline-delimited JSON chain events
    #[arg(long)]
    events: PathBuf,

    /// Engine config (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON array of active orders to start from
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Only print this asset's book
    #[arg(long)]
    asset: Option<String>,

    /// Best N levels per side (all levels when omitted)
    #[arg(long)]
    depth: Option<usize>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    EngineConfig::from_json_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

fn load_snapshot(path: &Path) -> Result<Vec<Order>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing snapshot {}", path.display()))
}

fn load_events(path: &Path) -> Result<Vec<ChainEvent>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading events {}", path.display()))?;
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid chain event", path.display(), idx + 1))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs)?;
    tracing::info!(
        engine = constants::ENGINE_NAME,
        version = constants::VERSION,
        events = %args.events.display(),
        "Starting replay"
    );

    let config = load_config(args.config.as_deref())?;
    let events = load_events(&args.events)?;

    let mut engine = VenueEngine::new(config.clone())?;
    if let Some(path) = &args.snapshot {
        let report = engine.load_active_orders(load_snapshot(path)?);
        if report.skipped > 0 {
            tracing::warn!(skipped = report.skipped, "Snapshot contained invalid orders");
        }
    }

    let engine = shared(engine);
    let sink = Arc::new(ChannelSink::new(config.broadcast_capacity));
    let (tx, rx) = event_channel(&config);
    let consumer = spawn_event_consumer(engine.clone(), rx, sink.clone());

    tracing::info!(events = events.len(), "Replaying events");
    let forwarded = forward_events(&tx, events).await;
    drop(tx);

    // A halted consumer explains a closed channel, so report it first.
    let stats = consumer.await.context("event consumer panicked")??;
    forwarded?;
    let released = sweep_once(&engine, sink.as_ref()).await;
    tracing::info!(
        applied = stats.applied,
        ignored = stats.ignored,
        rejected = stats.rejected,
        released_levels = released,
        "Replay complete"
    );

    let assets: Vec<AssetId> = match &args.asset {
        Some(asset) => vec![AssetId::new(asset.as_str())],
        None => engine.read().await.store().assets().cloned().collect(),
    };
    if assets.is_empty() {
        bail!("no books to print");
    }

    let mut books: BTreeMap<String, BookSnapshot> = BTreeMap::new();
    for asset in assets {
        let book = publish_snapshot(&engine, sink.as_ref(), &asset, args.depth).await;
        tracing::info!(
            asset = %asset,
            best_bid = book.best_bid().map(|l| tracing::field::display(l.price)),
            best_ask = book.best_ask().map(|l| tracing::field::display(l.price)),
            bid_size = %book.side_total(OrderSide::Buy),
            ask_size = %book.side_total(OrderSide::Sell),
            "Book rebuilt"
        );
        books.insert(asset.as_str().to_owned(), book);
    }

    println!("{}", serde_json::to_string_pretty(&books)?);
    Ok(())
}
