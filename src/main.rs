//! FleetWatch - Headless runner
//!
//! Builds the reference fleet, drives it for a number of ticks with
//! detection and enrichment running, then prints the final fleet state.

use clap::Parser;
use std::path::PathBuf;
use tokio::runtime::Runtime;
use tokio::sync::{broadcast, watch};

use fleetwatch::analysis::{Enricher, RcaClient};
use fleetwatch::core::error::Result;
use fleetwatch::runtime::{self, DriverOptions, FleetContext};
use fleetwatch::FleetConfig;

/// FleetWatch - simulate an AMR fleet and watch it for conflicts
#[derive(Parser, Debug)]
#[command(name = "fleetwatch")]
#[command(about = "Run the AMR fleet simulation with conflict detection")]
struct Args {
    /// Random seed (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks to run
    #[arg(long, default_value_t = 240)]
    ticks: u64,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the final fleet update as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Pace ticks at the simulation interval instead of running flat out
    #[arg(long, default_value_t = false)]
    realtime: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("fleetwatch=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => FleetConfig::load(path)?,
        None => FleetConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    tracing::info!("FleetWatch starting with seed {}", config.seed);

    let rt = Runtime::new()?;

    let llm_client = RcaClient::from_env().ok();
    if llm_client.is_none() {
        tracing::warn!("LLM_API_KEY not set - using rule-based incident analysis");
    }

    let mut ctx = FleetContext::new(&config)?;
    let mut enricher = Enricher::new(llm_client);

    let mut options = if args.realtime {
        DriverOptions::realtime(config.simulation.tick_interval_secs)
    } else {
        DriverOptions::default()
    };
    options.max_ticks = Some(args.ticks);

    let (updates, _) = broadcast::channel(64);
    let (stop_tx, stop_rx) = watch::channel(false);

    let report = rt.block_on(async {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = stop_tx.send(true);
            }
        });
        runtime::run(&mut ctx, &mut enricher, &options, &updates, stop_rx).await
    });

    let update = ctx.update();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&update)?);
        return Ok(());
    }

    let summary = &update.summary;
    println!("\n=== FLEETWATCH ===");
    println!(
        "Ran {} ticks ({:.1}s simulated)",
        report.ticks, update.time
    );
    println!(
        "Robots: {} total | {} active | {} idle | {} charging | {} error | {} offline",
        summary.total_robots,
        summary.active,
        summary.idle,
        summary.charging,
        summary.error,
        summary.offline
    );
    println!(
        "Alerts raised: {} | analyses attached: {}",
        report.alerts_raised, report.analyses_attached
    );

    if update.alerts.is_empty() {
        println!("\nNo active alerts.");
    } else {
        println!("\nActive alerts:");
        for alert in &update.alerts {
            println!(
                "  [{:?}] {} ({}) - {}",
                alert.severity, alert.title, alert.id, alert.suggested_action
            );
            if let Some(analysis) = &alert.analysis {
                for line in analysis.lines().take(2) {
                    println!("      {}", line);
                }
            }
        }
    }

    Ok(())
}
