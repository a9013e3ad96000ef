mod api;
mod classify;
mod config;
mod dedup;
mod error;
mod extract;
mod fetch;
mod page;
mod patterns;
mod pipeline;
mod scanner;
mod scheduler;
mod store;
mod types;
mod vocab;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use traffic_types::{SpeedCamera, TrafficJam};

use config::Config;
use fetch::HttpPageSource;
use pipeline::{ExtractionEngine, Orchestrator};
use store::TrafficStore;

#[derive(Parser)]
#[command(
    name = "verkeer_monitor",
    version,
    about = "ANWB traffic jam and speed camera monitor"
)]
struct Cli {
    /// JSON config file; missing keys take defaults
    #[arg(long, env = "VERKEER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "verkeer_monitor=trace" (overrides RUST_LOG)
    #[arg(long, env = "VERKEER_LOG", global = true)]
    log_level: Option<String>,

    /// SQLite database path
    #[arg(long, env = "VERKEER_DB", global = true)]
    db: Option<PathBuf>,

    /// API bind address
    #[arg(long, env = "VERKEER_BIND", global = true)]
    bind: Option<String>,

    /// Seconds between scheduled scrapes
    #[arg(long, env = "VERKEER_INTERVAL", global = true)]
    interval: Option<u64>,

    /// Per-pipeline page timeout in seconds
    #[arg(long, env = "VERKEER_PAGE_TIMEOUT", global = true)]
    page_timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler and the read API (default)
    Serve,
    /// Run one scrape, store it, print the summary as JSON
    Scrape,
    /// Run both pipelines over saved page snapshots (.html, .htm, .txt)
    Extract {
        /// Directory of snapshots
        dir: PathBuf,
        /// Write the records here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the monitored roads and cities
    Roads,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());
    let config = load_config(&cli)?;

    match cli.command {
        Some(Command::Serve) | None => run_serve(config),
        Some(Command::Scrape) => run_scrape(config),
        Some(Command::Extract { dir, output }) => run_extract(&config, &dir, output.as_deref()),
        Some(Command::Roads) => run_roads(&config),
    }
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(l) => EnvFilter::new(l),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(db) = &cli.db {
        config.database = db.clone();
    }
    if let Some(bind) = &cli.bind {
        config.bind = bind.clone();
    }
    if let Some(secs) = cli.interval {
        config.scrape_interval_secs = secs;
    }
    if let Some(secs) = cli.page_timeout {
        config.page_timeout_secs = secs;
    }
    Ok(config.validated()?)
}

fn open_orchestrator(config: &Config) -> anyhow::Result<Arc<Orchestrator>> {
    let store = TrafficStore::open(&config.database)
        .with_context(|| format!("opening database {}", config.database.display()))?;
    let source = HttpPageSource::new(&config.user_agent, config.page_timeout())?;
    Ok(Arc::new(Orchestrator::new(config, Arc::new(source), store)))
}

// ═══════════════════════════════════════════════════════════════════════
//  SERVE / SCRAPE
// ═══════════════════════════════════════════════════════════════════════

fn run_serve(config: Config) -> anyhow::Result<()> {
    let orchestrator = open_orchestrator(&config)?;
    info!(
        database = %config.database.display(),
        roads = config.monitored.roads().len(),
        interval_secs = config.scrape_interval_secs,
        "starting monitor"
    );
    let scheduler = scheduler::Scheduler::start(Arc::clone(&orchestrator), config.scrape_interval());
    let state = Arc::new(api::ApiState::new(orchestrator, config.monitored.clone()));
    let served = api::serve(&config.bind, state);
    scheduler.stop();
    served.with_context(|| format!("serving API on {}", config.bind))
}

fn run_scrape(config: Config) -> anyhow::Result<()> {
    let orchestrator = open_orchestrator(&config)?;
    let summary = orchestrator.run();
    println!("{}", serde_json::to_string_pretty(&summary)?);
    for e in &summary.pipeline_errors {
        warn!(error = %e, "pipeline error");
    }
    if let Some(e) = summary.error {
        bail!("scrape failed: {e}");
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
//  EXTRACT MODE: offline pipelines over saved snapshots
// ═══════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
struct ExtractOutput {
    traffic_jams: Vec<TrafficJam>,
    speed_cameras: Vec<SpeedCamera>,
}

fn print_counts(title: &str, counts: HashMap<String, usize>) {
    eprintln!("\n{title}:");
    let mut sorted: Vec<_> = counts.into_iter().collect();
    sorted.sort_by(|(a, ca), (b, cb)| cb.cmp(ca).then_with(|| a.cmp(b)));
    for (key, count) in sorted {
        eprintln!("  {key}: {count}");
    }
}

fn run_extract(config: &Config, dir: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    eprintln!("Scanning snapshots at: {}", dir.display());
    let files = scanner::scan_snapshots(dir);
    eprintln!("Found {} snapshot files", files.len());

    let engine = ExtractionEngine::new(config);
    let at = Utc::now();
    let mut result = ExtractOutput {
        traffic_jams: Vec::new(),
        speed_cameras: Vec::new(),
    };
    let mut failed = Vec::new();

    for file in &files {
        let doc = match file.load() {
            Ok(d) => d,
            Err(e) => {
                failed.push(format!("{}: {e}", file.path.display()));
                continue;
            }
        };
        let pages = [doc];
        let jams = engine.process_traffic(&pages, at);
        let cameras = engine.process_cameras(&pages, at);
        info!(
            file = %file.path.display(),
            jams = jams.len(),
            cameras = cameras.len(),
            "snapshot processed"
        );
        result.traffic_jams.extend(jams);
        result.speed_cameras.extend(cameras);
    }

    // ── Print statistics ───────────────────────────────────────────
    eprintln!("\n══════════════════════════════════════════");
    eprintln!("  EXTRACTION STATISTICS");
    eprintln!("══════════════════════════════════════════");
    eprintln!("\nTraffic jams:  {}", result.traffic_jams.len());
    eprintln!("Speed cameras: {}", result.speed_cameras.len());

    let mut by_road: HashMap<String, usize> = HashMap::new();
    for road in result
        .traffic_jams
        .iter()
        .map(|j| &j.road)
        .chain(result.speed_cameras.iter().map(|c| &c.road))
    {
        *by_road.entry(road.clone()).or_insert(0) += 1;
    }
    print_counts("By road", by_road);

    let mut by_cause: HashMap<String, usize> = HashMap::new();
    for jam in &result.traffic_jams {
        *by_cause.entry(jam.cause.clone()).or_insert(0) += 1;
    }
    print_counts("By cause", by_cause);

    let mut by_type: HashMap<String, usize> = HashMap::new();
    for cam in &result.speed_cameras {
        *by_type.entry(cam.flitser_type.as_str().to_string()).or_insert(0) += 1;
    }
    print_counts("By camera type", by_type);

    let total_delay: u32 = result.traffic_jams.iter().map(|j| j.delay_minutes).sum();
    eprintln!("\nTotal delay: {total_delay} min");

    if !failed.is_empty() {
        eprintln!("\n══════════════════════════════════════════");
        eprintln!("  UNREADABLE FILES ({} total)", failed.len());
        eprintln!("══════════════════════════════════════════");
        for f in failed.iter().take(30) {
            eprintln!("  {f}");
        }
        if failed.len() > 30 {
            eprintln!("  ... and {} more", failed.len() - 30);
        }
    }

    let json = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("cannot write {}", path.display()))?;
            eprintln!("\n  {} ({} bytes)", path.display(), json.len());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_roads(config: &Config) -> anyhow::Result<()> {
    println!("Roads:  {}", config.monitored.roads().join(", "));
    println!("Cities: {}", config.monitored.cities().join(", "));
    Ok(())
}
