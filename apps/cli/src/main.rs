use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use usage_core::{
    ConsentState, DecisionStore, EventKind, FileDecisionStore, Location, MetricsSnapshot,
    ReporterConfig, UsageReporterBuilder, consent::default_decision_path,
};

use crate::stdout_sink::StdoutSink;

mod stdout_sink;

#[derive(Parser)]
#[command(name = "usage-report")]
#[command(about = "Inspect usage reporting consent and emit usage events to a collector")]
struct Cli {
    /// JSON reporter config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Decision document (defaults to the user config directory)
    #[arg(long, global = true)]
    decision_file: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the recorded decision
    Status,

    /// Record whether usage events may be sent
    Decide { decision: Decision },

    /// Emit demo events and deliver them through the pipeline
    Emit {
        /// Number of click events to emit
        #[arg(short = 'n', long, default_value_t = 5)]
        count: u32,

        /// Collector endpoint, overrides the config file
        #[arg(long, conflicts_with = "dry_run")]
        collector: Option<String>,

        /// Print events instead of posting them
        #[arg(long)]
        dry_run: bool,

        /// Number of batching windows to wait before shutting down
        #[arg(long, default_value_t = 2)]
        windows: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Decision {
    Accept,
    Decline,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn styled_consent(state: ConsentState) -> String {
    match state {
        ConsentState::Undecided => style(state).yellow().bold().to_string(),
        ConsentState::Accepted => style(state).green().bold().to_string(),
        ConsentState::Declined => style(state).red().bold().to_string(),
    }
}

fn print_metrics(metrics: &MetricsSnapshot) {
    println!("{}", style("─".repeat(40)).dim());
    println!("{} {}", style("Sent:").dim(), style(metrics.sent).cyan().bold());
    println!("{} {}", style("Requeued:").dim(), metrics.requeued);
    println!("{} {}", style("Held back:").dim(), metrics.held_back);
    println!("{} {}", style("Discarded:").dim(), metrics.discarded);
    println!("{} {}", style("Dropped:").dim(), metrics.dropped);
    println!("{} {}", style("Shed:").dim(), metrics.shed);
}

async fn emit(
    mut cfg: ReporterConfig,
    store: Arc<FileDecisionStore>,
    count: u32,
    collector: Option<String>,
    dry_run: bool,
    windows: u32,
) -> Result<()> {
    if collector.is_some() {
        cfg.collector_url = collector;
    }
    let wait = cfg.window() * windows.max(1) + Duration::from_millis(100);

    let mut builder = UsageReporterBuilder::new(cfg).store(store);
    if dry_run {
        builder = builder.sink(Arc::new(StdoutSink));
    }
    let (factory, handle) = builder.start()?;

    println!(
        "{} session {} ({})",
        style("✓").green().bold(),
        style(factory.session_id()).dim(),
        styled_consent(factory.consent())
    );
    if factory.consent() == ConsentState::Undecided {
        println!(
            "{} events are held until a decision is recorded",
            style("!").yellow().bold()
        );
    }

    debug!(count, "emitting demo events");
    for i in 0..count {
        factory
            .create_event(EventKind::Click, format!("demo-{i}"), Location::GENERAL)
            .value(i)
            .send();
    }

    tokio::time::sleep(wait).await;
    let metrics = handle.shutdown().await?;
    print_metrics(&metrics);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let mut cfg = match &cli.config {
        Some(path) => ReporterConfig::load(path)?,
        None => ReporterConfig::default(),
    };
    let decision_path = match cli.decision_file.or_else(|| cfg.decision_path.clone()) {
        Some(path) => path,
        None => default_decision_path()?,
    };
    cfg.decision_path = Some(decision_path.clone());
    let store = Arc::new(FileDecisionStore::open(&decision_path)?);

    match cli.command {
        Command::Status => {
            println!(
                "{} {}",
                style("Usage reporting:").dim(),
                styled_consent(store.consent())
            );
            println!(
                "{} {}",
                style("Decision file:").dim(),
                style(store.path().display()).cyan()
            );
        }
        Command::Decide { decision } => {
            store.set_decision(matches!(decision, Decision::Accept))?;
            println!(
                "{} Usage reporting {}",
                style("✓").green().bold(),
                styled_consent(store.consent())
            );
        }
        Command::Emit {
            count,
            collector,
            dry_run,
            windows,
        } => emit(cfg, store, count, collector, dry_run, windows).await?,
    }

    Ok(())
}
