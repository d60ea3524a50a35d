//! primes - drive the prime finder from the terminal.
//!
//! Stands in for a presentation layer: forwards start / cancel to the core
//! and renders the notifications it streams back.
//!
//! The checks run on their own multi-thread runtime. The front end (signals,
//! timers, rendering) runs on a current-thread runtime that CPU-bound checks
//! cannot starve.

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use primes_core::impls::ChannelSink;
use primes_core::{EngineConfig, RunControllerBuilder, RunStatus, RunSummary, SinkEvent};
use tokio::runtime::{Builder, Handle};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Parser)]
#[command(name = "primes", about = "Find the primes in [1, N], one task per candidate")]
struct Args {
    /// Upper bound N
    #[arg(allow_negative_numbers = true)]
    n: i64,

    /// Number of concurrent workers (overrides the config file)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Largest accepted N (overrides the config file)
    #[arg(long)]
    max_bound: Option<u64>,

    /// JSON config file: {"worker_count": .., "max_bound": ..}
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cancel the run after this many milliseconds
    #[arg(long)]
    cancel_after_ms: Option<u64>,

    /// Do not list primes as they are found
    #[arg(short, long)]
    quiet: bool,

    /// Print the final summary as JSON
    #[arg(long)]
    json: bool,

    /// Log level for diagnostics on stderr
    #[arg(long, default_value = "info")]
    log_level: Level,
}

fn load_config(args: &Args) -> Result<EngineConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(workers) = args.workers {
        config = config.with_worker_count(workers);
    }
    if let Some(max_bound) = args.max_bound {
        config = config.with_max_bound(max_bound);
    }
    Ok(config)
}

fn render(out: &mut impl Write, event: SinkEvent, quiet: bool) -> io::Result<()> {
    match event {
        SinkEvent::PrimeFound { candidate, .. } if !quiet => write!(out, "{candidate}, "),
        SinkEvent::InvariantViolation {
            primes_so_far,
            completed_so_far,
        } => writeln!(
            out,
            "\nInvariant violated: {primes_so_far} primes > {completed_so_far} processed"
        ),
        _ => Ok(()),
    }
}

fn print_summary(out: &mut impl Write, summary: &RunSummary, json: bool) -> io::Result<()> {
    if json {
        let body = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
        return writeln!(out, "{body}");
    }
    writeln!(out)?;
    if summary.status == RunStatus::Cancelled {
        writeln!(out, "Cancelled.")?;
    }
    writeln!(out, "Number of primes up to N: {}", summary.primes_found)?;
    writeln!(out, "Total numbers processed: {}", summary.candidates_completed)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(true)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let checks = Builder::new_multi_thread()
        .thread_name("primes-check")
        .enable_all()
        .build()?;
    let front = Builder::new_current_thread().enable_all().build()?;
    front.block_on(run(args, checks.handle().clone()))
}

async fn run(args: Args, checks: Handle) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args)?;
    info!(
        workers = config.worker_count,
        max_bound = config.max_bound,
        "configuration loaded"
    );

    let (sink, mut rx) = ChannelSink::new();
    let controller = Arc::new(
        RunControllerBuilder::new()
            .config(config)
            .sink(Arc::new(sink))
            .runtime(checks)
            .build()?,
    );

    let mut out = io::stdout().lock();
    if !args.quiet && !args.json {
        writeln!(out, "Finding primes for {}:", args.n)?;
    }

    let mut handle = controller.start(args.n)?;

    if let Some(ms) = args.cancel_after_ms {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            controller.cancel();
        });
    }

    let summary = loop {
        tokio::select! {
            Some(event) = rx.recv() => render(&mut out, event, args.quiet || args.json)?,
            summary = handle.wait() => break summary,
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted; cancelling run");
                controller.cancel();
            }
        }
    };

    // everything reported before the run settled is already queued
    while let Ok(event) = rx.try_recv() {
        render(&mut out, event, args.quiet || args.json)?;
    }

    print_summary(&mut out, &summary, args.json)?;
    out.flush()?;
    Ok(())
}
