//! devsync - mirror a local directory onto a mounted device
//!
//! Design goals:
//! - One diff-driven pass: add, update, and (in mirror mode) delete
//! - Partial failures never abort the run; errors are reported at the end
//! - The same engine drives mounted and command-channel devices

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use devsync::backend::ReadOnlyBackend;
use devsync::engine::{CancelFlag, SyncEngine, SyncOptions, UpdatePolicy, DEFAULT_MAX_DEPTH};
use devsync::local::LocalMountBackend;
use devsync::progress::{
    ActionCounter, ConsoleProgress, FanoutProgress, ProgressSink, SpinnerProgress,
};
use devsync::report::SyncReport;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "devsync - mirror a local directory onto a mounted device"
)]
struct Args {
    /// Source directory on the host
    source: PathBuf,

    /// Destination directory (the mounted device root or a subdirectory)
    destination: PathBuf,

    /// Keep destination-only entries instead of deleting them
    #[arg(long)]
    no_mirror: bool,

    /// Include dotfiles and backup (`name~`) files
    #[arg(short = 'a', long = "hidden")]
    hidden: bool,

    /// When a file exists on both sides
    #[arg(long, value_enum, default_value = "newer")]
    update_policy: PolicyArg,

    /// Maximum recursion depth
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// List planned actions without touching the destination (/L)
    #[arg(short = 'l', long, alias = "list-only")]
    dry_run: bool,

    /// Show each action as it happens
    #[arg(short, long)]
    verbose: bool,

    /// Append a JSONL action report to this file
    #[arg(long = "report-file")]
    report_file: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolicyArg {
    /// Copy only when the source file is strictly newer
    Newer,
    /// Copy every matched file unconditionally
    Always,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Ctrl-C requests a graceful stop at the next entry boundary
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nInterrupted, finishing the current entry...");
            cancel.cancel();
        })
        .context("Failed to set Ctrl-C handler")?;
    }

    let options = SyncOptions {
        mirror: !args.no_mirror,
        update_policy: match args.update_policy {
            PolicyArg::Newer => UpdatePolicy::OnlyIfNewer,
            PolicyArg::Always => UpdatePolicy::AlwaysOverwrite,
        },
        show_hidden: args.hidden,
        max_depth: args.max_depth,
    };

    let counter = Arc::new(ActionCounter::new());
    let mut sinks: Vec<Arc<dyn ProgressSink>> = vec![counter.clone()];

    let spinner = if args.verbose {
        sinks.push(Arc::new(ConsoleProgress));
        None
    } else {
        let spinner = Arc::new(SpinnerProgress::new());
        sinks.push(spinner.clone());
        Some(spinner)
    };

    if let Some(ref path) = args.report_file {
        sinks.push(Arc::new(SyncReport::new(path)));
    }
    let progress = FanoutProgress::new(sinks);

    if args.dry_run {
        println!("DRY RUN MODE - the destination will not be touched");
    }

    let start = Instant::now();
    let local = LocalMountBackend::new();

    let outcome = if args.dry_run {
        let shadow = ReadOnlyBackend::new(&local);
        SyncEngine::new(&shadow, &progress, options)
            .with_cancel(cancel)
            .sync(&args.source, &args.destination)
    } else {
        SyncEngine::new(&local, &progress, options)
            .with_cancel(cancel)
            .sync(&args.source, &args.destination)
    };

    if let Some(spinner) = spinner {
        spinner.finish();
    }

    let (adds, removes, updates) = counter.snapshot();
    let elapsed = start.elapsed();
    println!(
        "{} added, {} removed, {} updated in {:.2}s",
        adds,
        removes,
        updates,
        elapsed.as_secs_f64()
    );

    if !outcome.is_success() {
        eprintln!("\nErrors encountered: {}", outcome.errors.len());
        eprintln!("{}", outcome.joined());
        std::process::exit(1);
    }

    Ok(())
}
