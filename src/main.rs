//! `go-license-checkr`: look up the licenses of a Go module's dependencies.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and set up logging.
//! 2. Load fetch settings ([`config::load_config`]).
//! 3. Enumerate modules from `go.mod` or `go list` ([`loader`]), dropping
//!    errored and, with `--direct`, indirect ones.
//! 4. Look up every module on pkg.go.dev through the rate-limited,
//!    bounded-concurrency [`lookup::Fetcher`].
//! 5. Stream results as JSON lines or render a terminal table ([`report`]).

mod cli;
mod config;
mod error;
mod loader;
mod lookup;
mod models;
mod report;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, ReportFormat};
use config::load_config;
use loader::golist::GoListLoader;
use loader::gomod::GoModLoader;
use loader::{remove_errored, remove_indirect, ModuleLoader};
use lookup::{Fetcher, ResultStream};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    // Resolve project path
    let path = cli
        .path
        .canonicalize()
        .unwrap_or_else(|_| cli.path.clone());

    let mut fetch_config = load_config(&path, cli.config.as_deref())?.fetch;
    fetch_config.debug = cli.debug;

    let loader: Box<dyn ModuleLoader> = if cli.list {
        Box::new(GoListLoader::new())
    } else {
        Box::new(GoModLoader::new())
    };

    let mut modules = loader.load(&path)?;
    if cli.direct {
        modules = remove_indirect(modules);
    }
    let modules = remove_errored(modules);

    if cli.dry {
        println!("{}", serde_json::to_string(&modules)?);
        return Ok(());
    }

    let fetcher = Fetcher::new(&fetch_config)?;
    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let total = modules.len();
    let stream = fetcher.fetch_licenses(modules, cancel);

    match cli.report {
        ReportFormat::Json => print_json_lines(stream).await,
        ReportFormat::Terminal => {
            let mut results = collect_with_progress(stream, total, cli.quiet).await?;
            report::terminal::render(&mut results, &path, cli.quiet)?;
        }
    }

    Ok(())
}

fn init_logging(debug: bool) {
    let default_directive = if debug {
        "warn,go_license_checkr=debug"
    } else {
        "warn,go_license_checkr=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Ctrl-C stops new lookups and aborts in-flight requests; the stream still
/// closes normally.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling outstanding lookups");
            cancel.cancel();
        }
    });
}

async fn print_json_lines(mut stream: ResultStream) {
    while let Some(result) = stream.next().await {
        let mut out = std::io::stdout().lock();
        if let Err(e) = report::json::write_line(&mut out, &result) {
            error!("failed to write result for {}: {}", result.uri(), e);
        }
    }
}

async fn collect_with_progress(
    mut stream: ResultStream,
    total: usize,
    quiet: bool,
) -> Result<Vec<models::LicenseResult>> {
    let pb = if !quiet {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut results = Vec::with_capacity(total);
    while let Some(result) = stream.next().await {
        if let Some(pb) = &pb {
            pb.set_message(result.module().path.clone());
            pb.inc(1);
        }
        results.push(result);
    }

    if let Some(pb) = pb {
        pb.finish_with_message("Done");
    }

    Ok(results)
}
