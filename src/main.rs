mod app;
mod config;
mod enrich;
mod error;
mod geometry;
mod pipeline;
mod sinks;
mod source;
mod temporal;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;

use app::{Cli, run};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("CLI: Failed to initialize thread pool")?;
    }

    let start = std::time::Instant::now();
    let report = run(&cli)?;

    let elapsed = start.elapsed();
    tracing::info!(
        "Done! Written {} features ({} skipped, {} unreduced, {} windows) in {:.2}s",
        report.written,
        report.skipped,
        report.unreduced,
        report.windows,
        elapsed.as_secs_f64()
    );

    Ok(())
}
