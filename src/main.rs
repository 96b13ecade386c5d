//! gridcalc command-line host.
//!
//! Evaluates single formulas, checks formula text against the validity gate
//! and recalculates CSV or JSON sheets. Logs go to stderr, filtered by
//! `RUST_LOG` (default `warn`).

use std::io;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gridcalc::presentation::{Args, run};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let stdout = io::stdout();
    run(args, &mut stdout.lock())
}
