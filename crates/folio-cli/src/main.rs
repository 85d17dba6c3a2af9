// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio — command-line entry point.
//
// Logs go to stderr (filter via RUST_LOG, default "info") so that stdout
// carries only recognised text and command results.

mod cli;

use clap::Parser;
use folio_core::human_errors::humanize_error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    if let Err(err) = cli::execute(cli).await {
        tracing::error!(error = %err, kind = ?err.kind(), "command failed");
        let human = humanize_error(&err);
        eprintln!("Error: {}", human.message);
        eprintln!("{}", human.suggestion);
        std::process::exit(1);
    }
}
