// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use agent_wallet::cli::{error_report, execute, Cli};
use agent_wallet::config::Config;
use agent_wallet::error::AgentWalletError;
use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn fail(err: anyhow::Error) -> ! {
    let report = error_report(&err);
    match serde_json::to_string(&report) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("{}: {}", report.error, report.message),
    }
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            std::process::exit(0);
        }
        Err(e) => fail(AgentWalletError::usage(e.to_string().trim().to_string()).into()),
    };

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => fail(e.into()),
    };

    if let Err(e) = execute(cli, config).await {
        fail(e);
    }
}
