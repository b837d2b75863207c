use anyhow::Context;
use clap::Parser;

use hospital_prices::{cli, query, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = cli::Args::parse();

    match args.cmd {
        cli::Command::Serve(cmd) => server::run(cmd).await.context("serve failed"),
        cli::Command::Options(cmd) => query::run_options(cmd).context("options failed"),
        cli::Command::Query(cmd) => query::run(cmd).context("query failed"),
    }
}
