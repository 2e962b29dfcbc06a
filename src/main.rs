use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use check_shepherd::config::BotConfig;
use check_shepherd::github::OctocrabClient;
use check_shepherd::reconcile::BatchDriver;
use check_shepherd::types::PrNumber;

/// CI shepherd bot: reconciles pull-request check state and triggers builds.
#[derive(Debug, Parser)]
#[command(name = "check-shepherd", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Reconcile only this PR. Without it, every open PR is reconciled once.
    #[arg(long)]
    pr: Option<u64>,

    /// Environment variable holding the API token.
    #[arg(long, default_value = "GITHUB_TOKEN")]
    token_env: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "check_shepherd=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match BotConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let token = match std::env::var(&cli.token_env) {
        Ok(token) => token,
        Err(_) => {
            tracing::error!(var = %cli.token_env, "API token variable is not set");
            return ExitCode::FAILURE;
        }
    };

    let client = match OctocrabClient::from_token(token, config.repo.id()) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "failed to build API client");
            return ExitCode::FAILURE;
        }
    };

    let driver = BatchDriver::new(&config, client);
    let summary = match cli.pr {
        Some(number) => driver.run(&[PrNumber(number)]).await,
        None => match driver.run_all().await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(error = %e, "failed to list open PRs");
                return ExitCode::FAILURE;
            }
        },
    };

    tracing::info!(
        reconciled = summary.reconciled.len(),
        skipped = summary.skipped.len(),
        failed = summary.failed.len(),
        "batch complete"
    );

    if summary.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
