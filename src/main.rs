mod config;
mod details;
mod error;
mod github;
mod server;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// pr-details: serves the open pull requests of a GitHub repository
/// together with the number of commits in each.
#[derive(Parser, Debug)]
#[command(name = "pr-details", version, about)]
struct Cli {
    /// Path to a TOML config file (defaults to ./.pr-details.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overriding config and the PORT env var
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let Some(token) = config.github_token() else {
        error!(
            "a GitHub token is required: set GITHUB_TOKEN or github.token in the config file. \
             See https://docs.github.com/en/rest/overview/resources-in-the-rest-api#rate-limiting"
        );
        std::process::exit(1);
    };

    let api = github::GitHubApi::new(&config.github, token)?;
    debug!(
        api_base_url = %config.github.api_base_url,
        timeout_secs = config.github.timeout_secs,
        max_concurrency = config.github.concurrency_limit(),
        "GitHub client ready"
    );

    let state = server::AppState::new(Arc::new(api), config.github.concurrency_limit());
    server::serve(&config.server, state).await?;

    Ok(())
}
