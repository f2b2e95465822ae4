use anyhow::Context;
use background_service::{BackgroundService, ServiceConfig};
use flairwatch_core::{AppConfig, ErrorExt};
use reddit_client::{RedditClient, RedditOAuth2Config};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "flairwatch=info,flairwatch_core=info,reddit_client=info,notifier=info,background_service=info";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    tracing::info!("Starting flairwatch {}", env!("CARGO_PKG_VERSION"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            e.log_error();
            tracing::error!("{}", e.user_friendly_message());
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!(
        environment = %config.environment,
        subreddit = %config.subreddit,
        keyword = %config.flair_keyword,
        "Configuration loaded"
    );

    let reddit = RedditClient::new(
        RedditOAuth2Config::new(
            config.reddit.client_id.clone(),
            config.reddit.client_secret.clone(),
            config.reddit.user_agent.clone(),
        ),
        config.subreddit.clone(),
    )
    .context("failed to set up the Reddit client")?;

    let notifier = notifier::from_url(&config.notify_url).with_context(|| {
        format!(
            "failed to set up notifications from {}",
            config.environment.notify_url_var()
        )
    })?;

    let service = BackgroundService::new(ServiceConfig::from(&config), Arc::new(reddit), notifier);
    if !service.run().await {
        tracing::warn!("Exited without a final save");
    }

    tracing::info!("flairwatch stopped");
    Ok(())
}
