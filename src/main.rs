use reddit_fetcher::{
    CredentialPool, MassCommentOrchestrator, RateLimitConfig, RateLimiter, RedditClient,
};
use revuai_core::{credentials_from_env, CoreError, FetcherConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), CoreError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "revuai=info,reddit_fetcher=info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let query = args.next().ok_or_else(|| CoreError::Internal {
        message: "usage: revuai <query> [output.json]".to_string(),
    })?;
    let output_path = args.next();

    let config = FetcherConfig::from_env()?;
    let credentials = credentials_from_env()?;
    tracing::info!(
        %query,
        accounts = credentials.len(),
        target = config.target_comments,
        "starting mass comment fetch"
    );

    let pool = Arc::new(CredentialPool::new(credentials, config.http_timeout)?);
    let limiter = Arc::new(RateLimiter::new(
        RateLimitConfig::reddit_oauth(config.requests_per_minute, config.burst_allowance),
        pool.len(),
    ));
    let client = Arc::new(RedditClient::new(pool, limiter, &config)?);

    let orchestrator = MassCommentOrchestrator::new(client, config);
    let result = orchestrator.fetch_mass_comments(&query).await?;

    let json = serde_json::to_string_pretty(&result)?;
    match output_path {
        Some(path) => {
            std::fs::write(&path, json)?;
            tracing::info!(
                %path,
                comments = result.metadata.total_comments,
                "result written"
            );
        }
        None => println!("{json}"),
    }

    Ok(())
}
