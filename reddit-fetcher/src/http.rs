use crate::credentials::CredentialPool;
use crate::rate_limiter::RateLimiter;
use revuai_core::{CoreError, FetcherConfig, RedditApiError};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

/// Authenticated GET against the Reddit API, bound to a credential + limiter
/// pair. Performs no retries: every failure is reported to the caller, which
/// decides whether to fall back to another credential or skip the unit.
#[derive(Debug)]
pub struct RedditClient {
    http_client: reqwest::Client,
    pool: Arc<CredentialPool>,
    limiter: Arc<RateLimiter>,
    api_base: String,
    token_wait_timeout: Duration,
}

impl RedditClient {
    pub fn new(
        pool: Arc<CredentialPool>,
        limiter: Arc<RateLimiter>,
        config: &FetcherConfig,
    ) -> Result<Self, CoreError> {
        Self::with_api_base(pool, limiter, config, REDDIT_API_BASE.to_string())
    }

    /// Client pointed at a non-default API base. Used by tests.
    pub fn with_api_base(
        pool: Arc<CredentialPool>,
        limiter: Arc<RateLimiter>,
        config: &FetcherConfig,
        api_base: String,
    ) -> Result<Self, CoreError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(CoreError::Network)?;

        Ok(Self {
            http_client,
            pool,
            limiter,
            api_base,
            token_wait_timeout: config.token_wait_timeout,
        })
    }

    pub fn pool(&self) -> &Arc<CredentialPool> {
        &self.pool
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Authenticated GET with cross-credential fallback under rate-limit
    /// pressure.
    ///
    /// Starting from `start`, credentials already in limiter cooldown are
    /// deferred to a second pass, and a `RateLimitExceeded` (or an account
    /// rejection, which marks the slot failed) rotates the request to the
    /// next account instead of failing the unit of work. Other errors
    /// surface immediately. Only when every healthy account is limited does
    /// the request wait on a cooling one.
    pub async fn get_json_rotating<T: DeserializeOwned>(
        &self,
        start: usize,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CoreError> {
        let count = self.pool.len();
        let mut cooling = Vec::new();
        let mut last_err: Option<CoreError> = None;

        for offset in 0..count {
            let index = (start + offset) % count;
            if self.pool.is_failed(index).await {
                continue;
            }
            if self.limiter.in_cooldown(index).await {
                cooling.push(index);
                continue;
            }
            match self.get_json(index, path, query).await {
                Err(err) if rotates(&err) => {
                    debug!(account = index, "credential unavailable, rotating: {err}");
                    last_err = Some(err);
                }
                other => return other,
            }
        }

        for index in cooling {
            match self.get_json(index, path, query).await {
                Err(err) if rotates(&err) => last_err = Some(err),
                other => return other,
            }
        }

        Err(last_err.unwrap_or(CoreError::NoUsableCredentials))
    }

    /// Authenticated GET returning the decoded JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        credential_index: usize,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CoreError> {
        if !self
            .limiter
            .await_token(credential_index, self.token_wait_timeout)
            .await
        {
            // No token this round; the caller's credential rotation decides
            // what happens next.
            return Err(CoreError::RedditApi(RedditApiError::RateLimitExceeded {
                retry_after: 0,
            }));
        }

        let token = self.pool.acquire_token(credential_index).await?;
        let url = format!("{}{}", self.api_base, path);

        debug!(account = credential_index, %url, "issuing Reddit API request");
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .header("User-Agent", self.pool.user_agent(credential_index))
            .query(query)
            .send()
            .await
            .map_err(|e| {
                error!(account = credential_index, %url, "network error: {e}");
                if e.is_timeout() {
                    CoreError::RedditApi(RedditApiError::RequestTimeout)
                } else {
                    CoreError::Network(e)
                }
            })?;

        let status = response.status();
        self.limiter
            .note_response(credential_index, status.as_u16(), response.headers())
            .await;

        if !status.is_success() {
            warn!(account = credential_index, %status, %url, "request failed");
            let err = match status.as_u16() {
                429 => {
                    let retry_after = response
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(60);
                    RedditApiError::RateLimitExceeded { retry_after }
                }
                401 => RedditApiError::InvalidToken,
                403 => RedditApiError::Forbidden {
                    resource: path.to_string(),
                },
                code if status.is_server_error() => RedditApiError::ServerError {
                    status_code: code,
                },
                code => RedditApiError::InvalidResponse {
                    details: format!("unexpected status {code} for {path}"),
                },
            };
            return Err(CoreError::RedditApi(err));
        }

        response.json().await.map_err(|e| {
            error!(account = credential_index, %url, "failed to decode response: {e}");
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("failed to decode body for {path}: {e}"),
            })
        })
    }
}

/// Errors worth retrying on another account: a rate-limit signal, or a
/// rejection that has already marked the credential failed.
fn rotates(err: &CoreError) -> bool {
    matches!(
        err,
        CoreError::RedditApi(RedditApiError::RateLimitExceeded { .. })
    ) || err.is_auth_failure()
}
