use revuai_core::{CoreError, Credential, RedditApiError};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

pub const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// A lease is never handed out within this margin of its expiry; the caller
/// gets a freshly exchanged token instead.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct TokenLease {
    bearer_token: String,
    expires_at: Instant,
}

impl TokenLease {
    fn is_valid(&self, now: Instant) -> bool {
        now + TOKEN_EXPIRY_MARGIN < self.expires_at
    }
}

#[derive(Debug, Default)]
struct TokenSlot {
    lease: Option<TokenLease>,
    /// Set when upstream rejects the credential; the account is unusable for
    /// the remainder of the run.
    failed: bool,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
}

/// Holds N account credentials and caches one bearer token per account.
///
/// Each slot has its own lock, held across the password-grant exchange, so
/// concurrent callers for the same credential block until the in-flight
/// exchange completes and then share its result. Unrelated credentials never
/// contend.
#[derive(Debug)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    slots: Vec<Mutex<TokenSlot>>,
    http_client: reqwest::Client,
    auth_url: String,
}

impl CredentialPool {
    pub fn new(credentials: Vec<Credential>, http_timeout: Duration) -> Result<Self, CoreError> {
        Self::with_auth_url(credentials, http_timeout, REDDIT_AUTH_URL.to_string())
    }

    /// Pool pointed at a non-default auth endpoint. Used by tests.
    pub fn with_auth_url(
        credentials: Vec<Credential>,
        http_timeout: Duration,
        auth_url: String,
    ) -> Result<Self, CoreError> {
        if credentials.is_empty() {
            return Err(CoreError::NoUsableCredentials);
        }

        let slots = credentials.iter().map(|_| Mutex::default()).collect();
        let http_client = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .map_err(CoreError::Network)?;

        Ok(Self {
            credentials,
            slots,
            http_client,
            auth_url,
        })
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn user_agent(&self, credential_index: usize) -> &str {
        &self.credentials[credential_index].user_agent
    }

    pub async fn is_failed(&self, credential_index: usize) -> bool {
        self.slots[credential_index].lock().await.failed
    }

    /// Number of accounts not yet rejected by upstream.
    pub async fn usable_count(&self) -> usize {
        let mut usable = 0;
        for slot in &self.slots {
            if !slot.lock().await.failed {
                usable += 1;
            }
        }
        usable
    }

    /// Return a valid, non-expiring-soon bearer token for the credential,
    /// exchanging a fresh one synchronously when the cached lease is stale.
    pub async fn acquire_token(&self, credential_index: usize) -> Result<String, CoreError> {
        let mut slot = self.slots[credential_index].lock().await;

        if slot.failed {
            return Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                account: credential_index,
                reason: "credential previously rejected".to_string(),
            }));
        }

        let now = Instant::now();
        if let Some(lease) = &slot.lease {
            if lease.is_valid(now) {
                return Ok(lease.bearer_token.clone());
            }
            debug!(account = credential_index, "cached token near expiry, refreshing");
        }

        let lease = self.exchange(credential_index, &mut slot).await?;
        let token = lease.bearer_token.clone();
        slot.lease = Some(lease);
        Ok(token)
    }

    /// Password-grant exchange against the upstream auth endpoint. Marks the
    /// slot failed when the rejection is definitive; network and server
    /// errors leave the slot usable for a later attempt.
    async fn exchange(
        &self,
        credential_index: usize,
        slot: &mut TokenSlot,
    ) -> Result<TokenLease, CoreError> {
        let credential = &self.credentials[credential_index];

        info!(account = credential_index, "exchanging password grant for token");
        let response = self
            .http_client
            .post(&self.auth_url)
            .basic_auth(&credential.client_id, Some(&credential.client_secret))
            .header("User-Agent", &credential.user_agent)
            .form(&[
                ("grant_type", "password"),
                ("username", credential.username.as_str()),
                ("password", credential.password.as_str()),
            ])
            .send()
            .await
            .map_err(CoreError::Network)?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            slot.failed = true;
            error!(account = credential_index, %status, "credential rejected by upstream");
            return Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                account: credential_index,
                reason: format!("auth endpoint returned {status}"),
            }));
        }
        if !status.is_success() {
            return Err(CoreError::RedditApi(RedditApiError::ServerError {
                status_code: status.as_u16(),
            }));
        }

        let body: AccessTokenResponse = response.json().await.map_err(|e| {
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("failed to parse token response: {e}"),
            })
        })?;

        // Reddit reports bad account passwords as 200 + an error field.
        match (body.access_token, body.expires_in) {
            (Some(token), Some(expires_in)) => {
                debug!(
                    account = credential_index,
                    expires_in, "token exchange succeeded"
                );
                Ok(TokenLease {
                    bearer_token: token,
                    expires_at: Instant::now() + Duration::from_secs(expires_in),
                })
            }
            _ => {
                slot.failed = true;
                let reason = body.error.unwrap_or_else(|| "missing access_token".to_string());
                error!(account = credential_index, %reason, "credential rejected by upstream");
                Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                    account: credential_index,
                    reason,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(n: usize) -> Credential {
        Credential {
            client_id: format!("id{n}"),
            client_secret: format!("secret{n}"),
            username: format!("user{n}"),
            password: format!("pass{n}"),
            user_agent: "revuai-test/1.0".to_string(),
        }
    }

    #[test]
    fn empty_pool_is_rejected() {
        let result = CredentialPool::new(vec![], Duration::from_secs(5));
        assert!(matches!(result, Err(CoreError::NoUsableCredentials)));
    }

    #[test]
    fn lease_validity_respects_margin() {
        let now = Instant::now();
        let fresh = TokenLease {
            bearer_token: "tok".to_string(),
            expires_at: now + Duration::from_secs(3600),
        };
        assert!(fresh.is_valid(now));

        let near_expiry = TokenLease {
            bearer_token: "tok".to_string(),
            expires_at: now + Duration::from_secs(120),
        };
        assert!(!near_expiry.is_valid(now));
    }

    #[tokio::test]
    async fn usable_count_tracks_failures() {
        let pool =
            CredentialPool::new(vec![credential(0), credential(1)], Duration::from_secs(5))
                .unwrap();
        assert_eq!(pool.usable_count().await, 2);

        pool.slots[0].lock().await.failed = true;
        assert_eq!(pool.usable_count().await, 1);
        assert!(pool.is_failed(0).await);

        let err = pool.acquire_token(0).await.unwrap_err();
        assert!(err.is_auth_failure());
    }
}
