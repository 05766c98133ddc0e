use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Reddit API error: {0}")]
    RedditApi(#[from] RedditApiError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("No posts found for query: {query}")]
    NoPostsFound { query: String },

    #[error("No usable credentials remain")]
    NoUsableCredentials,

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug, Clone)]
pub enum RedditApiError {
    #[error("Authentication failed for account {account}: {reason}")]
    AuthenticationFailed { account: usize, reason: String },

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Forbidden access to resource: {resource}")]
    Forbidden { resource: String },

    #[error("Invalid OAuth token")]
    InvalidToken,

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },
}

impl CoreError {
    /// A failure that is skipped and logged rather than aborting the run:
    /// one strategy or one post's fetch, never the whole orchestration.
    pub fn is_transient(&self) -> bool {
        match self {
            CoreError::RedditApi(api) => matches!(
                api,
                RedditApiError::ServerError { .. }
                    | RedditApiError::RequestTimeout
                    | RedditApiError::InvalidResponse { .. }
            ),
            CoreError::Network(_) | CoreError::Serialization(_) => true,
            _ => false,
        }
    }

    /// Credential rejected by upstream. Fatal for that credential only.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            CoreError::RedditApi(
                RedditApiError::AuthenticationFailed { .. } | RedditApiError::InvalidToken
            )
        )
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Environment variable not set: {var_name}")]
    MissingEnvironmentVariable { var_name: String },

    #[error("Account {index} is missing credentials")]
    IncompleteCredential { index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let server = CoreError::RedditApi(RedditApiError::ServerError { status_code: 502 });
        assert!(server.is_transient());

        let timeout = CoreError::RedditApi(RedditApiError::RequestTimeout);
        assert!(timeout.is_transient());

        let auth = CoreError::RedditApi(RedditApiError::AuthenticationFailed {
            account: 0,
            reason: "invalid_grant".to_string(),
        });
        assert!(!auth.is_transient());
        assert!(auth.is_auth_failure());

        let no_posts = CoreError::NoPostsFound {
            query: "Pixel 8".to_string(),
        };
        assert!(!no_posts.is_transient());
    }
}
