use crate::error::ConfigError;
use std::env;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "RevuAI/2.0 by RevuAI Team";

/// One set of upstream account authentication material. Immutable after load.
#[derive(Debug, Clone)]
pub struct Credential {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

/// Thresholds for deciding that a topic is niche enough to need relaxed
/// relevance matching. Any condition true switches the run to relaxed mode.
#[derive(Debug, Clone)]
pub struct EngagementThresholds {
    pub median_floor: f64,
    pub mean_floor: f64,
    pub top5_floor: f64,
}

impl Default for EngagementThresholds {
    fn default() -> Self {
        Self {
            median_floor: 5.0,
            mean_floor: 10.0,
            top5_floor: 8.0,
        }
    }
}

/// Tunables for the acquisition pipeline. Defaults mirror the production
/// deployment; each numeric field can be overridden via `REVUAI_*` env vars
/// (timeouts as whole seconds).
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub target_comments: usize,
    pub min_score: i64,
    /// Per-credential requests-per-minute ceiling.
    pub requests_per_minute: u32,
    /// Token-bucket burst capacity per credential.
    pub burst_allowance: u32,
    /// Global cap on parallel comment-fetch workers.
    pub max_workers: usize,
    /// Assumed comment yield per post, used to size the post budget.
    pub assumed_comments_per_post: usize,
    /// Extra posts requested beyond the estimated need.
    pub post_safety_margin: usize,
    /// Connect/read timeout for every upstream HTTP call.
    pub http_timeout: Duration,
    /// How long a worker will wait for a rate-limit token before giving up
    /// on this round.
    pub token_wait_timeout: Duration,
    pub engagement: EngagementThresholds,
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            target_comments: 10_000,
            min_score: 5,
            requests_per_minute: 120,
            burst_allowance: 10,
            max_workers: 16,
            assumed_comments_per_post: 30,
            post_safety_margin: 100,
            http_timeout: Duration::from_secs(15),
            token_wait_timeout: Duration::from_secs(30),
            engagement: EngagementThresholds::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetcherConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = parse_env("REVUAI_TARGET_COMMENTS")? {
            config.target_comments = v;
        }
        if let Some(v) = parse_env("REVUAI_MIN_SCORE")? {
            config.min_score = v;
        }
        if let Some(v) = parse_env("REVUAI_REQUESTS_PER_MINUTE")? {
            config.requests_per_minute = v;
        }
        if let Some(v) = parse_env("REVUAI_BURST_ALLOWANCE")? {
            config.burst_allowance = v;
        }
        if let Some(v) = parse_env("REVUAI_MAX_WORKERS")? {
            config.max_workers = v;
        }
        if let Some(v) = parse_env("REVUAI_ASSUMED_COMMENTS_PER_POST")? {
            config.assumed_comments_per_post = v;
        }
        if let Some(v) = parse_env("REVUAI_POST_SAFETY_MARGIN")? {
            config.post_safety_margin = v;
        }
        if let Some(v) = parse_env::<u64>("REVUAI_HTTP_TIMEOUT_SECS")? {
            config.http_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_env::<u64>("REVUAI_TOKEN_WAIT_SECS")? {
            config.token_wait_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_env("REVUAI_MEDIAN_FLOOR")? {
            config.engagement.median_floor = v;
        }
        if let Some(v) = parse_env("REVUAI_MEAN_FLOOR")? {
            config.engagement.mean_floor = v;
        }
        if let Some(v) = parse_env("REVUAI_TOP5_FLOOR")? {
            config.engagement.top5_floor = v;
        }

        Ok(config)
    }
}

fn parse_env<T: std::str::FromStr>(var: &str) -> Result<Option<T>, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: var.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}

/// Load credential sets from the environment. The first account uses the
/// unsuffixed names (`REDDIT_CLIENT_ID`, ...); additional accounts use
/// numbered suffixes (`REDDIT_CLIENT_ID_2`, `REDDIT_CLIENT_ID_3`, ...).
pub fn credentials_from_env() -> Result<Vec<Credential>, ConfigError> {
    let mut credentials = Vec::new();

    for index in 1usize.. {
        let suffix = if index == 1 {
            String::new()
        } else {
            format!("_{index}")
        };

        let fields = [
            env::var(format!("REDDIT_CLIENT_ID{suffix}")).ok(),
            env::var(format!("REDDIT_CLIENT_SECRET{suffix}")).ok(),
            env::var(format!("REDDIT_USERNAME{suffix}")).ok(),
            env::var(format!("REDDIT_PASSWORD{suffix}")).ok(),
        ];

        match fields {
            [Some(client_id), Some(client_secret), Some(username), Some(password)] => {
                credentials.push(Credential {
                    client_id,
                    client_secret,
                    username,
                    password,
                    user_agent: DEFAULT_USER_AGENT.to_string(),
                });
            }
            [None, None, None, None] => break,
            _ => return Err(ConfigError::IncompleteCredential { index: index - 1 }),
        }
    }

    if credentials.is_empty() {
        return Err(ConfigError::MissingEnvironmentVariable {
            var_name: "REDDIT_CLIENT_ID".to_string(),
        });
    }

    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = FetcherConfig::default();
        assert_eq!(config.target_comments, 10_000);
        assert_eq!(config.min_score, 5);
        assert_eq!(config.requests_per_minute, 120);
        assert_eq!(config.max_workers, 16);
        assert_eq!(config.http_timeout, Duration::from_secs(15));
    }

    #[test]
    fn every_numeric_field_reads_from_env() {
        let vars = [
            ("REVUAI_TARGET_COMMENTS", "500"),
            ("REVUAI_MIN_SCORE", "3"),
            ("REVUAI_REQUESTS_PER_MINUTE", "90"),
            ("REVUAI_BURST_ALLOWANCE", "5"),
            ("REVUAI_MAX_WORKERS", "4"),
            ("REVUAI_ASSUMED_COMMENTS_PER_POST", "25"),
            ("REVUAI_POST_SAFETY_MARGIN", "50"),
            ("REVUAI_HTTP_TIMEOUT_SECS", "20"),
            ("REVUAI_TOKEN_WAIT_SECS", "10"),
            ("REVUAI_MEDIAN_FLOOR", "6.5"),
            ("REVUAI_MEAN_FLOOR", "12"),
            ("REVUAI_TOP5_FLOOR", "9"),
        ];
        for (name, value) in vars {
            env::set_var(name, value);
        }

        let config = FetcherConfig::from_env().unwrap();
        for (name, _) in vars {
            env::remove_var(name);
        }

        assert_eq!(config.target_comments, 500);
        assert_eq!(config.min_score, 3);
        assert_eq!(config.requests_per_minute, 90);
        assert_eq!(config.burst_allowance, 5);
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.assumed_comments_per_post, 25);
        assert_eq!(config.post_safety_margin, 50);
        assert_eq!(config.http_timeout, Duration::from_secs(20));
        assert_eq!(config.token_wait_timeout, Duration::from_secs(10));
        assert_eq!(config.engagement.median_floor, 6.5);
        assert_eq!(config.engagement.mean_floor, 12.0);
        assert_eq!(config.engagement.top5_floor, 9.0);
    }

    #[test]
    fn default_engagement_thresholds() {
        let thresholds = EngagementThresholds::default();
        assert_eq!(thresholds.median_floor, 5.0);
        assert_eq!(thresholds.mean_floor, 10.0);
        assert_eq!(thresholds.top5_floor, 8.0);
    }
}
