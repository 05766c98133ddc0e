pub mod comments;
pub mod credentials;
pub mod discovery;
pub mod engagement;
pub mod http;
pub mod models;
pub mod orchestrator;
pub mod rate_limiter;
pub mod relevance;

pub use comments::CommentTreeFetcher;
pub use credentials::CredentialPool;
pub use discovery::{PostDiscovery, SearchStrategy, DEFAULT_STRATEGIES};
pub use http::RedditClient;
pub use orchestrator::MassCommentOrchestrator;
pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use relevance::is_relevant;
