use crate::comments::CommentTreeFetcher;
use crate::discovery::{PostDiscovery, DEFAULT_STRATEGIES};
use crate::engagement;
use crate::http::RedditClient;
use revuai_core::{
    Comment, CoreError, FetchMetadata, FetchResult, FetcherConfig, FilterMode, Post,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Pipeline phases. Transitions are strictly forward; the terminal phase is
/// reached even when every individual fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchPhase {
    Discovering,
    Classifying,
    Fetching,
    Finalized,
}

impl FetchPhase {
    fn as_str(&self) -> &'static str {
        match self {
            FetchPhase::Discovering => "discovering",
            FetchPhase::Classifying => "classifying",
            FetchPhase::Fetching => "fetching",
            FetchPhase::Finalized => "finalized",
        }
    }
}

/// Top-level coordinator: discovery, engagement classification, then a
/// bounded fan-out of comment-tree fetches merged through a dedup map.
#[derive(Debug)]
pub struct MassCommentOrchestrator {
    client: Arc<RedditClient>,
    config: FetcherConfig,
}

impl MassCommentOrchestrator {
    pub fn new(client: Arc<RedditClient>, config: FetcherConfig) -> Self {
        Self { client, config }
    }

    /// Run the full acquisition pipeline for `query`.
    ///
    /// Only total failures propagate: no usable credentials at startup, or
    /// every discovery strategy coming back empty. Partial fetch failures
    /// degrade into a smaller result set, reported through the metadata.
    pub async fn fetch_mass_comments(&self, query: &str) -> Result<FetchResult, CoreError> {
        let started = Instant::now();
        let pool = Arc::clone(self.client.pool());

        if pool.usable_count().await == 0 {
            return Err(CoreError::NoUsableCredentials);
        }

        info!(
            query,
            target = self.config.target_comments,
            accounts = pool.len(),
            phase = FetchPhase::Discovering.as_str(),
            "mass fetch starting"
        );

        let discovery = PostDiscovery::new(Arc::clone(&self.client));
        let posts = discovery.discover(query, &DEFAULT_STRATEGIES).await?;
        let total_posts = posts.len();

        info!(phase = FetchPhase::Classifying.as_str(), posts = total_posts, "discovery complete");
        // Classified on the pre-truncation set so the sample stays
        // representative of the topic, not of our work budget.
        let (mode, profile) = engagement::classify(&posts, &self.config.engagement);

        let budget = post_budget(
            self.config.target_comments,
            self.config.assumed_comments_per_post,
            self.config.post_safety_margin,
        );
        let mut posts = posts;
        posts.truncate(budget);

        info!(
            phase = FetchPhase::Fetching.as_str(),
            mode = mode.as_str(),
            median = profile.median_comment_count,
            posts_to_process = posts.len(),
            "fetching comment trees"
        );

        let dedup = self.fetch_phase(query, posts, mode).await;

        let comments = finalize_comments(dedup, self.config.target_comments);
        let elapsed = started.elapsed().as_secs_f64();
        let metadata = self.build_metadata(query, &comments, total_posts, elapsed, mode, pool.len());

        info!(
            phase = FetchPhase::Finalized.as_str(),
            comments = comments.len(),
            elapsed_secs = elapsed,
            "mass fetch complete"
        );

        Ok(FetchResult { comments, metadata })
    }

    /// Bounded worker fan-out over the post list. Results merge in completion
    /// order; first observation of a comment id wins. Once the dedup map
    /// reaches the target no further posts are submitted, but in-flight
    /// fetches drain rather than being cancelled.
    async fn fetch_phase(
        &self,
        query: &str,
        posts: Vec<Post>,
        mode: FilterMode,
    ) -> HashMap<String, Comment> {
        let pool = self.client.pool();
        let worker_bound = worker_bound(pool.len(), self.config.max_workers);
        let target = self.config.target_comments;
        let min_score = self.config.min_score;

        let fetcher = Arc::new(CommentTreeFetcher::new(Arc::clone(&self.client)));
        let mut tasks: JoinSet<Vec<Comment>> = JoinSet::new();
        let mut dedup: HashMap<String, Comment> = HashMap::new();
        let mut queue = posts.into_iter().enumerate();
        let mut completed = 0usize;

        loop {
            while tasks.len() < worker_bound && dedup.len() < target {
                let Some((index, post)) = queue.next() else {
                    break;
                };
                let fetcher = Arc::clone(&fetcher);
                let query = query.to_string();
                // Seeds the credential rotation; the client falls over to the
                // next account when this one is rate limited.
                let start = index % pool.len();

                tasks.spawn(async move {
                    fetcher.fetch(&post, start, min_score, mode, &query).await
                });
            }

            match tasks.join_next().await {
                Some(Ok(batch)) => {
                    completed += 1;
                    for comment in batch {
                        // First-seen wins, keeping membership and text stable
                        // for a fixed upstream state.
                        dedup.entry(comment.id.clone()).or_insert(comment);
                    }
                    if completed % 10 == 0 {
                        info!(
                            comments = dedup.len(),
                            target,
                            posts_done = completed,
                            "fetch progress"
                        );
                    }
                }
                Some(Err(e)) => {
                    completed += 1;
                    warn!("comment fetch task panicked: {e}");
                }
                None => break,
            }
        }

        dedup
    }

    fn build_metadata(
        &self,
        query: &str,
        comments: &[Comment],
        total_posts: usize,
        elapsed: f64,
        mode: FilterMode,
        credentials_used: usize,
    ) -> FetchMetadata {
        let (average_score, min_score_value, max_score_value) = FetchResult::score_stats(comments);
        let comments_per_second = if elapsed > 0.0 {
            (comments.len() as f64 / elapsed * 100.0).round() / 100.0
        } else {
            0.0
        };

        FetchMetadata {
            query: query.to_string(),
            total_comments: comments.len(),
            total_posts,
            target_comments: self.config.target_comments,
            min_score: self.config.min_score,
            average_score,
            min_score_value,
            max_score_value,
            fetch_time: (elapsed * 100.0).round() / 100.0,
            comments_per_second,
            mode_used: mode,
            credentials_used,
            fetched_at: chrono::Utc::now().to_rfc3339(),
            source: "Reddit API (Multi-Account Optimized)".to_string(),
        }
    }
}

/// How many ranked posts are worth processing for the comment target.
fn post_budget(target_comments: usize, assumed_per_post: usize, safety_margin: usize) -> usize {
    target_comments / assumed_per_post.max(1) + safety_margin
}

/// Worker-pool bound: proportional to credential count, capped globally.
fn worker_bound(credential_count: usize, ceiling: usize) -> usize {
    (credential_count * 4).min(ceiling).max(1)
}

/// Sort by score descending (id ascending tiebreak for reproducibility) and
/// truncate to the target.
fn finalize_comments(dedup: HashMap<String, Comment>, target_comments: usize) -> Vec<Comment> {
    let mut comments: Vec<Comment> = dedup.into_values().collect();
    comments.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    comments.truncate(target_comments);
    comments
}
