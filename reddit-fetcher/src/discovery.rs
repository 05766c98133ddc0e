use crate::http::RedditClient;
use crate::models::{RedditListing, RedditPostData};
use crate::relevance::is_relevant;
use revuai_core::{CoreError, FilterMode, Post};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// One search request shape: a sort order crossed with a time range.
#[derive(Debug, Clone, Copy)]
pub struct SearchStrategy {
    pub sort: &'static str,
    pub time_range: &'static str,
}

/// The four strategies run per discovery pass. Distinct sort×range
/// combinations pull in different slices of the upstream index and reduce
/// single-ranking bias.
pub const DEFAULT_STRATEGIES: [SearchStrategy; 4] = [
    SearchStrategy { sort: "top", time_range: "month" },
    SearchStrategy { sort: "top", time_range: "year" },
    SearchStrategy { sort: "relevance", time_range: "all" },
    SearchStrategy { sort: "comments", time_range: "month" },
];

const SEARCH_LIMIT: &str = "100";

/// Runs the search strategies concurrently, each bound to a different
/// credential, and merges their results into one ranked, deduplicated list.
#[derive(Debug)]
pub struct PostDiscovery {
    client: Arc<RedditClient>,
}

impl PostDiscovery {
    pub fn new(client: Arc<RedditClient>) -> Self {
        Self { client }
    }

    /// Discover candidate posts for `query`.
    ///
    /// Individual strategy failures are logged and dropped; the whole pass
    /// fails only when the merged result is empty.
    pub async fn discover(
        &self,
        query: &str,
        strategies: &[SearchStrategy],
    ) -> Result<Vec<Post>, CoreError> {
        let mut tasks: JoinSet<Result<Vec<Post>, CoreError>> = JoinSet::new();

        for (index, strategy) in strategies.iter().copied().enumerate() {
            let client = Arc::clone(&self.client);
            let query = query.to_string();
            let start = index % client.pool().len();

            tasks.spawn(async move { search_one(&client, start, &query, strategy).await });
        }

        let mut merged: HashMap<String, Post> = HashMap::new();
        let mut failures = 0usize;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(posts)) => {
                    // Posts are near-immutable, so last discovery winning a
                    // duplicate id is harmless.
                    for post in posts {
                        merged.insert(post.id.clone(), post);
                    }
                }
                Ok(Err(e)) => {
                    failures += 1;
                    warn!("search strategy failed: {e}");
                }
                Err(e) => {
                    failures += 1;
                    warn!("search task panicked: {e}");
                }
            }
        }

        if merged.is_empty() {
            warn!(query, failures, "discovery produced no posts");
            return Err(CoreError::NoPostsFound {
                query: query.to_string(),
            });
        }

        let mut posts: Vec<Post> = merged.into_values().collect();
        // Rank by engagement; id tiebreak keeps the order reproducible.
        posts.sort_by(|a, b| {
            b.comment_count
                .cmp(&a.comment_count)
                .then_with(|| a.id.cmp(&b.id))
        });

        info!(
            query,
            posts = posts.len(),
            failed_strategies = failures,
            "discovery merged unique text posts"
        );
        Ok(posts)
    }
}

async fn search_one(
    client: &RedditClient,
    start_index: usize,
    query: &str,
    strategy: SearchStrategy,
) -> Result<Vec<Post>, CoreError> {
    let listing: RedditListing<RedditPostData> = client
        .get_json_rotating(
            start_index,
            "/search.json",
            &[
                ("q", query),
                ("limit", SEARCH_LIMIT),
                ("sort", strategy.sort),
                ("t", strategy.time_range),
                ("raw_json", "1"),
            ],
        )
        .await?;

    let posts = listing
        .data
        .children
        .into_iter()
        .map(|child| child.data)
        .filter(|data| keep_post(data, query))
        .map(Post::from)
        .collect::<Vec<_>>();

    info!(
        sort = strategy.sort,
        time_range = strategy.time_range,
        posts = posts.len(),
        "search strategy completed"
    );
    Ok(posts)
}

/// Discovery-phase gate: text-bearing, non-media posts whose title+body pass
/// the strict relevance check. Discovery always filters strictly so the
/// engagement sample downstream stays representative.
fn keep_post(data: &RedditPostData, query: &str) -> bool {
    if data.is_media() || !data.has_substantive_text() {
        return false;
    }
    let combined = format!("{} {}", data.title, data.selftext);
    is_relevant(&combined, query, FilterMode::Strict)
}
