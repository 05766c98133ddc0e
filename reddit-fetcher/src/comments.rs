use crate::http::RedditClient;
use crate::models::{RedditCommentData, RedditListing, RedditListingChild, RedditPostData};
use crate::relevance::is_relevant;
use revuai_core::{Comment, CoreError, FilterMode, Post};
use std::sync::Arc;
use tracing::{debug, warn};

const COMMENT_LIMIT: &str = "100";

/// Reply depth caps. Relaxed mode digs one level deeper because shallow
/// threads on low-engagement topics yield too few comments.
const MAX_DEPTH_STRICT: usize = 3;
const MAX_DEPTH_RELAXED: usize = 4;

/// Minimum trimmed body length per mode.
const MIN_BODY_LEN_STRICT: usize = 10;
const MIN_BODY_LEN_RELAXED: usize = 5;

/// Fetches a post's nested comment tree and flattens it into lightweight
/// comment records, applying the per-comment quality gate.
#[derive(Debug)]
pub struct CommentTreeFetcher {
    client: Arc<RedditClient>,
}

impl CommentTreeFetcher {
    pub fn new(client: Arc<RedditClient>) -> Self {
        Self { client }
    }

    /// Fetch and filter the comments under `post`. `start_index` seeds the
    /// credential rotation; a rate-limited account hands the request to the
    /// next one rather than stalling the post.
    ///
    /// A failed fetch for a single post must not abort the orchestration, so
    /// every failure path degrades to an empty list.
    pub async fn fetch(
        &self,
        post: &Post,
        start_index: usize,
        min_score: i64,
        mode: FilterMode,
        query: &str,
    ) -> Vec<Comment> {
        match self.try_fetch(post, start_index, min_score, mode, query).await {
            Ok(comments) => comments,
            Err(e) => {
                warn!(post_id = %post.id, "comment fetch skipped: {e}");
                Vec::new()
            }
        }
    }

    async fn try_fetch(
        &self,
        post: &Post,
        start_index: usize,
        min_score: i64,
        mode: FilterMode,
        query: &str,
    ) -> Result<Vec<Comment>, CoreError> {
        let trimmed = post.permalink.trim_matches('/');
        let path = format!("/{trimmed}.json");

        // The comment endpoint returns a 2-element array:
        // [post listing, comment listing].
        let (post_listing, comment_listing): (
            RedditListing<RedditPostData>,
            RedditListing<RedditCommentData>,
        ) = self
            .client
            .get_json_rotating(
                start_index,
                &path,
                &[("limit", COMMENT_LIMIT), ("sort", "top"), ("raw_json", "1")],
            )
            .await?;

        let post_title = post_listing
            .data
            .children
            .first()
            .map(|child| child.data.title.clone())
            .unwrap_or_else(|| post.title.clone());

        let comments = flatten_comments(
            comment_listing.data.children,
            &post_title,
            min_score,
            mode,
            query,
        );

        debug!(
            post_id = %post.id,
            kept = comments.len(),
            "comment tree flattened"
        );
        Ok(comments)
    }
}

/// Depth-first flatten over an explicit `(node, depth)` stack. A comment that
/// fails the quality gate takes its whole subtree with it, matching the
/// shape of threads where a junk parent rarely shelters good replies.
pub fn flatten_comments(
    roots: Vec<RedditListingChild<RedditCommentData>>,
    post_title: &str,
    min_score: i64,
    mode: FilterMode,
    query: &str,
) -> Vec<Comment> {
    let max_depth = match mode {
        FilterMode::Strict => MAX_DEPTH_STRICT,
        FilterMode::Relaxed => MAX_DEPTH_RELAXED,
    };
    let min_body_len = match mode {
        FilterMode::Strict => MIN_BODY_LEN_STRICT,
        FilterMode::Relaxed => MIN_BODY_LEN_RELAXED,
    };

    let mut kept = Vec::new();
    let mut stack: Vec<(RedditListingChild<RedditCommentData>, usize)> =
        roots.into_iter().rev().map(|c| (c, 0)).collect();

    while let Some((child, depth)) = stack.pop() {
        if child.kind != "t1" {
            continue;
        }
        let node = child.data;
        let body = node.body.trim();

        // Gate order: score, length, placeholder, relevance.
        if node.score < min_score {
            continue;
        }
        // Character count, not bytes; multibyte text must not slip past the
        // length floor.
        if body.chars().count() < min_body_len {
            continue;
        }
        if body == "[deleted]" || body == "[removed]" {
            continue;
        }
        let combined = format!("{body} {post_title}");
        if !is_relevant(&combined, query, mode) {
            continue;
        }

        kept.push(Comment {
            id: node.id.clone(),
            text: body.to_string(),
            score: node.score,
            post_title: post_title.to_string(),
        });

        if depth < max_depth {
            for reply in node.reply_children().into_iter().rev() {
                stack.push((reply, depth + 1));
            }
        }
    }

    kept
}
