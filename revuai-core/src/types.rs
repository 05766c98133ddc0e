use serde::{Deserialize, Serialize};

/// Relevance-matching policy, chosen once per run from observed engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Exact phrase or all query terms present.
    Strict,
    /// Exact phrase or a strict majority of query terms present.
    Relaxed,
}

impl FilterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::Strict => "strict",
            FilterMode::Relaxed => "relaxed",
        }
    }
}

/// A discovered discussion thread. Immutable once fetched; discarded after
/// the comment-fetch phase.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub body_text: String,
    pub permalink: String,
    pub comment_count: u32,
    pub created_at: i64,
}

/// Lightweight comment record emitted by tree flattening. Identity is `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub score: i64,
    pub post_title: String,
}

/// Comment-count statistics over the discovered post set. Computed once per
/// orchestration run, before the post list is truncated.
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementProfile {
    pub median_comment_count: f64,
    pub mean_comment_count: f64,
    pub top5_average: f64,
}

/// Terminal output of the pipeline, consumed by the sentiment-analysis stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub comments: Vec<Comment>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchMetadata {
    pub query: String,
    pub total_comments: usize,
    pub total_posts: usize,
    pub target_comments: usize,
    pub min_score: i64,
    pub average_score: i64,
    pub min_score_value: i64,
    pub max_score_value: i64,
    pub fetch_time: f64,
    pub comments_per_second: f64,
    pub mode_used: FilterMode,
    pub credentials_used: usize,
    pub fetched_at: String,
    pub source: String,
}

impl FetchResult {
    /// Score statistics over an already-finalized comment list.
    pub fn score_stats(comments: &[Comment]) -> (i64, i64, i64) {
        if comments.is_empty() {
            return (0, 0, 0);
        }
        let sum: i64 = comments.iter().map(|c| c.score).sum();
        let min = comments.iter().map(|c| c.score).min().unwrap_or(0);
        let max = comments.iter().map(|c| c.score).max().unwrap_or(0);
        let avg = (sum as f64 / comments.len() as f64).round() as i64;
        (avg, min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: &str, score: i64) -> Comment {
        Comment {
            id: id.to_string(),
            text: "text".to_string(),
            score,
            post_title: "title".to_string(),
        }
    }

    #[test]
    fn score_stats_basic() {
        let comments = vec![comment("a", 10), comment("b", 20), comment("c", 3)];
        let (avg, min, max) = FetchResult::score_stats(&comments);
        assert_eq!(avg, 11);
        assert_eq!(min, 3);
        assert_eq!(max, 20);
    }

    #[test]
    fn score_stats_empty() {
        assert_eq!(FetchResult::score_stats(&[]), (0, 0, 0));
    }

    #[test]
    fn metadata_serializes_camel_case() {
        let metadata = FetchMetadata {
            query: "Pixel 8".to_string(),
            total_comments: 2,
            total_posts: 1,
            target_comments: 50,
            min_score: 5,
            average_score: 12,
            min_score_value: 5,
            max_score_value: 19,
            fetch_time: 1.5,
            comments_per_second: 1.33,
            mode_used: FilterMode::Relaxed,
            credentials_used: 2,
            fetched_at: "2024-01-01T00:00:00Z".to_string(),
            source: "Reddit API (Multi-Account Optimized)".to_string(),
        };

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["totalComments"], 2);
        assert_eq!(json["modeUsed"], "relaxed");
        assert_eq!(json["commentsPerSecond"], 1.33);
    }
}
