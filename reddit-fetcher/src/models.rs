use revuai_core::Post;
use serde::{Deserialize, Serialize};

/// Generic Reddit listing envelope: `{"kind": "Listing", "data": {"children": [...]}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    #[serde(default)]
    pub kind: Option<String>,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    #[serde(default = "Vec::new")]
    pub children: Vec<RedditListingChild<T>>,
    #[serde(default)]
    pub after: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

/// Search-result post payload. Only the fields the pipeline reads; everything
/// defaulted because search results omit fields freely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub num_comments: u32,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub is_video: bool,
    #[serde(default)]
    pub post_hint: Option<String>,
}

/// Minimum title length for a post with an empty body to count as textual.
const MIN_BARE_TITLE_LEN: usize = 20;

impl RedditPostData {
    /// Primarily non-text media: videos, image posts, hosted/rich video.
    pub fn is_media(&self) -> bool {
        if self.is_video {
            return true;
        }
        matches!(
            self.post_hint.as_deref(),
            Some("image") | Some("hosted:video") | Some("rich:video")
        )
    }

    /// A post must carry either a self-text body or a reasonably long title
    /// to be worth fetching comments for.
    pub fn has_substantive_text(&self) -> bool {
        !self.selftext.trim().is_empty() || self.title.len() >= MIN_BARE_TITLE_LEN
    }
}

impl From<RedditPostData> for Post {
    fn from(data: RedditPostData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            body_text: data.selftext,
            permalink: data.permalink,
            comment_count: data.num_comments,
            created_at: data.created_utc as i64,
        }
    }
}

/// Comment node payload. `replies` is either an empty string or a nested
/// listing of the same shape, so it stays raw until the flattener descends.
#[derive(Debug, Clone, Deserialize)]
pub struct RedditCommentData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub replies: serde_json::Value,
}

impl RedditCommentData {
    /// Children of the reply listing, or empty when `replies` is `""`/absent.
    pub fn reply_children(&self) -> Vec<RedditListingChild<RedditCommentData>> {
        match serde_json::from_value::<RedditListing<RedditCommentData>>(self.replies.clone()) {
            Ok(listing) => listing.data.children,
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(title: &str, selftext: &str) -> RedditPostData {
        RedditPostData {
            id: "abc".to_string(),
            title: title.to_string(),
            selftext: selftext.to_string(),
            permalink: "/r/test/comments/abc/post".to_string(),
            num_comments: 10,
            created_utc: 1_700_000_000.0,
            is_video: false,
            post_hint: None,
        }
    }

    #[test]
    fn media_detection() {
        let mut p = post("Some video", "");
        p.is_video = true;
        assert!(p.is_media());

        let mut p = post("Some image", "");
        p.post_hint = Some("image".to_string());
        assert!(p.is_media());

        let p = post("Plain discussion thread about phones", "body");
        assert!(!p.is_media());
    }

    #[test]
    fn substantive_text_thresholds() {
        assert!(post("short", "has a body").has_substantive_text());
        assert!(post("a title long enough to stand alone", "").has_substantive_text());
        assert!(!post("short", "").has_substantive_text());
        assert!(!post("short", "   ").has_substantive_text());
    }

    #[test]
    fn search_listing_parses() {
        let raw = serde_json::json!({
            "kind": "Listing",
            "data": {
                "children": [
                    {"kind": "t3", "data": {"id": "p1", "title": "A post about the Pixel 8 camera", "num_comments": 42}}
                ],
                "after": null
            }
        });

        let listing: RedditListing<RedditPostData> = serde_json::from_value(raw).unwrap();
        assert_eq!(listing.data.children.len(), 1);
        let post: Post = listing.data.children[0].data.clone().into();
        assert_eq!(post.id, "p1");
        assert_eq!(post.comment_count, 42);
    }

    #[test]
    fn empty_string_replies_yield_no_children() {
        let comment: RedditCommentData = serde_json::from_value(serde_json::json!({
            "id": "c1", "body": "hello", "score": 7, "replies": ""
        }))
        .unwrap();
        assert!(comment.reply_children().is_empty());
    }

    #[test]
    fn nested_replies_parse() {
        let comment: RedditCommentData = serde_json::from_value(serde_json::json!({
            "id": "c1",
            "body": "parent",
            "score": 7,
            "replies": {
                "kind": "Listing",
                "data": {"children": [
                    {"kind": "t1", "data": {"id": "c2", "body": "child", "score": 3, "replies": ""}}
                ]}
            }
        }))
        .unwrap();

        let children = comment.reply_children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].data.id, "c2");
    }
}
