use revuai_core::{EngagementProfile, EngagementThresholds, FilterMode, Post};
use tracing::info;

/// Decide filter strictness from the comment counts of discovered posts.
///
/// Run once per orchestration, on the pre-truncation post set and always from
/// a strict-mode discovery sample, so relaxed discovery can never inflate the
/// apparent engagement it is reacting to.
pub fn classify(posts: &[Post], thresholds: &EngagementThresholds) -> (FilterMode, EngagementProfile) {
    let profile = profile(posts);

    let relaxed = profile.median_comment_count < thresholds.median_floor
        || profile.mean_comment_count < thresholds.mean_floor
        || profile.top5_average < thresholds.top5_floor;

    let mode = if relaxed {
        FilterMode::Relaxed
    } else {
        FilterMode::Strict
    };

    info!(
        mode = mode.as_str(),
        median = profile.median_comment_count,
        mean = profile.mean_comment_count,
        top5 = profile.top5_average,
        "engagement classified"
    );

    (mode, profile)
}

fn profile(posts: &[Post]) -> EngagementProfile {
    if posts.is_empty() {
        // No sample to judge; err on the recall side.
        return EngagementProfile {
            median_comment_count: 0.0,
            mean_comment_count: 0.0,
            top5_average: 0.0,
        };
    }

    let mut counts: Vec<f64> = posts.iter().map(|p| p.comment_count as f64).collect();
    counts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = counts.len();
    let median = if n % 2 == 1 {
        counts[n / 2]
    } else {
        (counts[n / 2 - 1] + counts[n / 2]) / 2.0
    };

    let mean = counts.iter().sum::<f64>() / n as f64;

    let top = counts.iter().rev().take(5);
    let top_len = top.len();
    let top5_average = top.sum::<f64>() / top_len as f64;

    EngagementProfile {
        median_comment_count: median,
        mean_comment_count: mean,
        top5_average,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, comment_count: u32) -> Post {
        Post {
            id: id.to_string(),
            title: format!("post {id}"),
            body_text: String::new(),
            permalink: format!("/r/test/comments/{id}/post"),
            comment_count,
            created_at: 0,
        }
    }

    fn posts(counts: &[u32]) -> Vec<Post> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &c)| post(&format!("p{i}"), c))
            .collect()
    }

    #[test]
    fn low_median_triggers_relaxed() {
        // median 4 < 5 regardless of the other stats.
        let set = posts(&[4, 4, 4, 200, 300]);
        let (mode, profile) = classify(&set, &EngagementThresholds::default());
        assert_eq!(profile.median_comment_count, 4.0);
        assert_eq!(mode, FilterMode::Relaxed);
    }

    #[test]
    fn healthy_stats_stay_strict() {
        // median 11, mean > 10, top5 average > 8.
        let set = posts(&[6, 9, 11, 13, 16]);
        let (mode, profile) = classify(&set, &EngagementThresholds::default());
        assert_eq!(profile.median_comment_count, 11.0);
        assert_eq!(profile.mean_comment_count, 11.0);
        assert_eq!(mode, FilterMode::Strict);
    }

    #[test]
    fn uniformly_low_counts_trigger_relaxed() {
        let set = posts(&[7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7]);
        let (mode, profile) = classify(&set, &EngagementThresholds::default());
        assert_eq!(profile.top5_average, 7.0);
        assert_eq!(mode, FilterMode::Relaxed);
    }

    #[test]
    fn fewer_than_five_posts_average_what_exists() {
        let set = posts(&[40, 5, 2]);
        let (_, profile) = classify(&set, &EngagementThresholds::default());
        let expected = (40.0 + 5.0 + 2.0) / 3.0;
        assert!((profile.top5_average - expected).abs() < 1e-9);
        assert_eq!(profile.median_comment_count, 5.0);
    }

    #[test]
    fn even_count_median_averages_middle_pair() {
        let set = posts(&[2, 4, 6, 8]);
        let (_, profile) = classify(&set, &EngagementThresholds::default());
        assert_eq!(profile.median_comment_count, 5.0);
    }

    #[test]
    fn empty_set_is_relaxed() {
        let (mode, _) = classify(&[], &EngagementThresholds::default());
        assert_eq!(mode, FilterMode::Relaxed);
    }
}
