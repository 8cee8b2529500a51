use std::cmp::Ordering;
use std::collections::HashMap;

use crate::core::models::post::RankedPost;

/// Rounds a reward total to cents, the precision rewards are compared at.
pub fn round_reward(total: f64) -> f64 {
    format!("{:.2}", total).parse().unwrap_or(0.0)
}

pub fn apply_rewards(posts: &mut [RankedPost], totals: &HashMap<String, f64>) {
    for ranked in posts.iter_mut() {
        ranked.rewards = round_reward(totals.get(&ranked.post.id).copied().unwrap_or(0.0));
    }
}

/// Stable re-sort by descending reward; equal rewards keep their query order.
pub fn rank_by_rewards(posts: &mut [RankedPost]) {
    posts.sort_by(|a, b| b.rewards.partial_cmp(&a.rewards).unwrap_or(Ordering::Equal));
}

pub fn highlight(content: &str, stop_words: &[String]) -> String {
    stop_words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .fold(content.to_string(), |acc, word| {
            acc.replace(word, &format!("<span class=\"highlight\">{}</span>", word))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::post::{Approval, Post};
    use chrono::Utc;

    fn ranked(id: &str) -> RankedPost {
        let now = Utc::now();
        RankedPost::new(Post {
            id: id.to_string(),
            thread_id: "t".to_string(),
            user_id: "u".to_string(),
            reply_post_id: None,
            reply_user_id: None,
            comment_post_id: None,
            comment_user_id: None,
            content: String::new(),
            is_first: false,
            is_comment: false,
            approval: Approval::Approved,
            reply_count: 0,
            like_count: 0,
            stop_words: Vec::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            deleted_user_id: None,
        })
    }

    #[test]
    fn rewards_are_rounded_to_cents() {
        assert_eq!(round_reward(5.004), 5.0);
        assert_eq!(round_reward(10.126), 10.13);
        assert_eq!(round_reward(0.0), 0.0);
    }

    #[test]
    fn higher_reward_ranks_first_and_ties_keep_order() {
        let mut posts = vec![ranked("a"), ranked("b"), ranked("c"), ranked("d")];
        let totals = HashMap::from([
            ("a".to_string(), 5.0),
            ("b".to_string(), 10.0),
            ("d".to_string(), 5.0),
        ]);
        apply_rewards(&mut posts, &totals);
        rank_by_rewards(&mut posts);
        let ids: Vec<&str> = posts.iter().map(|p| p.post.id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "d", "c"]);
    }

    #[test]
    fn highlight_wraps_each_stop_word() {
        let out = highlight("buy cheap pills now", &["cheap".to_string(), "pills".to_string()]);
        assert_eq!(
            out,
            "buy <span class=\"highlight\">cheap</span> <span class=\"highlight\">pills</span> now"
        );
    }
}
