use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Length a comment summary is cut to before `SUMMARY_END_WITH` is appended.
pub const SUMMARY_LENGTH: usize = 100;
pub const SUMMARY_END_WITH: &str = "...";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Approval {
    Unapproved,
    Approved,
    Ignored,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub thread_id: String,
    pub user_id: String,
    pub reply_post_id: Option<String>,
    pub reply_user_id: Option<String>,
    pub comment_post_id: Option<String>,
    pub comment_user_id: Option<String>,
    pub content: String,
    pub is_first: bool,
    pub is_comment: bool,
    pub approval: Approval,
    pub reply_count: u64,
    pub like_count: u64,
    #[serde(default)]
    pub stop_words: Vec<String>,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
    #[schema(value_type = Option<String>)]
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub deleted_user_id: Option<String>,
}

impl Post {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_approved(&self) -> bool {
        self.approval == Approval::Approved
    }

    /// Content cut down for comment previews.
    pub fn summary(&self) -> String {
        if self.content.chars().count() > SUMMARY_LENGTH {
            let mut cut: String = self.content.chars().take(SUMMARY_LENGTH).collect();
            cut.push_str(SUMMARY_END_WITH);
            cut
        } else {
            self.content.clone()
        }
    }
}

/// A post with its reward total attached. The reward is derived at read time
/// and never written back to storage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RankedPost {
    pub post: Post,
    pub rewards: f64,
    #[serde(default)]
    pub last_three_comments: Option<Vec<Post>>,
}

impl RankedPost {
    pub fn new(post: Post) -> Self {
        RankedPost {
            post,
            rewards: 0.0,
            last_three_comments: None,
        }
    }
}
