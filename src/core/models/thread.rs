use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::user::UserSummary;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ThreadType {
    Text,
    Long,
    Video,
    Image,
    Audio,
    Question,
    Goods,
}

/// Where a thread was first published. Stored and serialized as its number.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "u8", into = "u8")]
pub enum ThreadSource {
    #[default]
    OnSite,
    Weibo,
    Tieba,
    Douban,
}

impl From<ThreadSource> for u8 {
    fn from(source: ThreadSource) -> Self {
        match source {
            ThreadSource::OnSite => 0,
            ThreadSource::Weibo => 1,
            ThreadSource::Tieba => 2,
            ThreadSource::Douban => 3,
        }
    }
}

impl TryFrom<u8> for ThreadSource {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ThreadSource::OnSite),
            1 => Ok(ThreadSource::Weibo),
            2 => Ok(ThreadSource::Tieba),
            3 => Ok(ThreadSource::Douban),
            other => Err(format!("unknown thread source {}", other)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub user_id: String,
    pub category_id: String,
    pub title: String,
    pub thread_type: ThreadType,
    /// 0 on-site, 1 Weibo, 2 Tieba, 3 Douban.
    #[serde(default)]
    #[schema(value_type = u8, example = 0)]
    pub source: ThreadSource,
    pub is_approved: bool,
    pub is_draft: bool,
    pub view_count: u64,
    pub post_count: u64,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
    #[schema(value_type = Option<String>)]
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Thread {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RewardKind {
    /// Reward paid out to answers of a question thread.
    Question,
    Other,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThreadReward {
    pub thread_id: String,
    pub kind: RewardKind,
    pub amount: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RedPacket {
    pub id: String,
    pub thread_id: String,
    pub amount: f64,
    pub number: u32,
    pub remain_amount: f64,
    pub remain_number: u32,
}

/// Actor-independent part of a thread resource, as kept in the cache.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    pub thread: Thread,
    pub rewarded_users: Option<Vec<UserSummary>>,
    pub paid_users: Option<Vec<UserSummary>>,
    pub onlookers: Option<Vec<UserSummary>>,
    pub red_packet: Option<RedPacket>,
}
