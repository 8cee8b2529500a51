use std::collections::HashMap;

use crate::core::errors::ForumError;
use crate::core::listing::PostQuery;
use crate::core::models::{
    attachment::Attachment,
    category::Category,
    order::{Order, OrderType},
    post::Post,
    thread::{RedPacket, Thread, ThreadReward},
    user::User,
};
use async_trait::async_trait;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Returns `None` when the username is already taken.
    async fn create_user_if_not_exists(&self, user: User) -> Result<Option<User>, ForumError>;
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, ForumError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, ForumError>;
    async fn get_users(&self, user_ids: &[String]) -> Result<Vec<User>, ForumError>;

    async fn save_thread(&self, thread: Thread) -> Result<(), ForumError>;
    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>, ForumError>;
    /// Bumps the view counter without touching `updated_at`; returns the new count.
    async fn increment_view_count(&self, thread_id: &str) -> Result<u64, ForumError>;
    /// Category of each known thread in `thread_ids`.
    async fn thread_categories(&self, thread_ids: &[String]) -> Result<HashMap<String, String>, ForumError>;

    async fn save_post(&self, post: Post) -> Result<(), ForumError>;
    async fn query_posts(&self, query: &PostQuery) -> Result<Vec<Post>, ForumError>;
    /// Counts matches of `query`, ignoring its offset and limit.
    async fn count_posts(&self, query: &PostQuery) -> Result<u64, ForumError>;
    /// Newest approved comments replying to each of `post_ids`, at most `per_post` each.
    async fn latest_comments(
        &self,
        post_ids: &[String],
        per_post: usize,
    ) -> Result<HashMap<String, Vec<Post>>, ForumError>;

    async fn save_order(&self, order: Order) -> Result<(), ForumError>;
    /// Sum of paid reward orders per post.
    async fn post_reward_totals(&self, post_ids: &[String]) -> Result<HashMap<String, f64>, ForumError>;
    /// Paid, non-anonymous orders of the given types, newest first.
    async fn paid_orders(&self, thread_id: &str, types: &[OrderType]) -> Result<Vec<Order>, ForumError>;

    async fn save_thread_reward(&self, reward: ThreadReward) -> Result<(), ForumError>;
    async fn get_thread_reward(&self, thread_id: &str) -> Result<Option<ThreadReward>, ForumError>;
    async fn save_red_packet(&self, red_packet: RedPacket) -> Result<(), ForumError>;
    async fn get_red_packet(&self, thread_id: &str) -> Result<Option<RedPacket>, ForumError>;

    async fn save_attachment(&self, attachment: Attachment) -> Result<(), ForumError>;
    async fn get_attachment(&self, attachment_id: &str) -> Result<Option<Attachment>, ForumError>;

    async fn save_category(&self, category: Category) -> Result<(), ForumError>;
    /// Top-level categories first, then by `sort`.
    async fn list_categories(&self) -> Result<Vec<Category>, ForumError>;
}

pub mod in_memory;
