//! Demo content for a freshly started in-memory server.

use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::core::errors::ForumError;
use crate::core::models::{
    category::Category,
    order::{Order, OrderStatus, OrderType},
    post::{Approval, Post},
    thread::{RedPacket, Thread, ThreadSource, ThreadType},
    user::{User, member_grants},
};
use crate::infrastructure::storage::Storage;

fn category(id: &str, name: &str, parent_id: Option<&str>, sort: i32) -> Category {
    Category {
        id: id.to_string(),
        name: name.to_string(),
        description: format!("{} discussions", name),
        icon: String::new(),
        thread_count: 0,
        parent_id: parent_id.map(str::to_string),
        sort,
    }
}

/// Seeds categories, one thread with replies, a reward and a red packet.
/// Returns the id of the seeded thread.
pub async fn seed<S: Storage>(storage: &S) -> Result<String, ForumError> {
    storage.save_category(category("1", "General", None, 0)).await?;
    storage.save_category(category("2", "Announcements", Some("1"), 0)).await?;
    storage.save_category(category("3", "Support", None, 1)).await?;

    let author = User {
        id: Uuid::new_v4().to_string(),
        username: "demo".to_string(),
        // Not a valid bcrypt hash, so the demo account cannot log in.
        password: String::new(),
        grants: member_grants(),
        created_at: Utc::now(),
    };
    let author = storage
        .create_user_if_not_exists(author)
        .await?
        .ok_or_else(|| ForumError::UsernameTaken("demo".to_string()))?;

    let now = Utc::now();
    let thread_id = Uuid::new_v4().to_string();
    storage
        .save_thread(Thread {
            id: thread_id.clone(),
            user_id: author.id.clone(),
            category_id: "1".to_string(),
            title: "Welcome to the forum".to_string(),
            thread_type: ThreadType::Text,
            source: ThreadSource::OnSite,
            is_approved: true,
            is_draft: false,
            view_count: 0,
            post_count: 4,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
        .await?;

    let contents = [
        "Welcome! Introduce yourself below.",
        "Hello from the first reply.",
        "Glad to be here.",
        "Thanks for setting this up.",
    ];
    let mut post_ids = Vec::new();
    for (i, content) in contents.iter().enumerate() {
        let id = Uuid::new_v4().to_string();
        let created_at = now + Duration::seconds(i as i64);
        storage
            .save_post(Post {
                id: id.clone(),
                thread_id: thread_id.clone(),
                user_id: author.id.clone(),
                reply_post_id: None,
                reply_user_id: None,
                comment_post_id: None,
                comment_user_id: None,
                content: content.to_string(),
                is_first: i == 0,
                is_comment: false,
                approval: Approval::Approved,
                reply_count: 0,
                like_count: 0,
                stop_words: Vec::new(),
                created_at,
                updated_at: created_at,
                deleted_at: None,
                deleted_user_id: None,
            })
            .await?;
        post_ids.push(id);
    }

    if let Some(rewarded) = post_ids.last() {
        storage
            .save_order(Order {
                id: Uuid::new_v4().to_string(),
                thread_id: thread_id.clone(),
                post_id: Some(rewarded.clone()),
                user_id: author.id.clone(),
                amount: 5.0,
                order_type: OrderType::Reward,
                status: OrderStatus::Paid,
                is_anonymous: false,
                created_at: now,
            })
            .await?;
    }

    storage
        .save_red_packet(RedPacket {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.clone(),
            amount: 10.0,
            number: 5,
            remain_amount: 10.0,
            remain_number: 5,
        })
        .await?;

    info!(thread_id = %thread_id, "Seeded demo forum");
    Ok(thread_id)
}
