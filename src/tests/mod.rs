mod category_tests;
mod listing_tests;

use crate::core::listing::ListingParams;
use crate::core::models::{
    order::{Order, OrderStatus, OrderType},
    post::{Approval, Post},
    thread::{Thread, ThreadSource, ThreadType},
    user::{Grant, User, member_grants},
};
use crate::core::services::ForumService;
use crate::infrastructure::cache::in_memory::InMemoryCache;
use crate::infrastructure::logging::in_memory::InMemoryLogging;
use crate::infrastructure::storage::{Storage, in_memory::InMemoryStorage};
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

pub type TestService = ForumService<InMemoryLogging, InMemoryStorage, InMemoryCache>;

pub fn create_test_service() -> TestService {
    let storage = InMemoryStorage::new();
    let logging = InMemoryLogging::new();
    let cache = InMemoryCache::new();
    // Lowest bcrypt cost keeps hashing fast in tests.
    ForumService::new(storage, logging, cache, "test-secret".to_string()).with_password_cost(4)
}

pub fn params(pairs: &[(&str, &str)]) -> ListingParams {
    let raw = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    ListingParams::parse(raw).unwrap()
}

pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + Duration::seconds(seconds)
}

pub fn user(username: &str, grants: Vec<Grant>) -> User {
    User {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        password: String::new(),
        grants,
        created_at: Utc::now(),
    }
}

pub async fn add_member(service: &TestService, username: &str) -> User {
    add_user(service, user(username, member_grants())).await
}

pub async fn add_user(service: &TestService, user: User) -> User {
    service.storage().create_user_if_not_exists(user).await.unwrap().unwrap()
}

pub fn thread(user_id: &str, category_id: &str) -> Thread {
    Thread {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        category_id: category_id.to_string(),
        title: "A thread".to_string(),
        thread_type: ThreadType::Text,
        source: ThreadSource::OnSite,
        is_approved: true,
        is_draft: false,
        view_count: 0,
        post_count: 0,
        created_at: at(0),
        updated_at: at(0),
        deleted_at: None,
    }
}

pub fn post(thread_id: &str, user_id: &str, content: &str, created_at: DateTime<Utc>) -> Post {
    Post {
        id: Uuid::new_v4().to_string(),
        thread_id: thread_id.to_string(),
        user_id: user_id.to_string(),
        reply_post_id: None,
        reply_user_id: None,
        comment_post_id: None,
        comment_user_id: None,
        content: content.to_string(),
        is_first: false,
        is_comment: false,
        approval: Approval::Approved,
        reply_count: 0,
        like_count: 0,
        stop_words: Vec::new(),
        created_at,
        updated_at: created_at,
        deleted_at: None,
        deleted_user_id: None,
    }
}

pub async fn save_post(service: &TestService, post: Post) -> Post {
    service.storage().save_post(post.clone()).await.unwrap();
    post
}

pub async fn save_thread(service: &TestService, thread: Thread) -> Thread {
    service.storage().save_thread(thread.clone()).await.unwrap();
    thread
}

pub fn paid_order(thread_id: &str, post_id: Option<&str>, user_id: &str, amount: f64, order_type: OrderType) -> Order {
    Order {
        id: Uuid::new_v4().to_string(),
        thread_id: thread_id.to_string(),
        post_id: post_id.map(str::to_string),
        user_id: user_id.to_string(),
        amount,
        order_type,
        status: OrderStatus::Paid,
        is_anonymous: false,
        created_at: at(0),
    }
}

pub async fn reward(service: &TestService, post: &Post, amount: f64) {
    service
        .storage()
        .save_order(paid_order(&post.thread_id, Some(&post.id), "payer", amount, OrderType::Reward))
        .await
        .unwrap();
}
