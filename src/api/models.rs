use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::core::errors::ForumError;
use crate::core::listing::{PageMeta, PostView};
use crate::core::models::{
    post::{Approval, Post},
    thread::{RedPacket, Thread},
    user::UserSummary,
};
use crate::core::services::{PostItem, PostListing, ThreadResource};

// Request structs for JSON payloads
#[derive(Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct CreateUserResponse {
    pub id: String,
    pub username: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThreadCategoriesQuery {
    pub thread_id: Option<String>,
}

// Error response struct
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostAttributes {
    pub thread_id: String,
    pub user_id: String,
    pub reply_post_id: Option<String>,
    pub reply_user_id: Option<String>,
    pub content: String,
    pub reply_count: u64,
    pub like_count: u64,
    pub is_first: bool,
    pub is_comment: bool,
    pub approval: Approval,
    pub rewards: f64,
    #[schema(value_type = String)]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[schema(value_type = String)]
    pub updated_at: chrono::DateTime<chrono::Utc>,
    #[schema(value_type = Option<String>)]
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub can_edit: bool,
    pub can_hide: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_three_comments: Option<Vec<CommentSummary>>,
}

/// Attributes of a post rendered as a comment (`filter[isComment]=yes`).
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentAttributes {
    pub thread_id: String,
    pub user_id: String,
    pub reply_post_id: Option<String>,
    pub reply_user_id: Option<String>,
    pub comment_post_id: Option<String>,
    pub comment_user_id: Option<String>,
    pub content: String,
    pub like_count: u64,
    pub approval: Approval,
    pub rewards: f64,
    #[schema(value_type = String)]
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub can_edit: bool,
    pub can_hide: bool,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentSummary {
    pub id: String,
    pub user_id: String,
    pub content: String,
    #[schema(value_type = String)]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Post> for CommentSummary {
    fn from(post: &Post) -> Self {
        CommentSummary {
            id: post.id.clone(),
            user_id: post.user_id.clone(),
            content: post.content.clone(),
            updated_at: post.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(untagged)]
pub enum PostResourceAttributes {
    Standard(PostAttributes),
    Comment(CommentAttributes),
}

#[derive(Serialize, ToSchema)]
pub struct PostResource {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub attributes: PostResourceAttributes,
}

impl PostResource {
    pub fn render(item: PostItem, view: PostView) -> Self {
        let PostItem {
            ranked,
            can_edit,
            can_hide,
        } = item;
        let post = ranked.post;
        let attributes = match view {
            PostView::Standard => PostResourceAttributes::Standard(PostAttributes {
                last_three_comments: ranked
                    .last_three_comments
                    .map(|comments| comments.iter().map(CommentSummary::from).collect()),
                thread_id: post.thread_id,
                user_id: post.user_id,
                reply_post_id: post.reply_post_id,
                reply_user_id: post.reply_user_id,
                content: post.content,
                reply_count: post.reply_count,
                like_count: post.like_count,
                is_first: post.is_first,
                is_comment: post.is_comment,
                approval: post.approval,
                rewards: ranked.rewards,
                created_at: post.created_at,
                updated_at: post.updated_at,
                deleted_at: post.deleted_at,
                can_edit,
                can_hide,
            }),
            PostView::Comment => PostResourceAttributes::Comment(CommentAttributes {
                thread_id: post.thread_id,
                user_id: post.user_id,
                reply_post_id: post.reply_post_id,
                reply_user_id: post.reply_user_id,
                comment_post_id: post.comment_post_id,
                comment_user_id: post.comment_user_id,
                content: post.content,
                like_count: post.like_count,
                approval: post.approval,
                rewards: ranked.rewards,
                created_at: post.created_at,
                can_edit,
                can_hide,
            }),
        };
        PostResource {
            kind: "posts".to_string(),
            id: post.id,
            attributes,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, PartialEq)]
pub struct PaginationLinks {
    pub first: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl PaginationLinks {
    pub fn build(base: &str, meta: &PageMeta) -> Self {
        let link = |offset: u64| {
            let mut params: BTreeMap<String, String> = meta
                .params
                .iter()
                .filter(|(k, _)| k.as_str() != "page[number]" && k.as_str() != "page[offset]")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            if offset > 0 {
                params.insert("page[offset]".to_string(), offset.to_string());
            }
            if params.is_empty() {
                return base.to_string();
            }
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params.iter())
                .finish();
            format!("{}?{}", base, query)
        };

        let (prev, next) = match meta.limit {
            Some(limit) if limit > 0 => {
                let prev = (meta.offset > 0).then(|| link(meta.offset.saturating_sub(limit)));
                let next = meta
                    .offset
                    .checked_add(limit)
                    .filter(|end| meta.count.is_some_and(|count| *end < count))
                    .map(link);
                (prev, next)
            }
            _ => (None, None),
        };

        PaginationLinks {
            first: link(0),
            prev,
            next,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostListMeta {
    pub post_count: Option<u64>,
    pub page_count: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct PostListDocument {
    pub data: Vec<PostResource>,
    pub links: PaginationLinks,
    pub meta: PostListMeta,
}

impl PostListDocument {
    pub fn render(base: &str, listing: PostListing) -> Self {
        let PostListing { items, meta, view, .. } = listing;
        PostListDocument {
            links: PaginationLinks::build(base, &meta),
            meta: PostListMeta {
                post_count: meta.count,
                page_count: meta.page_count(),
            },
            data: items.into_iter().map(|item| PostResource::render(item, view)).collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThreadDocument {
    pub thread: Thread,
    pub can_view_posts: bool,
    pub can_reply: bool,
    pub can_edit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<Vec<PostResource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewarded_users: Option<Vec<UserSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_users: Option<Vec<UserSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onlookers: Option<Vec<UserSummary>>,
    pub red_packet: Option<RedPacket>,
}

impl From<ThreadResource> for ThreadDocument {
    fn from(resource: ThreadResource) -> Self {
        ThreadDocument {
            thread: resource.thread,
            can_view_posts: resource.can_view_posts,
            can_reply: resource.can_reply,
            can_edit: resource.can_edit,
            posts: resource.posts.map(|items| {
                items
                    .into_iter()
                    .map(|item| PostResource::render(item, PostView::Standard))
                    .collect()
            }),
            rewarded_users: resource.rewarded_users,
            paid_users: resource.paid_users,
            onlookers: resource.onlookers,
            red_packet: resource.red_packet,
        }
    }
}

// Newtype wrapper for ForumError to implement IntoResponse
pub struct ApiError(pub ForumError);

impl From<ForumError> for ApiError {
    fn from(err: ForumError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self.0 {
            ForumError::MissingUsername => (StatusCode::BAD_REQUEST, "Username is required".to_string()),
            ForumError::UsernameTaken(name) => (StatusCode::CONFLICT, format!("Username {} already registered", name)),
            ForumError::ThreadNotFound(id) => (StatusCode::NOT_FOUND, format!("Thread {} not found", id)),
            ForumError::PermissionDenied(msg) => (StatusCode::FORBIDDEN, format!("Permission denied: {}", msg)),
            ForumError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, format!("Unauthorized: {}", msg)),
            ForumError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid username or password".to_string()),
            ForumError::InvalidParameter(name, detail) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid parameter {}: {}", name, detail.description),
            ),
            ForumError::InvalidInput(field, detail) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid input for {}: {}", field, detail.description),
            ),
            ForumError::CensorNotPassed(field) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Content of {} did not pass review", field),
            ),
            ForumError::InternalServerError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal server error: {}", msg),
            ),
            ForumError::LoggingError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Logging error: {}", msg)),
            ForumError::CacheError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Cache error: {}", msg)),
        };
        if status.is_server_error() {
            tracing::error!("{}", error_message);
        }
        (status, Json(ErrorResponse { error: error_message })).into_response()
    }
}
