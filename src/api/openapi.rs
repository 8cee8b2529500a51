use utoipa::OpenApi;

use crate::{
    api::models::{
        CommentAttributes, CommentSummary, CreateUserRequest, CreateUserResponse, ErrorResponse, LoginRequest,
        LoginResponse, PaginationLinks, PostAttributes, PostListDocument, PostListMeta, PostResource,
        PostResourceAttributes, ThreadDocument,
    },
    core::models::{
        attachment::{Attachment, NewAttachment},
        audit::AppLog,
        category::CategoryNode,
        post::Approval,
        thread::{RedPacket, Thread, ThreadType},
        user::UserSummary,
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::login,
        super::handlers::create_user,
        super::handlers::list_posts,
        super::handlers::get_thread,
        super::handlers::list_thread_categories,
        super::handlers::get_app_logs,
        super::handlers::create_attachment
    ),
    components(schemas(
        CreateUserRequest,
        CreateUserResponse,
        LoginRequest,
        LoginResponse,
        ErrorResponse,
        PostListDocument,
        PostListMeta,
        PaginationLinks,
        PostResource,
        PostResourceAttributes,
        PostAttributes,
        CommentAttributes,
        CommentSummary,
        ThreadDocument,
        Thread,
        ThreadType,
        RedPacket,
        UserSummary,
        Approval,
        CategoryNode,
        AppLog,
        NewAttachment,
        Attachment
    )),
    info(
        title = "Agora API",
        description = "Forum API: post listings, thread resources, category trees and attachments",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/login",
            "/api/users",
            "/api/posts",
            "/api/threads/{thread_id}",
            "/api/categories/thread",
            "/api/logs",
            "/api/attachments",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
