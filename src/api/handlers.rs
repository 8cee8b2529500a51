use crate::{
    api::models::*,
    core::{
        errors::ForumError,
        listing::{DeviceClass, ListingParams, PageRequest, YesNo},
        models::{
            attachment::{Attachment, NewAttachment},
            audit::AppLog,
            category::CategoryNode,
            user::Actor,
        },
        services::{ForumService, ThreadRequest},
    },
    infrastructure::{
        cache::in_memory::InMemoryCache, logging::in_memory::InMemoryLogging, storage::in_memory::InMemoryStorage,
    },
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, post},
};
use http::header;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub type SharedService = Arc<ForumService<InMemoryLogging, InMemoryStorage, InMemoryCache>>;

/// Resolves an optional bearer token into the request's [`Actor`].
/// Requests without an Authorization header proceed as guests.
async fn auth_middleware(
    State(service): State<SharedService>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let token = match req.headers().get(header::AUTHORIZATION) {
        None => None,
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| ForumError::Unauthorized("Invalid Authorization header".to_string()))?;
            Some(
                value
                    .strip_prefix("Bearer ")
                    .ok_or_else(|| ForumError::Unauthorized("Invalid Authorization header".to_string()))?
                    .to_string(),
            )
        }
    };

    let actor = service.resolve_actor(token.as_deref()).await?;
    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

fn device_of(headers: &HeaderMap) -> DeviceClass {
    DeviceClass::from_user_agent(headers.get(header::USER_AGENT).and_then(|h| h.to_str().ok()))
}

// Define API routes
pub fn api_routes(service: SharedService) -> Router {
    let actor_routes = Router::new()
        .route("/posts", get(list_posts))
        .route("/threads/{thread_id}", get(get_thread))
        .route("/categories/thread", get(list_thread_categories))
        .route("/logs", get(get_app_logs))
        .route("/attachments", post(create_attachment))
        .route_layer(middleware::from_fn_with_state(service.clone(), auth_middleware));

    Router::new()
        .route("/login", post(login))
        .route("/users", post(create_user))
        .merge(actor_routes)
        .with_state(service)
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub(crate) async fn login(
    State(service): State<SharedService>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let token = service.authenticate(&req.username, &req.password).await?;
    Ok(Json(LoginResponse { token }))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User registered", body = CreateUserResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 409, description = "Username already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub(crate) async fn create_user(
    State(service): State<SharedService>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreateUserResponse>), ApiError> {
    let user = service.register(&req.username, &req.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            id: user.id,
            username: user.username,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/posts",
    params(
        ("filter[thread]" = Option<String>, Query, description = "Only posts of this thread"),
        ("filter[isComment]" = Option<String>, Query, description = "`yes` for comments, `no` for replies"),
        ("filter[isDeleted]" = Option<String>, Query, description = "`yes` or `no`"),
        ("filter[isApproved]" = Option<String>, Query, description = "0 unapproved, 1 approved, 2 ignored"),
        ("filter[q]" = Option<String>, Query, description = "Content search"),
        ("sort" = Option<String>, Query, description = "Comma separated sort keys, `-` prefix for descending"),
        ("include" = Option<String>, Query, description = "Comma separated relations"),
        ("page[number]" = Option<u64>, Query, description = "1-based page number"),
        ("page[limit]" = Option<u64>, Query, description = "Page size, 0 for unbounded")
    ),
    responses(
        (status = 200, description = "Posts page", body = PostListDocument),
        (status = 400, description = "Invalid parameter", body = ErrorResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security((), ("Bearer" = []))
)]
pub(crate) async fn list_posts(
    State(service): State<SharedService>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<PostListDocument>, ApiError> {
    let params = ListingParams::parse(query.into_iter().collect::<BTreeMap<_, _>>())?;
    let listing = service.list_posts(&actor, &params, device_of(&headers)).await?;
    Ok(Json(PostListDocument::render("/api/posts", listing)))
}

#[utoipa::path(
    get,
    path = "/api/threads/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "ID of the thread"),
        ("include" = Option<String>, Query, description = "Extra relations, merged with the defaults"),
        ("filter[isDeleted]" = Option<String>, Query, description = "`yes` or `no` for the thread's posts"),
        ("stopViewCount" = Option<bool>, Query, description = "Do not count this read as a view"),
        ("page[number]" = Option<u64>, Query, description = "Page of the thread's posts"),
        ("page[limit]" = Option<u64>, Query, description = "Posts per page")
    ),
    responses(
        (status = 200, description = "Thread retrieved", body = ThreadDocument),
        (status = 400, description = "Invalid parameter", body = ErrorResponse),
        (status = 403, description = "Posts of this thread are not viewable", body = ErrorResponse),
        (status = 404, description = "Thread not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security((), ("Bearer" = []))
)]
pub(crate) async fn get_thread(
    State(service): State<SharedService>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Path(thread_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<ThreadDocument>, ApiError> {
    let get = |key: &str| query.get(key).map(String::as_str);
    let request = ThreadRequest {
        page: PageRequest::parse(get("page[number]"), get("page[offset]"), get("page[limit]"))?,
        is_deleted: get("filter[isDeleted]")
            .map(|v| YesNo::parse("isDeleted", v))
            .transpose()?,
        stop_view_count: get("stopViewCount").is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        ..Default::default()
    }
    .with_include(get("include"))?;

    let resource = service
        .get_thread(&actor, &thread_id, &request, device_of(&headers))
        .await?;
    Ok(Json(ThreadDocument::from(resource)))
}

#[utoipa::path(
    get,
    path = "/api/categories/thread",
    params(
        ("threadId" = Option<String>, Query, description = "Thread whose edit rights to evaluate")
    ),
    responses(
        (status = 200, description = "Category tree", body = Vec<CategoryNode>),
        (status = 403, description = "Guests cannot list categories", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn list_thread_categories(
    State(service): State<SharedService>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ThreadCategoriesQuery>,
) -> Result<Json<Vec<CategoryNode>>, ApiError> {
    let tree = service
        .list_thread_categories(&actor, query.thread_id.as_deref())
        .await?;
    Ok(Json(tree))
}

#[utoipa::path(
    get,
    path = "/api/logs",
    responses(
        (status = 200, description = "Application logs", body = Vec<AppLog>),
        (status = 401, description = "Login required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn get_app_logs(
    State(service): State<SharedService>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<AppLog>>, ApiError> {
    let logs = service.get_app_logs(&actor).await?;
    Ok(Json(logs))
}

#[utoipa::path(
    post,
    path = "/api/attachments",
    request_body = NewAttachment,
    responses(
        (status = 201, description = "Attachment recorded", body = Attachment),
        (status = 400, description = "Invalid name, extension or size", body = ErrorResponse),
        (status = 401, description = "Login required", body = ErrorResponse),
        (status = 403, description = "Attachment type not allowed", body = ErrorResponse),
        (status = 422, description = "Name did not pass review", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn create_attachment(
    State(service): State<SharedService>,
    Extension(actor): Extension<Actor>,
    Json(upload): Json<NewAttachment>,
) -> Result<(StatusCode, Json<Attachment>), ApiError> {
    let attachment = service.create_attachment(&actor, upload).await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}
