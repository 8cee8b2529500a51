use crate::auth::jwt::JwtService;
use crate::constants::{
    ATTACHMENT_CREATED, ATTACHMENT_MAX_SIZE, ATTACHMENT_NAME_MAX_LENGTH, LAST_COMMENTS_PER_POST, LISTING_CACHE_TTL,
    PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH, USER_LOGGED_IN, USER_REGISTERED, USERNAME_MAX_LENGTH,
};
use crate::core::censor::Censor;
use crate::core::errors::{FieldError, ForumError};
use crate::core::listing::{
    DeviceClass, ListingParams, PageMeta, PageRequest, PostPage, PostPredicate, PostQuery, PostSortField, PostView,
    SortKey, Visibility, YesNo, deleted_state_predicate, parse_include,
};
use crate::core::models::{
    attachment::{Attachment, NewAttachment},
    audit::AppLog,
    category::{Category, CategoryNode},
    order::OrderType,
    post::RankedPost,
    thread::{RedPacket, RewardKind, Thread, ThreadSnapshot},
    user::{Ability, Actor, User, UserSummary, member_grants},
};
use crate::core::ranking::{apply_rewards, highlight, rank_by_rewards};
use crate::infrastructure::cache::{Cache, cache_keys};
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::storage::Storage;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const THREAD_DEFAULT_INCLUDES: &[&str] = &[
    "firstPost",
    "threadVideo",
    "threadAudio",
    "posts",
    "posts.user",
    "posts.replyUser",
    "posts.commentUser",
    "posts.thread",
    "posts.images",
    "user",
    "firstPost.images",
    "firstPost.attachments",
    "firstPost.postGoods",
];

pub const THREAD_OPTIONAL_INCLUDES: &[&str] = &[
    "user.groups",
    "user.groups.permissionWithoutCategories",
    "category",
    "firstPost.likedUsers",
    "posts.likedUsers",
    "rewardedUsers",
    "paidUsers",
    "posts.mentionUsers",
    "firstPost.mentionUsers",
    "topic",
    "question",
    "question.beUser",
    "question.beUser.groups",
    "question.images",
    "onlookers",
];

/// A post as returned to one actor: the shared ranked post plus what this
/// actor may do with it.
#[derive(Clone, Debug)]
pub struct PostItem {
    pub ranked: RankedPost,
    pub can_edit: bool,
    pub can_hide: bool,
}

#[derive(Clone, Debug)]
pub struct PostListing {
    pub items: Vec<PostItem>,
    pub meta: PageMeta,
    pub view: PostView,
    pub from_cache: bool,
}

/// Options of a thread resource read.
#[derive(Clone, Debug, Default)]
pub struct ThreadRequest {
    pub include: Vec<String>,
    pub page: PageRequest,
    pub is_deleted: Option<YesNo>,
    pub stop_view_count: bool,
}

impl ThreadRequest {
    /// Merges requested relations into the default set, rejecting unknown ones.
    pub fn with_include(mut self, raw: Option<&str>) -> Result<Self, ForumError> {
        let allowed: Vec<&str> = THREAD_DEFAULT_INCLUDES
            .iter()
            .chain(THREAD_OPTIONAL_INCLUDES)
            .copied()
            .collect();
        let mut include: Vec<String> = THREAD_DEFAULT_INCLUDES.iter().map(|s| s.to_string()).collect();
        for relation in parse_include(raw, &allowed)? {
            if !include.contains(&relation) {
                include.push(relation);
            }
        }
        self.include = include;
        Ok(self)
    }

    fn includes(&self, relation: &str) -> bool {
        self.include.iter().any(|i| i == relation)
    }

    fn wants_posts(&self) -> bool {
        self.include.iter().any(|i| i == "posts" || i.starts_with("posts."))
    }
}

#[derive(Clone, Debug)]
pub struct ThreadResource {
    pub thread: Thread,
    pub can_view_posts: bool,
    pub can_reply: bool,
    pub can_edit: bool,
    pub posts: Option<Vec<PostItem>>,
    pub rewarded_users: Option<Vec<UserSummary>>,
    pub paid_users: Option<Vec<UserSummary>>,
    pub onlookers: Option<Vec<UserSummary>>,
    pub red_packet: Option<RedPacket>,
    pub from_cache: bool,
}

pub struct ForumService<L: LoggingService, S: Storage, C: Cache> {
    storage: S,
    logging: L,
    cache: C,
    jwt_service: JwtService,
    password_cost: u32,
    censor: Censor,
}

impl<L: LoggingService, S: Storage, C: Cache> ForumService<L, S, C> {
    pub fn new(storage: S, logging: L, cache: C, jwt_secret: String) -> Self {
        ForumService {
            storage,
            logging,
            cache,
            jwt_service: JwtService::new(jwt_secret),
            password_cost: bcrypt::DEFAULT_COST,
            censor: Censor::default(),
        }
    }

    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    pub fn with_censor_words<I, W>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: AsRef<str>,
    {
        self.censor = Censor::new(words);
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    fn validate_string_input(&self, field: &str, value: &str, max_length: usize) -> Result<(), ForumError> {
        if value.trim().is_empty() {
            return Err(ForumError::InvalidInput(
                field.to_string(),
                FieldError::new(field, format!("Invalid {}", field), format!("{} cannot be empty", field)),
            ));
        }
        if value.chars().count() > max_length {
            return Err(ForumError::InvalidInput(
                field.to_string(),
                FieldError::new(
                    field,
                    format!("{} Too Long", field),
                    format!("{} cannot exceed {} characters", field, max_length),
                ),
            ));
        }
        if value.chars().any(|c| c.is_control() || "<>{}[]".contains(c)) {
            return Err(ForumError::InvalidInput(
                field.to_string(),
                FieldError::new(
                    field,
                    format!("Invalid {}", field),
                    format!("{} contains invalid characters", field),
                ),
            ));
        }
        Ok(())
    }

    // USERS

    pub async fn register(&self, username: &str, password: &str) -> Result<User, ForumError> {
        if username.trim().is_empty() {
            return Err(ForumError::MissingUsername);
        }
        self.validate_string_input("username", username, USERNAME_MAX_LENGTH)?;
        self.censor.check("username", username)?;
        if password.len() < PASSWORD_MIN_LENGTH || password.len() > PASSWORD_MAX_LENGTH {
            return Err(ForumError::InvalidInput(
                "password".to_string(),
                FieldError::new(
                    "password",
                    "Invalid password",
                    format!(
                        "Password must be between {} and {} bytes",
                        PASSWORD_MIN_LENGTH, PASSWORD_MAX_LENGTH
                    ),
                ),
            ));
        }

        let hashed = bcrypt::hash(password, self.password_cost)
            .map_err(|e| ForumError::InternalServerError(format!("Password hashing error: {}", e)))?;
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.trim().to_string(),
            password: hashed,
            grants: member_grants(),
            created_at: Utc::now(),
        };

        let created = self
            .storage
            .create_user_if_not_exists(user)
            .await?
            .ok_or_else(|| ForumError::UsernameTaken(username.trim().to_string()))?;
        info!(user_id = %created.id, "Registered user {}", created.username);
        self.logging
            .log_action(
                USER_REGISTERED,
                json!({ "user_id": created.id, "username": created.username }),
                Some(created.id.as_str()),
            )
            .await?;
        Ok(created)
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> Result<String, ForumError> {
        let user = self
            .storage
            .get_user_by_username(username)
            .await?
            .ok_or(ForumError::InvalidCredentials)?;

        let verified = bcrypt::verify(password, &user.password)
            .map_err(|e| ForumError::InternalServerError(format!("Password verification error: {}", e)))?;
        if !verified {
            warn!("Failed login for {}", username);
            return Err(ForumError::InvalidCredentials);
        }

        let token = self.jwt_service.generate_token(&user.id, &user.username)?;
        self.logging
            .log_action(USER_LOGGED_IN, json!({ "user_id": user.id }), Some(user.id.as_str()))
            .await?;
        Ok(token)
    }

    /// Resolves the actor behind an optional bearer token. No token means guest.
    pub async fn resolve_actor(&self, token: Option<&str>) -> Result<Actor, ForumError> {
        let Some(token) = token else {
            return Ok(Actor::guest());
        };
        let claims = self.jwt_service.validate_token(token)?;
        let user = self
            .storage
            .get_user(&claims.sub)
            .await?
            .ok_or_else(|| ForumError::Unauthorized(format!("User {} no longer exists", claims.sub)))?;
        Ok(Actor::user(&user))
    }

    pub async fn get_app_logs(&self, actor: &Actor) -> Result<Vec<AppLog>, ForumError> {
        if actor.is_guest() {
            return Err(ForumError::Unauthorized("Login required".to_string()));
        }
        self.logging.get_logs().await
    }

    // CACHE

    /// Reads and decodes a cached value. Backend and decoding failures count as misses.
    async fn read_cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get_raw(key).await {
            Ok(Some(blob)) => match serde_json::from_str(&blob) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key, "Discarding unreadable cache entry: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, "Cache read failed: {}", e);
                None
            }
        }
    }

    async fn write_cached<T: Serialize>(&self, key: &str, value: &T) {
        let blob = match serde_json::to_string(value) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(key, "Cache serialization failed: {}", e);
                return;
            }
        };
        if let Err(e) = self.cache.put_raw(key, blob, LISTING_CACHE_TTL).await {
            warn!(key, "Cache write failed: {}", e);
        }
    }

    // POSTS

    pub async fn list_posts(
        &self,
        actor: &Actor,
        params: &ListingParams,
        device: DeviceClass,
    ) -> Result<PostListing, ForumError> {
        let cache_key = self.post_listing_cache_key(params, device).await?;

        if let Some(key) = cache_key.as_deref() {
            if let Some(page) = self.read_cached::<PostPage>(key).await.filter(PostPage::is_servable) {
                debug!(key, "Serving post listing from cache");
                return self.present_posts(actor, params, page, true).await;
            }
        }

        let page = self.query_post_page(actor, params).await?;
        if let Some(key) = cache_key.as_deref() {
            self.write_cached(key, &page).await;
        }
        self.present_posts(actor, params, page, false).await
    }

    /// The cache key for a listing, or `None` when the listing must bypass the cache.
    async fn post_listing_cache_key(
        &self,
        params: &ListingParams,
        device: DeviceClass,
    ) -> Result<Option<String>, ForumError> {
        if !params.is_cacheable() {
            return Ok(None);
        }
        let thread_id = params.filter.thread_id.as_deref();
        if let Some(thread_id) = thread_id {
            let reward = self.storage.get_thread_reward(thread_id).await?;
            if reward.is_some_and(|r| r.kind == RewardKind::Question) {
                return Ok(None);
            }
        }
        Ok(Some(cache_keys::post_listing_key(device, thread_id)))
    }

    async fn query_post_page(&self, actor: &Actor, params: &ListingParams) -> Result<PostPage, ForumError> {
        let query = params.query(actor);
        let count = match query.limit {
            Some(limit) if limit > 0 => Some(self.storage.count_posts(&query).await?),
            _ => None,
        };
        let mut posts = self.load_ranked_posts(&query).await?;

        if params.includes("lastThreeComments") {
            self.attach_last_comments(&mut posts).await?;
        }
        if params.sort.is_creation_time() {
            rank_by_rewards(&mut posts);
        }

        Ok(PostPage {
            posts,
            meta: PageMeta {
                params: params.raw.clone(),
                count,
                offset: params.page.offset,
                limit: params.page.limit,
            },
        })
    }

    async fn load_ranked_posts(&self, query: &PostQuery) -> Result<Vec<RankedPost>, ForumError> {
        let posts = self.storage.query_posts(query).await?;
        let ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
        let totals = self.storage.post_reward_totals(&ids).await?;
        let mut ranked: Vec<RankedPost> = posts.into_iter().map(RankedPost::new).collect();
        apply_rewards(&mut ranked, &totals);
        Ok(ranked)
    }

    async fn attach_last_comments(&self, posts: &mut [RankedPost]) -> Result<(), ForumError> {
        let ids: Vec<String> = posts.iter().map(|p| p.post.id.clone()).collect();
        let mut comments = self.storage.latest_comments(&ids, LAST_COMMENTS_PER_POST).await?;
        for ranked in posts.iter_mut() {
            let mut latest = comments.remove(&ranked.post.id).unwrap_or_default();
            for comment in latest.iter_mut() {
                comment.content = comment.summary();
            }
            ranked.last_three_comments = Some(latest);
        }
        Ok(())
    }

    /// Rights are checked in the post's category when it is known, globally otherwise.
    fn post_item(&self, actor: &Actor, ranked: RankedPost, category_id: Option<&str>) -> PostItem {
        let own = actor.is(&ranked.post.user_id);
        let can = |ability| match category_id {
            Some(category) => actor.can_in(ability, category),
            None => actor.can(ability),
        };
        PostItem {
            can_edit: own || can(Ability::EditOthersThread),
            can_hide: own || can(Ability::HidePosts),
            ranked,
        }
    }

    /// Per-actor decoration applied to every listing, cached or not.
    async fn present_posts(
        &self,
        actor: &Actor,
        params: &ListingParams,
        page: PostPage,
        from_cache: bool,
    ) -> Result<PostListing, ForumError> {
        let mut thread_ids: Vec<String> = page.posts.iter().map(|p| p.post.thread_id.clone()).collect();
        thread_ids.sort();
        thread_ids.dedup();
        let categories = self.storage.thread_categories(&thread_ids).await?;

        let items = page
            .posts
            .into_iter()
            .map(|mut ranked| {
                if params.filter.highlight && !ranked.post.stop_words.is_empty() {
                    ranked.post.content = highlight(&ranked.post.content, &ranked.post.stop_words);
                }
                let category = categories.get(&ranked.post.thread_id).map(String::as_str);
                self.post_item(actor, ranked, category)
            })
            .collect();
        Ok(PostListing {
            items,
            meta: page.meta,
            view: params.filter.view(),
            from_cache,
        })
    }

    // THREADS

    fn thread_visible_to(thread: &Thread, actor: &Actor) -> bool {
        if actor.is(&thread.user_id) {
            return true;
        }
        if thread.is_draft {
            return false;
        }
        (thread.is_approved || actor.can(Ability::ApprovePosts)) && (!thread.is_deleted() || actor.can(Ability::ViewTrashed))
    }

    async fn find_thread(&self, actor: &Actor, thread_id: &str) -> Result<Thread, ForumError> {
        self.storage
            .get_thread(thread_id)
            .await?
            .filter(|t| Self::thread_visible_to(t, actor))
            .ok_or_else(|| ForumError::ThreadNotFound(thread_id.to_string()))
    }

    pub async fn get_thread(
        &self,
        actor: &Actor,
        thread_id: &str,
        request: &ThreadRequest,
        device: DeviceClass,
    ) -> Result<ThreadResource, ForumError> {
        let thread = self.find_thread(actor, thread_id).await?;
        if !actor.can_in(Ability::ViewPosts, &thread.category_id) {
            return Err(ForumError::PermissionDenied(format!(
                "Cannot view posts of thread {}",
                thread_id
            )));
        }

        let key = cache_keys::thread_resource_key(device, thread_id);
        if let Some(mut snapshot) = self.read_cached::<ThreadSnapshot>(&key).await {
            debug!(key, "Serving thread from cache");
            snapshot.thread.view_count = thread.view_count;
            if !request.stop_view_count {
                snapshot.thread.view_count = self.storage.increment_view_count(thread_id).await?;
            }
            let posts = self.thread_posts_if_wanted(actor, &snapshot.thread, request).await?;
            return Ok(self.thread_resource(actor, snapshot, posts, true));
        }

        let (posts, rewarded_users, paid_users, onlookers, red_packet) = futures::try_join!(
            self.thread_posts_if_wanted(actor, &thread, request),
            self.order_users_if(request.includes("rewardedUsers"), thread_id, &[OrderType::Reward]),
            self.order_users_if(
                request.includes("paidUsers"),
                thread_id,
                &[OrderType::Thread, OrderType::Attachment],
            ),
            self.order_users_if(request.includes("onlookers"), thread_id, &[OrderType::Onlooker]),
            self.storage.get_red_packet(thread_id)
        )?;

        let mut thread = thread;
        if !request.stop_view_count {
            thread.view_count = self.storage.increment_view_count(thread_id).await?;
        }

        let snapshot = ThreadSnapshot {
            thread,
            rewarded_users,
            paid_users,
            onlookers,
            red_packet,
        };
        self.write_cached(&key, &snapshot).await;
        Ok(self.thread_resource(actor, snapshot, posts, false))
    }

    fn thread_resource(
        &self,
        actor: &Actor,
        snapshot: ThreadSnapshot,
        posts: Option<Vec<PostItem>>,
        from_cache: bool,
    ) -> ThreadResource {
        let thread = snapshot.thread;
        let category = thread.category_id.as_str();
        let can_edit = if actor.is(&thread.user_id) {
            actor.can_in(Ability::EditOwnThread, category)
        } else {
            actor.can_in(Ability::EditOthersThread, category)
        };
        ThreadResource {
            can_view_posts: actor.can_in(Ability::ViewPosts, category),
            can_reply: !actor.is_guest() && actor.can_in(Ability::ReplyThread, category),
            can_edit,
            posts,
            rewarded_users: snapshot.rewarded_users,
            paid_users: snapshot.paid_users,
            onlookers: snapshot.onlookers,
            red_packet: snapshot.red_packet,
            thread,
            from_cache,
        }
    }

    async fn thread_posts_if_wanted(
        &self,
        actor: &Actor,
        thread: &Thread,
        request: &ThreadRequest,
    ) -> Result<Option<Vec<PostItem>>, ForumError> {
        if !request.wants_posts() {
            return Ok(None);
        }
        let mut predicates = vec![
            PostPredicate::ThreadId(thread.id.clone()),
            PostPredicate::VisibleTo(Visibility::of(actor)),
        ];
        predicates.extend(deleted_state_predicate(request.is_deleted, actor));
        predicates.push(PostPredicate::IsFirst(false));
        let query = PostQuery {
            predicates,
            sort: vec![SortKey::asc(PostSortField::CreatedAt)],
            offset: request.page.offset,
            limit: request.page.limit,
        };

        let mut posts = self.load_ranked_posts(&query).await?;
        rank_by_rewards(&mut posts);
        Ok(Some(
            posts
                .into_iter()
                .map(|p| self.post_item(actor, p, Some(thread.category_id.as_str())))
                .collect(),
        ))
    }

    async fn order_users_if(
        &self,
        wanted: bool,
        thread_id: &str,
        types: &[OrderType],
    ) -> Result<Option<Vec<UserSummary>>, ForumError> {
        if !wanted {
            return Ok(None);
        }
        let orders = self.storage.paid_orders(thread_id, types).await?;
        let user_ids: Vec<String> = orders.into_iter().map(|o| o.user_id).collect();
        let users = self.storage.get_users(&user_ids).await?;
        Ok(Some(users.iter().map(UserSummary::from).collect()))
    }

    // ATTACHMENTS

    /// Checks and records an attachment's metadata. Each type is guarded by its
    /// own ability; the file name must carry an extension allowed for the type.
    pub async fn create_attachment(&self, actor: &Actor, upload: NewAttachment) -> Result<Attachment, ForumError> {
        let Some(user_id) = actor.id() else {
            return Err(ForumError::Unauthorized("Login required".to_string()));
        };
        let kind = upload.attachment_type;
        if !actor.can(kind.required_ability()) {
            return Err(ForumError::PermissionDenied(format!(
                "Cannot upload attachments of type {}",
                u8::from(kind)
            )));
        }

        self.validate_string_input("name", &upload.name, ATTACHMENT_NAME_MAX_LENGTH)?;
        let extension = upload
            .extension()
            .filter(|ext| kind.allowed_extensions().contains(&ext.as_str()))
            .ok_or_else(|| {
                ForumError::invalid_input(
                    "ext",
                    format!("Allowed extensions: {}", kind.allowed_extensions().join(", ")),
                )
            })?;
        if upload.size == 0 || upload.size > ATTACHMENT_MAX_SIZE {
            return Err(ForumError::invalid_input(
                "size",
                format!("Size must be between 1 and {} bytes", ATTACHMENT_MAX_SIZE),
            ));
        }
        self.censor.check("name", &upload.name)?;

        let attachment = Attachment {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            attachment_type: kind,
            file_name: upload.name.trim().to_string(),
            extension,
            file_size: upload.size,
            order: upload.order,
            is_approved: true,
            created_at: Utc::now(),
        };
        self.storage.save_attachment(attachment.clone()).await?;
        info!(attachment_id = %attachment.id, user_id, "Created attachment {}", attachment.file_name);
        self.logging
            .log_action(
                ATTACHMENT_CREATED,
                json!({ "attachment_id": attachment.id, "type": u8::from(kind), "size": attachment.file_size }),
                Some(user_id),
            )
            .await?;
        Ok(attachment)
    }

    // CATEGORIES

    /// Category tree with the actor's create/edit rights for an optional thread.
    pub async fn list_thread_categories(
        &self,
        actor: &Actor,
        thread_id: Option<&str>,
    ) -> Result<Vec<CategoryNode>, ForumError> {
        if actor.is_guest() {
            return Err(ForumError::PermissionDenied("Guests cannot list categories".to_string()));
        }

        let thread = match thread_id {
            Some(id) => self
                .storage
                .get_thread(id)
                .await?
                .filter(|t| !t.is_deleted() && t.is_approved),
            None => None,
        };

        let categories = self.storage.list_categories().await?;
        let nodes: Vec<CategoryNode> = categories
            .iter()
            .map(|category| Self::category_node(actor, category, thread.as_ref()))
            .collect();

        let mut children: HashMap<String, Vec<CategoryNode>> = HashMap::new();
        let mut roots = Vec::new();
        for node in nodes {
            match node.parent_id.clone() {
                Some(parent) => children.entry(parent).or_default().push(node),
                None => roots.push(node),
            }
        }
        for root in roots.iter_mut() {
            root.children = children.remove(&root.pid).unwrap_or_default();
        }
        Ok(roots)
    }

    fn category_node(actor: &Actor, category: &Category, thread: Option<&Thread>) -> CategoryNode {
        let can_create_thread = actor.can_in(Ability::CreateThread, &category.id);
        let can_edit_thread = match thread {
            None => false,
            Some(t) if t.is_draft => actor.is(&t.user_id) && can_create_thread,
            Some(t) => {
                (actor.is(&t.user_id) && actor.can_in(Ability::EditOwnThread, &category.id))
                    || actor.can_in(Ability::EditOthersThread, &category.id)
            }
        };
        CategoryNode {
            pid: category.id.clone(),
            name: category.name.clone(),
            description: category.description.clone(),
            icon: category.icon.clone(),
            thread_count: category.thread_count,
            parent_id: category.parent_id.clone(),
            can_create_thread,
            can_edit_thread,
            children: Vec::new(),
        }
    }
}
