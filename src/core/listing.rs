//! Typed description of a post listing request.
//!
//! Query strings arrive as a flat map (`filter[thread]=1`, `page[number]=2`,
//! `sort=-createdAt`, ...). They are parsed once into [`ListingParams`], which
//! owns the caching eligibility rule and compiles into a [`PostQuery`] that
//! storage backends evaluate.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::ForumError;
use crate::core::models::post::{Approval, RankedPost};
use crate::core::models::user::{Ability, Actor};

pub const DEFAULT_PAGE_LIMIT: u64 = 20;
pub const MAX_PAGE_LIMIT: u64 = 50;

/// Include that makes a listing cacheable regardless of the page number.
pub const CACHEABLE_INCLUDE: &str = "firstPost";

pub const POST_INCLUDES: &[&str] = &[
    "user",
    "replyUser",
    "commentUser",
    "images",
    "thread",
    "likeState",
    "firstPost",
    "user.groups",
    "thread.category",
    "thread.firstPost",
    "lastThreeComments",
    "lastThreeComments.user",
    "lastThreeComments.replyUser",
    "lastThreeComments.commentUser",
    "lastThreeComments.images",
    "deletedUser",
    "lastDeletedLog",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceClass {
    Desktop,
    Mobile,
}

impl DeviceClass {
    pub fn from_user_agent(user_agent: Option<&str>) -> Self {
        const MARKERS: [&str; 6] = ["mobile", "android", "iphone", "ipad", "micromessenger", "windows phone"];
        match user_agent {
            Some(ua) => {
                let ua = ua.to_ascii_lowercase();
                if MARKERS.iter().any(|m| ua.contains(m)) {
                    DeviceClass::Mobile
                } else {
                    DeviceClass::Desktop
                }
            }
            None => DeviceClass::Desktop,
        }
    }

    pub fn flag(self) -> u8 {
        match self {
            DeviceClass::Desktop => 0,
            DeviceClass::Mobile => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostSortField {
    Id,
    ReplyCount,
    LikeCount,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

impl PostSortField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(PostSortField::Id),
            "replyCount" => Some(PostSortField::ReplyCount),
            "likeCount" => Some(PostSortField::LikeCount),
            "createdAt" => Some(PostSortField::CreatedAt),
            "updatedAt" => Some(PostSortField::UpdatedAt),
            "deletedAt" => Some(PostSortField::DeletedAt),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: PostSortField,
    pub order: SortOrder,
}

impl SortKey {
    pub fn asc(field: PostSortField) -> Self {
        SortKey {
            field,
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: PostSortField) -> Self {
        SortKey {
            field,
            order: SortOrder::Desc,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    pub fn parse(raw: Option<&str>) -> Result<Self, ForumError> {
        let mut keys = Vec::new();
        for part in raw.unwrap_or_default().split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (order, name) = match part.strip_prefix('-') {
                Some(name) => (SortOrder::Desc, name),
                None => (SortOrder::Asc, part),
            };
            let field = PostSortField::parse(name)
                .ok_or_else(|| ForumError::invalid_parameter("sort", format!("Cannot sort by `{}`", name)))?;
            keys.push(SortKey { field, order });
        }
        Ok(SortSpec { keys })
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// `sort=createdAt`: the default ordering, re-ranked by reward.
    pub fn is_creation_time(&self) -> bool {
        self.keys == [SortKey::asc(PostSortField::CreatedAt)]
    }

    /// `sort=-createdAt`: newest first, never cached.
    pub fn is_newest_first(&self) -> bool {
        self.keys == [SortKey::desc(PostSortField::CreatedAt)]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub number: Option<u64>,
    pub offset: u64,
    pub limit: Option<u64>,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            number: None,
            offset: 0,
            limit: Some(DEFAULT_PAGE_LIMIT),
        }
    }
}

impl PageRequest {
    pub fn parse(number: Option<&str>, offset: Option<&str>, limit: Option<&str>) -> Result<Self, ForumError> {
        let limit = match parse_u64("page[limit]", limit)? {
            None => Some(DEFAULT_PAGE_LIMIT),
            Some(0) => None,
            Some(n) => Some(n.min(MAX_PAGE_LIMIT)),
        };
        let number = parse_u64("page[number]", number)?;
        let offset = match parse_u64("page[offset]", offset)? {
            Some(offset) => offset,
            None => match (number, limit) {
                (Some(n), Some(limit)) => n.saturating_sub(1).checked_mul(limit).ok_or_else(|| {
                    ForumError::invalid_parameter("page[number]", format!("Page {} is out of range", n))
                })?,
                _ => 0,
            },
        };
        Ok(PageRequest { number, offset, limit })
    }
}

fn parse_u64(name: &str, value: Option<&str>) -> Result<Option<u64>, ForumError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ForumError::invalid_parameter(name, format!("`{}` is not a non-negative integer", v))),
        None => Ok(None),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn parse(name: &str, value: &str) -> Result<Self, ForumError> {
        match value.to_ascii_lowercase().as_str() {
            "yes" => Ok(YesNo::Yes),
            "no" => Ok(YesNo::No),
            _ => Err(ForumError::invalid_parameter(name, "Expected `yes` or `no`")),
        }
    }
}

/// Response shape for a post listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostView {
    Standard,
    Comment,
}

/// Filters a post listing accepts, one field per `filter[...]` key.
#[derive(Clone, Debug, Default)]
pub struct PostFilter {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub deleted_user_id: Option<String>,
    pub deleted_username: Option<String>,
    pub created_at_begin: Option<DateTime<Utc>>,
    pub created_at_end: Option<DateTime<Utc>>,
    pub deleted_at_begin: Option<DateTime<Utc>>,
    pub deleted_at_end: Option<DateTime<Utc>>,
    pub category_id: Option<String>,
    pub thread_id: Option<String>,
    pub reply_post_id: Option<String>,
    pub is_approved: Option<Approval>,
    pub is_deleted: Option<YesNo>,
    pub is_comment: Option<YesNo>,
    pub q: Option<String>,
    pub highlight: bool,
    /// Whether the request carried any `filter[...]` key at all.
    pub present: bool,
}

impl PostFilter {
    pub fn parse(params: &BTreeMap<String, String>) -> Result<Self, ForumError> {
        let get = |key: &str| {
            params
                .get(&format!("filter[{}]", key))
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let date = |key: &str| -> Result<Option<DateTime<Utc>>, ForumError> {
            get(key).map(|v| parse_datetime(key, &v)).transpose()
        };

        let is_approved = match get("isApproved").as_deref() {
            None => None,
            Some("0") => Some(Approval::Unapproved),
            Some("1") => Some(Approval::Approved),
            Some("2") => Some(Approval::Ignored),
            Some(_) => return Err(ForumError::invalid_parameter("isApproved", "Expected 0, 1 or 2")),
        };

        Ok(PostFilter {
            user_id: get("userId"),
            username: get("username"),
            deleted_user_id: get("deletedUserId"),
            deleted_username: get("deletedUsername"),
            created_at_begin: date("createdAtBegin")?,
            created_at_end: date("createdAtEnd")?,
            deleted_at_begin: date("deletedAtBegin")?,
            deleted_at_end: date("deletedAtEnd")?,
            category_id: get("categoryId"),
            thread_id: get("thread"),
            reply_post_id: get("reply"),
            is_approved,
            is_deleted: get("isDeleted").map(|v| YesNo::parse("isDeleted", &v)).transpose()?,
            is_comment: get("isComment").map(|v| YesNo::parse("isComment", &v)).transpose()?,
            q: get("q"),
            highlight: get("highlight").is_some_and(|v| v.eq_ignore_ascii_case("yes")),
            present: params.keys().any(|k| k.starts_with("filter[")),
        })
    }

    pub fn has_free_text(&self) -> bool {
        self.q.is_some() || self.username.is_some() || self.deleted_username.is_some()
    }

    pub fn view(&self) -> PostView {
        match self.is_comment {
            Some(YesNo::Yes) => PostView::Comment,
            _ => PostView::Standard,
        }
    }

    /// Compiles the filter into storage predicates for the given actor.
    pub fn predicates(&self, actor: &Actor) -> Vec<PostPredicate> {
        let builders: [fn(&PostFilter, &Actor) -> Option<PostPredicate>; 15] = [
            |_, _| Some(PostPredicate::IsFirst(false)),
            |_, actor| Some(PostPredicate::VisibleTo(Visibility::of(actor))),
            user_id_predicate,
            username_predicate,
            deleted_user_id_predicate,
            deleted_username_predicate,
            |f, _| f.created_at_begin.map(PostPredicate::CreatedFrom),
            |f, _| f.created_at_end.map(PostPredicate::CreatedUntil),
            |f, _| f.deleted_at_begin.map(PostPredicate::DeletedFrom),
            |f, _| f.deleted_at_end.map(PostPredicate::DeletedUntil),
            category_predicate,
            thread_predicate,
            reply_predicate,
            approval_predicate,
            deleted_predicate,
        ];
        let mut predicates: Vec<PostPredicate> = builders.iter().filter_map(|build| build(self, actor)).collect();
        predicates.extend(comment_predicate(self, actor));
        predicates.extend(content_predicate(self, actor));
        predicates
    }
}

fn parse_datetime(name: &str, value: &str) -> Result<DateTime<Utc>, ForumError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| ForumError::invalid_parameter(name, format!("`{}` is not a valid date", value)))
}

fn user_id_predicate(filter: &PostFilter, _: &Actor) -> Option<PostPredicate> {
    filter.user_id.clone().map(PostPredicate::UserId)
}

fn username_predicate(filter: &PostFilter, _: &Actor) -> Option<PostPredicate> {
    filter.username.clone().map(PostPredicate::AuthorNameContains)
}

fn deleted_user_id_predicate(filter: &PostFilter, _: &Actor) -> Option<PostPredicate> {
    filter.deleted_user_id.clone().map(PostPredicate::DeletedUserId)
}

fn deleted_username_predicate(filter: &PostFilter, _: &Actor) -> Option<PostPredicate> {
    filter.deleted_username.clone().map(PostPredicate::DeleterNameContains)
}

fn category_predicate(filter: &PostFilter, _: &Actor) -> Option<PostPredicate> {
    filter.category_id.clone().map(PostPredicate::CategoryId)
}

fn thread_predicate(filter: &PostFilter, _: &Actor) -> Option<PostPredicate> {
    filter.thread_id.clone().map(PostPredicate::ThreadId)
}

fn reply_predicate(filter: &PostFilter, _: &Actor) -> Option<PostPredicate> {
    filter.reply_post_id.clone().map(PostPredicate::ReplyPostId)
}

// Only moderators may ask for unapproved or ignored posts; otherwise the filter is dropped.
fn approval_predicate(filter: &PostFilter, actor: &Actor) -> Option<PostPredicate> {
    match filter.is_approved? {
        Approval::Approved => Some(PostPredicate::Approval(Approval::Approved)),
        other if actor.can(Ability::ApprovePosts) => Some(PostPredicate::Approval(other)),
        _ => None,
    }
}

fn deleted_predicate(filter: &PostFilter, actor: &Actor) -> Option<PostPredicate> {
    deleted_state_predicate(filter.is_deleted, actor)
}

pub(crate) fn deleted_state_predicate(is_deleted: Option<YesNo>, actor: &Actor) -> Option<PostPredicate> {
    match is_deleted? {
        YesNo::Yes if actor.can(Ability::ViewTrashed) => Some(PostPredicate::Deleted(true)),
        YesNo::Yes => None,
        YesNo::No => Some(PostPredicate::Deleted(false)),
    }
}

fn comment_predicate(filter: &PostFilter, _: &Actor) -> Option<PostPredicate> {
    filter.is_comment.map(|c| PostPredicate::IsComment(c == YesNo::Yes))
}

fn content_predicate(filter: &PostFilter, _: &Actor) -> Option<PostPredicate> {
    filter.q.clone().map(PostPredicate::ContentContains)
}

/// What an actor is allowed to see beyond approved, live posts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Visibility {
    pub actor_id: Option<String>,
    pub sees_unapproved: bool,
    pub sees_trashed: bool,
}

impl Visibility {
    pub fn of(actor: &Actor) -> Self {
        Visibility {
            actor_id: actor.id().map(str::to_string),
            sees_unapproved: actor.can(Ability::ApprovePosts),
            sees_trashed: actor.can(Ability::ViewTrashed),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PostPredicate {
    IsFirst(bool),
    VisibleTo(Visibility),
    UserId(String),
    AuthorNameContains(String),
    DeletedUserId(String),
    DeleterNameContains(String),
    CreatedFrom(DateTime<Utc>),
    CreatedUntil(DateTime<Utc>),
    DeletedFrom(DateTime<Utc>),
    DeletedUntil(DateTime<Utc>),
    CategoryId(String),
    ThreadId(String),
    ReplyPostId(String),
    Approval(Approval),
    Deleted(bool),
    IsComment(bool),
    ContentContains(String),
}

/// A compiled read against the post table.
#[derive(Clone, Debug, PartialEq)]
pub struct PostQuery {
    pub predicates: Vec<PostPredicate>,
    pub sort: Vec<SortKey>,
    pub offset: u64,
    pub limit: Option<u64>,
}

/// A post listing request, parsed from the raw query parameters.
#[derive(Clone, Debug)]
pub struct ListingParams {
    pub raw: BTreeMap<String, String>,
    pub filter: PostFilter,
    pub sort: SortSpec,
    pub page: PageRequest,
    pub include: Vec<String>,
}

impl ListingParams {
    pub fn parse(raw: BTreeMap<String, String>) -> Result<Self, ForumError> {
        let filter = PostFilter::parse(&raw)?;
        let sort = SortSpec::parse(raw.get("sort").map(String::as_str))?;
        let page = PageRequest::parse(
            raw.get("page[number]").map(String::as_str),
            raw.get("page[offset]").map(String::as_str),
            raw.get("page[limit]").map(String::as_str),
        )?;
        let include = parse_include(raw.get("include").map(String::as_str), POST_INCLUDES)?;
        Ok(ListingParams {
            raw,
            filter,
            sort,
            page,
            include,
        })
    }

    pub fn includes(&self, relation: &str) -> bool {
        self.include.iter().any(|i| i == relation)
    }

    /// Whether this request shape may be served from, and written to, the cache.
    pub fn is_cacheable(&self) -> bool {
        if self.sort.is_newest_first() {
            return false;
        }
        if self.filter.present && matches!(self.filter.is_comment, None | Some(YesNo::Yes)) {
            return false;
        }
        if self.filter.has_free_text() {
            return false;
        }
        self.includes(CACHEABLE_INCLUDE) || self.page.number == Some(1)
    }

    pub fn query(&self, actor: &Actor) -> PostQuery {
        PostQuery {
            predicates: self.filter.predicates(actor),
            sort: self.sort.keys().to_vec(),
            offset: self.page.offset,
            limit: self.page.limit,
        }
    }
}

pub fn parse_include(raw: Option<&str>, allowed: &[&str]) -> Result<Vec<String>, ForumError> {
    let mut include = Vec::new();
    for relation in raw.unwrap_or_default().split(',').map(str::trim).filter(|r| !r.is_empty()) {
        if !allowed.contains(&relation) {
            return Err(ForumError::invalid_parameter(
                "include",
                format!("Relationship `{}` cannot be included", relation),
            ));
        }
        include.push(relation.to_string());
    }
    Ok(include)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    pub params: BTreeMap<String, String>,
    pub count: Option<u64>,
    pub offset: u64,
    pub limit: Option<u64>,
}

impl PageMeta {
    pub fn page_count(&self) -> Option<u64> {
        match (self.count, self.limit) {
            (Some(count), Some(limit)) if limit > 0 => Some(count.div_ceil(limit)),
            _ => None,
        }
    }
}

/// One page of ranked posts with its pagination metadata. This is also the
/// cached representation of a listing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PostPage {
    pub posts: Vec<RankedPost>,
    pub meta: PageMeta,
}

impl PostPage {
    /// Cached pages with no posts or a zero count are never served.
    pub fn is_servable(&self) -> bool {
        !self.posts.is_empty() && self.meta.count.unwrap_or(0) != 0
    }
}
