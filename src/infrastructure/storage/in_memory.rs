use crate::core::errors::ForumError;
use crate::core::listing::{PostPredicate, PostQuery, PostSortField, SortKey, SortOrder, Visibility};
use crate::core::models::{
    attachment::Attachment,
    category::Category,
    order::{Order, OrderType},
    post::Post,
    thread::{RedPacket, Thread, ThreadReward},
    user::User,
};
use crate::infrastructure::storage::Storage;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use tokio::sync::RwLock;

/// Number of post reads served, split by kind.
#[derive(Default)]
struct QueryStats {
    queries: AtomicUsize,
    counts: AtomicUsize,
}

#[derive(Clone)]
pub struct InMemoryStorage {
    users: Arc<RwLock<HashMap<String, User>>>,
    users_by_username: Arc<RwLock<HashMap<String, String>>>,
    threads: Arc<RwLock<HashMap<String, Thread>>>,
    posts: Arc<RwLock<Vec<Post>>>,
    orders: Arc<RwLock<Vec<Order>>>,
    thread_rewards: Arc<RwLock<HashMap<String, ThreadReward>>>,
    red_packets: Arc<RwLock<HashMap<String, RedPacket>>>,
    categories: Arc<RwLock<Vec<Category>>>,
    attachments: Arc<RwLock<HashMap<String, Attachment>>>,
    stats: Arc<QueryStats>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        InMemoryStorage {
            users: Arc::new(RwLock::new(HashMap::new())),
            users_by_username: Arc::new(RwLock::new(HashMap::new())),
            threads: Arc::new(RwLock::new(HashMap::new())),
            posts: Arc::new(RwLock::new(Vec::new())),
            orders: Arc::new(RwLock::new(Vec::new())),
            thread_rewards: Arc::new(RwLock::new(HashMap::new())),
            red_packets: Arc::new(RwLock::new(HashMap::new())),
            categories: Arc::new(RwLock::new(Vec::new())),
            attachments: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(QueryStats::default()),
        }
    }

    pub fn post_query_count(&self) -> usize {
        self.stats.queries.load(AtomicOrdering::SeqCst)
    }

    pub fn post_count_query_count(&self) -> usize {
        self.stats.counts.load(AtomicOrdering::SeqCst)
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// Lookup tables the join-style predicates need.
struct Joins<'a> {
    users: &'a HashMap<String, User>,
    threads: &'a HashMap<String, Thread>,
}

impl Joins<'_> {
    fn username_contains(&self, user_id: Option<&String>, needle: &str) -> bool {
        user_id
            .and_then(|id| self.users.get(id))
            .is_some_and(|u| u.username.contains(needle))
    }
}

fn visible_to(post: &Post, visibility: &Visibility) -> bool {
    let own = visibility.actor_id.as_deref() == Some(post.user_id.as_str());
    (post.is_approved() || own || visibility.sees_unapproved) && (!post.is_deleted() || own || visibility.sees_trashed)
}

fn matches(post: &Post, predicate: &PostPredicate, joins: &Joins<'_>) -> bool {
    match predicate {
        PostPredicate::IsFirst(is_first) => post.is_first == *is_first,
        PostPredicate::VisibleTo(visibility) => visible_to(post, visibility),
        PostPredicate::UserId(id) => post.user_id == *id,
        PostPredicate::AuthorNameContains(name) => joins.username_contains(Some(&post.user_id), name),
        PostPredicate::DeletedUserId(id) => post.deleted_user_id.as_ref() == Some(id),
        PostPredicate::DeleterNameContains(name) => joins.username_contains(post.deleted_user_id.as_ref(), name),
        PostPredicate::CreatedFrom(from) => post.created_at >= *from,
        PostPredicate::CreatedUntil(until) => post.created_at <= *until,
        PostPredicate::DeletedFrom(from) => post.deleted_at.is_some_and(|d| d >= *from),
        PostPredicate::DeletedUntil(until) => post.deleted_at.is_some_and(|d| d <= *until),
        PostPredicate::CategoryId(id) => joins
            .threads
            .get(&post.thread_id)
            .is_some_and(|t| t.category_id == *id),
        PostPredicate::ThreadId(id) => post.thread_id == *id,
        PostPredicate::ReplyPostId(id) => post.reply_post_id.as_ref() == Some(id),
        PostPredicate::Approval(approval) => post.approval == *approval,
        PostPredicate::Deleted(deleted) => post.is_deleted() == *deleted,
        PostPredicate::IsComment(is_comment) => post.is_comment == *is_comment,
        PostPredicate::ContentContains(needle) => post.content.contains(needle.as_str()),
    }
}

fn compare(a: &Post, b: &Post, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ordering = match key.field {
            PostSortField::Id => a.id.cmp(&b.id),
            PostSortField::ReplyCount => a.reply_count.cmp(&b.reply_count),
            PostSortField::LikeCount => a.like_count.cmp(&b.like_count),
            PostSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            PostSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            PostSortField::DeletedAt => a.deleted_at.cmp(&b.deleted_at),
        };
        let ordering = match key.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

impl InMemoryStorage {
    async fn matching_posts(&self, query: &PostQuery) -> Vec<Post> {
        let posts = self.posts.read().await;
        let users = self.users.read().await;
        let threads = self.threads.read().await;
        let joins = Joins {
            users: &users,
            threads: &threads,
        };
        posts
            .iter()
            .filter(|post| query.predicates.iter().all(|p| matches(post, p, &joins)))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_user_if_not_exists(&self, user: User) -> Result<Option<User>, ForumError> {
        let mut users_by_username = self.users_by_username.write().await;
        if users_by_username.contains_key(&user.username) {
            return Ok(None);
        }
        users_by_username.insert(user.username.clone(), user.id.clone());
        let mut users = self.users.write().await;
        users.insert(user.id.clone(), user.clone());
        Ok(Some(user))
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, ForumError> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, ForumError> {
        let users_by_username = self.users_by_username.read().await;
        let users = self.users.read().await;
        Ok(users_by_username.get(username).and_then(|id| users.get(id).cloned()))
    }

    async fn get_users(&self, user_ids: &[String]) -> Result<Vec<User>, ForumError> {
        let users = self.users.read().await;
        Ok(user_ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn thread_categories(&self, thread_ids: &[String]) -> Result<HashMap<String, String>, ForumError> {
        let threads = self.threads.read().await;
        Ok(thread_ids
            .iter()
            .filter_map(|id| threads.get(id).map(|t| (id.clone(), t.category_id.clone())))
            .collect())
    }

    async fn save_thread(&self, thread: Thread) -> Result<(), ForumError> {
        let mut threads = self.threads.write().await;
        threads.insert(thread.id.clone(), thread);
        Ok(())
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>, ForumError> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).cloned())
    }

    async fn increment_view_count(&self, thread_id: &str) -> Result<u64, ForumError> {
        let mut threads = self.threads.write().await;
        let thread = threads
            .get_mut(thread_id)
            .ok_or_else(|| ForumError::ThreadNotFound(thread_id.to_string()))?;
        thread.view_count += 1;
        Ok(thread.view_count)
    }

    async fn save_post(&self, post: Post) -> Result<(), ForumError> {
        let mut posts = self.posts.write().await;
        match posts.iter_mut().find(|p| p.id == post.id) {
            Some(existing) => *existing = post,
            None => posts.push(post),
        }
        Ok(())
    }

    async fn query_posts(&self, query: &PostQuery) -> Result<Vec<Post>, ForumError> {
        self.stats.queries.fetch_add(1, AtomicOrdering::SeqCst);
        let mut posts = self.matching_posts(query).await;
        posts.sort_by(|a, b| compare(a, b, &query.sort));
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(posts.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_posts(&self, query: &PostQuery) -> Result<u64, ForumError> {
        self.stats.counts.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(self.matching_posts(query).await.len() as u64)
    }

    async fn latest_comments(
        &self,
        post_ids: &[String],
        per_post: usize,
    ) -> Result<HashMap<String, Vec<Post>>, ForumError> {
        let posts = self.posts.read().await;
        let mut comments: Vec<&Post> = posts
            .iter()
            .filter(|p| {
                p.reply_post_id.as_ref().is_some_and(|id| post_ids.contains(id))
                    && !p.is_deleted()
                    && !p.is_first
                    && p.is_comment
                    && p.is_approved()
            })
            .collect();
        comments.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        let mut grouped: HashMap<String, Vec<Post>> = HashMap::new();
        for comment in comments {
            if let Some(parent) = &comment.reply_post_id {
                let bucket = grouped.entry(parent.clone()).or_default();
                if bucket.len() < per_post {
                    bucket.push(comment.clone());
                }
            }
        }
        Ok(grouped)
    }

    async fn save_order(&self, order: Order) -> Result<(), ForumError> {
        let mut orders = self.orders.write().await;
        orders.push(order);
        Ok(())
    }

    async fn post_reward_totals(&self, post_ids: &[String]) -> Result<HashMap<String, f64>, ForumError> {
        let orders = self.orders.read().await;
        let mut totals: HashMap<String, f64> = HashMap::new();
        for order in orders
            .iter()
            .filter(|o| o.is_paid() && o.order_type == OrderType::Reward)
        {
            if let Some(post_id) = order.post_id.as_ref().filter(|id| post_ids.contains(id)) {
                *totals.entry(post_id.clone()).or_insert(0.0) += order.amount;
            }
        }
        Ok(totals)
    }

    async fn paid_orders(&self, thread_id: &str, types: &[OrderType]) -> Result<Vec<Order>, ForumError> {
        let orders = self.orders.read().await;
        let mut paid: Vec<Order> = orders
            .iter()
            .filter(|o| o.thread_id == thread_id && o.is_paid() && !o.is_anonymous && types.contains(&o.order_type))
            .cloned()
            .collect();
        paid.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(paid)
    }

    async fn save_thread_reward(&self, reward: ThreadReward) -> Result<(), ForumError> {
        let mut thread_rewards = self.thread_rewards.write().await;
        thread_rewards.insert(reward.thread_id.clone(), reward);
        Ok(())
    }

    async fn get_thread_reward(&self, thread_id: &str) -> Result<Option<ThreadReward>, ForumError> {
        let thread_rewards = self.thread_rewards.read().await;
        Ok(thread_rewards.get(thread_id).cloned())
    }

    async fn save_red_packet(&self, red_packet: RedPacket) -> Result<(), ForumError> {
        let mut red_packets = self.red_packets.write().await;
        red_packets.insert(red_packet.thread_id.clone(), red_packet);
        Ok(())
    }

    async fn get_red_packet(&self, thread_id: &str) -> Result<Option<RedPacket>, ForumError> {
        let red_packets = self.red_packets.read().await;
        Ok(red_packets.get(thread_id).cloned())
    }

    async fn save_attachment(&self, attachment: Attachment) -> Result<(), ForumError> {
        let mut attachments = self.attachments.write().await;
        attachments.insert(attachment.id.clone(), attachment);
        Ok(())
    }

    async fn get_attachment(&self, attachment_id: &str) -> Result<Option<Attachment>, ForumError> {
        let attachments = self.attachments.read().await;
        Ok(attachments.get(attachment_id).cloned())
    }

    async fn save_category(&self, category: Category) -> Result<(), ForumError> {
        let mut categories = self.categories.write().await;
        match categories.iter_mut().find(|c| c.id == category.id) {
            Some(existing) => *existing = category,
            None => categories.push(category),
        }
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ForumError> {
        let mut categories = self.categories.read().await.clone();
        categories.sort_by(|a, b| {
            a.parent_id
                .is_some()
                .cmp(&b.parent_id.is_some())
                .then_with(|| a.parent_id.cmp(&b.parent_id))
                .then_with(|| a.sort.cmp(&b.sort))
        });
        Ok(categories)
    }
}
