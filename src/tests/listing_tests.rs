use crate::constants::LISTING_CACHE_TTL;
use crate::core::listing::{DeviceClass, PageMeta, PostPage, PostView};
use crate::core::models::{
    post::RankedPost,
    thread::{RewardKind, ThreadReward},
    user::{Ability, Actor, Grant},
};
use crate::infrastructure::cache::{Cache, cache_keys};
use crate::infrastructure::storage::Storage;
use crate::tests::*;
use std::time::Duration;

async fn thread_with_posts(service: &TestService, count: usize) -> (String, Vec<crate::core::models::post::Post>) {
    let author = add_member(service, "author").await;
    let thread = save_thread(service, thread(&author.id, "1")).await;
    let mut posts = Vec::new();
    for i in 0..count {
        posts.push(save_post(service, post(&thread.id, &author.id, &format!("reply {}", i), at(i as i64))).await);
    }
    (thread.id, posts)
}

fn first_page_of(thread_id: &str) -> Vec<(&'static str, String)> {
    vec![
        ("filter[thread]", thread_id.to_string()),
        ("filter[isComment]", "no".to_string()),
        ("page[number]", "1".to_string()),
    ]
}

fn to_params(pairs: &[(&str, String)]) -> crate::core::listing::ListingParams {
    let borrowed: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (*k, v.as_str())).collect();
    params(&borrowed)
}

#[tokio::test]
async fn test_ineligible_listing_never_touches_cache() {
    let service = create_test_service();
    let (thread_id, _) = thread_with_posts(&service, 3).await;
    let mut pairs = first_page_of(&thread_id);
    pairs.push(("sort", "-createdAt".to_string()));
    let p = to_params(&pairs);

    for _ in 0..2 {
        let listing = service.list_posts(&Actor::guest(), &p, DeviceClass::Desktop).await.unwrap();
        assert!(!listing.from_cache);
        assert_eq!(listing.items.len(), 3);
    }
    assert!(service.cache().is_empty().await);
    assert_eq!(service.storage().post_count_query_count(), 2);
}

#[tokio::test]
async fn test_free_text_filter_bypasses_cache() {
    let service = create_test_service();
    let (thread_id, _) = thread_with_posts(&service, 3).await;
    let mut pairs = first_page_of(&thread_id);
    pairs.push(("filter[q]", "reply 1".to_string()));

    let listing = service
        .list_posts(&Actor::guest(), &to_params(&pairs), DeviceClass::Desktop)
        .await
        .unwrap();
    assert_eq!(listing.items.len(), 1);
    assert!(service.cache().is_empty().await);
}

#[tokio::test]
async fn test_eligible_listing_is_served_from_cache() {
    let service = create_test_service();
    let (thread_id, _) = thread_with_posts(&service, 3).await;
    let p = to_params(&first_page_of(&thread_id));

    let first = service.list_posts(&Actor::guest(), &p, DeviceClass::Desktop).await.unwrap();
    assert!(!first.from_cache);
    assert_eq!(service.cache().len().await, 1);
    let counts = service.storage().post_count_query_count();
    let queries = service.storage().post_query_count();

    let second = service.list_posts(&Actor::guest(), &p, DeviceClass::Desktop).await.unwrap();
    assert!(second.from_cache);
    assert_eq!(second.meta, first.meta);
    assert_eq!(second.meta.count, Some(3));
    assert_eq!(service.storage().post_count_query_count(), counts);
    assert_eq!(service.storage().post_query_count(), queries);
}

#[tokio::test]
async fn test_device_classes_are_cached_separately() {
    let service = create_test_service();
    let (thread_id, _) = thread_with_posts(&service, 2).await;
    let p = to_params(&first_page_of(&thread_id));

    service.list_posts(&Actor::guest(), &p, DeviceClass::Desktop).await.unwrap();
    let mobile = service.list_posts(&Actor::guest(), &p, DeviceClass::Mobile).await.unwrap();
    assert!(!mobile.from_cache);
    assert_eq!(service.cache().len().await, 2);
}

#[tokio::test(start_paused = true)]
async fn test_listing_requeries_after_ttl() {
    let service = create_test_service();
    let (thread_id, _) = thread_with_posts(&service, 2).await;
    let p = to_params(&first_page_of(&thread_id));

    service.list_posts(&Actor::guest(), &p, DeviceClass::Desktop).await.unwrap();
    tokio::time::advance(LISTING_CACHE_TTL - Duration::from_secs(1)).await;
    assert!(service.list_posts(&Actor::guest(), &p, DeviceClass::Desktop).await.unwrap().from_cache);

    tokio::time::advance(Duration::from_secs(2)).await;
    let counts = service.storage().post_count_query_count();
    let listing = service.list_posts(&Actor::guest(), &p, DeviceClass::Desktop).await.unwrap();
    assert!(!listing.from_cache);
    assert_eq!(service.storage().post_count_query_count(), counts + 1);
}

#[tokio::test]
async fn test_creation_sort_ranks_by_reward() {
    let service = create_test_service();
    let author = add_member(&service, "author").await;
    let thread = save_thread(&service, thread(&author.id, "1")).await;
    let plain = save_post(&service, post(&thread.id, &author.id, "plain", at(0))).await;
    let five = save_post(&service, post(&thread.id, &author.id, "five", at(5))).await;
    let ten = save_post(&service, post(&thread.id, &author.id, "ten", at(5))).await;
    reward(&service, &five, 5.0).await;
    reward(&service, &ten, 7.5).await;
    reward(&service, &ten, 2.5).await;

    let p = params(&[("filter[thread]", thread.id.as_str()), ("sort", "createdAt")]);
    let listing = service.list_posts(&Actor::guest(), &p, DeviceClass::Desktop).await.unwrap();
    let ids: Vec<&str> = listing.items.iter().map(|i| i.ranked.post.id.as_str()).collect();
    assert_eq!(ids, [ten.id.as_str(), five.id.as_str(), plain.id.as_str()]);
    assert_eq!(listing.items[0].ranked.rewards, 10.0);
    assert_eq!(listing.items[1].ranked.rewards, 5.0);

    // Any other ordering is left as queried.
    let p = params(&[("filter[thread]", thread.id.as_str()), ("sort", "-createdAt")]);
    let listing = service.list_posts(&Actor::guest(), &p, DeviceClass::Desktop).await.unwrap();
    assert_eq!(listing.items.last().unwrap().ranked.post.id, plain.id);
}

#[tokio::test]
async fn test_cached_page_with_zero_count_is_not_served() {
    let service = create_test_service();
    let (thread_id, posts) = thread_with_posts(&service, 2).await;
    let p = to_params(&first_page_of(&thread_id));
    let stale = PostPage {
        posts: vec![RankedPost::new(posts[0].clone())],
        meta: PageMeta {
            params: p.raw.clone(),
            count: Some(0),
            offset: 0,
            limit: Some(20),
        },
    };
    let key = cache_keys::post_listing_key(DeviceClass::Desktop, Some(&thread_id));
    service
        .cache()
        .put_raw(&key, serde_json::to_string(&stale).unwrap(), LISTING_CACHE_TTL)
        .await
        .unwrap();

    let listing = service.list_posts(&Actor::guest(), &p, DeviceClass::Desktop).await.unwrap();
    assert!(!listing.from_cache);
    assert_eq!(listing.meta.count, Some(2));
}

#[tokio::test]
async fn test_corrupt_cache_entry_is_a_miss() {
    let service = create_test_service();
    let (thread_id, _) = thread_with_posts(&service, 2).await;
    let p = to_params(&first_page_of(&thread_id));
    let key = cache_keys::post_listing_key(DeviceClass::Desktop, Some(&thread_id));
    service
        .cache()
        .put_raw(&key, "{not json".to_string(), LISTING_CACHE_TTL)
        .await
        .unwrap();

    let listing = service.list_posts(&Actor::guest(), &p, DeviceClass::Desktop).await.unwrap();
    assert!(!listing.from_cache);
    assert_eq!(listing.items.len(), 2);

    // The miss rewrote the entry with a readable page.
    assert!(service.list_posts(&Actor::guest(), &p, DeviceClass::Desktop).await.unwrap().from_cache);
}

#[tokio::test]
async fn test_question_thread_bypasses_cache() {
    let service = create_test_service();
    let (thread_id, _) = thread_with_posts(&service, 2).await;
    service
        .storage()
        .save_thread_reward(ThreadReward {
            thread_id: thread_id.clone(),
            kind: RewardKind::Question,
            amount: 20.0,
        })
        .await
        .unwrap();
    let p = to_params(&first_page_of(&thread_id));

    for _ in 0..2 {
        let listing = service.list_posts(&Actor::guest(), &p, DeviceClass::Desktop).await.unwrap();
        assert!(!listing.from_cache);
    }
    assert!(service.cache().is_empty().await);
}

#[tokio::test]
async fn test_actor_flags_are_recomputed_on_cache_hit() {
    let service = create_test_service();
    let author = add_member(&service, "author").await;
    let thread = save_thread(&service, thread(&author.id, "1")).await;
    save_post(&service, post(&thread.id, &author.id, "mine", at(1))).await;
    let p = to_params(&first_page_of(&thread.id));

    let as_guest = service.list_posts(&Actor::guest(), &p, DeviceClass::Desktop).await.unwrap();
    assert!(!as_guest.items[0].can_edit);

    let as_author = service
        .list_posts(&Actor::user(&author), &p, DeviceClass::Desktop)
        .await
        .unwrap();
    assert!(as_author.from_cache);
    assert!(as_author.items[0].can_edit);
    assert!(as_author.items[0].can_hide);
}

#[tokio::test]
async fn test_category_moderators_manage_posts_in_their_category() {
    let service = create_test_service();
    let author = add_member(&service, "author").await;
    let mut grants = crate::core::models::user::member_grants();
    grants.push(Grant::in_category(Ability::EditOthersThread, "1"));
    grants.push(Grant::in_category(Ability::HidePosts, "1"));
    let moderator = add_user(&service, user("moderator", grants)).await;

    let moderated = save_thread(&service, thread(&author.id, "1")).await;
    let elsewhere = save_thread(&service, thread(&author.id, "2")).await;
    save_post(&service, post(&moderated.id, &author.id, "in scope", at(1))).await;
    save_post(&service, post(&elsewhere.id, &author.id, "out of scope", at(2))).await;

    let p = params(&[("sort", "createdAt"), ("page[limit]", "0")]);
    let listing = service
        .list_posts(&Actor::user(&moderator), &p, DeviceClass::Desktop)
        .await
        .unwrap();
    let flags: Vec<(&str, bool, bool)> = listing
        .items
        .iter()
        .map(|i| (i.ranked.post.content.as_str(), i.can_edit, i.can_hide))
        .collect();
    assert_eq!(flags, [("in scope", true, true), ("out of scope", false, false)]);
}

#[tokio::test]
async fn test_unapproved_posts_are_hidden_from_others() {
    let service = create_test_service();
    let author = add_member(&service, "author").await;
    let other = add_member(&service, "other").await;
    let thread = save_thread(&service, thread(&author.id, "1")).await;
    let mut pending = post(&thread.id, &author.id, "pending", at(1));
    pending.approval = crate::core::models::post::Approval::Unapproved;
    save_post(&service, pending).await;

    let p = params(&[("filter[thread]", thread.id.as_str())]);
    let seen_by_other = service.list_posts(&Actor::user(&other), &p, DeviceClass::Desktop).await.unwrap();
    assert!(seen_by_other.items.is_empty());
    let seen_by_author = service.list_posts(&Actor::user(&author), &p, DeviceClass::Desktop).await.unwrap();
    assert_eq!(seen_by_author.items.len(), 1);
}

#[tokio::test]
async fn test_comment_listing_uses_comment_view_and_last_comments() {
    let service = create_test_service();
    let author = add_member(&service, "author").await;
    let thread = save_thread(&service, thread(&author.id, "1")).await;
    let parent = save_post(&service, post(&thread.id, &author.id, "parent", at(1))).await;
    for i in 0..4 {
        let mut comment = post(&thread.id, &author.id, &"c".repeat(120), at(10 + i));
        comment.is_comment = true;
        comment.reply_post_id = Some(parent.id.clone());
        save_post(&service, comment).await;
    }

    let p = params(&[("filter[thread]", thread.id.as_str()), ("filter[isComment]", "yes")]);
    let comments = service.list_posts(&Actor::guest(), &p, DeviceClass::Desktop).await.unwrap();
    assert_eq!(comments.view, PostView::Comment);
    assert_eq!(comments.items.len(), 4);

    let p = params(&[
        ("filter[thread]", thread.id.as_str()),
        ("filter[isComment]", "no"),
        ("include", "lastThreeComments"),
    ]);
    let listing = service.list_posts(&Actor::guest(), &p, DeviceClass::Desktop).await.unwrap();
    assert_eq!(listing.view, PostView::Standard);
    assert_eq!(listing.items.len(), 1);
    let latest = listing.items[0].ranked.last_three_comments.as_ref().unwrap();
    assert_eq!(latest.len(), 3);
    assert!(latest.iter().all(|c| c.content.ends_with("...") && c.content.chars().count() == 103));
}

#[tokio::test]
async fn test_highlight_wraps_stop_words() {
    let service = create_test_service();
    let author = add_member(&service, "author").await;
    let thread = save_thread(&service, thread(&author.id, "1")).await;
    let mut flagged = post(&thread.id, &author.id, "buy cheap now", at(1));
    flagged.stop_words = vec!["cheap".to_string()];
    save_post(&service, flagged).await;

    let p = params(&[("filter[thread]", thread.id.as_str()), ("filter[highlight]", "yes")]);
    let listing = service.list_posts(&Actor::guest(), &p, DeviceClass::Desktop).await.unwrap();
    assert_eq!(
        listing.items[0].ranked.post.content,
        "buy <span class=\"highlight\">cheap</span> now"
    );
}

#[tokio::test]
async fn test_unbounded_page_has_no_count() {
    let service = create_test_service();
    let (thread_id, _) = thread_with_posts(&service, 25).await;
    let p = params(&[("filter[thread]", thread_id.as_str()), ("page[limit]", "0")]);
    let listing = service.list_posts(&Actor::guest(), &p, DeviceClass::Desktop).await.unwrap();
    assert_eq!(listing.items.len(), 25);
    assert_eq!(listing.meta.count, None);
    assert_eq!(service.storage().post_count_query_count(), 0);
}
