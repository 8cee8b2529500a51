use crate::core::errors::ForumError;
use crate::core::models::{
    category::{Category, CategoryNode},
    user::{Ability, Actor, Grant, member_grants},
};
use crate::infrastructure::storage::Storage;
use crate::tests::*;

async fn seed_categories(service: &TestService) {
    for (id, parent, sort) in [("1", None, 1), ("2", None, 0), ("3", Some("1"), 1), ("4", Some("1"), 0)] {
        service
            .storage()
            .save_category(Category {
                id: id.to_string(),
                name: format!("Category {}", id),
                description: String::new(),
                icon: String::new(),
                thread_count: 0,
                parent_id: parent.map(str::to_string),
                sort,
            })
            .await
            .unwrap();
    }
}

fn find<'a>(nodes: &'a [CategoryNode], id: &str) -> &'a CategoryNode {
    nodes
        .iter()
        .flat_map(|n| std::iter::once(n).chain(n.children.iter()))
        .find(|n| n.pid == id)
        .unwrap()
}

#[tokio::test]
async fn test_guests_cannot_list_categories() {
    let service = create_test_service();
    let result = service.list_thread_categories(&Actor::guest(), None).await;
    assert!(matches!(result, Err(ForumError::PermissionDenied(_))));
}

#[tokio::test]
async fn test_children_nest_under_parents_in_sort_order() {
    let service = create_test_service();
    seed_categories(&service).await;
    let member = add_member(&service, "member").await;

    let tree = service
        .list_thread_categories(&Actor::user(&member), None)
        .await
        .unwrap();
    let roots: Vec<&str> = tree.iter().map(|n| n.pid.as_str()).collect();
    assert_eq!(roots, ["2", "1"]);
    let children: Vec<&str> = tree[1].children.iter().map(|n| n.pid.as_str()).collect();
    assert_eq!(children, ["4", "3"]);
    assert!(tree[0].children.is_empty());
    assert!(find(&tree, "3").can_create_thread);
    assert!(!find(&tree, "3").can_edit_thread);
}

#[tokio::test]
async fn test_edit_rights_follow_thread_ownership() {
    let service = create_test_service();
    seed_categories(&service).await;
    let author = add_member(&service, "author").await;
    let other = add_member(&service, "other").await;
    let mut moderator_grants = member_grants();
    moderator_grants.push(Grant::in_category(Ability::EditOthersThread, "2"));
    let moderator = add_user(&service, user("moderator", moderator_grants)).await;
    let thread = save_thread(&service, thread(&author.id, "1")).await;

    let tree = service
        .list_thread_categories(&Actor::user(&author), Some(&thread.id))
        .await
        .unwrap();
    assert!(find(&tree, "1").can_edit_thread);
    assert!(find(&tree, "4").can_edit_thread);

    let tree = service
        .list_thread_categories(&Actor::user(&other), Some(&thread.id))
        .await
        .unwrap();
    assert!(!find(&tree, "1").can_edit_thread);

    let tree = service
        .list_thread_categories(&Actor::user(&moderator), Some(&thread.id))
        .await
        .unwrap();
    assert!(find(&tree, "2").can_edit_thread);
    assert!(!find(&tree, "1").can_edit_thread);
}

#[tokio::test]
async fn test_drafts_are_editable_by_their_author_only() {
    let service = create_test_service();
    seed_categories(&service).await;
    let author = add_member(&service, "author").await;
    let other = add_member(&service, "other").await;
    let mut draft = thread(&author.id, "1");
    draft.is_draft = true;
    let draft = save_thread(&service, draft).await;

    let tree = service
        .list_thread_categories(&Actor::user(&author), Some(&draft.id))
        .await
        .unwrap();
    assert!(tree.iter().all(|n| n.can_edit_thread == n.can_create_thread));

    let tree = service
        .list_thread_categories(&Actor::user(&other), Some(&draft.id))
        .await
        .unwrap();
    assert!(tree.iter().all(|n| !n.can_edit_thread));
}

#[tokio::test]
async fn test_unapproved_or_unknown_thread_grants_no_edit() {
    let service = create_test_service();
    seed_categories(&service).await;
    let author = add_member(&service, "author").await;
    let mut pending = thread(&author.id, "1");
    pending.is_approved = false;
    let pending = save_thread(&service, pending).await;

    for thread_id in [pending.id.as_str(), "missing"] {
        let tree = service
            .list_thread_categories(&Actor::user(&author), Some(thread_id))
            .await
            .unwrap();
        assert!(tree.iter().all(|n| !n.can_edit_thread));
    }
}
