//! Full group lifecycle against the in-memory store.

use group_hub_core::error::GroupError;
use group_hub_core::group::GroupInput;
use group_hub_core::repository::{GroupRepository, PAD_PREFIX, USER_PREFIX};
use group_hub_core::store::{KeyValueStore, MemoryStore};
use group_hub_core::user::UserRecord;
use serde_json::json;
use std::sync::Arc;

fn input(value: serde_json::Value) -> GroupInput {
    serde_json::from_value(value).unwrap()
}

async fn seed(store: &MemoryStore, users: &[&str], pads: &[&str]) {
    for id in users {
        store
            .set(&format!("{USER_PREFIX}{id}"), json!({ "groups": [] }))
            .await
            .unwrap();
    }
    for id in pads {
        store
            .set(&format!("{PAD_PREFIX}{id}"), json!({}))
            .await
            .unwrap();
    }
}

async fn groups_of(store: &MemoryStore, user: &str) -> Vec<String> {
    let value = store
        .get(&format!("{USER_PREFIX}{user}"))
        .await
        .unwrap()
        .unwrap();
    serde_json::from_value::<UserRecord>(value).unwrap().groups
}

#[tokio::test]
async fn test_group_lifecycle() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &["alice", "bob", "carol"], &["notes"]).await;
    let repo = GroupRepository::new(store.clone());

    // Create
    let group = repo
        .create(&input(json!({
            "name": "Research",
            "admin": "alice",
            "admins": ["bob"],
            "users": ["carol"],
            "pads": ["notes"],
            "visibility": "private",
            "password": "hunter2"
        })))
        .await
        .unwrap();
    assert_eq!(group.admins, vec!["alice", "bob"]);

    // Read equals what create returned
    assert_eq!(repo.read(&group.id).await.unwrap(), group);

    // Every member carries the back-reference
    for user in ["alice", "bob", "carol"] {
        assert_eq!(groups_of(&store, user).await, vec![group.id.clone()]);
    }

    // Full-replace update drops carol from the membership
    let replaced = repo
        .update(
            &input(json!({"name": "Research", "admin": "alice", "admins": ["bob"]})),
            &group.id,
        )
        .await
        .unwrap();
    assert!(replaced.users.is_empty());
    assert_eq!(replaced.visibility, group_hub_core::group::Visibility::Restricted);

    // Delete removes the record and the remaining back-references
    repo.delete(&group.id).await.unwrap();
    assert!(matches!(
        repo.read(&group.id).await,
        Err(GroupError::NotFound(_))
    ));
    for user in ["alice", "bob"] {
        assert!(groups_of(&store, user).await.is_empty());
    }
}

#[tokio::test]
async fn test_create_rejects_unknown_members() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &["alice"], &[]).await;
    let repo = GroupRepository::new(store.clone());

    let err = repo
        .create(&input(json!({"name": "Ghosts", "admin": "alice", "users": ["nobody"]})))
        .await
        .unwrap_err();
    assert!(matches!(err, GroupError::Reference { missing } if missing == vec!["nobody"]));

    // Nothing was committed
    assert_eq!(store.len().await, 1);
}
