//! Integration tests for the user repository.

mod common;

use tally_db::UserRepository;
use tally_shared::types::UserId;

#[tokio::test]
async fn test_first_sign_in_creates_user() {
    let db = common::setup_db().await;
    let repo = UserRepository::new(db);

    let (user, created) = repo
        .find_or_create_by_email("alice@example.com")
        .await
        .expect("Failed to sign in");

    assert!(created);
    assert_eq!(user.email, "alice@example.com");

    let found = repo
        .find_by_id(UserId::from_uuid(user.id))
        .await
        .expect("Failed to find user")
        .expect("User should exist");
    assert_eq!(found.email, user.email);
}

#[tokio::test]
async fn test_second_sign_in_reuses_user() {
    let db = common::setup_db().await;
    let repo = UserRepository::new(db);

    let (first, _) = repo.find_or_create_by_email("bob@example.com").await.unwrap();
    let (second, created) = repo.find_or_create_by_email("bob@example.com").await.unwrap();

    assert!(!created);
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn test_unknown_user_lookups() {
    let db = common::setup_db().await;
    let repo = UserRepository::new(db);

    assert!(repo.find_by_email("nobody@example.com").await.unwrap().is_none());
    assert!(repo.find_by_id(UserId::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_record_login_stamps_time() {
    let db = common::setup_db().await;
    let repo = UserRepository::new(db);
    let (user, _) = repo.find_or_create_by_email("carol@example.com").await.unwrap();
    assert!(user.last_login_at.is_none());

    let id = UserId::from_uuid(user.id);
    repo.record_login(id).await.unwrap();

    let found = repo.find_by_id(id).await.unwrap().unwrap();
    assert!(found.last_login_at.is_some());
}
