//! Integration tests for the user directory against Postgres.

mod common;

use std::sync::Arc;

use rust_decimal_macros::dec;
use tally_core::auth::{Authenticator, CreateUserInput, UpdateUserInput, UserDirectory, UserRole};
use tally_core::ledger::{
    CashRegisterStore, LedgerError, OpenSessionInput, SessionLedger, TransactionJournal,
};
use tally_db::UserRepository;

#[tokio::test]
async fn test_create_and_authenticate() {
    let store = common::store().await;
    let directory = UserDirectory::new(Arc::clone(&store));

    let user = directory
        .create_user(CreateUserInput {
            username: "  maria ".to_string(),
            password: "s3cret".to_string(),
            role: UserRole::Operator,
            display_name: Some("Maria S.".to_string()),
        })
        .await
        .expect("create");

    assert_eq!(user.username, "maria");
    assert_eq!(user.effective_display_name(), "Maria S.");
    assert!(user.is_active);

    let authenticated = directory
        .authenticate("maria", "s3cret")
        .await
        .expect("authenticate")
        .expect("valid credentials");
    assert_eq!(authenticated.id, user.id);

    assert!(directory.authenticate("maria", "wrong").await.expect("auth").is_none());
    assert!(directory.authenticate("nobody", "s3cret").await.expect("auth").is_none());
}

#[tokio::test]
async fn test_stored_hash_is_not_plaintext() {
    let db = common::database().await;
    let directory = UserDirectory::new(Arc::new(tally_db::SeaOrmStore::new(db.clone())));
    let repo = UserRepository::new(db);

    directory
        .create_user(CreateUserInput {
            username: "maria".to_string(),
            password: "s3cret".to_string(),
            role: UserRole::Operator,
            display_name: None,
        })
        .await
        .expect("create");

    let row = repo
        .find_by_username("maria")
        .await
        .expect("query")
        .expect("row exists");
    assert_ne!(row.password_hash, "s3cret");
    assert!(row.password_hash.starts_with("$argon2id$"));
}

#[tokio::test]
async fn test_duplicate_username_rejected() {
    let store = common::store().await;
    common::create_user(&store, "maria", UserRole::Operator).await;
    let directory = UserDirectory::new(Arc::clone(&store));

    let err = directory
        .create_user(CreateUserInput {
            username: "maria".to_string(),
            password: "other".to_string(),
            role: UserRole::Supervisor,
            display_name: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::UsernameTaken(name) if name == "maria"));
}

#[tokio::test]
async fn test_deactivated_user_cannot_log_in() {
    let store = common::store().await;
    let user = common::create_user(&store, "maria", UserRole::Operator).await;
    let directory = UserDirectory::new(Arc::clone(&store));

    let updated = directory
        .update_user(
            user.id,
            UpdateUserInput {
                is_active: Some(false),
                ..UpdateUserInput::default()
            },
        )
        .await
        .expect("update");
    assert!(!updated.is_active);

    let result = directory
        .authenticate("maria", "correct horse")
        .await
        .expect("authenticate");
    assert!(result.is_none());
}

#[tokio::test]
async fn test_update_role_password_and_display_name() {
    let store = common::store().await;
    let user = common::create_user(&store, "maria", UserRole::Operator).await;
    let directory = UserDirectory::new(Arc::clone(&store));

    let updated = directory
        .update_user(
            user.id,
            UpdateUserInput {
                password: Some("new pass".to_string()),
                role: Some(UserRole::Supervisor),
                display_name: Some("Maria".to_string()),
                is_active: None,
            },
        )
        .await
        .expect("update");

    assert_eq!(updated.role, UserRole::Supervisor);
    assert_eq!(updated.display_name.as_deref(), Some("Maria"));
    assert!(directory.authenticate("maria", "new pass").await.expect("auth").is_some());
    assert!(directory.authenticate("maria", "correct horse").await.expect("auth").is_none());

    let cleared = directory
        .update_user(
            user.id,
            UpdateUserInput {
                display_name: Some(String::new()),
                ..UpdateUserInput::default()
            },
        )
        .await
        .expect("clear display name");
    assert!(cleared.display_name.is_none());
}

#[tokio::test]
async fn test_list_users_ordered_by_username() {
    let store = common::store().await;
    common::create_user(&store, "zoe", UserRole::Operator).await;
    common::create_user(&store, "admin", UserRole::Supervisor).await;
    common::create_user(&store, "maria", UserRole::Operator).await;
    let directory = UserDirectory::new(Arc::clone(&store));

    let names: Vec<_> = directory
        .list_users()
        .await
        .expect("list")
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert_eq!(names, vec!["admin", "maria", "zoe"]);
}

#[tokio::test]
async fn test_delete_user_cascades_sessions_and_entries() {
    let store = common::store().await;
    let user = common::create_user(&store, "maria", UserRole::Operator).await;
    let ledger = SessionLedger::new(Arc::clone(&store));
    let journal = TransactionJournal::new(Arc::clone(&store));
    let directory = UserDirectory::new(Arc::clone(&store));

    let session = ledger
        .open(OpenSessionInput {
            user_id: user.id,
            opening_cash: dec!(100),
            opening_flexi_balance: dec!(0),
            notes: None,
        })
        .await
        .expect("open");
    journal.record_expense(session.id, dec!(5), "bread").await.expect("expense");
    journal.record_flexi(session.id, dec!(7), false, None).await.expect("flexi");

    assert!(directory.delete_user(user.id).await.expect("delete"));
    assert!(!directory.delete_user(user.id).await.expect("second delete"));

    assert!(store.find_session(session.id).await.expect("find").is_none());
    assert!(store.expenses_for(session.id).await.expect("expenses").is_empty());
    assert!(store.flexi_entries_for(session.id).await.expect("flexi").is_empty());
    let err = directory.user(user.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::UserNotFound(_)));
}
