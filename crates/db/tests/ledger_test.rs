//! Integration tests for sessions and entries against Postgres.

mod common;

use std::sync::Arc;

use std::time::Duration;

use futures::future::join_all;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, SqlErr, TransactionTrait};
use tally_core::auth::UserRole;
use tally_core::ledger::{
    CashRegisterStore, CloseSessionInput, LedgerError, OpenSessionInput, ReclosePolicy,
    SessionFilter, SessionLedger, TransactionJournal,
};
use tally_db::SeaOrmStore;
use tally_db::entities::cash_sessions;
use tally_shared::types::{CashSessionId, DateWindow, UserId};
use tokio::sync::Barrier;
use uuid::Uuid;

fn open_input(user_id: UserId) -> OpenSessionInput {
    OpenSessionInput {
        user_id,
        opening_cash: dec!(100),
        opening_flexi_balance: dec!(50),
        notes: None,
    }
}

fn close_input(cash: rust_decimal::Decimal, flexi: rust_decimal::Decimal) -> CloseSessionInput {
    CloseSessionInput {
        closing_cash: cash,
        closing_flexi_balance: flexi,
        notes: None,
    }
}

#[tokio::test]
async fn test_open_session_persists_opening_figures() {
    let store = common::store().await;
    let user = common::create_user(&store, "maria", UserRole::Operator).await;
    let ledger = SessionLedger::new(Arc::clone(&store));

    let session = ledger.open(open_input(user.id)).await.expect("open");

    assert!(session.is_open());
    assert_eq!(session.opening_cash, dec!(100));
    assert_eq!(session.closing_cash, dec!(100));
    assert_eq!(session.closing_flexi_balance, dec!(50));

    let active = ledger
        .active_session_for(user.id)
        .await
        .expect("active")
        .expect("should have an open session");
    assert_eq!(active.id, session.id);
}

#[tokio::test]
async fn test_second_open_is_rejected() {
    let store = common::store().await;
    let user = common::create_user(&store, "maria", UserRole::Operator).await;
    let ledger = SessionLedger::new(Arc::clone(&store));

    ledger.open(open_input(user.id)).await.expect("first open");
    let err = ledger.open(open_input(user.id)).await.unwrap_err();

    assert!(matches!(err, LedgerError::SessionConflict(id) if id == user.id));
    assert_eq!(store.open_sessions_for(user.id).await.expect("list").len(), 1);
}

#[tokio::test]
async fn test_open_for_unknown_user_fails() {
    let store = common::store().await;
    let ledger = SessionLedger::new(store);

    let err = ledger.open(open_input(UserId::new())).await.unwrap_err();
    assert!(matches!(err, LedgerError::UserNotFound(_)));
}

#[tokio::test]
async fn test_concurrent_opens_leave_one_session() {
    let store = common::store().await;
    let user = common::create_user(&store, "maria", UserRole::Operator).await;
    let ledger = Arc::new(SessionLedger::new(Arc::clone(&store)));

    let attempts = 8;
    let barrier = Arc::new(Barrier::new(attempts));
    let handles = (0..attempts).map(|_| {
        let ledger = Arc::clone(&ledger);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            ledger.open(open_input(user.id)).await
        })
    });

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let opened = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::SessionConflict(_))))
        .count();

    assert_eq!(opened, 1);
    assert_eq!(conflicts, attempts - 1);
    assert_eq!(store.open_sessions_for(user.id).await.expect("list").len(), 1);
}

fn open_row(user_id: UserId) -> cash_sessions::ActiveModel {
    let now = chrono::Utc::now();
    cash_sessions::ActiveModel {
        id: Set(Uuid::now_v7()),
        user_id: Set(user_id.into_inner()),
        opened_at: Set(now.into()),
        closed_at: Set(None),
        opening_cash: Set(dec!(100)),
        closing_cash: Set(dec!(100)),
        opening_flexi_balance: Set(dec!(0)),
        closing_flexi_balance: Set(dec!(0)),
        notes: Set(None),
    }
}

#[tokio::test]
async fn test_unique_index_rejects_second_open_row() {
    let db = common::database().await;
    let store = Arc::new(SeaOrmStore::new(db.clone()));
    let user = common::create_user(&store, "maria", UserRole::Operator).await;

    open_row(user.id).insert(&db).await.expect("first open row");
    let err = open_row(user.id).insert(&db).await.unwrap_err();

    assert!(matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))));

    let closed = cash_sessions::ActiveModel {
        closed_at: Set(Some(chrono::Utc::now().into())),
        ..open_row(user.id)
    };
    closed.insert(&db).await.expect("closed rows are not constrained");
}

/// Holds an uncommitted open row so the ledger's existence check passes and
/// its insert waits on the unique index until the row commits.
async fn open_behind_pending_insert(
    db: &DatabaseConnection,
    store: Arc<SeaOrmStore>,
    user: UserId,
) {
    let txn = db.begin().await.expect("begin");
    open_row(user).insert(&txn).await.expect("pending open row");

    let ledger = SessionLedger::new(store);
    let racing = tokio::spawn(async move { ledger.open(open_input(user)).await });
    tokio::time::sleep(Duration::from_millis(300)).await;
    txn.commit().await.expect("commit");

    let err = racing.await.expect("task panicked").unwrap_err();
    assert!(matches!(err, LedgerError::SessionConflict(id) if id == user));
}

#[tokio::test]
async fn test_open_losing_index_race_is_conflict() {
    let db = common::database().await;
    let store = Arc::new(SeaOrmStore::new(db.clone()));
    let user = common::create_user(&store, "maria", UserRole::Operator).await;

    open_behind_pending_insert(&db, Arc::clone(&store), user.id).await;

    assert_eq!(store.open_sessions_for(user.id).await.expect("list").len(), 1);
}

#[tokio::test]
async fn test_amounts_round_trip_exactly() {
    let store = common::store().await;
    let user = common::create_user(&store, "maria", UserRole::Operator).await;
    let ledger = SessionLedger::new(Arc::clone(&store));
    let journal = TransactionJournal::new(Arc::clone(&store));

    let session = ledger
        .open(OpenSessionInput {
            opening_cash: dec!(123456789012345.6789),
            ..open_input(user.id)
        })
        .await
        .expect("open");
    journal
        .record_expense(session.id, dec!(98765432109876.5432), "safe deposit")
        .await
        .expect("expense");
    journal
        .record_expense(session.id, dec!(0.0001), "rounding")
        .await
        .expect("expense");

    let stored = ledger.session(session.id).await.expect("session");
    assert_eq!(stored.opening_cash, dec!(123456789012345.6789));

    let expenses = journal.expenses_for(session.id).await.expect("expenses");
    assert_eq!(expenses[0].amount, dec!(98765432109876.5432));
    assert_eq!(expenses[1].amount, dec!(0.0001));

    let detail = ledger.session_detail(session.id).await.expect("detail");
    assert_eq!(detail.balance.total_expense, dec!(98765432109876.5433));
}

#[tokio::test]
async fn test_close_records_figures_and_allows_reopen() {
    let store = common::store().await;
    let user = common::create_user(&store, "maria", UserRole::Operator).await;
    let ledger = SessionLedger::new(Arc::clone(&store));

    let session = ledger.open(open_input(user.id)).await.expect("open");
    let closed = ledger
        .close(
            session.id,
            CloseSessionInput {
                closing_cash: dec!(80),
                closing_flexi_balance: dec!(10),
                notes: Some("end of shift".to_string()),
            },
        )
        .await
        .expect("close");

    assert!(!closed.is_open());
    assert!(closed.closed_at.expect("closed_at") >= closed.opened_at);
    assert_eq!(closed.closing_cash, dec!(80));
    assert_eq!(closed.closing_flexi_balance, dec!(10));
    assert_eq!(closed.notes.as_deref(), Some("end of shift"));

    assert!(ledger.active_session_for(user.id).await.expect("active").is_none());
    ledger.open(open_input(user.id)).await.expect("reopen after close");
}

#[tokio::test]
async fn test_close_blank_notes_keep_existing() {
    let store = common::store().await;
    let user = common::create_user(&store, "maria", UserRole::Operator).await;
    let ledger = SessionLedger::new(Arc::clone(&store));

    let session = ledger
        .open(OpenSessionInput {
            notes: Some("float counted twice".to_string()),
            ..open_input(user.id)
        })
        .await
        .expect("open");
    let closed = ledger
        .close(
            session.id,
            CloseSessionInput {
                notes: Some("   ".to_string()),
                ..close_input(dec!(100), dec!(50))
            },
        )
        .await
        .expect("close");

    assert_eq!(closed.notes.as_deref(), Some("float counted twice"));
}

#[tokio::test]
async fn test_reclose_rejected_by_default() {
    let store = common::store().await;
    let user = common::create_user(&store, "maria", UserRole::Operator).await;
    let ledger = SessionLedger::new(Arc::clone(&store));

    let session = ledger.open(open_input(user.id)).await.expect("open");
    ledger
        .close(session.id, close_input(dec!(80), dec!(10)))
        .await
        .expect("close");

    let err = ledger
        .close(session.id, close_input(dec!(90), dec!(20)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyClosed(id) if id == session.id));

    let stored = ledger.session(session.id).await.expect("session");
    assert_eq!(stored.closing_cash, dec!(80));
}

#[tokio::test]
async fn test_reclose_overwrites_when_allowed() {
    let store = common::store().await;
    let user = common::create_user(&store, "maria", UserRole::Operator).await;
    let ledger = SessionLedger::with_policy(Arc::clone(&store), ReclosePolicy::Overwrite);

    let session = ledger.open(open_input(user.id)).await.expect("open");
    ledger
        .close(session.id, close_input(dec!(80), dec!(10)))
        .await
        .expect("close");
    let reclosed = ledger
        .close(session.id, close_input(dec!(90), dec!(20)))
        .await
        .expect("reclose");

    assert_eq!(reclosed.closing_cash, dec!(90));
    assert_eq!(reclosed.closing_flexi_balance, dec!(20));
}

#[tokio::test]
async fn test_store_close_is_conditional_on_open() {
    let store = common::store().await;
    let user = common::create_user(&store, "maria", UserRole::Operator).await;
    let ledger = SessionLedger::new(Arc::clone(&store));
    let session = ledger.open(open_input(user.id)).await.expect("open");

    let closing = tally_core::ledger::SessionClosing {
        closed_at: chrono::Utc::now(),
        closing_cash: dec!(80),
        closing_flexi_balance: dec!(10),
        notes: None,
    };
    store
        .close_session(session.id, closing.clone(), ReclosePolicy::Reject)
        .await
        .expect("first close");
    let err = store
        .close_session(session.id, closing, ReclosePolicy::Reject)
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::AlreadyClosed(_)));
}

#[tokio::test]
async fn test_close_unknown_session_fails() {
    let store = common::store().await;
    let ledger = SessionLedger::new(store);

    let err = ledger
        .close(CashSessionId::new(), close_input(dec!(1), dec!(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::SessionNotFound(_)));
}

#[tokio::test]
async fn test_journal_records_entries_in_order() {
    let store = common::store().await;
    let user = common::create_user(&store, "maria", UserRole::Operator).await;
    let ledger = SessionLedger::new(Arc::clone(&store));
    let journal = TransactionJournal::new(Arc::clone(&store));

    let session = ledger.open(open_input(user.id)).await.expect("open");
    journal
        .record_expense(session.id, dec!(15), "milk")
        .await
        .expect("expense");
    journal
        .record_expense(session.id, dec!(0), "free sample")
        .await
        .expect("zero expense");
    journal
        .record_flexi(session.id, dec!(20), true, None)
        .await
        .expect("settled flexi");
    journal
        .record_flexi(session.id, dec!(30), false, Some("table 4".to_string()))
        .await
        .expect("unsettled flexi");

    let expenses = journal.expenses_for(session.id).await.expect("expenses");
    assert_eq!(expenses.len(), 2);
    assert_eq!(expenses[0].description, "milk");
    assert_eq!(expenses[0].amount, dec!(15));

    let flexi = journal.flexi_entries_for(session.id).await.expect("flexi");
    assert_eq!(flexi.len(), 2);
    assert!(flexi[0].is_settled);
    assert_eq!(flexi[1].notes.as_deref(), Some("table 4"));
}

#[tokio::test]
async fn test_journal_rejects_negative_amount_without_writing() {
    let store = common::store().await;
    let user = common::create_user(&store, "maria", UserRole::Operator).await;
    let ledger = SessionLedger::new(Arc::clone(&store));
    let journal = TransactionJournal::new(Arc::clone(&store));
    let session = ledger.open(open_input(user.id)).await.expect("open");

    let err = journal
        .record_expense(session.id, dec!(-1), "refund")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));

    let err = journal
        .record_flexi(session.id, dec!(-5), false, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));

    assert!(journal.expenses_for(session.id).await.expect("expenses").is_empty());
    assert!(journal.flexi_entries_for(session.id).await.expect("flexi").is_empty());
}

#[tokio::test]
async fn test_journal_unknown_session_fails() {
    let store = common::store().await;
    let journal = TransactionJournal::new(store);

    let err = journal
        .record_expense(CashSessionId::new(), dec!(5), "bread")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::SessionNotFound(_)));
}

#[tokio::test]
async fn test_session_detail_includes_balance() {
    let store = common::store().await;
    let user = common::create_user(&store, "maria", UserRole::Operator).await;
    let ledger = SessionLedger::new(Arc::clone(&store));
    let journal = TransactionJournal::new(Arc::clone(&store));

    let session = ledger.open(open_input(user.id)).await.expect("open");
    journal.record_expense(session.id, dec!(15), "milk").await.expect("expense");
    journal.record_flexi(session.id, dec!(20), true, None).await.expect("flexi");
    journal.record_flexi(session.id, dec!(30), false, None).await.expect("flexi");
    ledger
        .close(session.id, close_input(dec!(80), dec!(10)))
        .await
        .expect("close");

    let detail = ledger.session_detail(session.id).await.expect("detail");
    assert_eq!(detail.expenses.len(), 1);
    assert_eq!(detail.flexi_entries.len(), 2);
    assert_eq!(detail.balance.total_expense, dec!(15));
    assert_eq!(detail.balance.total_flexi_additions, dec!(50));
    assert_eq!(detail.balance.total_flexi_settled, dec!(20));
    assert_eq!(detail.balance.net_cash_difference, dec!(-15));
    assert_eq!(detail.balance.flexi_consumed, dec!(40));
}

#[tokio::test]
async fn test_sessions_filtered_by_owner_newest_first() {
    let store = common::store().await;
    let maria = common::create_user(&store, "maria", UserRole::Operator).await;
    let juan = common::create_user(&store, "juan", UserRole::Operator).await;
    let ledger = SessionLedger::new(Arc::clone(&store));

    let first = ledger.open(open_input(maria.id)).await.expect("open");
    ledger
        .close(first.id, close_input(dec!(100), dec!(50)))
        .await
        .expect("close");
    let second = ledger.open(open_input(maria.id)).await.expect("open");
    ledger.open(open_input(juan.id)).await.expect("open");

    let marias = ledger
        .sessions(SessionFilter::for_user(maria.id, DateWindow::unbounded()))
        .await
        .expect("sessions");
    let ids: Vec<_> = marias.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    let all = ledger
        .sessions(SessionFilter::all(DateWindow::unbounded()))
        .await
        .expect("sessions");
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_sessions_outside_window_are_excluded() {
    let store = common::store().await;
    let user = common::create_user(&store, "maria", UserRole::Operator).await;
    let ledger = SessionLedger::new(Arc::clone(&store));
    ledger.open(open_input(user.id)).await.expect("open");

    let now = chrono::Utc::now();
    let future = DateWindow::new(Some(now + chrono::Duration::days(1)), None);
    let around = DateWindow::new(
        Some(now - chrono::Duration::hours(1)),
        Some(now + chrono::Duration::hours(1)),
    );

    assert!(ledger.sessions(SessionFilter::all(future)).await.expect("sessions").is_empty());
    assert_eq!(ledger.sessions(SessionFilter::all(around)).await.expect("sessions").len(), 1);
}
