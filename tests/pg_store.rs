//! Postgres-level tests for `PgStore`: the overlap predicate, status enum
//! binding, upserts and the row-locking order of the lifecycle.
//!
//! Each test gets a fresh database with the crate's migrations applied.
//! Run with `DATABASE_URL` pointing at a Postgres server and
//! `cargo test -- --ignored`.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use leave_desk::{
    common::error::AppError,
    db::PgStore,
    models::{
        employee::{Employee, NewEmployee},
        leave::{DateRange, Decision, LeaveRequestDraft, LeaveStatus, LeaveType, NewLeaveRequest},
    },
    services::{
        leave_service::LeaveService,
        notifier::{ApprovalNotifier, ChatChannel, NotificationError},
        period_service::PeriodService,
        store::{LeaveStore, StoreTx},
    },
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct SilentChannel;

#[async_trait]
impl ChatChannel for SilentChannel {
    async fn send(&self, _chat_id: i64, _text: &str) -> Result<(), NotificationError> {
        Ok(())
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn seed(store: &PgStore, username: &str) -> (Employee, LeaveType) {
    let mut tx = store.begin().await.unwrap();
    let employee = tx.insert_employee(&NewEmployee::active(username)).await.unwrap();
    let leave_type = tx
        .insert_leave_type(&format!("Vacation for {username}"), None)
        .await
        .unwrap();
    tx.commit().await.unwrap();
    (employee, leave_type)
}

fn new_request(
    employee: &Employee,
    leave_type: &LeaveType,
    start: NaiveDate,
    end: NaiveDate,
    status: LeaveStatus,
) -> NewLeaveRequest {
    NewLeaveRequest {
        employee_id: employee.id,
        leave_type_id: leave_type.id,
        start_date: start,
        end_date: end,
        number_of_days: i32::try_from((end - start).num_days()).unwrap(),
        comment: None,
        status,
    }
}

// ---------------------------------------------------------------------------
// Test: overlap uses half-open ranges and ignores rejected requests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn test_overlap_predicate(pool: PgPool) {
    let store = PgStore::new(pool);
    let (employee, annual) = seed(&store, "olena").await;

    let mut tx = store.begin().await.unwrap();
    let live = tx
        .insert_request(&new_request(&employee, &annual, date(2030, 8, 1), date(2030, 8, 10), LeaveStatus::Saved))
        .await
        .unwrap();
    tx.insert_request(&new_request(&employee, &annual, date(2030, 9, 1), date(2030, 9, 10), LeaveStatus::Rejected))
        .await
        .unwrap();

    let hits = tx
        .overlapping_requests(employee.id, DateRange::new(date(2030, 8, 5), date(2030, 8, 12)), None)
        .await
        .unwrap();
    assert_eq!(hits.iter().map(|r| r.id).collect::<Vec<_>>(), vec![live.id]);

    let touching = tx
        .overlapping_requests(employee.id, DateRange::new(date(2030, 8, 10), date(2030, 8, 15)), None)
        .await
        .unwrap();
    assert!(touching.is_empty(), "ranges touching at the boundary do not overlap");

    let over_rejected = tx
        .overlapping_requests(employee.id, DateRange::new(date(2030, 9, 2), date(2030, 9, 4)), None)
        .await
        .unwrap();
    assert!(over_rejected.is_empty(), "rejected requests are not live");

    let excluding_self = tx
        .overlapping_requests(employee.id, DateRange::new(date(2030, 8, 5), date(2030, 8, 12)), Some(live.id))
        .await
        .unwrap();
    assert!(excluding_self.is_empty());
}

// ---------------------------------------------------------------------------
// Test: status enum binds and reads back through save and the pending queue
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn test_status_round_trips_through_postgres(pool: PgPool) {
    let store = PgStore::new(pool);
    let (employee, annual) = seed(&store, "olena").await;

    let mut tx = store.begin().await.unwrap();
    let mut request = tx
        .insert_request(&new_request(&employee, &annual, date(2030, 8, 1), date(2030, 8, 6), LeaveStatus::Saved))
        .await
        .unwrap();
    request.status = LeaveStatus::Pending;
    tx.save_request(&request).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let read = tx.request(request.id).await.unwrap().unwrap();
    assert_eq!(read.status, LeaveStatus::Pending);
    assert_eq!(read.number_of_days, 5);
    let pending = tx.pending_requests().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, request.id);
}

// ---------------------------------------------------------------------------
// Test: balance and reset upserts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn test_balance_and_reset_upserts(pool: PgPool) {
    let store = PgStore::new(pool);
    let (employee, _) = seed(&store, "olena").await;

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.lock_balance(employee.id).await.unwrap().days, 0);
    assert_eq!(tx.lock_balance(employee.id).await.unwrap().days, 0);
    assert_eq!(tx.set_balance(employee.id, 4).await.unwrap().days, 4);
    assert_eq!(tx.set_balance(employee.id, 6).await.unwrap().days, 6);
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.balance(employee.id).await.unwrap().unwrap().days, 6);
    assert!(tx.claim_period_reset(date(2031, 1, 1)).await.unwrap());
    assert!(!tx.claim_period_reset(date(2031, 1, 1)).await.unwrap());
    tx.commit().await.unwrap();
}

// ---------------------------------------------------------------------------
// Test: a second reset of the same boundary changes nothing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn test_period_reset_is_idempotent(pool: PgPool) {
    let store = PgStore::new(pool);
    let (employee, annual) = seed(&store, "olena").await;

    let mut tx = store.begin().await.unwrap();
    tx.insert_request(&new_request(&employee, &annual, date(2030, 8, 1), date(2030, 8, 6), LeaveStatus::Approved))
        .await
        .unwrap();
    tx.set_balance(employee.id, 5).await.unwrap();
    tx.commit().await.unwrap();

    let periods = PeriodService::new(store.clone());
    let first = periods.reset(date(2031, 1, 1)).await.unwrap();
    assert_eq!(first.requests_expired, 1);
    let again = periods.reset(date(2031, 1, 1)).await.unwrap();
    assert_eq!(again.requests_expired, 0);
    assert_eq!(again.balances_reset, 0);

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.balance(employee.id).await.unwrap().unwrap().days, 0);
    assert_eq!(tx.approved_unexpired_days(employee.id).await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Test: the balance row serialises an employee's mutations
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn test_balance_lock_blocks_other_mutations(pool: PgPool) {
    let store = PgStore::new(pool);
    let (employee, annual) = seed(&store, "olena").await;
    let manager = {
        let mut tx = store.begin().await.unwrap();
        let manager = tx.insert_employee(&NewEmployee::active("boss")).await.unwrap();
        tx.commit().await.unwrap();
        manager
    };
    let notifier = ApprovalNotifier::new(Arc::new(SilentChannel), Duration::from_millis(50));
    let leave = LeaveService::new(store.clone(), notifier);
    let today = date(2030, 7, 1);

    let draft = LeaveRequestDraft {
        leave_type_id: annual.id,
        start_date: date(2030, 8, 1),
        end_date: date(2030, 8, 6),
        comment: None,
    };
    let request = leave.create(&employee, draft, today).await.unwrap();
    leave.submit(&employee, request.id, today).await.unwrap();

    // Hold the owner's balance row; a decision must queue behind it.
    let mut holder = store.begin().await.unwrap();
    holder.lock_balance(employee.id).await.unwrap();

    let decide = tokio::spawn({
        let leave = leave.clone();
        async move { leave.decide(&manager, request.id, Decision::Approved).await }
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!decide.is_finished(), "decide must wait for the balance row");

    holder.commit().await.unwrap();
    let decided = tokio::time::timeout(Duration::from_secs(5), decide)
        .await
        .expect("decide finishes once the row is released")
        .unwrap()
        .unwrap();
    assert_eq!(decided.status, LeaveStatus::Approved);

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.balance(employee.id).await.unwrap().unwrap().days, 5);
}

// ---------------------------------------------------------------------------
// Test: a duplicate chat identity maps to a retryable error
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn test_duplicate_telegram_id_is_reported(pool: PgPool) {
    let store = PgStore::new(pool);

    let mut tx = store.begin().await.unwrap();
    tx.insert_employee(&NewEmployee {
        telegram_id: Some(4242),
        ..NewEmployee::active("olena")
    })
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let duplicate = tx
        .insert_employee(&NewEmployee {
            telegram_id: Some(4242),
            ..NewEmployee::active("olena_1")
        })
        .await;
    assert_matches!(duplicate, Err(AppError::ChatIdentityTaken(4242)));

    let mut tx = store.begin().await.unwrap();
    let taken = tx.insert_employee(&NewEmployee::active("olena")).await;
    assert_matches!(taken, Err(AppError::UsernameTaken(_)));
}
