use std::path::PathBuf;

use ulid::Ulid;

use super::rules::*;
use super::{Engine, EngineError};
use crate::model::*;
use crate::wal::Wal;

fn test_wal_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("rsvd_test_engine");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{name}.wal"));
    let _ = std::fs::remove_file(&path);
    path
}

fn engine(name: &str) -> Engine {
    Engine::new(test_wal_path(name)).unwrap()
}

/// Draft with the stay expressed in day offsets from today.
fn draft(guest: &str, start_offset: i64, end_offset: i64) -> ReservationDraft {
    let today = today_utc();
    ReservationDraft {
        stay: Stay::new(today + start_offset, today + end_offset),
        reserved_by: guest.into(),
    }
}

fn validation_messages(err: EngineError) -> Vec<String> {
    match err {
        EngineError::Validation(errors) => errors,
        other => panic!("expected Validation, got {other:?}"),
    }
}

// ── creation ─────────────────────────────────────────────

#[tokio::test]
async fn create_returns_persisted_record() {
    let engine = engine("create_ok");
    let created = engine
        .create_reservation(draft("John Doe", 2, 5))
        .await
        .unwrap();

    assert_eq!(created.reserved_by, "John Doe");
    assert!(!created.canceled);
    assert_eq!(created.modified_at, created.created_at);
    assert!(created.created_at > 0);

    // The assigned identifier resolves back to the same record.
    let stored = engine.get_reservation(&created.id).await.unwrap();
    assert_eq!(stored, created);
}

#[tokio::test]
async fn create_assigns_distinct_identifiers() {
    let engine = engine("create_ids");
    let a = engine
        .create_reservation(draft("John Doe", 2, 3))
        .await
        .unwrap();
    let b = engine
        .create_reservation(draft("Jane Doe", 10, 11))
        .await
        .unwrap();
    assert_ne!(a.id, b.id);
}

#[tokio::test]
async fn create_rejects_contained_period() {
    let engine = engine("create_contained");
    engine
        .create_reservation(draft("John Doe", 4, 6))
        .await
        .unwrap();

    // Requested window swallows the existing stay.
    let err = engine
        .create_reservation(draft("Jane Doe", 1, 10))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Conflict);

    // Exact same window is also a containment conflict.
    let err = engine
        .create_reservation(draft("Jane Doe", 4, 6))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Conflict);
}

#[tokio::test]
async fn create_allows_edge_overlap() {
    // The containment policy does not see a stay that straddles the
    // requested window, so the overlapping booking goes through.
    let engine = engine("create_edge_overlap");
    engine
        .create_reservation(draft("John Doe", 2, 5))
        .await
        .unwrap();
    engine
        .create_reservation(draft("Jane Doe", 4, 7))
        .await
        .unwrap();
    assert_eq!(engine.list_active().await.len(), 2);
}

#[tokio::test]
async fn availability_is_checked_before_validation() {
    let engine = engine("avail_first");
    engine
        .create_reservation(draft("John Doe", 4, 6))
        .await
        .unwrap();

    // Structurally broken draft over an unavailable window: the conflict
    // reports alone, validation never runs.
    let mut bad = draft("", 1, 10);
    bad.reserved_by.clear();
    let err = engine.create_reservation(bad).await.unwrap_err();
    assert_eq!(err, EngineError::Conflict);
}

#[tokio::test]
async fn create_rejects_same_day_start() {
    let engine = engine("same_day");
    let errors = validation_messages(
        engine
            .create_reservation(draft("John Doe", 0, 1))
            .await
            .unwrap_err(),
    );
    assert_eq!(errors, vec![MSG_NEXT_DAY.to_string()]);
}

#[tokio::test]
async fn create_rejects_too_far_ahead() {
    let engine = engine("too_far");
    let errors = validation_messages(
        engine
            .create_reservation(draft("Jane Doe", 31, 32))
            .await
            .unwrap_err(),
    );
    assert_eq!(errors, vec![MSG_ADVANCE_LIMIT.to_string()]);
}

#[tokio::test]
async fn create_rejects_stay_over_three_days() {
    let engine = engine("too_long");
    let errors = validation_messages(
        engine
            .create_reservation(draft("Joao Silva", 2, 6))
            .await
            .unwrap_err(),
    );
    assert_eq!(errors, vec![MSG_STAY_LIMIT.to_string()]);
}

#[tokio::test]
async fn create_rejects_missing_guest() {
    let engine = engine("no_guest");
    let errors = validation_messages(
        engine
            .create_reservation(draft("", 2, 3))
            .await
            .unwrap_err(),
    );
    assert_eq!(errors, vec![MSG_MISSING_GUEST.to_string()]);
}

#[tokio::test]
async fn create_collects_every_violation() {
    let engine = engine("collects_all");
    let errors = validation_messages(
        engine
            .create_reservation(draft("", 0, -2))
            .await
            .unwrap_err(),
    );
    assert_eq!(
        errors,
        vec![
            MSG_NEXT_DAY.to_string(),
            MSG_INVALID_PERIOD.to_string(),
            MSG_MISSING_GUEST.to_string(),
        ]
    );
}

#[tokio::test]
async fn nothing_is_persisted_on_rejection() {
    let engine = engine("nothing_persisted");
    let _ = engine.create_reservation(draft("", 2, 9)).await;
    assert!(engine.list_active().await.is_empty());
}

// ── consecutive-stay cap ─────────────────────────────────

#[tokio::test]
async fn back_to_back_stays_over_cap_rejected() {
    let engine = engine("consecutive_after");
    engine
        .create_reservation(draft("John Doe", 2, 5))
        .await
        .unwrap();

    // Starts the day after the existing stay ends: 3 + 3 > 3.
    let errors = validation_messages(
        engine
            .create_reservation(draft("John Doe", 6, 9))
            .await
            .unwrap_err(),
    );
    assert_eq!(errors, vec![MSG_CONSECUTIVE_LIMIT.to_string()]);
}

#[tokio::test]
async fn back_to_back_before_existing_rejected() {
    let engine = engine("consecutive_before");
    engine
        .create_reservation(draft("John Doe", 6, 9))
        .await
        .unwrap();

    // Ends the day before the existing stay starts.
    let errors = validation_messages(
        engine
            .create_reservation(draft("John Doe", 2, 5))
            .await
            .unwrap_err(),
    );
    assert_eq!(errors, vec![MSG_CONSECUTIVE_LIMIT.to_string()]);
}

#[tokio::test]
async fn one_day_gap_accepted() {
    let engine = engine("gap_ok");
    engine
        .create_reservation(draft("John Doe", 2, 5))
        .await
        .unwrap();
    engine
        .create_reservation(draft("John Doe", 7, 10))
        .await
        .unwrap();
    assert_eq!(engine.list_by_guest("John Doe").await.len(), 2);
}

#[tokio::test]
async fn other_guests_do_not_count() {
    let engine = engine("other_guest");
    engine
        .create_reservation(draft("John Doe", 2, 5))
        .await
        .unwrap();
    engine
        .create_reservation(draft("Jane Doe", 6, 9))
        .await
        .unwrap();
}

#[tokio::test]
async fn cancelled_stays_do_not_count() {
    let engine = engine("cancelled_neighbor");
    let existing = engine
        .create_reservation(draft("John Doe", 2, 5))
        .await
        .unwrap();
    engine.cancel_reservation(existing.id).await.unwrap();

    // The cancelled neighbor no longer caps the guest.
    engine
        .create_reservation(draft("John Doe", 6, 9))
        .await
        .unwrap();
}

// ── modification ─────────────────────────────────────────

#[tokio::test]
async fn modify_updates_dates() {
    let engine = engine("modify_ok");
    let created = engine
        .create_reservation(draft("John Doe", 2, 4))
        .await
        .unwrap();

    let updated = engine
        .modify_reservation(created.id, draft("John Doe", 10, 12))
        .await
        .unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.stay, draft("John Doe", 10, 12).stay);
    assert_eq!(updated.created_at, created.created_at);

    let stored = engine.get_reservation(&created.id).await.unwrap();
    assert_eq!(stored.stay, updated.stay);
}

#[tokio::test]
async fn modify_does_not_recheck_availability() {
    let engine = engine("modify_no_recheck");
    let a = engine
        .create_reservation(draft("John Doe", 2, 4))
        .await
        .unwrap();
    engine
        .create_reservation(draft("Jane Doe", 10, 12))
        .await
        .unwrap();

    // Moving A exactly onto B's window would fail the creation-path
    // availability check; the modification path accepts it.
    engine
        .modify_reservation(a.id, draft("John Doe", 10, 12))
        .await
        .unwrap();
}

#[tokio::test]
async fn modify_does_not_recheck_consecutive_cap() {
    let engine = engine("modify_no_consecutive");
    let a = engine
        .create_reservation(draft("John Doe", 2, 5))
        .await
        .unwrap();
    engine
        .create_reservation(draft("John Doe", 10, 13))
        .await
        .unwrap();

    // Back-to-back with the second stay after the move: accepted anyway.
    engine
        .modify_reservation(a.id, draft("John Doe", 14, 17))
        .await
        .unwrap();
}

#[tokio::test]
async fn modify_rejects_guest_change() {
    let engine = engine("modify_guest");
    let created = engine
        .create_reservation(draft("John Doe", 2, 4))
        .await
        .unwrap();

    let err = engine
        .modify_reservation(created.id, draft("Jane Doe", 10, 12))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::GuestMismatch);

    // Dates untouched.
    let stored = engine.get_reservation(&created.id).await.unwrap();
    assert_eq!(stored.stay, created.stay);
}

#[tokio::test]
async fn modify_unknown_id_not_found() {
    let engine = engine("modify_missing");
    let id = Ulid::new();
    let err = engine
        .modify_reservation(id, draft("John Doe", 2, 4))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound(id));
}

#[tokio::test]
async fn modify_validates_before_lookup() {
    let engine = engine("modify_validate_first");
    // Unknown id AND invalid payload: validation reports first.
    let err = engine
        .modify_reservation(Ulid::new(), draft("John Doe", 2, 9))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation(vec![MSG_STAY_LIMIT.to_string()])
    );
}

// ── cancellation ─────────────────────────────────────────

#[tokio::test]
async fn cancel_flags_without_deleting() {
    let engine = engine("cancel_ok");
    let created = engine
        .create_reservation(draft("John Doe", 2, 4))
        .await
        .unwrap();

    engine.cancel_reservation(created.id).await.unwrap();

    // Gone from active and by-guest views...
    assert!(engine.list_active().await.is_empty());
    assert!(engine.list_by_guest("John Doe").await.is_empty());

    // ...but present in the cancelled list and retrievable by id.
    let cancelled = engine.list_cancelled().await;
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].id, created.id);

    let stored = engine.get_reservation(&created.id).await.unwrap();
    assert!(stored.canceled);
    assert!(stored.modified_at >= created.created_at);
}

#[tokio::test]
async fn cancel_twice_succeeds() {
    let engine = engine("cancel_twice");
    let created = engine
        .create_reservation(draft("John Doe", 2, 4))
        .await
        .unwrap();

    engine.cancel_reservation(created.id).await.unwrap();
    engine.cancel_reservation(created.id).await.unwrap();

    let stored = engine.get_reservation(&created.id).await.unwrap();
    assert!(stored.canceled);
}

#[tokio::test]
async fn cancel_unknown_id_not_found() {
    let engine = engine("cancel_missing");
    let id = Ulid::new();
    let err = engine.cancel_reservation(id).await.unwrap_err();
    assert_eq!(err, EngineError::NotFound(id));
}

// ── queries ──────────────────────────────────────────────

#[tokio::test]
async fn list_by_guest_filters_guest_and_cancelled() {
    let engine = engine("by_guest");
    let a = engine
        .create_reservation(draft("John Doe", 2, 4))
        .await
        .unwrap();
    engine
        .create_reservation(draft("John Doe", 10, 12))
        .await
        .unwrap();
    engine
        .create_reservation(draft("Jane Doe", 20, 22))
        .await
        .unwrap();
    engine.cancel_reservation(a.id).await.unwrap();

    let johns = engine.list_by_guest("John Doe").await;
    assert_eq!(johns.len(), 1);
    assert_eq!(johns[0].stay, draft("John Doe", 10, 12).stay);
}

#[tokio::test]
async fn list_active_excludes_finished_stays() {
    // Finished stays can only enter the ledger through replay, so seed the
    // WAL directly with one past and one future reservation.
    let path = test_wal_path("active_finished");
    let today = today_utc();
    let past_id = Ulid::new();
    let future_id = Ulid::new();
    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&Event::ReservationCreated {
            id: past_id,
            stay: Stay::new(today - 10, today - 8),
            reserved_by: "John Doe".into(),
            created_at: 1,
        })
        .unwrap();
        wal.append(&Event::ReservationCreated {
            id: future_id,
            stay: Stay::new(today + 2, today + 4),
            reserved_by: "John Doe".into(),
            created_at: 2,
        })
        .unwrap();
    }

    let engine = Engine::new(path).unwrap();
    let active = engine.list_active().await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, future_id);

    // The finished stay is still there by id.
    assert!(engine.get_reservation(&past_id).await.is_some());
}

#[tokio::test]
async fn list_by_period_returns_contained_only() {
    let engine = engine("by_period");
    let inside = engine
        .create_reservation(draft("John Doe", 4, 6))
        .await
        .unwrap();
    engine
        .create_reservation(draft("Jane Doe", 9, 12))
        .await
        .unwrap();

    let today = today_utc();
    let hits = engine
        .list_by_period(&Stay::new(today + 1, today + 10))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, inside.id);
}

#[tokio::test]
async fn list_by_period_includes_cancelled() {
    let engine = engine("by_period_cancelled");
    let created = engine
        .create_reservation(draft("John Doe", 4, 6))
        .await
        .unwrap();
    engine.cancel_reservation(created.id).await.unwrap();

    let today = today_utc();
    let hits = engine
        .list_by_period(&Stay::new(today + 1, today + 10))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].canceled);
}

#[tokio::test]
async fn check_availability_reports_containment() {
    let engine = engine("check_avail");
    engine
        .create_reservation(draft("John Doe", 4, 6))
        .await
        .unwrap();

    let today = today_utc();
    assert!(
        !engine
            .check_availability(&Stay::new(today + 1, today + 10))
            .await
            .unwrap()
    );
    assert!(
        engine
            .check_availability(&Stay::new(today + 8, today + 12))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn query_window_too_wide_rejected() {
    let engine = engine("window_wide");
    let today = today_utc();
    let err = engine
        .check_availability(&Stay::new(today, today + 4000))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::LimitExceeded(_)));
}

// ── limits ───────────────────────────────────────────────

#[tokio::test]
async fn guest_name_too_long_rejected() {
    let engine = engine("guest_long");
    let mut d = draft("x", 2, 4);
    d.reserved_by = "x".repeat(crate::limits::MAX_GUEST_NAME_LEN + 1);
    let err = engine.create_reservation(d).await.unwrap_err();
    assert!(matches!(err, EngineError::LimitExceeded(_)));
}

#[tokio::test]
async fn out_of_range_dates_rejected() {
    let engine = engine("days_range");
    let d = ReservationDraft {
        stay: Stay::new(-5, -2),
        reserved_by: "John Doe".into(),
    };
    let err = engine.create_reservation(d).await.unwrap_err();
    assert!(matches!(err, EngineError::LimitExceeded(_)));
}

// ── durability ───────────────────────────────────────────

#[tokio::test]
async fn replay_restores_ledger() {
    let path = test_wal_path("replay_restore");

    let (kept, moved, gone) = {
        let engine = Engine::new(path.clone()).unwrap();
        let kept = engine
            .create_reservation(draft("John Doe", 2, 4))
            .await
            .unwrap();
        let moved = engine
            .create_reservation(draft("Jane Doe", 10, 12))
            .await
            .unwrap();
        let gone = engine
            .create_reservation(draft("Joao Silva", 20, 22))
            .await
            .unwrap();
        let moved = engine
            .modify_reservation(moved.id, draft("Jane Doe", 14, 16))
            .await
            .unwrap();
        engine.cancel_reservation(gone.id).await.unwrap();
        (kept, moved, gone)
    };

    let engine = Engine::new(path).unwrap();
    assert_eq!(engine.get_reservation(&kept.id).await.unwrap(), kept);
    assert_eq!(engine.get_reservation(&moved.id).await.unwrap(), moved);
    assert!(engine.get_reservation(&gone.id).await.unwrap().canceled);

    let active = engine.list_active().await;
    assert_eq!(active.len(), 2);
}

#[tokio::test]
async fn compaction_preserves_ledger() {
    let path = test_wal_path("compact_preserve");
    let engine = Engine::new(path.clone()).unwrap();

    let kept = engine
        .create_reservation(draft("John Doe", 2, 4))
        .await
        .unwrap();
    let moved = engine
        .create_reservation(draft("Jane Doe", 10, 12))
        .await
        .unwrap();
    let moved = engine
        .modify_reservation(moved.id, draft("Jane Doe", 14, 16))
        .await
        .unwrap();
    let gone = engine
        .create_reservation(draft("Joao Silva", 20, 22))
        .await
        .unwrap();
    engine.cancel_reservation(gone.id).await.unwrap();

    assert!(engine.wal_appends_since_compact().await > 0);
    engine.compact_wal().await.unwrap();
    assert_eq!(engine.wal_appends_since_compact().await, 0);

    // A fresh engine replaying the compacted WAL sees the same ledger,
    // audit timestamps included.
    let reopened = Engine::new(path).unwrap();
    assert_eq!(reopened.get_reservation(&kept.id).await.unwrap(), kept);
    assert_eq!(reopened.get_reservation(&moved.id).await.unwrap(), moved);
    let gone_stored = reopened.get_reservation(&gone.id).await.unwrap();
    assert!(gone_stored.canceled);
    assert_eq!(reopened.list_cancelled().await.len(), 1);
}

#[tokio::test]
async fn writes_after_compaction_survive() {
    let path = test_wal_path("compact_then_write");
    let engine = Engine::new(path.clone()).unwrap();

    engine
        .create_reservation(draft("John Doe", 2, 4))
        .await
        .unwrap();
    engine.compact_wal().await.unwrap();
    engine
        .create_reservation(draft("Jane Doe", 10, 12))
        .await
        .unwrap();

    let reopened = Engine::new(path).unwrap();
    assert_eq!(reopened.list_active().await.len(), 2);
}
