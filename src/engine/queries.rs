use ulid::Ulid;

use crate::limits::MAX_QUERY_WINDOW_DAYS;
use crate::model::*;

use super::availability::{is_room_available, validate_days};
use super::{Engine, EngineError};

// ── Query Surface ────────────────────────────────────────────────
//
// All read-only; none of these consult the rule engine. Cancelled records
// stay out of the active and by-guest views but remain reachable by id,
// in the cancelled listing, and in period scans.

impl Engine {
    pub async fn get_reservation(&self, id: &Ulid) -> Option<Reservation> {
        let room = self.room();
        let guard = room.read().await;
        guard.find(id).cloned()
    }

    /// Current reservations: not cancelled and not yet finished.
    pub async fn list_active(&self) -> Vec<Reservation> {
        let today = today_utc();
        let room = self.room();
        let guard = room.read().await;
        guard
            .reservations
            .iter()
            .filter(|r| !r.canceled && r.stay.end > today)
            .cloned()
            .collect()
    }

    pub async fn list_cancelled(&self) -> Vec<Reservation> {
        let room = self.room();
        let guard = room.read().await;
        guard
            .reservations
            .iter()
            .filter(|r| r.canceled)
            .cloned()
            .collect()
    }

    /// A guest's reservations, cancelled ones excluded.
    pub async fn list_by_guest(&self, guest: &str) -> Vec<Reservation> {
        let room = self.room();
        let guard = room.read().await;
        guard
            .reservations
            .iter()
            .filter(|r| !r.canceled && r.reserved_by == guest)
            .cloned()
            .collect()
    }

    /// Reservations fully contained in the window, cancelled ones included —
    /// the same containment view the availability check sees.
    pub async fn list_by_period(&self, window: &Stay) -> Result<Vec<Reservation>, EngineError> {
        validate_window(window)?;
        let room = self.room();
        let guard = room.read().await;
        Ok(guard.contained_in(window).cloned().collect())
    }

    pub async fn check_availability(&self, window: &Stay) -> Result<bool, EngineError> {
        validate_window(window)?;
        let room = self.room();
        let guard = room.read().await;
        Ok(is_room_available(&guard, window))
    }
}

fn validate_window(window: &Stay) -> Result<(), EngineError> {
    validate_days(window)?;
    if window.end - window.start > MAX_QUERY_WINDOW_DAYS {
        return Err(EngineError::LimitExceeded("query window too wide"));
    }
    Ok(())
}
