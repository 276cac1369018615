use crate::limits::{MAX_VALID_DAY, MIN_VALID_DAY};
use crate::model::{Ms, RoomState, Stay};

use super::EngineError;

// ── Availability Checker ──────────────────────────────────────────

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as Ms
}

pub(crate) fn validate_days(stay: &Stay) -> Result<(), EngineError> {
    if stay.start < MIN_VALID_DAY
        || stay.start > MAX_VALID_DAY
        || stay.end < MIN_VALID_DAY
        || stay.end > MAX_VALID_DAY
    {
        return Err(EngineError::LimitExceeded("date out of range"));
    }
    Ok(())
}

/// Containment, not overlap: a reservation conflicts with the requested
/// window only when its whole stay lies inside the window. A stay that
/// straddles either edge of the window is not reported. Cancelled
/// reservations count like any other. The policy lives in this one
/// predicate; switching to a true interval-overlap test
/// (`existing.start <= window.end && existing.end >= window.start`) is a
/// one-line change here.
pub fn period_has_conflict(room: &RoomState, window: &Stay) -> bool {
    room.contained_in(window).next().is_some()
}

/// `true` when the room can take a stay over `window`.
pub fn is_room_available(room: &RoomState, window: &Stay) -> bool {
    !period_has_conflict(room, window)
}
