use crate::model::{Day, ReservationDraft, Stay};

// ── Rule Engine ───────────────────────────────────────────────────
//
// Structural rules run on every create/modify payload; the cross-record
// consecutive-stay rule runs only on creation. Both are pure functions so
// they can be exercised with literal day lists, no store involved.

pub const MSG_NEXT_DAY: &str = "Reservations must be placed starting from the next day.";
pub const MSG_INVALID_PERIOD: &str = "The period for the reservation is invalid";
pub const MSG_ADVANCE_LIMIT: &str = "Reservations must only be made up to 30 days in advance.";
pub const MSG_STAY_LIMIT: &str = "Reservations must have a maximum period of 3 days";
pub const MSG_MISSING_GUEST: &str = "Must inform who is placing the reservation";
pub const MSG_CONSECUTIVE_LIMIT: &str = "A guest can not reserve more than 3 days straight.";

/// Longest single stay, in whole days.
pub const MAX_STAY_DAYS: i64 = 3;

/// How far ahead of `today` a stay may start.
pub const MAX_ADVANCE_DAYS: i64 = 30;

/// Check every structural rule and collect the message of each violated
/// one, in rule order. An empty vector means the payload is valid.
pub fn validate(draft: &ReservationDraft, today: Day) -> Vec<String> {
    let mut errors = Vec::new();
    if draft.stay.start == today {
        errors.push(MSG_NEXT_DAY.to_string());
    }
    if draft.stay.start > draft.stay.end {
        errors.push(MSG_INVALID_PERIOD.to_string());
    }
    if draft.stay.start > today + MAX_ADVANCE_DAYS {
        errors.push(MSG_ADVANCE_LIMIT.to_string());
    }
    if draft.stay.nights() > MAX_STAY_DAYS {
        errors.push(MSG_STAY_LIMIT.to_string());
    }
    if draft.reserved_by.is_empty() {
        errors.push(MSG_MISSING_GUEST.to_string());
    }
    errors
}

/// Guest consecutive-stay cap.
///
/// The candidate is compared against each existing stay independently: when
/// the two are back-to-back (zero-day gap, either direction) and their
/// combined length exceeds the cap, the candidate is rejected. Pairs only —
/// a chain of three adjacent stays is never summed as a whole.
pub fn exceeds_consecutive_cap(candidate: &Stay, existing: &[Stay]) -> bool {
    let candidate_days = candidate.nights();
    existing
        .iter()
        .any(|stay| candidate.adjoins(stay) && candidate_days + stay.nights() > MAX_STAY_DAYS)
}
