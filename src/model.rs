use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use ulid::Ulid;

/// Days since 1970-01-01 — the only date type in the core. Time-of-day is
/// stripped at the boundary and never reaches the engine.
pub type Day = i64;

/// Unix milliseconds, used only for audit timestamps.
pub type Ms = i64;

const UNIX_EPOCH_JULIAN_DAY: i64 = 2_440_588;

pub const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    time::macros::format_description!("[year]-[month]-[day]");

pub fn day_from_date(date: time::Date) -> Day {
    i64::from(date.to_julian_day()) - UNIX_EPOCH_JULIAN_DAY
}

pub fn date_from_day(day: Day) -> Option<time::Date> {
    let julian = day.checked_add(UNIX_EPOCH_JULIAN_DAY)?;
    let julian = i32::try_from(julian).ok()?;
    time::Date::from_julian_day(julian).ok()
}

/// Today's date component in UTC.
pub fn today_utc() -> Day {
    day_from_date(time::OffsetDateTime::now_utc().date())
}

/// Render a day as `YYYY-MM-DD`; out-of-range days fall back to the raw number.
pub fn format_day(day: Day) -> String {
    match date_from_day(day) {
        Some(d) => format!("{:04}-{:02}-{:02}", d.year(), u8::from(d.month()), d.day()),
        None => day.to_string(),
    }
}

/// Closed date range `[start, end]` of a reservation. Both bounds are
/// calendar days; a one-night stay has `end == start + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stay {
    pub start: Day,
    pub end: Day,
}

impl Stay {
    /// No ordering is asserted here: malformed ranges must reach the rule
    /// engine intact so they produce the proper validation message.
    pub fn new(start: Day, end: Day) -> Self {
        Self { start, end }
    }

    /// Whole-day length, not inclusive of the start day.
    pub fn nights(&self) -> i64 {
        self.end - self.start
    }

    /// Returns true if `self` lies entirely within `other`.
    pub fn contained_in(&self, other: &Stay) -> bool {
        self.start >= other.start && self.end <= other.end
    }

    /// Back-to-back with zero-day gap, in either direction.
    pub fn adjoins(&self, other: &Stay) -> bool {
        self.start - 1 == other.end || self.end + 1 == other.start
    }
}

/// A reservation as held by the store. `canceled` is one-way; the record is
/// never physically removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub stay: Stay,
    pub reserved_by: String,
    pub canceled: bool,
    pub created_at: Ms,
    pub modified_at: Ms,
}

/// An incoming reservation payload, before the engine has accepted it.
/// Carries no identifier — identifiers are assigned on creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationDraft {
    pub stay: Stay,
    pub reserved_by: String,
}

/// The event types — flat, no nesting. This is the WAL record format.
/// Audit timestamps ride inside the events so replay is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ReservationCreated {
        id: Ulid,
        stay: Stay,
        reserved_by: String,
        created_at: Ms,
    },
    ReservationModified {
        id: Ulid,
        stay: Stay,
        modified_at: Ms,
    },
    ReservationCancelled {
        id: Ulid,
        modified_at: Ms,
    },
}

/// The room ledger: every reservation ever accepted for one room, sorted by
/// stay start. Cancelled records stay in the ledger.
#[derive(Debug, Default)]
pub struct RoomState {
    pub reservations: Vec<Reservation>,
}

impl RoomState {
    pub fn new() -> Self {
        Self {
            reservations: Vec::new(),
        }
    }

    /// Insert a reservation maintaining sort order by stay.start.
    pub fn insert_reservation(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .binary_search_by_key(&reservation.stay.start, |r| r.stay.start)
            .unwrap_or_else(|e| e);
        self.reservations.insert(pos, reservation);
    }

    /// Remove a reservation by id. Only used internally when a modification
    /// moves a stay and the sort position must be recomputed.
    pub fn remove_reservation(&mut self, id: Ulid) -> Option<Reservation> {
        let pos = self.reservations.iter().position(|r| r.id == id)?;
        Some(self.reservations.remove(pos))
    }

    pub fn find(&self, id: &Ulid) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == *id)
    }

    pub fn find_mut(&mut self, id: &Ulid) -> Option<&mut Reservation> {
        self.reservations.iter_mut().find(|r| r.id == *id)
    }

    /// Reservations whose whole stay lies inside the query window.
    /// Binary search skips everything starting after `window.end`.
    pub fn contained_in(&self, window: &Stay) -> impl Iterator<Item = &Reservation> {
        let right_bound = self
            .reservations
            .partition_point(|r| r.stay.start <= window.end);
        let window = *window;
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.stay.contained_in(&window))
    }
}
