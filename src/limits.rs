//! Hard bounds on externally-reachable state. Violations surface as
//! `EngineError::LimitExceeded`, never as a panic or an unbounded allocation.

use crate::model::Day;

/// Upper bound on ledger size per room (tenant).
pub const MAX_RESERVATIONS_PER_ROOM: usize = 100_000;

/// Longest accepted guest identifier.
pub const MAX_GUEST_NAME_LEN: usize = 256;

/// Earliest accepted calendar day: 1970-01-01.
pub const MIN_VALID_DAY: Day = 0;

/// Latest accepted calendar day: 9999-12-31.
pub const MAX_VALID_DAY: Day = 2_932_896;

/// Widest accepted window for period/availability queries, in days.
pub const MAX_QUERY_WINDOW_DAYS: i64 = 3_650;

/// Number of lazily-created tenants one server will hold.
pub const MAX_TENANTS: usize = 1_024;

/// Longest accepted tenant (database) name.
pub const MAX_TENANT_NAME_LEN: usize = 256;
