//! Hard safety limits. Tunable behavior (hold/payment windows, sweep
//! interval) lives in [`crate::config`]; these are fixed caps that bound
//! memory and reject garbage input.

/// Longest accepted stay, in nights.
pub const MAX_STAY_NIGHTS: i64 = 90;

/// Widest day-calendar query window, in days.
pub const MAX_QUERY_WINDOW_DAYS: i64 = 366;

/// Upper bound on live booking records.
pub const MAX_BOOKINGS: usize = 100_000;

/// Customer name field length cap.
pub const MAX_NAME_LEN: usize = 128;

/// Email / phone field length cap.
pub const MAX_CONTACT_LEN: usize = 128;

/// Special-requests note length cap.
pub const MAX_NOTE_LEN: usize = 2_000;

/// Slip reference string length cap.
pub const MAX_SLIP_REF_LEN: usize = 512;

/// Accepted calendar-year window for check-in/check-out dates.
pub const MIN_VALID_YEAR: i32 = 2000;
pub const MAX_VALID_YEAR: i32 = 2100;
