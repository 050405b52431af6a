use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::BookingStatus;

#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    AlreadyExists(Ulid),
    InvalidRange {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
    InvalidGuests {
        guests: u32,
        max: u32,
    },
    Unavailable {
        conflict: Ulid,
    },
    InvalidTransition {
        from: BookingStatus,
        requested: BookingStatus,
    },
    ConcurrentModification {
        id: Ulid,
        expected: u64,
        actual: u64,
    },
    RateCardMissing,
    CustomerInfoRequired,
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "booking not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "booking already exists: {id}"),
            EngineError::InvalidRange { check_in, check_out } => {
                write!(f, "check-out {check_out} must be after check-in {check_in}")
            }
            EngineError::InvalidGuests { guests, max } => {
                write!(f, "{guests} guests outside allowed range 1..={max}")
            }
            EngineError::Unavailable { conflict } => {
                write!(f, "dates unavailable: conflict with booking {conflict}")
            }
            EngineError::InvalidTransition { from, requested } => {
                write!(
                    f,
                    "cannot move booking from {} to {}",
                    from.as_str(),
                    requested.as_str()
                )
            }
            EngineError::ConcurrentModification { id, expected, actual } => {
                write!(
                    f,
                    "booking {id} changed concurrently (expected version {expected}, found {actual}); re-fetch and retry"
                )
            }
            EngineError::RateCardMissing => write!(f, "no rate card configured"),
            EngineError::CustomerInfoRequired => {
                write!(f, "customer info must be recorded before selecting a payment method")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
