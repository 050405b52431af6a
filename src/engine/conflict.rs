use chrono::{Datelike, NaiveDate};

use crate::limits::*;
use crate::model::{Calendar, DateRange, Ms};

use super::EngineError;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

/// Reject inverted, ancient, far-future or absurdly long stays before they
/// reach the calendar.
pub(crate) fn validate_range(check_in: NaiveDate, check_out: NaiveDate) -> Result<(), EngineError> {
    if check_out <= check_in {
        return Err(EngineError::InvalidRange { check_in, check_out });
    }
    if check_in.year() < MIN_VALID_YEAR || check_out.year() > MAX_VALID_YEAR {
        return Err(EngineError::LimitExceeded("date out of range"));
    }
    if (check_out - check_in).num_days() > MAX_STAY_NIGHTS {
        return Err(EngineError::LimitExceeded("stay too long"));
    }
    Ok(())
}

/// The availability conflict check. A slot blocks the candidate range iff
/// the ranges overlap and the slot is still live at `now` — an overdue
/// hold is skipped here exactly as the sweeper would reclaim it, so sweep
/// latency never manufactures unavailability.
pub(crate) fn check_no_conflict(
    cal: &Calendar,
    range: &DateRange,
    now: Ms,
) -> Result<(), EngineError> {
    for slot in cal.overlapping(range) {
        if slot.kind.blocks(now) {
            return Err(EngineError::Unavailable {
                conflict: slot.booking_id,
            });
        }
    }
    Ok(())
}
