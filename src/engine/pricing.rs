//! Nightly pricing. Deterministic and side-effect free — called at
//! creation time to record the quote and by the calendar/quote queries.

use chrono::NaiveDate;

use crate::model::{is_weekend, Baht, DateRange, RateCard};

use super::EngineError;

/// Price for one night.
pub fn nightly_rate(date: NaiveDate, card: &RateCard) -> Baht {
    if is_weekend(date) {
        card.weekend.nightly()
    } else {
        card.weekday.nightly()
    }
}

/// Total price for `[check_in, check_out)` — an N-night stay prices
/// exactly N nights.
pub fn compute_total_price(
    check_in: NaiveDate,
    check_out: NaiveDate,
    card: &RateCard,
) -> Result<Baht, EngineError> {
    if check_out <= check_in {
        return Err(EngineError::InvalidRange { check_in, check_out });
    }
    let range = DateRange::new(check_in, check_out);
    Ok(range.iter_nights().map(|night| nightly_rate(night, card)).sum())
}
