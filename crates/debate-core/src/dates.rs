//! Trading-date helpers
//!
//! The market closes at 15:30. Before the close the previous trading day is
//! the most recent one with complete data; after the close the current day
//! counts. Weekends roll back to Friday. Public holidays are not modelled.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};

/// Market close used as the day boundary for data completeness
const MARKET_CLOSE: (u32, u32) = (15, 30);

/// Roll a date back to the nearest weekday (Friday for weekend dates)
fn roll_back_weekend(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sun => date - Duration::days(2),
        Weekday::Sat => date - Duration::days(1),
        _ => date,
    }
}

/// Previous trading date for a given date, skipping weekends
pub fn previous_trading_date(date: NaiveDate) -> NaiveDate {
    roll_back_weekend(date - Duration::days(1))
}

/// Smart trading date for a trigger time.
///
/// Before 15:30 the current day's session is incomplete, so the previous
/// trading day is used; at or after 15:30 the trigger's own day is used.
/// Either way weekends roll back to Friday.
pub fn smart_trading_date(trigger_time: NaiveDateTime) -> NaiveDate {
    let time = trigger_time.time();
    let after_close = (time.hour(), time.minute()) >= MARKET_CLOSE;

    if after_close {
        roll_back_weekend(trigger_time.date())
    } else {
        previous_trading_date(trigger_time.date())
    }
}
