//! Wall clock helpers and the NYSE market-hours predicate.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use chrono_tz::America::New_York;

/// Current UTC instant as an ISO-8601 string (no fractional seconds), matching the
/// store's `ts`/`updated_at`/`created_at` column convention.
pub fn utc_now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.f+00:00").to_string()
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// NYSE regular session: 9:30-16:00 America/New_York, Monday-Friday. Holidays are
/// deliberately ignored (matches the source's naive weekday+hour predicate).
pub fn market_is_open(at: DateTime<Utc>) -> bool {
    let et = at.with_timezone(&New_York);
    let weekday = et.weekday().num_days_from_monday(); // Mon=0..Sun=6
    if weekday >= 5 {
        return false;
    }
    let minutes_of_day = et.hour() * 60 + et.minute();
    let open = 9 * 60 + 30;
    let close = 16 * 60;
    minutes_of_day >= open && minutes_of_day < close
}

pub fn today_et_str(at: DateTime<Utc>) -> String {
    at.with_timezone(&New_York).format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn weekend_is_closed() {
        // 2024-01-06 is a Saturday.
        let at = Utc.with_ymd_and_hms(2024, 1, 6, 15, 0, 0).unwrap();
        assert!(!market_is_open(at));
    }

    #[test]
    fn midday_weekday_is_open() {
        // 2024-01-08 (Monday) 15:00 UTC = 10:00 ET in January (EST, UTC-5).
        let at = Utc.with_ymd_and_hms(2024, 1, 8, 15, 0, 0).unwrap();
        assert!(market_is_open(at));
    }

    #[test]
    fn before_open_is_closed() {
        let at = Utc.with_ymd_and_hms(2024, 1, 8, 13, 0, 0).unwrap();
        assert!(!market_is_open(at));
    }

    #[test]
    fn after_close_is_closed() {
        let at = Utc.with_ymd_and_hms(2024, 1, 8, 22, 0, 0).unwrap();
        assert!(!market_is_open(at));
    }
}
