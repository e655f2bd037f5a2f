//! Clock/Calendar: time-zone resolution and working-day arithmetic.

use chrono::{Duration, NaiveDate, Weekday};
use chrono_tz::Tz;

/// Resolve a time-zone name to a location. Unknown or empty names
/// resolve to UTC.
pub fn resolve_timezone(name: &str) -> Tz {
    if name.is_empty() {
        return chrono_tz::UTC;
    }
    name.parse().unwrap_or(chrono_tz::UTC)
}

/// Enumerate weekdays (Monday..Friday) in `[start, end]` inclusive.
/// Saturday and Sunday are weekend and excluded.
pub fn enumerate_weekdays(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut d = start;
    while d <= end {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(d);
        }
        d += Duration::days(1);
    }
    days
}

/// Per-day working-window duration `D = endHour - startHour`.
pub fn working_window_duration(start_hour: u32, end_hour: u32) -> Duration {
    Duration::hours(end_hour as i64 - start_hour as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unknown_timezone_resolves_to_utc() {
        assert_eq!(resolve_timezone(""), chrono_tz::UTC);
        assert_eq!(resolve_timezone("not/a_zone"), chrono_tz::UTC);
    }

    #[test]
    fn named_timezone_resolves() {
        assert_eq!(resolve_timezone("Europe/Berlin"), chrono_tz::Europe::Berlin);
    }

    #[test]
    fn weekday_enumeration_excludes_weekend() {
        // 2024-01-06 is a Saturday, 2024-01-07 a Sunday.
        let start = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert_eq!(enumerate_weekdays(start, end), Vec::<NaiveDate>::new());
    }

    #[test]
    fn weekday_enumeration_spans_nine_days() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = start + Duration::days(9);
        let days = enumerate_weekdays(start, end);
        assert!(days.iter().all(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)));
        assert_eq!(days.len(), 7);
    }
}
