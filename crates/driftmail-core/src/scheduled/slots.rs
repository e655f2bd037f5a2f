//! Slot Generator: jittered dispatch timestamps for a campaign.

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use rand::Rng;

use super::calendar::{enumerate_weekdays, working_window_duration};

/// Slot generation failed because the campaign's working-day window
/// contains no weekdays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no working days in the campaign's send window")]
pub struct NoWorkingDays;

/// Generate `count` jittered UTC send-time slots, sorted ascending.
///
/// Callers must short-circuit the zero/equal send-by-date case
/// themselves; this function always spreads slots across `[launch, send_by]`.
pub fn generate_slots<R: Rng>(
    location: Tz,
    launch_date: DateTime<Utc>,
    send_by_date: DateTime<Utc>,
    start_hour: u32,
    end_hour: u32,
    count: usize,
    rng: &mut R,
) -> Result<Vec<DateTime<Utc>>, NoWorkingDays> {
    let launch_local = launch_date.with_timezone(&location);
    let send_by_local = send_by_date.with_timezone(&location);

    let weekdays = enumerate_weekdays(launch_local.date_naive(), send_by_local.date_naive());
    if weekdays.is_empty() {
        return Err(NoWorkingDays);
    }

    let num_days = weekdays.len();
    let q = count / num_days;
    let r = count % num_days;

    // Largest-remainder method: weights are equal across weekdays here,
    // so every day ties on fractional remainder and ties break by date
    // order.
    let mut counts = vec![q; num_days];
    for slot in counts.iter_mut().take(r) {
        *slot += 1;
    }

    let window = working_window_duration(start_hour, end_hour);
    let mut slots = Vec::with_capacity(count);

    for (day, &c_d) in weekdays.iter().zip(counts.iter()) {
        if c_d == 0 {
            continue;
        }
        let day_start = location
            .from_local_datetime(&day.and_hms_opt(start_hour, 0, 0).unwrap())
            .single()
            .unwrap_or_else(|| location.from_utc_datetime(&day.and_hms_opt(start_hour, 0, 0).unwrap()));
        let delta = window / c_d as i32;

        for i in 0..c_d {
            let nominal = day_start + delta * i as i32;
            let jitter_millis = if delta.num_milliseconds() > 0 {
                rng.gen_range(0..delta.num_milliseconds())
            } else {
                0
            };
            let jittered = nominal + Duration::milliseconds(jitter_millis);
            let day_end = day_start + window;
            let clamped = if jittered > day_end { day_end } else { jittered };
            slots.push(clamped.with_timezone(&Utc));
        }
    }

    slots.sort();
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn no_working_days_over_a_weekend() {
        let launch = Utc.with_ymd_and_hms(2024, 1, 6, 9, 0, 0).unwrap();
        let send_by = Utc.with_ymd_and_hms(2024, 1, 7, 9, 0, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let result = generate_slots(chrono_tz::UTC, launch, send_by, 9, 17, 4, &mut rng);
        assert!(result.is_err());
    }

    #[test]
    fn staggered_slots_stay_within_working_hours() {
        let launch = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let send_by = launch + Duration::days(9);
        let mut rng = StdRng::seed_from_u64(42);
        let slots = generate_slots(chrono_tz::UTC, launch, send_by, 9, 17, 7, &mut rng).unwrap();
        assert_eq!(slots.len(), 7);
        for (a, b) in slots.iter().zip(slots.iter().skip(1)) {
            assert!(a <= b);
        }
        for slot in &slots {
            let weekday = slot.weekday();
            assert!(!matches!(weekday, chrono::Weekday::Sat | chrono::Weekday::Sun));
            assert!(slot.hour() >= 9 && slot.hour() <= 17);
        }
    }
}
