//! The weekly Powerplay tick, Thursday 07:00 UTC.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};

const TICK_HOUR: i64 = 7;

pub fn next_tick(now: DateTime<Utc>) -> DateTime<Utc> {
    let midnight = now
        - Duration::seconds(i64::from(now.num_seconds_from_midnight()))
        - Duration::nanoseconds(i64::from(now.nanosecond()));
    let days = (7 + Weekday::Thu.num_days_from_monday() - now.weekday().num_days_from_monday()) % 7;

    let tick = midnight + Duration::days(i64::from(days)) + Duration::hours(TICK_HOUR);
    if tick < now {
        tick + Duration::days(7)
    } else {
        tick
    }
}

pub fn until(now: DateTime<Utc>) -> Duration {
    next_tick(now) - now
}

/// `2 days, 03:04:05`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.num_seconds().max(0);
    let (days, rest) = (secs / 86_400, secs % 86_400);
    let clock = format!("{:02}:{:02}:{:02}", rest / 3600, rest % 3600 / 60, rest % 60);
    match days {
        0 => clock,
        1 => format!("1 day, {clock}"),
        _ => format!("{days} days, {clock}"),
    }
}
