//! Relative and calendar date formatting for record timestamps.

use chrono::{DateTime, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 3_600;
const DAY: i64 = 86_400;
const WEEK: i64 = 604_800;
const MONTH: i64 = 2_592_000;
const YEAR: i64 = 31_536_000;

fn plural(n: i64, unit: &str) -> String {
    if n > 1 {
        format!("{} {}s ago", n, unit)
    } else {
        format!("{} {} ago", n, unit)
    }
}

/// "just now", "5 minutes ago", "1 day ago", ... relative to `now`.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();

    if seconds < MINUTE {
        "just now".to_string()
    } else if seconds < HOUR {
        plural(seconds / MINUTE, "minute")
    } else if seconds < DAY {
        plural(seconds / HOUR, "hour")
    } else if seconds < WEEK {
        plural(seconds / DAY, "day")
    } else if seconds < MONTH {
        plural(seconds / WEEK, "week")
    } else if seconds < YEAR {
        plural(seconds / MONTH, "month")
    } else {
        plural(seconds / YEAR, "year")
    }
}

/// Long calendar date, e.g. "March 4, 2026".
pub fn long_date(ts: DateTime<Utc>) -> String {
    ts.format("%B %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ago(secs: i64) -> String {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        time_ago(now - Duration::seconds(secs), now)
    }

    #[test]
    fn buckets() {
        assert_eq!(ago(0), "just now");
        assert_eq!(ago(59), "just now");
        assert_eq!(ago(60), "1 minute ago");
        assert_eq!(ago(150), "2 minutes ago");
        assert_eq!(ago(HOUR), "1 hour ago");
        assert_eq!(ago(3 * DAY), "3 days ago");
        assert_eq!(ago(2 * WEEK), "2 weeks ago");
        assert_eq!(ago(MONTH), "1 month ago");
        assert_eq!(ago(3 * YEAR), "3 years ago");
    }

    #[test]
    fn future_timestamps_are_just_now() {
        assert_eq!(ago(-30), "just now");
    }

    #[test]
    fn long_date_format() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 4, 8, 0, 0).unwrap();
        assert_eq!(long_date(ts), "March 4, 2026");
    }
}
