use crate::model::Timestamp;
use chrono::{DateTime, Local};

pub const MISSING_TIME: &str = "--";
pub const JUST_NOW: &str = "just now";

const MINUTE_MS: i64 = 60_000;
const HOUR_MINUTES: i64 = 60;
const DAY_MINUTES: i64 = 1_440;

pub fn format_time(timestamp: Option<&Timestamp>) -> String {
    format_time_at(timestamp, Local::now())
}

/// Relative age for recent timestamps, local `HH:MM` past a day. Future
/// timestamps count as "just now".
pub fn format_time_at(timestamp: Option<&Timestamp>, now: DateTime<Local>) -> String {
    let Some(timestamp) = timestamp else {
        return MISSING_TIME.to_string();
    };
    let minutes = (now - *timestamp).num_milliseconds().div_euclid(MINUTE_MS);
    if minutes < 1 {
        JUST_NOW.to_string()
    } else if minutes < HOUR_MINUTES {
        format!("{minutes} minutes ago")
    } else if minutes < DAY_MINUTES {
        format!("{} hours ago", minutes / HOUR_MINUTES)
    } else {
        timestamp.format("%H:%M").to_string()
    }
}

pub fn format_clock(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2026, 10, 19, 14, 30, 0)
            .single()
            .expect("unambiguous local time")
    }

    fn ago(delta: Duration) -> String {
        let ts = now() - delta;
        format_time_at(Some(&ts), now())
    }

    #[test]
    fn missing_timestamp_uses_placeholder() {
        assert_eq!(format_time_at(None, now()), "--");
    }

    #[test]
    fn format_time_reads_against_the_wall_clock() {
        assert_eq!(format_time(None), MISSING_TIME);
        let recent = Local::now() - Duration::seconds(5);
        assert_eq!(format_time(Some(&recent)), JUST_NOW);
        let earlier = Local::now() - Duration::minutes(10);
        assert_eq!(format_time(Some(&earlier)), "10 minutes ago");
    }

    #[test]
    fn relative_buckets() {
        assert_eq!(ago(Duration::seconds(30)), "just now");
        assert_eq!(ago(Duration::seconds(90)), "1 minutes ago");
        assert_eq!(ago(Duration::minutes(59)), "59 minutes ago");
        assert_eq!(ago(Duration::minutes(60)), "1 hours ago");
        assert_eq!(ago(Duration::minutes(179)), "2 hours ago");
        assert_eq!(ago(Duration::minutes(1_439)), "23 hours ago");
    }

    #[test]
    fn future_timestamps_read_as_just_now() {
        assert_eq!(ago(Duration::minutes(-5)), "just now");
    }

    #[test]
    fn older_than_a_day_shows_zero_padded_clock_time() {
        let ts = Local
            .with_ymd_and_hms(2026, 10, 17, 7, 5, 0)
            .single()
            .expect("unambiguous local time");
        assert_eq!(format_time_at(Some(&ts), now()), "07:05");
    }

    #[test]
    fn clock_is_24_hour() {
        assert_eq!(format_clock(now()), "2026-10-19 14:30:00");
    }
}
