use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone};

/// This is the standard way of turning a session start into its identifier.
pub fn session_id(moment: DateTime<Local>) -> String {
    moment.format("%Y%m%d_%H%M%S").to_string()
}

/// Formats seconds as `mm:ss`. Minutes are not wrapped into hours.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Returns start of the next day.
pub fn next_day_start<Tz: TimeZone>(date: DateTime<Tz>) -> Option<DateTime<Tz>> {
    (date + Duration::days(1)).with_time(NaiveTime::MIN).single()
}
