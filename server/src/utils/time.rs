use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};

/// Midnight UTC of the day containing `instant`.
pub fn start_of_day(instant: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&instant.date_naive().and_time(NaiveTime::MIN))
}

/// `[start, end)` of the UTC day `days` after the one containing `instant`.
pub fn day_bounds(instant: DateTime<Utc>, days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = start_of_day(instant) + Duration::days(days);
    (start, start + Duration::days(1))
}
