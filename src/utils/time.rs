use anyhow::Context as _;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};

/// Interview forms collect date and time separately, as wall-clock time at
/// `offset`; the backend wants one UTC instant.
pub fn combine_date_time(
    date: NaiveDate,
    time: NaiveTime,
    offset: FixedOffset,
) -> anyhow::Result<DateTime<Utc>> {
    date.and_time(time)
        .and_local_timezone(offset)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .with_context(|| format!("{} {} is out of range for offset {}", date, time, offset))
}

pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date `{}`, expected YYYY-MM-DD", s))
}

pub fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .with_context(|| format!("invalid time `{}`, expected HH:MM", s))
}
