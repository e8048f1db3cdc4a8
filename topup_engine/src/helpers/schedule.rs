use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Offset, TimeZone, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid schedule: {0}")]
pub struct ScheduleParseError(String);

/// A wall-clock time of day in a fixed UTC offset, e.g. midnight in India (`00:00`, `+05:30`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    pub time: NaiveTime,
    pub offset: FixedOffset,
}

impl Default for DailySchedule {
    fn default() -> Self {
        let ist = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap_or_else(|| Utc.fix());
        Self { time: NaiveTime::MIN, offset: ist }
    }
}

impl DailySchedule {
    /// Builds a schedule from a `HH:MM` time and a `±HH:MM` offset.
    pub fn parse(time: &str, offset: &str) -> Result<Self, ScheduleParseError> {
        let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
            .map_err(|e| ScheduleParseError(format!("'{time}' is not a HH:MM time. {e}")))?;
        let offset = parse_offset(offset)?;
        Ok(Self { time, offset })
    }

    /// The first firing strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local = now.with_timezone(&self.offset);
        let today = local.date_naive().and_time(self.time);
        let shift = Duration::seconds(i64::from(self.offset.local_minus_utc()));
        let mut next = Utc.from_utc_datetime(&(today - shift));
        if next <= now {
            next += Duration::days(1);
        }
        next
    }

    /// The next firing after `now` that comes strictly after `last`, the firing that already ran. The wall clock can
    /// lag the timer that woke us up, so `now` alone may still be before `last`.
    pub fn next_firing(&self, now: DateTime<Utc>, last: Option<DateTime<Utc>>) -> DateTime<Utc> {
        self.next_after(last.map_or(now, |last| last.max(now)))
    }

    /// How long to wait from `now` until the next firing.
    pub fn wait_from(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.next_after(now) - now).to_std().unwrap_or_default()
    }
}

impl Display for DailySchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.time.format("%H:%M"), self.offset)
    }
}

fn parse_offset(s: &str) -> Result<FixedOffset, ScheduleParseError> {
    let s = s.trim();
    let err = || ScheduleParseError(format!("'{s}' is not a ±HH:MM UTC offset"));
    let (sign, rest) = match s.chars().next() {
        Some('+') => (1, &s[1..]),
        Some('-') => (-1, &s[1..]),
        _ => return Err(err()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(err)?;
    let hours = hours.parse::<i32>().map_err(|_| err())?;
    let minutes = minutes.parse::<i32>().map_err(|_| err())?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return Err(err());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(err)
}

impl FromStr for DailySchedule {
    type Err = ScheduleParseError;

    /// Parses `HH:MM±HH:MM`, e.g. `00:00+05:30`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s.find(['+', '-']).ok_or_else(|| ScheduleParseError(format!("'{s}' has no UTC offset")))?;
        Self::parse(&s[..split], &s[split..])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn midnight_in_india() {
        let schedule = DailySchedule::default();
        // Midnight IST is 18:30 UTC the previous day
        assert_eq!(schedule.next_after(utc("2024-06-01T12:00:00Z")), utc("2024-06-01T18:30:00Z"));
        assert_eq!(schedule.next_after(utc("2024-06-01T18:30:00Z")), utc("2024-06-02T18:30:00Z"));
        assert_eq!(schedule.next_after(utc("2024-06-01T19:00:00Z")), utc("2024-06-02T18:30:00Z"));
        assert_eq!(schedule.wait_from(utc("2024-06-01T18:00:00Z")), std::time::Duration::from_secs(1800));
    }

    #[test]
    fn a_firing_never_runs_twice() {
        let schedule = DailySchedule::default();
        let last = utc("2024-06-01T18:30:00Z");
        // The sweep finished before the wall clock reached the firing it just ran
        let lagging = utc("2024-06-01T18:29:59.995Z");
        assert_eq!(schedule.next_after(lagging), last);
        assert_eq!(schedule.next_firing(lagging, Some(last)), utc("2024-06-02T18:30:00Z"));
        assert_eq!(schedule.next_firing(utc("2024-06-01T18:30:02Z"), Some(last)), utc("2024-06-02T18:30:00Z"));
        assert_eq!(schedule.next_firing(lagging, None), last);
        // A clock that jumped ahead past a firing does not replay the missed one
        assert_eq!(schedule.next_firing(utc("2024-06-03T19:00:00Z"), Some(last)), utc("2024-06-04T18:30:00Z"));
    }

    #[test]
    fn parsing() {
        let s = DailySchedule::parse("06:15", "-03:00").unwrap();
        assert_eq!(s.next_after(utc("2024-06-01T00:00:00Z")), utc("2024-06-01T09:15:00Z"));
        assert_eq!("00:00+05:30".parse::<DailySchedule>().unwrap(), DailySchedule::default());
        assert!(DailySchedule::parse("25:00", "+05:30").is_err());
        assert!(DailySchedule::parse("00:00", "05:30").is_err());
        assert!(DailySchedule::parse("00:00", "+05:75").is_err());
        assert!("midnight".parse::<DailySchedule>().is_err());
    }
}
