//! Clock & Calendar (spec §4.B). All shift/weekend/working-hours logic
//! runs against a single fixed timezone; nothing in this crate ever reads
//! the process-local timezone.

use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// The only timezone this system reasons in (spec §3, §4.B).
pub const LOCAL_TZ: Tz = chrono_tz::America::Argentina::Buenos_Aires;

/// Wall-clock source, kept as a trait so tests can supply a fixed instant
/// instead of `Utc::now()` (teacher precedent: `hitl::assessor` takes its
/// inputs as plain arguments rather than reaching for ambient state).
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;

    fn now_local(&self) -> DateTime<Tz> {
        self.now_utc().with_timezone(&LOCAL_TZ)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Minutes since local midnight, matching `OperatorSchedule::start_minute`/
/// `end_minute` (spec §3).
pub fn minute_of_day(dt: &DateTime<Tz>) -> u16 {
    (dt.hour() * 60 + dt.minute()) as u16
}

/// `chrono::Weekday::num_days_from_monday`, matching `OperatorSchedule::day_of_week`.
pub fn day_of_week(dt: &DateTime<Tz>) -> u8 {
    dt.weekday().num_days_from_monday() as u8
}

pub fn is_weekend(dt: &DateTime<Tz>) -> bool {
    matches!(dt.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)
}

/// Parses "HH:MM" config values (`FINDE_HORA_INICIO` and friends) into a
/// minute-of-day. Malformed values fall back to `0`.
pub fn parse_hhmm_to_minute(value: &str) -> u16 {
    let mut parts = value.splitn(2, ':');
    let hour: u16 = parts.next().and_then(|h| h.trim().parse().ok()).unwrap_or(0);
    let minute: u16 = parts.next().and_then(|m| m.trim().parse().ok()).unwrap_or(0);
    hour * 60 + minute
}

/// True when `dt` falls within `[start, end)` of the configured window for
/// the day type it lands on (weekend window vs weekday window, spec §4.B).
pub fn in_working_hours(dt: &DateTime<Tz>, weekday_window: (u16, u16), weekend_window: (u16, u16)) -> bool {
    let minute = minute_of_day(dt);
    let (start, end) = if is_weekend(dt) { weekend_window } else { weekday_window };
    start <= minute && minute < end
}

/// Ticket timestamps arrive in two shapes depending on origin (spec §9,
/// Open Question (a)): the remote service's own `YYYY-MM-DD HH:MM:SS`, or
/// the originating CRM integration's `DD-MM-YYYY HH:MM:SS`. Tries both,
/// in that order, and returns `None` if neither parses.
pub fn parse_ticket_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return LOCAL_TZ
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%d-%m-%Y %H:%M:%S") {
        return LOCAL_TZ
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc));
    }
    None
}

/// Resolved against `Clock::now_utc`: a parse that lands in the future is
/// almost always a malformed source field rather than a genuine future
/// ticket, so it is clamped to `now` (Open Question (b), §9 — see
/// DESIGN.md for the rationale).
pub fn parse_ticket_timestamp_clamped(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    parse_ticket_timestamp(raw).map(|dt| if dt > now { now } else { dt })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_remote_format() {
        let dt = parse_ticket_timestamp("2026-07-30 14:05:00").unwrap();
        assert_eq!(dt.with_timezone(&LOCAL_TZ).hour(), 14);
    }

    #[test]
    fn parses_originating_format() {
        let dt = parse_ticket_timestamp("30-07-2026 14:05:00").unwrap();
        assert_eq!(dt.with_timezone(&LOCAL_TZ).hour(), 14);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_ticket_timestamp("not a date").is_none());
    }

    #[test]
    fn future_timestamp_is_clamped_to_now() {
        let now = Utc::now();
        let future = now + chrono::Duration::days(3650);
        let raw = future.format("%Y-%m-%d %H:%M:%S").to_string();
        let clamped = parse_ticket_timestamp_clamped(&raw, now).unwrap();
        assert!(clamped <= now);
    }

    #[test]
    fn hhmm_parses() {
        assert_eq!(parse_hhmm_to_minute("08:30"), 510);
        assert_eq!(parse_hhmm_to_minute("00:00"), 0);
    }

    #[test]
    fn weekend_detection() {
        let sat = LOCAL_TZ.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap();
        let mon = LOCAL_TZ.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        assert!(is_weekend(&sat));
        assert!(!is_weekend(&mon));
    }
}
