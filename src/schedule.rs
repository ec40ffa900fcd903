// src/schedule.rs
//
// Date/time parsing and derived appointment bounds.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::ApiError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
pub const DEFAULT_DURATION_MINUTES: i32 = 60;

/// Duration used when a doctor has no usable value (unset, zero, or dangling reference).
pub fn effective_duration(duration_minutes: Option<i32>) -> i32 {
    match duration_minutes {
        Some(d) if d > 0 => d,
        _ => DEFAULT_DURATION_MINUTES,
    }
}

/// Parses a booking request's `YYYY-MM-DD` date and `HH:MM` time.
/// The error message carries the parser's detail.
pub fn parse_slot(date: &str, time: &str) -> Result<(NaiveDate, NaiveTime), ApiError> {
    let parsed = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).and_then(|d| {
        NaiveTime::parse_from_str(time.trim(), TIME_FORMAT).map(|t| (d, t))
    });
    parsed.map_err(|e| ApiError::validation(format!("Invalid date/time format: {e}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotBounds {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// `None` when the end would fall past the last representable timestamp.
pub fn slot_bounds(date: NaiveDate, time: NaiveTime, duration_minutes: i32) -> Option<SlotBounds> {
    let start = date.and_time(time);
    let end = start.checked_add_signed(Duration::minutes(i64::from(duration_minutes)))?;
    Some(SlotBounds { start, end })
}

/// Bounds for rows already stored; an unrepresentable end collapses onto the start.
pub fn stored_slot_bounds(date: NaiveDate, time: NaiveTime, duration_minutes: i32) -> SlotBounds {
    slot_bounds(date, time, duration_minutes).unwrap_or_else(|| {
        let start = date.and_time(time);
        SlotBounds { start, end: start }
    })
}

/// Bounds for a new booking; an unrepresentable end is a bad request.
pub fn booking_bounds(
    date: NaiveDate,
    time: NaiveTime,
    duration_minutes: i32,
) -> Result<SlotBounds, ApiError> {
    slot_bounds(date, time, duration_minutes)
        .ok_or_else(|| ApiError::validation("Invalid date/time: appointment end is out of range"))
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_time_of_day(t: NaiveTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

/// Validates a weekly availability window: both `HH:MM`, end strictly after start.
pub fn parse_window(start: &str, end: &str) -> Result<(NaiveTime, NaiveTime), ApiError> {
    let start_t = NaiveTime::parse_from_str(start.trim(), TIME_FORMAT);
    let end_t = NaiveTime::parse_from_str(end.trim(), TIME_FORMAT);
    let (Ok(start_t), Ok(end_t)) = (start_t, end_t) else {
        return Err(ApiError::validation("Invalid time format. Use HH:MM"));
    };

    if end_t <= start_t {
        return Err(ApiError::validation("End time must be after start time"));
    }
    Ok((start_t, end_t))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(e: ApiError) -> String {
        match e {
            ApiError::BadRequest(_, msg) => msg,
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[test]
    fn thirty_minute_booking_bounds() {
        let (d, t) = parse_slot("2025-03-10", "09:00").unwrap();
        let bounds = slot_bounds(d, t, 30).unwrap();
        assert_eq!(format_timestamp(bounds.start), "2025-03-10T09:00:00");
        assert_eq!(format_timestamp(bounds.end), "2025-03-10T09:30:00");
    }

    #[test]
    fn end_minus_start_equals_duration() {
        let (d, t) = parse_slot("2024-12-31", "23:30").unwrap();
        for minutes in [15, 45, 60, 90, 240] {
            let b = slot_bounds(d, t, minutes).unwrap();
            assert_eq!(b.end - b.start, Duration::minutes(i64::from(minutes)));
        }
        // crosses midnight into the next year
        assert_eq!(format_timestamp(slot_bounds(d, t, 60).unwrap().end), "2025-01-01T00:30:00");
    }

    #[test]
    fn malformed_slot_reports_parse_detail() {
        let msg = message(parse_slot("2025-13-01", "09:00").unwrap_err());
        assert!(msg.starts_with("Invalid date/time format: "), "{msg}");
        assert!(msg.len() > "Invalid date/time format: ".len());

        assert!(parse_slot("10/03/2025", "09:00").is_err());
        assert!(parse_slot("2025-03-10", "9am").is_err());
        assert!(parse_slot("2025-03-10", "25:00").is_err());
    }

    #[test]
    fn window_rejects_equal_and_earlier_end() {
        for (start, end) in [("09:00", "09:00"), ("10:00", "09:59"), ("17:00", "08:00")] {
            let msg = message(parse_window(start, end).unwrap_err());
            assert_eq!(msg, "End time must be after start time");
        }
        let (s, e) = parse_window("09:00", "17:30").unwrap();
        assert_eq!(format_time_of_day(s), "09:00");
        assert_eq!(format_time_of_day(e), "17:30");
    }

    #[test]
    fn window_rejects_bad_format() {
        let msg = message(parse_window("nine", "17:00").unwrap_err());
        assert_eq!(msg, "Invalid time format. Use HH:MM");
    }

    #[test]
    fn last_representable_date_does_not_overflow() {
        let (d, t) = parse_slot("+262142-12-31", "23:30").unwrap();
        assert!(slot_bounds(d, t, 60).is_none());

        let msg = message(booking_bounds(d, t, 60).unwrap_err());
        assert!(msg.contains("out of range"), "{msg}");

        let stored = stored_slot_bounds(d, t, 60);
        assert_eq!(stored.start, stored.end);
        assert_eq!(stored.start, d.and_time(t));

        // the same date still fits a booking that ends before midnight
        assert!(slot_bounds(d, t, 15).is_some());
    }

    #[test]
    fn duration_fallback() {
        assert_eq!(effective_duration(None), 60);
        assert_eq!(effective_duration(Some(0)), 60);
        assert_eq!(effective_duration(Some(-5)), 60);
        assert_eq!(effective_duration(Some(20)), 20);
    }
}
