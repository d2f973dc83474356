//! Temporal parsing and arithmetic for FEEL values.
//!
//! The constructors here are total: malformed input yields `None`, which the
//! built-in temporal functions translate to Null.

use chrono::{DateTime, Datelike, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime};

use super::value::{DayTimeDuration, Value, YearMonthDuration};

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Parse a time of day: `HH:MM:SS[.fff]` with an optional `Z` or `±HH:MM`
/// offset suffix.
pub fn parse_time(s: &str) -> Option<Value> {
    if let Some(body) = s.strip_suffix('Z') {
        let time = parse_naive_time(body)?;
        return Some(Value::ZonedTime(time, FixedOffset::east_opt(0)?));
    }

    if let Some(idx) = offset_index(s) {
        let time = parse_naive_time(&s[..idx])?;
        let offset = parse_offset(&s[idx..])?;
        return Some(Value::ZonedTime(time, offset));
    }

    parse_naive_time(s).map(Value::LocalTime)
}

/// Parse a date-and-time: `YYYY-MM-DDTHH:MM:SS[.fff]` with an optional `Z`
/// or `±HH:MM` offset suffix. A bare date is midnight of that day.
pub fn parse_date_time(s: &str) -> Option<Value> {
    let t_idx = match s.find('T') {
        Some(idx) => idx,
        None => {
            let date = parse_date(s)?;
            return Some(Value::LocalDateTime(date.and_hms_opt(0, 0, 0)?));
        }
    };

    let time_part = &s[t_idx + 1..];
    let zoned = time_part.ends_with('Z') || offset_index(time_part).is_some();

    if zoned {
        DateTime::parse_from_rfc3339(s).ok().map(Value::ZonedDateTime)
    } else {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(Value::LocalDateTime)
    }
}

fn parse_naive_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f").ok()
}

/// Byte index where a trailing `±HH:MM` offset starts, if any. The sign can
/// only occur after the seconds field, so anything before index 8 is not an
/// offset.
fn offset_index(s: &str) -> Option<usize> {
    s.bytes()
        .enumerate()
        .rev()
        .find(|&(i, b)| (b == b'+' || b == b'-') && i >= 8)
        .map(|(i, _)| i)
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Parse an ISO-8601 duration into a years-and-months or days-and-time
/// duration value. Mixing the two families in one literal has no answer.
pub fn parse_duration(s: &str) -> Option<Value> {
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let s = s.strip_prefix('P')?;
    if s.is_empty() {
        return None;
    }

    let (date_part, time_part) = match s.split_once('T') {
        Some((d, t)) => {
            if t.is_empty() {
                return None;
            }
            (d, Some(t))
        }
        None => (s, None),
    };

    let mut months: i64 = 0;
    let mut nanos: i128 = 0;
    let mut has_months = false;
    let mut has_nanos = false;

    let mut remaining = date_part;
    while !remaining.is_empty() {
        let (value, frac, designator, rest) = next_component(remaining)?;
        if frac != 0 {
            return None; // only seconds may carry a fraction
        }
        match designator {
            'Y' => {
                months = months.checked_add(value.checked_mul(12)?)?;
                has_months = true;
            }
            'M' => {
                months = months.checked_add(value)?;
                has_months = true;
            }
            'D' => {
                nanos += value as i128 * DayTimeDuration::NANOS_PER_DAY as i128;
                has_nanos = true;
            }
            _ => return None,
        }
        remaining = rest;
    }

    if let Some(time_part) = time_part {
        let mut remaining = time_part;
        while !remaining.is_empty() {
            let (value, frac, designator, rest) = next_component(remaining)?;
            let per_unit: i128 = match designator {
                'H' => 3_600 * DayTimeDuration::NANOS_PER_SECOND as i128,
                'M' => 60 * DayTimeDuration::NANOS_PER_SECOND as i128,
                'S' => DayTimeDuration::NANOS_PER_SECOND as i128,
                _ => return None,
            };
            if frac != 0 && designator != 'S' {
                return None;
            }
            nanos += value as i128 * per_unit + frac as i128;
            has_nanos = true;
            remaining = rest;
        }
    }

    match (has_months, has_nanos) {
        (true, true) | (false, false) => None,
        (true, false) => {
            let months = if negative { -months } else { months };
            Some(Value::YearMonthDuration(YearMonthDuration::from_months(
                months,
            )))
        }
        (false, true) => {
            let nanos = if negative { -nanos } else { nanos };
            let nanos: i64 = nanos.try_into().ok()?;
            Some(Value::DayTimeDuration(DayTimeDuration::from_nanos(nanos)))
        }
    }
}

/// Read one `<number><designator>` component. Returns the integral value,
/// fractional nanoseconds, the designator, and the rest of the input.
fn next_component(s: &str) -> Option<(i64, i64, char, &str)> {
    let digits_end = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    if digits_end == 0 {
        return None;
    }

    let number = &s[..digits_end];
    let (int_part, frac_nanos) = match number.split_once('.') {
        Some((int_part, frac)) => {
            if frac.is_empty() || frac.len() > 9 {
                return None;
            }
            let scale = 10_i64.pow(9 - frac.len() as u32);
            (int_part, frac.parse::<i64>().ok()? * scale)
        }
        None => (number, 0),
    };

    let value: i64 = int_part.parse().ok()?;
    let mut rest_chars = s[digits_end..].chars();
    let designator = rest_chars.next()?;
    Some((value, frac_nanos, designator, rest_chars.as_str()))
}

/// Shift a date by a signed number of months, clamping to the last valid
/// day of the target month.
pub fn add_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let magnitude = u32::try_from(months.unsigned_abs()).ok()?;
    if months >= 0 {
        date.checked_add_months(Months::new(magnitude))
    } else {
        date.checked_sub_months(Months::new(magnitude))
    }
}

/// Shift a time of day by signed nanoseconds, wrapping modulo 24 hours.
pub fn shift_time(time: NaiveTime, nanos: i64) -> NaiveTime {
    time.overflowing_add_signed(chrono::Duration::nanoseconds(nanos))
        .0
}

/// Whole months between two dates, truncated toward zero.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let mut months = (to.year() as i64 - from.year() as i64) * 12
        + (to.month() as i64 - from.month() as i64);
    if months > 0 && to.day() < from.day() {
        months -= 1;
    } else if months < 0 && to.day() > from.day() {
        months += 1;
    }
    months
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn parse_dates() {
        assert_eq!(
            parse_date("2012-12-25"),
            NaiveDate::from_ymd_opt(2012, 12, 25)
        );
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date("2012-13-01"), None);
    }

    #[test]
    fn parse_times() {
        assert!(matches!(parse_time("11:00:00"), Some(Value::LocalTime(_))));
        assert!(matches!(
            parse_time("11:00:00.5"),
            Some(Value::LocalTime(_))
        ));
        assert!(matches!(
            parse_time("11:00:00+01:00"),
            Some(Value::ZonedTime(..))
        ));
        assert!(matches!(parse_time("11:00:00Z"), Some(Value::ZonedTime(..))));
        assert_eq!(parse_time("25:00:00"), None);
    }

    #[test]
    fn parse_date_times() {
        assert!(matches!(
            parse_date_time("2021-06-01T08:00:00"),
            Some(Value::LocalDateTime(_))
        ));
        assert!(matches!(
            parse_date_time("2021-06-01T08:00:00+02:00"),
            Some(Value::ZonedDateTime(_))
        ));
        assert!(matches!(
            parse_date_time("2021-06-01T08:00:00Z"),
            Some(Value::ZonedDateTime(_))
        ));
        // A bare date is midnight.
        assert!(matches!(
            parse_date_time("2021-06-01"),
            Some(Value::LocalDateTime(_))
        ));
        assert_eq!(parse_date_time("garbage"), None);
    }

    #[test]
    fn parse_day_time_durations() {
        assert_eq!(
            parse_duration("P1D"),
            Some(Value::DayTimeDuration(DayTimeDuration::from_days(1)))
        );
        assert_eq!(
            parse_duration("PT1H30M"),
            Some(Value::DayTimeDuration(DayTimeDuration::from_seconds(5_400)))
        );
        assert_eq!(
            parse_duration("PT0.5S"),
            Some(Value::DayTimeDuration(DayTimeDuration::from_nanos(
                500_000_000
            )))
        );
        assert_eq!(
            parse_duration("-PT30S"),
            Some(Value::DayTimeDuration(DayTimeDuration::from_seconds(-30)))
        );
    }

    #[test]
    fn parse_year_month_durations() {
        assert_eq!(
            parse_duration("P1Y2M"),
            Some(Value::YearMonthDuration(YearMonthDuration::new(1, 2)))
        );
        assert_eq!(
            parse_duration("-P3M"),
            Some(Value::YearMonthDuration(YearMonthDuration::from_months(-3)))
        );
    }

    #[test]
    fn parse_duration_rejects_bad_input() {
        assert_eq!(parse_duration("P"), None);
        assert_eq!(parse_duration("PT"), None);
        assert_eq!(parse_duration("1D"), None);
        assert_eq!(parse_duration("P1X"), None);
        // Mixed families have no answer.
        assert_eq!(parse_duration("P1Y1D"), None);
        // Fractions are only valid on seconds.
        assert_eq!(parse_duration("PT0.5H"), None);
    }

    #[test]
    fn month_arithmetic_clamps() {
        assert_eq!(
            add_months(date("2023-10-06"), 1),
            Some(date("2023-11-06"))
        );
        assert_eq!(
            add_months(date("2023-01-31"), 1),
            Some(date("2023-02-28"))
        );
        assert_eq!(add_months(date("2023-03-31"), -1), Some(date("2023-02-28")));
    }

    #[test]
    fn time_arithmetic_wraps() {
        let t = parse_naive_time("23:00:00").unwrap();
        let shifted = shift_time(t, 2 * 3_600 * DayTimeDuration::NANOS_PER_SECOND);
        assert_eq!(shifted, parse_naive_time("01:00:00").unwrap());

        let back = shift_time(t, -24 * 3_600 * DayTimeDuration::NANOS_PER_SECOND);
        assert_eq!(back, t);
    }

    #[test]
    fn months_between_truncates() {
        assert_eq!(months_between(date("2020-01-01"), date("2021-06-01")), 17);
        assert_eq!(months_between(date("2020-01-15"), date("2020-03-14")), 1);
        assert_eq!(months_between(date("2021-06-01"), date("2020-01-01")), -17);
    }
}
