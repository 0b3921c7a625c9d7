//! Lease timestamp parsing.
//!
//! dhcpd writes times in one of two forms, both always in UTC:
//!
//! ```text
//! starts 2 2013/12/10 12:57:04;
//! starts epoch 1386680224; # Tue Dec 10 12:57:04 2013
//! ```
//!
//! The leading digit of the first form is the day of the week. It is
//! informational only and never checked against the date.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{Error, Result};

/// Token dhcpd writes for a lease that never ends.
pub const NEVER: &str = "never";

/// Date-time layouts that carry no offset; accepted only to report a
/// naive reference time precisely.
const NAIVE_LAYOUTS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

fn invalid(input: &str) -> Error {
    Error::InvalidTimestamp(input.to_string())
}

fn parse_numbers<const N: usize>(input: &str, text: &str, separator: char) -> Result<[u32; N]> {
    let mut values = [0u32; N];
    let mut parts = text.split(separator);
    for value in values.iter_mut() {
        let part = parts.next().ok_or_else(|| invalid(input))?;
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(input));
        }
        *value = part.parse().map_err(|_| invalid(input))?;
    }
    if parts.next().is_some() {
        return Err(invalid(input));
    }
    Ok(values)
}

/// Parses a lease timestamp into an absolute UTC time.
///
/// Accepts `<weekday> YYYY/MM/DD HH:MM:SS` and `epoch <seconds>`. The
/// `never` token is not a timestamp; use [`parse_expiry`] for fields that
/// may hold it.
///
/// # Errors
///
/// Returns [`Error::InvalidTimestamp`] if the input has any other shape or
/// names a date or time that does not exist.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>> {
    let mut fields = input.split(' ');
    let (Some(first), Some(date_part)) = (fields.next(), fields.next()) else {
        return Err(invalid(input));
    };

    if first == "epoch" {
        if fields.next().is_some() {
            return Err(invalid(input));
        }
        let seconds: i64 = date_part.parse().map_err(|_| invalid(input))?;
        return DateTime::from_timestamp(seconds, 0).ok_or_else(|| invalid(input));
    }

    let Some(time_part) = fields.next() else {
        return Err(invalid(input));
    };
    if fields.next().is_some() || first.len() != 1 || !first.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(input));
    }

    let [year, month, day] = parse_numbers::<3>(input, date_part, '/')?;
    let [hour, minute, second] = parse_numbers::<3>(input, time_part, ':')?;

    let year = i32::try_from(year).map_err(|_| invalid(input))?;
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| invalid(input))?;
    let datetime = date
        .and_hms_opt(hour, minute, second)
        .ok_or_else(|| invalid(input))?;

    Ok(datetime.and_utc())
}

/// Parses an `ends` value, mapping `never` to `None`.
pub fn parse_expiry(input: &str) -> Result<Option<DateTime<Utc>>> {
    if input == NEVER {
        Ok(None)
    } else {
        parse_timestamp(input).map(Some)
    }
}

/// Parses a caller-supplied reference time ("now").
///
/// The text must be RFC 3339 with an explicit offset (`Z` or `+02:00`);
/// the result is converted to UTC.
///
/// # Errors
///
/// Returns [`Error::NaiveReferenceTime`] if the text is a date-time without
/// an offset, and [`Error::InvalidConfig`] if it is not a date-time at all.
pub fn parse_reference_time(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(datetime.with_timezone(&Utc));
    }

    if NAIVE_LAYOUTS
        .iter()
        .any(|layout| NaiveDateTime::parse_from_str(trimmed, layout).is_ok())
    {
        return Err(Error::NaiveReferenceTime(input.to_string()));
    }

    Err(Error::InvalidConfig(format!(
        "reference time {input:?} is not an RFC 3339 timestamp"
    )))
}
