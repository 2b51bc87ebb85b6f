//! Epoch-millisecond helpers for exchange timestamps.

use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::ValidationError;

/// ISO-8601 without an offset, as Upbit prints `candle_date_time_utc`.
const NAIVE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Milliseconds since the Unix epoch.
pub type EpochMillis = i64;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> EpochMillis {
    to_millis(OffsetDateTime::now_utc())
}

/// Parses an exchange timestamp into epoch milliseconds.
///
/// Accepts RFC3339 with any offset (`2021-01-01T09:00:00+09:00`), offset-less
/// ISO-8601 which exchanges publish as UTC (`2021-01-01T00:00:00`), and plain
/// integer milliseconds.
pub fn parse_epoch_millis(input: &str) -> Result<EpochMillis, ValidationError> {
    let trimmed = input.trim();
    if let Ok(millis) = trimmed.parse::<i64>() {
        return Ok(millis);
    }

    if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(to_millis(parsed));
    }

    PrimitiveDateTime::parse(trimmed, NAIVE_FORMAT)
        .map(|parsed| to_millis(parsed.assume_utc()))
        .map_err(|_| ValidationError::InvalidTimestamp {
            value: input.to_owned(),
        })
}

/// Parses an HTTP `Date` header (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn parse_http_date(input: &str) -> Result<EpochMillis, ValidationError> {
    OffsetDateTime::parse(input.trim(), &Rfc2822)
        .map(to_millis)
        .map_err(|_| ValidationError::InvalidTimestamp {
            value: input.to_owned(),
        })
}

/// Midpoint of a send/receive pair, rounded toward the send time.
pub fn midpoint(send_when: EpochMillis, receive_when: EpochMillis) -> EpochMillis {
    send_when + (receive_when - send_when).max(0) / 2
}

fn to_millis(value: OffsetDateTime) -> EpochMillis {
    (value.unix_timestamp_nanos() / 1_000_000) as EpochMillis
}
