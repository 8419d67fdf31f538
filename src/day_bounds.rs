//! Day-aligned UTC boundaries for date range filters.

use time::{
    Date, OffsetDateTime, Time, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::{format_description, time},
};

use crate::Error;

const END_OF_DAY: Time = time!(23:59:59.999);

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// The instant at 00:00:00.000 UTC on the UTC calendar date of `instant`.
pub fn start_of_day_utc(instant: OffsetDateTime) -> OffsetDateTime {
    instant
        .to_offset(UtcOffset::UTC)
        .replace_time(Time::MIDNIGHT)
}

/// The instant at 23:59:59.999 UTC on the UTC calendar date of `instant`.
pub fn end_of_day_utc(instant: OffsetDateTime) -> OffsetDateTime {
    instant.to_offset(UtcOffset::UTC).replace_time(END_OF_DAY)
}

/// Parse a date range bound from a query parameter.
///
/// Accepts an RFC 3339 instant, e.g. "2020-01-02T23:59:59.999Z", or a bare
/// calendar date, e.g. "2020-01-02", which is read as midnight UTC.
///
/// # Errors
/// Returns [Error::InvalidRangeParameters] if `text` is neither.
pub fn parse_instant(text: &str) -> Result<OffsetDateTime, Error> {
    let text = text.trim();

    if let Ok(instant) = OffsetDateTime::parse(text, &Rfc3339) {
        return Ok(instant);
    }

    Date::parse(text, DATE_FORMAT)
        .map(|date| date.midnight().assume_utc())
        .map_err(|_| {
            Error::InvalidRangeParameters(format!("\"{text}\" is not an ISO-8601 date or instant"))
        })
}

/// An inclusive date range filter over transaction creation times.
///
/// A transaction matches when the start of its UTC creation day falls within
/// `[start_of_day_utc(start), end]`. Normalizing the transaction side means a
/// transaction created at any time on the final day of the range is included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRangeFilter {
    start: OffsetDateTime,
    end: OffsetDateTime,
}

impl DateRangeFilter {
    /// Create a filter for the range `[start, end]`.
    ///
    /// A reversed range, where `end` is before the start of `start`'s day, is
    /// empty and matches no transactions.
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Self {
        Self {
            start: start_of_day_utc(start),
            end,
        }
    }

    /// Whether the range matches no transactions at all.
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// The day-aligned start of the range.
    pub fn start(&self) -> OffsetDateTime {
        self.start
    }

    /// The inclusive end of the range.
    pub fn end(&self) -> OffsetDateTime {
        self.end
    }

    /// Whether a transaction created at `created_at` is within the range.
    pub fn contains(&self, created_at: OffsetDateTime) -> bool {
        let created_day = start_of_day_utc(created_at);

        self.start <= created_day && created_day <= self.end
    }
}
