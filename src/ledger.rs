//! Fee ledger engine.
//!
//! Everything in here is a pure function of a [`Student`](crate::data::student::Student) snapshot
//! and the current moment, which callers pass in. Nothing here formats for display; labels are
//! the only strings produced.

use jiff::{
    Span, Timestamp,
    civil::{Date, DateTime},
    tz::TimeZone,
};
use snafu::Snafu;

mod due;
mod schedule;
mod summary;

pub use due::{NextDue, next_due_date};
pub use schedule::{MONEY_EPSILON, MonthEntry, MonthStatus, compute_monthly_schedule};
pub use summary::summarize_pending;

/// Why a student's record can't produce a schedule. Callers treat this as "no schedule
/// available" rather than as a failure of the request.
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum InvalidScheduleInput {
    #[snafu(display("joining date {joining:?} is not a calendar date"))]
    JoiningDate { joining: String },
    #[snafu(display("semester must be a positive number of months, found {semester}"))]
    Semester { semester: i32 },
    #[snafu(display("schedule runs past the supported calendar range"))]
    OutOfRange,
}

/// Parses the loosely-formatted dates that come out of forms and spreadsheets: plain dates,
/// civil datetimes (time is dropped) and RFC 3339 timestamps (taken in UTC).
pub fn parse_calendar_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    if let Ok(date) = raw.parse::<Date>() {
        return Some(date);
    }
    if let Ok(datetime) = raw.parse::<DateTime>() {
        return Some(datetime.date());
    }
    raw.parse::<Timestamp>()
        .ok()
        .map(|ts| ts.to_zoned(TimeZone::UTC).date())
}

/// Moves `date` by whole calendar months. When the day doesn't exist in the target month it is
/// clamped to that month's last day, so Jan 31 + 1 month is Feb 28/29 and never rolls into March.
pub fn add_months_clamped(date: Date, months: i64) -> Option<Date> {
    let span = Span::new().try_months(months).ok()?;
    date.checked_add(span).ok()
}
