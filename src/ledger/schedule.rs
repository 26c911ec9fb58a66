use super::{
    InvalidScheduleInput, JoiningDateSnafu, OutOfRangeSnafu, SemesterSnafu, add_months_clamped,
    parse_calendar_date,
};
use crate::data::student::{MAX_SEMESTER_MONTHS, Student};
use jiff::{Zoned, civil::Date};
use snafu::OptionExt;
use std::fmt::{Display, Formatter};

/// Slack allowed when deciding whether a month's allocation covers its fee, so that a fee split
/// into thirds and paid back in thirds still counts as paid.
pub const MONEY_EPSILON: f64 = 1e-6;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MonthStatus {
    Paid,
    Partial,
    Pending,
    Overdue,
}

impl MonthStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Partial => "partial",
            Self::Pending => "pending",
            Self::Overdue => "overdue",
        }
    }
}

impl Display for MonthStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MonthEntry {
    /// 1-based position within the semester.
    pub sequence: u32,
    pub label: String,
    pub anchor: Date,
    pub month_start: Date,
    pub month_end: Date,
    pub required: f64,
    pub paid: f64,
    /// Allocation left over after this month, offset against the following months.
    pub carry_forward: f64,
    pub status: MonthStatus,
}

impl MonthEntry {
    pub fn outstanding(&self) -> f64 {
        self.required - self.paid
    }
}

/// Rebuilds the month-by-month ledger for `student`.
///
/// Payments are taken in date order and walked alongside the months with a single cursor: a
/// payment counts towards the month it falls in, any excess carries forward, and payments dated
/// before the first month are skipped rather than reallocated. Payments dated after the final
/// month end up in the final carry-forward, so the paid amounts plus that carry always add up to
/// everything paid from the first month onwards.
///
/// `now` supplies both "today" for the overdue check and the time zone used to turn payment
/// instants into calendar dates.
pub fn compute_monthly_schedule(
    student: &Student,
    now: &Zoned,
) -> Result<Vec<MonthEntry>, InvalidScheduleInput> {
    let details = &student.details;
    let joining = parse_calendar_date(&details.joining).context(JoiningDateSnafu {
        joining: details.joining.as_str(),
    })?;
    let months = u32::try_from(details.semester)
        .ok()
        .filter(|months| *months > 0)
        .context(SemesterSnafu {
            semester: details.semester,
        })?;

    let monthly_fee = details.total_fees / f64::from(months);
    let tz = now.time_zone();
    let today = now.date();

    let mut payments: Vec<(Date, f64)> = student
        .fee_history()
        .iter()
        .map(|payment| (payment.local_date(tz), payment.amount))
        .collect();
    payments.sort_by_key(|(date, _)| *date);

    let capacity = months.min(MAX_SEMESTER_MONTHS.unsigned_abs()) as usize;
    let mut entries = Vec::with_capacity(capacity);
    let mut cursor = 0;
    let mut carry = 0.0;
    let mut anchor = joining;

    for sequence in 1..=months {
        if sequence > 1 {
            anchor = add_months_clamped(anchor, 1).context(OutOfRangeSnafu)?;
        }
        let month_start = anchor.first_of_month();
        let month_end = anchor.last_of_month();

        let mut to_allocate = carry;
        while let Some(&(date, amount)) = payments.get(cursor) {
            if date > month_end {
                break;
            }
            if date >= month_start {
                to_allocate += amount;
            }
            cursor += 1;
        }

        let paid = to_allocate.min(monthly_fee);
        carry = to_allocate - paid;

        let mut status = if paid >= monthly_fee - MONEY_EPSILON {
            MonthStatus::Paid
        } else if paid > 0.0 {
            MonthStatus::Partial
        } else {
            MonthStatus::Pending
        };
        if status != MonthStatus::Paid && today > month_end {
            status = MonthStatus::Overdue;
        }

        entries.push(MonthEntry {
            sequence,
            label: month_label(sequence, anchor, month_start, month_end),
            anchor,
            month_start,
            month_end,
            required: monthly_fee,
            paid,
            carry_forward: carry,
            status,
        });
    }

    let after_last_month: f64 = payments[cursor..].iter().map(|(_, amount)| amount).sum();
    if let Some(last) = entries.last_mut() {
        last.carry_forward += after_last_month;
    }

    Ok(entries)
}

fn month_label(sequence: u32, anchor: Date, month_start: Date, month_end: Date) -> String {
    format!(
        "{} (Month {sequence}) - {} {} to {} {} {}",
        anchor.strftime("%B %Y"),
        month_start.day(),
        month_start.strftime("%b"),
        month_end.day(),
        month_end.strftime("%b"),
        month_end.year()
    )
}
