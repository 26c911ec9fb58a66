use super::{
    InvalidScheduleInput, JoiningDateSnafu, OutOfRangeSnafu, SemesterSnafu, add_months_clamped,
    parse_calendar_date,
};
use crate::data::student::Student;
use jiff::{Zoned, civil::Date};
use snafu::OptionExt;

/// How many evenly spaced instalments the due-date heuristic assumes per semester.
pub const INSTALMENTS_PER_SEMESTER: i64 = 6;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NextDue {
    AllPaid,
    Overdue,
    Due(Date),
}

/// Coarse next-checkpoint estimate. Deliberately independent of
/// [`compute_monthly_schedule`](super::compute_monthly_schedule) and can disagree with it: it
/// only looks at how many calendar months have passed since joining, not at what was paid when.
pub fn next_due_date(student: &Student, now: &Zoned) -> Result<NextDue, InvalidScheduleInput> {
    if student.is_fully_paid() {
        return Ok(NextDue::AllPaid);
    }

    let details = &student.details;
    let joining = parse_calendar_date(&details.joining).context(JoiningDateSnafu {
        joining: details.joining.as_str(),
    })?;
    if details.semester <= 0 {
        return SemesterSnafu {
            semester: details.semester,
        }
        .fail();
    }

    let today = now.date();
    let elapsed = ((i64::from(today.year()) - i64::from(joining.year())) * 12
        + i64::from(today.month())
        - i64::from(joining.month()))
    .max(0);

    let semester = i64::from(details.semester);
    if elapsed >= semester {
        return Ok(NextDue::Overdue);
    }

    add_months_clamped(joining, instalment_offset(elapsed, semester))
        .map(NextDue::Due)
        .context(OutOfRangeSnafu)
}

/// Whole months from joining to the first instalment boundary at or after `elapsed`, with
/// boundaries every `semester / 6` months. Kept in integers so boundaries land exactly.
fn instalment_offset(elapsed: i64, semester: i64) -> i64 {
    let instalments = (elapsed * INSTALMENTS_PER_SEMESTER + semester - 1) / semester;
    instalments * semester / INSTALMENTS_PER_SEMESTER
}
