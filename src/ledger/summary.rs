use super::{MonthEntry, MonthStatus};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PendingSummary {
    pub pending_months: usize,
    pub overdue_months: usize,
    pub pending_amount: f64,
    pub overdue_amount: f64,
}

impl PendingSummary {
    pub const fn has_pending(&self) -> bool {
        self.pending_months > 0
    }
}

/// Totals up everything not yet paid. Overdue months count towards both the pending and overdue
/// figures.
pub fn summarize_pending(schedule: &[MonthEntry]) -> PendingSummary {
    schedule
        .iter()
        .filter(|entry| entry.status != MonthStatus::Paid)
        .fold(PendingSummary::default(), |mut summary, entry| {
            summary.pending_months += 1;
            summary.pending_amount += entry.outstanding();

            if entry.status == MonthStatus::Overdue {
                summary.overdue_months += 1;
                summary.overdue_amount += entry.outstanding();
            }

            summary
        })
}
