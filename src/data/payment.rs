use jiff::{Timestamp, civil::Date, tz::TimeZone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub amount: f64,
    /// The moment this payment is attributed to, which can be earlier than when it was recorded.
    pub date: Timestamp,
}

impl Payment {
    pub fn new(amount: f64, date: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount,
            date,
        }
    }

    pub fn local_date(&self, tz: &TimeZone) -> Date {
        self.date.to_zoned(tz.clone()).date()
    }
}
