use crate::{data::payment::Payment, ledger::parse_calendar_date};
use bitflags::bitflags;
use email_address::EmailAddress;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest semester the add/edit form accepts, in months.
pub const MAX_SEMESTER_MONTHS: i32 = 240;

/// Everything about a student that the edit form can change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentDetails {
    pub name: String,
    pub age: Option<u16>,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub dob: String,
    /// Kept as entered so that imported records with odd dates stay viewable; the ledger parses it.
    pub joining: String,
    pub semester: i32,
    pub total_fees: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub details: StudentDetails,
    paid_fees: f64,
    fee_history: Vec<Payment>,
    pub created_at: Timestamp,
}

impl Student {
    pub fn new(details: StudentDetails, created_at: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            details,
            paid_fees: 0.0,
            fee_history: vec![],
            created_at,
        }
    }

    /// Rebuilds a student from stored or imported parts; the paid total always comes from the
    /// history.
    pub fn from_parts(
        id: Uuid,
        details: StudentDetails,
        fee_history: Vec<Payment>,
        created_at: Timestamp,
    ) -> Self {
        let paid_fees = fee_history.iter().map(|payment| payment.amount).sum();
        Self {
            id,
            details,
            paid_fees,
            fee_history,
            created_at,
        }
    }

    pub const fn paid_fees(&self) -> f64 {
        self.paid_fees
    }

    pub fn fee_history(&self) -> &[Payment] {
        &self.fee_history
    }

    pub fn is_fully_paid(&self) -> bool {
        self.paid_fees >= self.details.total_fees
    }

    pub fn remaining_fees(&self) -> f64 {
        self.details.total_fees - self.paid_fees
    }

    pub fn progress_percentage(&self) -> f64 {
        if self.details.total_fees > 0.0 {
            self.paid_fees / self.details.total_fees * 100.0
        } else {
            0.0
        }
    }

    pub fn has_email(&self, email: &str) -> bool {
        normalise_email(&self.details.email) == normalise_email(email)
    }

    pub(crate) fn push_payment(&mut self, payment: Payment) {
        self.paid_fees += payment.amount;
        self.fee_history.push(payment);
    }

    pub(crate) fn take_payment(&mut self, payment_id: Uuid) -> Option<Payment> {
        let index = self
            .fee_history
            .iter()
            .position(|payment| payment.id == payment_id)?;
        let payment = self.fee_history.remove(index);
        self.paid_fees -= payment.amount;
        Some(payment)
    }
}

pub fn normalise_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct StudentForm {
    pub name: String,
    #[serde(default)]
    pub age: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub dob: String,
    pub joining: String,
    pub semester: String,
    pub fees: String,
}

impl From<&StudentDetails> for StudentForm {
    fn from(details: &StudentDetails) -> Self {
        Self {
            name: details.name.clone(),
            age: details.age.map(|age| age.to_string()).unwrap_or_default(),
            email: details.email.clone(),
            phone: details.phone.clone(),
            address: details.address.clone(),
            dob: details.dob.clone(),
            joining: details.joining.clone(),
            semester: details.semester.to_string(),
            fees: details.total_fees.to_string(),
        }
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct StudentFormError: u16 {
        const EMPTY_NAME =       0b0000_0000_0001;
        const EMPTY_EMAIL =      0b0000_0000_0010;
        const EMPTY_PHONE =      0b0000_0000_0100;

        const INVALID_EMAIL =    0b0000_0001_0000;
        const INVALID_AGE =      0b0000_0010_0000;
        const INVALID_JOINING =  0b0000_0100_0000;
        const INVALID_SEMESTER = 0b0000_1000_0000;
        const INVALID_FEES =     0b0001_0000_0000;
    }
}

impl StudentFormError {
    pub fn as_nice_list(&self) -> impl Iterator<Item = &'static str> {
        self.iter().filter_map(|x| match x {
            Self::EMPTY_NAME => Some("Name is required"),
            Self::EMPTY_EMAIL => Some("Email is required"),
            Self::EMPTY_PHONE => Some("Phone number is required"),
            Self::INVALID_EMAIL => Some("Email address isn't valid"),
            Self::INVALID_AGE => Some("Age must be a whole number"),
            Self::INVALID_JOINING => Some("Joining date isn't a valid date"),
            Self::INVALID_SEMESTER => Some("Semester must be a positive number of months"),
            Self::INVALID_FEES => Some("Total fees must be a positive amount"),
            _ => None,
        })
    }
}

impl StudentForm {
    pub fn validate(self) -> Result<StudentDetails, StudentFormError> {
        let mut errors = StudentFormError::empty();

        let name = self.name.trim().to_string();
        if name.is_empty() {
            errors |= StudentFormError::EMPTY_NAME;
        }

        let email = self.email.trim().to_string();
        if email.is_empty() {
            errors |= StudentFormError::EMPTY_EMAIL;
        } else if !EmailAddress::is_valid(&email) {
            errors |= StudentFormError::INVALID_EMAIL;
        }

        let phone = self.phone.trim().to_string();
        if phone.is_empty() {
            errors |= StudentFormError::EMPTY_PHONE;
        }

        let age = match self.age.trim() {
            "" => None,
            age => age.parse::<u16>().map_or_else(
                |_| {
                    errors |= StudentFormError::INVALID_AGE;
                    None
                },
                Some,
            ),
        };

        let joining = self.joining.trim().to_string();
        if parse_calendar_date(&joining).is_none() {
            errors |= StudentFormError::INVALID_JOINING;
        }

        let semester = match self.semester.trim().parse::<i32>() {
            Ok(months) if (1..=MAX_SEMESTER_MONTHS).contains(&months) => months,
            _ => {
                errors |= StudentFormError::INVALID_SEMESTER;
                0
            }
        };

        let total_fees = match self.fees.trim().parse::<f64>() {
            Ok(fees) if fees.is_finite() && fees > 0.0 => fees,
            _ => {
                errors |= StudentFormError::INVALID_FEES;
                0.0
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(StudentDetails {
            name,
            age,
            email,
            phone,
            address: self.address.trim().to_string(),
            dob: self.dob.trim().to_string(),
            joining,
            semester,
            total_fees,
        })
    }
}

#[cfg(test)]
pub fn test_details(name: &str, email: &str) -> StudentDetails {
    StudentDetails {
        name: name.to_string(),
        age: Some(19),
        email: email.to_string(),
        phone: "9876543210".to_string(),
        address: "12 Lake Road".to_string(),
        dob: "2005-04-01".to_string(),
        joining: "2024-01-01".to_string(),
        semester: 6,
        total_fees: 6000.0,
    }
}

#[cfg(test)]
pub fn test_student(
    joining: &str,
    semester: i32,
    total_fees: f64,
    fee_history: Vec<Payment>,
) -> Student {
    let mut details = test_details("Asha Rao", "asha@example.org");
    details.joining = joining.to_string();
    details.semester = semester;
    details.total_fees = total_fees;
    Student::from_parts(Uuid::new_v4(), details, fee_history, Timestamp::UNIX_EPOCH)
}
