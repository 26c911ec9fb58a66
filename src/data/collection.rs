use crate::{
    data::{
        payment::Payment,
        student::{Student, StudentDetails, normalise_email},
    },
    error::{
        DuplicateEmailSnafu, FeebookResult, InvalidPaymentAmountSnafu, MissingStudentSnafu,
        PaymentExceedsBalanceSnafu,
    },
    ledger::MONEY_EPSILON,
};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ensure};
use std::collections::HashSet;
use uuid::Uuid;

/// Every student, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentCollection {
    students: Vec<Student>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Paid,
    Pending,
}

impl StatusFilter {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Paid => "paid",
            Self::Pending => "pending",
        }
    }

    fn matches(self, student: &Student) -> bool {
        match self {
            Self::All => true,
            Self::Paid => student.is_fully_paid(),
            Self::Pending => !student.is_fully_paid(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CollectionStats {
    pub total_students: usize,
    pub paid_students: usize,
    pub pending_students: usize,
    pub total_revenue: f64,
    pub total_pending: f64,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub added: usize,
    pub duplicates: usize,
}

impl StudentCollection {
    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn get(&self, id: Uuid) -> Option<&Student> {
        self.students.iter().find(|student| student.id == id)
    }

    fn get_mut(&mut self, id: Uuid) -> FeebookResult<&mut Student> {
        self.students
            .iter_mut()
            .find(|student| student.id == id)
            .context(MissingStudentSnafu { id })
    }

    fn email_taken(&self, email: &str, ignoring: Option<Uuid>) -> bool {
        self.students
            .iter()
            .any(|student| Some(student.id) != ignoring && student.has_email(email))
    }

    pub fn add_student(&mut self, details: StudentDetails, now: Timestamp) -> FeebookResult<Uuid> {
        ensure!(
            !self.email_taken(&details.email, None),
            DuplicateEmailSnafu {
                email: details.email
            }
        );

        let student = Student::new(details, now);
        let id = student.id;
        info!(%id, name = %student.details.name, "Adding student");
        self.students.push(student);
        Ok(id)
    }

    /// Replaces the editable details of a student. Payments are left alone.
    pub fn update_student(&mut self, id: Uuid, details: StudentDetails) -> FeebookResult<()> {
        self.get(id).context(MissingStudentSnafu { id })?;
        ensure!(
            !self.email_taken(&details.email, Some(id)),
            DuplicateEmailSnafu {
                email: details.email
            }
        );

        let student = self.get_mut(id)?;
        student.details = details;
        info!(%id, "Updated student");
        Ok(())
    }

    pub fn remove_student(&mut self, id: Uuid) -> Option<Student> {
        let index = self.students.iter().position(|student| student.id == id)?;
        let student = self.students.remove(index);
        info!(%id, payments = student.fee_history().len(), "Removed student");
        Some(student)
    }

    pub fn record_payment(
        &mut self,
        student_id: Uuid,
        amount: f64,
        date: Timestamp,
    ) -> FeebookResult<Uuid> {
        ensure!(
            amount.is_finite() && amount > 0.0,
            InvalidPaymentAmountSnafu {
                amount: amount.to_string()
            }
        );

        let student = self.get_mut(student_id)?;
        let remaining = student.remaining_fees();
        ensure!(
            amount <= remaining + MONEY_EPSILON,
            PaymentExceedsBalanceSnafu { amount, remaining }
        );

        let payment = Payment::new(amount, date);
        let id = payment.id;
        student.push_payment(payment);
        info!(%student_id, payment_id = %id, amount, "Recorded payment");
        Ok(id)
    }

    pub fn delete_payment(&mut self, student_id: Uuid, payment_id: Uuid) -> Option<Payment> {
        let student = self
            .students
            .iter_mut()
            .find(|student| student.id == student_id)?;
        let payment = student.take_payment(payment_id)?;
        info!(%student_id, %payment_id, amount = payment.amount, "Deleted payment");
        Some(payment)
    }

    /// Appends imported students whose email isn't already present, either in the collection or
    /// earlier in the same batch. Imported ids that collide with an existing one are replaced.
    pub fn merge_imported(&mut self, imported: Vec<Student>) -> ImportOutcome {
        let mut emails: HashSet<String> = self
            .students
            .iter()
            .map(|student| normalise_email(&student.details.email))
            .collect();
        let mut ids: HashSet<Uuid> = self.students.iter().map(|student| student.id).collect();

        let mut outcome = ImportOutcome::default();
        for mut student in imported {
            if !emails.insert(normalise_email(&student.details.email)) {
                outcome.duplicates += 1;
                continue;
            }
            while !ids.insert(student.id) {
                let fresh = Uuid::new_v4();
                warn!(old = %student.id, new = %fresh, "Imported student id already in use, replacing");
                student.id = fresh;
            }

            self.students.push(student);
            outcome.added += 1;
        }

        info!(?outcome, "Merged imported students");
        outcome
    }

    pub fn search(&self, query: &str, filter: StatusFilter) -> Vec<&Student> {
        let query = query.trim();
        let lowered = query.to_lowercase();

        self.students
            .iter()
            .filter(|student| {
                let details = &student.details;
                lowered.is_empty()
                    || details.name.to_lowercase().contains(&lowered)
                    || details.email.to_lowercase().contains(&lowered)
                    || details.phone.contains(query)
            })
            .filter(|student| filter.matches(student))
            .collect()
    }

    pub fn stats(&self) -> CollectionStats {
        self.students
            .iter()
            .fold(CollectionStats::default(), |mut stats, student| {
                stats.total_students += 1;
                if student.is_fully_paid() {
                    stats.paid_students += 1;
                } else {
                    stats.pending_students += 1;
                }
                stats.total_revenue += student.paid_fees();
                stats.total_pending += student.remaining_fees().max(0.0);
                stats
            })
    }

    /// The `n` most recently created students, newest first.
    pub fn recent(&self, n: usize) -> Vec<&Student> {
        let mut by_creation: Vec<&Student> = self.students.iter().collect();
        by_creation.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        by_creation.truncate(n);
        by_creation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::student::test_details, error::FeebookError};
    use approx::assert_relative_eq;

    fn ts(seconds: i64) -> Timestamp {
        Timestamp::from_second(seconds).unwrap()
    }

    fn with_two() -> (StudentCollection, Uuid, Uuid) {
        let mut collection = StudentCollection::default();
        let asha = collection
            .add_student(test_details("Asha Rao", "asha@example.org"), ts(10))
            .unwrap();
        let mut ben = test_details("Ben Okafor", "ben@example.org");
        ben.phone = "0712345678".to_string();
        ben.total_fees = 1200.0;
        let ben = collection.add_student(ben, ts(20)).unwrap();
        (collection, asha, ben)
    }

    #[test]
    fn new_students_start_with_nothing_paid() {
        let (collection, asha, _) = with_two();
        let student = collection.get(asha).unwrap();
        assert_relative_eq!(student.paid_fees(), 0.0);
        assert!(student.fee_history().is_empty());
        assert_eq!(student.created_at, ts(10));
    }

    #[test]
    fn duplicate_email_is_rejected_without_change() {
        let (mut collection, _, _) = with_two();
        let before = collection.clone();

        let result =
            collection.add_student(test_details("Someone Else", " ASHA@example.org "), ts(30));
        assert!(matches!(result, Err(FeebookError::DuplicateEmail { .. })));
        assert_eq!(collection, before);
    }

    #[test]
    fn update_keeps_payments_and_checks_other_emails() {
        let (mut collection, asha, ben) = with_two();
        collection.record_payment(asha, 250.0, ts(40)).unwrap();

        let mut details = test_details("Asha R.", "asha.rao@example.org");
        details.total_fees = 9000.0;
        collection.update_student(asha, details).unwrap();

        let student = collection.get(asha).unwrap();
        assert_eq!(student.details.name, "Asha R.");
        assert_relative_eq!(student.paid_fees(), 250.0);
        assert_eq!(student.fee_history().len(), 1);

        collection
            .update_student(ben, test_details("Ben Okafor", "BEN@example.org"))
            .unwrap();
        assert!(matches!(
            collection.update_student(ben, test_details("Ben", "asha.rao@example.org")),
            Err(FeebookError::DuplicateEmail { .. })
        ));
        assert!(matches!(
            collection.update_student(Uuid::new_v4(), test_details("Nobody", "no@example.org")),
            Err(FeebookError::MissingStudent { .. })
        ));
    }

    #[test]
    fn updating_a_missing_student_is_reported_before_email_clashes() {
        let (mut collection, _, _) = with_two();
        let before = collection.clone();

        let result =
            collection.update_student(Uuid::new_v4(), test_details("Nobody", "asha@example.org"));
        assert!(matches!(result, Err(FeebookError::MissingStudent { .. })));
        assert_eq!(collection, before);
    }

    #[test]
    fn payment_validation() {
        let (mut collection, _, ben) = with_two();

        for amount in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                collection.record_payment(ben, amount, ts(50)),
                Err(FeebookError::InvalidPaymentAmount { .. })
            ));
        }
        assert!(matches!(
            collection.record_payment(ben, 1200.01, ts(50)),
            Err(FeebookError::PaymentExceedsBalance { .. })
        ));
        assert!(matches!(
            collection.record_payment(Uuid::new_v4(), 10.0, ts(50)),
            Err(FeebookError::MissingStudent { .. })
        ));

        collection.record_payment(ben, 1200.0, ts(50)).unwrap();
        assert!(collection.get(ben).unwrap().is_fully_paid());
    }

    #[test]
    fn paid_total_follows_payment_history() {
        let (mut collection, asha, _) = with_two();
        let first = collection.record_payment(asha, 100.1, ts(50)).unwrap();
        collection.record_payment(asha, 200.2, ts(40)).unwrap();
        collection.record_payment(asha, 0.3, ts(60)).unwrap();

        let removed = collection.delete_payment(asha, first).unwrap();
        assert_relative_eq!(removed.amount, 100.1);

        let student = collection.get(asha).unwrap();
        let history_total: f64 = student.fee_history().iter().map(|p| p.amount).sum();
        assert_relative_eq!(student.paid_fees(), history_total, epsilon = 1e-9);
        assert_relative_eq!(student.paid_fees(), 200.5, epsilon = 1e-9);
    }

    #[test]
    fn deleting_missing_things_is_a_no_op() {
        let (mut collection, asha, _) = with_two();
        collection.record_payment(asha, 10.0, ts(50)).unwrap();
        let before = collection.clone();

        assert!(collection.delete_payment(asha, Uuid::new_v4()).is_none());
        assert!(collection.delete_payment(Uuid::new_v4(), Uuid::new_v4()).is_none());
        assert!(collection.remove_student(Uuid::new_v4()).is_none());
        assert_eq!(collection, before);

        assert!(collection.remove_student(asha).is_some());
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn import_merge_never_duplicates_emails() {
        let (mut collection, asha, _) = with_two();

        let clashing_id =
            Student::from_parts(asha, test_details("Cara", "cara@example.org"), vec![], ts(5));
        let existing_email = Student::from_parts(
            Uuid::new_v4(),
            test_details("Asha Again", "Asha@Example.org"),
            vec![],
            ts(5),
        );
        let fresh = Student::from_parts(
            Uuid::new_v4(),
            test_details("Dev", "dev@example.org"),
            vec![Payment::new(300.0, ts(6))],
            ts(6),
        );
        let repeated_in_batch = Student::from_parts(
            Uuid::new_v4(),
            test_details("Dev Twin", "dev@example.org"),
            vec![],
            ts(7),
        );

        let outcome = collection.merge_imported(vec![
            clashing_id,
            existing_email,
            fresh,
            repeated_in_batch,
        ]);
        assert_eq!(
            outcome,
            ImportOutcome {
                added: 2,
                duplicates: 2
            }
        );
        assert_eq!(collection.len(), 4);

        let emails: HashSet<String> = collection
            .students()
            .iter()
            .map(|s| normalise_email(&s.details.email))
            .collect();
        assert_eq!(emails.len(), 4);
        let ids: HashSet<Uuid> = collection.students().iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), 4);
        assert_eq!(collection.get(asha).unwrap().details.name, "Asha Rao");
    }

    #[test]
    fn search_matches_name_email_and_phone() {
        let (mut collection, asha, ben) = with_two();
        collection.record_payment(ben, 1200.0, ts(50)).unwrap();

        let ids = |found: Vec<&Student>| found.iter().map(|s| s.id).collect::<Vec<_>>();

        assert_eq!(ids(collection.search("ASHA", StatusFilter::All)), vec![asha]);
        assert_eq!(
            ids(collection.search("example.org", StatusFilter::All)),
            vec![asha, ben]
        );
        assert_eq!(ids(collection.search("07123", StatusFilter::All)), vec![ben]);
        assert_eq!(ids(collection.search("", StatusFilter::Paid)), vec![ben]);
        assert_eq!(ids(collection.search("", StatusFilter::Pending)), vec![asha]);
        assert!(collection.search("zzz", StatusFilter::All).is_empty());
    }

    #[test]
    fn stats_and_recent() {
        let (mut collection, asha, ben) = with_two();
        collection.record_payment(asha, 1000.0, ts(50)).unwrap();
        collection.record_payment(ben, 1200.0, ts(50)).unwrap();

        let stats = collection.stats();
        assert_eq!(stats.total_students, 2);
        assert_eq!(stats.paid_students, 1);
        assert_eq!(stats.pending_students, 1);
        assert_relative_eq!(stats.total_revenue, 2200.0);
        assert_relative_eq!(stats.total_pending, 5000.0);

        let recent: Vec<Uuid> = collection.recent(5).iter().map(|s| s.id).collect();
        assert_eq!(recent, vec![ben, asha]);
        assert_eq!(collection.recent(1).len(), 1);
        assert_eq!(collection.students()[0].id, asha);
    }
}
