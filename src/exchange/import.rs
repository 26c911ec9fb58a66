use super::{PAYMENTS_TABLE, STUDENTS_TABLE};
use crate::{
    data::{
        payment::Payment,
        student::{MAX_SEMESTER_MONTHS, Student, StudentDetails},
    },
    error::{
        B64Snafu, EmailSnafu, FeebookError, FeebookResult, InvalidImportValueSnafu,
        MissingImportTableSnafu, MissingImportValueSnafu, ReadImportTableSnafu,
        RmpSerdeDecodeSnafu, RmpSerdeEncodeSnafu, UnknownImportStudentSnafu, ZipSnafu,
        ZoneDateSnafu,
    },
    ledger::{MONEY_EPSILON, parse_calendar_date},
};
use base64::{Engine, prelude::BASE64_URL_SAFE};
use email_address::EmailAddress;
use jiff::{Timestamp, Zoned};
use serde::Deserialize;
use snafu::{OptionExt, ResultExt, ensure};
use std::{
    collections::HashMap,
    io::{Cursor, Read},
};
use uuid::Uuid;
use zip::{ZipArchive, result::ZipError};

#[derive(Deserialize, Default)]
#[serde(default)]
struct StudentRecord {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Age")]
    age: String,
    #[serde(rename = "Email")]
    email: String,
    #[serde(rename = "Phone")]
    phone: String,
    #[serde(rename = "Address")]
    address: String,
    #[serde(rename = "Date of Birth")]
    dob: String,
    #[serde(rename = "Joining Date")]
    joining: String,
    #[serde(rename = "Semester Duration (Months)")]
    semester: String,
    #[serde(rename = "Total Fees")]
    total_fees: String,
    #[serde(rename = "Paid Fees")]
    paid_fees: String,
    #[serde(rename = "Created Date")]
    created_at: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PaymentRecord {
    #[serde(rename = "Student ID")]
    student_id: String,
    #[serde(rename = "Payment ID")]
    payment_id: String,
    #[serde(rename = "Amount")]
    amount: String,
    #[serde(rename = "Payment Date")]
    date: String,
}

struct DraftStudent {
    id: Uuid,
    details: StudentDetails,
    created_at: Timestamp,
    stated_paid: Option<f64>,
    row: usize,
    payments: Vec<Payment>,
}

/// Students read out of an uploaded file, along with anything that had to be skipped.
#[derive(Debug, Default)]
pub struct ImportBundle {
    pub students: Vec<Student>,
    pub problems: Vec<String>,
}

fn read_zip_table(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    table: &'static str,
) -> FeebookResult<Option<Vec<u8>>> {
    let mut file = match archive.by_name(table) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(source) => return Err(source).context(ZipSnafu),
    };

    let mut contents = vec![];
    file.read_to_end(&mut contents)
        .context(ReadImportTableSnafu { table })?;
    Ok(Some(contents))
}

/// Accepts RFC 3339 instants as written by an export, falling back to a plain calendar date at
/// the start of that day in `now`'s zone.
fn parse_instant(raw: &str, now: &Zoned) -> FeebookResult<Option<Timestamp>> {
    if let Ok(timestamp) = raw.parse::<Timestamp>() {
        return Ok(Some(timestamp));
    }
    let Some(date) = parse_calendar_date(raw) else {
        return Ok(None);
    };
    let zoned = date
        .to_zoned(now.time_zone().clone())
        .context(ZoneDateSnafu { date })?;
    Ok(Some(zoned.timestamp()))
}

fn non_empty(value: &str, column: &'static str) -> FeebookResult<String> {
    let value = value.trim();
    ensure!(!value.is_empty(), MissingImportValueSnafu { column });
    Ok(value.to_string())
}

impl StudentRecord {
    fn into_draft(self, row: usize, now: &Zoned) -> FeebookResult<DraftStudent> {
        let name = non_empty(&self.name, "Name")?;
        let email = non_empty(&self.email, "Email")?;
        email.parse::<EmailAddress>().context(EmailSnafu {
            original: email.as_str(),
        })?;

        let semester = self
            .semester
            .trim()
            .parse::<i32>()
            .ok()
            .filter(|months| (1..=MAX_SEMESTER_MONTHS).contains(months))
            .context(InvalidImportValueSnafu {
                column: "Semester Duration (Months)",
                value: self.semester.as_str(),
            })?;
        let total_fees = self
            .total_fees
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|fees| fees.is_finite() && *fees > 0.0)
            .context(InvalidImportValueSnafu {
                column: "Total Fees",
                value: self.total_fees.as_str(),
            })?;

        let created_at = parse_instant(self.created_at.trim(), now)?.unwrap_or_else(|| {
            debug!(row, original = %self.created_at, "No usable created date, using now");
            now.timestamp()
        });

        Ok(DraftStudent {
            id: self.id.trim().parse().unwrap_or_else(|_| Uuid::new_v4()),
            details: StudentDetails {
                name,
                age: self.age.trim().parse().ok(),
                email,
                phone: self.phone.trim().to_string(),
                address: self.address.trim().to_string(),
                dob: self.dob.trim().to_string(),
                joining: self.joining.trim().to_string(),
                semester,
                total_fees,
            },
            created_at,
            stated_paid: self.paid_fees.trim().parse().ok(),
            row,
            payments: vec![],
        })
    }
}

impl PaymentRecord {
    fn into_payment(self, now: &Zoned) -> FeebookResult<Payment> {
        let amount = self
            .amount
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|amount| amount.is_finite() && *amount > 0.0)
            .context(InvalidImportValueSnafu {
                column: "Amount",
                value: self.amount.as_str(),
            })?;
        let date = parse_instant(self.date.trim(), now)?.context(InvalidImportValueSnafu {
            column: "Payment Date",
            value: self.date.as_str(),
        })?;

        Ok(Payment {
            id: self
                .payment_id
                .trim()
                .parse()
                .unwrap_or_else(|_| Uuid::new_v4()),
            amount,
            date,
        })
    }
}

impl ImportBundle {
    /// Reads either an exported ZIP or a bare students CSV. Bad rows are recorded in
    /// [`ImportBundle::problems`] and skipped; only an unreadable archive fails outright.
    pub fn parse(bytes: &[u8], now: &Zoned) -> FeebookResult<Self> {
        let (students_csv, payments_csv) = if infer::archive::is_zip(bytes) {
            let mut archive = ZipArchive::new(Cursor::new(bytes)).context(ZipSnafu)?;
            let students = read_zip_table(&mut archive, STUDENTS_TABLE)?.context(
                MissingImportTableSnafu {
                    table: STUDENTS_TABLE,
                },
            )?;
            let payments = read_zip_table(&mut archive, PAYMENTS_TABLE)?;
            (students, payments)
        } else {
            (bytes.to_vec(), None)
        };

        let mut problems = vec![];
        let mut report = |table: &str, row: usize, error: FeebookError| {
            problems.push(format!("{table} row {row}: {error}"));
        };

        let mut drafts: Vec<DraftStudent> = vec![];
        let mut by_file_id: HashMap<String, usize> = HashMap::new();

        let mut reader = csv::Reader::from_reader(students_csv.as_slice());
        for (index, record) in reader.deserialize::<StudentRecord>().enumerate() {
            let row = index + 2;
            let record = match record {
                Ok(record) => record,
                Err(source) => {
                    report(STUDENTS_TABLE, row, FeebookError::Csv { source });
                    continue;
                }
            };

            let file_id = record.id.trim().to_string();
            match record.into_draft(row, now) {
                Ok(draft) => {
                    if !file_id.is_empty() {
                        by_file_id.entry(file_id).or_insert(drafts.len());
                    }
                    drafts.push(draft);
                }
                Err(e) => report(STUDENTS_TABLE, row, e),
            }
        }

        if let Some(payments_csv) = payments_csv {
            let mut reader = csv::Reader::from_reader(payments_csv.as_slice());
            for (index, record) in reader.deserialize::<PaymentRecord>().enumerate() {
                let row = index + 2;
                let record = match record {
                    Ok(record) => record,
                    Err(source) => {
                        report(PAYMENTS_TABLE, row, FeebookError::Csv { source });
                        continue;
                    }
                };

                let Some(&owner) = by_file_id.get(record.student_id.trim()) else {
                    report(
                        PAYMENTS_TABLE,
                        row,
                        UnknownImportStudentSnafu {
                            student_id: record.student_id.trim(),
                        }
                        .build(),
                    );
                    continue;
                };

                match record.into_payment(now) {
                    Ok(payment) => drafts[owner].payments.push(payment),
                    Err(e) => report(PAYMENTS_TABLE, row, e),
                }
            }
        }

        let students = drafts
            .into_iter()
            .map(|draft| {
                let student =
                    Student::from_parts(draft.id, draft.details, draft.payments, draft.created_at);
                if let Some(stated) = draft
                    .stated_paid
                    .filter(|stated| (stated - student.paid_fees()).abs() > MONEY_EPSILON)
                {
                    warn!(
                        row = draft.row,
                        stated,
                        from_history = student.paid_fees(),
                        "Paid Fees disagrees with payment history, using history"
                    );
                    report(
                        STUDENTS_TABLE,
                        draft.row,
                        InvalidImportValueSnafu {
                            column: "Paid Fees",
                            value: format!(
                                "{stated} (payment history adds up to {})",
                                student.paid_fees()
                            ),
                        }
                        .build(),
                    );
                }
                student
            })
            .collect();

        Ok(Self { students, problems })
    }
}

/// Packs parsed students into a form-safe string so that confirming an import doesn't need the
/// file again.
pub fn encode_draft(students: &[Student]) -> FeebookResult<String> {
    let bytes = rmp_serde::to_vec_named(students).context(RmpSerdeEncodeSnafu)?;
    Ok(BASE64_URL_SAFE.encode(bytes))
}

pub fn decode_draft(encoded: &str) -> FeebookResult<Vec<Student>> {
    let bytes = BASE64_URL_SAFE.decode(encoded).context(B64Snafu)?;
    rmp_serde::from_slice(&bytes).context(RmpSerdeDecodeSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::{collection::StudentCollection, student::test_details},
        exchange::ExportBundle,
    };
    use approx::assert_relative_eq;
    use jiff::{civil::date, tz::TimeZone};

    fn now() -> Zoned {
        date(2024, 6, 1)
            .at(9, 30, 0, 0)
            .to_zoned(TimeZone::UTC)
            .unwrap()
    }

    const BARE_CSV: &str = "\
Name,Age,Email,Phone,Address,Date of Birth,Joining Date,Semester Duration (Months),Total Fees
Asha Rao,19,asha@example.org,9876543210,12 Lake Road,2005-04-01,2024-01-15,6,6000
,20,noname@example.org,1,,,2024-01-15,6,6000
Ben Okafor,,ben@example.org,0712345678,,,2024-02-01,six,1200
Cara Diaz,not sure,cara@example.org,555,,,sometime,3,900.5
";

    #[test]
    fn bare_csv_keeps_good_rows_and_reports_bad_ones() {
        let bundle = ImportBundle::parse(BARE_CSV.as_bytes(), &now()).unwrap();

        let names: Vec<&str> = bundle
            .students
            .iter()
            .map(|s| s.details.name.as_str())
            .collect();
        assert_eq!(names, vec!["Asha Rao", "Cara Diaz"]);
        assert_eq!(bundle.problems.len(), 2);
        assert!(bundle.problems[0].starts_with("Students.csv row 3: Missing Name"));
        assert!(bundle.problems[1].contains("Semester Duration (Months)"));

        let cara = &bundle.students[1];
        assert_eq!(cara.details.age, None);
        assert_eq!(cara.details.joining, "sometime");
        assert_relative_eq!(cara.details.total_fees, 900.5);
        assert_eq!(cara.created_at, now().timestamp());
        assert!(cara.fee_history().is_empty());
    }

    #[test]
    fn exported_zip_restores_payment_history() {
        let mut collection = StudentCollection::default();
        let id = collection
            .add_student(test_details("Asha Rao", "asha@example.org"), now().timestamp())
            .unwrap();
        collection
            .record_payment(id, 1000.0, now().timestamp())
            .unwrap();
        collection
            .record_payment(id, 250.5, now().timestamp())
            .unwrap();

        let zip = ExportBundle::from_collection(&collection, &now())
            .unwrap()
            .to_zip()
            .unwrap();
        let bundle = ImportBundle::parse(&zip, &now()).unwrap();

        assert!(bundle.problems.is_empty(), "{:?}", bundle.problems);
        assert_eq!(bundle.students, collection.students());
    }

    #[test]
    fn paid_fees_without_history_are_reported_and_recomputed() {
        let csv = "\
ID,Name,Email,Phone,Joining Date,Semester Duration (Months),Total Fees,Paid Fees
1718000000000,Asha Rao,asha@example.org,1,2024-01-15,6,6000,2500
";
        let bundle = ImportBundle::parse(csv.as_bytes(), &now()).unwrap();
        assert_eq!(bundle.students.len(), 1);
        assert_relative_eq!(bundle.students[0].paid_fees(), 0.0);
        assert_eq!(bundle.problems.len(), 1);
        assert!(bundle.problems[0].contains("Paid Fees"));
    }

    #[test]
    fn out_of_range_numbers_are_reported_and_skipped() {
        let csv = "\
Name,Email,Phone,Joining Date,Semester Duration (Months),Total Fees
Zero Months,zero@example.org,1,2024-01-01,0,100
Negative Months,negative@example.org,1,2024-01-01,-3,100
Too Long,long@example.org,1,2024-01-01,241,100
Huge,huge@example.org,1,2024-01-01,2147483647,100
Free,free@example.org,1,2024-01-01,6,0
Owes Nothing,nothing@example.org,1,2024-01-01,-3,0
Longest,longest@example.org,1,2024-01-01,240,100
";
        let bundle = ImportBundle::parse(csv.as_bytes(), &now()).unwrap();

        let names: Vec<&str> = bundle
            .students
            .iter()
            .map(|s| s.details.name.as_str())
            .collect();
        assert_eq!(names, vec!["Longest"]);
        assert_eq!(bundle.problems.len(), 6, "{:?}", bundle.problems);
        for (problem, row) in bundle.problems.iter().zip(2..=5) {
            let expected = format!("Students.csv row {row}: Invalid Semester Duration (Months)");
            assert!(problem.starts_with(&expected), "{problem}");
        }
        assert!(bundle.problems[4].starts_with("Students.csv row 6: Invalid Total Fees"));
        assert!(bundle.problems[5].starts_with("Students.csv row 7:"));
    }

    #[test]
    fn zip_without_students_table_is_rejected() {
        use std::io::Write;
        use zip::{ZipWriter, write::SimpleFileOptions};

        let mut zip = ZipWriter::new(Cursor::new(Vec::<u8>::new()));
        zip.start_file("Summary.csv", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"Total Students\n0\n").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        assert!(matches!(
            ImportBundle::parse(&bytes, &now()),
            Err(FeebookError::MissingImportTable { .. })
        ));
    }

    #[test]
    fn draft_survives_the_hidden_form_field() {
        let bundle = ImportBundle::parse(BARE_CSV.as_bytes(), &now()).unwrap();
        let encoded = encode_draft(&bundle.students).unwrap();
        assert_eq!(decode_draft(&encoded).unwrap(), bundle.students);
        assert!(decode_draft("not base64!").is_err());
    }
}
