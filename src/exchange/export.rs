use super::{PAYMENTS_TABLE, STUDENTS_TABLE, SUMMARY_TABLE};
use crate::{
    data::collection::StudentCollection,
    error::{
        CsvSnafu, FeebookResult, NothingToExportSnafu, WriteExportTableSnafu, ZipSnafu,
    },
};
use jiff::{Timestamp, Zoned};
use serde::Serialize;
use snafu::{ResultExt, ensure};
use std::io::{Cursor, Write};
use uuid::Uuid;
use zip::{ZipWriter, write::SimpleFileOptions};

#[derive(Serialize)]
struct StudentRow<'a> {
    #[serde(rename = "ID")]
    id: Uuid,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Age")]
    age: Option<u16>,
    #[serde(rename = "Email")]
    email: &'a str,
    #[serde(rename = "Phone")]
    phone: &'a str,
    #[serde(rename = "Address")]
    address: &'a str,
    #[serde(rename = "Date of Birth")]
    dob: &'a str,
    #[serde(rename = "Joining Date")]
    joining: &'a str,
    #[serde(rename = "Semester Duration (Months)")]
    semester: i32,
    #[serde(rename = "Total Fees")]
    total_fees: f64,
    #[serde(rename = "Paid Fees")]
    paid_fees: f64,
    #[serde(rename = "Remaining Fees")]
    remaining_fees: f64,
    #[serde(rename = "Created Date")]
    created_at: Timestamp,
}

#[derive(Serialize)]
struct PaymentRow<'a> {
    #[serde(rename = "Student ID")]
    student_id: Uuid,
    #[serde(rename = "Student Name")]
    student_name: &'a str,
    #[serde(rename = "Payment ID")]
    payment_id: Uuid,
    #[serde(rename = "Amount")]
    amount: f64,
    #[serde(rename = "Payment Date")]
    date: Timestamp,
    #[serde(rename = "Payment Status")]
    status: &'static str,
}

#[derive(Serialize)]
struct SummaryRow {
    #[serde(rename = "Total Students")]
    total_students: usize,
    #[serde(rename = "Paid Students")]
    paid_students: usize,
    #[serde(rename = "Pending Students")]
    pending_students: usize,
    #[serde(rename = "Total Revenue")]
    total_revenue: f64,
    #[serde(rename = "Total Pending Amount")]
    total_pending: f64,
    #[serde(rename = "Export Date")]
    exported_at: Timestamp,
}

/// The encoded CSV tables of one export, ready to be zipped.
#[derive(Debug)]
pub struct ExportBundle {
    students: Vec<u8>,
    payments: Option<Vec<u8>>,
    summary: Vec<u8>,
}

fn write_table<T: Serialize>(
    table: &'static str,
    rows: impl IntoIterator<Item = T>,
) -> FeebookResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::<u8>::new());
    for row in rows {
        writer.serialize(row).context(CsvSnafu)?;
    }
    writer
        .into_inner()
        .map_err(csv::IntoInnerError::into_error)
        .context(WriteExportTableSnafu { table })
}

impl ExportBundle {
    pub fn from_collection(collection: &StudentCollection, now: &Zoned) -> FeebookResult<Self> {
        ensure!(!collection.is_empty(), NothingToExportSnafu);

        let students = write_table(
            STUDENTS_TABLE,
            collection.students().iter().map(|student| StudentRow {
                id: student.id,
                name: &student.details.name,
                age: student.details.age,
                email: &student.details.email,
                phone: &student.details.phone,
                address: &student.details.address,
                dob: &student.details.dob,
                joining: &student.details.joining,
                semester: student.details.semester,
                total_fees: student.details.total_fees,
                paid_fees: student.paid_fees(),
                remaining_fees: student.remaining_fees(),
                created_at: student.created_at,
            }),
        )?;

        let has_payments = collection
            .students()
            .iter()
            .any(|student| !student.fee_history().is_empty());
        let payments = if has_payments {
            Some(write_table(
                PAYMENTS_TABLE,
                collection.students().iter().flat_map(|student| {
                    student.fee_history().iter().map(|payment| PaymentRow {
                        student_id: student.id,
                        student_name: &student.details.name,
                        payment_id: payment.id,
                        amount: payment.amount,
                        date: payment.date,
                        status: "Completed",
                    })
                }),
            )?)
        } else {
            None
        };

        let stats = collection.stats();
        let summary = write_table(
            SUMMARY_TABLE,
            [SummaryRow {
                total_students: stats.total_students,
                paid_students: stats.paid_students,
                pending_students: stats.pending_students,
                total_revenue: stats.total_revenue,
                total_pending: stats.total_pending,
                exported_at: now.timestamp(),
            }],
        )?;

        Ok(Self {
            students,
            payments,
            summary,
        })
    }

    pub fn to_zip(&self) -> FeebookResult<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::<u8>::new()));

        let tables = [
            (STUDENTS_TABLE, Some(&self.students)),
            (PAYMENTS_TABLE, self.payments.as_ref()),
            (SUMMARY_TABLE, Some(&self.summary)),
        ];
        for (table, contents) in tables {
            let Some(contents) = contents else {
                continue;
            };
            zip.start_file(table, SimpleFileOptions::default())
                .context(ZipSnafu)?;
            zip.write_all(contents)
                .context(WriteExportTableSnafu { table })?;
        }

        Ok(zip.finish().context(ZipSnafu)?.into_inner())
    }
}

pub fn export_file_name(now: &Zoned) -> String {
    format!("feebook_export_{}.zip", now.date())
}
