use crate::data::student::StudentFormError;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use maud::html;
use snafu::Snafu;
use std::{num::ParseIntError, path::PathBuf};
use uuid::Uuid;

pub type FeebookResult<T> = Result<T, FeebookError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FeebookError {
    #[snafu(display("Error creating data directory {}", path.display()))]
    CreateDataDir {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("Error reading stored item {key:?}"))]
    ReadBlob {
        source: std::io::Error,
        key: String,
    },
    #[snafu(display("Error writing stored item {key:?}"))]
    WriteBlob {
        source: std::io::Error,
        key: String,
    },
    #[snafu(display("Error serialising with rmp_serde"))]
    RmpSerdeEncode { source: rmp_serde::encode::Error },
    #[snafu(display("Error deserialising with rmp_serde"))]
    RmpSerdeDecode { source: rmp_serde::decode::Error },
    #[snafu(display("Unable to retrieve env var `{}`", name))]
    BadEnvVar {
        source: dotenvy::Error,
        name: &'static str,
    },
    #[snafu(display("Unable to parse backup interval {:?}", original))]
    ParseBackupInterval {
        source: ParseIntError,
        original: String,
    },
    #[snafu(display("Invalid timezone {:?}", tz))]
    InvalidTimezone { source: jiff::Error, tz: String },
    #[snafu(display("Unable to find the system timezone"))]
    SystemTimezone { source: jiff::Error },
    #[snafu(display("Invalid locale {:?}", provided))]
    InvalidLocale {
        source: icu::locale::ParseError,
        provided: String,
    },
    #[snafu(display("Invalid hour cycle {:?}", provided))]
    InvalidHourCycle { provided: String },
    #[snafu(display("Invalid calendar algorithm {:?}", provided))]
    InvalidCalendarAlgorithm { provided: String },
    #[snafu(display("Unable to create date formatter"))]
    BadDateTimeFormatter {
        source: icu::datetime::DateTimeFormatterLoadError,
    },
    #[snafu(display("Unable to convert {} to a date in the configured timezone", date))]
    ZoneDate {
        source: jiff::Error,
        date: jiff::civil::Date,
    },
    #[snafu(display("Unable to parse date {:?}", original))]
    ParseDate { original: String },
    #[snafu(display("Unable to find student with UUID: {}", id))]
    MissingStudent { id: Uuid },
    #[snafu(display("A student with the email {:?} already exists", email))]
    DuplicateEmail { email: String },
    #[snafu(display("{}", errors.as_nice_list().collect::<Vec<_>>().join(", ")))]
    InvalidStudentDetails { errors: StudentFormError },
    #[snafu(display("Please enter a valid amount (got {:?})", amount))]
    InvalidPaymentAmount { amount: String },
    #[snafu(display("Amount cannot exceed remaining fees ({:.2})", remaining))]
    PaymentExceedsBalance { amount: f64, remaining: f64 },
    #[snafu(display("No data to export"))]
    NothingToExport,
    #[snafu(display("Error with multipart form input"))]
    Multipart {
        source: axum::extract::multipart::MultipartError,
    },
    #[snafu(display("Error parsing email address {:?}", original))]
    Email {
        source: email_address::Error,
        original: String,
    },
    #[snafu(display("Error with ZIPs"))]
    Zip { source: zip::result::ZipError },
    #[snafu(display("Error writing {} into the export", table))]
    WriteExportTable {
        source: std::io::Error,
        table: &'static str,
    },
    #[snafu(display("Error with CSVs"))]
    Csv { source: csv::Error },
    #[snafu(display("Import file has no {} table", table))]
    MissingImportTable { table: &'static str },
    #[snafu(display("Error reading {} from the import", table))]
    ReadImportTable {
        source: std::io::Error,
        table: &'static str,
    },
    #[snafu(display("Missing {}", column))]
    MissingImportValue { column: &'static str },
    #[snafu(display("Invalid {} {:?}", column, value))]
    InvalidImportValue { column: &'static str, value: String },
    #[snafu(display("No student with ID {:?} in this import", student_id))]
    UnknownImportStudent { student_id: String },
    #[snafu(display("Error decoding Base64"))]
    B64 { source: base64::DecodeError },
}

impl IntoResponse for FeebookError {
    #[allow(clippy::match_same_arms)]
    fn into_response(self) -> Response {
        const ISE: StatusCode = StatusCode::INTERNAL_SERVER_ERROR; //internal server error
        const NF: StatusCode = StatusCode::NOT_FOUND; //not found
        const CF: StatusCode = StatusCode::CONFLICT; //conflicts with existing data
        const BI: StatusCode = StatusCode::BAD_REQUEST; //bad input

        let basic_error = |desc| {
            html! {
                div class="bg-red-100 border border-red-400 text-red-700 px-4 py-3 rounded relative mb-4" role="alert" {
                    strong class="font-bold" {"Feebook Error: "}
                    span {(desc)}
                }
            }
        };

        let status_code = match &self {
            Self::CreateDataDir { .. } | Self::ReadBlob { .. } | Self::WriteBlob { .. } => ISE,
            Self::RmpSerdeEncode { .. } => ISE,
            Self::RmpSerdeDecode { .. } => BI,
            Self::BadEnvVar { .. } | Self::ParseBackupInterval { .. } => ISE,
            Self::InvalidTimezone { .. } | Self::SystemTimezone { .. } => ISE,
            Self::InvalidLocale { .. }
            | Self::InvalidHourCycle { .. }
            | Self::InvalidCalendarAlgorithm { .. }
            | Self::BadDateTimeFormatter { .. } => ISE,
            Self::ZoneDate { .. } => BI,
            Self::ParseDate { .. } => BI,
            Self::MissingStudent { .. } => NF,
            Self::DuplicateEmail { .. } => CF,
            Self::InvalidStudentDetails { .. } => BI,
            Self::InvalidPaymentAmount { .. } | Self::PaymentExceedsBalance { .. } => BI,
            Self::NothingToExport => BI,
            Self::Multipart { source } => source.status(),
            Self::Email { .. } => BI,
            Self::Zip { .. } => BI,
            Self::WriteExportTable { .. } => ISE,
            Self::Csv { .. } => BI,
            Self::MissingImportTable { .. } | Self::ReadImportTable { .. } => BI,
            Self::MissingImportValue { .. }
            | Self::InvalidImportValue { .. }
            | Self::UnknownImportStudent { .. } => BI,
            Self::B64 { .. } => BI,
        };

        if status_code.is_server_error() {
            error!(?self, "Error!");
        } else {
            warn!(?self, "Rejected request");
        }
        (status_code, Html(basic_error(self.to_string()).into_string())).into_response()
    }
}
