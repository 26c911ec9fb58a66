//! Moving the whole collection in and out as spreadsheet-friendly tables.
//!
//! An export is a ZIP holding one CSV per table. Import accepts that same ZIP (restoring payment
//! history as well) or a bare students CSV.

mod backup;
mod export;
mod import;

pub use backup::{backup_file_name, create_backup, is_backup_stale};
pub use export::{ExportBundle, export_file_name};
pub use import::{ImportBundle, decode_draft, encode_draft};

pub const STUDENTS_TABLE: &str = "Students.csv";
pub const PAYMENTS_TABLE: &str = "PaymentHistory.csv";
pub const SUMMARY_TABLE: &str = "Summary.csv";
