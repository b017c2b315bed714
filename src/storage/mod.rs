//! Storage is organized through [csv_log::CsvLog].
//! The basic idea is:
//!   - Every log is a CSV file with a fixed header row.
//!   - Rows are only ever appended, existing bytes are never rewritten.
//!   - Reading skips rows it can't parse, old or damaged files still produce statistics.

pub mod csv_log;
pub mod entities;
