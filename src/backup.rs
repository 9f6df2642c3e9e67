//! Staff data backup and restore.
//!
//! Shared by the JSON API and the forms on the Backup & Restore page. CSV files
//! use the `STAFF_COLUMNS` header row, the same layout as the downloadable
//! template.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::{
    error::AppError,
    models::{RestoreRequest, STAFF_COLUMNS, StaffRecord},
    repository::RepositoryState,
};

pub const BACKUP_CSV_FILENAME: &str = "backup_pegawai.csv";
pub const BACKUP_JSON_FILENAME: &str = "backup_pegawai.json";
pub const TEMPLATE_CSV_FILENAME: &str = "template_simpeg.csv";

/// Validates the document header and replaces all staff data with its records.
/// Nothing is written if any expected column is missing.
pub async fn restore(repo: &RepositoryState, request: RestoreRequest) -> Result<usize, AppError> {
    let missing = request.missing_columns();
    if !missing.is_empty() {
        return Err(AppError::MissingColumns(missing));
    }
    Ok(repo.replace_all(request.into_records()).await)
}

/// Records to back up, or `NotFound` when there is nothing to export.
pub async fn records_for_backup(repo: &RepositoryState) -> Result<Vec<StaffRecord>, AppError> {
    let records = repo.all_records().await;
    if records.is_empty() {
        return Err(AppError::NotFound("no staff data to back up".to_string()));
    }
    Ok(records)
}

/// Serialises records as CSV with a `STAFF_COLUMNS` header row.
pub fn write_csv(records: &[StaffRecord]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(STAFF_COLUMNS)?;
    for record in records {
        writer.write_record(
            STAFF_COLUMNS
                .iter()
                .map(|column| record.get(*column).map(String::as_str).unwrap_or("")),
        )?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("failed to flush CSV: {e}")))
}

/// Header-only CSV for filling in staff data by hand.
pub fn template_csv() -> Result<Vec<u8>, AppError> {
    write_csv(&[])
}

/// Parses a CSV upload into a restore document. Header names are normalised
/// later by `RestoreRequest`; cells are kept as text.
pub fn read_csv(bytes: &[u8]) -> Result<RestoreRequest, AppError> {
    let mut reader = csv::Reader::from_reader(bytes);
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: BTreeMap<String, Value> = columns
            .iter()
            .zip(row.iter())
            .map(|(column, cell)| (column.clone(), Value::String(cell.to_string())))
            .collect();
        records.push(record);
    }

    Ok(RestoreRequest { columns, records })
}

/// Parses an uploaded backup file. `.json` files are read as a backup document,
/// anything else as CSV.
pub fn read_upload(file_name: Option<&str>, bytes: &[u8]) -> Result<RestoreRequest, AppError> {
    let is_json = file_name.is_some_and(|name| name.to_ascii_lowercase().ends_with(".json"));
    if is_json {
        serde_json::from_slice(bytes)
            .map_err(|e| AppError::BadRequest(format!("invalid backup document: {e}")))
    } else {
        read_csv(bytes)
    }
}
