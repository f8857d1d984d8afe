use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, info};

use crate::csv::CsvTable;
use crate::error::SchemePrepError;
use crate::records::{RawAttachmentRow, RawSchemeRow, RawTables, RawWorkflowRow};

pub const SCHEMES_FILE: &str = "schemes.csv";
pub const WORKFLOW_FILE: &str = "workflow.csv";
pub const ATTACHMENTS_FILE: &str = "attachments.csv";

// ISO forms first, then the day-first forms the upstream export produces
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Permissive timestamp parsing for the designated date columns. A value
/// that matches none of the accepted formats is simply absent; the damage
/// is surfaced through health metrics, never as a load failure.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, format) {
            return Some(timestamp);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// Reads the three raw tables from `input_dir`.
///
/// The header of each table is validated once, here at the ingestion
/// boundary: a missing required column fails the load, while a missing
/// optional column simply yields an absent value in every row. Date
/// columns are parsed; all other values are kept as raw text for the
/// cleaner to deal with.
pub fn load_raw_tables(input_dir: &Path) -> Result<RawTables, SchemePrepError> {
    info!("Loading raw tables from {}", input_dir.display());

    let schemes = load_schemes(&input_dir.join(SCHEMES_FILE))?;
    let workflow = load_workflow(&input_dir.join(WORKFLOW_FILE))?;
    let attachments = load_attachments(&input_dir.join(ATTACHMENTS_FILE))?;

    debug!(
        "Loaded {} scheme, {} workflow, {} attachment rows",
        schemes.len(),
        workflow.len(),
        attachments.len()
    );

    Ok(RawTables {
        schemes,
        workflow,
        attachments,
    })
}

fn load_schemes(path: &Path) -> Result<Vec<RawSchemeRow>, SchemePrepError> {
    let table = CsvTable::read_file(path)?;
    let scheme_id = required_column(&table, SCHEMES_FILE, "scheme_id")?;
    let creation_date = required_column(&table, SCHEMES_FILE, "creationDate")?;
    let plant = table.column("plant");
    let category = table.column("category");
    let department_at_time = table.column("department_at_time");
    let created_by = table.column("createdBy");

    let rows = table
        .rows
        .iter()
        .map(|row| RawSchemeRow {
            scheme_id: text(row, Some(scheme_id)),
            creation_date: date(row, Some(creation_date)),
            plant: text(row, plant),
            category: text(row, category),
            department_at_time: text(row, department_at_time),
            created_by: text(row, created_by),
        })
        .collect();
    Ok(rows)
}

fn load_workflow(path: &Path) -> Result<Vec<RawWorkflowRow>, SchemePrepError> {
    let table = CsvTable::read_file(path)?;
    let scheme_id = required_column(&table, WORKFLOW_FILE, "scheme_id")?;
    let forwarded_at = required_column(&table, WORKFLOW_FILE, "forwarded_at")?;
    let user = table.column("user");
    let department = table.column("department");
    let time_taken = table.column("time_taken");

    let rows = table
        .rows
        .iter()
        .map(|row| RawWorkflowRow {
            scheme_id: text(row, Some(scheme_id)),
            user: text(row, user),
            department: text(row, department),
            forwarded_at: date(row, Some(forwarded_at)),
            time_taken: text(row, time_taken),
        })
        .collect();
    Ok(rows)
}

fn load_attachments(path: &Path) -> Result<Vec<RawAttachmentRow>, SchemePrepError> {
    let table = CsvTable::read_file(path)?;
    let scheme_id = required_column(&table, ATTACHMENTS_FILE, "scheme_id")?;
    let file_name = required_column(&table, ATTACHMENTS_FILE, "fileName")?;
    let user = table.column("user");
    let department = table.column("department");

    let rows = table
        .rows
        .iter()
        .map(|row| RawAttachmentRow {
            scheme_id: text(row, Some(scheme_id)),
            file_name: text(row, Some(file_name)),
            user: text(row, user),
            department: text(row, department),
        })
        .collect();
    Ok(rows)
}

fn required_column(
    table: &CsvTable,
    file: &str,
    name: &str,
) -> Result<usize, SchemePrepError> {
    table.column(name).ok_or_else(|| {
        SchemePrepError::LoadError(format!("'{}' is missing required column '{}'", file, name))
    })
}

fn text(row: &[Option<String>], column: Option<usize>) -> Option<String> {
    column.and_then(|index| row.get(index)).cloned().flatten()
}

fn date(row: &[Option<String>], column: Option<usize>) -> Option<NaiveDateTime> {
    text(row, column).and_then(|value| parse_timestamp(&value))
}
