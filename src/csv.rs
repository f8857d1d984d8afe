use std::fs;
use std::path::Path;

use crate::error::SchemePrepError;

/// A parsed CSV table: one header row plus zero or more data rows.
///
/// Fields follow RFC 4180 conventions: comma separated, double-quote
/// quoting, quotes escaped by doubling, and quoted fields may contain
/// commas and line breaks. An empty field is read as `None` so missing
/// values stay distinguishable from empty text. Blank lines are skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl CsvTable {
    pub fn read_file(path: &Path) -> Result<Self, SchemePrepError> {
        let text = fs::read_to_string(path).map_err(|e| {
            SchemePrepError::LoadError(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::parse(&text)
            .map_err(|msg| SchemePrepError::LoadError(format!("'{}': {}", path.display(), msg)))
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        let mut records = parse_records(text)?;
        if records.is_empty() {
            return Err("no header row".to_string());
        }
        let headers: Vec<String> = records
            .remove(0)
            .into_iter()
            .map(|field| field.unwrap_or_default().trim().to_string())
            .collect();

        let width = headers.len();
        let mut rows = Vec::with_capacity(records.len());
        for (index, mut record) in records.into_iter().enumerate() {
            if record.len() > width {
                return Err(format!(
                    "row {} has {} fields but the header has {}",
                    index + 2,
                    record.len(),
                    width
                ));
            }
            // Trailing empty fields are commonly omitted by exporters
            record.resize(width, None);
            rows.push(record);
        }
        Ok(CsvTable { headers, rows })
    }

    /// Index of a header column, if present.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }
}

/// Splits raw CSV text into records without imposing a header.
pub fn parse_records(text: &str) -> Result<Vec<Vec<Option<String>>>, String> {
    let mut records: Vec<Vec<Option<String>>> = Vec::new();
    let mut record: Vec<Option<String>> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut was_quoted = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }
        match c {
            '"' if field.is_empty() && !was_quoted => {
                in_quotes = true;
                was_quoted = true;
            }
            ',' => {
                record.push(take_field(&mut field, &mut was_quoted));
            }
            '\n' | '\r' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(take_field(&mut field, &mut was_quoted));
                end_record(&mut records, &mut record);
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    if !field.is_empty() || was_quoted || !record.is_empty() {
        record.push(take_field(&mut field, &mut was_quoted));
        end_record(&mut records, &mut record);
    }
    Ok(records)
}

fn take_field(field: &mut String, was_quoted: &mut bool) -> Option<String> {
    let value = std::mem::take(field);
    let quoted = std::mem::take(was_quoted);
    if value.is_empty() && !quoted {
        None
    } else {
        Some(value)
    }
}

fn end_record(records: &mut Vec<Vec<Option<String>>>, record: &mut Vec<Option<String>>) {
    let finished = std::mem::take(record);
    // A lone empty field is a blank line
    if finished.len() == 1 && finished[0].is_none() {
        return;
    }
    records.push(finished);
}

/// Quotes a field for CSV output when it contains a delimiter, quote, or
/// line break.
pub fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Appends one CSV row to `out`, escaping fields as needed.
pub fn push_row(out: &mut String, fields: &[&str]) {
    for (index, field) in fields.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        out.push_str(&escape(field));
    }
    out.push('\n');
}
