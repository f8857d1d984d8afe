use std::path::Path;

use crate::audit::HealthMetrics;
use crate::csv::{parse_records, CsvTable};
use crate::error::SchemePrepError;
use crate::persist::{
    DATA_HEALTH_FILE, SUMMARY_ATTACHMENTS_BY_USER_FILE, SUMMARY_BY_CATEGORY_FILE,
    SUMMARY_BY_DEPARTMENT_FILE, SUMMARY_BY_USER_FILE,
};
use crate::pipeline::RunSummary;

pub struct Reports {
    // No fields
}

impl Reports {
    /// Prints the outcome of a completed pipeline run.
    pub fn print_run_summary(summary: &RunSummary) {
        println!("Pipeline run complete");
        println!(
            "  schemes:     {} raw -> {} cleaned ({} dropped)",
            summary.raw_schemes,
            summary.cleaned_schemes,
            summary.raw_schemes - summary.cleaned_schemes
        );
        println!(
            "  workflow:    {} raw -> {} cleaned ({} dropped)",
            summary.raw_workflow,
            summary.cleaned_workflow,
            summary.raw_workflow - summary.cleaned_workflow
        );
        println!(
            "  attachments: {} raw -> {} cleaned ({} dropped)",
            summary.raw_attachments,
            summary.cleaned_attachments,
            summary.raw_attachments - summary.cleaned_attachments
        );
        println!("  artifacts:   {}", summary.output_dir.display());
    }

    /// Prints the health metrics of a raw-data audit.
    pub fn print_health(health: &HealthMetrics) {
        let rows: Vec<Vec<String>> = health
            .pairs()
            .into_iter()
            .map(|(name, count)| vec![name.to_string(), count.to_string()])
            .collect();
        Self::print_table("Health metrics", &["metric", "count"], &rows);
    }

    /// Prints the published health metrics and summary tables from
    /// `output_dir`, the same artifacts the presentation layer consumes.
    pub fn report_output(output_dir: &Path) -> Result<(), SchemePrepError> {
        let health_path = output_dir.join(DATA_HEALTH_FILE);
        let text = std::fs::read_to_string(&health_path).map_err(|e| {
            SchemePrepError::LoadError(format!(
                "cannot read '{}' (has a pipeline run published here?): {}",
                health_path.display(),
                e
            ))
        })?;
        let health_rows: Vec<Vec<String>> = parse_records(&text)
            .map_err(|msg| SchemePrepError::LoadError(format!("'{}': {}", health_path.display(), msg)))?
            .into_iter()
            .map(|record| {
                record
                    .into_iter()
                    .map(|field| field.unwrap_or_default())
                    .collect()
            })
            .collect();
        Self::print_table("Health metrics", &["metric", "count"], &health_rows);

        for (title, name) in [
            ("Summary by user", SUMMARY_BY_USER_FILE),
            ("Summary by department", SUMMARY_BY_DEPARTMENT_FILE),
            ("Summary by category", SUMMARY_BY_CATEGORY_FILE),
            ("Attachments by user", SUMMARY_ATTACHMENTS_BY_USER_FILE),
        ] {
            let table = CsvTable::read_file(&output_dir.join(name))?;
            let headers: Vec<&str> = table.headers.iter().map(String::as_str).collect();
            let rows: Vec<Vec<String>> = table
                .rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|field| field.clone().unwrap_or_default())
                        .collect()
                })
                .collect();
            Self::print_table(title, &headers, &rows);
        }

        Ok(())
    }

    fn print_table(title: &str, headers: &[&str], rows: &[Vec<String>]) {
        let mut widths: Vec<usize> = headers.iter().map(|header| header.len()).collect();
        for row in rows {
            for (index, field) in row.iter().enumerate() {
                if index < widths.len() && field.len() > widths[index] {
                    widths[index] = field.len();
                }
            }
        }

        println!("\n{}", title);
        let header_line: Vec<String> = headers
            .iter()
            .zip(&widths)
            .map(|(header, width)| format!("{:w$}", header, w = *width))
            .collect();
        println!("  {}", header_line.join("  "));
        let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
        println!("  {}", rule.join("  "));
        for row in rows {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(field, width)| format!("{:w$}", field, w = *width))
                .collect();
            println!("  {}", line.join("  "));
        }
        if rows.is_empty() {
            println!("  (empty)");
        }
    }
}
