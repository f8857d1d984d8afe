use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::{debug, info};

use crate::aggregate::Summaries;
use crate::audit::HealthMetrics;
use crate::csv::push_row;
use crate::error::SchemePrepError;
use crate::records::CleanedTables;

// Published artifact names. The downstream presentation layer locates
// artifacts by these exact names; renaming any of them is a breaking change.
pub const SCHEMES_CLEANED_FILE: &str = "schemes_cleaned.csv";
pub const WORKFLOW_CLEANED_FILE: &str = "workflow_cleaned.csv";
pub const ATTACHMENTS_CLEANED_FILE: &str = "attachments_cleaned.csv";
pub const SUMMARY_BY_USER_FILE: &str = "summary_by_user.csv";
pub const SUMMARY_BY_DEPARTMENT_FILE: &str = "summary_by_department.csv";
pub const SUMMARY_BY_CATEGORY_FILE: &str = "summary_by_category.csv";
pub const SUMMARY_ATTACHMENTS_BY_USER_FILE: &str = "summary_attachments_by_user.csv";
pub const DATA_HEALTH_FILE: &str = "data_health.csv";

pub const LOCK_FILE: &str = ".schemeprep.lock";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Serializes runs against one output location.
///
/// The lock file is created exclusively and removed on drop. A file left
/// behind by a crashed run has to be deleted by hand; the error message
/// says which file.
pub struct OutputLock {
    path: PathBuf,
}

impl OutputLock {
    pub fn acquire(output_dir: &Path) -> Result<Self, SchemePrepError> {
        fs::create_dir_all(output_dir)?;
        let path = output_dir.join(LOCK_FILE);
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(_) => {
                debug!("Acquired output lock {}", path.display());
                Ok(OutputLock { path })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(SchemePrepError::Error(format!(
                    "another run holds the output lock '{}'; delete the file if it is stale",
                    path.display()
                )))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for OutputLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            debug!("Could not remove output lock {}: {}", self.path.display(), e);
        }
    }
}

/// Writes every artifact of a run to `output_dir`, replacing the previous
/// run's artifacts.
///
/// All files are first written into a staging directory beside the final
/// location, then moved into place only after every write has succeeded.
/// A failure mid-write therefore leaves the previously published
/// artifacts untouched; the staging directory is removed on drop.
pub fn publish(
    output_dir: &Path,
    cleaned: &CleanedTables,
    summaries: &Summaries,
    health: &HealthMetrics,
) -> Result<(), SchemePrepError> {
    fs::create_dir_all(output_dir)?;
    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(output_dir)?;

    let artifacts = [
        (SCHEMES_CLEANED_FILE, schemes_csv(cleaned)),
        (WORKFLOW_CLEANED_FILE, workflow_csv(cleaned)),
        (ATTACHMENTS_CLEANED_FILE, attachments_csv(cleaned)),
        (SUMMARY_BY_USER_FILE, summary_by_user_csv(summaries)),
        (SUMMARY_BY_DEPARTMENT_FILE, summary_by_department_csv(summaries)),
        (SUMMARY_BY_CATEGORY_FILE, summary_by_category_csv(summaries)),
        (
            SUMMARY_ATTACHMENTS_BY_USER_FILE,
            summary_attachments_by_user_csv(summaries),
        ),
        (DATA_HEALTH_FILE, health_csv(health)),
    ];

    for (name, contents) in &artifacts {
        debug!("Staging {}", name);
        fs::write(staging.path().join(name), contents)?;
    }

    // Everything staged; one rename per artifact into the final location
    for (name, _) in &artifacts {
        fs::rename(staging.path().join(name), output_dir.join(name))?;
    }

    info!(
        "Published {} artifacts to {}",
        artifacts.len(),
        output_dir.display()
    );
    Ok(())
}

fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

fn opt_timestamp(timestamp: Option<NaiveDateTime>) -> String {
    timestamp.map(format_timestamp).unwrap_or_default()
}

fn opt_number<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn schemes_csv(cleaned: &CleanedTables) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        &[
            "scheme_id",
            "creationDate",
            "plant",
            "category",
            "department_at_time",
            "createdBy",
            "last_action_date",
            "aging_days",
            "aging_bucket",
        ],
    );
    for scheme in &cleaned.schemes {
        push_row(
            &mut out,
            &[
                &scheme.scheme_id,
                &format_timestamp(scheme.creation_date),
                &scheme.plant,
                &scheme.category,
                &scheme.department_at_time,
                scheme.created_by.as_deref().unwrap_or(""),
                &opt_timestamp(scheme.last_action_date),
                &opt_number(scheme.aging_days),
                &scheme
                    .aging_bucket
                    .map(|bucket| bucket.to_string())
                    .unwrap_or_default(),
            ],
        );
    }
    out
}

fn workflow_csv(cleaned: &CleanedTables) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        &["scheme_id", "user", "department", "forwarded_at", "time_taken"],
    );
    for step in &cleaned.workflow {
        push_row(
            &mut out,
            &[
                &step.scheme_id,
                step.user.as_deref().unwrap_or(""),
                step.department.as_deref().unwrap_or(""),
                &format_timestamp(step.forwarded_at),
                &opt_number(step.time_taken),
            ],
        );
    }
    out
}

fn attachments_csv(cleaned: &CleanedTables) -> String {
    let mut out = String::new();
    push_row(&mut out, &["scheme_id", "fileName", "user", "department"]);
    for attachment in &cleaned.attachments {
        push_row(
            &mut out,
            &[
                &attachment.scheme_id,
                &attachment.file_name,
                attachment.user.as_deref().unwrap_or(""),
                attachment.department.as_deref().unwrap_or(""),
            ],
        );
    }
    out
}

fn summary_by_user_csv(summaries: &Summaries) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        &["user", "department", "schemes_handled", "avg_processing_time"],
    );
    for row in &summaries.by_user {
        push_row(
            &mut out,
            &[
                &row.user,
                &row.department,
                &row.schemes_handled.to_string(),
                &opt_number(row.avg_processing_time),
            ],
        );
    }
    out
}

fn summary_by_department_csv(summaries: &Summaries) -> String {
    let mut out = String::new();
    push_row(&mut out, &["department_at_time", "schemes_handled"]);
    for row in &summaries.by_department {
        push_row(
            &mut out,
            &[&row.department, &row.schemes_handled.to_string()],
        );
    }
    out
}

fn summary_by_category_csv(summaries: &Summaries) -> String {
    let mut out = String::new();
    push_row(&mut out, &["category", "schemes_handled"]);
    for row in &summaries.by_category {
        push_row(&mut out, &[&row.category, &row.schemes_handled.to_string()]);
    }
    out
}

fn summary_attachments_by_user_csv(summaries: &Summaries) -> String {
    let mut out = String::new();
    push_row(&mut out, &["user", "department", "total_attachments"]);
    for row in &summaries.attachments_by_user {
        push_row(
            &mut out,
            &[
                &row.user,
                &row.department,
                &row.total_attachments.to_string(),
            ],
        );
    }
    out
}

// Headerless (metric_name, count) pairs; the dashboard loader reads this
// file without a header row.
fn health_csv(health: &HealthMetrics) -> String {
    let mut out = String::new();
    for (name, count) in health.pairs() {
        push_row(&mut out, &[name, &count.to_string()]);
    }
    out
}
