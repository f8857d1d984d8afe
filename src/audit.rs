use std::collections::HashSet;

use crate::clean::{aging_days, last_action_by_scheme};
use crate::records::RawTables;

/// Named data-quality counts over the raw tables.
///
/// Recomputed from scratch on every run and published wholesale; nothing
/// here is ever merged with a previous run's metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthMetrics {
    pub schemes_missing_scheme_id: u64,
    pub schemes_missing_creation_date: u64,
    pub schemes_missing_category: u64,
    pub schemes_missing_department: u64,
    pub workflow_missing_scheme_id: u64,
    pub workflow_missing_forwarded_at: u64,
    pub workflow_missing_time_taken: u64,
    pub attachments_missing_scheme_id: u64,
    pub attachments_missing_file_name: u64,
    pub schemes_duplicate_scheme_id: u64,
    pub workflow_duplicate_rows: u64,
    pub attachments_duplicate_rows: u64,
    pub schemes_aging_gt_180: u64,
    /// Rows the cleaner will drop: scheme_id or creationDate missing.
    pub schemes_missing_key: u64,
    /// Rows the cleaner will drop: scheme_id or forwarded_at missing.
    pub workflow_missing_key: u64,
    /// Rows the cleaner will drop: scheme_id or fileName missing.
    pub attachments_missing_key: u64,
}

impl HealthMetrics {
    /// The published `(metric_name, count)` pairs, in a stable order.
    /// These names are the persistence contract; renames break consumers.
    pub fn pairs(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("schemes_missing_scheme_id", self.schemes_missing_scheme_id),
            ("schemes_missing_creationDate", self.schemes_missing_creation_date),
            ("schemes_missing_category", self.schemes_missing_category),
            ("schemes_missing_department", self.schemes_missing_department),
            ("workflow_missing_scheme_id", self.workflow_missing_scheme_id),
            ("workflow_missing_forwarded_at", self.workflow_missing_forwarded_at),
            ("workflow_missing_time_taken", self.workflow_missing_time_taken),
            ("attachments_missing_scheme_id", self.attachments_missing_scheme_id),
            ("attachments_missing_fileName", self.attachments_missing_file_name),
            ("schemes_duplicate_scheme_id", self.schemes_duplicate_scheme_id),
            ("workflow_duplicate_rows", self.workflow_duplicate_rows),
            ("attachments_duplicate_rows", self.attachments_duplicate_rows),
            ("schemes_aging_gt_180", self.schemes_aging_gt_180),
            (
                "schemes_missing_scheme_id_or_creationDate",
                self.schemes_missing_key,
            ),
            (
                "workflow_missing_scheme_id_or_forwarded_at",
                self.workflow_missing_key,
            ),
            (
                "attachments_missing_scheme_id_or_fileName",
                self.attachments_missing_key,
            ),
        ]
    }
}

/// Computes health metrics over the raw tables without mutating them.
///
/// Order-independent and free of wall-clock influence: aging is measured
/// against each scheme's own latest recorded action, so repeated runs on
/// static input always agree.
pub fn audit(raw: &RawTables) -> HealthMetrics {
    let mut metrics = HealthMetrics::default();

    let mut seen_scheme_ids: HashSet<&str> = HashSet::new();
    for row in &raw.schemes {
        match &row.scheme_id {
            None => metrics.schemes_missing_scheme_id += 1,
            Some(id) => {
                if !seen_scheme_ids.insert(id.as_str()) {
                    metrics.schemes_duplicate_scheme_id += 1;
                }
            }
        }
        if row.creation_date.is_none() {
            metrics.schemes_missing_creation_date += 1;
        }
        if row.category.is_none() {
            metrics.schemes_missing_category += 1;
        }
        if row.department_at_time.is_none() {
            metrics.schemes_missing_department += 1;
        }
        if row.scheme_id.is_none() || row.creation_date.is_none() {
            metrics.schemes_missing_key += 1;
        }
    }

    let mut seen_workflow_rows = HashSet::new();
    for row in &raw.workflow {
        if row.scheme_id.is_none() {
            metrics.workflow_missing_scheme_id += 1;
        }
        if row.forwarded_at.is_none() {
            metrics.workflow_missing_forwarded_at += 1;
        }
        if row.time_taken.is_none() {
            metrics.workflow_missing_time_taken += 1;
        }
        if row.scheme_id.is_none() || row.forwarded_at.is_none() {
            metrics.workflow_missing_key += 1;
        }
        if !seen_workflow_rows.insert(row) {
            metrics.workflow_duplicate_rows += 1;
        }
    }

    let mut seen_attachment_rows = HashSet::new();
    for row in &raw.attachments {
        if row.scheme_id.is_none() {
            metrics.attachments_missing_scheme_id += 1;
        }
        if row.file_name.is_none() {
            metrics.attachments_missing_file_name += 1;
        }
        if row.scheme_id.is_none() || row.file_name.is_none() {
            metrics.attachments_missing_key += 1;
        }
        if !seen_attachment_rows.insert(row) {
            metrics.attachments_duplicate_rows += 1;
        }
    }

    // Same last-action logic the cleaner uses, applied to the raw rows;
    // duplicate scheme rows are counted per occurrence
    let last_action = last_action_by_scheme(
        raw.workflow
            .iter()
            .filter_map(|row| Some((row.scheme_id.as_deref()?, row.forwarded_at?))),
    );
    for row in &raw.schemes {
        let (Some(scheme_id), Some(created)) = (&row.scheme_id, row.creation_date) else {
            continue;
        };
        if let Some(last) = last_action.get(scheme_id.as_str()) {
            if aging_days(created, *last) > 180 {
                metrics.schemes_aging_gt_180 += 1;
            }
        }
    }

    metrics
}
