use std::collections::HashMap;

use chrono::NaiveDateTime;
use log::debug;

use crate::records::{
    AgingBucket, AttachmentRecord, CleanedTables, RawAttachmentRow, RawSchemeRow, RawTables,
    RawWorkflowRow, SchemeRecord, WorkflowStep,
};

/// Label substituted for a null or empty categorical value.
pub const UNKNOWN_CATEGORY: &str = "UNKNOWN";

/// Cleans and enriches the raw tables.
///
/// Rows missing a mandatory key are dropped; the drop count per table
/// always equals the corresponding combined missing-key health metric.
/// Everything else is coerced permissively: a value that fails to parse
/// becomes absent rather than failing the run. Cleaning never multiplies
/// rows, and duplicate scheme ids pass through unmerged.
pub fn clean_and_enrich(raw: &RawTables) -> CleanedTables {
    let workflow = clean_workflow(&raw.workflow);
    let attachments = clean_attachments(&raw.attachments);
    let schemes = clean_schemes(&raw.schemes, &workflow);

    debug!(
        "Cleaned tables: {} schemes ({} dropped), {} workflow ({} dropped), {} attachments ({} dropped)",
        schemes.len(),
        raw.schemes.len() - schemes.len(),
        workflow.len(),
        raw.workflow.len() - workflow.len(),
        attachments.len(),
        raw.attachments.len() - attachments.len(),
    );

    CleanedTables {
        schemes,
        workflow,
        attachments,
    }
}

/// Latest `forwarded_at` per scheme. Shared by the cleaner and the raw-data
/// auditor so both sides agree on what a scheme's last action is.
pub fn last_action_by_scheme<'a, I>(steps: I) -> HashMap<&'a str, NaiveDateTime>
where
    I: IntoIterator<Item = (&'a str, NaiveDateTime)>,
{
    let mut latest: HashMap<&str, NaiveDateTime> = HashMap::new();
    for (scheme_id, forwarded_at) in steps {
        latest
            .entry(scheme_id)
            .and_modify(|current| {
                if forwarded_at > *current {
                    *current = forwarded_at;
                }
            })
            .or_insert(forwarded_at);
    }
    latest
}

/// Whole days between creation and the last recorded action.
pub fn aging_days(creation_date: NaiveDateTime, last_action_date: NaiveDateTime) -> i64 {
    (last_action_date - creation_date).num_days()
}

/// Trim, uppercase, and collapse null/empty into `UNKNOWN` so group-bys
/// never split on casing or stray whitespace.
pub fn normalize_category(value: Option<&str>) -> String {
    match value.map(str::trim) {
        None | Some("") => UNKNOWN_CATEGORY.to_string(),
        Some(value) => value.to_uppercase(),
    }
}

fn clean_schemes(rows: &[RawSchemeRow], workflow: &[WorkflowStep]) -> Vec<SchemeRecord> {
    // Pre-aggregate, then look up per scheme. Joining row-wise against the
    // workflow table would fan scheme rows out.
    let last_action = last_action_by_scheme(
        workflow
            .iter()
            .map(|step| (step.scheme_id.as_str(), step.forwarded_at)),
    );

    rows.iter()
        .filter_map(|row| {
            let scheme_id = row.scheme_id.clone()?;
            let creation_date = row.creation_date?;
            let last_action_date = last_action.get(scheme_id.as_str()).copied();
            let aging = last_action_date.map(|last| aging_days(creation_date, last));
            Some(SchemeRecord {
                plant: normalize_category(row.plant.as_deref()),
                category: normalize_category(row.category.as_deref()),
                department_at_time: normalize_category(row.department_at_time.as_deref()),
                created_by: row.created_by.clone(),
                scheme_id,
                creation_date,
                last_action_date,
                aging_days: aging,
                aging_bucket: aging.map(AgingBucket::classify),
            })
        })
        .collect()
}

fn clean_workflow(rows: &[RawWorkflowRow]) -> Vec<WorkflowStep> {
    rows.iter()
        .filter_map(|row| {
            let scheme_id = row.scheme_id.clone()?;
            let forwarded_at = row.forwarded_at?;
            Some(WorkflowStep {
                scheme_id,
                user: row.user.clone(),
                department: row.department.clone(),
                forwarded_at,
                time_taken: row.time_taken.as_deref().and_then(parse_duration),
            })
        })
        .collect()
}

fn clean_attachments(rows: &[RawAttachmentRow]) -> Vec<AttachmentRecord> {
    rows.iter()
        .filter_map(|row| {
            Some(AttachmentRecord {
                scheme_id: row.scheme_id.clone()?,
                file_name: row.file_name.clone()?,
                user: row.user.clone(),
                department: row.department.clone(),
            })
        })
        .collect()
}

// Durations arrive as free text. Anything that does not parse as a finite
// number becomes absent and is visible only through the health metrics.
fn parse_duration(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_timestamp;
    use pretty_assertions::assert_eq;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    fn scheme(id: &str, created: &str) -> RawSchemeRow {
        RawSchemeRow {
            scheme_id: Some(id.to_string()),
            creation_date: Some(ts(created)),
            ..Default::default()
        }
    }

    fn step(id: &str, forwarded: &str, time_taken: Option<&str>) -> RawWorkflowRow {
        RawWorkflowRow {
            scheme_id: Some(id.to_string()),
            forwarded_at: Some(ts(forwarded)),
            time_taken: time_taken.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_rows_missing_keys_are_dropped() {
        let raw = RawTables {
            schemes: vec![
                scheme("S1", "2023-01-01"),
                RawSchemeRow {
                    scheme_id: None,
                    creation_date: Some(ts("2023-01-01")),
                    ..Default::default()
                },
                RawSchemeRow {
                    scheme_id: Some("S3".to_string()),
                    creation_date: None,
                    ..Default::default()
                },
            ],
            workflow: vec![
                step("S1", "2023-01-10", Some("5")),
                RawWorkflowRow {
                    scheme_id: Some("S1".to_string()),
                    forwarded_at: None,
                    ..Default::default()
                },
            ],
            attachments: vec![
                RawAttachmentRow {
                    scheme_id: Some("S1".to_string()),
                    file_name: Some("a.pdf".to_string()),
                    ..Default::default()
                },
                RawAttachmentRow {
                    scheme_id: Some("S1".to_string()),
                    file_name: None,
                    ..Default::default()
                },
            ],
        };
        let cleaned = clean_and_enrich(&raw);
        assert_eq!(cleaned.schemes.len(), 1);
        assert_eq!(cleaned.workflow.len(), 1);
        assert_eq!(cleaned.attachments.len(), 1);
    }

    #[test]
    fn test_last_action_is_max_forwarded_at() {
        let raw = RawTables {
            schemes: vec![scheme("S1", "2023-01-01"), scheme("S2", "2023-01-01")],
            workflow: vec![
                step("S1", "2023-01-10", None),
                step("S1", "2023-03-05", None),
                step("S1", "2023-02-20", None),
            ],
            attachments: vec![],
        };
        let cleaned = clean_and_enrich(&raw);
        let s1 = &cleaned.schemes[0];
        assert_eq!(s1.last_action_date, Some(ts("2023-03-05")));
        assert_eq!(s1.aging_days, Some(63));
        assert_eq!(s1.aging_bucket, Some(AgingBucket::Under90));

        // No steps: every derived field stays absent
        let s2 = &cleaned.schemes[1];
        assert_eq!(s2.last_action_date, None);
        assert_eq!(s2.aging_days, None);
        assert_eq!(s2.aging_bucket, None);
    }

    #[test]
    fn test_last_action_join_does_not_duplicate_schemes() {
        let raw = RawTables {
            schemes: vec![scheme("S1", "2023-01-01")],
            workflow: vec![
                step("S1", "2023-01-10", None),
                step("S1", "2023-01-11", None),
                step("S1", "2023-01-12", None),
            ],
            attachments: vec![],
        };
        let cleaned = clean_and_enrich(&raw);
        assert_eq!(cleaned.schemes.len(), 1);
        assert_eq!(cleaned.workflow.len(), 3);
    }

    #[test]
    fn test_duplicate_scheme_ids_pass_through() {
        let raw = RawTables {
            schemes: vec![scheme("S1", "2023-01-01"), scheme("S1", "2023-02-01")],
            workflow: vec![],
            attachments: vec![],
        };
        let cleaned = clean_and_enrich(&raw);
        assert_eq!(cleaned.schemes.len(), 2);
    }

    #[test]
    fn test_unparsable_duration_becomes_absent() {
        let raw = RawTables {
            schemes: vec![],
            workflow: vec![
                step("S1", "2023-01-10", Some("7.5")),
                step("S1", "2023-01-11", Some("soon")),
                step("S1", "2023-01-12", Some("NaN")),
                step("S1", "2023-01-13", None),
            ],
            attachments: vec![],
        };
        let cleaned = clean_and_enrich(&raw);
        assert_eq!(cleaned.workflow[0].time_taken, Some(7.5));
        assert_eq!(cleaned.workflow[1].time_taken, None);
        assert_eq!(cleaned.workflow[2].time_taken, None);
        assert_eq!(cleaned.workflow[3].time_taken, None);
    }

    #[test]
    fn test_normalize_category() {
        assert_eq!(normalize_category(Some(" eng ")), "ENG");
        assert_eq!(normalize_category(Some("Quality Control")), "QUALITY CONTROL");
        assert_eq!(normalize_category(Some("")), UNKNOWN_CATEGORY);
        assert_eq!(normalize_category(Some("   ")), UNKNOWN_CATEGORY);
        assert_eq!(normalize_category(None), UNKNOWN_CATEGORY);
    }

    #[test]
    fn test_aging_boundaries_through_cleaning() {
        let raw = RawTables {
            schemes: vec![
                scheme("S90", "2023-01-01"),
                scheme("S91", "2023-01-01"),
                scheme("S180", "2023-01-01"),
                scheme("S181", "2023-01-01"),
            ],
            workflow: vec![
                step("S90", "2023-04-01", None),  // exactly 90 days
                step("S91", "2023-04-02", None),  // 91 days
                step("S180", "2023-06-30", None), // exactly 180 days
                step("S181", "2023-07-01", None), // 181 days
            ],
            attachments: vec![],
        };
        let cleaned = clean_and_enrich(&raw);
        let buckets: Vec<_> = cleaned
            .schemes
            .iter()
            .map(|s| (s.aging_days.unwrap(), s.aging_bucket.unwrap()))
            .collect();
        assert_eq!(
            buckets,
            vec![
                (90, AgingBucket::Under90),
                (91, AgingBucket::From90To180),
                (180, AgingBucket::From90To180),
                (181, AgingBucket::Over180),
            ]
        );
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let raw = RawTables {
            schemes: vec![
                RawSchemeRow {
                    scheme_id: Some("S1".to_string()),
                    creation_date: Some(ts("2023-01-01")),
                    plant: Some(" plant a ".to_string()),
                    category: Some("cat_a".to_string()),
                    department_at_time: None,
                    created_by: Some("alice".to_string()),
                },
                scheme("S2", "2023-02-01"),
            ],
            workflow: vec![step("S1", "2023-01-10", Some("5"))],
            attachments: vec![RawAttachmentRow {
                scheme_id: Some("S1".to_string()),
                file_name: Some("a.pdf".to_string()),
                user: Some("bob".to_string()),
                department: Some("ENG".to_string()),
            }],
        };
        let once = clean_and_enrich(&raw);

        // Feed the cleaned output back through as if reloaded
        let again_raw = RawTables {
            schemes: once
                .schemes
                .iter()
                .map(|s| RawSchemeRow {
                    scheme_id: Some(s.scheme_id.clone()),
                    creation_date: Some(s.creation_date),
                    plant: Some(s.plant.clone()),
                    category: Some(s.category.clone()),
                    department_at_time: Some(s.department_at_time.clone()),
                    created_by: s.created_by.clone(),
                })
                .collect(),
            workflow: once
                .workflow
                .iter()
                .map(|w| RawWorkflowRow {
                    scheme_id: Some(w.scheme_id.clone()),
                    user: w.user.clone(),
                    department: w.department.clone(),
                    forwarded_at: Some(w.forwarded_at),
                    time_taken: w.time_taken.map(|t| t.to_string()),
                })
                .collect(),
            attachments: once
                .attachments
                .iter()
                .map(|a| RawAttachmentRow {
                    scheme_id: Some(a.scheme_id.clone()),
                    file_name: Some(a.file_name.clone()),
                    user: a.user.clone(),
                    department: a.department.clone(),
                })
                .collect(),
        };
        let twice = clean_and_enrich(&again_raw);
        assert_eq!(once.schemes, twice.schemes);
        assert_eq!(once.workflow, twice.workflow);
        assert_eq!(once.attachments, twice.attachments);
    }
}
