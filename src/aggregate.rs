use std::collections::{BTreeMap, BTreeSet};

use crate::records::{AttachmentRecord, CleanedTables, SchemeRecord, WorkflowStep};

/// Per user and department: schemes touched and mean processing time.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSummary {
    pub user: String,
    pub department: String,
    pub schemes_handled: u64,
    pub avg_processing_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentSummary {
    pub department: String,
    pub schemes_handled: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    pub category: String,
    pub schemes_handled: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentSummary {
    pub user: String,
    pub department: String,
    pub total_attachments: u64,
}

/// The four summary tables, each independently derived from its cleaned
/// table slice.
#[derive(Debug, Clone, Default)]
pub struct Summaries {
    pub by_user: Vec<UserSummary>,
    pub by_department: Vec<DepartmentSummary>,
    pub by_category: Vec<CategorySummary>,
    pub attachments_by_user: Vec<AttachmentSummary>,
}

pub fn summarize_all(cleaned: &CleanedTables) -> Summaries {
    Summaries {
        by_user: summarize_by_user(&cleaned.workflow),
        by_department: summarize_by_department(&cleaned.schemes),
        by_category: summarize_by_category(&cleaned.schemes),
        attachments_by_user: summarize_attachments_by_user(&cleaned.attachments),
    }
}

/// Workflow activity grouped by (user, department). Steps without both
/// keys are left out of the grouping; distinct schemes are counted and
/// the mean is taken over the steps that carry a parseable duration.
pub fn summarize_by_user(workflow: &[WorkflowStep]) -> Vec<UserSummary> {
    #[derive(Default)]
    struct Group<'a> {
        schemes: BTreeSet<&'a str>,
        total_time: f64,
        timed_steps: u64,
    }

    let mut groups: BTreeMap<(&str, &str), Group> = BTreeMap::new();
    for step in workflow {
        let (Some(user), Some(department)) = (step.user.as_deref(), step.department.as_deref())
        else {
            continue;
        };
        let group = groups.entry((user, department)).or_default();
        group.schemes.insert(step.scheme_id.as_str());
        if let Some(time_taken) = step.time_taken {
            group.total_time += time_taken;
            group.timed_steps += 1;
        }
    }

    groups
        .into_iter()
        .map(|((user, department), group)| UserSummary {
            user: user.to_string(),
            department: department.to_string(),
            schemes_handled: group.schemes.len() as u64,
            avg_processing_time: (group.timed_steps > 0)
                .then(|| group.total_time / group.timed_steps as f64),
        })
        .collect()
}

/// Distinct schemes per department. Normalization upstream guarantees the
/// key is never empty (missing departments group under UNKNOWN).
pub fn summarize_by_department(schemes: &[SchemeRecord]) -> Vec<DepartmentSummary> {
    distinct_schemes_by(schemes, |scheme| scheme.department_at_time.as_str())
        .into_iter()
        .map(|(department, schemes_handled)| DepartmentSummary {
            department: department.to_string(),
            schemes_handled,
        })
        .collect()
}

pub fn summarize_by_category(schemes: &[SchemeRecord]) -> Vec<CategorySummary> {
    distinct_schemes_by(schemes, |scheme| scheme.category.as_str())
        .into_iter()
        .map(|(category, schemes_handled)| CategorySummary {
            category: category.to_string(),
            schemes_handled,
        })
        .collect()
}

/// Attachment volume per (user, department); rows without both keys are
/// left out, mirroring the user summary.
pub fn summarize_attachments_by_user(attachments: &[AttachmentRecord]) -> Vec<AttachmentSummary> {
    let mut groups: BTreeMap<(&str, &str), u64> = BTreeMap::new();
    for attachment in attachments {
        let (Some(user), Some(department)) =
            (attachment.user.as_deref(), attachment.department.as_deref())
        else {
            continue;
        };
        *groups.entry((user, department)).or_insert(0) += 1;
    }

    groups
        .into_iter()
        .map(|((user, department), total_attachments)| AttachmentSummary {
            user: user.to_string(),
            department: department.to_string(),
            total_attachments,
        })
        .collect()
}

fn distinct_schemes_by<'a, F>(schemes: &'a [SchemeRecord], key: F) -> BTreeMap<&'a str, u64>
where
    F: Fn(&'a SchemeRecord) -> &'a str,
{
    let mut groups: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for scheme in schemes {
        groups
            .entry(key(scheme))
            .or_default()
            .insert(scheme.scheme_id.as_str());
    }
    groups
        .into_iter()
        .map(|(group_key, ids)| (group_key, ids.len() as u64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_timestamp;
    use chrono::NaiveDateTime;
    use pretty_assertions::assert_eq;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    fn step(scheme: &str, user: Option<&str>, dept: Option<&str>, time: Option<f64>) -> WorkflowStep {
        WorkflowStep {
            scheme_id: scheme.to_string(),
            user: user.map(str::to_string),
            department: dept.map(str::to_string),
            forwarded_at: ts("2023-01-10"),
            time_taken: time,
        }
    }

    fn scheme(id: &str, department: &str, category: &str) -> SchemeRecord {
        SchemeRecord {
            scheme_id: id.to_string(),
            creation_date: ts("2023-01-01"),
            plant: "P1".to_string(),
            category: category.to_string(),
            department_at_time: department.to_string(),
            created_by: None,
            last_action_date: None,
            aging_days: None,
            aging_bucket: None,
        }
    }

    fn attachment(scheme: &str, file: &str, user: Option<&str>, dept: Option<&str>) -> AttachmentRecord {
        AttachmentRecord {
            scheme_id: scheme.to_string(),
            file_name: file.to_string(),
            user: user.map(str::to_string),
            department: dept.map(str::to_string),
        }
    }

    #[test]
    fn test_by_user_counts_distinct_schemes_and_means_time() {
        let workflow = vec![
            step("S1", Some("bob"), Some("ENG"), Some(4.0)),
            step("S1", Some("bob"), Some("ENG"), Some(6.0)),
            step("S2", Some("bob"), Some("ENG"), None),
            step("S3", Some("amy"), Some("QA"), None),
        ];
        let summaries = summarize_by_user(&workflow);
        assert_eq!(
            summaries,
            vec![
                UserSummary {
                    user: "amy".to_string(),
                    department: "QA".to_string(),
                    schemes_handled: 1,
                    avg_processing_time: None,
                },
                UserSummary {
                    user: "bob".to_string(),
                    department: "ENG".to_string(),
                    schemes_handled: 2,
                    avg_processing_time: Some(5.0),
                },
            ]
        );
    }

    #[test]
    fn test_by_user_skips_rows_without_both_keys() {
        let workflow = vec![
            step("S1", Some("bob"), None, Some(4.0)),
            step("S2", None, Some("ENG"), Some(2.0)),
            step("S3", None, None, None),
        ];
        assert_eq!(summarize_by_user(&workflow), vec![]);
    }

    #[test]
    fn test_same_user_in_two_departments_stays_split() {
        let workflow = vec![
            step("S1", Some("bob"), Some("ENG"), None),
            step("S2", Some("bob"), Some("QA"), None),
        ];
        let summaries = summarize_by_user(&workflow);
        assert_eq!(summaries.len(), 2);
    }

    #[test]
    fn test_by_department_distinct_schemes() {
        let schemes = vec![
            scheme("S1", "ENG", "CAT_A"),
            scheme("S1", "ENG", "CAT_A"), // duplicate id counts once
            scheme("S2", "ENG", "CAT_B"),
            scheme("S3", "QA", "CAT_A"),
        ];
        let summaries = summarize_by_department(&schemes);
        assert_eq!(
            summaries,
            vec![
                DepartmentSummary {
                    department: "ENG".to_string(),
                    schemes_handled: 2,
                },
                DepartmentSummary {
                    department: "QA".to_string(),
                    schemes_handled: 1,
                },
            ]
        );
    }

    #[test]
    fn test_by_category_cross_check() {
        let schemes = vec![
            scheme("S1", "ENG", "CAT_A"),
            scheme("S2", "QA", "CAT_A"),
            scheme("S3", "QA", "CAT_B"),
        ];
        let summaries = summarize_by_category(&schemes);
        for summary in &summaries {
            let distinct: BTreeSet<&str> = schemes
                .iter()
                .filter(|s| s.category == summary.category)
                .map(|s| s.scheme_id.as_str())
                .collect();
            assert_eq!(summary.schemes_handled as usize, distinct.len());
        }
        assert_eq!(summaries.len(), 2);
    }

    #[test]
    fn test_attachments_by_user_counts_files() {
        let attachments = vec![
            attachment("S1", "a.pdf", Some("bob"), Some("ENG")),
            attachment("S1", "b.pdf", Some("bob"), Some("ENG")),
            attachment("S2", "c.pdf", Some("amy"), Some("QA")),
            attachment("S3", "d.pdf", None, Some("QA")),
        ];
        let summaries = summarize_attachments_by_user(&attachments);
        assert_eq!(
            summaries,
            vec![
                AttachmentSummary {
                    user: "amy".to_string(),
                    department: "QA".to_string(),
                    total_attachments: 1,
                },
                AttachmentSummary {
                    user: "bob".to_string(),
                    department: "ENG".to_string(),
                    total_attachments: 2,
                },
            ]
        );
    }

    #[test]
    fn test_empty_inputs_yield_empty_summaries() {
        let summaries = summarize_all(&CleanedTables::default());
        assert!(summaries.by_user.is_empty());
        assert!(summaries.by_department.is_empty());
        assert!(summaries.by_category.is_empty());
        assert!(summaries.attachments_by_user.is_empty());
    }
}
