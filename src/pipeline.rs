use std::path::PathBuf;

use log::info;

use crate::aggregate;
use crate::audit::{self, HealthMetrics};
use crate::clean;
use crate::config::Config;
use crate::error::SchemePrepError;
use crate::loader;
use crate::persist;

/// Row counts and health metrics from a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub raw_schemes: usize,
    pub raw_workflow: usize,
    pub raw_attachments: usize,
    pub cleaned_schemes: usize,
    pub cleaned_workflow: usize,
    pub cleaned_attachments: usize,
    pub health: HealthMetrics,
    pub output_dir: PathBuf,
}

/// Runs the five pipeline stages in order: load, audit, clean/enrich,
/// aggregate, publish.
///
/// Each stage consumes the previous stage's full output. Every table is
/// recomputed from scratch; there is no incremental merge with a prior
/// run. Any stage error aborts the run and nothing is published.
pub fn run(config: &Config) -> Result<RunSummary, SchemePrepError> {
    // One run at a time per output location; released when the run ends
    let _lock = persist::OutputLock::acquire(&config.data.output_dir)?;

    let raw = loader::load_raw_tables(&config.data.input_dir)?;

    info!("Auditing raw data");
    let health = audit::audit(&raw);

    info!("Cleaning and enriching");
    let cleaned = clean::clean_and_enrich(&raw);

    info!("Building summary tables");
    let summaries = aggregate::summarize_all(&cleaned);

    persist::publish(&config.data.output_dir, &cleaned, &summaries, &health)?;

    Ok(RunSummary {
        raw_schemes: raw.schemes.len(),
        raw_workflow: raw.workflow.len(),
        raw_attachments: raw.attachments.len(),
        cleaned_schemes: cleaned.schemes.len(),
        cleaned_workflow: cleaned.workflow.len(),
        cleaned_attachments: cleaned.attachments.len(),
        health,
        output_dir: config.data.output_dir.clone(),
    })
}
