//! Machine-readable run report.
use super::{FinalizerRecord, Phase, RunOutcome, RunSummary};
use crate::config::{ExecutionMode, RunConfig};
use crate::golden::Platform;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub schema_version: u32,
    pub mode: ExecutionMode,
    pub platform: Platform,
    pub outcome: RunOutcome,
    pub exit_code: u8,
    pub requirements_in: PathBuf,
    pub requirements_txt: PathBuf,
    pub candidate: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub golden: Option<PathBuf>,
    pub termination: String,
    pub update_command: String,
    pub phases: Vec<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    pub finalizers: Vec<FinalizerRecord>,
}

impl RunReport {
    pub fn new(summary: &RunSummary, config: &RunConfig) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            mode: summary.mode,
            platform: config.platform,
            outcome: summary.outcome,
            exit_code: summary.outcome.exit_code(),
            requirements_in: config.requirements_in.clone(),
            requirements_txt: config.requirements_txt.clone(),
            candidate: config.output_path().to_path_buf(),
            golden: summary.golden.clone(),
            termination: summary.resolution.termination.to_string(),
            update_command: config.update_command.clone(),
            phases: summary.trail.clone(),
            diff: summary.diff.clone(),
            finalizers: summary.finalizers.clone(),
        }
    }
}

pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).context("serialize run report")?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
