use std::io::{self, Write};

use serde::Serialize;

use crate::domain::MapPreview;
use crate::pipeline::SyncReport;
use crate::sources::SourceTreeNode;

#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub reports: Vec<SyncReport>,
    pub failed: usize,
}

impl SyncSummary {
    pub fn new(reports: Vec<SyncReport>) -> Self {
        let failed = reports
            .iter()
            .filter(|report| matches!(report.outcome, crate::pipeline::SyncOutcome::Failed { .. }))
            .count();
        Self { reports, failed }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeResult {
    pub dataset: String,
    pub tree: Vec<SourceTreeNode>,
    pub archives: Vec<ArchiveTree>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveTree {
    pub resource: String,
    pub members: Vec<SourceTreeNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewResult {
    pub dataset: String,
    pub preview: Option<MapPreview>,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &SyncSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    pub fn print_tree(result: &TreeResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_preview(result: &PreviewResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
