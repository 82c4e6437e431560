//! Export of a presenter view to disk.
//!
//! Writes the same rows the dashboard serves, as pretty JSON, so a slate
//! can be shared or diffed between refreshes.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::info;

use super::summary::SlateSummary;
use crate::strategy::SlateView;

/// Everything written by one export.
#[derive(Debug, Serialize)]
pub struct ExportDocument<'a> {
    pub exported_at: chrono::DateTime<chrono::Utc>,
    pub summary: &'a SlateSummary,
    #[serde(flatten)]
    pub view: &'a SlateView,
}

/// Write `view` and its summary to `path`, replacing any previous export.
pub fn write_view(path: &str, view: &SlateView, summary: &SlateSummary) -> Result<()> {
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context(format!("Failed to create export directory for {path}"))?;
    }

    let doc = ExportDocument {
        exported_at: chrono::Utc::now(),
        summary,
        view,
    };
    let json = serde_json::to_string_pretty(&doc).context("Failed to serialise export")?;
    std::fs::write(path, json).context(format!("Failed to write export to {path}"))?;

    info!(
        path,
        slate = %view.source,
        props = view.props.len(),
        parlays = view.parlays.len(),
        "Slate exported"
    );
    Ok(())
}
