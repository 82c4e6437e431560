//! Projection feed boundary.
//!
//! The engine never fetches odds or projections itself: a `FeedSource`
//! hands it already-materialised batches, one per (sport, slate). The
//! file-backed source reads a JSON document that holds either a single
//! batch or an array of them.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

use crate::storage::FeedBatch;

/// Supplier of feed batches.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch every batch currently available.
    async fn fetch(&self) -> Result<Vec<FeedBatch>>;

    /// Source name for logging.
    fn name(&self) -> &str;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedDocument {
    Many(Vec<FeedBatch>),
    One(FeedBatch),
}

impl From<FeedDocument> for Vec<FeedBatch> {
    fn from(doc: FeedDocument) -> Self {
        match doc {
            FeedDocument::Many(batches) => batches,
            FeedDocument::One(batch) => vec![batch],
        }
    }
}

/// Parse a feed document.
pub fn parse_feed(json: &str) -> Result<Vec<FeedBatch>> {
    let doc: FeedDocument = serde_json::from_str(json).context("Feed document is neither a batch nor a list of batches")?;
    Ok(doc.into())
}

/// Feed read from a JSON file on every fetch.
pub struct FileFeed {
    path: PathBuf,
    name: String,
}

impl FileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("file:{}", path.display());
        Self { path, name }
    }
}

#[async_trait]
impl FeedSource for FileFeed {
    async fn fetch(&self) -> Result<Vec<FeedBatch>> {
        let json = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read feed file {}", self.path.display()))?;
        let batches = parse_feed(&json).with_context(|| format!("Failed to parse feed file {}", self.path.display()))?;
        debug!(feed = %self.name, batches = batches.len(), "Feed file read");
        Ok(batches)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
