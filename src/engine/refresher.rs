//! Feed refresh cycle: fetch → ingest → evaluate → publish.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use super::board::SlateBoard;
use super::feed::FeedSource;
use crate::analytics::summary::SlateSummary;

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    pub batches: usize,
    pub props_received: usize,
    /// Summary of every slate touched by this cycle, in feed order.
    pub summaries: Vec<SlateSummary>,
}

pub struct Refresher {
    feed: Arc<dyn FeedSource>,
    board: Arc<SlateBoard>,
}

impl Refresher {
    pub fn new(feed: Arc<dyn FeedSource>, board: Arc<SlateBoard>) -> Self {
        Self { feed, board }
    }

    pub fn board(&self) -> &Arc<SlateBoard> {
        &self.board
    }

    /// Run one cycle. A feed failure leaves every published snapshot as
    /// it was.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let batches = self
            .feed
            .fetch()
            .await
            .with_context(|| format!("Feed {} fetch failed", self.feed.name()))?;

        let mut report = RefreshReport {
            batches: batches.len(),
            ..RefreshReport::default()
        };

        if batches.is_empty() {
            warn!(feed = %self.feed.name(), "Feed returned no batches");
            return Ok(report);
        }

        for batch in batches {
            report.props_received += batch.props.len();
            let snapshot = self.board.ingest(batch).await;
            let Some(evaluation) = self.board.evaluation(&snapshot.sport, &snapshot.slate).await else {
                continue;
            };

            let s = &evaluation.summary;
            info!(
                slate = %s.source,
                props = s.props_analyzed,
                excluded = s.props_excluded,
                high_value = s.high_value,
                sharp = s.sharp_plays,
                avg_edge = s.average_edge.unwrap_or(0.0),
                parlays = s.parlays_by_position.total() + s.parlays_by_team.total(),
                "Slate refreshed"
            );
            report.summaries.push(evaluation.summary.clone());
        }

        info!(
            feed = %self.feed.name(),
            batches = report.batches,
            props = report.props_received,
            "Refresh cycle complete"
        );
        Ok(report)
    }
}
