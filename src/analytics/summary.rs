//! Slate summary statistics.
//!
//! Headline numbers for a scored slate: how many props carry a
//! high-value edge, the average edge, sharp plays, an edge histogram and
//! parlay counts per leg bucket.

use serde::Serialize;

use crate::types::{LegBucket, RankedParlay, ScoredProp, SlateRef};

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryConfig {
    /// Side edge% above which a prop counts as high value.
    pub high_value_edge: f64,
    /// Confidence above which a prop counts as a sharp play.
    pub sharp_confidence: f64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            high_value_edge: 5.0,
            sharp_confidence: 90.0,
        }
    }
}

/// Histogram bin on side edge%. `end` is exclusive; `None` is open-ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeBucket {
    pub range: String,
    pub start: f64,
    pub end: Option<f64>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LegCounts {
    pub two: usize,
    pub three: usize,
    pub four_plus: usize,
}

impl LegCounts {
    fn tally(parlays: &[RankedParlay]) -> Self {
        let mut counts = Self::default();
        for rp in parlays {
            match LegBucket::of(rp.parlay.leg_count()) {
                LegBucket::Two => counts.two += 1,
                LegBucket::Three => counts.three += 1,
                _ => counts.four_plus += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.two + self.three + self.four_plus
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlateSummary {
    pub source: SlateRef,
    pub props_analyzed: usize,
    pub props_excluded: usize,
    pub high_value: usize,
    pub sharp_plays: usize,
    /// Mean side edge%; `None` for an empty slate.
    pub average_edge: Option<f64>,
    pub edge_distribution: Vec<EdgeBucket>,
    pub parlays_by_position: LegCounts,
    pub parlays_by_team: LegCounts,
}

/// Bin edges of the distribution chart.
const EDGE_BINS: [f64; 5] = [0.0, 2.0, 4.0, 6.0, 8.0];

pub fn edge_distribution(props: &[ScoredProp]) -> Vec<EdgeBucket> {
    let mut buckets: Vec<EdgeBucket> = EDGE_BINS
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = EDGE_BINS.get(i + 1).copied();
            let range = match end {
                Some(end) => format!("{start:.0}-{end:.0}%"),
                None => format!("{start:.0}%+"),
            };
            EdgeBucket {
                range,
                start,
                end,
                count: 0,
            }
        })
        .collect();

    for sp in props {
        let edge = sp.side_edge();
        let idx = EDGE_BINS.iter().rposition(|&start| edge >= start).unwrap_or(0);
        buckets[idx].count += 1;
    }
    buckets
}

pub fn summarize(
    source: &SlateRef,
    props: &[ScoredProp],
    excluded: usize,
    by_position: &[RankedParlay],
    by_team: &[RankedParlay],
    config: &SummaryConfig,
) -> SlateSummary {
    let average_edge = if props.is_empty() {
        None
    } else {
        Some(props.iter().map(ScoredProp::side_edge).sum::<f64>() / props.len() as f64)
    };

    SlateSummary {
        source: source.clone(),
        props_analyzed: props.len(),
        props_excluded: excluded,
        high_value: props.iter().filter(|p| p.side_edge() > config.high_value_edge).count(),
        sharp_plays: props.iter().filter(|p| p.confidence > config.sharp_confidence).count(),
        average_edge,
        edge_distribution: edge_distribution(props),
        parlays_by_position: LegCounts::tally(by_position),
        parlays_by_team: LegCounts::tally(by_team),
    }
}
