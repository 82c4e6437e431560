//! Parlay ranking and single-prop ordering.
//!
//! Ranking score is a weighted mean of normalised combined edge and the
//! ingested popularity signal. Ties fall through combined edge,
//! popularity, leg count and finally id, so the order is total and the
//! same input in any order always ranks identically.

use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

use crate::types::{Parlay, PropSort, RankedParlay, ScoredProp, SlateRef};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RankerConfig {
    pub edge_weight: f64,
    pub popularity_weight: f64,
    /// Combined edge% that normalises to 100. Anything above is capped.
    pub edge_ceiling: f64,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            edge_weight: 0.6,
            popularity_weight: 0.4,
            edge_ceiling: 20.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Ranker
// ---------------------------------------------------------------------------

pub struct ParlayRanker {
    config: RankerConfig,
}

impl ParlayRanker {
    pub fn new(config: RankerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Ranking score in [0, 100].
    pub fn score(&self, parlay: &Parlay) -> f64 {
        let total = self.config.edge_weight + self.config.popularity_weight;
        if total <= 0.0 {
            return 0.0;
        }
        let edge_norm = (parlay.combined_edge / self.config.edge_ceiling * 100.0).clamp(0.0, 100.0);
        let pop_norm = parlay.popularity.clamp(0.0, 100.0);
        (self.config.edge_weight * edge_norm + self.config.popularity_weight * pop_norm) / total
    }

    /// Order parlays best-first and drop repeated leg sets, keeping the
    /// better-ranked copy. Ranks are 1-based and contiguous.
    pub fn rank(&self, parlays: Vec<Parlay>) -> Vec<RankedParlay> {
        let mut scored: Vec<(f64, Parlay)> = parlays.into_iter().map(|p| (self.score(&p), p)).collect();
        scored.sort_by(|(sa, a), (sb, b)| compare_ranked(*sa, a, *sb, b));

        let mut seen: HashSet<(SlateRef, Vec<String>)> = HashSet::new();
        let mut ranked = Vec::with_capacity(scored.len());
        for (score, parlay) in scored {
            if !seen.insert((parlay.source.clone(), parlay.leg_ids())) {
                debug!(parlay_id = %parlay.id, "Duplicate leg set dropped during ranking");
                continue;
            }
            ranked.push(RankedParlay {
                rank: ranked.len() + 1,
                score,
                parlay,
            });
        }
        ranked
    }
}

/// Total order: score, combined edge, popularity (all descending), then
/// leg count and id (ascending).
fn compare_ranked(score_a: f64, a: &Parlay, score_b: f64, b: &Parlay) -> Ordering {
    score_b
        .total_cmp(&score_a)
        .then_with(|| b.combined_edge.total_cmp(&a.combined_edge))
        .then_with(|| b.popularity.total_cmp(&a.popularity))
        .then_with(|| a.leg_count().cmp(&b.leg_count()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Order single props for display. Descending on the chosen metric;
/// props without a hit rate sort after every prop that has one; ties by
/// id.
pub fn order_props(mut props: Vec<ScoredProp>, sort: PropSort) -> Vec<ScoredProp> {
    props.sort_by(|a, b| {
        let primary = match sort {
            PropSort::Edge => b.side_edge().total_cmp(&a.side_edge()),
            PropSort::Confidence => b.confidence.total_cmp(&a.confidence),
            PropSort::HitRate => match (a.hit_rate, b.hit_rate) {
                (Some(x), Some(y)) => y.total_cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        primary
            .then_with(|| b.side_edge().total_cmp(&a.side_edge()))
            .then_with(|| a.id().cmp(b.id()))
    });
    props
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
