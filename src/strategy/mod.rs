//! Strategy engine: edge scoring, parlay composition, ranking, filtering.

pub mod composer;
pub mod edge;
pub mod filter;
pub mod odds;
pub mod ranker;

use serde::Serialize;
use tracing::{info, warn};

use crate::analytics::summary::{self, SlateSummary, SummaryConfig};
use crate::config::ConfigError;
use crate::storage::Snapshot;
use crate::types::{
    Diagnostic, FilterCriteria, GroupBy, ParlayRow, PropRow, PropSort, RankedParlay, ScoredProp, SlateRef, ViewRequest,
};
use composer::{ComposerConfig, ParlayComposer};
use edge::{EdgeCalculator, EdgeConfig};
use filter::FilterEngine;
use ranker::{ParlayRanker, RankerConfig};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Every tunable the pipeline consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub max_legs: usize,
    pub edge: EdgeConfig,
    pub composer: ComposerConfig,
    pub ranker: RankerConfig,
    pub summary: SummaryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_legs: 4,
            edge: EdgeConfig::default(),
            composer: ComposerConfig::default(),
            ranker: RankerConfig::default(),
            summary: SummaryConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_legs < 2 {
            return Err(ConfigError::MaxLegs(self.max_legs as i64));
        }
        if self.composer.top_k < 2 {
            return Err(ConfigError::TopK(self.composer.top_k as i64));
        }
        if !self.composer.min_leg_edge.is_finite() || self.composer.min_leg_edge < 0.0 {
            return Err(ConfigError::MinLegEdge(self.composer.min_leg_edge));
        }

        let up = self.edge.trend_up_threshold;
        if !up.is_finite() || up < 0.0 {
            return Err(ConfigError::TrendThreshold { name: "up", value: up });
        }
        let down = self.edge.trend_down_threshold;
        if !down.is_finite() || down > 0.0 {
            return Err(ConfigError::TrendThreshold { name: "down", value: down });
        }

        let c = &self.edge.confidence;
        check_weights("confidence", &[("confidence.edge_weight", c.edge_weight), ("confidence.odds_weight", c.odds_weight)])?;
        check_scale("confidence.edge_scale", c.edge_scale)?;

        let r = &self.ranker;
        check_weights(
            "ranking",
            &[("ranking.edge_weight", r.edge_weight), ("ranking.popularity_weight", r.popularity_weight)],
        )?;
        check_scale("ranking.edge_ceiling", r.edge_ceiling)?;

        let s = &self.summary;
        for (name, value) in [
            ("summary.high_value_edge", s.high_value_edge),
            ("summary.sharp_confidence", s.sharp_confidence),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Weight { name, value });
            }
        }
        Ok(())
    }
}

fn check_weights(group: &'static str, weights: &[(&'static str, f64)]) -> Result<(), ConfigError> {
    for &(name, value) in weights {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::Weight { name, value });
        }
    }
    if weights.iter().all(|&(_, v)| v == 0.0) {
        return Err(ConfigError::ZeroWeights(group));
    }
    Ok(())
}

fn check_scale(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::Scale { name, value });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Everything computed from one snapshot. Immutable; filtering reads it
/// without recomputing anything.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub source: SlateRef,
    /// Scored props, highest side edge first.
    pub props: Vec<ScoredProp>,
    pub by_position: Vec<RankedParlay>,
    pub by_team: Vec<RankedParlay>,
    /// Records excluded from scoring.
    pub diagnostics: Vec<Diagnostic>,
    pub summary: SlateSummary,
}

impl Evaluation {
    pub fn parlays(&self, group_by: GroupBy) -> &[RankedParlay] {
        match group_by {
            GroupBy::Position => &self.by_position,
            GroupBy::Team => &self.by_team,
        }
    }

    /// Filtered single-prop rows in the requested order.
    pub fn prop_rows(&self, request: &ViewRequest) -> Vec<PropRow> {
        let ordered = ranker::order_props(self.props.clone(), request.sort);
        FilterEngine::filter(&ordered, request.criteria.clone())
            .iter()
            .map(PropRow::from)
            .collect()
    }

    /// Filtered parlay rows in rank order.
    pub fn parlay_rows(&self, group_by: GroupBy, criteria: &FilterCriteria) -> Vec<ParlayRow> {
        self.parlays(group_by)
            .iter()
            .filter(|rp| FilterEngine::matches(*rp, criteria))
            .map(ParlayRow::from)
            .collect()
    }

    /// Presenter view for a request. Grouping defaults to position.
    pub fn view(&self, request: &ViewRequest) -> SlateView {
        let group_by = request.group_by.unwrap_or(GroupBy::Position);
        SlateView {
            source: self.source.clone(),
            group_by,
            props: self.prop_rows(request),
            parlays: self.parlay_rows(group_by, &request.criteria),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

/// The two read-only collections handed to the presenter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlateView {
    pub source: SlateRef,
    pub group_by: GroupBy,
    pub props: Vec<PropRow>,
    pub parlays: Vec<ParlayRow>,
    pub diagnostics: Vec<Diagnostic>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Snapshot → scored props → composed parlays → ranked parlays.
///
/// Stateless across calls: the same snapshot always yields the same
/// evaluation, so callers may cache per snapshot version and run
/// independent slates concurrently.
pub struct Pipeline {
    config: PipelineConfig,
    edge: EdgeCalculator,
    composer: ParlayComposer,
    ranker: ParlayRanker,
}

impl Pipeline {
    /// Build a pipeline, rejecting invalid configuration up front.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            edge: EdgeCalculator::new(config.edge.clone()),
            composer: ParlayComposer::new(config.composer.clone()),
            ranker: ParlayRanker::new(config.ranker.clone()),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Score, compose and rank one snapshot.
    pub fn evaluate(&self, snapshot: &Snapshot) -> Evaluation {
        let source = snapshot.source();

        // Per-prop scoring (parallel)
        let (scored, diagnostics) = self.edge.score_all(&snapshot.props, &source);
        for diag in &diagnostics {
            warn!(slate = %source, prop_id = %diag.prop_id, reason = %diag.message, "Prop excluded");
        }
        let props = ranker::order_props(scored, PropSort::Edge);

        // Composition and ranking for both grouping modes
        let compose_and_rank = |group_by: GroupBy| {
            let parlays = self.composer.compose(&props, group_by, self.config.max_legs, &snapshot.parlay_popularity);
            self.ranker.rank(parlays)
        };
        let (by_position, by_team) =
            rayon::join(|| compose_and_rank(GroupBy::Position), || compose_and_rank(GroupBy::Team));

        let summary = summary::summarize(
            &source,
            &props,
            diagnostics.len(),
            &by_position,
            &by_team,
            &self.config.summary,
        );

        info!(
            slate = %source,
            props_in = snapshot.props.len(),
            scored = props.len(),
            excluded = diagnostics.len(),
            by_position = by_position.len(),
            by_team = by_team.len(),
            "Pipeline run complete"
        );

        Evaluation {
            source,
            props,
            by_position,
            by_team,
            diagnostics,
            summary,
        }
    }

    /// Full pure run: snapshot + request → presenter view.
    pub fn run(&self, snapshot: &Snapshot, request: &ViewRequest) -> SlateView {
        self.evaluate(snapshot).view(request)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
