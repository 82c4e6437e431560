//! Per-prop edge scoring.
//!
//! Compares the model projection to the market line and derives edge,
//! confidence, hit rate and trend. Scoring one prop never looks at any
//! other, so a whole snapshot is scored in parallel.

use rayon::prelude::*;
use tracing::debug;

use super::odds;
use crate::types::{Diagnostic, Prop, PropIssue, ScoredProp, SlateRef, Trend, LEG_KEY_SEPARATOR};

// ---------------------------------------------------------------------------
// Configuration (defaults, overridden by config.toml at runtime)
// ---------------------------------------------------------------------------

/// Weights of the confidence model.
///
/// Confidence blends an edge component (saturating in |edge|) with an
/// odds component (highest at even money). Both components live on
/// 0–100, so the weighted mean does too.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceWeights {
    pub edge_weight: f64,
    pub odds_weight: f64,
    /// |edge| at which the edge component reaches ~63% of its range.
    pub edge_scale: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            edge_weight: 0.8,
            odds_weight: 0.2,
            edge_scale: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeConfig {
    /// Edge% above which a prop trends up. Non-negative.
    pub trend_up_threshold: f64,
    /// Edge% below which a prop trends down. Non-positive.
    pub trend_down_threshold: f64,
    pub confidence: ConfidenceWeights,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            trend_up_threshold: 2.0,
            trend_down_threshold: -2.0,
            confidence: ConfidenceWeights::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

pub struct EdgeCalculator {
    config: EdgeConfig,
}

impl EdgeCalculator {
    pub fn new(config: EdgeConfig) -> Self {
        Self { config }
    }

    /// Access the edge configuration.
    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }

    /// Check a feed record for anything that would make its scores
    /// meaningless.
    pub fn validate(prop: &Prop) -> Result<(), PropIssue> {
        if prop.id.trim().is_empty() {
            return Err(PropIssue::EmptyId);
        }
        if prop.id.contains(LEG_KEY_SEPARATOR) {
            return Err(PropIssue::ReservedIdChar(prop.id.clone()));
        }
        if !prop.line.is_finite() {
            return Err(PropIssue::NonFiniteLine);
        }
        if prop.line < 0.0 {
            return Err(PropIssue::NegativeLine(prop.line));
        }
        if prop.line == 0.0 {
            return Err(PropIssue::ZeroLine);
        }
        if !prop.projection.is_finite() {
            return Err(PropIssue::NonFiniteProjection);
        }
        if prop.projection < 0.0 {
            return Err(PropIssue::NegativeProjection(prop.projection));
        }
        // Subnormal lines overflow the ratio.
        if !edge_pct(prop.line, prop.projection).is_finite() {
            return Err(PropIssue::NonFiniteEdge {
                line: prop.line,
                projection: prop.projection,
            });
        }
        if !odds::is_valid_american(prop.odds) {
            return Err(PropIssue::InvalidOdds(prop.odds));
        }
        if prop.hits > prop.samples {
            return Err(PropIssue::HitsExceedSamples {
                hits: prop.hits,
                samples: prop.samples,
            });
        }
        if let Some(pop) = prop.popularity {
            if !pop.is_finite() || !(0.0..=100.0).contains(&pop) {
                return Err(PropIssue::InvalidPopularity(pop));
            }
        }
        Ok(())
    }

    /// Score a well-formed prop. Callers must have passed it through
    /// [`EdgeCalculator::validate`]; use [`EdgeCalculator::try_score`]
    /// otherwise.
    pub fn score(&self, prop: &Prop, source: &SlateRef) -> ScoredProp {
        let edge = edge_pct(prop.line, prop.projection);
        ScoredProp {
            prop: prop.clone(),
            source: source.clone(),
            edge,
            confidence: self.confidence(edge, prop.odds),
            hit_rate: hit_rate(prop.hits, prop.samples),
            trend: self.trend(edge),
        }
    }

    /// Validate, then score.
    pub fn try_score(&self, prop: &Prop, source: &SlateRef) -> Result<ScoredProp, PropIssue> {
        Self::validate(prop)?;
        Ok(self.score(prop, source))
    }

    /// Score every prop of a snapshot. Malformed records are excluded
    /// and reported; output order follows input order.
    pub fn score_all(&self, props: &[Prop], source: &SlateRef) -> (Vec<ScoredProp>, Vec<Diagnostic>) {
        let results: Vec<Result<ScoredProp, PropIssue>> = props
            .par_iter()
            .map(|prop| self.try_score(prop, source))
            .collect();

        let mut scored = Vec::with_capacity(results.len());
        let mut diagnostics = Vec::new();
        for (prop, result) in props.iter().zip(results) {
            match result {
                Ok(sp) => scored.push(sp),
                Err(issue) => {
                    debug!(prop_id = %prop.id, issue = %issue, "Prop excluded from scoring");
                    diagnostics.push(Diagnostic::new(prop, issue));
                }
            }
        }
        (scored, diagnostics)
    }

    /// Confidence in [0, 100]. Non-decreasing in |edge| for fixed odds.
    pub fn confidence(&self, edge: f64, odds: i32) -> f64 {
        let w = &self.config.confidence;
        let total = w.edge_weight + w.odds_weight;
        if total <= 0.0 {
            return 0.0;
        }
        let edge_component = 100.0 * (1.0 - (-edge.abs() / w.edge_scale).exp());
        let odds_component = 100.0 * (1.0 - odds::distance_from_even(odds));
        ((w.edge_weight * edge_component + w.odds_weight * odds_component) / total).clamp(0.0, 100.0)
    }

    pub fn trend(&self, edge: f64) -> Trend {
        if edge > self.config.trend_up_threshold {
            Trend::Up
        } else if edge < self.config.trend_down_threshold {
            Trend::Down
        } else {
            Trend::Neutral
        }
    }
}

/// Signed edge in percent of the line. Positive favours the over.
pub fn edge_pct(line: f64, projection: f64) -> f64 {
    (projection - line) / line * 100.0
}

/// Historical hit rate in percent; `None` with no sample.
pub fn hit_rate(hits: u32, samples: u32) -> Option<f64> {
    if samples == 0 {
        None
    } else {
        Some(hits as f64 / samples as f64 * 100.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
