//! Filtering over already-ranked output.
//!
//! Pure predicate selection: AND across every active criterion, stable
//! (relative order is preserved), and never touches edge or rank fields.

use crate::types::{FilterCriteria, Parlay, RankedParlay, ScoredProp, SlateRef};

/// Anything the filter engine can select on.
pub trait Filterable {
    fn source(&self) -> &SlateRef;
    fn matches_position(&self, position: &str) -> bool;
    fn matches_team(&self, team: &str) -> bool;
    fn matches_category(&self, needle: &str) -> bool;
    /// `None` for items that have no legs (single props).
    fn parlay_legs(&self) -> Option<usize>;
}

impl Filterable for ScoredProp {
    fn source(&self) -> &SlateRef {
        &self.source
    }

    fn matches_position(&self, position: &str) -> bool {
        self.prop.position.eq_ignore_ascii_case(position)
    }

    fn matches_team(&self, team: &str) -> bool {
        self.prop.team.eq_ignore_ascii_case(team)
    }

    fn matches_category(&self, needle: &str) -> bool {
        self.prop.category.to_lowercase().contains(&needle.to_lowercase())
    }

    fn parlay_legs(&self) -> Option<usize> {
        None
    }
}

/// A parlay matches a dimension only when every leg does.
impl Filterable for Parlay {
    fn source(&self) -> &SlateRef {
        &self.source
    }

    fn matches_position(&self, position: &str) -> bool {
        self.legs.iter().all(|l| l.prop.matches_position(position))
    }

    fn matches_team(&self, team: &str) -> bool {
        self.legs.iter().all(|l| l.prop.matches_team(team))
    }

    fn matches_category(&self, needle: &str) -> bool {
        self.legs.iter().all(|l| l.prop.matches_category(needle))
    }

    fn parlay_legs(&self) -> Option<usize> {
        Some(self.legs.len())
    }
}

impl Filterable for RankedParlay {
    fn source(&self) -> &SlateRef {
        &self.parlay.source
    }

    fn matches_position(&self, position: &str) -> bool {
        self.parlay.matches_position(position)
    }

    fn matches_team(&self, team: &str) -> bool {
        self.parlay.matches_team(team)
    }

    fn matches_category(&self, needle: &str) -> bool {
        self.parlay.matches_category(needle)
    }

    fn parlay_legs(&self) -> Option<usize> {
        self.parlay.parlay_legs()
    }
}

pub struct FilterEngine;

impl FilterEngine {
    /// Whether one item passes every active criterion.
    pub fn matches<T: Filterable>(item: &T, criteria: &FilterCriteria) -> bool {
        if let Some(sport) = active(&criteria.sport) {
            if !item.source().sport.eq_ignore_ascii_case(sport) {
                return false;
            }
        }
        if let Some(slate) = active(&criteria.slate) {
            if !item.source().slate.eq_ignore_ascii_case(slate) {
                return false;
            }
        }
        if let Some(position) = active(&criteria.position) {
            if !item.matches_position(position) {
                return false;
            }
        }
        if let Some(team) = active(&criteria.team) {
            if !item.matches_team(team) {
                return false;
            }
        }
        if let Some(category) = active(&criteria.category) {
            if !item.matches_category(category) {
                return false;
            }
        }
        match item.parlay_legs() {
            Some(legs) => criteria.legs.matches(legs),
            None => true,
        }
    }

    /// Stable subset of `items` passing `criteria`.
    pub fn filter<T: Filterable + Clone>(items: &[T], criteria: FilterCriteria) -> Vec<T> {
        items
            .iter()
            .filter(|item| Self::matches(*item, &criteria))
            .cloned()
            .collect()
    }
}

/// A criterion is active unless unset, blank or "all".
fn active(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
