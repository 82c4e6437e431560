//! Parlay composition.
//!
//! Groups scored props by a single dimension (position or team) and
//! enumerates every 2..=max_legs combination inside each group. Groups
//! above `top_k` props are trimmed to their top-K by side edge first,
//! which bounds the work at sum(C(K, n)) per group.

use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use super::odds;
use crate::types::{canonical_leg_key, GroupBy, GroupKey, Leg, Parlay, ScoredProp, SlateRef};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ComposerConfig {
    /// Per-group candidate cap. Larger groups keep only their top-K by edge.
    pub top_k: usize,
    /// Props whose side edge falls below this never become legs.
    pub min_leg_edge: f64,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            top_k: 8,
            min_leg_edge: 0.0,
        }
    }
}

/// Ingested popularity by canonical leg key.
pub type PopularityBook = BTreeMap<String, f64>;

// ---------------------------------------------------------------------------
// Composer
// ---------------------------------------------------------------------------

pub struct ParlayComposer {
    config: ComposerConfig,
}

impl ParlayComposer {
    pub fn new(config: ComposerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Enumerate candidate parlays of 2..=`max_legs` legs, each drawn
    /// from a single group. No two returned parlays share a leg set.
    ///
    /// Output is grouped by (source, group value) in key order; the
    /// ranker imposes the final order.
    pub fn compose(
        &self,
        pool: &[ScoredProp],
        group_by: GroupBy,
        max_legs: usize,
        popularity: &PopularityBook,
    ) -> Vec<Parlay> {
        if max_legs < 2 {
            return Vec::new();
        }

        let groups = self.group(pool, group_by);
        let group_count = groups.len();

        let per_group: Vec<Vec<Parlay>> = groups
            .into_par_iter()
            .map(|((source, value), members)| {
                let key = GroupKey { by: group_by, value };
                let candidates = self.select_candidates(&key, members);
                compose_group(&key, &source, &candidates, max_legs, popularity)
            })
            .collect();

        let mut seen: HashSet<(SlateRef, Vec<String>)> = HashSet::new();
        let mut parlays = Vec::new();
        for parlay in per_group.into_iter().flatten() {
            if seen.insert((parlay.source.clone(), parlay.leg_ids())) {
                parlays.push(parlay);
            }
        }

        info!(
            group_by = %group_by,
            groups = group_count,
            pool = pool.len(),
            parlays = parlays.len(),
            "Parlay composition complete"
        );
        parlays
    }

    /// Bucket the pool by (source, group value). Duplicate prop ids keep
    /// their first occurrence; props below the leg-edge floor or without
    /// a group value are left out.
    fn group(
        &self,
        pool: &[ScoredProp],
        group_by: GroupBy,
    ) -> BTreeMap<(SlateRef, String), Vec<Arc<ScoredProp>>> {
        let mut groups: BTreeMap<(SlateRef, String), Vec<Arc<ScoredProp>>> = BTreeMap::new();
        let mut seen: HashSet<(&SlateRef, &str)> = HashSet::new();

        for sp in pool {
            if !seen.insert((&sp.source, sp.id())) {
                debug!(prop_id = %sp.id(), "Duplicate prop id in pool, keeping first");
                continue;
            }
            if sp.side_edge() < self.config.min_leg_edge {
                continue;
            }
            let value = group_by.key_of(&sp.prop).trim();
            if value.is_empty() {
                debug!(prop_id = %sp.id(), group_by = %group_by, "Prop has no group value");
                continue;
            }
            groups
                .entry((sp.source.clone(), value.to_string()))
                .or_default()
                .push(Arc::new(sp.clone()));
        }
        groups
    }

    /// Apply the top-K cap, then put the survivors in canonical (id) order.
    fn select_candidates(&self, key: &GroupKey, mut members: Vec<Arc<ScoredProp>>) -> Vec<Arc<ScoredProp>> {
        if members.len() > self.config.top_k {
            members.sort_by(|a, b| {
                b.side_edge()
                    .total_cmp(&a.side_edge())
                    .then_with(|| a.id().cmp(b.id()))
            });
            debug!(
                group = %key,
                pool = members.len(),
                top_k = self.config.top_k,
                "Group trimmed to top-K by edge"
            );
            members.truncate(self.config.top_k);
        }
        members.sort_by(|a, b| a.id().cmp(b.id()));
        members
    }
}

/// All 2..=max_legs combinations of one group's candidates.
fn compose_group(
    key: &GroupKey,
    source: &SlateRef,
    candidates: &[Arc<ScoredProp>],
    max_legs: usize,
    popularity: &PopularityBook,
) -> Vec<Parlay> {
    let upper = max_legs.min(candidates.len());
    let mut parlays = Vec::new();
    for size in 2..=upper {
        for combo in Combinations::new(candidates.len(), size) {
            let legs: Vec<Leg> = combo.iter().map(|&i| Leg::new(Arc::clone(&candidates[i]))).collect();
            match build_parlay(key, source, legs, popularity) {
                Some(parlay) => parlays.push(parlay),
                None => debug!(group = %key, legs = size, "Combined price has no American form, parlay skipped"),
            }
        }
    }
    parlays
}

/// Price and label a leg set. Legs must already be in id order.
pub fn build_parlay(
    key: &GroupKey,
    source: &SlateRef,
    legs: Vec<Leg>,
    popularity: &PopularityBook,
) -> Option<Parlay> {
    if legs.len() < 2 {
        return None;
    }
    let leg_key = canonical_leg_key(legs.iter().map(|l| l.prop.id()));
    let decimal_odds = odds::combine_decimal(legs.iter().map(|l| l.prop.prop.odds));
    let combined_odds = odds::decimal_to_american(decimal_odds)?;
    let combined_edge = legs.iter().map(Leg::edge).sum::<f64>() / legs.len() as f64;
    let popularity = parlay_popularity(&leg_key, &legs, popularity);

    Some(Parlay {
        id: format!("{key}|{leg_key}"),
        group: key.clone(),
        source: source.clone(),
        legs,
        decimal_odds,
        combined_odds,
        combined_edge,
        popularity,
    })
}

/// Ingested parlay popularity, else the mean of the legs' own signals.
fn parlay_popularity(leg_key: &str, legs: &[Leg], book: &PopularityBook) -> f64 {
    if let Some(&pop) = book.get(leg_key) {
        return pop.clamp(0.0, 100.0);
    }
    let known: Vec<f64> = legs.iter().filter_map(|l| l.prop.prop.popularity).collect();
    if known.is_empty() {
        0.0
    } else {
        (known.iter().sum::<f64>() / known.len() as f64).clamp(0.0, 100.0)
    }
}

// ---------------------------------------------------------------------------
// k-combinations
// ---------------------------------------------------------------------------

/// Lexicographic k-combinations of `0..n`.
struct Combinations {
    n: usize,
    indices: Vec<usize>,
    done: bool,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            indices: (0..k).collect(),
            done: k == 0 || k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let current = self.indices.clone();

        let k = self.indices.len();
        let mut i = k;
        loop {
            if i == 0 {
                self.done = true;
                break;
            }
            i -= 1;
            if self.indices[i] != i + self.n - k {
                self.indices[i] += 1;
                for j in i + 1..k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                break;
            }
        }
        Some(current)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
