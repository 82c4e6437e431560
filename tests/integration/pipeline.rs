//! End-to-end pipeline properties over a realistic slate.

use std::collections::HashSet;

use propedge::storage::ProjectionStore;
use propedge::strategy::composer::{ComposerConfig, ParlayComposer, PopularityBook};
use propedge::strategy::edge::{EdgeCalculator, EdgeConfig};
use propedge::strategy::filter::FilterEngine;
use propedge::strategy::odds;
use propedge::strategy::ranker::{ParlayRanker, RankerConfig};
use propedge::strategy::{Evaluation, Pipeline, PipelineConfig};
use propedge::types::{FilterCriteria, GroupBy, LegBucket, PropRow, SlateRef, ViewRequest};

use crate::mock_feed::{batch, nfl_main, prop};

fn evaluate_with(config: PipelineConfig, popularity: PopularityBook) -> Evaluation {
    let mut store = ProjectionStore::new();
    let mut b = batch("NFL", "main", nfl_main());
    b.parlay_popularity = popularity;
    let snapshot = store.ingest(b);
    Pipeline::new(config).unwrap().evaluate(&snapshot)
}

fn evaluate() -> Evaluation {
    evaluate_with(PipelineConfig::default(), PopularityBook::new())
}

#[test]
fn edge_matches_formula_for_every_prop() {
    let eval = evaluate();
    assert_eq!(eval.props.len(), 10);
    for sp in &eval.props {
        let expected = (sp.prop.projection - sp.prop.line) / sp.prop.line * 100.0;
        assert!((sp.edge - expected).abs() < 1e-9, "{}", sp.id());
    }
    let burrow = eval.props.iter().find(|p| p.id() == "burrow").unwrap();
    assert!(burrow.edge < 0.0);
}

#[test]
fn mahomes_edge_is_8_66() {
    let calc = EdgeCalculator::new(EdgeConfig::default());
    let sp = calc
        .try_score(&prop("p", "QB", "KC", 287.5, 312.4, -110), &SlateRef::new("NFL", "main", 1))
        .unwrap();
    assert_eq!((sp.edge * 100.0).round() / 100.0, 8.66);
}

#[test]
fn parlays_respect_leg_bounds_and_are_unique() {
    let eval = evaluate();
    for group_by in GroupBy::ALL {
        let parlays = eval.parlays(*group_by);
        assert!(!parlays.is_empty());

        let mut keys = HashSet::new();
        for rp in parlays {
            let n = rp.parlay.leg_count();
            assert!((2..=4).contains(&n));
            let ids: HashSet<&str> = rp.parlay.legs.iter().map(|l| l.prop.id()).collect();
            assert_eq!(ids.len(), n, "duplicate prop inside {}", rp.parlay.id);
            assert!(keys.insert(rp.parlay.leg_key()), "duplicate leg set {}", rp.parlay.id);
        }
    }
}

#[test]
fn single_leg_odds_round_trip() {
    for american in [-500, -250, -120, -110, 100, 105, 120, 250, 900] {
        let back = odds::decimal_to_american(odds::american_to_decimal(american)).unwrap();
        assert_eq!(back, i64::from(american));
    }
}

#[test]
fn two_leg_combined_odds() {
    let decimal = odds::combine_decimal([-110, 105]);
    assert!((decimal - 3.914).abs() < 0.001);
    assert_eq!(odds::decimal_to_american(decimal), Some(291));
}

#[test]
fn five_qb_pool_with_top_four_yields_ten() {
    let calc = EdgeCalculator::new(EdgeConfig::default());
    let qbs: Vec<_> = nfl_main().into_iter().filter(|p| p.position == "QB").collect();
    assert_eq!(qbs.len(), 5);
    let (scored, diagnostics) = calc.score_all(&qbs, &SlateRef::new("NFL", "main", 1));
    assert!(diagnostics.is_empty());

    let composer = ParlayComposer::new(ComposerConfig {
        top_k: 4,
        min_leg_edge: 0.0,
    });
    let parlays = composer.compose(&scored, GroupBy::Position, 3, &PopularityBook::new());
    assert_eq!(parlays.len(), 10);

    let keys: HashSet<String> = parlays.iter().map(|p| p.leg_key()).collect();
    assert_eq!(keys.len(), 10);
    // Burrow has the smallest side edge of the five and is trimmed.
    assert!(parlays.iter().all(|p| p.legs.iter().all(|l| l.prop.id() != "burrow")));
}

#[test]
fn undefined_hit_rate_is_never_zero() {
    let eval = evaluate();
    let rows = eval.prop_rows(&ViewRequest::default());
    let hurts: &PropRow = rows.iter().find(|r| r.id == "hurts").unwrap();
    assert_eq!(hurts.hit_rate, None);
    assert_eq!(hurts.hit_rate_label(), "—");

    let json = serde_json::to_value(hurts).unwrap();
    assert!(json["hitRate"].is_null());
}

#[test]
fn ranking_is_stable_under_shuffled_input() {
    let calc = EdgeCalculator::new(EdgeConfig::default());
    let (scored, _) = calc.score_all(&nfl_main(), &SlateRef::new("NFL", "main", 1));
    let composer = ParlayComposer::new(ComposerConfig::default());
    let parlays = composer.compose(&scored, GroupBy::Team, 4, &PopularityBook::new());
    let ranker = ParlayRanker::new(RankerConfig::default());

    let ids = |v: Vec<propedge::types::RankedParlay>| v.into_iter().map(|r| r.parlay.id).collect::<Vec<_>>();
    let baseline = ids(ranker.rank(parlays.clone()));

    let mut reversed = parlays.clone();
    reversed.reverse();
    assert_eq!(ids(ranker.rank(reversed)), baseline);

    let mut rotated = parlays.clone();
    rotated.rotate_left(parlays.len() / 3);
    assert_eq!(ids(ranker.rank(rotated)), baseline);
}

#[test]
fn filtering_preserves_rank_order() {
    let eval = evaluate();
    let ranked = eval.parlays(GroupBy::Team);
    let filtered = FilterEngine::filter(ranked, FilterCriteria::new("NFL", "main").with_team("KC"));
    assert!(!filtered.is_empty());
    assert!(filtered.windows(2).all(|w| w[0].rank < w[1].rank));

    let expected: Vec<usize> = ranked
        .iter()
        .filter(|rp| rp.parlay.group.value == "KC")
        .map(|rp| rp.rank)
        .collect();
    assert_eq!(filtered.iter().map(|rp| rp.rank).collect::<Vec<_>>(), expected);
}

#[test]
fn four_plus_bucket_keeps_only_long_parlays_in_rank_order() {
    let config = PipelineConfig {
        max_legs: 5,
        ..PipelineConfig::default()
    };
    let eval = evaluate_with(config, PopularityBook::new());
    let ranked = eval.parlays(GroupBy::Position);
    let counts: HashSet<usize> = ranked.iter().map(|rp| rp.parlay.leg_count()).collect();
    assert_eq!(counts, HashSet::from([2, 3, 4, 5]));

    let out = FilterEngine::filter(ranked, FilterCriteria::default().with_legs(LegBucket::FourPlus));
    // QB group: C(5,4) + C(5,5).
    assert_eq!(out.len(), 6);
    assert!(out.iter().all(|rp| rp.parlay.leg_count() >= 4));
    assert!(out.windows(2).all(|w| w[0].rank < w[1].rank));
}

#[test]
fn ingested_popularity_reaches_parlays() {
    let mut book = PopularityBook::new();
    book.insert("allen+mahomes".to_string(), 92.0);
    let eval = evaluate_with(PipelineConfig::default(), book);

    let pair = eval
        .by_position
        .iter()
        .find(|rp| rp.parlay.leg_key() == "allen+mahomes")
        .unwrap();
    assert_eq!(pair.parlay.popularity, 92.0);
    assert_eq!(pair.parlay.id, "position:QB|allen+mahomes");
}

#[test]
fn view_requests_do_not_recompute() {
    let eval = evaluate();
    let before = eval.clone();
    let request = ViewRequest {
        criteria: FilterCriteria::new("nfl", "MAIN").with_category("passing"),
        group_by: Some(GroupBy::Team),
        ..ViewRequest::default()
    };
    let view = eval.view(&request);
    assert_eq!(eval, before);
    assert!(view.props.iter().all(|r| r.prop_category.contains("Passing")));
    assert!(view.parlays.iter().all(|r| r.group_by == GroupBy::Team));

    let other_slate = eval.view(&ViewRequest {
        criteria: FilterCriteria::new("NFL", "prime"),
        ..ViewRequest::default()
    });
    assert!(other_slate.props.is_empty());
    assert!(other_slate.parlays.is_empty());
}
