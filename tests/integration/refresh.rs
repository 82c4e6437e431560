//! Refresh cycle and dashboard driven by the mock feed.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

use propedge::dashboard::build_router;
use propedge::dashboard::routes::DashboardState;
use propedge::engine::board::SlateBoard;
use propedge::engine::refresher::Refresher;
use propedge::storage::{self, ProjectionStore};
use propedge::strategy::{Pipeline, PipelineConfig};

use crate::mock_feed::{batch, nfl_main, prop, MockFeed};

fn board() -> Arc<SlateBoard> {
    Arc::new(SlateBoard::new(
        Pipeline::new(PipelineConfig::default()).unwrap(),
        ProjectionStore::new(),
    ))
}

#[tokio::test]
async fn feed_failure_keeps_serving_previous_snapshot() {
    let feed = Arc::new(MockFeed::new(vec![batch("NFL", "main", nfl_main())]));
    let board = board();
    let refresher = Refresher::new(feed.clone(), Arc::clone(&board));

    let report = refresher.refresh().await.unwrap();
    assert_eq!(report.summaries.len(), 1);
    let v1 = board.evaluation("NFL", "main").await.unwrap();
    assert_eq!(v1.source.version, 1);

    feed.set_error("upstream timeout");
    assert!(refresher.refresh().await.is_err());
    let still = board.evaluation("NFL", "main").await.unwrap();
    assert!(Arc::ptr_eq(&v1, &still));

    feed.clear_error();
    feed.set_batches(vec![batch("NFL", "main", vec![prop("mahomes", "QB", "KC", 300.5, 312.4, -110)])]);
    refresher.refresh().await.unwrap();
    let v2 = board.evaluation("NFL", "main").await.unwrap();
    assert_eq!(v2.source.version, 2);
    assert_eq!(v2.props.len(), 10);
    let mahomes = v2.props.iter().find(|p| p.id() == "mahomes").unwrap();
    assert_eq!(mahomes.prop.line, 300.5);
    assert_eq!(feed.fetches(), 3);
}

#[tokio::test]
async fn slates_are_independent() {
    let feed = Arc::new(MockFeed::new(vec![
        batch("NFL", "main", nfl_main()),
        batch("NBA", "prime", vec![
            prop("jokic", "C", "DEN", 12.5, 13.9, -115),
            prop("murray", "G", "DEN", 21.5, 20.1, -110),
        ]),
    ]));
    let board = board();
    let report = Refresher::new(feed, Arc::clone(&board)).refresh().await.unwrap();
    assert_eq!(report.batches, 2);

    let nba = board.evaluation("nba", "prime").await.unwrap();
    assert_eq!(nba.props.len(), 2);
    assert!(nba.by_position.is_empty());
    assert_eq!(nba.by_team.len(), 1);
    assert!(nba.props.iter().all(|p| p.source.sport == "NBA"));
}

#[tokio::test]
async fn dashboard_serves_refreshed_slate() {
    let feed = Arc::new(MockFeed::new(vec![batch("NFL", "main", nfl_main())]));
    let board = board();
    Refresher::new(feed, Arc::clone(&board)).refresh().await.unwrap();

    let state = Arc::new(DashboardState::new(board, "NFL", "main"));
    let resp = build_router(state)
        .oneshot(
            Request::builder()
                .uri("/api/parlays?legs=4%2B&position=QB")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let parlays = json["parlays"].as_array().unwrap();
    // QB group of five at max_legs 4: C(5,4).
    assert_eq!(parlays.len(), 5);
    let ranks: Vec<u64> = parlays.iter().map(|p| p["rank"].as_u64().unwrap()).collect();
    assert!(ranks.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn saved_board_restores_versions() {
    let mut path = std::env::temp_dir();
    path.push(format!("propedge_it_store_{}.json", uuid::Uuid::new_v4()));
    let path = path.to_string_lossy().to_string();

    let feed = Arc::new(MockFeed::new(vec![batch("NFL", "main", nfl_main())]));
    let board = board();
    let refresher = Refresher::new(feed, Arc::clone(&board));
    refresher.refresh().await.unwrap();
    refresher.refresh().await.unwrap();
    board.save(Some(&path)).await.unwrap();

    let restored = storage::load_store(Some(&path)).unwrap().unwrap();
    let snap = restored.get("NFL", "main").unwrap();
    assert_eq!(snap.version, 2);
    assert_eq!(snap.props.len(), 10);

    storage::delete_store(Some(&path)).unwrap();
}
