//! Dashboard: Axum web server for the slate view.
//!
//! Serves a read-only REST API and a self-contained HTML page.
//! CORS enabled for local development.

pub mod routes;

use axum::{
    http::{header, Method},
    response::Html,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use routes::AppState;

/// The embedded dashboard HTML (compiled into the binary).
const DASHBOARD_HTML: &str = include_str!("templates/index.html");

/// Start the dashboard web server.
///
/// Spawns a background task and returns immediately. Bind and serve
/// failures are logged; the refresh loop keeps running without it.
pub fn spawn_dashboard(state: AppState, port: u16) {
    let app = build_router(state);

    tokio::spawn(async move {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        info!(port, "Dashboard server starting on http://localhost:{port}");

        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(port, error = %e, "Failed to bind dashboard port");
                return;
            }
        };

        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Dashboard server error");
        }
    });
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // API routes
        .route("/api/slates", get(routes::get_slates))
        .route("/api/props", get(routes::get_props))
        .route("/api/parlays", get(routes::get_parlays))
        .route("/api/summary", get(routes::get_summary))
        .route("/api/diagnostics", get(routes::get_diagnostics))
        .route("/api/refreshes", get(routes::get_refreshes))
        .route("/health", get(routes::health))
        // Dashboard HTML
        .route("/", get(serve_dashboard))
        .layer(cors)
        .with_state(state)
}

/// Serve the embedded HTML dashboard.
async fn serve_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::board::SlateBoard;
    use crate::storage::{FeedBatch, ProjectionStore};
    use crate::strategy::{Pipeline, PipelineConfig};
    use crate::types::Prop;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use routes::DashboardState;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_state() -> AppState {
        let board = SlateBoard::new(Pipeline::new(PipelineConfig::default()).unwrap(), ProjectionStore::new());
        let mut bad = Prop::sample("bad", "QB", "KC", 0.0, 10.0);
        bad.player = "Broken Feed".into();
        let mut no_history = Prop::sample("hurts", "QB", "PHI", 1.5, 1.8);
        no_history.hits = 0;
        no_history.samples = 0;
        board
            .ingest(FeedBatch {
                sport: "NFL".into(),
                slate: "main".into(),
                props: vec![
                    Prop::sample("mahomes", "QB", "KC", 287.5, 312.4),
                    Prop::sample("allen", "QB", "BUF", 2.5, 2.9),
                    no_history,
                    Prop::sample("kelce", "TE", "KC", 5.5, 6.8),
                    Prop::sample("pacheco", "RB", "KC", 60.5, 66.0),
                    bad,
                ],
                parlay_popularity: Default::default(),
                replace: false,
            })
            .await;
        Arc::new(DashboardState::new(Arc::new(board), "NFL", "main"))
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let app = build_router(test_state().await);
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = build_router(test_state().await);
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_slates_endpoint() {
        let (status, json) = get_json("/api/slates").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[0]["sport"], "NFL");
        assert_eq!(json[0]["version"], 1);
    }

    #[tokio::test]
    async fn test_props_default_slate() {
        let (status, json) = get_json("/api/props").await;
        assert_eq!(status, StatusCode::OK);
        let props = json["props"].as_array().unwrap();
        assert_eq!(props.len(), 5);
        assert_eq!(json["source"]["sport"], "NFL");
        let hurts = props.iter().find(|p| p["id"] == "hurts").unwrap();
        assert!(hurts["hitRate"].is_null());
        assert_eq!(hurts["propCategory"], "Passing Yards");
    }

    #[tokio::test]
    async fn test_props_filtered_by_team() {
        let (status, json) = get_json("/api/props?team=kc&sort=confidence").await;
        assert_eq!(status, StatusCode::OK);
        let props = json["props"].as_array().unwrap();
        assert_eq!(props.len(), 3);
        assert!(props.iter().all(|p| p["team"] == "KC"));
    }

    #[tokio::test]
    async fn test_parlays_by_team_and_legs() {
        let (status, json) = get_json("/api/parlays?group=team&legs=3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["group_by"], "team");
        let parlays = json["parlays"].as_array().unwrap();
        assert_eq!(parlays.len(), 1);
        assert_eq!(parlays[0]["legCount"], 3);
        assert_eq!(parlays[0]["groupKey"], "KC");
    }

    #[tokio::test]
    async fn test_parlays_bad_params() {
        let (status, json) = get_json("/api/parlays?legs=seven").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("seven"));

        let (status, _) = get_json("/api/parlays?group=league").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_slate_is_not_found() {
        let (status, _) = get_json("/api/summary?sport=NBA&slate=prime").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_summary_and_diagnostics() {
        let (status, json) = get_json("/api/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["props_analyzed"], 5);
        assert_eq!(json["props_excluded"], 1);
        assert_eq!(json["edge_distribution"].as_array().unwrap().len(), 5);

        let (status, json) = get_json("/api/diagnostics?sport=nfl&slate=MAIN").await;
        assert_eq!(status, StatusCode::OK);
        let diags = json["diagnostics"].as_array().unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0]["prop_id"], "bad");
    }

    #[tokio::test]
    async fn test_dashboard_html() {
        let app = build_router(test_state().await);
        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("PROPEDGE"));
        assert!(html.contains("Dashboard"));
    }
}
