//! Shared slate board.
//!
//! Owns the projection store and a per-slate evaluation cache. An
//! evaluation is computed at most once per snapshot version; every
//! filtered view after that reads the cached result.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::storage::{self, FeedBatch, ProjectionStore, SlateKey, Snapshot};
use crate::strategy::{Evaluation, Pipeline};

/// One known slate as listed by the presenter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlateInfo {
    pub sport: String,
    pub slate: String,
    pub version: u64,
    pub as_of: DateTime<Utc>,
    pub props: usize,
}

impl From<&Snapshot> for SlateInfo {
    fn from(s: &Snapshot) -> Self {
        Self {
            sport: s.sport.clone(),
            slate: s.slate.clone(),
            version: s.version,
            as_of: s.as_of,
            props: s.props.len(),
        }
    }
}

pub struct SlateBoard {
    pipeline: Arc<Pipeline>,
    store: RwLock<ProjectionStore>,
    cache: RwLock<HashMap<SlateKey, Arc<Evaluation>>>,
}

impl SlateBoard {
    pub fn new(pipeline: Pipeline, store: ProjectionStore) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            store: RwLock::new(store),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Publish a feed batch as a new snapshot.
    pub async fn ingest(&self, batch: FeedBatch) -> Arc<Snapshot> {
        self.store.write().await.ingest(batch)
    }

    pub async fn snapshot(&self, sport: &str, slate: &str) -> Option<Arc<Snapshot>> {
        self.store.read().await.get(sport, slate)
    }

    pub async fn slates(&self) -> Vec<SlateInfo> {
        self.store
            .read()
            .await
            .snapshots()
            .map(|s| SlateInfo::from(s.as_ref()))
            .collect()
    }

    /// Evaluation of the current snapshot for a slate, computed on first
    /// request per version. `None` when the slate is unknown.
    ///
    /// The pipeline is CPU-bound and runs on the blocking pool, off the
    /// async workers serving HTTP.
    pub async fn evaluation(&self, sport: &str, slate: &str) -> Option<Arc<Evaluation>> {
        let snapshot = self.snapshot(sport, slate).await?;
        let key = snapshot.key();

        if let Some(cached) = self.cache.read().await.get(&key) {
            if cached.source.version == snapshot.version {
                return Some(Arc::clone(cached));
            }
        }

        let pipeline = Arc::clone(&self.pipeline);
        let input = Arc::clone(&snapshot);
        let evaluation = match tokio::task::spawn_blocking(move || pipeline.evaluate(&input)).await {
            Ok(evaluation) => Arc::new(evaluation),
            Err(e) => {
                error!(slate = %key, error = %e, "Evaluation task failed");
                return None;
            }
        };
        let mut cache = self.cache.write().await;
        match cache.get(&key) {
            // A concurrent request may already have cached a newer version.
            Some(existing) if existing.source.version > snapshot.version => {}
            _ => {
                debug!(slate = %key, version = snapshot.version, "Evaluation cached");
                cache.insert(key, Arc::clone(&evaluation));
            }
        }
        Some(evaluation)
    }

    /// Persist every current snapshot.
    pub async fn save(&self, path: Option<&str>) -> Result<()> {
        let store = self.store.read().await;
        storage::save_store(&store, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::PipelineConfig;
    use crate::types::Prop;

    fn board() -> SlateBoard {
        SlateBoard::new(Pipeline::new(PipelineConfig::default()).unwrap(), ProjectionStore::new())
    }

    fn batch(props: Vec<Prop>) -> FeedBatch {
        FeedBatch {
            sport: "NFL".into(),
            slate: "main".into(),
            props,
            parlay_popularity: Default::default(),
            replace: false,
        }
    }

    #[tokio::test]
    async fn test_unknown_slate_has_no_evaluation() {
        assert!(board().evaluation("NBA", "prime").await.is_none());
    }

    #[tokio::test]
    async fn test_evaluation_cached_per_version() {
        let board = board();
        board
            .ingest(batch(vec![
                Prop::sample("a", "QB", "KC", 287.5, 312.4),
                Prop::sample("b", "QB", "BUF", 245.5, 262.8),
            ]))
            .await;

        let first = board.evaluation("nfl", "MAIN").await.unwrap();
        let again = board.evaluation("NFL", "main").await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(first.source.version, 1);

        board.ingest(batch(vec![Prop::sample("c", "QB", "PHI", 1.5, 1.9)])).await;
        let next = board.evaluation("NFL", "main").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &next));
        assert_eq!(next.source.version, 2);
        assert_eq!(next.props.len(), 3);
        // The earlier evaluation still reflects its own snapshot.
        assert_eq!(first.props.len(), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_evaluation_on_single_worker_runtime() {
        let board = Arc::new(board());
        board
            .ingest(batch(
                (0..12)
                    .map(|i| Prop::sample(&format!("p{i}"), "QB", &format!("T{}", i % 3), 200.0, 205.0 + i as f64))
                    .collect(),
            ))
            .await;

        let (a, b, c) = tokio::join!(
            board.evaluation("NFL", "main"),
            board.evaluation("NFL", "main"),
            board.evaluation("NFL", "main"),
        );
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
        assert_eq!(a.props.len(), 12);
        assert_eq!(*a, *b);
        assert_eq!(*b, *c);

        // Later requests hit the cache.
        let cached = board.evaluation("NFL", "main").await.unwrap();
        assert_eq!(cached.source.version, 1);
        assert!(!cached.by_position.is_empty());
    }

    #[tokio::test]
    async fn test_slates_lists_snapshots() {
        let board = board();
        board.ingest(batch(vec![Prop::sample("a", "QB", "KC", 1.5, 2.0)])).await;
        let slates = board.slates().await;
        assert_eq!(slates.len(), 1);
        assert_eq!(slates[0].sport, "NFL");
        assert_eq!(slates[0].props, 1);
    }
}
