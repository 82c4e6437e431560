//! Mock feed for integration testing.
//!
//! Provides a deterministic `FeedSource` whose batches can be swapped
//! and which can be forced to fail, all in-memory.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Mutex;

use propedge::engine::feed::FeedSource;
use propedge::storage::FeedBatch;
use propedge::types::Prop;

pub struct MockFeed {
    batches: Mutex<Vec<FeedBatch>>,
    /// If set, every fetch returns this error.
    force_error: Mutex<Option<String>>,
    fetches: Mutex<usize>,
}

impl MockFeed {
    pub fn new(batches: Vec<FeedBatch>) -> Self {
        Self {
            batches: Mutex::new(batches),
            force_error: Mutex::new(None),
            fetches: Mutex::new(0),
        }
    }

    pub fn set_batches(&self, batches: Vec<FeedBatch>) {
        *self.batches.lock().unwrap() = batches;
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    pub fn fetches(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl FeedSource for MockFeed {
    async fn fetch(&self) -> Result<Vec<FeedBatch>> {
        *self.fetches.lock().unwrap() += 1;
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        Ok(self.batches.lock().unwrap().clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A well-formed prop with an even 6/10 history.
pub fn prop(id: &str, position: &str, team: &str, line: f64, projection: f64, odds: i32) -> Prop {
    Prop {
        id: id.to_string(),
        player: format!("Player {id}"),
        team: team.to_string(),
        position: position.to_string(),
        opponent: "vs OPP".to_string(),
        category: "Passing Yards".to_string(),
        line,
        odds,
        projection,
        hits: 6,
        samples: 10,
        popularity: None,
    }
}

pub fn batch(sport: &str, slate: &str, props: Vec<Prop>) -> FeedBatch {
    FeedBatch {
        sport: sport.to_string(),
        slate: slate.to_string(),
        props,
        parlay_popularity: Default::default(),
        replace: false,
    }
}

/// The sample NFL main slate.
pub fn nfl_main() -> Vec<Prop> {
    let mut props = vec![
        prop("mahomes", "QB", "KC", 287.5, 312.4, -110),
        prop("allen", "QB", "BUF", 2.5, 2.9, -120),
        prop("hurts", "QB", "PHI", 0.5, 0.7, 120),
        prop("jackson", "QB", "BAL", 45.5, 52.0, -110),
        prop("burrow", "QB", "CIN", 265.5, 250.0, -115),
        prop("kelce", "TE", "KC", 5.5, 6.8, -105),
        prop("pacheco", "RB", "KC", 60.5, 66.0, -110),
        prop("diggs", "WR", "BUF", 75.5, 71.2, -115),
        prop("brown", "WR", "PHI", 80.5, 88.9, -110),
        prop("henry", "RB", "BAL", 85.5, 91.7, -110),
    ];
    props[2].hits = 0;
    props[2].samples = 0;
    props[5].category = "Receptions".to_string();
    props[6].category = "Rushing Yards".to_string();
    props
}
