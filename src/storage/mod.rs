//! Projection store and persistence layer.
//!
//! Holds one immutable, versioned snapshot per (sport, slate). A feed
//! update never mutates a published snapshot: it builds a new one in
//! which the updated prop ids are superseded, and swaps the `Arc`.
//! Snapshots can be saved to and restored from a JSON file so a restart
//! does not start from an empty slate.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::strategy::composer::PopularityBook;
use crate::types::{Prop, SlateRef};

/// Default store file path.
const DEFAULT_STORE_FILE: &str = "propedge_store.json";

// ---------------------------------------------------------------------------
// Keys and snapshots
// ---------------------------------------------------------------------------

/// Normalised (sport, slate) key. Sport is upper-cased, slate lower-cased;
/// both are otherwise opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlateKey {
    pub sport: String,
    pub slate: String,
}

impl SlateKey {
    pub fn new(sport: &str, slate: &str) -> Self {
        Self {
            sport: sport.trim().to_uppercase(),
            slate: slate.trim().to_lowercase(),
        }
    }
}

impl fmt::Display for SlateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.sport, self.slate)
    }
}

/// An immutable view of one slate's market lines and projections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub sport: String,
    pub slate: String,
    pub version: u64,
    pub as_of: DateTime<Utc>,
    pub props: Vec<Prop>,
    /// Ingested parlay popularity keyed by canonical leg key.
    #[serde(default)]
    pub parlay_popularity: PopularityBook,
}

impl Snapshot {
    pub fn key(&self) -> SlateKey {
        SlateKey::new(&self.sport, &self.slate)
    }

    pub fn source(&self) -> SlateRef {
        SlateRef::new(&self.sport, &self.slate, self.version)
    }
}

/// One delivery from the feed for a single slate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedBatch {
    pub sport: String,
    pub slate: String,
    pub props: Vec<Prop>,
    #[serde(default)]
    pub parlay_popularity: PopularityBook,
    /// Replace the slate's prop set wholesale instead of merging by id.
    #[serde(default)]
    pub replace: bool,
}

impl FeedBatch {
    pub fn key(&self) -> SlateKey {
        SlateKey::new(&self.sport, &self.slate)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ProjectionStore {
    snapshots: BTreeMap<SlateKey, Arc<Snapshot>>,
}

impl ProjectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot for a slate.
    pub fn get(&self, sport: &str, slate: &str) -> Option<Arc<Snapshot>> {
        self.snapshots.get(&SlateKey::new(sport, slate)).cloned()
    }

    /// All current snapshots in key order.
    pub fn snapshots(&self) -> impl Iterator<Item = &Arc<Snapshot>> {
        self.snapshots.values()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Publish a new snapshot built from `batch` and return it.
    ///
    /// Props whose id already exists are superseded in place; new ids are
    /// appended. Inside one batch the last record for an id wins. The
    /// version always increments, even for an identical batch.
    pub fn ingest(&mut self, batch: FeedBatch) -> Arc<Snapshot> {
        let key = batch.key();
        let incoming = dedupe_by_id(batch.props, &key);
        let previous = self.snapshots.get(&key);

        let (props, parlay_popularity, version) = match previous {
            Some(prev) if !batch.replace => {
                let mut props = prev.props.clone();
                let index: HashMap<String, usize> =
                    props.iter().enumerate().map(|(i, p)| (p.id.clone(), i)).collect();
                let mut superseded = 0usize;
                for prop in incoming {
                    match index.get(&prop.id) {
                        Some(&i) => {
                            props[i] = prop;
                            superseded += 1;
                        }
                        None => props.push(prop),
                    }
                }
                debug!(slate = %key, superseded, "Merged feed batch into snapshot");
                let mut popularity = prev.parlay_popularity.clone();
                popularity.extend(batch.parlay_popularity);
                (props, popularity, prev.version + 1)
            }
            Some(prev) => (incoming, batch.parlay_popularity, prev.version + 1),
            None => (incoming, batch.parlay_popularity, 1),
        };

        let snapshot = Arc::new(Snapshot {
            sport: key.sport.clone(),
            slate: key.slate.clone(),
            version,
            as_of: Utc::now(),
            props,
            parlay_popularity,
        });
        info!(
            slate = %key,
            version,
            props = snapshot.props.len(),
            "Snapshot published"
        );
        self.snapshots.insert(key, Arc::clone(&snapshot));
        snapshot
    }

    /// Put back a previously saved snapshot as-is (version included).
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.snapshots.insert(snapshot.key(), Arc::new(snapshot));
    }
}

/// Last record per id wins; first-seen position is kept.
fn dedupe_by_id(props: Vec<Prop>, key: &SlateKey) -> Vec<Prop> {
    let mut out: Vec<Prop> = Vec::with_capacity(props.len());
    let mut index: HashMap<String, usize> = HashMap::new();
    for prop in props {
        match index.get(&prop.id) {
            Some(&i) => {
                warn!(slate = %key, prop_id = %prop.id, "Duplicate prop id in feed batch, last record wins");
                out[i] = prop;
            }
            None => {
                index.insert(prop.id.clone(), out.len());
                out.push(prop);
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Save every snapshot in the store to a JSON file.
pub fn save_store(store: &ProjectionStore, path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_STORE_FILE);
    let snapshots: Vec<&Snapshot> = store.snapshots().map(|s| s.as_ref()).collect();
    let json = serde_json::to_string_pretty(&snapshots).context("Failed to serialise snapshots")?;

    std::fs::write(path, &json).context(format!("Failed to write store to {path}"))?;

    debug!(path, snapshots = snapshots.len(), "Store saved");
    Ok(())
}

/// Load a store from a JSON file.
/// Returns None if the file doesn't exist (fresh start).
pub fn load_store(path: Option<&str>) -> Result<Option<ProjectionStore>> {
    let path = path.unwrap_or(DEFAULT_STORE_FILE);

    if !Path::new(path).exists() {
        info!(path, "No saved store found, starting fresh");
        return Ok(None);
    }

    let json = std::fs::read_to_string(path).context(format!("Failed to read store from {path}"))?;
    let snapshots: Vec<Snapshot> =
        serde_json::from_str(&json).context(format!("Failed to parse store from {path}"))?;

    let mut store = ProjectionStore::new();
    for snapshot in snapshots {
        store.restore(snapshot);
    }

    info!(path, snapshots = store.len(), "Store loaded from disk");
    Ok(Some(store))
}

/// Delete the store file (for testing or reset).
pub fn delete_store(path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_STORE_FILE);
    if Path::new(path).exists() {
        std::fs::remove_file(path).context(format!("Failed to delete store file {path}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
