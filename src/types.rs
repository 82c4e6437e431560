//! Shared types for the PROPEDGE engine.
//!
//! These types form the data model used across all modules.
//! Feed records (`Prop`) come in, computed records (`ScoredProp`,
//! `Parlay`) flow through the strategy pipeline, and the row types at
//! the bottom are the read-only contract handed to the presenter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Prop
// ---------------------------------------------------------------------------

/// A single bettable player proposition, as delivered by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prop {
    /// Stable id, unique within a slate.
    pub id: String,
    pub player: String,
    /// Team code, e.g. "KC".
    pub team: String,
    /// Roster position, e.g. "QB". Used for position grouping.
    pub position: String,
    /// Opponent descriptor: "@LAC" (away) or "vs MIA" (home).
    pub opponent: String,
    /// Prop category, e.g. "Passing Yards".
    pub category: String,
    /// Market line.
    pub line: f64,
    /// Market odds in signed American format.
    pub odds: i32,
    /// Model projection.
    pub projection: f64,
    /// Rolling historical successes.
    #[serde(default)]
    pub hits: u32,
    /// Rolling historical sample size.
    #[serde(default)]
    pub samples: u32,
    /// Exogenous popularity signal (0–100), if the feed carries one.
    #[serde(default)]
    pub popularity: Option<f64>,
}

impl Prop {
    /// Home/away derived from the opponent descriptor.
    pub fn venue(&self) -> Venue {
        if self.opponent.trim_start().starts_with('@') {
            Venue::Away
        } else {
            Venue::Home
        }
    }

    /// Helper to build a test/sample prop with sensible defaults.
    #[cfg(test)]
    pub fn sample(id: &str, position: &str, team: &str, line: f64, projection: f64) -> Self {
        Prop {
            id: id.to_string(),
            player: format!("Player {id}"),
            team: team.to_string(),
            position: position.to_string(),
            opponent: "@OPP".to_string(),
            category: "Passing Yards".to_string(),
            line,
            odds: -110,
            projection,
            hits: 6,
            samples: 10,
            popularity: None,
        }
    }
}

impl fmt::Display for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({} {}) {} {} line {} proj {} ({:+})",
            self.id,
            self.player,
            self.team,
            self.position,
            self.opponent,
            self.category,
            self.line,
            self.projection,
            self.odds,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Home,
    Away,
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Coarse directional classification of a prop's edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Up => write!(f, "Hot"),
            Trend::Down => write!(f, "Cold"),
            Trend::Neutral => write!(f, "Neutral"),
        }
    }
}

/// Bet side on a prop line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Over,
    Under,
}

impl Side {
    /// The side a signed edge favours. A flat edge defaults to the over.
    pub fn for_edge(edge: f64) -> Self {
        if edge >= 0.0 {
            Side::Over
        } else {
            Side::Under
        }
    }

    /// Single-letter prefix used in leg labels ("O287.5").
    pub fn short(&self) -> &'static str {
        match self {
            Side::Over => "O",
            Side::Under => "U",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Over => write!(f, "OVER"),
            Side::Under => write!(f, "UNDER"),
        }
    }
}

/// Grouping dimension for parlay composition. Exactly one is used per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Position,
    Team,
}

impl GroupBy {
    pub const ALL: &'static [GroupBy] = &[GroupBy::Position, GroupBy::Team];

    /// The grouping value of a prop under this dimension.
    pub fn key_of<'a>(&self, prop: &'a Prop) -> &'a str {
        match self {
            GroupBy::Position => &prop.position,
            GroupBy::Team => &prop.team,
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupBy::Position => write!(f, "position"),
            GroupBy::Team => write!(f, "team"),
        }
    }
}

impl std::str::FromStr for GroupBy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "position" | "pos" => Ok(GroupBy::Position),
            "team" => Ok(GroupBy::Team),
            _ => Err(anyhow::anyhow!("Unknown grouping: {s}")),
        }
    }
}

/// The group a parlay was composed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub by: GroupBy,
    pub value: String,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.by, self.value)
    }
}

/// Leg-count bucket offered by the parlay filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LegBucket {
    #[default]
    All,
    Two,
    Three,
    FourPlus,
}

impl LegBucket {
    pub fn matches(&self, legs: usize) -> bool {
        match self {
            LegBucket::All => true,
            LegBucket::Two => legs == 2,
            LegBucket::Three => legs == 3,
            LegBucket::FourPlus => legs >= 4,
        }
    }

    /// The bucket a given leg count falls in (never `All`).
    pub fn of(legs: usize) -> Self {
        match legs {
            0..=2 => LegBucket::Two,
            3 => LegBucket::Three,
            _ => LegBucket::FourPlus,
        }
    }
}

impl fmt::Display for LegBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegBucket::All => write!(f, "all"),
            LegBucket::Two => write!(f, "2"),
            LegBucket::Three => write!(f, "3"),
            LegBucket::FourPlus => write!(f, "4+"),
        }
    }
}

impl std::str::FromStr for LegBucket {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(LegBucket::All),
            "2" => Ok(LegBucket::Two),
            "3" => Ok(LegBucket::Three),
            "4" | "4+" => Ok(LegBucket::FourPlus),
            _ => Err(anyhow::anyhow!("Unknown leg-count bucket: {s}")),
        }
    }
}

/// Ordering applied to single-prop rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PropSort {
    #[default]
    Edge,
    Confidence,
    HitRate,
}

impl std::str::FromStr for PropSort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "edge" | "high" => Ok(PropSort::Edge),
            "confidence" => Ok(PropSort::Confidence),
            "hitrate" | "hit_rate" => Ok(PropSort::HitRate),
            _ => Err(anyhow::anyhow!("Unknown prop sort: {s}")),
        }
    }
}

/// Which snapshot a computed record was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlateRef {
    pub sport: String,
    pub slate: String,
    pub version: u64,
}

impl SlateRef {
    pub fn new(sport: &str, slate: &str, version: u64) -> Self {
        Self {
            sport: sport.to_string(),
            slate: slate.to_string(),
            version,
        }
    }
}

impl fmt::Display for SlateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} v{}", self.sport, self.slate, self.version)
    }
}

// ---------------------------------------------------------------------------
// Scored prop / parlay
// ---------------------------------------------------------------------------

/// A prop augmented with computed fields. Never outlives its snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredProp {
    pub prop: Prop,
    pub source: SlateRef,
    /// Signed edge in percent: positive favours the over.
    pub edge: f64,
    /// Bounded confidence score, 0–100.
    pub confidence: f64,
    /// Historical hit rate in percent; `None` when there is no sample.
    pub hit_rate: Option<f64>,
    pub trend: Trend,
}

impl ScoredProp {
    pub fn id(&self) -> &str {
        &self.prop.id
    }

    /// The side this prop's edge favours.
    pub fn side(&self) -> Side {
        Side::for_edge(self.edge)
    }

    /// Edge in favour of the favoured side (always non-negative).
    pub fn side_edge(&self) -> f64 {
        self.edge.abs()
    }
}

/// One prop-and-side pair inside a parlay.
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub prop: Arc<ScoredProp>,
    pub side: Side,
}

impl Leg {
    pub fn new(prop: Arc<ScoredProp>) -> Self {
        let side = prop.side();
        Self { prop, side }
    }

    /// Edge of this leg on its chosen side.
    pub fn edge(&self) -> f64 {
        match self.side {
            Side::Over => self.prop.edge,
            Side::Under => -self.prop.edge,
        }
    }

    /// Human label, e.g. "Patrick Mahomes O287.5 Passing Yards".
    pub fn label(&self) -> String {
        format!(
            "{} {}{} {}",
            self.prop.prop.player,
            self.side.short(),
            self.prop.prop.line,
            self.prop.prop.category
        )
    }
}

/// An immutable multi-leg parlay. Derived fields are fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Parlay {
    /// Deterministic id: group key plus the canonical leg key.
    pub id: String,
    pub group: GroupKey,
    pub source: SlateRef,
    /// Legs sorted by prop id.
    pub legs: Vec<Leg>,
    /// Product of leg decimal odds.
    pub decimal_odds: f64,
    /// Combined odds in signed American format. Long-shot parlays
    /// overflow `i32`.
    pub combined_odds: i64,
    /// Mean of per-leg side edges.
    pub combined_edge: f64,
    /// Exogenous popularity, 0–100.
    pub popularity: f64,
}

impl Parlay {
    pub fn leg_count(&self) -> usize {
        self.legs.len()
    }

    /// Canonical leg-set key: sorted prop ids joined by `+`.
    pub fn leg_key(&self) -> String {
        canonical_leg_key(self.legs.iter().map(|l| l.prop.id()))
    }

    /// Sorted prop ids of the legs. Identifies the leg set exactly,
    /// whatever characters the ids contain.
    pub fn leg_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.legs.iter().map(|l| l.prop.id().to_string()).collect();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Display for Parlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let legs: Vec<String> = self.legs.iter().map(Leg::label).collect();
        write!(
            f,
            "[{}] {} legs {:+} edge {:.1}% pop {:.0}: {}",
            self.group,
            self.leg_count(),
            self.combined_odds,
            self.combined_edge,
            self.popularity,
            legs.join(" | "),
        )
    }
}

/// Separator of the canonical leg key. Prop ids may not contain it.
pub const LEG_KEY_SEPARATOR: char = '+';

/// Join prop ids into the canonical (sorted, `+`-separated) leg key.
pub fn canonical_leg_key<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
    let mut ids: Vec<&str> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.join(&LEG_KEY_SEPARATOR.to_string())
}

/// A parlay with its position in the ranked output.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedParlay {
    /// 1-based rank.
    pub rank: usize,
    /// Weighted ranking score, 0–100.
    pub score: f64,
    pub parlay: Parlay,
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Caller-owned filter value object. `None`, `""` and `"all"` impose no
/// constraint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub sport: Option<String>,
    pub slate: Option<String>,
    pub position: Option<String>,
    pub team: Option<String>,
    #[serde(default)]
    pub legs: LegBucket,
    pub category: Option<String>,
}

impl FilterCriteria {
    pub fn new(sport: &str, slate: &str) -> Self {
        Self {
            sport: Some(sport.to_string()),
            slate: Some(slate.to_string()),
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: &str) -> Self {
        self.position = Some(position.to_string());
        self
    }

    pub fn with_team(mut self, team: &str) -> Self {
        self.team = Some(team.to_string());
        self
    }

    pub fn with_legs(mut self, legs: LegBucket) -> Self {
        self.legs = legs;
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }
}

/// A full presenter request: filters plus the view-level choices.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewRequest {
    pub criteria: FilterCriteria,
    pub group_by: Option<GroupBy>,
    pub sort: PropSort,
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Why a feed record was excluded from scoring.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropIssue {
    #[error("empty prop id")]
    EmptyId,

    #[error("prop id {0:?} contains the leg-key separator '+'")]
    ReservedIdChar(String),

    #[error("line is not a finite number")]
    NonFiniteLine,

    #[error("line is negative: {0}")]
    NegativeLine(f64),

    #[error("line is zero, edge is undefined")]
    ZeroLine,

    #[error("projection is not a finite number")]
    NonFiniteProjection,

    #[error("projection is negative: {0}")]
    NegativeProjection(f64),

    #[error("edge overflows for line {line} and projection {projection}")]
    NonFiniteEdge { line: f64, projection: f64 },

    #[error("invalid American odds: {0}")]
    InvalidOdds(i32),

    #[error("hit count {hits} exceeds sample size {samples}")]
    HitsExceedSamples { hits: u32, samples: u32 },

    #[error("popularity out of range: {0}")]
    InvalidPopularity(f64),
}

/// A record excluded from a pipeline run, returned alongside results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub prop_id: String,
    pub player: String,
    pub issue: PropIssue,
    pub message: String,
}

impl Diagnostic {
    pub fn new(prop: &Prop, issue: PropIssue) -> Self {
        Self {
            prop_id: prop.id.clone(),
            player: prop.player.clone(),
            message: issue.to_string(),
            issue,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "prop {} ({}): {}", self.prop_id, self.player, self.message)
    }
}

// ---------------------------------------------------------------------------
// Presenter rows
// ---------------------------------------------------------------------------

/// Round to two decimals for display rows.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Read-only single-prop row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropRow {
    pub id: String,
    pub player: String,
    pub team: String,
    pub position: String,
    pub opponent: String,
    pub venue: Venue,
    pub prop_category: String,
    pub line: f64,
    pub odds: i32,
    pub projection: f64,
    pub side: Side,
    pub edge: f64,
    pub confidence: f64,
    /// `null` when the sample size is zero. Never coerced to 0.
    pub hit_rate: Option<f64>,
    pub trend: Trend,
}

impl PropRow {
    /// Hit rate as shown to users: "—" when undefined.
    pub fn hit_rate_label(&self) -> String {
        match self.hit_rate {
            Some(rate) => format!("{rate:.0}%"),
            None => "—".to_string(),
        }
    }
}

impl From<&ScoredProp> for PropRow {
    fn from(sp: &ScoredProp) -> Self {
        Self {
            id: sp.prop.id.clone(),
            player: sp.prop.player.clone(),
            team: sp.prop.team.clone(),
            position: sp.prop.position.clone(),
            opponent: sp.prop.opponent.clone(),
            venue: sp.prop.venue(),
            prop_category: sp.prop.category.clone(),
            line: sp.prop.line,
            odds: sp.prop.odds,
            projection: sp.prop.projection,
            side: sp.side(),
            edge: round2(sp.edge),
            confidence: round2(sp.confidence),
            hit_rate: sp.hit_rate.map(round2),
            trend: sp.trend,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegRow {
    pub prop_id: String,
    pub side: Side,
    pub label: String,
}

/// Read-only parlay row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParlayRow {
    pub id: String,
    pub rank: usize,
    pub group_by: GroupBy,
    pub group_key: String,
    pub legs: Vec<LegRow>,
    pub combined_odds: i64,
    pub combined_edge: f64,
    pub popularity: f64,
    pub leg_count: usize,
    pub score: f64,
}

impl From<&RankedParlay> for ParlayRow {
    fn from(rp: &RankedParlay) -> Self {
        let parlay = &rp.parlay;
        Self {
            id: parlay.id.clone(),
            rank: rp.rank,
            group_by: parlay.group.by,
            group_key: parlay.group.value.clone(),
            legs: parlay
                .legs
                .iter()
                .map(|leg| LegRow {
                    prop_id: leg.prop.id().to_string(),
                    side: leg.side,
                    label: leg.label(),
                })
                .collect(),
            combined_odds: parlay.combined_odds,
            combined_edge: round2(parlay.combined_edge),
            popularity: round2(parlay.popularity),
            leg_count: parlay.leg_count(),
            score: round2(rp.score),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
