//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The `[engine]` table is converted into a validated
//! [`PipelineConfig`]; anything out of range fails here, at startup,
//! with a [`ConfigError`] rather than surfacing as odd output later.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::analytics::summary::SummaryConfig;
use crate::strategy::composer::ComposerConfig;
use crate::strategy::edge::{ConfidenceWeights, EdgeConfig};
use crate::strategy::ranker::RankerConfig;
use crate::strategy::PipelineConfig;

/// Environment variable that overrides the config file path.
pub const CONFIG_PATH_ENV: &str = "PROPEDGE_CONFIG";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub feed: FeedConfig,
    pub engine: EngineConfig,
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub name: String,
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    /// JSON file holding one feed batch or an array of batches.
    pub path: String,
}

/// Raw engine parameters as written in the file. Counts are signed so
/// that a negative value reaches validation instead of failing parsing.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    pub max_legs: i64,
    pub top_k: i64,
    #[serde(default)]
    pub min_leg_edge: f64,
    #[serde(default)]
    pub trend: TrendConfig,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub summary: SummarySection,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrendConfig {
    pub up_threshold: f64,
    pub down_threshold: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        let d = EdgeConfig::default();
        Self {
            up_threshold: d.trend_up_threshold,
            down_threshold: d.trend_down_threshold,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfidenceConfig {
    pub edge_weight: f64,
    pub odds_weight: f64,
    pub edge_scale: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        let d = ConfidenceWeights::default();
        Self {
            edge_weight: d.edge_weight,
            odds_weight: d.odds_weight,
            edge_scale: d.edge_scale,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RankingConfig {
    pub edge_weight: f64,
    pub popularity_weight: f64,
    pub edge_ceiling: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        let d = RankerConfig::default();
        Self {
            edge_weight: d.edge_weight,
            popularity_weight: d.popularity_weight,
            edge_ceiling: d.edge_ceiling,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummarySection {
    pub high_value_edge: f64,
    pub sharp_confidence: f64,
}

impl Default for SummarySection {
    fn default() -> Self {
        let d = SummaryConfig::default();
        Self {
            high_value_edge: d.high_value_edge,
            sharp_confidence: d.sharp_confidence,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
    #[serde(default = "default_sport")]
    pub default_sport: String,
    #[serde(default = "default_slate")]
    pub default_slate: String,
}

fn default_sport() -> String {
    "NFL".to_string()
}

fn default_slate() -> String {
    "main".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// Where snapshots are persisted between runs. Unset disables it.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OutputConfig {
    /// Where the default view is exported after each refresh.
    pub export_path: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Invalid engine configuration. Programmer/operator error: never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_legs must be at least 2, got {0}")]
    MaxLegs(i64),

    #[error("top_k must be at least 2, got {0}")]
    TopK(i64),

    #[error("trend {name} threshold has the wrong sign or is not finite: {value}")]
    TrendThreshold { name: &'static str, value: f64 },

    #[error("{name} must be finite and non-negative, got {value}")]
    Weight { name: &'static str, value: f64 },

    #[error("{0} weights must not all be zero")]
    ZeroWeights(&'static str),

    #[error("{name} must be finite and positive, got {value}")]
    Scale { name: &'static str, value: f64 },

    #[error("min_leg_edge must be finite and non-negative, got {0}")]
    MinLegEdge(f64),
}

impl TryFrom<&EngineConfig> for PipelineConfig {
    type Error = ConfigError;

    fn try_from(raw: &EngineConfig) -> Result<Self, Self::Error> {
        let max_legs = usize::try_from(raw.max_legs).map_err(|_| ConfigError::MaxLegs(raw.max_legs))?;
        let top_k = usize::try_from(raw.top_k).map_err(|_| ConfigError::TopK(raw.top_k))?;

        let config = PipelineConfig {
            max_legs,
            edge: EdgeConfig {
                trend_up_threshold: raw.trend.up_threshold,
                trend_down_threshold: raw.trend.down_threshold,
                confidence: ConfidenceWeights {
                    edge_weight: raw.confidence.edge_weight,
                    odds_weight: raw.confidence.odds_weight,
                    edge_scale: raw.confidence.edge_scale,
                },
            },
            composer: ComposerConfig {
                top_k,
                min_leg_edge: raw.min_leg_edge,
            },
            ranker: RankerConfig {
                edge_weight: raw.ranking.edge_weight,
                popularity_weight: raw.ranking.popularity_weight,
                edge_ceiling: raw.ranking.edge_ceiling,
            },
            summary: SummaryConfig {
                high_value_edge: raw.summary.high_value_edge,
                sharp_confidence: raw.summary.sharp_confidence,
            },
        };
        config.validate()?;
        Ok(config)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Path from `PROPEDGE_CONFIG`, else `config.toml`.
    pub fn default_path() -> String {
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string())
    }

    /// Validated pipeline parameters.
    pub fn pipeline(&self) -> Result<PipelineConfig, ConfigError> {
        PipelineConfig::try_from(&self.engine)
    }
}
