use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, StringerError};
use crate::types::ClusterStrategy;

/// Top-level configuration for the Stringer system.
///
/// Loaded from `~/.stringer/config.toml` by default. Each section corresponds
/// to a bounded context or cross-cutting concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StringerConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
}

impl StringerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed. An unknown
    /// strategy name fails here, at parse time, not mid-run.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: StringerConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| StringerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding model name.
    pub model: String,
    /// Embedding dimension. Items whose vector length differs are excluded
    /// from clustering.
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
        }
    }
}

/// Clustering configuration.
///
/// The top-level fields are the generic values; each strategy section may
/// override any of them, with the generic value as fallback. Read once per
/// run and passed into `cluster(...)` explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Strategy used to build raw groups. Unset means connected_components.
    pub strategy: ClusterStrategy,
    /// Minimum cosine similarity for two items to be considered related.
    /// Must be in (0, 1].
    pub similarity_threshold: f64,
    /// Groups smaller than this are discarded (members resurface as
    /// singletons). Must be >= 1.
    pub min_cluster_size: usize,
    /// Groups are truncated to this many members, oldest dropped first.
    /// Must be >= min_cluster_size.
    pub max_cluster_size: usize,
    /// How many neighbors to request from the similarity oracle per item.
    /// Must be >= 1.
    pub candidate_limit: usize,
    /// Timeout for one index-backed similarity call. A timeout counts as a
    /// capability failure and triggers brute-force fallback for the run.
    pub search_timeout_ms: u64,
    /// Per-strategy overrides.
    pub connected_components: StrategyOverrides,
    pub greedy_average: StrategyOverrides,
    pub greedy_min: StrategyOverrides,
    pub mutual_k: StrategyOverrides,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            strategy: ClusterStrategy::default(),
            similarity_threshold: 0.68,
            min_cluster_size: 1,
            max_cluster_size: 20,
            candidate_limit: 10,
            search_timeout_ms: 5_000,
            connected_components: StrategyOverrides::default(),
            greedy_average: StrategyOverrides::default(),
            greedy_min: StrategyOverrides::default(),
            mutual_k: StrategyOverrides::default(),
        }
    }
}

impl ClusterConfig {
    /// Resolve the effective parameters for `strategy`, applying its override
    /// section on top of the generic values.
    pub fn params_for(&self, strategy: ClusterStrategy) -> StrategyParams {
        let overrides = match strategy {
            ClusterStrategy::ConnectedComponents => &self.connected_components,
            ClusterStrategy::GreedyAverage => &self.greedy_average,
            ClusterStrategy::GreedyMin => &self.greedy_min,
            ClusterStrategy::MutualK => &self.mutual_k,
        };
        StrategyParams {
            similarity_threshold: overrides
                .similarity_threshold
                .unwrap_or(self.similarity_threshold),
            min_cluster_size: overrides.min_cluster_size.unwrap_or(self.min_cluster_size),
            max_cluster_size: overrides.max_cluster_size.unwrap_or(self.max_cluster_size),
            candidate_limit: overrides.candidate_limit.unwrap_or(self.candidate_limit),
        }
    }

    /// Validate the generic values and every per-strategy resolved parameter
    /// set. Called before a run touches any item.
    pub fn validate(&self) -> Result<()> {
        let base = StrategyParams {
            similarity_threshold: self.similarity_threshold,
            min_cluster_size: self.min_cluster_size,
            max_cluster_size: self.max_cluster_size,
            candidate_limit: self.candidate_limit,
        };
        validate_params(&base, "cluster")?;
        for strategy in ClusterStrategy::ALL {
            validate_params(&self.params_for(strategy), strategy.as_str())?;
        }
        Ok(())
    }
}

/// Overrides for a single strategy. Every field is optional; an absent field
/// falls back to the generic `[cluster]` value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyOverrides {
    pub similarity_threshold: Option<f64>,
    pub min_cluster_size: Option<usize>,
    pub max_cluster_size: Option<usize>,
    pub candidate_limit: Option<usize>,
}

/// Effective parameters for one clustering run, after override resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyParams {
    pub similarity_threshold: f64,
    pub min_cluster_size: usize,
    pub max_cluster_size: usize,
    pub candidate_limit: usize,
}

fn validate_params(params: &StrategyParams, section: &str) -> Result<()> {
    if !(params.similarity_threshold > 0.0 && params.similarity_threshold <= 1.0) {
        return Err(StringerError::Config(format!(
            "[{}] similarity_threshold must be in (0, 1], got {}",
            section, params.similarity_threshold
        )));
    }
    if params.min_cluster_size < 1 {
        return Err(StringerError::Config(format!(
            "[{}] min_cluster_size must be >= 1, got {}",
            section, params.min_cluster_size
        )));
    }
    if params.max_cluster_size < params.min_cluster_size {
        return Err(StringerError::Config(format!(
            "[{}] max_cluster_size ({}) must be >= min_cluster_size ({})",
            section, params.max_cluster_size, params.min_cluster_size
        )));
    }
    if params.candidate_limit < 1 {
        return Err(StringerError::Config(format!(
            "[{}] candidate_limit must be >= 1, got {}",
            section, params.candidate_limit
        )));
    }
    Ok(())
}
