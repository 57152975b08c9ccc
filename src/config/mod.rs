use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::RankError;
use crate::rank::ScoreBounds;

/// Global configuration for trialrank
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// List fusion configuration
    pub ranking: RankingConfig,

    /// Score normalization configuration
    pub normalize: NormalizeConfig,

    /// Interactive session configuration
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RankingConfig {
    /// Items guaranteed from each source list at the head of the fused list
    pub topn: usize,

    /// Maximum length of the fused list
    pub nmax: usize,

    /// Hits kept from each raw retrieval list before fusion
    pub retrieval_depth: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            topn: 5,
            nmax: 10,
            retrieval_depth: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BoundsMode {
    /// Use the configured `min`/`max`
    Fixed,
    /// Use the minimum and maximum score of each list
    Observed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NormalizeConfig {
    pub mode: BoundsMode,

    /// Raw score mapped to 0.0 (fixed mode only)
    pub min: f64,

    /// Raw score mapped to 1.0 (fixed mode only)
    pub max: f64,
}

impl NormalizeConfig {
    pub fn bounds(&self) -> ScoreBounds {
        match self.mode {
            BoundsMode::Fixed => ScoreBounds::Fixed {
                min: self.min,
                max: self.max,
            },
            BoundsMode::Observed => ScoreBounds::Observed,
        }
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            mode: BoundsMode::Fixed,
            min: 0.0,
            max: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Run the language-model expansion query alongside the translated one
    pub expansion: bool,

    /// Per-call timeout for retrieval, translation, expansion and similarity
    pub collaborator_timeout_ms: u64,

    /// Extra attempts after a failed or timed-out collaborator call
    pub collaborator_retries: u32,

    /// Similarity matrices kept per session
    pub similarity_cache_entries: u64,
}

impl SessionConfig {
    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expansion: true,
            collaborator_timeout_ms: 30_000,
            collaborator_retries: 1,
            similarity_cache_entries: 64,
        }
    }
}

impl Config {
    /// Load configuration from `~/.trialrank/config.toml` or fall back to defaults
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load and validate configuration from a TOML file
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".trialrank").join("config.toml"))
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.ranking.topn == 0 {
            return Err(RankError::config("ranking.topn must be at least 1"));
        }
        if self.ranking.nmax == 0 {
            return Err(RankError::config("ranking.nmax must be at least 1"));
        }
        if self.ranking.retrieval_depth == 0 {
            return Err(RankError::config("ranking.retrieval_depth must be at least 1"));
        }
        self.normalize.bounds().validate()?;
        if self.session.collaborator_timeout_ms == 0 {
            return Err(RankError::config(
                "session.collaborator_timeout_ms must be at least 1",
            ));
        }
        if self.session.similarity_cache_entries == 0 {
            return Err(RankError::config(
                "session.similarity_cache_entries must be at least 1",
            ));
        }
        Ok(())
    }
}
