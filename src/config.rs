//! YAML configuration file support for foodmatch.
//!
//! One file describes the normalizer, the matcher and the in-memory
//! nutrition stores the engine federates over, so a deployment can be
//! reconfigured without recompiling.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "usda + off"
//!
//! normalizer:
//!   stem: true
//!   brand_keywords: ["kraft", "general mills"]
//!
//! matcher:
//!   min_score_threshold: 20.0
//!   primary_source: usda
//!   source_priority: [usda, off]
//!   backend_timeout_ms: 2000
//!
//! backends:
//!   - name: usda
//!     path: data/usda.json
//!   - name: off
//!     path: data/off.json
//!     latency_ms: 40
//!     retry:
//!       max_retries: 2
//!       base_delay_ms: 50
//! ```
//!
//! Relative backend paths are resolved against the directory of the
//! configuration file when it is loaded with [`FoodMatchConfig::from_file`].

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use canonical::NormalizeConfig;
use index::{BackendAdapter, InMemoryBackend, RetryConfig, RetryingBackend, StoreError};
use matcher::{MatchConfig, MatchError, SearchEngine};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Errors that can occur when loading a configuration file or building an
/// engine from it.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("failed to load backend `{name}`: {source}")]
    Backend {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Match(#[from] MatchError),
}

/// Top-level YAML configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct FoodMatchConfig {
    /// Configuration format version.
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Normalizer settings; replace `matcher.normalizer` when the engine is built.
    #[serde(default)]
    pub normalizer: NormalizeConfig,

    #[serde(default)]
    pub matcher: MatchConfig,

    /// In-memory stores, in registration order. The first one is the
    /// primary database unless `matcher.primary_source` says otherwise.
    #[serde(default)]
    pub backends: Vec<BackendYamlConfig>,

    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// One in-memory store loaded from a JSON array of food records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendYamlConfig {
    /// Source id attached to every record of the store.
    pub name: String,

    pub path: PathBuf,

    /// Simulated response latency.
    #[serde(default)]
    pub latency_ms: Option<u64>,

    /// Wrap the store in a retrying decorator.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl FoodMatchConfig {
    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse a YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: FoodMatchConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.normalizer
            .validate()
            .map_err(|err| ConfigLoadError::Validation(err.to_string()))?;
        self.effective_match_config().validate()?;

        let mut names = HashSet::new();
        for backend in &self.backends {
            backend.validate()?;
            if !names.insert(backend.name.as_str()) {
                return Err(ConfigLoadError::Validation(format!(
                    "backend `{}` is listed twice",
                    backend.name
                )));
            }
        }
        if let Some(primary) = &self.matcher.primary_source {
            if !names.contains(primary.as_str()) {
                return Err(ConfigLoadError::Validation(format!(
                    "matcher.primary_source `{primary}` is not a configured backend"
                )));
            }
        }
        Ok(())
    }

    /// Matcher configuration with the top-level normalizer applied.
    pub fn effective_match_config(&self) -> MatchConfig {
        let mut config = self.matcher.clone();
        config.normalizer = self.normalizer.clone();
        config
    }

    /// Directory relative backend paths are resolved against.
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Load every backend store and build a [`SearchEngine`] over them.
    pub fn build_engine(&self) -> Result<SearchEngine, ConfigLoadError> {
        if self.backends.is_empty() {
            return Err(ConfigLoadError::Validation(
                "at least one backend must be configured".into(),
            ));
        }
        let mut adapters: Vec<Arc<dyn BackendAdapter>> = Vec::with_capacity(self.backends.len());
        for backend in &self.backends {
            let path = self.resolve(&backend.path);
            let mut store = InMemoryBackend::from_json_file(backend.name.as_str(), &path)
                .map_err(|source| ConfigLoadError::Backend {
                    name: backend.name.clone(),
                    source,
                })?;
            if let Some(ms) = backend.latency_ms {
                store = store.with_latency(Duration::from_millis(ms));
            }
            info!(
                backend = %backend.name,
                path = %path.display(),
                records = store.len(),
                retry = backend.retry.is_some(),
                "backend_loaded"
            );
            match backend.retry {
                Some(retry) => adapters.push(Arc::new(RetryingBackend::new(store, retry))),
                None => adapters.push(Arc::new(store)),
            }
        }
        Ok(SearchEngine::new(adapters, self.effective_match_config())?)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl Default for FoodMatchConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            normalizer: NormalizeConfig::default(),
            matcher: MatchConfig::default(),
            backends: Vec::new(),
            base_dir: None,
        }
    }
}

impl BackendYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.name.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "backend name must not be empty".into(),
            ));
        }
        if self.path.as_os_str().is_empty() {
            return Err(ConfigLoadError::Validation(format!(
                "backend `{}` has no path",
                self.name
            )));
        }
        if let Some(retry) = &self.retry {
            if retry.max_delay < retry.base_delay {
                return Err(ConfigLoadError::Validation(format!(
                    "backend `{}`: retry max_delay must be >= base_delay",
                    self.name
                )));
            }
        }
        Ok(())
    }
}
