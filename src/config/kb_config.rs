//! Knowledge Base Configuration - operator-tunable TOML values
//!
//! Each struct implements `Default`, so a missing file (or a partial one)
//! always yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::validation;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "PLC_KB_CONFIG";

/// Environment variable overriding `source.dir`.
pub const KB_DIR_ENV: &str = "PLC_KB_DIR";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "plc_kb.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a knowledge base deployment.
///
/// Load with `KbConfig::load()` which searches:
/// 1. `$PLC_KB_CONFIG` env var
/// 2. `./plc_kb.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbConfig {
    /// Where source documents live
    #[serde(default)]
    pub source: SourceConfig,

    /// Document grammar strictness
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Heading keyword → category rules, checked in order
    #[serde(default = "default_category_rules")]
    pub categories: Vec<CategoryRule>,

    /// Query limits
    #[serde(default)]
    pub query: QueryConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Source directory watcher
    #[serde(default)]
    pub watcher: WatcherConfig,
}

impl Default for KbConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            loader: LoaderConfig::default(),
            categories: default_category_rules(),
            query: QueryConfig::default(),
            server: ServerConfig::default(),
            watcher: WatcherConfig::default(),
        }
    }
}

impl KbConfig {
    /// Load configuration using the standard search order, then apply the
    /// `PLC_KB_DIR` override.
    pub fn load() -> Self {
        let mut config = Self::load_without_env_override();
        config.apply_env_overrides();
        config
    }

    /// Apply `PLC_KB_DIR` on top of a config from any source.
    pub fn apply_env_overrides(&mut self) {
        self.override_source_dir(std::env::var(KB_DIR_ENV).ok());
    }

    fn override_source_dir(&mut self, dir: Option<String>) {
        if let Some(dir) = dir.filter(|d| !d.trim().is_empty()) {
            info!(dir = %dir, "Knowledge base directory overridden by {}", KB_DIR_ENV);
            self.source.dir = PathBuf::from(dir);
        }
    }

    fn load_without_env_override() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", CONFIG_ENV);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV);
            }
        }

        // 2. Check ./plc_kb.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        // 3. Defaults
        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys only produce warnings.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all settings, collecting every problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.source.extensions.is_empty() {
            errors.push("source.extensions: at least one extension is required".to_string());
        }
        for ext in &self.source.extensions {
            if ext.trim().is_empty() || ext.starts_with('.') {
                errors.push(format!(
                    "source.extensions: '{ext}' must be a bare extension like \"md\""
                ));
            }
        }

        for (i, rule) in self.categories.iter().enumerate() {
            if rule.keyword.trim().is_empty() {
                errors.push(format!("categories[{i}].keyword must not be empty"));
            }
            if rule.category.trim().is_empty() {
                errors.push(format!("categories[{i}].category must not be empty"));
            }
        }

        if self.query.default_top_k == 0 {
            errors.push("query.default_top_k must be > 0".to_string());
        }
        if self.query.max_results == 0 {
            errors.push("query.max_results must be > 0".to_string());
        }
        if self.query.default_top_k > self.query.max_results {
            errors.push(format!(
                "query.default_top_k ({}) must be <= query.max_results ({})",
                self.query.default_top_k, self.query.max_results
            ));
        }

        if self.server.addr.parse::<SocketAddr>().is_err() {
            errors.push(format!(
                "server.addr: '{}' is not a valid HOST:PORT socket address",
                self.server.addr
            ));
        }

        if self.watcher.poll_secs == 0 {
            errors.push("watcher.poll_secs must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            Self::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            Self::Serialize(e) => write!(f, "Config serialization error: {}", e),
            Self::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Source
// ============================================================================

/// Location and file filter for knowledge base documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Root directory, scanned recursively
    #[serde(default = "default_source_dir")]
    pub dir: PathBuf,

    /// File extensions treated as documents (without the dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("kb")
}
fn default_extensions() -> Vec<String> {
    vec!["md".to_string(), "txt".to_string()]
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dir: default_source_dir(),
            extensions: default_extensions(),
        }
    }
}

// ============================================================================
// Loader
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Reject prose lines (neither heading nor bullet) instead of skipping them
    #[serde(default)]
    pub strict: bool,
}

// ============================================================================
// Category Rules
// ============================================================================

/// Maps headings containing `keyword` (case-insensitive) to `category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub keyword: String,
    pub category: String,
}

impl CategoryRule {
    pub fn new(keyword: &str, category: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            category: category.to_string(),
        }
    }
}

/// Built-in rules for the bundled ST syntax and safety interlock notes.
pub fn default_category_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new("syntax", "syntax"),
        CategoryRule::new("safety", "safety"),
        CategoryRule::new("interlock", "safety"),
    ]
}

// ============================================================================
// Query
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Number of hits used for context composition when the caller gives none
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Upper bound applied to any caller-supplied limit
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_top_k() -> usize {
    4
}
fn default_max_results() -> usize {
    50
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            max_results: default_max_results(),
        }
    }
}

impl QueryConfig {
    /// Clamp a caller-supplied limit into `1..=max_results`.
    pub fn clamp_limit(&self, requested: Option<usize>, fallback: usize) -> usize {
        requested.unwrap_or(fallback).clamp(1, self.max_results)
    }
}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
}

fn default_addr() -> String {
    "127.0.0.1:8090".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

// ============================================================================
// Watcher
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    #[serde(default = "default_watcher_enabled")]
    pub enabled: bool,

    /// Seconds between mtime scans of the source directory
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
}

fn default_watcher_enabled() -> bool {
    true
}
fn default_poll_secs() -> u64 {
    5
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: default_watcher_enabled(),
            poll_secs: default_poll_secs(),
        }
    }
}
