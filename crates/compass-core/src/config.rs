//! Configuration loading and parsing for Compass
//!
//! Provides functionality to load and parse `compass.toml` configuration
//! files, plus best-effort extraction of `baseUrl`/`paths` from a
//! project-level RequireJS configuration file.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "compass.toml";

const KNOWN_TOP_LEVEL_KEYS: &[&str] = &[
    "module_root",
    "require_config",
    "plugin_extensions",
    "navigate_to_file_only",
    "cache_capacity",
    "log_timing",
];

const DEFAULT_CACHE_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid TOML in '{path}': {message}")]
    ParseError { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Default)]
pub struct ConfigResult {
    pub config: ResolverConfig,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Root directory bare module ids resolve against.
    pub module_root: PathBuf,
    /// Optional RequireJS configuration file; its `baseUrl` overrides
    /// `module_root` and its `paths` aliases apply to bare module ids.
    pub require_config: Option<PathBuf>,
    /// Loader-plugin name to file extension, e.g. `text = ".html"`.
    pub plugin_extensions: HashMap<String, String>,
    /// Navigate to the target file without searching for the symbol.
    pub navigate_to_file_only: bool,
    /// Entry bound for each versioned cache.
    pub cache_capacity: usize,
    /// Log per-query resolution timing at debug level.
    pub log_timing: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            module_root: PathBuf::new(),
            require_config: None,
            plugin_extensions: HashMap::new(),
            navigate_to_file_only: false,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            log_timing: false,
        }
    }
}

/// `baseUrl` and `paths` pulled out of a RequireJS configuration file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct RequireConfig {
    #[serde(rename = "baseUrl")]
    pub base_url: Option<String>,
    pub paths: HashMap<String, String>,
}

impl RequireConfig {
    /// Best-effort load: the configuration object is located inside the
    /// file text (RequireJS configs are JS files wrapping a JSON-ish
    /// object) and parsed as JSON. Anything unparsable yields `None`.
    pub fn load(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        let start = content.find('{')?;
        let end = content.rfind('}')?;
        if end < start {
            return None;
        }
        serde_json::from_str(&content[start..=end]).ok()
    }
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if !current.pop() {
            return None;
        }
    }
}

pub fn load_config(path: &Path) -> Result<ResolverConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })
}

pub fn load_config_with_warnings(path: &Path) -> Result<ConfigResult, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: ResolverConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;

    let warnings = detect_unknown_keys(&content);

    Ok(ConfigResult { config, warnings })
}

fn detect_unknown_keys(content: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    let table: toml::Table = match content.parse() {
        Ok(t) => t,
        Err(_) => return warnings,
    };

    let known: HashSet<&str> = KNOWN_TOP_LEVEL_KEYS.iter().copied().collect();
    for key in table.keys() {
        if !known.contains(key.as_str()) {
            warnings.push(format!("Unknown config option: '{}'", key));
        }
    }

    warnings
}

pub fn load_config_or_default(start_dir: &Path) -> ResolverConfig {
    find_config_file(start_dir)
        .and_then(|path| load_config(&path).ok())
        .unwrap_or_default()
}
