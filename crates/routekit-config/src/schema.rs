//! Configuration schema definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::loader::ConfigLoader;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Service registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Run consistency checks at seal time. Unset follows the build profile.
    #[serde(default)]
    pub consistency_checks: Option<bool>,

    #[serde(default = "default_max_recursion_depth")]
    pub max_recursion_depth: usize,

    /// Destination type names that must be served once registration is sealed.
    #[serde(default)]
    pub routable: Vec<String>,
}

impl RegistryConfig {
    pub fn consistency_checks_enabled(&self) -> bool {
        self.consistency_checks.unwrap_or(cfg!(debug_assertions))
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            consistency_checks: None,
            max_recursion_depth: default_max_recursion_depth(),
            routable: Vec::new(),
        }
    }
}

fn default_max_recursion_depth() -> usize {
    200
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level or `tracing` filter directive, e.g. `info` or `routekit_core=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,

    /// Directory for daily rolling log files. Console only when unset.
    #[serde(default)]
    pub directory: Option<String>,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl LoggingConfig {
    /// Log directory with `~` expanded.
    pub fn directory_path(&self) -> Option<PathBuf> {
        self.directory
            .as_deref()
            .map(|dir| PathBuf::from(ConfigLoader::expand_path(dir)))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            directory: None,
            file_prefix: default_file_prefix(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_file_prefix() -> String {
    "routekit.log".to_string()
}
