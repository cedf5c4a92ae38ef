//! Configuration validation.

use std::collections::HashSet;
use std::fmt;

use crate::error::ConfigError;
use crate::schema::Config;

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Recursion depth above which nested routes are almost certainly a bug.
const HIGH_RECURSION_DEPTH: usize = 10_000;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Turn the first error into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_registry(config, &mut result);
        Self::validate_logging(config, &mut result);

        Ok(result)
    }

    fn validate_registry(config: &Config, result: &mut ValidationResult) {
        let registry = &config.registry;

        if registry.max_recursion_depth == 0 {
            result.add_error(ValidationError::new(
                "registry.max_recursion_depth",
                "max_recursion_depth must be greater than 0",
            ));
        } else if registry.max_recursion_depth > HIGH_RECURSION_DEPTH {
            result.add_warning(ValidationWarning::new(
                "registry.max_recursion_depth",
                format!(
                    "max_recursion_depth is very high (>{}), runaway routes may exhaust the stack first",
                    HIGH_RECURSION_DEPTH
                ),
            ));
        }

        let mut seen = HashSet::new();
        for name in &registry.routable {
            if name.trim().is_empty() {
                result.add_error(ValidationError::new(
                    "registry.routable",
                    "Routable type name cannot be empty",
                ));
            } else if !seen.insert(name.as_str()) {
                result.add_warning(ValidationWarning::new(
                    "registry.routable",
                    format!("Routable type '{}' is listed more than once", name),
                ));
            }
        }

        if registry.consistency_checks == Some(false) && !registry.routable.is_empty() {
            result.add_warning(ValidationWarning::new(
                "registry.routable",
                "consistency_checks is disabled, routable types will not be verified",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let level = config.logging.level.trim();

        if level.is_empty() {
            result.add_error(ValidationError::new(
                "logging.level",
                "Log level cannot be empty",
            ));
        } else if !Self::is_filter_directive(level)
            && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str())
        {
            result.add_error(ValidationError::new(
                "logging.level",
                format!(
                    "Unknown log level '{}', valid values: {:?}",
                    level, LOG_LEVELS
                ),
            ));
        }

        if let Some(directory) = config.logging.directory_path() {
            if directory.exists() && !directory.is_dir() {
                result.add_error(ValidationError::new(
                    "logging.directory",
                    format!("Log directory is not a directory: {:?}", directory),
                ));
            } else if !directory.exists() {
                result.add_warning(ValidationWarning::new(
                    "logging.directory",
                    format!("Log directory does not exist and will be created: {:?}", directory),
                ));
            }
        }

        if config.logging.file_prefix.trim().is_empty() {
            result.add_error(ValidationError::new(
                "logging.file_prefix",
                "file_prefix cannot be empty",
            ));
        }
    }

    /// `target=level` or comma-separated directives are passed to the filter as-is.
    fn is_filter_directive(level: &str) -> bool {
        level.contains('=') || level.contains(',')
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
