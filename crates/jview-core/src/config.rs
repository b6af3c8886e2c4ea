#![forbid(unsafe_code)]

//! Analysis configuration.
//!
//! Defaults match the constants the analysis pipeline has always used. Each
//! can be overridden from the environment; bad values are reported as
//! [`ConfigError`]s and the field keeps its default.
//!
//! | Variable                     | Field                  | Default |
//! |------------------------------|------------------------|---------|
//! | `JVIEW_LARGE_FILE_THRESHOLD` | `large_file_threshold` | 524288  |
//! | `JVIEW_MAX_TREE_NODES`       | `max_tree_nodes`       | 5000    |
//! | `JVIEW_MAX_STRING_PREVIEW`   | `max_string_preview`   | 200     |

use std::env;
use std::fmt;

pub const ENV_LARGE_FILE_THRESHOLD: &str = "JVIEW_LARGE_FILE_THRESHOLD";
pub const ENV_MAX_TREE_NODES: &str = "JVIEW_MAX_TREE_NODES";
pub const ENV_MAX_STRING_PREVIEW: &str = "JVIEW_MAX_STRING_PREVIEW";

/// Formatted output above this many bytes is flagged `is_large`.
pub const DEFAULT_LARGE_FILE_THRESHOLD: usize = 512 * 1024;
/// Global cap on tree nodes created per summarization.
pub const DEFAULT_MAX_TREE_NODES: usize = 5000;
/// Strings longer than this many characters are clipped in tree summaries.
pub const DEFAULT_MAX_STRING_PREVIEW: usize = 200;

/// Tunables for format and tree analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisConfig {
    pub large_file_threshold: usize,
    pub max_tree_nodes: usize,
    pub max_string_preview: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            max_tree_nodes: DEFAULT_MAX_TREE_NODES,
            max_string_preview: DEFAULT_MAX_STRING_PREVIEW,
        }
    }
}

/// Result of reading config from the environment.
#[derive(Debug, Clone)]
pub struct AnalysisConfigParse {
    pub config: AnalysisConfig,
    pub errors: Vec<ConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl ConfigError {
    pub fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl AnalysisConfig {
    /// Builder: override the node budget.
    #[must_use]
    pub fn with_max_tree_nodes(mut self, max: usize) -> Self {
        self.max_tree_nodes = max;
        self
    }

    /// Builder: override the `is_large` threshold.
    #[must_use]
    pub fn with_large_file_threshold(mut self, bytes: usize) -> Self {
        self.large_file_threshold = bytes;
        self
    }

    /// Parse config from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with_diagnostics().config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> AnalysisConfigParse {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Parse config from an arbitrary key lookup.
    pub fn from_env_with<F>(mut get: F) -> AnalysisConfigParse
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let mut config = defaults;
        let mut errors = Vec::new();

        read_usize(
            &mut get,
            ENV_LARGE_FILE_THRESHOLD,
            "large_file_threshold",
            &mut config.large_file_threshold,
            &mut errors,
        );
        read_usize(
            &mut get,
            ENV_MAX_TREE_NODES,
            "max_tree_nodes",
            &mut config.max_tree_nodes,
            &mut errors,
        );
        read_usize(
            &mut get,
            ENV_MAX_STRING_PREVIEW,
            "max_string_preview",
            &mut config.max_string_preview,
            &mut errors,
        );

        if let Err(mut validation) = config.validate() {
            for err in &validation {
                match err.field {
                    "max_tree_nodes" => config.max_tree_nodes = defaults.max_tree_nodes,
                    "max_string_preview" => {
                        config.max_string_preview = defaults.max_string_preview;
                    }
                    _ => {}
                }
            }
            errors.append(&mut validation);
        }

        AnalysisConfigParse { config, errors }
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        validate_positive("max_tree_nodes", self.max_tree_nodes, &mut errors);
        validate_positive("max_string_preview", self.max_string_preview, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Read one `usize` variable into `slot`, recording a diagnostic on failure.
pub fn read_usize<F>(
    get: &mut F,
    key: &str,
    field: &'static str,
    slot: &mut usize,
    errors: &mut Vec<ConfigError>,
) where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(value) = get(key) {
        match parse_usize(&value) {
            Some(parsed) => *slot = parsed,
            None => errors.push(ConfigError::new(field, value, "expected non-negative integer")),
        }
    }
}

#[inline]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[inline]
pub fn parse_usize(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok()
}

pub fn validate_positive(field: &'static str, value: usize, errors: &mut Vec<ConfigError>) {
    if value == 0 {
        errors.push(ConfigError::new(field, value.to_string(), "must be >= 1"));
    }
}
