#![forbid(unsafe_code)]

//! Viewer configuration.
//!
//! | Variable                    | Field                | Default |
//! |-----------------------------|----------------------|---------|
//! | `JVIEW_LINE_HEIGHT`         | `line_height`        | 20      |
//! | `JVIEW_OVERSCAN`            | `overscan`           | 20      |
//! | `JVIEW_MAX_HIGHLIGHT_CHARS` | `max_highlight_chars`| 5000    |
//! | `JVIEW_LIGHT`               | `light`              | false   |

use std::env;

use jview_core::config::{ConfigError, parse_bool, read_usize, validate_positive};

pub const ENV_LINE_HEIGHT: &str = "JVIEW_LINE_HEIGHT";
pub const ENV_OVERSCAN: &str = "JVIEW_OVERSCAN";
pub const ENV_MAX_HIGHLIGHT_CHARS: &str = "JVIEW_MAX_HIGHLIGHT_CHARS";
pub const ENV_LIGHT: &str = "JVIEW_LIGHT";

/// Height of one rendered line, in pixels.
pub const DEFAULT_LINE_HEIGHT: usize = 20;
/// Extra lines rendered above and below the viewport.
pub const DEFAULT_OVERSCAN: usize = 20;
/// Lines longer than this are cut before highlighting.
pub const DEFAULT_MAX_HIGHLIGHT_CHARS: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerConfig {
    pub line_height: usize,
    pub overscan: usize,
    pub max_highlight_chars: usize,
    /// Use the light token palette.
    pub light: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            line_height: DEFAULT_LINE_HEIGHT,
            overscan: DEFAULT_OVERSCAN,
            max_highlight_chars: DEFAULT_MAX_HIGHLIGHT_CHARS,
            light: false,
        }
    }
}

/// Result of reading viewer config from the environment.
#[derive(Debug, Clone)]
pub struct ViewerConfigParse {
    pub config: ViewerConfig,
    pub errors: Vec<ConfigError>,
}

impl ViewerConfig {
    #[must_use]
    pub fn with_light(mut self, light: bool) -> Self {
        self.light = light;
        self
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with_diagnostics().config
    }

    #[must_use]
    pub fn from_env_with_diagnostics() -> ViewerConfigParse {
        Self::from_env_with(|key| env::var(key).ok())
    }

    pub fn from_env_with<F>(mut get: F) -> ViewerConfigParse
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let mut config = defaults;
        let mut errors = Vec::new();

        read_usize(&mut get, ENV_LINE_HEIGHT, "line_height", &mut config.line_height, &mut errors);
        read_usize(&mut get, ENV_OVERSCAN, "overscan", &mut config.overscan, &mut errors);
        read_usize(
            &mut get,
            ENV_MAX_HIGHLIGHT_CHARS,
            "max_highlight_chars",
            &mut config.max_highlight_chars,
            &mut errors,
        );
        if let Some(value) = get(ENV_LIGHT) {
            match parse_bool(&value) {
                Some(light) => config.light = light,
                None => errors.push(ConfigError::new("light", value, "expected boolean")),
            }
        }

        if let Err(mut validation) = config.validate() {
            for err in &validation {
                match err.field {
                    "line_height" => config.line_height = defaults.line_height,
                    "max_highlight_chars" => {
                        config.max_highlight_chars = defaults.max_highlight_chars;
                    }
                    _ => {}
                }
            }
            errors.append(&mut validation);
        }

        ViewerConfigParse { config, errors }
    }

    /// Overscan may be zero; line height and the highlight cap may not.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        validate_positive("line_height", self.line_height, &mut errors);
        validate_positive("max_highlight_chars", self.max_highlight_chars, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(vars: &[(&str, &str)]) -> ViewerConfigParse {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        ViewerConfig::from_env_with(|key| map.get(key).map(|v| (*v).to_string()))
    }

    #[test]
    fn defaults() {
        let parsed = parse(&[]);
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.config.line_height, 20);
        assert_eq!(parsed.config.overscan, 20);
        assert_eq!(parsed.config.max_highlight_chars, 5000);
        assert!(!parsed.config.light);
    }

    #[test]
    fn overrides_and_zero_overscan() {
        let parsed = parse(&[(ENV_OVERSCAN, "0"), (ENV_LINE_HEIGHT, "16"), (ENV_LIGHT, "on")]);
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.config.overscan, 0);
        assert_eq!(parsed.config.line_height, 16);
        assert!(parsed.config.light);
    }

    #[test]
    fn invalid_values_fall_back() {
        let parsed = parse(&[(ENV_LINE_HEIGHT, "0"), (ENV_LIGHT, "dim")]);
        assert_eq!(parsed.config, ViewerConfig::default());
        let fields: Vec<&str> = parsed.errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, ["light", "line_height"]);
    }
}
