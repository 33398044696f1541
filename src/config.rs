//! Configuration file parser for `feedmill.toml`.
//!
//! The file is optional: a missing or empty file yields `Config::default()`.
//! Every key has a default, so any subset may be given. Unknown keys are
//! accepted but logged, since they are almost always typos.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::date::DEFAULT_FAILURE_BUCKETS;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    /// Values parsed but cannot work together.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration, built once at startup and passed explicitly.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dates: DateConfig,
    pub normalize: NormalizeConfig,
    pub schedule: ScheduleConfig,
    pub fetch: FetchConfig,
}

/// `[dates]`: date resolution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DateConfig {
    /// Range of random bucket ids for failure samples.
    pub failure_buckets: u64,
    /// Layouts tried after the built-in catalog.
    pub extra_layouts: Vec<String>,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            failure_buckets: DEFAULT_FAILURE_BUCKETS,
            extra_layouts: Vec::new(),
        }
    }
}

/// `[normalize]`: story limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Longest persistence key a story may have before it is dropped.
    pub max_key_len: usize,
    /// Summary length in display columns.
    pub summary_len: usize,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            max_key_len: 500,
            summary_len: 100,
        }
    }
}

/// `[schedule]`: poll scheduling. Durations are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Weight of the newest interval in the moving average, in (0, 1).
    pub interval_weight: f64,
    /// Share of the average interval to wait before the next poll.
    pub update_fraction: f64,
    /// How many pauses without news before polling slows down.
    pub long_factor: f64,
    pub default_wait_secs: u64,
    pub min_secs: u64,
    pub max_secs: u64,
    pub jitter_secs: u64,
    /// Time since the last view after which a feed counts as not viewed.
    pub not_viewed_after_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_weight: 0.1,
            update_fraction: 0.5,
            long_factor: 10.0,
            default_wait_secs: 3 * 60 * 60,
            min_secs: 30 * 60,
            max_secs: 24 * 60 * 60,
            jitter_secs: 10 * 60,
            not_viewed_after_secs: 67 * 24 * 60 * 60,
        }
    }
}

impl ScheduleConfig {
    pub fn default_wait(&self) -> Duration {
        Duration::from_secs(self.default_wait_secs)
    }

    pub fn min(&self) -> Duration {
        Duration::from_secs(self.min_secs)
    }

    pub fn max(&self) -> Duration {
        Duration::from_secs(self.max_secs)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_secs(self.jitter_secs)
    }

    pub fn not_viewed_after(&self) -> Duration {
        Duration::from_secs(self.not_viewed_after_secs)
    }
}

/// `[fetch]`: HTTP fetching for icons and the command line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_icon_bytes: usize,
    pub max_feed_bytes: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_icon_bytes: 1024 * 1024,
            max_feed_bytes: 10 * 1024 * 1024,
            user_agent: concat!("feedmill/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Known keys per section, for typo warnings.
const KNOWN_KEYS: &[(&str, &[&str])] = &[
    ("dates", &["failure_buckets", "extra_layouts"]),
    ("normalize", &["max_key_len", "summary_len"]),
    (
        "schedule",
        &[
            "interval_weight",
            "update_fraction",
            "long_factor",
            "default_wait_secs",
            "min_secs",
            "max_secs",
            "jitter_secs",
            "not_viewed_after_secs",
        ],
    ),
    (
        "fetch",
        &["timeout_secs", "max_icon_bytes", "max_feed_bytes", "user_agent"],
    ),
];

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    /// - Inconsistent values → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge {
                    size: meta.len(),
                    max: Self::MAX_FILE_SIZE,
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        let config = Self::from_toml(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parses and validates configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            warn_unknown_keys(&raw);
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that parse fine but would break scheduling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.schedule;
        if !(s.interval_weight > 0.0 && s.interval_weight < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "schedule.interval_weight must be between 0 and 1, got {}",
                s.interval_weight
            )));
        }
        if !(s.update_fraction > 0.0 && s.update_fraction.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "schedule.update_fraction must be positive, got {}",
                s.update_fraction
            )));
        }
        if !(s.long_factor >= 1.0 && s.long_factor.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "schedule.long_factor must be at least 1, got {}",
                s.long_factor
            )));
        }
        if s.min_secs > s.max_secs {
            return Err(ConfigError::Invalid(format!(
                "schedule.min_secs ({}) exceeds schedule.max_secs ({})",
                s.min_secs, s.max_secs
            )));
        }
        if self.dates.failure_buckets == 0 {
            return Err(ConfigError::Invalid(
                "dates.failure_buckets must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn warn_unknown_keys(raw: &toml::Table) {
    for (section, value) in raw {
        let Some((_, keys)) = KNOWN_KEYS.iter().find(|(name, _)| name == section) else {
            tracing::warn!(key = %section, "Unknown key in config file, ignoring");
            continue;
        };
        if let Some(table) = value.as_table() {
            for key in table.keys() {
                if !keys.contains(&key.as_str()) {
                    tracing::warn!(section = %section, key = %key, "Unknown key in config file, ignoring");
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
