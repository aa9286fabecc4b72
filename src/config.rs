//! TOML configuration for debounced input fields
//!
//! ```toml
//! [debounce]
//! delay_ms = 400
//! timer_scope = "instance"   # or "shared"
//!
//! [[validation.rules]]
//! kind = "required"
//!
//! [[validation.rules]]
//! kind = "decimal"
//! places = 2
//! ```
//!
//! A missing config file is not an error: every section falls back to its
//! defaults, so the binary keeps working without any setup.

use crate::input::{
    DebounceSettings, Decimal, FieldValidation, InputError, Integer, MaxLength, MinLength,
    Required, Rule, TimerScope, DEFAULT_DELAY_MS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = ".config/debounced-input";
const CONFIG_FILE: &str = "config.toml";

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub debounce: DebounceConfig,
    pub validation: ValidationConfig,
}

/// Timing of the debounce delay
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DebounceConfig {
    /// Quiet period in milliseconds before a delayed update is emitted
    pub delay_ms: u64,
    pub timer_scope: TimerScope,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_DELAY_MS,
            timer_scope: TimerScope::Instance,
        }
    }
}

impl DebounceConfig {
    pub fn settings(&self) -> DebounceSettings {
        DebounceSettings {
            delay: Duration::from_millis(self.delay_ms),
            timer_scope: self.timer_scope,
        }
    }
}

/// Rules applied to the working copy. Empty means always valid.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    pub rules: Vec<RuleConfig>,
}

impl ValidationConfig {
    pub fn build(&self) -> FieldValidation<String> {
        let mut validation = FieldValidation::new();
        for rule in &self.rules {
            validation.push_rule(rule.to_rule());
        }
        validation
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleConfig {
    Required,
    MinLength {
        value: usize,
    },
    MaxLength {
        value: usize,
    },
    Integer,
    Decimal {
        #[serde(default)]
        places: Option<usize>,
    },
}

impl RuleConfig {
    pub fn to_rule(&self) -> Box<dyn Rule<String>> {
        match *self {
            RuleConfig::Required => Box::new(Required),
            RuleConfig::MinLength { value } => Box::new(MinLength(value)),
            RuleConfig::MaxLength { value } => Box::new(MaxLength(value)),
            RuleConfig::Integer => Box::new(Integer),
            RuleConfig::Decimal { places } => Box::new(Decimal { places }),
        }
    }
}

impl Config {
    /// `~/.config/debounced-input/config.toml`
    pub fn default_path() -> PathBuf {
        let mut path = get_home_dir();
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    pub fn from_toml_str(content: &str) -> Result<Self, InputError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, InputError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads the config from `path`, or from [`Config::default_path`] when `None`
    ///
    /// Falls back to defaults when the file does not exist.
    pub async fn load(path: Option<&Path>) -> Result<Self, InputError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);

        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|source| InputError::ConfigRead {
                path: path.clone(),
                source,
            })?;
        if !exists {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| InputError::ConfigRead {
                path: path.clone(),
                source,
            })?;
        let config = Self::from_toml_str(&content)?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}
