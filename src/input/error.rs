//! Error definitions for the input subsystem

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the debounced input subsystem
///
/// Validation failures are never reported through this type. A request blocked
/// by validation simply produces no emission.
#[derive(Debug, Error)]
pub enum InputError {
    /// A delayed update was requested outside of a tokio runtime
    #[error("No tokio runtime available to schedule the debounce timer")]
    NoRuntime,

    /// The configuration file exists but could not be read
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::config::Config`]
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration could not be rendered back to TOML
    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}
