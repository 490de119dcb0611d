//! # Error Handling
//!
//! This module defines the centralized error type for `deploy-replicator`.
//! It uses `thiserror` to build a single `Error` enum whose variants follow
//! the stages of the pipeline, so every failure can be traced back to the
//! pattern, file or variable that caused it.
//!
//! ## Recovery levels
//!
//! Not every variant is fatal. The pipeline recovers from them at different
//! levels:
//!
//! - **`Detection`** and **`ConfigParse`**: a single file could not be read or
//!   parsed. The detector logs it and moves on to the next file.
//! - **`Scan`**: a whole detector failed. The scanner logs it and continues
//!   with the remaining detectors.
//! - **`Render`** and **`Write`**: surfaced as a `failed` apply result for one
//!   template; the rest of the batch still runs.
//!
//! Everything else (`TemplateStore`, `Io`, `Yaml`, ...) is returned to the
//! caller, which for the CLI means a non-zero exit with a readable message.

use thiserror::Error;

/// Main error type for deploy-replicator operations
#[derive(Error, Debug)]
pub enum Error {
    /// A config file belonging to a detector's pattern kind was malformed.
    #[error("Detection error in {path}: {message}")]
    Detection { path: String, message: String },

    /// A detector failed as a whole.
    #[error("Detector '{detector}' failed: {message}")]
    Scan { detector: String, message: String },

    /// A template could not be rendered.
    ///
    /// Carries the unresolved variable when the failure was a missing value.
    #[error("Render error: {message}{}", variable.as_ref().map(|v| format!(" (variable: {})", v)).unwrap_or_default())]
    Render {
        message: String,
        /// The variable that could not be resolved, if applicable
        variable: Option<String>,
    },

    /// A rendered file could not be written, or its path was rejected.
    #[error("Write error for {path}: {message}")]
    Write { path: String, message: String },

    /// A configuration or source file is not valid for its expected format.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A path was malformed or resolved outside of its allowed root.
    #[error("Path operation error: {message}")]
    Path { message: String },

    /// A serialized template directory could not be written or read back.
    #[error("Template store error at {path}: {message}")]
    TemplateStore { path: String, message: String },

    /// Version-control metadata lookup failed.
    #[error("Git lookup error: {message}")]
    Git { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

impl Error {
    /// Build a render error for a variable that has no value.
    pub fn missing_variable(name: &str, hint: Option<&str>) -> Self {
        let message = match hint {
            Some(candidate) => format!(
                "no value for variable '{}' (did you mean '{}'?)",
                name, candidate
            ),
            None => format!("no value for variable '{}'", name),
        };
        Error::Render {
            message,
            variable: Some(name.to_string()),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
