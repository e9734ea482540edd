/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for the kustomize function stage.
 */

//! Error types for kustomize-fn-core.
//!
//! Every error here is fatal for the invocation: the stage is a single
//! all-or-nothing transformation and never returns a partial resource list.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::EngineError;

/// Errors raised while reading or editing a single resource document.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The document has none of `apiVersion`, `kind` or `metadata`.
    #[error("missing metadata")]
    MissingMetadata,

    /// A metadata field exists but does not have the expected shape.
    #[error("malformed metadata: {0}")]
    Malformed(String),

    /// The document is not a YAML mapping.
    #[error("expected a mapping document, found {0}")]
    NotAMapping(&'static str),

    /// The document could not be parsed.
    #[error("failed to parse resource: {0}")]
    Parse(#[source] serde_yaml::Error),

    /// The document could not be serialized.
    #[error("failed to serialize resource: {0}")]
    Serialize(#[source] serde_yaml::Error),
}

impl ResourceError {
    /// Create a "malformed metadata" error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

/// Errors that abort a stage invocation.
#[derive(Debug, Error)]
pub enum StageError {
    /// The resource list had no items.
    #[error("no resources provided")]
    NoResources,

    /// No input resource was the project's root definition file.
    #[error("kustomization file {0} is not among function input")]
    MissingRootDefinition(String),

    /// An input or rendered resource could not be read or edited.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// A configuration map entry has an unusable value.
    #[error("invalid configuration value for '{key}': {message}")]
    Config {
        /// The offending configuration key
        key: String,
        /// What was wrong with it
        message: String,
    },

    /// Writing to the staging directory failed.
    #[error("staging error: {message}: {source}")]
    Staging {
        /// Description of what failed
        message: String,
        /// The path involved
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The external engine could not be run or exited unsuccessfully.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The engine's output stream could not be decoded.
    #[error("parse kustomize output: {0}")]
    Decode(String),

    /// Writing the rendered output artifact failed.
    #[error("failed to write output {}: {source}", .path.display())]
    Sink {
        /// The output artifact path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl StageError {
    /// Create a configuration error.
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a staging error.
    pub fn staging(
        message: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Staging {
            message: message.into(),
            path: path.into(),
            source,
        }
    }

    /// Create an output decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}

pub type Result<T> = std::result::Result<T, StageError>;
