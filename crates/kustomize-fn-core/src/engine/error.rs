/*
 * engine/error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for render engines.
 */

//! Error types for render engines.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while running a render engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine binary could not be located.
    #[error("{engine} not found: {hint}")]
    NotFound {
        /// The engine that was looked up
        engine: String,
        /// How to make it available
        hint: String,
    },

    /// The engine process could not be started.
    #[error("failed to run {}: {source}", .program.display())]
    Spawn {
        /// The program that was executed
        program: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The engine exited unsuccessfully.
    #[error("{engine} build: {status}: {stderr}")]
    Failed {
        /// The engine that failed
        engine: String,
        /// Exit status, as displayed by the OS
        status: String,
        /// Captured stderr, trimmed
        stderr: String,
    },
}

impl EngineError {
    /// Create a "not found" error.
    pub fn not_found(engine: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::NotFound {
            engine: engine.into(),
            hint: hint.into(),
        }
    }

    /// Create a "failed" error, trimming the captured stderr.
    pub fn failed(engine: impl Into<String>, status: impl ToString, stderr: &str) -> Self {
        Self::Failed {
            engine: engine.into(),
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        }
    }
}
