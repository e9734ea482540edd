/*
 * engine/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render engine abstraction and invocation building.
 */

//! Render engines.
//!
//! The stage hands the staged project to an external engine through the
//! [`RenderEngine`] trait. [`KustomizeEngine`] runs the `kustomize` binary;
//! tests substitute in-process engines.
//!
//! The engine is invoked as
//!
//! ```text
//! kustomize build <project-path> [key=value ...]
//! ```
//!
//! where the trailing arguments are the configuration map entries that are
//! not reserved for the stage, in sorted key order.

mod error;
mod kustomize;
mod traits;

use std::path::PathBuf;

pub use error::EngineError;
pub use kustomize::{KUSTOMIZE_BIN_ENV, KustomizeEngine, find_kustomize};
pub use traits::RenderEngine;

use crate::config::{ConfigMap, is_reserved};

/// The engine's subcommand.
pub const BUILD_VERB: &str = "build";

/// Everything needed to run the engine once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Arguments after the program name
    pub args: Vec<String>,
    /// Working directory; `None` runs in the current directory
    pub working_dir: Option<PathBuf>,
}

impl Invocation {
    /// Build an invocation for `project_path` with the given engine options.
    pub fn new(project_path: &str, options: &ConfigMap) -> Self {
        Self {
            args: build_args(project_path, options),
            working_dir: None,
        }
    }

    /// Run the engine from `dir`.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// Captured engine output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    /// Multi-document YAML stream
    pub stdout: Vec<u8>,
    /// Diagnostic text
    pub stderr: Vec<u8>,
}

impl EngineOutput {
    /// Output with the given stdout and empty stderr.
    pub fn from_stdout(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// Get stderr as a string (lossy UTF-8 conversion)
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Build the engine argument list.
///
/// Reserved stage keys are skipped. Keys come out sorted because
/// [`ConfigMap`] is ordered.
pub fn build_args(project_path: &str, options: &ConfigMap) -> Vec<String> {
    let mut args = Vec::with_capacity(options.len() + 2);
    args.push(BUILD_VERB.to_string());
    args.push(project_path.to_string());
    args.extend(
        options
            .iter()
            .filter(|(key, _)| !is_reserved(key))
            .map(|(key, value)| format!("{}={}", key, value)),
    );
    args
}
