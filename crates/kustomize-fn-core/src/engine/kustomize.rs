/*
 * engine/kustomize.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * kustomize subprocess management.
 */

//! kustomize subprocess engine.
//!
//! [`find_kustomize`] searches for the binary in this order:
//! 1. `KUSTOMIZE_BIN` environment variable (path to the binary)
//! 2. System PATH via `which`
//!
//! The process is run to completion with stdout and stderr captured
//! separately. There is no timeout; a hung engine blocks the invocation.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::error::EngineError;
use super::traits::RenderEngine;
use super::{EngineOutput, Invocation};

/// Environment variable overriding the kustomize binary location.
pub const KUSTOMIZE_BIN_ENV: &str = "KUSTOMIZE_BIN";

const ENGINE_NAME: &str = "kustomize";

/// Find the kustomize binary on the system.
///
/// Returns `None` when neither `KUSTOMIZE_BIN` points at a file nor
/// `kustomize` is on PATH.
pub fn find_kustomize() -> Option<PathBuf> {
    if let Ok(bin) = std::env::var(KUSTOMIZE_BIN_ENV) {
        let bin = PathBuf::from(bin);
        if bin.is_file() {
            return Some(bin);
        }
        tracing::warn!(path = %bin.display(), "{} does not point at a file, ignoring", KUSTOMIZE_BIN_ENV);
    }

    which::which(ENGINE_NAME).ok()
}

/// Runs `kustomize build` as a subprocess.
#[derive(Debug, Clone)]
pub struct KustomizeEngine {
    program: PathBuf,
}

impl KustomizeEngine {
    /// Use the binary at `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Locate the binary with [`find_kustomize`].
    pub fn discover() -> Result<Self, EngineError> {
        find_kustomize().map(Self::new).ok_or_else(|| {
            EngineError::not_found(
                ENGINE_NAME,
                format!(
                    "install kustomize on PATH or set {} to its location",
                    KUSTOMIZE_BIN_ENV
                ),
            )
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl RenderEngine for KustomizeEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn build(&self, invocation: &Invocation) -> Result<EngineOutput, EngineError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&invocation.args).stdin(Stdio::null());
        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }

        tracing::info!(
            program = %self.program.display(),
            args = ?invocation.args,
            "Running kustomize"
        );

        let output = cmd.output().map_err(|e| EngineError::Spawn {
            program: self.program.clone(),
            source: e,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::failed(ENGINE_NAME, output.status, &stderr));
        }

        let output = EngineOutput {
            stdout: output.stdout,
            stderr: output.stderr,
        };
        if !output.stderr.is_empty() {
            tracing::debug!(stderr = %output.stderr_string().trim(), "kustomize diagnostics");
        }
        Ok(output)
    }
}
