/*
 * staging.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Ephemeral staging directory for the engine's input tree.
 */

//! Staging directory.
//!
//! Resources are written under a private temporary directory at their
//! declared relative path so the engine can read them as an on-disk project.
//! Writes append, so several resources sharing one path end up in a single
//! multi-document file. The directory is removed when the [`StagingDir`] is
//! dropped, on success and on every error path alike.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{Result, StageError};
use crate::resource::Resource;

/// Separator written before every staged document.
pub const DOCUMENT_SEPARATOR: &str = "---\n";

const STAGING_PREFIX: &str = "kustomize-fn-";

/// A private, per-invocation staging tree.
#[derive(Debug)]
pub struct StagingDir {
    dir: TempDir,
}

impl StagingDir {
    /// Create a fresh, empty staging directory under the system temp dir.
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir()
            .map_err(|e| {
                StageError::staging(
                    "failed to create staging directory",
                    std::env::temp_dir(),
                    e,
                )
            })?;
        tracing::debug!(dir = %dir.path().display(), "Created staging directory");
        Ok(Self { dir })
    }

    /// Root of the staging tree.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute location of a relative resource path inside the tree.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Append a resource to the file at `relative`, creating parent
    /// directories as needed.
    ///
    /// Returns the absolute path written.
    pub fn write(&self, relative: &str, resource: &Resource) -> Result<PathBuf> {
        let data = resource.to_yaml()?;
        let target = self.resolve(relative);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StageError::staging("failed to create directory", parent.to_path_buf(), e)
            })?;
        }

        append(&target, format!("{}{}", DOCUMENT_SEPARATOR, data).as_bytes())
            .map_err(|e| StageError::staging("failed to write file", target.clone(), e))?;

        tracing::trace!(path = relative, "Staged resource");
        Ok(target)
    }
}

fn append(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(data)?;
    file.flush()
}
