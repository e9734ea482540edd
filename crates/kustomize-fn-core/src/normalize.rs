/*
 * normalize.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Normalization of the project's kustomization file.
 */

//! Root definition normalization.
//!
//! The `kustomization.yaml` resource is special. The engine has to find it
//! on disk, but must not see it as an ordinary resource, and the pipeline
//! must still get it back, marked as local configuration. [`normalize_root`]
//! splits it into those two forms:
//!
//! - the original, stripped of `metadata`, `apiVersion` and `kind`, which is
//!   what gets staged;
//! - a preserved copy carrying the local-config marker and a synthetic name,
//!   whose namespace is filled in once the render result is known.

use crate::annotations;
use crate::error::ResourceError;
use crate::resource::{API_VERSION_FIELD, KIND_FIELD, METADATA_FIELD, Resource};

/// File name of the project's root definition.
pub const KUSTOMIZATION_FILE: &str = "kustomization.yaml";

/// Default `apiVersion` for a kustomization that omits it.
pub const KUSTOMIZATION_API_VERSION: &str = "kustomize.config.k8s.io/v1beta1";

/// Default `kind` for a kustomization that omits it.
pub const KUSTOMIZATION_KIND: &str = "Kustomization";

/// Name given to the preserved copy.
///
/// Workaround for https://github.com/GoogleContainerTools/kpt/issues/755,
/// where two unnamed local-config resources cannot be told apart.
pub const PRESERVED_NAME: &str = "kustomization";

/// Normalize the root definition in place and return its preserved copy.
///
/// The returned copy has no namespace applied yet; see
/// [`crate::classify::PreservedSet::backfill_namespace`].
pub fn normalize_root(item: &mut Resource) -> Result<Resource, ResourceError> {
    if !item.has_field(API_VERSION_FIELD) {
        item.set_field(API_VERSION_FIELD, KUSTOMIZATION_API_VERSION);
    }
    if !item.has_field(KIND_FIELD) {
        item.set_field(KIND_FIELD, KUSTOMIZATION_KIND);
    }
    item.set_annotation(annotations::LOCAL_CONFIG, "true")?;

    let mut preserved = item.clone();
    preserved.set_name(PRESERVED_NAME)?;

    item.remove_field(METADATA_FIELD);
    item.remove_field(API_VERSION_FIELD);
    item.remove_field(KIND_FIELD);

    Ok(preserved)
}
