/*
 * classify.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Routing of input resources to staging and preservation.
 */

//! Resource classification.
//!
//! Every input resource gets exactly one [`Disposition`]:
//!
//! | Input | Staged | Preserved |
//! |---|---|---|
//! | no annotations, no path, absolute or `..` path, previous output | no | no |
//! | `kustomization.yaml` | stripped original | normalized copy |
//! | function declaration / `inventory-template.yaml` | per [`PreservedPolicy`] | verbatim |
//! | anything else with a relative path | yes | no |
//!
//! Resources without any annotations are dropped from the output. They carry
//! no path, so the engine could never have seen them either.
//!
//! [`PreservedPolicy`]: crate::config::PreservedPolicy

use std::path::{Component, Path};

use crate::annotations::AnnotationKey;
use crate::config::StageOptions;
use crate::error::{ResourceError, Result};
use crate::normalize::{KUSTOMIZATION_FILE, normalize_root};
use crate::resource::Resource;

/// File name of an inventory template, which is always preserved.
pub const INVENTORY_TEMPLATE_FILE: &str = "inventory-template.yaml";

/// Why a resource was left out of both staging and output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// The resource has no annotations at all
    NoAnnotations,
    /// The path annotation is missing or empty
    MissingPath,
    /// The path annotation is absolute
    AbsolutePath,
    /// The path annotation climbs out of the project root with `..`
    EscapingPath,
    /// The resource sits at the configured output path
    RenderedOutput,
}

/// What happened to one input resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Dropped
    Excluded(Exclusion),
    /// Recognized as a root definition: staged stripped, preserved normalized
    Root,
    /// Function declaration or inventory template
    Preserved {
        /// Whether it was also staged
        staged: bool,
    },
    /// Staged for the engine only
    Staged,
}

/// A resource headed for the staging directory.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedResource {
    /// Relative path from the path annotation
    pub path: String,
    /// Document to write
    pub resource: Resource,
}

/// Resources re-emitted after the rendered output, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct PreservedSet {
    resources: Vec<Resource>,
    roots: Vec<usize>,
}

impl PreservedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource to re-emit unchanged.
    pub fn push(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    /// Add a normalized root definition copy, to be namespace-backfilled.
    pub fn push_root(&mut self, resource: Resource) {
        self.roots.push(self.resources.len());
        self.resources.push(resource);
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    /// Number of root definition copies held.
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Set `metadata.namespace` on every root definition copy.
    ///
    /// An empty namespace is still written, so the copies always carry the
    /// field.
    pub fn backfill_namespace(&mut self, namespace: &str) -> std::result::Result<(), ResourceError> {
        for &index in &self.roots {
            self.resources[index].set_namespace(namespace)?;
        }
        Ok(())
    }

    pub fn into_resources(self) -> Vec<Resource> {
        self.resources
    }
}

/// Result of classifying a resource list.
#[derive(Debug, Default)]
pub struct Classification {
    /// Whether a root definition was among the inputs
    pub found_root: bool,
    /// Resources to write to staging, in input order
    pub staged: Vec<StagedResource>,
    /// Resources to re-emit after the rendered output
    pub preserved: PreservedSet,
    /// One entry per input, in input order
    pub dispositions: Vec<Disposition>,
}

/// Classify input resources.
///
/// # Errors
///
/// Fails on the first resource whose metadata cannot be read, or when the
/// root definition cannot be normalized.
pub fn classify(items: Vec<Resource>, options: &StageOptions) -> Result<Classification> {
    let path_key = AnnotationKey::path();
    let function_key = AnnotationKey::function();
    let mut out = Classification::default();

    for (position, mut item) in items.into_iter().enumerate() {
        let meta = item.meta()?;

        let Some(annotations) = meta.annotations.as_ref() else {
            tracing::debug!(position, name = %meta.name, "Dropping resource without annotations");
            out.dispositions
                .push(Disposition::Excluded(Exclusion::NoAnnotations));
            continue;
        };

        let item_path = path_key.get(annotations).to_string();
        if let Some(exclusion) = exclusion_for(&item_path, options) {
            tracing::debug!(position, path = %item_path, ?exclusion, "Excluding resource");
            out.dispositions.push(Disposition::Excluded(exclusion));
            continue;
        }

        let file_name = Path::new(&item_path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();

        let disposition = if file_name == KUSTOMIZATION_FILE {
            let preserved = normalize_root(&mut item)?;
            out.preserved.push_root(preserved);
            out.found_root = true;
            Disposition::Root
        } else if !function_key.get(annotations).is_empty() || file_name == INVENTORY_TEMPLATE_FILE
        {
            let staged = options.preserved_policy.stages();
            if staged {
                out.preserved.push(item.clone());
            } else {
                out.preserved.push(item);
                out.dispositions.push(Disposition::Preserved { staged });
                tracing::debug!(position, path = %item_path, "Preserving resource without staging");
                continue;
            }
            Disposition::Preserved { staged }
        } else {
            Disposition::Staged
        };

        tracing::debug!(position, path = %item_path, ?disposition, "Classified resource");
        out.dispositions.push(disposition);
        out.staged.push(StagedResource {
            path: item_path,
            resource: item,
        });
    }

    Ok(out)
}

fn exclusion_for(item_path: &str, options: &StageOptions) -> Option<Exclusion> {
    if item_path.is_empty() {
        Some(Exclusion::MissingPath)
    } else if Path::new(item_path).is_absolute() {
        Some(Exclusion::AbsolutePath)
    } else if escapes_root(item_path) {
        Some(Exclusion::EscapingPath)
    } else if options.output_path.as_deref() == Some(item_path) {
        Some(Exclusion::RenderedOutput)
    } else {
        None
    }
}

/// Whether a relative path could resolve outside the directory it is joined
/// onto.
fn escapes_root(item_path: &str) -> bool {
    Path::new(item_path).components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PreservedPolicy;
    use crate::error::StageError;

    fn resource(yaml: &str) -> Resource {
        Resource::parse(yaml).unwrap()
    }

    fn with_path(kind: &str, name: &str, path: &str) -> Resource {
        resource(&format!(
            "apiVersion: v1\nkind: {kind}\nmetadata:\n  name: {name}\n  annotations:\n    config.kubernetes.io/path: '{path}'\n"
        ))
    }

    fn kustomization() -> Resource {
        resource(
            "metadata:\n  annotations:\n    config.kubernetes.io/path: kustomization.yaml\nresources:\n- deployment.yaml\n",
        )
    }

    fn function_config() -> Resource {
        resource(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: fn\n  annotations:\n    config.k8s.io/function: |\n      container:\n        image: kustomize-fn\n    config.kubernetes.io/path: fn-config.yaml\n",
        )
    }

    #[test]
    fn test_plain_resource_is_staged() {
        let out = classify(
            vec![with_path("Deployment", "web", "deployment.yaml")],
            &StageOptions::default(),
        )
        .unwrap();
        assert_eq!(out.dispositions, vec![Disposition::Staged]);
        assert_eq!(out.staged.len(), 1);
        assert_eq!(out.staged[0].path, "deployment.yaml");
        assert!(out.preserved.is_empty());
        assert!(!out.found_root);
    }

    #[test]
    fn test_exclusions() {
        let options = StageOptions::default().with_output_path("static/kustomized.yaml");
        let out = classify(
            vec![
                resource("apiVersion: v1\nkind: A\nmetadata:\n  name: bare\n"),
                resource("apiVersion: v1\nkind: A\nmetadata:\n  annotations:\n    other: x\n"),
                with_path("A", "abs", "/etc/abs.yaml"),
                with_path("A", "prev", "static/kustomized.yaml"),
            ],
            &options,
        )
        .unwrap();

        assert_eq!(
            out.dispositions,
            vec![
                Disposition::Excluded(Exclusion::NoAnnotations),
                Disposition::Excluded(Exclusion::MissingPath),
                Disposition::Excluded(Exclusion::AbsolutePath),
                Disposition::Excluded(Exclusion::RenderedOutput),
            ]
        );
        assert!(out.staged.is_empty());
        assert!(out.preserved.is_empty());
    }

    #[test]
    fn test_parent_dir_paths_excluded() {
        let out = classify(
            vec![
                with_path("A", "up", "../x.yaml"),
                with_path("A", "nested-up", "a/../../x.yaml"),
                with_path("A", "inner", "a/./b.yaml"),
            ],
            &StageOptions::default(),
        )
        .unwrap();

        assert_eq!(
            out.dispositions,
            vec![
                Disposition::Excluded(Exclusion::EscapingPath),
                Disposition::Excluded(Exclusion::EscapingPath),
                Disposition::Staged,
            ]
        );
        assert_eq!(out.staged.len(), 1);
        assert_eq!(out.staged[0].path, "a/./b.yaml");
    }

    #[test]
    fn test_escaping_root_definition_not_found() {
        let root = resource(
            "metadata:\n  annotations:\n    config.kubernetes.io/path: ../kustomization.yaml\nresources: []\n",
        );
        let out = classify(vec![root], &StageOptions::default()).unwrap();
        assert!(!out.found_root);
        assert!(out.preserved.is_empty());
    }

    #[test]
    fn test_output_path_only_guarded_when_configured() {
        let out = classify(
            vec![with_path("A", "prev", "static/kustomized.yaml")],
            &StageOptions::default(),
        )
        .unwrap();
        assert_eq!(out.dispositions, vec![Disposition::Staged]);
    }

    #[test]
    fn test_root_definition_normalized() {
        let out = classify(vec![kustomization()], &StageOptions::default()).unwrap();

        assert!(out.found_root);
        assert_eq!(out.dispositions, vec![Disposition::Root]);
        assert_eq!(out.preserved.root_count(), 1);
        assert_eq!(
            out.staged[0].resource.to_yaml().unwrap(),
            "resources:\n- deployment.yaml\n"
        );
        let copy = out.preserved.iter().next().unwrap();
        assert_eq!(copy.meta().unwrap().name, "kustomization");
    }

    #[test]
    fn test_nested_root_definition_matches_by_file_name() {
        let nested = resource(
            "metadata:\n  annotations:\n    config.k8s.io/path: base/kustomization.yaml\nresources: []\n",
        );
        let out = classify(vec![nested], &StageOptions::default()).unwrap();
        assert!(out.found_root);
        assert_eq!(out.staged[0].path, "base/kustomization.yaml");
    }

    #[test]
    fn test_function_config_staged_and_preserved() {
        let out = classify(vec![function_config()], &StageOptions::default()).unwrap();
        assert_eq!(out.dispositions, vec![Disposition::Preserved { staged: true }]);
        assert_eq!(out.staged.len(), 1);
        assert_eq!(out.preserved.len(), 1);
        assert_eq!(out.preserved.iter().next(), Some(&function_config()));
    }

    #[test]
    fn test_preserve_only_policy() {
        let options = StageOptions::default().with_preserved_policy(PreservedPolicy::PreserveOnly);
        let out = classify(
            vec![
                function_config(),
                with_path("ConfigMap", "inventory", "inventory-template.yaml"),
            ],
            &options,
        )
        .unwrap();
        assert_eq!(
            out.dispositions,
            vec![
                Disposition::Preserved { staged: false },
                Disposition::Preserved { staged: false },
            ]
        );
        assert!(out.staged.is_empty());
        assert_eq!(out.preserved.len(), 2);
    }

    #[test]
    fn test_preserved_insertion_order() {
        let out = classify(
            vec![
                with_path("ConfigMap", "inventory", "deploy/inventory-template.yaml"),
                kustomization(),
                function_config(),
            ],
            &StageOptions::default(),
        )
        .unwrap();
        let names: Vec<String> = out
            .preserved
            .iter()
            .map(|r| r.meta().unwrap().name)
            .collect();
        assert_eq!(names, vec!["inventory", "kustomization", "fn"]);
    }

    #[test]
    fn test_malformed_metadata_is_fatal() {
        let err = classify(
            vec![
                with_path("A", "ok", "a.yaml"),
                resource("apiVersion: v1\nkind: A\nmetadata:\n  annotations: 7\n"),
            ],
            &StageOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, StageError::Resource(ResourceError::Malformed(_))));
    }

    #[test]
    fn test_backfill_only_touches_roots() {
        let mut out = classify(
            vec![kustomization(), function_config()],
            &StageOptions::default(),
        )
        .unwrap();
        out.preserved.backfill_namespace("ns-b").unwrap();

        let preserved = out.preserved.into_resources();
        assert_eq!(preserved[0].meta().unwrap().namespace, "ns-b");
        assert_eq!(preserved[1], function_config());
    }
}
