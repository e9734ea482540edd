/*
 * annotations.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Well-known pipeline annotations.
 */

//! Well-known annotation keys.
//!
//! Pipeline annotations have been published under two prefixes over time:
//! the current `config.kubernetes.io` and the older `config.k8s.io`. A
//! semantic key such as `path` may appear under either one. [`AnnotationKey`]
//! looks up both, preferring the current prefix.

use std::collections::BTreeMap;

/// Current annotation prefix.
pub const PREFIX: &str = "config.kubernetes.io";

/// Older annotation prefix, still accepted on input.
pub const LEGACY_PREFIX: &str = "config.k8s.io";

/// Zero-based position of a rendered resource in the engine's output.
pub const INDEX: &str = "config.kubernetes.io/index";

/// Location of a resource on the pipeline's filesystem.
pub const PATH: &str = "config.kubernetes.io/path";

/// Marks a resource as local configuration that must not be deployed.
pub const LOCAL_CONFIG: &str = "config.k8s.io/local-config";

/// Annotation map as read from resource metadata.
pub type Annotations = BTreeMap<String, String>;

/// A semantic annotation key, resolvable under both prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationKey {
    current: String,
    legacy: String,
}

impl AnnotationKey {
    /// Create a key for the given semantic name, e.g. `"path"`.
    pub fn new(name: &str) -> Self {
        Self {
            current: format!("{}/{}", PREFIX, name),
            legacy: format!("{}/{}", LEGACY_PREFIX, name),
        }
    }

    /// The path annotation key pair.
    pub fn path() -> Self {
        Self::new("path")
    }

    /// The function declaration annotation key pair.
    pub fn function() -> Self {
        Self::new("function")
    }

    /// The key under the current prefix.
    pub fn current(&self) -> &str {
        &self.current
    }

    /// The key under the older prefix.
    pub fn legacy(&self) -> &str {
        &self.legacy
    }

    /// Resolve the key against an annotation map.
    ///
    /// A non-empty value under the current prefix wins; otherwise the value
    /// under the older prefix is returned. Missing keys resolve to `""`.
    pub fn get<'a>(&self, annotations: &'a Annotations) -> &'a str {
        match annotations.get(&self.current) {
            Some(value) if !value.is_empty() => value.as_str(),
            _ => annotations
                .get(&self.legacy)
                .map_or("", String::as_str),
        }
    }
}
