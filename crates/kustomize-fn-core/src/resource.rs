/*
 * resource.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Resource documents flowing through the stage.
 */

//! Resource documents.
//!
//! A [`Resource`] is an ordered YAML mapping with at least an `apiVersion`,
//! a `kind` and a `metadata` block. The stage reads and rewrites metadata in
//! place, so the type exposes field-level editing rather than a typed schema.
//! Key order is preserved through every edit.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::annotations::{AnnotationKey, Annotations};
use crate::error::ResourceError;

pub const API_VERSION_FIELD: &str = "apiVersion";
pub const KIND_FIELD: &str = "kind";
pub const METADATA_FIELD: &str = "metadata";
pub const NAME_FIELD: &str = "name";
pub const NAMESPACE_FIELD: &str = "namespace";
pub const ANNOTATIONS_FIELD: &str = "annotations";

/// Identifying metadata read from a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMeta {
    /// `metadata.name`, empty when unset
    pub name: String,
    /// `metadata.namespace`, empty when unset
    pub namespace: String,
    /// `metadata.annotations`, `None` when the field is absent or null
    pub annotations: Option<Annotations>,
}

impl ObjectMeta {
    /// Resolve an annotation key pair, `""` when unset.
    pub fn annotation(&self, key: &AnnotationKey) -> &str {
        self.annotations.as_ref().map_or("", |a| key.get(a))
    }
}

/// A single structured configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(Mapping);

impl Resource {
    /// Wrap an existing mapping.
    pub fn new(mapping: Mapping) -> Self {
        Self(mapping)
    }

    /// Parse a single YAML document.
    pub fn parse(yaml: &str) -> Result<Self, ResourceError> {
        let value: Value = serde_yaml::from_str(yaml).map_err(ResourceError::Parse)?;
        Self::try_from(value)
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }

    /// Get a top-level field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Whether a top-level field is present (a null value counts as present).
    pub fn has_field(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Set a top-level field, keeping its position if it already exists.
    pub fn set_field(&mut self, name: &str, value: impl Into<Value>) {
        self.0.insert(Value::from(name), value.into());
    }

    /// Remove a top-level field without reordering the remaining ones.
    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        remove_key(&mut self.0, name)
    }

    /// Read the resource's identifying metadata.
    ///
    /// # Errors
    ///
    /// Fails when the metadata block has an unexpected shape, or when the
    /// document has none of `apiVersion`, `kind` and `metadata`.
    pub fn meta(&self) -> Result<ObjectMeta, ResourceError> {
        let metadata = match self.0.get(METADATA_FIELD) {
            None | Some(Value::Null) => {
                if !self.has_field(API_VERSION_FIELD) && !self.has_field(KIND_FIELD) {
                    return Err(ResourceError::MissingMetadata);
                }
                return Ok(ObjectMeta::default());
            }
            Some(Value::Mapping(metadata)) => metadata,
            Some(other) => {
                return Err(ResourceError::malformed(format!(
                    "metadata must be a mapping, found {}",
                    value_kind(other)
                )));
            }
        };

        Ok(ObjectMeta {
            name: scalar_field(metadata, NAME_FIELD)?,
            namespace: scalar_field(metadata, NAMESPACE_FIELD)?,
            annotations: read_annotations(metadata)?,
        })
    }

    /// Set `metadata.annotations[key]`, creating the enclosing blocks.
    pub fn set_annotation(&mut self, key: &str, value: &str) -> Result<(), ResourceError> {
        let metadata = child_mapping(&mut self.0, METADATA_FIELD)?;
        let annotations = child_mapping(metadata, ANNOTATIONS_FIELD)?;
        annotations.insert(Value::from(key), Value::from(value));
        Ok(())
    }

    /// Set `metadata.name`, creating the metadata block if needed.
    pub fn set_name(&mut self, name: &str) -> Result<(), ResourceError> {
        let metadata = child_mapping(&mut self.0, METADATA_FIELD)?;
        metadata.insert(Value::from(NAME_FIELD), Value::from(name));
        Ok(())
    }

    /// Set `metadata.namespace`, creating the metadata block if needed.
    pub fn set_namespace(&mut self, namespace: &str) -> Result<(), ResourceError> {
        let metadata = child_mapping(&mut self.0, METADATA_FIELD)?;
        metadata.insert(Value::from(NAMESPACE_FIELD), Value::from(namespace));
        Ok(())
    }

    /// Drop `metadata.annotations` when it is null or an empty mapping.
    pub fn clear_empty_annotations(&mut self) {
        if let Some(Value::Mapping(metadata)) = self.0.get_mut(METADATA_FIELD) {
            let empty = match metadata.get(ANNOTATIONS_FIELD) {
                Some(Value::Null) => true,
                Some(Value::Mapping(annotations)) => annotations.is_empty(),
                _ => false,
            };
            if empty {
                remove_key(metadata, ANNOTATIONS_FIELD);
            }
        }
    }

    /// Serialize the resource as a single YAML document (no separator).
    pub fn to_yaml(&self) -> Result<String, ResourceError> {
        serde_yaml::to_string(&self.0).map_err(ResourceError::Serialize)
    }
}

impl TryFrom<Value> for Resource {
    type Error = ResourceError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Mapping(mapping) => Ok(Self(mapping)),
            other => Err(ResourceError::NotAMapping(value_kind(&other))),
        }
    }
}

impl From<Resource> for Value {
    fn from(resource: Resource) -> Self {
        Value::Mapping(resource.0)
    }
}

/// Short name of a YAML value's type, for error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Read a scalar as a string. Null reads as empty.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
    }
}

fn scalar_field(mapping: &Mapping, name: &str) -> Result<String, ResourceError> {
    match mapping.get(name) {
        None => Ok(String::new()),
        Some(value) => scalar_to_string(value).ok_or_else(|| {
            ResourceError::malformed(format!(
                "metadata.{} must be a scalar, found {}",
                name,
                value_kind(value)
            ))
        }),
    }
}

fn read_annotations(metadata: &Mapping) -> Result<Option<Annotations>, ResourceError> {
    let annotations = match metadata.get(ANNOTATIONS_FIELD) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Mapping(annotations)) => annotations,
        Some(other) => {
            return Err(ResourceError::malformed(format!(
                "metadata.annotations must be a mapping, found {}",
                value_kind(other)
            )));
        }
    };

    let mut out = Annotations::new();
    for (key, value) in annotations {
        let Some(key) = key.as_str() else {
            return Err(ResourceError::malformed(format!(
                "annotation keys must be strings, found {}",
                value_kind(key)
            )));
        };
        let Some(value) = scalar_to_string(value) else {
            return Err(ResourceError::malformed(format!(
                "annotation '{}' must be a scalar, found {}",
                key,
                value_kind(value)
            )));
        };
        out.insert(key.to_string(), value);
    }
    Ok(Some(out))
}

/// Get a nested mapping, creating it when absent or null.
fn child_mapping<'a>(parent: &'a mut Mapping, name: &str) -> Result<&'a mut Mapping, ResourceError> {
    let present = parent.get(name).is_some_and(|v| !v.is_null());
    if !present {
        parent.insert(Value::from(name), Value::Mapping(Mapping::new()));
    }
    match parent.get_mut(name) {
        Some(Value::Mapping(child)) => Ok(child),
        Some(other) => Err(ResourceError::malformed(format!(
            "{} must be a mapping, found {}",
            name,
            value_kind(other)
        ))),
        None => Err(ResourceError::malformed(format!("{} is missing", name))),
    }
}

fn remove_key(mapping: &mut Mapping, name: &str) -> Option<Value> {
    let mut removed = None;
    *mapping = std::mem::take(mapping)
        .into_iter()
        .filter_map(|(key, value)| {
            if removed.is_none() && key.as_str() == Some(name) {
                removed = Some(value);
                None
            } else {
                Some((key, value))
            }
        })
        .collect();
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_reads_name_namespace_and_annotations() {
        let r = Resource::parse(
            r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  namespace: prod
  annotations:
    config.kubernetes.io/path: deploy.yaml
    replicas-hint: 3
"#,
        )
        .unwrap();

        let meta = r.meta().unwrap();
        assert_eq!(meta.name, "web");
        assert_eq!(meta.namespace, "prod");
        let annotations = meta.annotations.as_ref().unwrap();
        assert_eq!(annotations["replicas-hint"], "3");
        assert_eq!(meta.annotation(&AnnotationKey::path()), "deploy.yaml");
    }

    #[test]
    fn test_meta_without_annotations() {
        let r = Resource::parse("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n").unwrap();
        let meta = r.meta().unwrap();
        assert!(meta.annotations.is_none());
        assert_eq!(meta.annotation(&AnnotationKey::path()), "");
    }

    #[test]
    fn test_meta_rejects_non_mapping_annotations() {
        let r = Resource::parse(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  annotations:\n  - a\n  - b\n",
        )
        .unwrap();
        let err = r.meta().unwrap_err();
        assert!(matches!(err, ResourceError::Malformed(_)));
        assert!(err.to_string().contains("sequence"));
    }

    #[test]
    fn test_meta_rejects_scalar_metadata() {
        let r = Resource::parse("apiVersion: v1\nkind: ConfigMap\nmetadata: oops\n").unwrap();
        assert!(matches!(r.meta(), Err(ResourceError::Malformed(_))));
    }

    #[test]
    fn test_meta_missing_everything() {
        let r = Resource::parse("resources:\n- a.yaml\n").unwrap();
        assert!(matches!(r.meta(), Err(ResourceError::MissingMetadata)));
    }

    #[test]
    fn test_parse_rejects_scalar_document() {
        let err = Resource::parse("just a string").unwrap_err();
        assert!(matches!(err, ResourceError::NotAMapping("string")));
    }

    #[test]
    fn test_set_annotation_creates_metadata() {
        let mut r = Resource::parse("resources:\n- a.yaml\n").unwrap();
        r.set_annotation("config.k8s.io/local-config", "true").unwrap();
        assert_eq!(
            r.to_yaml().unwrap(),
            "resources:\n- a.yaml\nmetadata:\n  annotations:\n    config.k8s.io/local-config: 'true'\n"
        );
    }

    #[test]
    fn test_set_annotation_replaces_null_annotations() {
        let mut r = Resource::parse("kind: X\nmetadata:\n  name: a\n  annotations:\n").unwrap();
        r.set_annotation("k", "v").unwrap();
        let meta = r.meta().unwrap();
        assert_eq!(meta.annotations.unwrap()["k"], "v");
    }

    #[test]
    fn test_set_annotation_rejects_scalar_metadata() {
        let mut r = Resource::parse("kind: X\nmetadata: 5\n").unwrap();
        assert!(r.set_annotation("k", "v").is_err());
    }

    #[test]
    fn test_remove_field_keeps_order() {
        let mut r = Resource::parse("a: 1\nb: 2\nc: 3\nd: 4\n").unwrap();
        assert_eq!(r.remove_field("b"), Some(Value::from(2)));
        assert_eq!(r.remove_field("missing"), None);
        assert_eq!(r.to_yaml().unwrap(), "a: 1\nc: 3\nd: 4\n");
    }

    #[test]
    fn test_set_field_keeps_position() {
        let mut r = Resource::parse("apiVersion: v1\nkind: A\nmetadata: {}\n").unwrap();
        r.set_field(KIND_FIELD, "B");
        assert_eq!(r.to_yaml().unwrap(), "apiVersion: v1\nkind: B\nmetadata: {}\n");
    }

    #[test]
    fn test_clear_empty_annotations() {
        let mut r =
            Resource::parse("kind: A\nmetadata:\n  name: a\n  annotations: {}\n").unwrap();
        r.clear_empty_annotations();
        assert_eq!(r.to_yaml().unwrap(), "kind: A\nmetadata:\n  name: a\n");

        let mut kept =
            Resource::parse("kind: A\nmetadata:\n  annotations:\n    x: y\n").unwrap();
        let before = kept.clone();
        kept.clear_empty_annotations();
        assert_eq!(kept, before);
    }

    #[test]
    fn test_set_name_and_namespace() {
        let mut r = Resource::parse("kind: A\nmetadata:\n  name: old\n").unwrap();
        r.set_name("new").unwrap();
        r.set_namespace("").unwrap();
        assert_eq!(
            r.to_yaml().unwrap(),
            "kind: A\nmetadata:\n  name: new\n  namespace: ''\n"
        );
    }
}
