/*
 * output.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Decoding and annotation of the engine's output stream.
 */

//! Rendered output handling.
//!
//! The engine's stdout is a multi-document YAML stream. [`documents`] yields
//! one decoded resource per document; running out of documents ends the
//! iteration, while a parse error is yielded as an item. The whole stream is
//! buffered in memory before decoding starts. [`annotate`] stamps
//! each resource with its zero-based position and tracks the last non-empty
//! namespace seen.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;

use crate::annotations;
use crate::error::{Result, StageError};
use crate::resource::Resource;
use crate::staging::DOCUMENT_SEPARATOR;

/// Annotated engine output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedOutput {
    /// Rendered resources in emission order
    pub resources: Vec<Resource>,
    /// Namespace of the last rendered resource that declared one
    pub namespace: String,
}

/// Decode a multi-document stream into resources, one per document.
///
/// The reader is consumed in full up front. Documents are then converted as
/// the iterator advances, so a later parse error does not prevent earlier
/// documents from being yielded. Empty documents are skipped. Each item is either a resource or the
/// error that stopped decoding.
pub fn documents<'a, R>(reader: R) -> impl Iterator<Item = Result<Resource>> + 'a
where
    R: Read + 'a,
{
    serde_yaml::Deserializer::from_reader(reader)
        .map(|document| Value::deserialize(document).map_err(|e| StageError::decode(e.to_string())))
        .filter(|value| !matches!(value, Ok(Value::Null)))
        .enumerate()
        .map(|(position, value)| {
            value.and_then(|value| {
                Resource::try_from(value).map_err(|e| {
                    StageError::decode(format!("document {}: {}", position, e))
                })
            })
        })
}

/// Decode and annotate the engine's output.
///
/// Every resource gets `config.kubernetes.io/index` set to its position.
/// When `output_path` is given, `config.kubernetes.io/path` is set to it as
/// well. An empty or null annotations block is dropped before annotating.
///
/// # Errors
///
/// The first decode or edit error aborts the whole operation; no partial
/// output is returned.
pub fn annotate<R: Read>(reader: R, output_path: Option<&str>) -> Result<RenderedOutput> {
    let mut out = RenderedOutput::default();

    for document in documents(reader) {
        let mut resource = document?;
        let index = out.resources.len();

        resource.clear_empty_annotations();
        resource.set_annotation(annotations::INDEX, &index.to_string())?;
        if let Some(path) = output_path {
            resource.set_annotation(annotations::PATH, path)?;
        }

        let meta = resource.meta()?;
        if !meta.namespace.is_empty() {
            out.namespace = meta.namespace;
        }
        out.resources.push(resource);
    }

    tracing::debug!(
        count = out.resources.len(),
        namespace = %out.namespace,
        "Decoded rendered output"
    );
    Ok(out)
}

/// Serialize resources as one multi-document stream.
pub fn to_stream(resources: &[Resource]) -> Result<String> {
    let mut stream = String::new();
    for resource in resources {
        stream.push_str(DOCUMENT_SEPARATOR);
        stream.push_str(&resource.to_yaml()?);
    }
    Ok(stream)
}

/// Write resources to `path` as one multi-document file.
pub fn write_sink(path: &Path, resources: &[Resource]) -> Result<()> {
    let stream = to_stream(resources)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StageError::Sink {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, stream).map_err(|e| StageError::Sink {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::info!(path = %path.display(), count = resources.len(), "Wrote rendered output");
    Ok(())
}
