/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Per-invocation stage options.
 */

//! Stage options.
//!
//! The pipeline hands the stage a flat string map. A few keys configure the
//! stage itself and are never forwarded to the engine; all other entries are
//! passed through as `key=value` engine arguments.

use std::collections::BTreeMap;

use crate::error::{Result, StageError};

/// Project path option key.
pub const FLAG_PATH: &str = "path";

/// Output artifact path option key.
pub const FLAG_OUTPUT: &str = "output";

/// Whether preserved resources are also staged for the engine.
pub const FLAG_STAGE_PRESERVED: &str = "stage-preserved";

/// Keys consumed by the stage itself.
pub const RESERVED_KEYS: &[&str] = &[FLAG_PATH, FLAG_OUTPUT, FLAG_STAGE_PRESERVED];

/// Default project path, relative to the staging root.
pub const DEFAULT_PROJECT_PATH: &str = ".";

/// Default output artifact path when the output option is enabled without a value.
pub const DEFAULT_OUTPUT_PATH: &str = "static/kustomized.yaml";

/// The flat configuration map supplied with each invocation.
pub type ConfigMap = BTreeMap<String, String>;

/// How function declarations and inventory templates are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreservedPolicy {
    /// Write them to staging so the engine sees them, and re-emit them.
    #[default]
    StageAndPreserve,
    /// Only re-emit them; the engine never sees them.
    PreserveOnly,
}

impl PreservedPolicy {
    /// Whether preserved resources are written to staging.
    pub fn stages(self) -> bool {
        matches!(self, PreservedPolicy::StageAndPreserve)
    }
}

/// Options controlling one stage invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOptions {
    /// Project path handed to `kustomize build`
    pub project_path: String,

    /// Output artifact path. When set, rendered resources are annotated with
    /// it, inputs at that path are skipped, and an absolute path is also
    /// written to disk.
    pub output_path: Option<String>,

    /// Handling of function declarations and inventory templates
    pub preserved_policy: PreservedPolicy,

    /// Entries forwarded to the engine as `key=value`
    pub engine_options: ConfigMap,
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            project_path: DEFAULT_PROJECT_PATH.to_string(),
            output_path: None,
            preserved_policy: PreservedPolicy::default(),
            engine_options: ConfigMap::new(),
        }
    }
}

impl StageOptions {
    /// Set the project path
    pub fn with_project_path(mut self, path: impl Into<String>) -> Self {
        self.project_path = path.into();
        self
    }

    /// Set the output artifact path
    pub fn with_output_path(mut self, path: impl Into<String>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Set the preserved resource policy
    pub fn with_preserved_policy(mut self, policy: PreservedPolicy) -> Self {
        self.preserved_policy = policy;
        self
    }

    /// Overlay a configuration map onto these options.
    ///
    /// Reserved keys override the corresponding option; every other entry
    /// becomes an engine option.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Config`] for an unparsable `stage-preserved`
    /// value or an empty `path`.
    pub fn merge_config(mut self, config: &ConfigMap) -> Result<Self> {
        for (key, value) in config {
            match key.as_str() {
                FLAG_PATH => {
                    if value.is_empty() {
                        return Err(StageError::config(FLAG_PATH, "must not be empty"));
                    }
                    self.project_path = value.clone();
                }
                FLAG_OUTPUT => {
                    self.output_path = if value.is_empty() {
                        None
                    } else {
                        Some(value.clone())
                    };
                }
                FLAG_STAGE_PRESERVED => {
                    self.preserved_policy = match value.as_str() {
                        "true" => PreservedPolicy::StageAndPreserve,
                        "false" => PreservedPolicy::PreserveOnly,
                        other => {
                            return Err(StageError::config(
                                FLAG_STAGE_PRESERVED,
                                format!("expected 'true' or 'false', got '{}'", other),
                            ));
                        }
                    };
                }
                _ => {
                    self.engine_options.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(self)
    }

    /// Build options from a configuration map alone.
    pub fn from_config(config: &ConfigMap) -> Result<Self> {
        Self::default().merge_config(config)
    }
}

/// Whether a configuration key is consumed by the stage.
pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> ConfigMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let options = StageOptions::from_config(&ConfigMap::new()).unwrap();
        assert_eq!(options.project_path, ".");
        assert_eq!(options.output_path, None);
        assert_eq!(options.preserved_policy, PreservedPolicy::StageAndPreserve);
        assert!(options.engine_options.is_empty());
    }

    #[test]
    fn test_reserved_keys_are_not_engine_options() {
        let options = StageOptions::from_config(&config(&[
            ("path", "overlays/prod"),
            ("output", "static/out.yaml"),
            ("stage-preserved", "false"),
            ("enable-helm", "true"),
        ]))
        .unwrap();

        assert_eq!(options.project_path, "overlays/prod");
        assert_eq!(options.output_path.as_deref(), Some("static/out.yaml"));
        assert_eq!(options.preserved_policy, PreservedPolicy::PreserveOnly);
        assert_eq!(options.engine_options, config(&[("enable-helm", "true")]));
    }

    #[test]
    fn test_config_overrides_builder_defaults() {
        let options = StageOptions::default()
            .with_project_path("base")
            .with_output_path(DEFAULT_OUTPUT_PATH)
            .merge_config(&config(&[("path", "overlay"), ("output", "")]))
            .unwrap();
        assert_eq!(options.project_path, "overlay");
        assert_eq!(options.output_path, None);
    }

    #[test]
    fn test_invalid_stage_preserved() {
        let err = StageOptions::from_config(&config(&[("stage-preserved", "maybe")])).unwrap_err();
        assert!(matches!(err, StageError::Config { ref key, .. } if key == "stage-preserved"));
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(StageOptions::from_config(&config(&[("path", "")])).is_err());
    }

    #[test]
    fn test_is_reserved() {
        assert!(is_reserved("path"));
        assert!(is_reserved("output"));
        assert!(is_reserved("stage-preserved"));
        assert!(!is_reserved("load-restrictor"));
    }
}
