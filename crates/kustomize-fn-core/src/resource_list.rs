/*
 * resource_list.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The pipeline's resource list envelope.
 */

//! Resource list envelope.
//!
//! Pipeline functions exchange a single YAML document of kind
//! `ResourceList`: the resources under `items`, and the invocation's
//! configuration under `functionConfig`. Only `functionConfig.data` is
//! interpreted; everything else round-trips untouched.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::config::ConfigMap;
use crate::error::{ResourceError, StageError};
use crate::resource::{Resource, scalar_to_string, value_kind};

pub const RESOURCE_LIST_API_VERSION: &str = "config.kubernetes.io/v1";
pub const RESOURCE_LIST_KIND: &str = "ResourceList";

const DATA_FIELD: &str = "data";

fn default_api_version() -> String {
    RESOURCE_LIST_API_VERSION.to_string()
}

fn default_kind() -> String {
    RESOURCE_LIST_KIND.to_string()
}

/// The envelope read from and written to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceList {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_kind")]
    pub kind: String,

    #[serde(default)]
    pub items: Vec<Resource>,

    /// The function's configuration object, kept opaque
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_config: Option<Value>,

    /// Any other top-level fields, e.g. `results`
    #[serde(flatten)]
    pub extra: Mapping,
}

impl ResourceList {
    /// Create a list holding `items` with no function config.
    pub fn new(items: Vec<Resource>) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            items,
            function_config: None,
            extra: Mapping::new(),
        }
    }

    /// Attach a `ConfigMap`-style function config with the given data.
    pub fn with_config(mut self, data: &ConfigMap) -> Self {
        let data: Mapping = data
            .iter()
            .map(|(k, v)| (Value::from(k.as_str()), Value::from(v.as_str())))
            .collect();
        let mut config = Mapping::new();
        config.insert(Value::from("apiVersion"), Value::from("v1"));
        config.insert(Value::from("kind"), Value::from("ConfigMap"));
        config.insert(Value::from(DATA_FIELD), Value::Mapping(data));
        self.function_config = Some(Value::Mapping(config));
        self
    }

    /// Read a resource list from a YAML stream.
    pub fn read<R: Read>(reader: R) -> Result<Self, ResourceError> {
        serde_yaml::from_reader(reader).map_err(ResourceError::Parse)
    }

    /// Parse a resource list from a string.
    pub fn parse(yaml: &str) -> Result<Self, ResourceError> {
        serde_yaml::from_str(yaml).map_err(ResourceError::Parse)
    }

    pub fn to_yaml(&self) -> Result<String, ResourceError> {
        serde_yaml::to_string(self).map_err(ResourceError::Serialize)
    }

    /// Write the resource list as YAML.
    pub fn write<W: Write>(&self, writer: W) -> Result<(), ResourceError> {
        serde_yaml::to_writer(writer, self).map_err(ResourceError::Serialize)
    }

    /// The configuration map from `functionConfig.data`.
    ///
    /// A missing function config or data block yields an empty map. Scalar
    /// values are read as strings.
    pub fn config_map(&self) -> Result<ConfigMap, StageError> {
        let config = match &self.function_config {
            None | Some(Value::Null) => return Ok(ConfigMap::new()),
            Some(Value::Mapping(config)) => config,
            Some(other) => {
                return Err(StageError::config(
                    "functionConfig",
                    format!("must be a mapping, found {}", value_kind(other)),
                ));
            }
        };

        let data = match config.get(DATA_FIELD) {
            None | Some(Value::Null) => return Ok(ConfigMap::new()),
            Some(Value::Mapping(data)) => data,
            Some(other) => {
                return Err(StageError::config(
                    DATA_FIELD,
                    format!("must be a mapping, found {}", value_kind(other)),
                ));
            }
        };

        let mut out = ConfigMap::new();
        for (key, value) in data {
            let key = scalar_to_string(key)
                .ok_or_else(|| StageError::config(DATA_FIELD, "keys must be scalars"))?;
            let value = scalar_to_string(value).ok_or_else(|| {
                StageError::config(
                    key.as_str(),
                    format!("must be a scalar, found {}", value_kind(value)),
                )
            })?;
            out.insert(key, value);
        }
        Ok(out)
    }
}
