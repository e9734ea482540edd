//! Core of the kustomize render function
//!
//! This crate takes a resource list carrying a kustomization project,
//! reconstructs the project on disk, runs `kustomize build` against it, and
//! returns the rendered resources followed by the resources that must
//! survive rendering (the root definition, function declarations and
//! inventory templates).
//!
//! # Architecture
//!
//! - [`Resource`] - A single configuration object with annotation access
//! - [`ResourceList`] - The envelope exchanged with the pipeline
//! - [`StageOptions`] - Per-invocation options parsed from the config map
//! - [`classify`] - Routes each input to staging, preservation or neither
//! - [`StagingDir`] - Private temporary project tree
//! - [`RenderEngine`] - Seam for the external renderer ([`KustomizeEngine`])
//! - [`KustomizeStage`] - Ties the above together
//!
//! # Example
//!
//! ```ignore
//! use kustomize_fn_core::{KustomizeEngine, KustomizeStage, ResourceFunction, ResourceList};
//!
//! let engine = KustomizeEngine::discover()?;
//! let stage = KustomizeStage::new(engine);
//!
//! let list = ResourceList::read(std::io::stdin())?;
//! let rendered = stage.process(list)?;
//! rendered.write(std::io::stdout())?;
//! ```

pub mod annotations;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod output;
pub mod resource;
pub mod resource_list;
pub mod stage;
pub mod staging;

// Re-export commonly used types
pub use annotations::{AnnotationKey, Annotations};
pub use classify::{Classification, Disposition, Exclusion, PreservedSet, classify};
pub use config::{ConfigMap, DEFAULT_OUTPUT_PATH, PreservedPolicy, StageOptions};
pub use engine::{
    EngineError, EngineOutput, Invocation, KUSTOMIZE_BIN_ENV, KustomizeEngine, RenderEngine,
    find_kustomize,
};
pub use error::{ResourceError, Result, StageError};
pub use normalize::{KUSTOMIZATION_FILE, normalize_root};
pub use output::{RenderedOutput, annotate};
pub use resource::{ObjectMeta, Resource};
pub use resource_list::ResourceList;
pub use stage::{KustomizeStage, ResourceFunction};
pub use staging::StagingDir;
