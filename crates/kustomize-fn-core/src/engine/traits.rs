/*
 * engine/traits.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * RenderEngine trait definition.
 */

//! RenderEngine trait for the external build step.

use super::error::EngineError;
use super::{EngineOutput, Invocation};

/// An external engine that turns a staged project into rendered resources.
///
/// The stage treats the engine as an opaque batch transformation: it is run
/// once per invocation, to completion, and its stdout is decoded afterwards
/// as a multi-document YAML stream.
///
/// # Example
///
/// ```ignore
/// use kustomize_fn_core::engine::{EngineError, EngineOutput, Invocation, RenderEngine};
///
/// struct Canned(&'static str);
///
/// impl RenderEngine for Canned {
///     fn name(&self) -> &str {
///         "canned"
///     }
///
///     fn build(&self, _invocation: &Invocation) -> Result<EngineOutput, EngineError> {
///         Ok(EngineOutput::from_stdout(self.0))
///     }
/// }
/// ```
pub trait RenderEngine: Send + Sync {
    /// Human-readable name for logs and error messages.
    fn name(&self) -> &str;

    /// Run the engine and capture its output.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the engine cannot be started or exits
    /// unsuccessfully. Implementations must not return partial output on
    /// failure.
    fn build(&self, invocation: &Invocation) -> Result<EngineOutput, EngineError>;
}
