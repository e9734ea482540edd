/*
 * stage.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The kustomize render stage.
 */

//! The kustomize render stage.
//!
//! [`KustomizeStage`] turns a resource list into its rendered form:
//!
//! 1. classify the inputs and normalize the root definition
//! 2. write staged resources into a private temporary directory
//! 3. run `kustomize build` from that directory
//! 4. decode and annotate the output stream
//! 5. backfill the rendered namespace onto the root definition copies
//! 6. emit rendered resources followed by preserved ones
//!
//! The staging directory is removed on every exit path. Any failure aborts
//! the invocation with no partial output.

use std::path::Path;

use crate::classify::{Classification, StagedResource, classify};
use crate::config::StageOptions;
use crate::engine::{Invocation, RenderEngine};
use crate::error::{Result, StageError};
use crate::normalize::KUSTOMIZATION_FILE;
use crate::output::{self, RenderedOutput};
use crate::resource::Resource;
use crate::resource_list::ResourceList;
use crate::staging::StagingDir;

/// A pipeline function operating on a whole resource list.
///
/// The list is consumed; on error nothing is returned and the caller must
/// not emit partial output.
pub trait ResourceFunction {
    /// Human-readable name for logging
    fn name(&self) -> &str;

    /// Transform the resource list.
    fn process(&self, list: ResourceList) -> Result<ResourceList>;
}

/// Renders resources through a [`RenderEngine`].
#[derive(Debug, Clone)]
pub struct KustomizeStage<E> {
    engine: E,
    defaults: StageOptions,
}

impl<E: RenderEngine> KustomizeStage<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            defaults: StageOptions::default(),
        }
    }

    /// Options used when the function config does not override them.
    pub fn with_defaults(mut self, defaults: StageOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Render `items` with the given options.
    ///
    /// # Errors
    ///
    /// - [`StageError::NoResources`] for an empty input
    /// - [`StageError::MissingRootDefinition`] when no `kustomization.yaml`
    ///   is among the inputs
    /// - any resource, staging, engine, decode or sink failure
    pub fn run(&self, items: Vec<Resource>, options: &StageOptions) -> Result<Vec<Resource>> {
        if items.is_empty() {
            return Err(StageError::NoResources);
        }

        let input_count = items.len();
        let Classification {
            found_root,
            staged,
            mut preserved,
            ..
        } = classify(items, options)?;

        if !found_root {
            return Err(StageError::MissingRootDefinition(root_definition_path(
                &options.project_path,
            )));
        }

        tracing::info!(
            inputs = input_count,
            staged = staged.len(),
            preserved = preserved.len(),
            project = %options.project_path,
            "Rendering with {}",
            self.engine.name()
        );

        let rendered = self.render(&staged, options);

        // Root definition copies are completed whether or not rendering succeeded.
        let namespace = rendered.as_ref().map_or("", |r| r.namespace.as_str());
        let backfilled = preserved.backfill_namespace(namespace);
        let rendered = rendered?;
        backfilled?;

        let sink = options
            .output_path
            .as_deref()
            .map(Path::new)
            .filter(|path| path.is_absolute());
        if let Some(path) = sink {
            output::write_sink(path, &rendered.resources)?;
        }

        tracing::info!(
            rendered = rendered.resources.len(),
            preserved = preserved.len(),
            namespace = %rendered.namespace,
            "Render complete"
        );

        let mut out = rendered.resources;
        out.extend(preserved.into_resources());
        Ok(out)
    }

    /// Stage, build and decode. The staging directory lives only as long as
    /// this call.
    fn render(&self, staged: &[StagedResource], options: &StageOptions) -> Result<RenderedOutput> {
        let invocation = Invocation::new(&options.project_path, &options.engine_options);

        let output = if Path::new(&options.project_path).is_absolute() {
            tracing::debug!(
                project = %options.project_path,
                "Absolute project path, building in place"
            );
            self.engine.build(&invocation)?
        } else {
            let staging = StagingDir::create()?;
            for item in staged {
                staging.write(&item.path, &item.resource)?;
            }
            self.engine.build(&invocation.in_dir(staging.path()))?
        };

        output::annotate(output.stdout.as_slice(), options.output_path.as_deref())
    }
}

impl<E: RenderEngine> ResourceFunction for KustomizeStage<E> {
    fn name(&self) -> &str {
        self.engine.name()
    }

    fn process(&self, mut list: ResourceList) -> Result<ResourceList> {
        let options = self.defaults.clone().merge_config(&list.config_map()?)?;
        let items = std::mem::take(&mut list.items);
        list.items = self.run(items, &options)?;
        Ok(list)
    }
}

fn root_definition_path(project_path: &str) -> String {
    if project_path == "." || project_path.is_empty() {
        KUSTOMIZATION_FILE.to_string()
    } else {
        Path::new(project_path)
            .join(KUSTOMIZATION_FILE)
            .display()
            .to_string()
    }
}
