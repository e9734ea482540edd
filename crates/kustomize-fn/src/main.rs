//! kustomize-fn - render a kustomization carried in a resource list

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kustomize_fn_core::{
    DEFAULT_OUTPUT_PATH, KustomizeEngine, KustomizeStage, PreservedPolicy, ResourceFunction,
    ResourceList, StageOptions,
};

#[derive(Parser)]
#[command(name = "kustomize-fn")]
#[command(version)]
#[command(
    about = "Render the kustomization in a resource list",
    long_about = "Reads a ResourceList from stdin, runs `kustomize build` on the project it \
                  carries, and writes the rendered ResourceList to stdout. Values in \
                  functionConfig.data override the flags below."
)]
struct Cli {
    /// Project path passed to `kustomize build`
    #[arg(long, default_value = ".")]
    path: String,

    /// Annotate rendered resources with an output path (absolute paths are also written)
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_OUTPUT_PATH)]
    output: Option<String>,

    /// Do not stage function declarations and inventory templates for the engine
    #[arg(long)]
    no_stage_preserved: bool,

    /// kustomize binary (defaults to $KUSTOMIZE_BIN, then PATH)
    #[arg(long, value_name = "BIN")]
    kustomize: Option<PathBuf>,

    /// Read the resource list from FILE instead of stdin
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,
}

impl Cli {
    fn stage_options(&self) -> StageOptions {
        let mut options = StageOptions::default().with_project_path(self.path.clone());
        if let Some(output) = &self.output {
            options = options.with_output_path(output.clone());
        }
        if self.no_stage_preserved {
            options = options.with_preserved_policy(PreservedPolicy::PreserveOnly);
        }
        options
    }

    fn engine(&self) -> Result<KustomizeEngine> {
        match &self.kustomize {
            Some(program) => Ok(KustomizeEngine::new(program.clone())),
            None => Ok(KustomizeEngine::discover()?),
        }
    }

    fn read_input(&self) -> Result<ResourceList> {
        match &self.input {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                ResourceList::read(BufReader::new(file))
                    .with_context(|| format!("Failed to read resource list from {}", path.display()))
            }
            None => ResourceList::read(io::stdin().lock())
                .context("Failed to read resource list from stdin"),
        }
    }
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the resource list
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kustomize_fn=info,kustomize_fn_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let list = cli.read_input()?;
    let engine = cli.engine()?;
    tracing::debug!(program = %engine.program().display(), "Using kustomize");
    let stage = KustomizeStage::new(engine).with_defaults(cli.stage_options());
    tracing::debug!(items = list.items.len(), "Read resource list");

    let rendered = stage
        .process(list)
        .with_context(|| format!("{} function failed", stage.name()))?;

    let mut stdout = BufWriter::new(io::stdout().lock());
    rendered
        .write(&mut stdout)
        .context("Failed to write resource list")?;
    stdout.flush().context("Failed to write resource list")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["kustomize-fn"]);
        assert_eq!(cli.stage_options(), StageOptions::default());
    }

    #[test]
    fn test_output_flag_without_value() {
        let cli = Cli::parse_from(["kustomize-fn", "--output"]);
        assert_eq!(
            cli.stage_options().output_path.as_deref(),
            Some(DEFAULT_OUTPUT_PATH)
        );
    }

    #[test]
    fn test_flags_map_to_options() {
        let cli = Cli::parse_from([
            "kustomize-fn",
            "--path",
            "overlays/prod",
            "--output",
            "/tmp/out.yaml",
            "--no-stage-preserved",
        ]);
        let options = cli.stage_options();
        assert_eq!(options.project_path, "overlays/prod");
        assert_eq!(options.output_path.as_deref(), Some("/tmp/out.yaml"));
        assert_eq!(options.preserved_policy, PreservedPolicy::PreserveOnly);
    }
}
