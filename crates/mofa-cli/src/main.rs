//! Command-line front end for the workflow engine: run a workflow spec
//! against stdin/file input, or publish/fetch specs from a file-backed
//! registry.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mofa_foundation::registry::SpecRegistry;
use mofa_foundation::workflow::collaborators::InMemoryWorkflowResolver;
use mofa_foundation::workflow::engine::Engine;
use mofa_foundation::workflow::spec::Workflow;
use mofa_foundation::workflow::WorkflowValue;

#[derive(Parser)]
#[command(name = "mofa", about = "Run and publish workflow specs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a workflow spec file against a JSON input value.
    Run {
        /// Path to a workflow spec JSON file.
        spec: PathBuf,
        /// JSON input value; defaults to `null`.
        #[arg(long)]
        input: Option<String>,
    },
    /// Save a workflow spec to the file-backed registry and immediately
    /// publish it, making that version immutable.
    Publish {
        spec: PathBuf,
        #[arg(long)]
        version: Option<String>,
        #[arg(long, default_value = "./registry")]
        root: PathBuf,
    },
    /// Fetch a workflow spec from the registry and print it as JSON.
    Get {
        id: String,
        version: String,
        #[arg(long, default_value = "./registry")]
        root: PathBuf,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid workflow spec JSON: {0}")]
    InvalidSpec(#[from] serde_json::Error),
    #[error(transparent)]
    Engine(#[from] mofa_foundation::workflow::engine::EngineError),
    #[error(transparent)]
    Registry(#[from] mofa_foundation::registry::RegistryError),
}

fn read_spec(path: &PathBuf) -> Result<Workflow, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.clone(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { spec, input } => {
            let workflow = read_spec(&spec)?;
            let input_value: WorkflowValue = match input {
                Some(raw) => {
                    let json: serde_json::Value = serde_json::from_str(&raw)?;
                    WorkflowValue::Json(json)
                }
                None => WorkflowValue::Null,
            };

            let resolver = Arc::new(InMemoryWorkflowResolver::new());
            let engine = Engine::new(resolver);
            let output = engine.execute(&workflow, input_value).await?;
            println!("{}", serde_json::to_string_pretty(&output).unwrap());
        }
        Command::Publish {
            spec,
            version,
            root,
        } => {
            let workflow = read_spec(&spec)?;
            let registry = SpecRegistry::local_file(root);
            let saved_version = registry.save_workflow(&workflow.id, version.as_deref(), &workflow).await?;
            registry.publish_workflow(&workflow.id, &saved_version).await?;
            tracing::info!(workflow_id = %workflow.id, version = %saved_version, "published workflow");
            println!("{}@{}", workflow.id, saved_version);
        }
        Command::Get { id, version, root } => {
            let registry = SpecRegistry::local_file(root);
            let workflow = registry.workflows.get(&id, &version).await?;
            println!("{}", serde_json::to_string_pretty(&workflow).unwrap());
        }
    }

    Ok(())
}
