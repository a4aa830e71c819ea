//! masterplan command-line entry point.

mod commands;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use masterplan_client::ApiClient;
use masterplan_common::{AppError, Config};
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use commands::{AddArgs, App, DeleteArgs, EditArgs, ProjectArg, TaskCommand};
use render::OutputMode;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "masterplan: project classification trees",
    long_about = None
)]
struct Cli {
    /// Configuration file; defaults to config/default.toml plus environment.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overriding the configuration.
    #[arg(long, global = true, env = "MASTERPLAN_API_URL")]
    api_url: Option<Url>,

    /// Emit JSON output and JSON log lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List projects.
    Projects,
    /// Show a project's classification tree.
    Tree(ProjectArg),
    /// List active leaves with their paths.
    Leaves(ProjectArg),
    /// Create a classification.
    Add(AddArgs),
    /// Rename, reorder, move or (de)activate a classification.
    Edit(EditArgs),
    /// Delete a leaf classification.
    Delete(DeleteArgs),
    /// Show the tree and re-render when another process changes it.
    Watch(ProjectArg),
    /// Manage tasks.
    #[command(subcommand)]
    Task(TaskCommand),
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "masterplan=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(cli: &Cli) -> Result<Config, AppError> {
    let base_url = cli.api_url.as_ref();
    let config = match &cli.config {
        Some(path) => Config::from_file_with_base_url(path, base_url)?,
        None => Config::load_with_base_url(base_url)?,
    };
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    debug!(base_url = %config.api.base_url, "Configuration loaded");

    let app = App {
        client: Arc::new(ApiClient::new(&config.api)?),
        config,
        output: if cli.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        },
    };

    match &cli.command {
        Commands::Projects => app.projects().await,
        Commands::Tree(args) => app.tree(args).await,
        Commands::Leaves(args) => app.leaves(args).await,
        Commands::Add(args) => app.add(args).await,
        Commands::Edit(args) => app.edit(args).await,
        Commands::Delete(args) => app.delete(args).await,
        Commands::Watch(args) => app.watch(args).await,
        Commands::Task(command) => app.task(command).await,
    }
}

/// The one line shown for a failed command.
fn failure_message(err: &anyhow::Error) -> String {
    err.downcast_ref::<AppError>()
        .map_or_else(|| format!("{err:#}"), AppError::user_message)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let app_err = err.downcast_ref::<AppError>();
            let code = app_err.map_or("INTERNAL_ERROR", AppError::error_code);
            let local = app_err.is_some_and(AppError::is_local);
            error!(code, local, error = %err, "Command failed");
            eprintln!("error: {}", failure_message(&err));
            ExitCode::FAILURE
        }
    }
}
