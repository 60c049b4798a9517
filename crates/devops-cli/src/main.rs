mod commands;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use devops_core::{Action, ComponentId};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "devops",
    about = "Build, run, push, and deploy the recruit frontend and backend images"
)]
#[command(version)]
struct Cli {
    /// Path to devops.toml (defaults to ./devops.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build frontend image
    BuildFrontend,
    /// Run latest frontend image
    RunFrontend {
        /// Name of the Docker container
        #[arg(long)]
        container_name: Option<String>,
    },
    /// Push latest frontend Docker image to AWS ECR
    PushFrontend,
    /// Deploy latest frontend, from ECR to ECS
    DeployFrontend,
    /// Build, push, and deploy frontend
    ReleaseFrontend,
    /// Build backend image
    BuildBackend,
    /// Run latest backend image
    RunBackend {
        /// Name of the Docker container
        #[arg(long)]
        container_name: Option<String>,
    },
    /// Push latest backend Docker image to AWS ECR
    PushBackend,
    /// Deploy latest backend, from ECR to ECS
    DeployBackend,
    /// Build, push, and deploy backend
    ReleaseBackend,
    /// Pick actions from a menu until exit
    Interactive,
    /// Check Docker, AWS CLI, and credentials
    Doctor,
}

impl Commands {
    /// The lifecycle action this sub-command runs, with its `--container-name`.
    fn target(self) -> Option<(Action, ComponentId, Option<String>)> {
        use ComponentId::{Backend, Frontend};

        let target = match self {
            Commands::BuildFrontend => (Action::Build, Frontend, None),
            Commands::RunFrontend { container_name } => (Action::Run, Frontend, container_name),
            Commands::PushFrontend => (Action::Push, Frontend, None),
            Commands::DeployFrontend => (Action::Deploy, Frontend, None),
            Commands::ReleaseFrontend => (Action::Release, Frontend, None),
            Commands::BuildBackend => (Action::Build, Backend, None),
            Commands::RunBackend { container_name } => (Action::Run, Backend, container_name),
            Commands::PushBackend => (Action::Push, Backend, None),
            Commands::DeployBackend => (Action::Deploy, Backend, None),
            Commands::ReleaseBackend => (Action::Release, Backend, None),
            Commands::Interactive | Commands::Doctor => return None,
        };
        Some(target)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: ignoring .env: {e}");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // An unknown sub-command is a request for usage, not an error.
        Err(e) if e.kind() == ErrorKind::InvalidSubcommand => return print_help(),
        Err(e) => e.exit(),
    };

    let Some(command) = cli.command else {
        return print_help();
    };
    let config = cli.config.as_deref();

    let result = match command {
        Commands::Interactive => commands::interactive(config).await,
        Commands::Doctor => commands::doctor(config).await,
        other => match other.target() {
            Some((action, component, container_name)) => {
                commands::run_action(action, component, container_name, config).await
            }
            None => Ok(ExitCode::SUCCESS),
        },
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_help() -> ExitCode {
    match Cli::command().print_help() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: failed to print help: {e}");
            ExitCode::FAILURE
        }
    }
}
