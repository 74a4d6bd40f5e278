//! bentoctl - deployment config validation and deployment CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{Settings, SettingsLoader};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "bentoctl", version, about = "Validate and deploy bentos with operators")]
struct Cli {
    /// Settings file (defaults and BENTOCTL_* variables apply without one)
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a deployment config and print it with defaults applied
    Validate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,
    },
    /// Generate a new deployment
    Deploy {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Update an existing deployment
    Update {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Manage installed operators
    Operator {
        #[command(subcommand)]
        command: OperatorCommand,
    },
    /// Inspect or create the settings file
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Debug, Subcommand)]
enum OperatorCommand {
    /// List installed operators
    List,
    /// Install the operator in DIR
    Add {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
    /// Show the spec fields an operator accepts
    Schema { name: String },
}

#[derive(Debug, Subcommand)]
enum SettingsCommand {
    /// Print the settings in effect
    Show,
    /// Write a settings file with the defaults
    Init {
        #[arg(value_name = "FILE", default_value = "bentoctl.yaml")]
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let dotenv_result = dotenv::dotenv();

    let cli = Cli::parse();
    let settings = SettingsLoader::load(cli.settings.as_deref())
        .context("Failed to load settings")?;

    init_logging(&settings)?;

    if let Err(e) = dotenv_result {
        if !e.to_string().contains("No such file or directory") {
            warn!("Could not load .env file: {}", e);
        }
    }
    debug!(version = env!("CARGO_PKG_VERSION"), "Starting bentoctl");

    match cli.command {
        Command::Validate { file, output } => commands::validate(&settings, &file, output),
        Command::Deploy { file } => commands::deploy(&settings, &file),
        Command::Update { file } => commands::update(&settings, &file),
        Command::Operator { command } => match command {
            OperatorCommand::List => commands::list_operators(&settings),
            OperatorCommand::Add { dir } => commands::add_operator(&settings, &dir),
            OperatorCommand::Schema { name } => commands::operator_schema(&settings, &name),
        },
        Command::Settings { command } => match command {
            SettingsCommand::Show => {
                print!("{}", serde_yaml::to_string(&settings)?);
                Ok(ExitCode::SUCCESS)
            }
            SettingsCommand::Init { path } => {
                SettingsLoader::create_example(&path)?;
                println!("Wrote {}", path.display());
                Ok(ExitCode::SUCCESS)
            }
        },
    }
}

/// Initialize logging from RUST_LOG / LOG_FORMAT, falling back to settings.
///
/// Logs go to stderr so command output on stdout stays parseable.
fn init_logging(settings: &Settings) -> Result<()> {
    let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to initialize JSON logging")?;
        }
        _ => {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .try_init()
                .context("Failed to initialize logging")?;
        }
    }

    debug!(
        level = %settings.logging.level,
        format = %log_format,
        "Logging initialized"
    );
    Ok(())
}
