//! ticklist CLI
//!
//! Command-line interface for ticklist - a persistent todo list.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use ticklist_core::{Config, FileKvStore, ListStore, StoreError};

mod commands;
mod logging;
mod output;
mod prompt;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "tick")]
#[command(about = "ticklist - a small persistent todo list")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an item
    Add {
        /// Item text (words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// List all items
    #[command(alias = "ls")]
    List,
    /// Show one item
    Show {
        /// Item ID, ID prefix or list position
        item: String,
    },
    /// Change an item's text
    Edit {
        /// Item ID, ID prefix or list position
        item: String,
        /// New text (prompts with the current text if omitted)
        #[arg(short, long)]
        text: Option<String>,
    },
    /// Delete an item
    #[command(alias = "rm")]
    Delete {
        /// Item ID, ID prefix or list position
        item: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Remove the stored list and start empty
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show storage location and item count
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, storage_key, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    match run(cli, &output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e, &output);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, output: &Output) -> Result<()> {
    let config_path = cli.config.as_ref();

    // Config commands don't need the store
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command.clone(), config_path, output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    logging::init(&config);
    debug!(data_dir = ?config.data_dir, key = %config.storage_key, "configuration loaded");

    let backend = FileKvStore::new(&config);
    let command = cli.command.unwrap_or(Commands::List);

    // Reset must work on a list that cannot be loaded
    if let Commands::Reset { yes } = command {
        let mut store = ListStore::new(backend, config.storage_key.clone());
        return commands::item::reset(&mut store, yes, output);
    }

    let mut store = ListStore::open(backend, config.storage_key.clone())?;

    match command {
        Commands::Add { text } => commands::item::add(&mut store, text.join(" "), output),
        Commands::List => commands::item::list(&store, output),
        Commands::Show { item } => commands::item::show(&store, item, output),
        Commands::Edit { item, text } => commands::item::edit(&mut store, item, text, output),
        Commands::Delete { item, yes } => commands::item::delete(&mut store, item, yes, output),
        Commands::Status => commands::status::show(&store, &config, output),
        Commands::Reset { .. } => unreachable!(), // Handled above
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Print an error with its cause chain and, when known, how to recover
fn report_error(error: &anyhow::Error, output: &Output) {
    let suggestion = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<StoreError>())
        .and_then(StoreError::recovery_suggestion);

    if output.format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::json!({
                "status": "error",
                "message": format!("{:#}", error),
                "suggestion": suggestion
            })
        );
        return;
    }

    eprintln!("Error: {:#}", error);
    if let Some(hint) = suggestion {
        eprintln!("Hint: {}", hint);
    }
}
