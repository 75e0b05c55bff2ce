//! resbridge CLI - Upload instrument result files to the laboratory endpoint

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;

use commands::{cmd_config_init, cmd_config_show, cmd_convert, cmd_send, cmd_watch};
use logging::{init_cli_logging, init_daemon_logging};

#[derive(Parser)]
#[command(name = "resbridge")]
#[command(about = "Watch a directory for instrument .RES files and upload them as JSON")]
#[command(after_help = "\
QUICK START:
  resbridge config init                        # Write ./resbridge.toml
  resbridge watch --endpoint https://lab/api   # Watch and upload until ctrl-c

DEBUGGING:
  resbridge convert C:\\Quimica\\A.RES          # Print the JSON body, send nothing
  resbridge send C:\\Quimica\\A.RES --keep      # Upload one file, keep it on disk")]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

/// Subcommands for `resbridge config`
#[derive(Subcommand)]
pub enum ConfigCommand {
  /// Show the effective configuration
  Show {
    /// Config file to load instead of the default locations
    #[arg(short, long)]
    config: Option<PathBuf>,
  },
  /// Write a commented default config to ./resbridge.toml
  Init {
    /// Overwrite an existing file
    #[arg(long)]
    force: bool,
  },
}

#[derive(Subcommand)]
enum Commands {
  /// Watch the result directory and upload new files
  #[command(after_help = "\
The endpoint comes from --endpoint, the API environment variable or
delivery.endpoint in the config file, in that order.")]
  Watch {
    /// Directory to watch (default: watch.directory)
    #[arg(short, long)]
    dir: Option<PathBuf>,
    /// Upload endpoint URL
    #[arg(short, long)]
    endpoint: Option<String>,
    /// Config file to load instead of the default locations
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Also upload result files already in the directory at startup
    #[arg(long)]
    scan_existing: bool,
  },
  /// Print the JSON body a result file would be uploaded as
  Convert {
    /// Result file to convert
    file: PathBuf,
    /// Single-line JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,
    /// Config file to load instead of the default locations
    #[arg(short, long)]
    config: Option<PathBuf>,
  },
  /// Upload a single result file with retries
  Send {
    /// Result file to upload
    file: PathBuf,
    /// Upload endpoint URL
    #[arg(short, long)]
    endpoint: Option<String>,
    /// Config file to load instead of the default locations
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Keep the file after a successful upload
    #[arg(long)]
    keep: bool,
  },
  /// Manage configuration
  #[command(after_help = "\
CONFIG LOCATIONS:
  Local: ./resbridge.toml
  User:  ~/.config/resbridge/config.toml")]
  Config {
    #[command(subcommand)]
    command: ConfigCommand,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  // Config-driven logging for the watcher, console-only for other commands
  let _guard = match &cli.command {
    Commands::Watch { config, .. } => init_daemon_logging(config.as_deref()),
    _ => {
      init_cli_logging();
      None
    }
  };

  match cli.command {
    Commands::Watch {
      dir,
      endpoint,
      config,
      scan_existing,
    } => cmd_watch(dir, endpoint, config.as_deref(), scan_existing).await,
    Commands::Convert { file, compact, config } => cmd_convert(&file, compact, config.as_deref()).await,
    Commands::Send {
      file,
      endpoint,
      config,
      keep,
    } => cmd_send(&file, endpoint, config.as_deref(), keep).await,

    // Config subcommands
    Commands::Config { command } => match command {
      ConfigCommand::Show { config } => cmd_config_show(config.as_deref()).await,
      ConfigCommand::Init { force } => cmd_config_init(force).await,
    },
  }
}
