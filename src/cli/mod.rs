use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::controller;
use crate::config::{ConfigLoader, ConfigPaths};
use crate::films::HttpTransport;

pub mod commands;

use self::commands::ListArgs;

#[derive(Parser, Debug)]
#[command(
    name = "filmtui",
    version,
    about = "Browse a films API in the terminal and jot down your own entries"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over FILMTUI_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Films listing endpoint to fetch from
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Fetch once and print the films
    List(ListArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("FILMTUI_CONFIG", path);
    }

    let loader = ConfigLoader::discover()?;
    let paths = loader.paths().clone();
    let command = cli.command.unwrap_or(Commands::Tui);
    let sink = match command {
        Commands::Tui => LogSink::File(&paths),
        Commands::List(_) => LogSink::Stderr,
    };
    init_tracing(&cli.log_level, sink)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    // before the HTTP client or any fetch worker starts a thread
    controller::capture_local_offset();

    let mut config = loader.load_or_default()?;
    config.override_endpoint(cli.endpoint);
    let transport =
        Arc::new(HttpTransport::new(&config.fetch).context("building films HTTP client")?);
    let config = Arc::new(config);

    match command {
        Commands::Tui => commands::run_tui(config, transport),
        Commands::List(args) => commands::list_films(config, transport.as_ref(), args),
    }
}

enum LogSink<'a> {
    /// The TUI owns the terminal, so logs go to a file under the state dir.
    File(&'a ConfigPaths),
    Stderr,
}

fn init_tracing(level: &str, sink: LogSink<'_>) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match sink {
            LogSink::File(paths) => {
                paths.ensure_log_dir()?;
                let log_file = paths.log_file();
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&log_file)
                    .with_context(|| format!("opening log file {}", log_file.display()))?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
            }
            LogSink::Stderr => {
                fmt()
                    .with_env_filter(env_filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
        }
        Ok::<(), anyhow::Error>(())
    })
    .map(|_| ())
}
