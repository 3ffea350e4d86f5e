use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::config::ConfigLoader;
use crate::feed::Dataset;

pub mod commands;

use self::commands::{FeedArgs, ResolveArgs};

const LOG_FILE_NAME: &str = "themefeed.log";

#[derive(Parser, Debug)]
#[command(
    name = "themefeed",
    version,
    about = "Browse AI-scored posts grouped into themed feeds"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over THEMEFEED_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over THEMEFEED_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Read scored posts from this JSON file instead of the configured one
    #[arg(long)]
    pub dataset: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// List the registered themes and how many posts each has
    Themes,
    /// Show which theme a free-text query resolves to
    Resolve(ResolveArgs),
    /// Print a theme's feed without the TUI
    Feed(FeedArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("THEMEFEED_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("THEMEFEED_DATA", path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();
    let command = cli.command.unwrap_or(Commands::Tui);

    let log_file = matches!(command, Commands::Tui).then(|| paths.log_dir.join(LOG_FILE_NAME));
    init_tracing(&cli.log_level, log_file.as_deref())
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;

    let mut config = loader.load_or_init()?;
    if let Some(path) = cli.dataset {
        config.dataset_path = Some(path);
    }
    let dataset_path = config.dataset_path(&paths);
    let dataset = Arc::new(Dataset::load(&dataset_path)?);

    let config = Arc::new(config);
    match command {
        Commands::Tui => {
            if !atty::is(atty::Stream::Stdout) {
                bail!("stdout is not a terminal; use `themefeed feed` for plain output");
            }
            let mut app = App::new(config, dataset)?;
            commands::run_tui(&mut app)
        }
        Commands::Themes => commands::list_themes(&config, &dataset),
        Commands::Resolve(args) => commands::resolve_query(&config, args),
        Commands::Feed(args) => commands::print_feed(&config, dataset, args),
    }
}

fn init_tracing(level: &str, log_file: Option<&Path>) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match log_file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("opening log file {}", path.display()))?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
            }
            None => {
                fmt()
                    .with_env_filter(env_filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
        }
        Ok(())
    })
    .map(|_| ())
}
