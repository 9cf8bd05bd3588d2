//! Planar - A small stacking compositor with a pannable desktop
//!
//! Windows float freely on an unbounded desktop that can be panned with the
//! keyboard or by dragging with the middle mouse button. Panels, docks and
//! wallpapers attach to output edges through the layer shell.
//!
//! # Features
//! - Click-to-focus stacking of toplevel windows
//! - Interactive move and resize
//! - Layer shell with exclusive zones
//! - Keyboard and pointer panning of the desktop
//! - TOML configuration with key bindings

use std::process::Command as ProcessCommand;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use planar_backend::Backend;
use planar_core::config::Config;

/// Planar - A stacking compositor with a pannable desktop
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Run in debug mode with verbose logging
    #[arg(short, long)]
    debug: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,

    /// Print default configuration to stdout
    #[arg(long)]
    print_default_config: bool,

    /// Command to run once the compositor is up
    #[arg(short, long)]
    startup: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Planar v{} starting...", env!("CARGO_PKG_VERSION"));

    if args.print_default_config {
        println!("{}", Config::default_config_string());
        return Ok(());
    }

    if args.validate {
        let config = Config::load(args.config.as_deref())?;
        config.validate().context("Configuration is invalid")?;
        info!("Configuration is valid");
        return Ok(());
    }

    let config = match Config::load(args.config.as_deref()) {
        Ok(cfg) => {
            info!("Configuration loaded successfully");
            cfg
        }
        Err(e) => {
            warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        }
    };
    if let Err(e) = config.validate() {
        warn!("{:#}", e);
    }

    // Protocol glue sends its events through `_events`
    let (mut backend, _events) = Backend::new(config)?;

    if let Some(cmd) = &args.startup {
        info!("Running startup command: {}", cmd);
        if let Err(e) = ProcessCommand::new("sh").arg("-c").arg(cmd).spawn() {
            error!("Failed to spawn '{}': {}", cmd, e);
        }
    }

    backend.run()
}
