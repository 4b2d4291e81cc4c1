//! gild - asset build pipeline for static sites.

mod cli;
mod config;
mod core;
mod deploy;
mod embed;
mod logger;
mod pipeline;
mod reload;
mod revision;
mod task;
mod utils;
mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::SiteConfig;
use core::{BuildContext, BuildMode};

fn main() -> Result<()> {
    // Ctrl+C exits immediately, even mid-task
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = Arc::new(SiteConfig::load(&cli)?);

    match cli.command() {
        Commands::Dev { .. } => dev(config),
        Commands::Clean => pipeline::clean(&config),
        Commands::Build { .. } => {
            pipeline::run_production(&BuildContext::new(config, BuildMode::PRODUCTION))
        }
        Commands::Cache => revision::run(&config).context("cache busting failed"),
        Commands::Deploy { .. } => deploy::run(&config).map(|_| ()),
        single => {
            let name = single.task_name().context("not a task command")?;
            pipeline::run_task(&BuildContext::new(config, BuildMode::DEVELOPMENT), name)
        }
    }
}

/// Preview server first, so the browser can connect while the first build runs.
fn dev(config: Arc<SiteConfig>) -> Result<()> {
    let server = cli::serve::start(Arc::clone(&config))?;
    log!("serve"; "http://{}", server.addr);

    let mut ctx = BuildContext::new(config, BuildMode::DEVELOPMENT);
    if let Some(hub) = server.hub.clone() {
        ctx = ctx.with_hub(hub);
    }
    pipeline::run_development(&ctx)?;

    // without watching, keep serving the finished build
    server.join()
}
