pub mod archive;
pub mod cache;
pub mod cli;
pub mod config;
pub mod container;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod geomesa;
pub mod installer;
pub mod layout;
pub mod provision;
pub mod version;
pub mod wfs;

pub use error::ProvisionError;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::Shell;
use tracing::info;
use tracing_subscriber::{FmtSubscriber, filter::LevelFilter};

use crate::executor::CommandExecutor;
use crate::fetch::Fetcher;
use crate::provision::{Provisioner, Request};

pub fn init_logging(log_level: cli::LogLevel) -> Result<()> {
    let filter = match log_level {
        cli::LogLevel::Trace => LevelFilter::TRACE,
        cli::LogLevel::Debug => LevelFilter::DEBUG,
        cli::LogLevel::Info => LevelFilter::INFO,
        cli::LogLevel::Warn => LevelFilter::WARN,
        cli::LogLevel::Error => LevelFilter::ERROR,
    };

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(filter).finish(),
    )
    .context("failed to set global default tracing subscriber")
}

/// Writes a completion script for `shell` to `out`.
pub fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = cli::Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, out);
}

/// Merges CLI flags over settings into a provisioning request.
pub fn resolve_request(opts: &cli::RunArgs, settings: &config::Settings) -> Request {
    Request {
        plugin: opts.plugin.clone(),
        reset: opts.reset,
        java_version: opts.java_version,
        debug: opts.debug,
        geomesa_home: opts
            .geomesa_home
            .clone()
            .unwrap_or_else(|| settings.geomesa_home()),
    }
}

/// Loads and validates settings, then provisions and launches GeoServer.
pub fn run(
    opts: &cli::RunArgs,
    fetcher: Arc<dyn Fetcher>,
    executor: Arc<dyn CommandExecutor>,
) -> Result<()> {
    opts.validate()?;
    let settings = config::load_settings(opts.config.as_deref())
        .context("failed to load settings")?;
    settings.validate().context("settings validation failed")?;

    let version = version::read_geoserver_version(&settings.project_dir())?;
    info!("geoserver version {}", version);

    let request = resolve_request(opts, &settings);
    let provisioner =
        Provisioner::new(settings, version, fetcher, executor)?.with_dry_run(opts.dry_run);
    provisioner.run(&request)
}
