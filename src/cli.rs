use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use clap_complete::Shell;

use crate::error::ProvisionError;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,

    /// Print a completion script for the given shell and exit
    #[arg(long, value_name = "SHELL", exclusive = true)]
    pub completions: Option<Shell>,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Name of a GeoMesa backend plugin to install (e.g. hbase, accumulo)
    #[arg(long = "install", value_name = "PLUGIN")]
    pub plugin: Option<String>,

    /// Wipe the managed GeoServer installation and data directory before starting
    #[arg(long)]
    pub reset: bool,

    /// Java major version of the container runtime image
    #[arg(long, value_name = "VERSION", default_value_t = 11)]
    pub java_version: u32,

    /// Path to a local GeoMesa source checkout
    #[arg(long, value_name = "PATH")]
    pub geomesa_home: Option<Utf8PathBuf>,

    /// Attach a remote-debugging agent to the server
    #[arg(long)]
    pub debug: bool,

    /// Path to a YAML settings file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Set the log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,

    /// Do not run containers or installers, just show what would be done
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    /// Rejects values clap accepts syntactically but the run cannot use.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        if self.java_version == 0 {
            return Err(ProvisionError::Usage(
                "--java-version must be a positive major version".to_string(),
            ));
        }
        if let Some(plugin) = &self.plugin
            && (plugin.is_empty() || plugin.contains(['/', '\\']) || plugin.starts_with('.'))
        {
            return Err(ProvisionError::Usage(format!(
                "--install expects a plugin name, got '{}'",
                plugin
            )));
        }
        Ok(())
    }
}

/// Represents log levels for controlling the verbosity of logging output.
///
/// This enum maps directly to the log levels used by the `tracing` crate.
/// For example, specifying `--log-level debug` will enable debug-level
/// logging output, including every container command line.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
