//! Domain-specific error types for gsprovision.
//!
//! This module defines `ProvisionError`, a `thiserror`-based enum that
//! provides typed error variants for the failure modes of a provisioning
//! run. Public API functions return `Result<T, ProvisionError>` for
//! programmatic error handling, while orchestration code uses
//! `anyhow::Result` and attaches context.
//!
//! `ProvisionError` implements `Into<anyhow::Error>`, so the `?` operator
//! converts it automatically, and [`exit_code_for`] recovers it again with
//! `downcast_ref` to pick the process exit status.

use std::io;

/// Exit status for a successful run.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit status for an operational failure (missing artifact, failed command, ...).
pub const EXIT_FAILURE: i32 = 1;
/// Exit status for malformed or unknown arguments.
pub const EXIT_USAGE: i32 = 2;

/// Formats an IO error kind into a human-readable message.
///
/// Provides consistent messages for common IO error kinds (e.g.,
/// "I/O error: not found") instead of the OS-level messages. For
/// unrecognized kinds, falls back to the OS-level message.
pub(crate) fn io_error_kind_message(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "I/O error: not found".to_string(),
        io::ErrorKind::PermissionDenied => "I/O error: permission denied".to_string(),
        io::ErrorKind::AlreadyExists => "I/O error: already exists".to_string(),
        _ => format!("I/O error: {}", err),
    }
}

/// Domain-specific error type for gsprovision.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProvisionError {
    /// Arguments were malformed or conflicting.
    #[error("usage error: {0}")]
    Usage(String),

    /// A settings file could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A validation constraint was violated.
    #[error("validation error: {0}")]
    Validation(String),

    /// An expected artifact (plugin bundle, tools bundle, WFS jar, ...) is absent.
    ///
    /// `available` enumerates the valid alternatives discovered by scanning
    /// the location, so the operator can correct the request.
    #[error(
        "{kind} '{name}' not found in {location}; available: {}",
        format_available(.available)
    )]
    MissingArtifact {
        /// What kind of artifact was looked up (e.g. "plugin").
        kind: String,
        /// The requested name.
        name: String,
        /// Where the lookup happened.
        location: String,
        /// Names that would have matched.
        available: Vec<String>,
    },

    /// An HTTP download did not succeed.
    #[error("download failed: {url}: {status}")]
    Download {
        /// The URL that was fetched.
        url: String,
        /// HTTP status or transport error description.
        status: String,
    },

    /// An archive could not be read or unpacked.
    #[error("archive error: {path}: {message}")]
    Archive {
        /// The archive being processed.
        path: String,
        /// Description of the failure.
        message: String,
    },

    /// A command was not found in PATH.
    #[error("command not found in PATH: {command}")]
    CommandNotFound {
        /// The command that was searched for.
        command: String,
    },

    /// A command execution failed (non-zero exit, spawn failure, wait failure, ...).
    #[error("command execution failed: {command}: {status}")]
    Execution {
        /// The command that was executed.
        command: String,
        /// Human-readable reason for the failure.
        status: String,
    },

    /// An I/O operation failed with contextual information.
    #[error("{context}: {message}")]
    Io {
        /// What was being done when the error occurred.
        context: String,
        /// Human-readable description derived from [`io_error_kind_message`].
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "(none)".to_string()
    } else {
        available.join(", ")
    }
}

impl ProvisionError {
    /// Creates an `Io` variant with the `message` field derived from `source`.
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            message: io_error_kind_message(&source),
            source,
        }
    }

    /// Creates an `Archive` variant.
    pub(crate) fn archive(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Archive {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => EXIT_USAGE,
            _ => EXIT_FAILURE,
        }
    }
}

/// Picks the exit status for an error chain.
///
/// The first `ProvisionError` found in the chain decides; anything else is
/// an operational failure.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ProvisionError>())
        .map_or(EXIT_FAILURE, ProvisionError::exit_code)
}

/// Message of the first `ProvisionError::Usage` in an error chain.
pub fn usage_message(err: &anyhow::Error) -> Option<&str> {
    err.chain()
        .find_map(|cause| match cause.downcast_ref::<ProvisionError>() {
            Some(ProvisionError::Usage(message)) => Some(message.as_str()),
            _ => None,
        })
}
