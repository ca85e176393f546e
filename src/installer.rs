//! GeoMesa tools distribution handling.
//!
//! A tools bundle ships `bin/install-dependencies.sh`, which downloads the
//! backend client libraries the GeoServer plugin needs. The script asks for
//! confirmation, so it is answered on stdin, and its `fetching <url>` progress
//! lines are reported as `Installing <jar>`.

use std::fs;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};

use crate::archive;
use crate::error::ProvisionError;
use crate::executor::{CommandExecutor, CommandSpec};
use crate::geomesa::Bundle;

/// Installer script location inside an extracted tools distribution.
pub const INSTALLER_SCRIPT: &str = "bin/install-dependencies.sh";

/// Rewrites an installer `fetching <url>` line as `Installing <file>`.
///
/// Other lines are left alone.
pub fn relabel_fetch_line(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let rest = trimmed
        .get(..9)
        .filter(|prefix| prefix.eq_ignore_ascii_case("fetching "))
        .map(|_| trimmed[9..].trim())?;
    let artifact = rest
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(rest);
    Some(format!("Installing {}", artifact))
}

/// Extracts a tools bundle below `tools_root`, replacing any stale copy.
///
/// Returns the extracted distribution directory.
pub fn extract_tools(bundle: &Bundle, tools_root: &Utf8Path) -> Result<Utf8PathBuf, ProvisionError> {
    let dist = tools_root.join(bundle.stem());
    if dist.exists() {
        tracing::debug!("removing stale tools extraction {}", dist);
        fs::remove_dir_all(&dist)
            .map_err(|e| ProvisionError::io(format!("failed to remove {}", dist), e))?;
    }
    archive::extract_tar_gz(&bundle.path, tools_root)?;
    if !dist.is_dir() {
        return Err(ProvisionError::archive(
            bundle.path.as_str(),
            format!("expected top-level directory {}", bundle.stem()),
        ));
    }
    Ok(dist)
}

/// Builds the non-interactive installer invocation.
pub fn installer_command(dist: &Utf8Path, staging: &Utf8Path) -> CommandSpec {
    CommandSpec::new(
        "bash",
        vec![dist.join(INSTALLER_SCRIPT).into_string(), staging.to_string()],
    )
    .with_cwd(dist.to_path_buf())
    .with_stdin("y\n")
    .with_line_filter(relabel_fetch_line)
}

/// Runs the dependency installer of an extracted distribution into `staging`.
pub fn install_dependencies(
    executor: &dyn CommandExecutor,
    dist: &Utf8Path,
    staging: &Utf8Path,
) -> Result<()> {
    let script = dist.join(INSTALLER_SCRIPT);
    if !script.is_file() {
        return Err(ProvisionError::MissingArtifact {
            kind: "dependency installer".to_string(),
            name: INSTALLER_SCRIPT.to_string(),
            location: dist.to_string(),
            available: Vec::new(),
        }
        .into());
    }
    fs::create_dir_all(staging)
        .map_err(|e| ProvisionError::io(format!("failed to create {}", staging), e))?;

    let spec = installer_command(dist, staging);
    tracing::info!("installing dependencies with {}", script);
    let result = executor
        .execute(&spec)
        .with_context(|| format!("failed to run {}", script))?;
    result.ensure_success(&spec)?;
    Ok(())
}
