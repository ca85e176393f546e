//! Locates the WFS extension jar built by this project.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use glob::Pattern;

use crate::error::ProvisionError;

/// Finds the most recent jar (last by name sort) matching `pattern` under
/// `project_dir`. Source and javadoc jars never match.
pub fn find_wfs_jar(project_dir: &Utf8Path, pattern: &str) -> Result<Utf8PathBuf, ProvisionError> {
    let full = format!("{}/{}", Pattern::escape(project_dir.as_str()), pattern);
    let paths = glob::glob(&full)
        .map_err(|e| ProvisionError::Validation(format!("invalid wfs_jar pattern '{}': {}", pattern, e)))?;

    let mut jars: Vec<Utf8PathBuf> = paths
        .filter_map(Result::ok)
        .filter_map(|p| Utf8PathBuf::from_path_buf(p).ok())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name().is_some_and(|name| {
                !name.ends_with("-sources.jar") && !name.ends_with("-javadoc.jar")
            })
        })
        .collect();
    jars.sort();

    jars.pop().ok_or_else(|| ProvisionError::MissingArtifact {
        kind: "WFS extension jar".to_string(),
        name: pattern.to_string(),
        location: format!("{} (build it first with `mvn clean install`)", project_dir),
        available: Vec::new(),
    })
}

/// Copies the WFS jar into `lib_dir`, returning the installed path.
pub fn install_wfs_jar(jar: &Utf8Path, lib_dir: &Utf8Path) -> Result<Utf8PathBuf, ProvisionError> {
    let name = jar
        .file_name()
        .ok_or_else(|| ProvisionError::Validation(format!("not a file: {}", jar)))?;
    let target = lib_dir.join(name);
    fs::copy(jar, &target)
        .map_err(|e| ProvisionError::io(format!("failed to copy {} to {}", jar, target), e))?;
    tracing::info!("installed {}", name);
    Ok(target)
}
