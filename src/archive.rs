//! Archive extraction and library merging.
//!
//! Merges into a `WEB-INF/lib` directory are strictly additive: a jar whose
//! file name already exists in the target is skipped, never overwritten.

use std::fs::{self, File};
use std::io::{self, Read};

use camino::Utf8Path;
use flate2::read::GzDecoder;
use zip::ZipArchive;

use crate::error::ProvisionError;

/// Outcome of a non-overwriting merge.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Jar names copied into the target.
    pub added: Vec<String>,
    /// Jar names already present in the target.
    pub skipped: Vec<String>,
}

impl MergeReport {
    fn absorb(&mut self, other: MergeReport) {
        self.added.extend(other.added);
        self.skipped.extend(other.skipped);
    }
}

fn is_jar(name: &str) -> bool {
    name.ends_with(".jar")
}

/// Final path component of an archive entry name.
fn entry_file_name(name: &str) -> Option<&str> {
    name.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
}

fn open_zip(archive: &Utf8Path) -> Result<ZipArchive<File>, ProvisionError> {
    let file = File::open(archive)
        .map_err(|e| ProvisionError::io(format!("failed to open archive: {}", archive), e))?;
    ZipArchive::new(file).map_err(|e| ProvisionError::archive(archive.as_str(), e))
}

fn create_dir(dir: &Utf8Path) -> Result<(), ProvisionError> {
    fs::create_dir_all(dir)
        .map_err(|e| ProvisionError::io(format!("failed to create directory: {}", dir), e))
}

/// Writes `reader` to `lib_dir/name` unless that file already exists.
fn place_jar(
    lib_dir: &Utf8Path,
    name: &str,
    reader: &mut dyn Read,
    report: &mut MergeReport,
) -> Result<(), ProvisionError> {
    let target = lib_dir.join(name);
    if target.exists() {
        tracing::trace!("keeping existing {}", target);
        report.skipped.push(name.to_string());
        return Ok(());
    }
    let mut out = File::create(&target)
        .map_err(|e| ProvisionError::io(format!("failed to create {}", target), e))?;
    io::copy(reader, &mut out)
        .map_err(|e| ProvisionError::io(format!("failed to write {}", target), e))?;
    report.added.push(name.to_string());
    Ok(())
}

/// Unpacks every entry of a zip archive below `dest`.
///
/// Entries whose names would escape `dest` are rejected.
pub fn extract_zip(archive: &Utf8Path, dest: &Utf8Path) -> Result<(), ProvisionError> {
    let mut zip = open_zip(archive)?;
    create_dir(dest)?;

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| ProvisionError::archive(archive.as_str(), e))?;
        let Some(relative) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            return Err(ProvisionError::archive(
                archive.as_str(),
                format!("entry escapes extraction root: {}", entry.name()),
            ));
        };
        let target = dest.as_std_path().join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| {
                ProvisionError::io(format!("failed to create {}", target.display()), e)
            })?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProvisionError::io(format!("failed to create {}", parent.display()), e)
            })?;
        }
        let mut out = File::create(&target)
            .map_err(|e| ProvisionError::io(format!("failed to create {}", target.display()), e))?;
        io::copy(&mut entry, &mut out)
            .map_err(|e| ProvisionError::io(format!("failed to write {}", target.display()), e))?;
    }
    Ok(())
}

/// Unpacks the web application carried by a GeoServer war distribution.
///
/// The distribution zip wraps a single `*.war` (itself a zip); the war is
/// staged in a temporary file and then unpacked into `dest`.
pub fn extract_webapp(distribution: &Utf8Path, dest: &Utf8Path) -> Result<(), ProvisionError> {
    let mut zip = open_zip(distribution)?;
    let war_name = zip
        .file_names()
        .find(|name| name.ends_with(".war"))
        .map(str::to_string)
        .ok_or_else(|| ProvisionError::archive(distribution.as_str(), "no .war entry found"))?;

    let mut staged = tempfile::tempfile()
        .map_err(|e| ProvisionError::io("failed to create temp file for war", e))?;
    {
        let mut entry = zip
            .by_name(&war_name)
            .map_err(|e| ProvisionError::archive(distribution.as_str(), e))?;
        io::copy(&mut entry, &mut staged)
            .map_err(|e| ProvisionError::io(format!("failed to stage {}", war_name), e))?;
    }

    let label = format!("{}!/{}", distribution, war_name);
    let mut war = ZipArchive::new(staged).map_err(|e| ProvisionError::archive(label.as_str(), e))?;
    create_dir(dest)?;
    war.extract(dest.as_std_path())
        .map_err(|e| ProvisionError::archive(label.as_str(), e))?;
    tracing::debug!("unpacked {} into {}", label, dest);
    Ok(())
}

/// Merges the `.jar` entries of a zip archive into `lib_dir`, flattening paths.
pub fn merge_zip_jars(archive: &Utf8Path, lib_dir: &Utf8Path) -> Result<MergeReport, ProvisionError> {
    let mut zip = open_zip(archive)?;
    create_dir(lib_dir)?;
    let mut report = MergeReport::default();

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| ProvisionError::archive(archive.as_str(), e))?;
        if entry.is_dir() {
            continue;
        }
        let Some(name) = entry_file_name(entry.name()).map(str::to_string) else {
            continue;
        };
        if is_jar(&name) {
            place_jar(lib_dir, &name, &mut entry, &mut report)?;
        }
    }
    Ok(report)
}

fn open_tar_gz(archive: &Utf8Path) -> Result<tar::Archive<GzDecoder<File>>, ProvisionError> {
    let file = File::open(archive)
        .map_err(|e| ProvisionError::io(format!("failed to open archive: {}", archive), e))?;
    Ok(tar::Archive::new(GzDecoder::new(file)))
}

/// Unpacks a `.tar.gz` archive below `dest`.
pub fn extract_tar_gz(archive: &Utf8Path, dest: &Utf8Path) -> Result<(), ProvisionError> {
    create_dir(dest)?;
    open_tar_gz(archive)?
        .unpack(dest)
        .map_err(|e| ProvisionError::archive(archive.as_str(), e))
}

/// Merges the `.jar` entries of a `.tar.gz` archive into `lib_dir`, flattening paths.
pub fn merge_tar_gz_jars(
    archive: &Utf8Path,
    lib_dir: &Utf8Path,
) -> Result<MergeReport, ProvisionError> {
    create_dir(lib_dir)?;
    let mut tar = open_tar_gz(archive)?;
    let entries = tar
        .entries()
        .map_err(|e| ProvisionError::archive(archive.as_str(), e))?;
    let mut report = MergeReport::default();

    for entry in entries {
        let mut entry = entry.map_err(|e| ProvisionError::archive(archive.as_str(), e))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = {
            let path = entry
                .path()
                .map_err(|e| ProvisionError::archive(archive.as_str(), e))?;
            match path.file_name().and_then(|n| n.to_str()) {
                Some(n) if is_jar(n) => n.to_string(),
                _ => continue,
            }
        };
        place_jar(lib_dir, &name, &mut entry, &mut report)?;
    }
    Ok(report)
}

/// Merges the jars found directly in `src_dir` into `lib_dir`.
pub fn merge_dir_jars(src_dir: &Utf8Path, lib_dir: &Utf8Path) -> Result<MergeReport, ProvisionError> {
    create_dir(lib_dir)?;
    let mut report = MergeReport::default();
    let mut names = Vec::new();

    let entries = src_dir
        .read_dir_utf8()
        .map_err(|e| ProvisionError::io(format!("failed to read directory: {}", src_dir), e))?;
    for entry in entries {
        let entry =
            entry.map_err(|e| ProvisionError::io(format!("failed to read directory: {}", src_dir), e))?;
        if entry.path().is_file() && is_jar(entry.file_name()) {
            names.push(entry.file_name().to_string());
        }
    }
    names.sort();

    for name in names {
        let source = src_dir.join(&name);
        let mut file = File::open(&source)
            .map_err(|e| ProvisionError::io(format!("failed to open {}", source), e))?;
        let mut single = MergeReport::default();
        place_jar(lib_dir, &name, &mut file, &mut single)?;
        report.absorb(single);
    }
    Ok(report)
}
