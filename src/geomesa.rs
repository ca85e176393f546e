//! Artifact discovery inside a GeoMesa source checkout.
//!
//! A built checkout lays out each backend as
//!
//! ```text
//! geomesa-<name>/
//!   geomesa-<name>-gs-plugin/target/geomesa-<name>-gs-plugin_<scala>-<version>-install.tar.gz
//!   geomesa-<name>-dist/target/geomesa-<name>_<scala>-<version>-bin.tar.gz
//! ```

use camino::Utf8PathBuf;
use glob::Pattern;
use strum::Display;

use crate::error::ProvisionError;

/// Kind of bundle looked up in a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BundleKind {
    #[strum(serialize = "plugin")]
    Plugin,
    #[strum(serialize = "tools distribution")]
    Tools,
}

impl BundleKind {
    /// Module directory suffix, e.g. `-gs-plugin` in `geomesa-hbase-gs-plugin`.
    fn module_suffix(self) -> &'static str {
        match self {
            Self::Plugin => "-gs-plugin",
            Self::Tools => "-dist",
        }
    }

    /// Archive file name pattern inside `<module>/target`.
    fn archive_pattern(self, name: &str) -> String {
        let name = Pattern::escape(name);
        match self {
            Self::Plugin => format!("geomesa-{}-gs-plugin_*-install.tar.gz", name),
            Self::Tools => format!("geomesa-{}_*-bin.tar.gz", name),
        }
    }

    fn archive_suffix(self) -> &'static str {
        match self {
            Self::Plugin => "-install.tar.gz",
            Self::Tools => "-bin.tar.gz",
        }
    }
}

/// A prebuilt bundle found in the checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub kind: BundleKind,
    /// Backend name, e.g. `hbase`.
    pub name: String,
    pub path: Utf8PathBuf,
}

impl Bundle {
    /// Archive file name without its bundle suffix; tools bundles unpack
    /// into a directory of this name.
    pub fn stem(&self) -> &str {
        let file_name = self.path.file_name().unwrap_or(self.path.as_str());
        file_name
            .strip_suffix(self.kind.archive_suffix())
            .unwrap_or(file_name)
    }
}

/// A GeoMesa source checkout.
#[derive(Debug, Clone)]
pub struct Checkout {
    home: Utf8PathBuf,
}

impl Checkout {
    pub fn new(home: impl Into<Utf8PathBuf>) -> Self {
        Self { home: home.into() }
    }

    fn glob_paths(pattern: &str) -> Vec<Utf8PathBuf> {
        let mut paths: Vec<Utf8PathBuf> = match glob::glob(pattern) {
            Ok(paths) => paths
                .filter_map(Result::ok)
                .filter_map(|p| Utf8PathBuf::from_path_buf(p).ok())
                .collect(),
            Err(e) => {
                tracing::warn!("invalid glob pattern {}: {}", pattern, e);
                Vec::new()
            }
        };
        paths.sort();
        paths
    }

    /// Backend names with a module of the given kind, sorted.
    ///
    /// Only `geomesa-<name>/geomesa-<name><suffix>` directories count, so
    /// every listed name can actually be looked up.
    pub fn available(&self, kind: BundleKind) -> Vec<String> {
        let suffix = kind.module_suffix();
        let pattern = format!(
            "{}/geomesa-*/geomesa-*{}",
            Pattern::escape(self.home.as_str()),
            suffix
        );

        let mut names: Vec<String> = Self::glob_paths(&pattern)
            .into_iter()
            .filter(|path| path.is_dir())
            .filter_map(|path| {
                let module = path.file_name()?;
                let parent = path.parent()?.file_name()?;
                let name = module.strip_prefix("geomesa-")?.strip_suffix(suffix)?;
                (!name.is_empty() && parent == format!("geomesa-{}", name))
                    .then(|| name.to_string())
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Locates the bundle of `kind` for backend `name`.
    ///
    /// When several versions are built, the last by name sort wins.
    pub fn find(&self, kind: BundleKind, name: &str) -> Result<Bundle, ProvisionError> {
        let target = self
            .home
            .join(format!("geomesa-{}", name))
            .join(format!("geomesa-{}{}", name, kind.module_suffix()))
            .join("target");
        let pattern = format!(
            "{}/{}",
            Pattern::escape(target.as_str()),
            kind.archive_pattern(name)
        );

        match Self::glob_paths(&pattern).pop() {
            Some(path) => {
                tracing::debug!("found {} bundle {}", kind, path);
                Ok(Bundle {
                    kind,
                    name: name.to_string(),
                    path,
                })
            }
            None => Err(ProvisionError::MissingArtifact {
                kind: kind.to_string(),
                name: name.to_string(),
                location: self.home.to_string(),
                available: self.available(kind),
            }),
        }
    }
}
