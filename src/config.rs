//! Settings file support.
//!
//! Every key is optional; an absent file yields [`Settings::default()`].
//! Relative directories resolve against `project_dir`, which itself
//! defaults to the current working directory.
//!
//! # Example YAML
//!
//! ```yaml
//! project_dir: /src/geomesa-geoserver
//! geomesa_home: /src/geomesa
//! extensions: [wps, importer]
//! image: "tomcat:9-jdk{java}"
//! debug_port: 5005
//! ```

use std::fs::File;
use std::io::BufReader;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use url::Url;

use crate::error::ProvisionError;

/// Placeholder replaced by the Java major version in [`Settings::image`].
pub const JAVA_PLACEHOLDER: &str = "{java}";

fn default_download_url() -> String {
    "https://downloads.sourceforge.net/project/geoserver/GeoServer".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["wps".to_string()]
}

fn default_image() -> String {
    format!("tomcat:9-jdk{}", JAVA_PLACEHOLDER)
}

fn default_runtime() -> String {
    "docker".to_string()
}

fn default_debug_port() -> u16 {
    5005
}

fn default_wfs_jar() -> String {
    "geomesa-gs-wfs/target/geomesa-gs-wfs-*.jar".to_string()
}

fn default_webapp_mount() -> Utf8PathBuf {
    Utf8PathBuf::from("/usr/local/tomcat/webapps/geoserver")
}

fn default_data_mount() -> Utf8PathBuf {
    Utf8PathBuf::from("/opt/geoserver_data")
}

/// Provisioning settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Root of the project providing `pom.xml` and the WFS jar.
    #[serde(default)]
    pub project_dir: Option<Utf8PathBuf>,
    /// GeoMesa source checkout; defaults to a sibling `geomesa` directory.
    #[serde(default)]
    pub geomesa_home: Option<Utf8PathBuf>,
    /// Download cache directory.
    #[serde(default)]
    pub cache_dir: Option<Utf8PathBuf>,
    /// Directory holding one install tree per GeoServer version.
    #[serde(default)]
    pub install_dir: Option<Utf8PathBuf>,
    /// GeoServer data directory mounted into the container.
    #[serde(default)]
    pub data_dir: Option<Utf8PathBuf>,
    /// Base URL of the GeoServer release archive.
    #[serde(default = "default_download_url")]
    pub download_url: String,
    /// GeoServer extensions merged into every install tree.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Container image; `{java}` is replaced by the Java major version.
    #[serde(default = "default_image")]
    pub image: String,
    /// Container runtime binary.
    #[serde(default = "default_runtime")]
    pub runtime: String,
    /// Remote-debugging port used with `--debug`.
    #[serde(default = "default_debug_port")]
    pub debug_port: u16,
    /// Glob, relative to `project_dir`, matching the WFS extension jar.
    #[serde(default = "default_wfs_jar")]
    pub wfs_jar: String,
    /// Mount point of the install tree inside the container.
    #[serde(default = "default_webapp_mount")]
    pub webapp_mount: Utf8PathBuf,
    /// Mount point of the data directory inside the container.
    #[serde(default = "default_data_mount")]
    pub data_mount: Utf8PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_dir: None,
            geomesa_home: None,
            cache_dir: None,
            install_dir: None,
            data_dir: None,
            download_url: default_download_url(),
            extensions: default_extensions(),
            image: default_image(),
            runtime: default_runtime(),
            debug_port: default_debug_port(),
            wfs_jar: default_wfs_jar(),
            webapp_mount: default_webapp_mount(),
            data_mount: default_data_mount(),
        }
    }
}

impl Settings {
    /// Project root, `.` when unset.
    pub fn project_dir(&self) -> Utf8PathBuf {
        self.project_dir
            .clone()
            .unwrap_or_else(|| Utf8PathBuf::from("."))
    }

    fn resolve(&self, dir: &Option<Utf8PathBuf>, fallback: &str) -> Utf8PathBuf {
        match dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.project_dir().join(dir),
            None => self.project_dir().join(fallback),
        }
    }

    /// GeoMesa checkout, `<project>/../geomesa` when unset.
    pub fn geomesa_home(&self) -> Utf8PathBuf {
        self.resolve(&self.geomesa_home, "../geomesa")
    }

    pub fn cache_dir(&self) -> Utf8PathBuf {
        self.resolve(&self.cache_dir, "target/geoserver/cache")
    }

    pub fn install_dir(&self) -> Utf8PathBuf {
        self.resolve(&self.install_dir, "target/geoserver/install")
    }

    pub fn data_dir(&self) -> Utf8PathBuf {
        self.resolve(&self.data_dir, "target/geoserver/data")
    }

    /// Container image for the given Java major version.
    pub fn image_for(&self, java_version: u32) -> String {
        self.image
            .replace(JAVA_PLACEHOLDER, &java_version.to_string())
    }

    /// Parsed download base URL.
    pub fn download_base(&self) -> Result<Url, ProvisionError> {
        Url::parse(&self.download_url).map_err(|e| {
            ProvisionError::Validation(format!("invalid download_url '{}': {}", self.download_url, e))
        })
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Validation` for an empty runtime, an image
    /// without the `{java}` placeholder, a malformed download URL, extension
    /// names that are empty or contain path separators, or a zero debug port.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        if self.runtime.trim().is_empty() {
            return Err(ProvisionError::Validation("runtime must not be empty".to_string()));
        }
        if !self.image.contains(JAVA_PLACEHOLDER) {
            return Err(ProvisionError::Validation(format!(
                "image '{}' must contain the {} placeholder",
                self.image, JAVA_PLACEHOLDER
            )));
        }
        self.download_base()?;
        for extension in &self.extensions {
            if extension.is_empty() || extension.contains(['/', '\\']) {
                return Err(ProvisionError::Validation(format!(
                    "invalid extension name '{}'",
                    extension
                )));
            }
        }
        if self.debug_port == 0 {
            return Err(ProvisionError::Validation("debug_port must not be 0".to_string()));
        }
        if self.wfs_jar.trim().is_empty() {
            return Err(ProvisionError::Validation("wfs_jar must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Loads settings from a YAML file, or returns defaults when `path` is `None`.
pub fn load_settings(path: Option<&Utf8Path>) -> Result<Settings, ProvisionError> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let file = File::open(path)
        .map_err(|e| ProvisionError::io(format!("failed to open settings file: {}", path), e))?;
    let reader = BufReader::new(file);
    serde_yaml::from_reader(reader)
        .map_err(|e| ProvisionError::Config(format!("failed to parse yaml: {}: {}", path, e)))
}
