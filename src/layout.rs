//! Managed directory layout.
//!
//! This module only defines WHERE things live, not how they get there.

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::Settings;

/// Paths managed for one GeoServer version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Download cache directory
    pub cache_dir: Utf8PathBuf,
    /// Parent of every install tree
    pub install_dir: Utf8PathBuf,
    /// Unpacked web application for this version
    pub install_tree: Utf8PathBuf,
    /// GeoServer data directory
    pub data_dir: Utf8PathBuf,
    /// Extracted GeoMesa tools distributions
    pub tools_dir: Utf8PathBuf,
}

impl Layout {
    pub fn new(settings: &Settings, geoserver_version: &str) -> Self {
        let install_dir = settings.install_dir();
        Self {
            cache_dir: settings.cache_dir(),
            install_tree: install_dir.join(format!("geoserver-{}", geoserver_version)),
            tools_dir: install_dir.join("tools"),
            data_dir: settings.data_dir(),
            install_dir,
        }
    }

    /// `WEB-INF/lib` inside the install tree.
    pub fn lib_dir(&self) -> Utf8PathBuf {
        lib_dir_of(&self.install_tree)
    }
}

/// `WEB-INF/lib` of a web application root.
pub fn lib_dir_of(webapp: &Utf8Path) -> Utf8PathBuf {
    webapp.join("WEB-INF").join("lib")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_tree_is_versioned() {
        let settings = Settings {
            project_dir: Some(Utf8PathBuf::from("/p")),
            ..Settings::default()
        };
        let layout = Layout::new(&settings, "2.24.2");
        assert_eq!(
            layout.install_tree,
            Utf8PathBuf::from("/p/target/geoserver/install/geoserver-2.24.2")
        );
        assert_eq!(
            layout.lib_dir(),
            Utf8PathBuf::from("/p/target/geoserver/install/geoserver-2.24.2/WEB-INF/lib")
        );
        assert_eq!(layout.tools_dir, Utf8PathBuf::from("/p/target/geoserver/install/tools"));
    }
}
