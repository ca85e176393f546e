//! GeoServer version lookup from the project's Maven descriptor.

use std::fs;
use std::sync::LazyLock;

use camino::Utf8Path;
use regex::Regex;

use crate::error::ProvisionError;

static GEOSERVER_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<geoserver\.version>\s*([^<\s]+)\s*</geoserver\.version>")
        .expect("geoserver version pattern is valid")
});

/// Extracts the first `<geoserver.version>` property from pom text.
pub fn parse_geoserver_version(pom: &str) -> Option<String> {
    GEOSERVER_VERSION
        .captures(pom)
        .map(|caps| caps[1].to_string())
}

/// Reads the GeoServer version from `<project_dir>/pom.xml`.
pub fn read_geoserver_version(project_dir: &Utf8Path) -> Result<String, ProvisionError> {
    let pom = project_dir.join("pom.xml");
    let content = fs::read_to_string(&pom)
        .map_err(|e| ProvisionError::io(format!("failed to read build descriptor: {}", pom), e))?;
    let version = parse_geoserver_version(&content).ok_or_else(|| {
        ProvisionError::Config(format!("no <geoserver.version> property in {}", pom))
    })?;
    tracing::debug!("resolved geoserver version {} from {}", version, pom);
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_property() {
        let pom = r#"
            <properties>
                <geomesa.version>5.0.0</geomesa.version>
                <geoserver.version>2.24.2</geoserver.version>
            </properties>"#;
        assert_eq!(parse_geoserver_version(pom).as_deref(), Some("2.24.2"));
    }

    #[test]
    fn tolerates_whitespace_inside_element() {
        let pom = "<geoserver.version>\n  2.23-SNAPSHOT\n</geoserver.version>";
        assert_eq!(parse_geoserver_version(pom).as_deref(), Some("2.23-SNAPSHOT"));
    }

    #[test]
    fn missing_property_yields_none() {
        assert!(parse_geoserver_version("<geotools.version>30.2</geotools.version>").is_none());
    }

    #[test]
    fn read_reports_missing_pom() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let err = read_geoserver_version(root).unwrap_err();
        assert!(matches!(err, ProvisionError::Io { .. }));
    }

    #[test]
    fn read_reports_missing_property() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(root.join("pom.xml"), "<project/>").unwrap();
        let err = read_geoserver_version(root).unwrap_err();
        assert!(matches!(err, ProvisionError::Config(_)));
    }
}
