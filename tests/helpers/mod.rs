use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use gsprovision::ProvisionError;
use gsprovision::config::Settings;
use gsprovision::executor::{CommandExecutor, CommandSpec, ExecutionResult};
use gsprovision::fetch::Fetcher;
use url::Url;
use zip::write::FileOptions;

pub const GEOSERVER_VERSION: &str = "2.24.2";

/// Jars shipped in the fake GeoServer war.
#[allow(dead_code)]
pub const BASE_JARS: &[&str] = &["gs-main-2.24.2.jar", "gt-main-30.2.jar"];
/// Jars shipped in the fake WPS extension.
#[allow(dead_code)]
pub const WPS_JARS: &[&str] = &["gs-wps-core-2.24.2.jar"];
/// Jars shipped in the fake hbase plugin bundle.
#[allow(dead_code)]
pub const PLUGIN_JARS: &[&str] = &["geomesa-hbase-gs-plugin_2.12-5.0.0.jar"];
/// Jar the fake dependency installer downloads.
#[allow(dead_code)]
pub const DEPENDENCY_JAR: &str = "hbase-client-2.5.7.jar";
#[allow(dead_code)]
pub const WFS_JAR: &str = "geomesa-gs-wfs-1.0.0.jar";

pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(*name, FileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn write_tar_gz(path: &Utf8Path, entries: &[(&str, &[u8], u32)]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let encoder =
        flate2::write::GzEncoder::new(File::create(path).unwrap(), flate2::Compression::fast());
    let mut builder = tar::Builder::new(encoder);
    for (name, data, mode) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(*mode);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

/// Serves archives by URL file name and counts every fetch.
pub struct FakeFetcher {
    archives: HashMap<String, Vec<u8>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    /// A release with a war distribution and a `wps` extension.
    pub fn geoserver_release() -> Self {
        let base: Vec<(String, Vec<u8>)> = BASE_JARS
            .iter()
            .map(|jar| (format!("WEB-INF/lib/{}", jar), b"base".to_vec()))
            .chain([("WEB-INF/web.xml".to_string(), b"<web-app/>".to_vec())])
            .collect();
        let base_refs: Vec<(&str, &[u8])> =
            base.iter().map(|(n, d)| (n.as_str(), d.as_slice())).collect();
        let war = zip_bytes(&base_refs);
        let distribution = zip_bytes(&[("LICENSE.txt", b"license"), ("geoserver.war", &war)]);

        // The extension also carries a base jar, which must not replace the war's copy.
        let wps = zip_bytes(&[
            (WPS_JARS[0], b"wps".as_slice()),
            (BASE_JARS[0], b"extension copy".as_slice()),
        ]);

        let mut archives = HashMap::new();
        archives.insert(format!("geoserver-{}-war.zip", GEOSERVER_VERSION), distribution);
        archives.insert(format!("geoserver-{}-wps-plugin.zip", GEOSERVER_VERSION), wps);
        Self {
            archives,
            fetched: Mutex::new(Vec::new()),
        }
    }

    #[allow(dead_code)]
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl Fetcher for FakeFetcher {
    fn fetch(&self, url: &Url, dest: &mut dyn Write) -> Result<u64, ProvisionError> {
        let name = url.path_segments().unwrap().next_back().unwrap().to_string();
        self.fetched.lock().unwrap().push(url.to_string());
        let data = self.archives.get(&name).ok_or_else(|| ProvisionError::Download {
            url: url.to_string(),
            status: "404 Not Found".to_string(),
        })?;
        dest.write_all(data).unwrap();
        Ok(data.len() as u64)
    }
}

/// Records every command; simulates the dependency installer and can fail the server run.
#[derive(Default)]
pub struct FakeExecutor {
    calls: Mutex<Vec<CommandSpec>>,
    pub fail_server: bool,
}

impl FakeExecutor {
    #[allow(dead_code)]
    pub fn failing_server() -> Self {
        Self {
            fail_server: true,
            ..Self::default()
        }
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn is_server_run(spec: &CommandSpec) -> bool {
    spec.args.iter().any(|a| a == "--network")
}

#[allow(dead_code)]
pub fn is_chown_run(spec: &CommandSpec) -> bool {
    spec.args.iter().any(|a| a == "chown")
}

#[allow(dead_code)]
pub fn is_installer_run(spec: &CommandSpec) -> bool {
    spec.command == "bash"
}

impl CommandExecutor for FakeExecutor {
    fn execute(&self, spec: &CommandSpec) -> anyhow::Result<ExecutionResult> {
        self.calls.lock().unwrap().push(spec.clone());
        if spec.command == "bash" {
            let staging = Utf8Path::new(&spec.args[1]);
            fs::create_dir_all(staging)?;
            fs::write(staging.join(DEPENDENCY_JAR), b"dependency")?;
            // Collides with a base jar; the merge must keep the base copy.
            fs::write(staging.join(BASE_JARS[1]), b"installer copy")?;
        }
        if self.fail_server && is_server_run(spec) {
            anyhow::bail!("simulated server failure");
        }
        Ok(ExecutionResult { status: None })
    }
}

/// A scratch project, GeoMesa checkout, and settings pointing at them.
pub struct Workspace {
    _tmp: tempfile::TempDir,
    pub project: Utf8PathBuf,
    pub geomesa: Utf8PathBuf,
}

impl Workspace {
    /// Project with a pom and a built WFS jar; checkout with a built hbase
    /// backend and an unbuilt accumulo plugin module.
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(tmp.path()).unwrap().to_path_buf();
        let project = root.join("project");
        let geomesa = root.join("geomesa");

        fs::create_dir_all(project.join("geomesa-gs-wfs/target")).unwrap();
        fs::write(
            project.join("pom.xml"),
            format!(
                "<project><properties><geoserver.version>{}</geoserver.version></properties></project>",
                GEOSERVER_VERSION
            ),
        )
        .unwrap();
        fs::write(project.join("geomesa-gs-wfs/target").join(WFS_JAR), b"wfs").unwrap();

        write_tar_gz(
            &geomesa.join(
                "geomesa-hbase/geomesa-hbase-gs-plugin/target/geomesa-hbase-gs-plugin_2.12-5.0.0-install.tar.gz",
            ),
            &[(PLUGIN_JARS[0], b"plugin", 0o644)],
        );
        write_tar_gz(
            &geomesa.join("geomesa-hbase/geomesa-hbase-dist/target/geomesa-hbase_2.12-5.0.0-bin.tar.gz"),
            &[
                (
                    "geomesa-hbase_2.12-5.0.0/bin/install-dependencies.sh",
                    b"#!/usr/bin/env bash\n",
                    0o755,
                ),
                ("geomesa-hbase_2.12-5.0.0/lib/geomesa-tools.jar", b"tools", 0o644),
            ],
        );
        fs::create_dir_all(geomesa.join("geomesa-accumulo/geomesa-accumulo-gs-plugin")).unwrap();

        Self {
            _tmp: tmp,
            project,
            geomesa,
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            project_dir: Some(self.project.clone()),
            geomesa_home: Some(self.geomesa.clone()),
            ..Settings::default()
        }
    }

    #[allow(dead_code)]
    pub fn lib_dir(&self) -> Utf8PathBuf {
        self.project
            .join("target/geoserver/install")
            .join(format!("geoserver-{}", GEOSERVER_VERSION))
            .join("WEB-INF/lib")
    }

    #[allow(dead_code)]
    pub fn data_dir(&self) -> Utf8PathBuf {
        self.project.join("target/geoserver/data")
    }

    #[allow(dead_code)]
    pub fn cache_dir(&self) -> Utf8PathBuf {
        self.project.join("target/geoserver/cache")
    }
}

/// Sorted file names in a directory.
#[allow(dead_code)]
pub fn file_names(dir: &Utf8Path) -> Vec<String> {
    let mut names: Vec<String> = dir
        .read_dir_utf8()
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string())
        .collect();
    names.sort();
    names
}
