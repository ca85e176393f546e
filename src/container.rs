//! Container invocations for running GeoServer.
//!
//! Two commands are built here: the server run, and the short-lived run that
//! hands the bind-mounted data directory back to the invoking host user.

use camino::Utf8Path;

use crate::config::Settings;
use crate::executor::CommandSpec;
use crate::layout::Layout;

/// Tomcat property disabling per-jar TLD and annotation scanning.
pub const JAR_SCAN_SKIP: &str = "tomcat.util.scan.StandardJarScanFilter.jarsToSkip=*.jar";

/// Mount point of the data directory inside the ownership fixup container.
const CHOWN_MOUNT: &str = "/data";

/// Host user and group that should own the data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

impl Owner {
    /// The user and group of this process.
    pub fn current() -> Self {
        Self {
            uid: rustix::process::getuid().as_raw(),
            gid: rustix::process::getgid().as_raw(),
        }
    }
}

/// JDWP agent options listening on `port` without suspending startup.
pub fn debug_agent(port: u16) -> String {
    format!(
        "-agentlib:jdwp=transport=dt_socket,server=y,suspend=n,address=*:{}",
        port
    )
}

/// Entrypoint script: patch Tomcat's jar scanning, then start normally.
pub fn entrypoint_script() -> String {
    format!(
        "echo '{}' >> \"$CATALINA_HOME/conf/catalina.properties\" && exec catalina.sh run",
        JAR_SCAN_SKIP
    )
}

fn bind(host: &Utf8Path, container: &Utf8Path) -> String {
    format!("{}:{}", host, container)
}

/// Builds the GeoServer server container command.
pub fn server_command(settings: &Settings, layout: &Layout, java_version: u32, debug: bool) -> CommandSpec {
    let mut args = vec![
        "run".to_string(),
        "--rm".to_string(),
        "--network".to_string(),
        "host".to_string(),
        "-v".to_string(),
        bind(&layout.install_tree, &settings.webapp_mount),
        "-v".to_string(),
        bind(&layout.data_dir, &settings.data_mount),
        "-e".to_string(),
        format!("GEOSERVER_DATA_DIR={}", settings.data_mount),
    ];
    if debug {
        args.push("-e".to_string());
        args.push(format!("JAVA_OPTS={}", debug_agent(settings.debug_port)));
    }
    args.push(settings.image_for(java_version));
    args.push("sh".to_string());
    args.push("-c".to_string());
    args.push(entrypoint_script());

    CommandSpec::new(settings.runtime.clone(), args)
}

/// Builds the command that recursively hands the data directory to `owner`.
pub fn chown_command(settings: &Settings, layout: &Layout, java_version: u32, owner: Owner) -> CommandSpec {
    CommandSpec::new(
        settings.runtime.clone(),
        vec![
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            bind(&layout.data_dir, Utf8Path::new(CHOWN_MOUNT)),
            settings.image_for(java_version),
            "chown".to_string(),
            "-R".to_string(),
            format!("{}:{}", owner.uid, owner.gid),
            CHOWN_MOUNT.to_string(),
        ],
    )
}
