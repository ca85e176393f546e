//! The provisioning workflow.
//!
//! A run is a linear sequence of guarded steps: decide whether the install
//! tree must be rebuilt, rebuild it if so, launch the server container, then
//! hand the data directory back to the host user. Downloads go through a
//! [`Fetcher`] and every external process through a [`CommandExecutor`], so
//! the whole flow runs against fakes in tests.

use std::fs;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use signal_hook::consts::SIGINT;
use strum::Display;
use tracing::{info, warn};
use url::Url;

use crate::archive;
use crate::cache::DownloadCache;
use crate::config::Settings;
use crate::container::{self, Owner};
use crate::error::ProvisionError;
use crate::executor::CommandExecutor;
use crate::fetch::Fetcher;
use crate::geomesa::{Bundle, BundleKind, Checkout};
use crate::installer;
use crate::layout::Layout;
use crate::wfs;

/// Why an install tree is rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RebuildReason {
    #[strum(serialize = "install tree does not exist")]
    Missing,
    #[strum(serialize = "reset requested")]
    Reset,
    #[strum(serialize = "plugin install requested")]
    PluginRequested,
}

/// Decides whether the install tree must be rebuilt, and why.
pub fn rebuild_reason(
    tree_exists: bool,
    reset: bool,
    plugin_requested: bool,
) -> Option<RebuildReason> {
    if reset {
        Some(RebuildReason::Reset)
    } else if plugin_requested {
        Some(RebuildReason::PluginRequested)
    } else if !tree_exists {
        Some(RebuildReason::Missing)
    } else {
        None
    }
}

/// True when the tree is missing, a reset was requested, or a plugin install was requested.
pub fn needs_rebuild(tree_exists: bool, reset: bool, plugin_requested: bool) -> bool {
    rebuild_reason(tree_exists, reset, plugin_requested).is_some()
}

/// One provisioning request, after CLI flags and settings are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub plugin: Option<String>,
    pub reset: bool,
    pub java_version: u32,
    pub debug: bool,
    pub geomesa_home: Utf8PathBuf,
}

/// Artifacts a plugin install needs, located before anything is deleted.
#[derive(Debug)]
struct PluginArtifacts {
    plugin: Bundle,
    tools: Bundle,
    wfs_jar: Utf8PathBuf,
}

fn to_absolute(path: &Utf8Path) -> Result<Utf8PathBuf, ProvisionError> {
    let absolute = std::path::absolute(path)
        .map_err(|e| ProvisionError::io(format!("failed to resolve path: {}", path), e))?;
    Utf8PathBuf::from_path_buf(absolute).map_err(|p| {
        ProvisionError::Validation(format!("path is not valid UTF-8: {}", p.display()))
    })
}

fn create_dir(dir: &Utf8Path) -> Result<(), ProvisionError> {
    fs::create_dir_all(dir)
        .map_err(|e| ProvisionError::io(format!("failed to create directory: {}", dir), e))
}

fn remove_dir(dir: &Utf8Path) -> Result<(), ProvisionError> {
    if dir.exists() {
        fs::remove_dir_all(dir)
            .map_err(|e| ProvisionError::io(format!("failed to remove directory: {}", dir), e))?;
    }
    Ok(())
}

/// SIGINT handling around the server container.
///
/// The container runtime receives Ctrl-C from the terminal and stops the
/// server; while the shield is raised this process only records the signal so
/// it can still run the ownership fixup. Lowered, SIGINT has its default action.
struct SigintShield {
    lowered: Arc<AtomicBool>,
    interrupted: Arc<AtomicBool>,
}

impl SigintShield {
    fn install() -> io::Result<Self> {
        let lowered = Arc::new(AtomicBool::new(true));
        let interrupted = Arc::new(AtomicBool::new(false));
        signal_hook::flag::register(SIGINT, Arc::clone(&interrupted))?;
        signal_hook::flag::register_conditional_default(SIGINT, Arc::clone(&lowered))?;
        Ok(Self {
            lowered,
            interrupted,
        })
    }

    fn raise(&self) {
        self.interrupted.store(false, Ordering::SeqCst);
        self.lowered.store(false, Ordering::SeqCst);
    }

    /// Restores the default action; returns whether SIGINT arrived while raised.
    fn lower(&self) -> bool {
        self.lowered.store(true, Ordering::SeqCst);
        self.interrupted.swap(false, Ordering::SeqCst)
    }
}

static SIGINT_SHIELD: LazyLock<Result<SigintShield, String>> =
    LazyLock::new(|| SigintShield::install().map_err(|e| e.to_string()));

fn sigint_shield() -> Result<&'static SigintShield, ProvisionError> {
    SIGINT_SHIELD.as_ref().map_err(|e| {
        ProvisionError::io("failed to install SIGINT handler", io::Error::other(e.clone()))
    })
}

/// Appends path segments to a base URL that may lack a trailing slash.
pub fn archive_url(base: &Url, segments: &[&str]) -> Result<Url, ProvisionError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ProvisionError::Validation(format!("download_url cannot be a base: {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub struct Provisioner {
    settings: Settings,
    layout: Layout,
    geoserver_version: String,
    cache: DownloadCache,
    executor: Arc<dyn CommandExecutor>,
    owner: Owner,
    dry_run: bool,
}

impl Provisioner {
    /// Creates a provisioner with absolute managed paths.
    pub fn new(
        settings: Settings,
        geoserver_version: impl Into<String>,
        fetcher: Arc<dyn Fetcher>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<Self, ProvisionError> {
        let geoserver_version = geoserver_version.into();
        let relative = Layout::new(&settings, &geoserver_version);
        let layout = Layout {
            cache_dir: to_absolute(&relative.cache_dir)?,
            install_dir: to_absolute(&relative.install_dir)?,
            install_tree: to_absolute(&relative.install_tree)?,
            data_dir: to_absolute(&relative.data_dir)?,
            tools_dir: to_absolute(&relative.tools_dir)?,
        };
        Ok(Self {
            cache: DownloadCache::new(layout.cache_dir.clone(), fetcher),
            settings,
            layout,
            geoserver_version,
            executor,
            owner: Owner::current(),
            dry_run: false,
        })
    }

    /// Logs container and installer commands instead of running them, and
    /// leaves the install tree untouched.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Overrides the owner the data directory is handed back to.
    #[must_use]
    pub fn with_owner(mut self, owner: Owner) -> Self {
        self.owner = owner;
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Runs the full workflow: prepare, rebuild if needed, launch.
    pub fn run(&self, request: &Request) -> Result<()> {
        let rebuilt = self.prepare(request)?;
        if !rebuilt {
            info!("reusing install tree {}", self.layout.install_tree);
        }
        self.launch(request)
    }

    /// Ensures the managed directories and, when needed, a fresh install tree.
    ///
    /// Returns whether a rebuild happened.
    pub fn prepare(&self, request: &Request) -> Result<bool> {
        if !self.dry_run {
            create_dir(&self.layout.cache_dir)?;
            create_dir(&self.layout.install_dir)?;
        }

        let reason = rebuild_reason(
            self.layout.install_tree.is_dir(),
            request.reset,
            request.plugin.is_some(),
        );
        let Some(reason) = reason else {
            return Ok(false);
        };

        info!(
            "rebuilding geoserver {} install tree: {}",
            self.geoserver_version, reason
        );
        if self.dry_run {
            info!("dry run: would rebuild {}", self.layout.install_tree);
            return Ok(true);
        }
        self.rebuild(request)?;
        Ok(true)
    }

    fn locate_plugin_artifacts(&self, name: &str, geomesa_home: &Utf8Path) -> Result<PluginArtifacts> {
        let checkout = Checkout::new(geomesa_home);
        let plugin = checkout.find(BundleKind::Plugin, name)?;
        let tools = checkout.find(BundleKind::Tools, name)?;
        let wfs_jar = wfs::find_wfs_jar(&self.settings.project_dir(), &self.settings.wfs_jar)?;
        Ok(PluginArtifacts {
            plugin,
            tools,
            wfs_jar,
        })
    }

    fn rebuild(&self, request: &Request) -> Result<()> {
        // Look everything up first so a bad plugin name leaves the old tree intact.
        let plugin = request
            .plugin
            .as_deref()
            .map(|name| self.locate_plugin_artifacts(name, &request.geomesa_home))
            .transpose()?;

        remove_dir(&self.layout.install_tree)?;
        self.install_base()
            .context("failed to install geoserver web application")?;

        if let Some(artifacts) = &plugin {
            self.install_plugin(artifacts)
                .with_context(|| format!("failed to install plugin {}", artifacts.plugin.name))?;
        }

        if request.reset {
            info!("removing data directory {}", self.layout.data_dir);
            remove_dir(&self.layout.data_dir)?;
        }
        Ok(())
    }

    fn install_base(&self) -> Result<()> {
        let version = self.geoserver_version.as_str();
        let base = self.settings.download_base()?;
        let lib_dir = self.layout.lib_dir();

        let war_url = archive_url(&base, &[version, &format!("geoserver-{}-war.zip", version)])?;
        let war = self.cache.get(&war_url)?;
        info!("extracting {}", war);
        archive::extract_webapp(&war, &self.layout.install_tree)?;

        for extension in &self.settings.extensions {
            let url = archive_url(
                &base,
                &[
                    version,
                    "extensions",
                    &format!("geoserver-{}-{}-plugin.zip", version, extension),
                ],
            )?;
            let zip = self.cache.get(&url)?;
            let report = archive::merge_zip_jars(&zip, &lib_dir)
                .with_context(|| format!("failed to merge extension {}", extension))?;
            info!(
                "merged extension {}: {} jar(s) added, {} already present",
                extension,
                report.added.len(),
                report.skipped.len()
            );
        }
        Ok(())
    }

    fn install_plugin(&self, artifacts: &PluginArtifacts) -> Result<()> {
        let lib_dir = self.layout.lib_dir();

        info!("installing plugin bundle {}", artifacts.plugin.path);
        let report = archive::merge_tar_gz_jars(&artifacts.plugin.path, &lib_dir)?;
        info!("plugin {}: {} jar(s) added", artifacts.plugin.name, report.added.len());

        create_dir(&self.layout.tools_dir)?;
        let dist = installer::extract_tools(&artifacts.tools, &self.layout.tools_dir)?;
        let staging = dist.join("dependencies");
        installer::install_dependencies(self.executor.as_ref(), &dist, &staging)?;
        if staging.is_dir() {
            let report = archive::merge_dir_jars(&staging, &lib_dir)?;
            info!(
                "dependencies: {} jar(s) added, {} already present",
                report.added.len(),
                report.skipped.len()
            );
        }

        wfs::install_wfs_jar(&artifacts.wfs_jar, &lib_dir)?;
        Ok(())
    }

    /// Runs the server container, then the ownership fixup.
    ///
    /// The fixup runs however the server ends (clean exit, failure, or the
    /// operator pressing Ctrl-C). A server error takes precedence over a
    /// fixup error.
    pub fn launch(&self, request: &Request) -> Result<()> {
        if !self.dry_run {
            create_dir(&self.layout.data_dir)?;
        }

        let server = container::server_command(
            &self.settings,
            &self.layout,
            request.java_version,
            request.debug,
        );
        if request.debug {
            info!("remote debugging on port {}", self.settings.debug_port);
        }
        info!(
            "starting geoserver {} with {}",
            self.geoserver_version,
            self.settings.image_for(request.java_version)
        );

        let shield = sigint_shield()?;
        shield.raise();
        let server_result = self
            .executor
            .execute(&server)
            .and_then(|result| Ok(result.ensure_success(&server)?))
            .context("geoserver container failed");
        if shield.lower() {
            info!("geoserver stopped by interrupt");
        }

        let chown = container::chown_command(&self.settings, &self.layout, request.java_version, self.owner);
        let chown_result = self
            .executor
            .execute(&chown)
            .and_then(|result| Ok(result.ensure_success(&chown)?))
            .with_context(|| format!("failed to restore ownership of {}", self.layout.data_dir));

        match (server_result, chown_result) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) => Err(e),
            (Ok(()), Err(e)) => Err(e),
            (Err(server_err), Err(chown_err)) => {
                warn!("ownership fixup also failed: {:#}", chown_err);
                Err(server_err)
            }
        }
    }
}
