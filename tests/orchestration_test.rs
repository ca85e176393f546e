mod helpers;

use std::fs;
use std::sync::Arc;

use gsprovision::cli::{LogLevel, RunArgs};
use gsprovision::config::load_settings;
use gsprovision::error::{EXIT_USAGE, exit_code_for};
use gsprovision::{resolve_request, run};
use helpers::{FakeExecutor, FakeFetcher, Workspace};

fn write_config(ws: &Workspace) -> camino::Utf8PathBuf {
    let path = ws.project.join("gsprovision.yml");
    fs::write(
        &path,
        format!(
            "project_dir: {}\ngeomesa_home: {}\nextensions: [wps]\n",
            ws.project, ws.geomesa
        ),
    )
    .unwrap();
    path
}

fn args(config: camino::Utf8PathBuf) -> RunArgs {
    RunArgs {
        java_version: 11,
        config: Some(config),
        log_level: LogLevel::Error,
        ..RunArgs::default()
    }
}

#[test]
fn run_reads_version_from_pom_and_provisions() {
    let ws = Workspace::new();
    let fetcher = Arc::new(FakeFetcher::geoserver_release());
    let executor = Arc::new(FakeExecutor::default());
    let opts = RunArgs {
        plugin: Some("hbase".to_string()),
        ..args(write_config(&ws))
    };

    run(&opts, fetcher.clone(), executor.clone()).expect("run should succeed");

    assert!(ws.lib_dir().join(helpers::WFS_JAR).is_file());
    assert!(
        fetcher
            .fetched()
            .iter()
            .all(|url| url.contains("/GeoServer/2.24.2/")),
        "urls: {:?}",
        fetcher.fetched()
    );
    assert_eq!(executor.calls().len(), 3);
}

#[test]
fn geomesa_home_flag_overrides_settings() {
    let ws = Workspace::new();
    let settings = load_settings(Some(&write_config(&ws))).unwrap();
    let opts = RunArgs {
        geomesa_home: Some("/elsewhere/geomesa".into()),
        ..args(write_config(&ws))
    };

    let request = resolve_request(&opts, &settings);
    assert_eq!(request.geomesa_home.as_str(), "/elsewhere/geomesa");

    let request = resolve_request(&args(write_config(&ws)), &settings);
    assert_eq!(request.geomesa_home, ws.geomesa);
}

#[test]
fn invalid_plugin_name_is_a_usage_error_without_side_effects() {
    let ws = Workspace::new();
    let fetcher = Arc::new(FakeFetcher::geoserver_release());
    let executor = Arc::new(FakeExecutor::default());
    let opts = RunArgs {
        plugin: Some("../hbase".to_string()),
        ..args(write_config(&ws))
    };

    let err = run(&opts, fetcher.clone(), executor.clone()).unwrap_err();

    assert_eq!(exit_code_for(&err), EXIT_USAGE);
    assert!(!ws.project.join("target").exists());
    assert!(fetcher.fetched().is_empty());
    assert!(executor.calls().is_empty());
}

#[test]
fn invalid_settings_fail_before_provisioning() {
    let ws = Workspace::new();
    let config = ws.project.join("bad.yml");
    fs::write(&config, format!("project_dir: {}\nimage: tomcat:9\n", ws.project)).unwrap();
    let fetcher = Arc::new(FakeFetcher::geoserver_release());
    let executor = Arc::new(FakeExecutor::default());

    let err = run(&args(config), fetcher, executor.clone()).unwrap_err();

    assert!(format!("{:#}", err).contains("settings validation failed"));
    assert!(executor.calls().is_empty());
}

#[test]
fn unknown_settings_key_is_a_config_error() {
    let ws = Workspace::new();
    let config = ws.project.join("typo.yml");
    fs::write(&config, "extentions: [wps]\n").unwrap();

    let err = load_settings(Some(&config)).unwrap_err();
    assert!(matches!(err, gsprovision::ProvisionError::Config(_)));
}
