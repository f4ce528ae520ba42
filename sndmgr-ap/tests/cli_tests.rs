//! Argument and environment override tests
//!
//! Note: Uses serial_test to prevent environment variable races. Tests that
//! set SNDMGR_* variables are marked #[serial].

use clap::Parser;
use serial_test::serial;
use sndmgr_ap::cli::{Args, Mode};
use sndmgr_common::config::Config;
use std::env;
use std::io::Write;
use std::path::PathBuf;

const ENV_VARS: [&str; 5] = [
    "SNDMGR_CONFIG",
    "SNDMGR_BROKER_HOST",
    "SNDMGR_BROKER_PORT",
    "SNDMGR_SOUND_DIR",
    "SNDMGR_PLAYER",
];

fn clear_env() {
    for var in ENV_VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_default_mode_is_run() {
    clear_env();
    let args = Args::parse_from(["sndmgr-ap"]);
    assert_eq!(args.mode(), Mode::Run);
    assert!(args.host.is_none());
}

#[test]
#[serial]
fn test_publish_mode() {
    clear_env();
    let args = Args::parse_from([
        "sndmgr-ap",
        "publish",
        "manager/sound",
        r#"{"cmd":"stop"}"#,
        "--host",
        "10.0.0.5",
    ]);

    assert_eq!(
        args.mode(),
        Mode::Publish {
            topic: "manager/sound".to_string(),
            payload: r#"{"cmd":"stop"}"#.to_string(),
        }
    );
    assert_eq!(args.host.as_deref(), Some("10.0.0.5"));
}

#[test]
#[serial]
fn test_arguments_override_config() {
    clear_env();
    let args = Args::parse_from([
        "sndmgr-ap",
        "--host",
        "broker.lan",
        "--port",
        "1884",
        "--sound-dir",
        "/opt/sounds",
        "--player",
        "paplay",
    ]);

    let mut config = Config::default();
    args.apply(&mut config);

    assert_eq!(config.broker.host, "broker.lan");
    assert_eq!(config.broker.port, 1884);
    assert_eq!(config.sounds.dir, Some(PathBuf::from("/opt/sounds")));
    assert_eq!(config.player.program, "paplay");
    assert!(config.player.args.is_empty());
}

#[test]
#[serial]
fn test_environment_overrides() {
    clear_env();
    env::set_var("SNDMGR_BROKER_HOST", "env-broker");
    env::set_var("SNDMGR_BROKER_PORT", "2883");

    let args = Args::parse_from(["sndmgr-ap"]);
    let mut config = Config::default();
    args.apply(&mut config);

    assert_eq!(config.broker.host, "env-broker");
    assert_eq!(config.broker.port, 2883);
    // Untouched settings keep their defaults
    assert_eq!(config.broker.base_topic, "manager");

    clear_env();
}

#[test]
#[serial]
fn test_resolve_config_layers_file_and_arguments() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    writeln!(
        file,
        "[broker]\nhost = \"192.168.0.36\"\nport = 1885\n\n[sounds]\nextension = \"ogg\""
    )
    .expect("Failed to write config");

    let config_path = file.path().to_string_lossy().to_string();
    let args = Args::parse_from(["sndmgr-ap", "--config", config_path.as_str(), "--port", "1886"]);
    let config = args.resolve_config().expect("Config should resolve");

    assert_eq!(config.broker.host, "192.168.0.36");
    assert_eq!(config.broker.port, 1886);
    assert_eq!(config.sounds.extension, "ogg");
}

#[test]
#[serial]
fn test_blank_host_override_fails_validation() {
    clear_env();
    let args = Args::parse_from(["sndmgr-ap", "--host", " "]);
    let mut config = Config::default();
    args.apply(&mut config);
    assert!(config.validate().is_err());
}
