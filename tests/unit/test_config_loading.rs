//! Unit Tests for Configuration Loading

use pwsh_bridge::config::loader::{validate_config, ConfigLoader, LoadOptions};
use pwsh_bridge::{load_config, Error, SessionConfig, Signature};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const FULL_TOML: &str = r#"
additional_shells = ["pwsh-preview"]
shell_args = ["-NoLogo", "-NoProfile", "-NonInteractive"]
auto_start = false

[timeouts]
startup_ms = 15000
command_ms = 0

[libraries."C:\\Windows\\System32\\user32.dll"]
MessageBeep = ["bool", "uint"]
GetDoubleClickTime = ["uint"]

[libraries."/usr/lib/libm.so"]
signgam = ["int", "@"]
"#;

#[test]
fn test_load_full_toml() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("session.toml");
    fs::write(&path, FULL_TOML).unwrap();

    let config = ConfigLoader::load_from_path(&path).unwrap();
    assert_eq!(config.additional_shells, vec!["pwsh-preview"]);
    assert_eq!(config.shell_args.len(), 3);
    assert!(!config.auto_start);

    assert_eq!(config.timeouts.startup(), Duration::from_secs(15));
    assert_eq!(config.timeouts.command_ms, 0);
    // Unset keys keep their defaults
    assert_eq!(
        config.timeouts.shutdown_grace_ms,
        SessionConfig::default().timeouts.shutdown_grace_ms
    );

    let user32 = &config.libraries["C:\\Windows\\System32\\user32.dll"];
    assert_eq!(user32["MessageBeep"], Signature::callable("bool", ["uint"]));
    assert_eq!(user32["GetDoubleClickTime"], Signature::callable("uint", Vec::<String>::new()));
    assert_eq!(config.libraries["/usr/lib/libm.so"]["signgam"], Signature::field("int"));
}

#[test]
fn test_load_json() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("session.json");
    fs::write(
        &path,
        r#"{ "additional_shells": ["pwsh7"], "libraries": { "kernel32.dll": { "Beep": ["bool", "uint", "uint"] } } }"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_path(&path).unwrap();
    assert_eq!(config.additional_shells, vec!["pwsh7"]);
    assert!(config.auto_start);
    assert_eq!(
        config.libraries["kernel32.dll"]["Beep"],
        Signature::callable("bool", ["uint", "uint"])
    );
}

#[test]
fn test_save_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = SessionConfig::default().with_shell("pwsh-lts");
    config
        .libraries
        .entry("kernel32.dll".to_string())
        .or_default()
        .insert("LastCode".to_string(), Signature::field("int"));

    for name in ["nested/config.toml", "config.json"] {
        let path = temp_dir.path().join(name);
        ConfigLoader::save_to_path(&config, &path).unwrap();
        assert_eq!(ConfigLoader::load_from_path(&path).unwrap(), config);
    }
}

#[test]
fn test_search_path_discovery() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("config.toml"),
        "additional_shells = [\"found-it\"]\n",
    )
    .unwrap();

    let mut loader = ConfigLoader::new();
    loader.set_search_path(temp_dir.path().to_path_buf());
    let config = loader.load_with_options(LoadOptions::default()).unwrap();
    assert_eq!(config.additional_shells, vec!["found-it"]);
    assert_eq!(
        loader.current_path(),
        Some(temp_dir.path().join("config.toml").as_path())
    );
}

#[test]
fn test_parse_errors_are_reported() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    fs::write(&path, "timeouts = \"soon\"").unwrap();

    assert!(matches!(
        ConfigLoader::load_from_path(&path),
        Err(Error::ConfigParseFailed { .. })
    ));
}

#[test]
fn test_bad_signature_is_a_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("session.toml");
    fs::write(&path, "[libraries.\"libm.so\"]\nsigngam = [\"void\", \"@\"]\n").unwrap();

    assert!(matches!(
        ConfigLoader::load_from_path(&path),
        Err(Error::ConfigParseFailed { .. })
    ));
}

#[test]
fn test_validation_rejects_unusable_values() {
    let mut config = SessionConfig::default();
    config.timeouts.startup_ms = 0;
    assert!(matches!(
        validate_config(&config),
        Err(Error::ConfigValidationFailed { field, .. }) if field == "timeouts.startup_ms"
    ));

    let config = SessionConfig::default().with_shell("  ");
    assert!(validate_config(&config).is_err());

    let mut config = SessionConfig::default();
    config.libraries.insert("readme.md".to_string(), Default::default());
    assert!(matches!(
        validate_config(&config),
        Err(Error::ConfigValidationFailed { field, .. }) if field == "libraries.readme.md"
    ));
}

#[test]
fn test_explicit_path_must_exist() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.toml");
    assert!(matches!(
        load_config(Some(&missing)),
        Err(Error::ConfigLoadFailed { .. })
    ));

    let unknown = temp_dir.path().join("config.yaml");
    fs::write(&unknown, "a: 1").unwrap();
    assert!(matches!(
        load_config(Some(&unknown)),
        Err(Error::ConfigLoadFailed { .. })
    ));
}
