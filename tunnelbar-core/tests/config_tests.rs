//! Tests for settings loading and profile validation

use std::time::Duration;
use tempfile::tempdir;
use tunnelbar_core::config::ovpn::validate_profile;
use tunnelbar_core::config::toml_config::{
    get_config_dir, get_settings_path, load_settings, load_settings_from_path, parse_settings,
};
use tunnelbar_core::config::Settings;
use tunnelbar_core::error::{StartupError, TunnelbarError};

#[test]
fn test_default_settings() {
    let settings = Settings::default();

    assert_eq!(settings.binary, "openvpn");
    assert!(settings.extra_args.is_empty());
    assert_eq!(settings.privilege_command, vec!["sudo".to_string()]);
    assert!(settings.elevated());
    assert_eq!(settings.log_file, None);
    assert_eq!(settings.connect_timeout(), None);
    assert!(settings.echo_output);
    assert_eq!(settings.stop_grace(), Duration::from_millis(3000));
    assert!(settings.validate().is_ok());
}

#[test]
fn test_parse_full_settings() {
    let toml_content = r#"
binary = "/usr/sbin/openvpn"
extra_args = ["--verb", "3"]
privilege_command = []
log_file = "/var/tmp/vpn.log"
connect_timeout_secs = 20
echo_output = false
stop_grace_millis = 1500
"#;

    let settings = parse_settings(toml_content).unwrap();

    assert_eq!(settings.binary, "/usr/sbin/openvpn");
    assert_eq!(settings.extra_args, vec!["--verb", "3"]);
    assert!(!settings.elevated());
    assert_eq!(settings.log_file.as_deref(), Some(std::path::Path::new("/var/tmp/vpn.log")));
    assert_eq!(settings.connect_timeout(), Some(Duration::from_secs(20)));
    assert!(!settings.echo_output);
    assert_eq!(settings.stop_grace(), Duration::from_millis(1500));
}

#[test]
fn test_partial_settings_keep_defaults() {
    let settings = parse_settings("connect_timeout_secs = 15\n").unwrap();

    assert_eq!(settings.binary, "openvpn");
    assert_eq!(settings.privilege_command, vec!["sudo".to_string()]);
    assert_eq!(settings.connect_timeout_secs, Some(15));
}

#[test]
fn test_malformed_settings_is_toml_error() {
    let result = parse_settings("binary = [");
    assert!(matches!(result, Err(TunnelbarError::Toml(_))));
}

#[test]
fn test_load_settings_from_path() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "binary = \"openvpn2\"\n").unwrap();

    let settings = load_settings_from_path(&path).unwrap();
    assert_eq!(settings.binary, "openvpn2");
}

// The only test in this binary touching TUNNELBAR_CONFIG_DIR
#[test]
fn test_config_dir_override() {
    let temp_dir = tempdir().unwrap();
    std::env::set_var("TUNNELBAR_CONFIG_DIR", temp_dir.path());

    assert_eq!(get_config_dir().unwrap(), temp_dir.path());
    assert_eq!(get_settings_path().unwrap(), temp_dir.path().join("config.toml"));

    // No file yet: defaults
    assert_eq!(load_settings().unwrap(), Settings::default());

    std::fs::write(temp_dir.path().join("config.toml"), "stop_grace_millis = 250\n").unwrap();
    assert_eq!(load_settings().unwrap().stop_grace_millis, 250);

    std::env::remove_var("TUNNELBAR_CONFIG_DIR");
}

#[test]
fn test_validate_profile() {
    let temp_dir = tempdir().unwrap();

    let valid = temp_dir.path().join("client.ovpn");
    std::fs::write(&valid, "client\nremote vpn.example.com 1194\n").unwrap();
    assert!(validate_profile(&valid).is_ok());

    let dev_only = temp_dir.path().join("p2p.conf");
    std::fs::write(&dev_only, "dev tun0\nsecret static.key\n").unwrap();
    assert!(validate_profile(&dev_only).is_ok());

    let invalid = temp_dir.path().join("empty.ovpn");
    std::fs::write(&invalid, "").unwrap();
    assert!(matches!(
        validate_profile(&invalid),
        Err(StartupError::InvalidConfig { .. })
    ));

    let missing = temp_dir.path().join("missing.ovpn");
    assert!(matches!(
        validate_profile(&missing),
        Err(StartupError::ConfigNotFound { .. })
    ));

    assert!(matches!(
        validate_profile(temp_dir.path()),
        Err(StartupError::ConfigUnreadable { .. })
    ));
}
