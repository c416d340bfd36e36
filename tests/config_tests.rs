use std::fs;
use std::path::PathBuf;

use barprobe::config::Config;
use barprobe::domain::AccountType;
use barprobe::error::{ConfigError, Error};
use tempfile::TempDir;

fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("barprobe.toml");
    fs::write(&path, contents).expect("write temp config");
    path
}

#[test]
fn loads_file_from_explicit_path() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
trader_id = "CI-PROBE-001"

[client]
account_type = "spot"
api_key_env = "SPOT_KEY"
api_secret_env = "SPOT_SECRET"

[probe]
instrument_id = "ETHUSDT.BINANCE"
bar_type = "ETHUSDT.BINANCE-1-SECOND-LAST-EXTERNAL"
first_wait_secs = 5
total_wait_secs = 20
"#,
    );

    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.trader_id, "CI-PROBE-001");
    assert_eq!(config.client.account_type, AccountType::Spot);
    assert!(config.client.testnet);
    assert_eq!(config.client.api_key_env, "SPOT_KEY");
    assert_eq!(config.wait_policy().total_wait.as_secs(), 20);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    match Config::load(Some(&path)) {
        Err(Error::Config(ConfigError::ReadFile { path: reported, .. })) => {
            assert!(reported.ends_with("absent.toml"));
        }
        other => panic!("Expected ReadFile error, got {other:?}"),
    }
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[probe\nbar_type = 1");

    assert!(matches!(
        Config::load(Some(&path)),
        Err(Error::Config(ConfigError::Parse(_)))
    ));
}

#[test]
fn unknown_account_type_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[client]\naccount_type = \"margin\"\n");

    assert!(matches!(
        Config::load(Some(&path)),
        Err(Error::Config(ConfigError::Parse(_)))
    ));
}

#[test]
fn invalid_bar_type_in_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[probe]\nbar_type = \"BTCUSDT-PERP.BINANCE-0-MINUTE-LAST-EXTERNAL\"\n");

    assert!(matches!(
        Config::load(Some(&path)),
        Err(Error::Config(ConfigError::InvalidValue {
            field: "probe.bar_type",
            ..
        }))
    ));
}
