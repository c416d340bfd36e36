//! Probe configuration loading and validation.
//!
//! Configuration is loaded from an optional TOML file. API credentials are
//! never read from the file: they come from the environment variables named
//! in `[client]` (loaded from `.env` by the binary).

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::{AccountType, BarType, ClientId, CompletionSignal, InstrumentId, TraderId};
use crate::error::{ConfigError, Result};
use crate::probe::{BarProbeConfig, WaitPolicy};
use crate::runtime::{Credentials, DataClientConfig, TradingNodeConfig};

/// Config file used when no path is given. Missing is fine.
pub const DEFAULT_CONFIG_PATH: &str = "barprobe.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub trader_id: String,
    pub client: ClientConfig,
    pub probe: ProbeConfig,
    pub logging: LoggingConfig,
}

/// Data client connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Key the client config and its factory are registered under.
    pub id: String,
    pub account_type: AccountType,
    pub testnet: bool,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Environment variable holding the API secret.
    pub api_secret_env: String,
    pub http_url: Option<String>,
    pub ws_url: Option<String>,
}

/// What to probe and how long to wait.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub instrument_id: String,
    pub bar_type: String,
    /// Seconds before the slow-start hint is logged.
    pub first_wait_secs: u64,
    /// Total seconds to wait for the first bar.
    pub total_wait_secs: u64,
    /// Exit non-zero when the probe times out or aborts.
    pub strict: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`.
    pub format: String,
    /// Level for runtime and adapter internals.
    pub runtime_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trader_id: "TESTNET-TRADER-002".into(),
            client: ClientConfig::default(),
            probe: ProbeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            id: "BINANCE-FUTURES-TESTNET".into(),
            account_type: AccountType::UsdtFutures,
            testnet: true,
            api_key_env: "BINANCE_TESTNET_API_KEY".into(),
            api_secret_env: "BINANCE_TESTNET_API_SECRET".into(),
            http_url: None,
            ws_url: None,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            instrument_id: "BTCUSDT-PERP.BINANCE".into(),
            bar_type: "BTCUSDT-PERP.BINANCE-1-MINUTE-LAST-EXTERNAL".into(),
            first_wait_secs: 15,
            total_wait_secs: 60,
            strict: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
            runtime_level: "warn".into(),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// With `Some(path)` the file must exist. With `None`,
    /// [`DEFAULT_CONFIG_PATH`] is used if present and built-in defaults
    /// otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if !default.exists() {
                    let config = Self::default();
                    config.validate()?;
                    return Ok(config);
                }
                default
            }
        };

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.client.id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "client.id",
                reason: "must not be empty".into(),
            }
            .into());
        }
        if self.client.api_key_env.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "client.api_key_env" }.into());
        }
        if self.client.api_secret_env.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "client.api_secret_env" }.into());
        }
        self.trader_id()?;
        let instrument_id = self.instrument_id()?;
        let bar_type = self.bar_type()?;
        if bar_type.instrument_id() != &instrument_id {
            return Err(ConfigError::InvalidValue {
                field: "probe.bar_type",
                reason: format!(
                    "bar type instrument {} does not match instrument_id {instrument_id}",
                    bar_type.instrument_id()
                ),
            }
            .into());
        }
        if self.probe.first_wait_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "probe.first_wait_secs",
                reason: "must be greater than zero".into(),
            }
            .into());
        }
        if self.probe.first_wait_secs > self.probe.total_wait_secs {
            return Err(ConfigError::InvalidValue {
                field: "probe.total_wait_secs",
                reason: format!(
                    "{} is shorter than first_wait_secs {}",
                    self.probe.total_wait_secs, self.probe.first_wait_secs
                ),
            }
            .into());
        }
        Ok(())
    }

    pub fn trader_id(&self) -> Result<TraderId> {
        self.trader_id.parse().map_err(|e| {
            ConfigError::InvalidValue {
                field: "trader_id",
                reason: format!("{e}"),
            }
            .into()
        })
    }

    pub fn instrument_id(&self) -> Result<InstrumentId> {
        self.probe.instrument_id.parse().map_err(|e| {
            ConfigError::InvalidValue {
                field: "probe.instrument_id",
                reason: format!("{e}"),
            }
            .into()
        })
    }

    pub fn bar_type(&self) -> Result<BarType> {
        self.probe.bar_type.parse().map_err(|e| {
            ConfigError::InvalidValue {
                field: "probe.bar_type",
                reason: format!("{e}"),
            }
            .into()
        })
    }

    #[must_use]
    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            first_wait: Duration::from_secs(self.probe.first_wait_secs),
            total_wait: Duration::from_secs(self.probe.total_wait_secs),
        }
    }

    /// Read the API key pair from the process environment.
    pub fn credentials(&self) -> std::result::Result<Credentials, ConfigError> {
        self.credentials_from(|name| std::env::var(name).ok())
    }

    /// Read the API key pair through `lookup`. Empty values count as missing.
    pub fn credentials_from<F>(&self, lookup: F) -> std::result::Result<Credentials, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingCredential {
                    var: var.to_string(),
                })
        };
        Ok(Credentials {
            api_key: read(&self.client.api_key_env)?,
            api_secret: read(&self.client.api_secret_env)?,
        })
    }

    pub fn node_config(&self, credentials: Credentials) -> Result<TradingNodeConfig> {
        let client = DataClientConfig {
            credentials,
            account_type: self.client.account_type,
            testnet: self.client.testnet,
            http_url: self.client.http_url.clone(),
            ws_url: self.client.ws_url.clone(),
        };
        Ok(TradingNodeConfig {
            trader_id: self.trader_id()?,
            data_clients: BTreeMap::from([(ClientId::new(self.client.id.clone()), client)]),
        })
    }

    pub fn probe_config(&self, signal: CompletionSignal) -> Result<BarProbeConfig> {
        Ok(BarProbeConfig {
            instrument_id: self.instrument_id()?,
            bar_type: self.bar_type()?,
            signal: Some(signal),
        })
    }

    /// Build the log filter: `RUST_LOG` wins, else the configured levels.
    #[must_use]
    pub fn log_filter(&self) -> String {
        let runtime = &self.logging.runtime_level;
        format!(
            "{},barprobe::runtime={runtime},barprobe::adapter={runtime}",
            self.logging.level
        )
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.log_filter()));

        match self.logging.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.wait_policy(), WaitPolicy::default());
        assert!(config.client.testnet);
        assert_eq!(config.client.account_type, AccountType::UsdtFutures);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.trader_id, "TESTNET-TRADER-002");
        assert_eq!(config.probe.total_wait_secs, 60);
    }

    #[test]
    fn parses_full_file() {
        let config = Config::from_toml_str(
            r#"
trader_id = "CI-PROBE-001"

[client]
id = "BINANCE-SPOT-TESTNET"
account_type = "spot"
testnet = true
api_key_env = "SPOT_KEY"
api_secret_env = "SPOT_SECRET"

[probe]
instrument_id = "ETHUSDT.BINANCE"
bar_type = "ETHUSDT.BINANCE-1-MINUTE-LAST-EXTERNAL"
first_wait_secs = 5
total_wait_secs = 30
strict = true

[logging]
level = "debug"
format = "json"
"#,
        )
        .unwrap();

        assert_eq!(config.client.account_type, AccountType::Spot);
        assert_eq!(config.wait_policy().first_wait, Duration::from_secs(5));
        assert!(config.probe.strict);
        assert_eq!(config.logging.runtime_level, "warn");
    }

    #[test]
    fn rejects_mismatched_bar_type() {
        let err = Config::from_toml_str(
            r#"
[probe]
instrument_id = "ETHUSDT-PERP.BINANCE"
bar_type = "BTCUSDT-PERP.BINANCE-1-MINUTE-LAST-EXTERNAL"
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "probe.bar_type",
                ..
            })
        ));
    }

    #[test]
    fn rejects_first_wait_longer_than_total() {
        let err = Config::from_toml_str(
            r#"
[probe]
first_wait_secs = 90
total_wait_secs = 60
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "probe.total_wait_secs",
                ..
            })
        ));
    }

    #[test]
    fn rejects_zero_first_wait() {
        let err = Config::from_toml_str("[probe]\nfirst_wait_secs = 0\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "probe.first_wait_secs",
                ..
            })
        ));
    }

    #[test]
    fn rejects_bad_trader_id() {
        let err = Config::from_toml_str("trader_id = \"TRADER\"\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "trader_id",
                ..
            })
        ));
    }

    #[test]
    fn credentials_require_both_variables() {
        let config = Config::default();

        let err = config
            .credentials_from(env(&[("BINANCE_TESTNET_API_SECRET", "s")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingCredential { ref var } if var == "BINANCE_TESTNET_API_KEY"
        ));

        let err = config
            .credentials_from(env(&[
                ("BINANCE_TESTNET_API_KEY", "k"),
                ("BINANCE_TESTNET_API_SECRET", "   "),
            ]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingCredential { ref var } if var == "BINANCE_TESTNET_API_SECRET"
        ));

        let credentials = config
            .credentials_from(env(&[
                ("BINANCE_TESTNET_API_KEY", "k"),
                ("BINANCE_TESTNET_API_SECRET", "s"),
            ]))
            .unwrap();
        assert_eq!(credentials.api_key, "k");
    }

    #[test]
    fn node_config_registers_single_client() {
        let config = Config::default();
        let node_config = config
            .node_config(Credentials {
                api_key: "k".into(),
                api_secret: "s".into(),
            })
            .unwrap();

        assert_eq!(node_config.trader_id.as_str(), "TESTNET-TRADER-002");
        let client = node_config
            .data_clients
            .get(&ClientId::from("BINANCE-FUTURES-TESTNET"))
            .unwrap();
        assert!(client.testnet);
    }

    #[test]
    fn log_filter_quiets_internals() {
        let filter = Config::default().log_filter();
        assert_eq!(
            filter,
            "info,barprobe::runtime=warn,barprobe::adapter=warn"
        );
    }

    #[test]
    fn example_file_matches_defaults() {
        let config = Config::from_toml_str(include_str!("../barprobe.example.toml")).unwrap();
        let defaults = Config::default();

        assert_eq!(config.trader_id, defaults.trader_id);
        assert_eq!(config.client.id, defaults.client.id);
        assert_eq!(config.probe.bar_type, defaults.probe.bar_type);
        assert_eq!(config.wait_policy(), defaults.wait_policy());
    }

    #[test]
    fn rejects_blank_client_settings() {
        let err = Config::from_toml_str("[client]\nid = \" \"\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue { field: "client.id", .. })
        ));

        let err = Config::from_toml_str("[client]\napi_key_env = \"\"\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::MissingField { field: "client.api_key_env" })
        ));
    }
}
