//! Command-line interface definitions.

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::error::Result;

/// barprobe - Check that bar data flows from a Binance (test)net feed.
#[derive(Parser, Debug, Default)]
#[command(name = "barprobe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (defaults to barprobe.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override instrument id, e.g. ETHUSDT-PERP.BINANCE
    #[arg(long)]
    pub instrument: Option<String>,

    /// Override bar type, e.g. ETHUSDT-PERP.BINANCE-1-MINUTE-LAST-EXTERNAL
    #[arg(long)]
    pub bar_type: Option<String>,

    /// Override seconds to wait before the slow-start warning
    #[arg(long)]
    pub first_wait: Option<u64>,

    /// Override total seconds to wait for the first bar
    #[arg(long)]
    pub total_wait: Option<u64>,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,

    /// Connect to mainnet instead of testnet
    #[arg(long)]
    pub mainnet: bool,

    /// Exit with status 2 when no bar arrives
    #[arg(long)]
    pub strict: bool,
}

impl Cli {
    /// Load the config file and apply overrides on top of it.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref instrument) = self.instrument {
            config.probe.instrument_id = instrument.clone();
            // Follow the instrument unless the bar type is overridden too.
            if self.bar_type.is_none() {
                if let Some(spec) = bar_spec_suffix(&config.probe.bar_type) {
                    config.probe.bar_type = format!("{instrument}-{spec}");
                }
            }
        }
        if let Some(ref bar_type) = self.bar_type {
            config.probe.bar_type = bar_type.clone();
        }
        if let Some(secs) = self.first_wait {
            config.probe.first_wait_secs = secs;
        }
        if let Some(secs) = self.total_wait {
            config.probe.total_wait_secs = secs;
        }
        if let Some(ref level) = self.log_level {
            config.logging.level = level.clone();
        }
        if self.json_logs {
            config.logging.format = "json".to_string();
        }
        if self.mainnet {
            config.client.testnet = false;
        }
        if self.strict {
            config.probe.strict = true;
        }
    }
}

/// `1-MINUTE-LAST-EXTERNAL` from a full bar type string.
fn bar_spec_suffix(bar_type: &str) -> Option<&str> {
    let mut split = bar_type.rmatch_indices('-').map(|(idx, _)| idx);
    let idx = split.nth(3)?;
    Some(&bar_type[idx + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("barprobe").chain(args.iter().copied()))
    }

    #[test]
    fn no_arguments_means_no_overrides() {
        let cli = parse(&[]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert!(cli.config.is_none());
        assert_eq!(config.probe.instrument_id, Config::default().probe.instrument_id);
        assert!(config.client.testnet);
    }

    #[test]
    fn instrument_override_carries_bar_spec() {
        let cli = parse(&["--instrument", "ETHUSDT-PERP.BINANCE"]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.probe.instrument_id, "ETHUSDT-PERP.BINANCE");
        assert_eq!(config.probe.bar_type, "ETHUSDT-PERP.BINANCE-1-MINUTE-LAST-EXTERNAL");
        config.validate().unwrap();
    }

    #[test]
    fn explicit_bar_type_wins() {
        let cli = parse(&[
            "--instrument",
            "ETHUSDT-PERP.BINANCE",
            "--bar-type",
            "ETHUSDT-PERP.BINANCE-5-MINUTE-LAST-EXTERNAL",
        ]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.probe.bar_type, "ETHUSDT-PERP.BINANCE-5-MINUTE-LAST-EXTERNAL");
    }

    #[test]
    fn flags_and_waits_override() {
        let cli = parse(&[
            "--first-wait",
            "5",
            "--total-wait",
            "10",
            "--log-level",
            "debug",
            "--json-logs",
            "--mainnet",
            "--strict",
        ]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.probe.first_wait_secs, 5);
        assert_eq!(config.probe.total_wait_secs, 10);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert!(!config.client.testnet);
        assert!(config.probe.strict);
    }

    #[test]
    fn bar_spec_suffix_handles_dashed_symbols() {
        assert_eq!(
            bar_spec_suffix("BTCUSDT-PERP.BINANCE-1-MINUTE-LAST-EXTERNAL"),
            Some("1-MINUTE-LAST-EXTERNAL")
        );
        assert_eq!(bar_spec_suffix("1-MINUTE"), None);
    }
}
