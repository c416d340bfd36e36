//! barprobe - Smoke test for live bar data on Binance testnet.
//!
//! Starts a small trading node with one Binance data client and a probe
//! actor, waits for the first bar of the configured feed, then tears the
//! node down.
//!
//! # Architecture
//!
//! - **`runtime`** - Trading node, actors and the data-client seam
//!   - `TradingNode` - lifecycle `Created → Built → Running → Stopped → Disposed`
//!   - `Actor` - callbacks with default no-op bodies
//!   - `DataClient` / `DataClientFactory` - venue connectivity
//!
//! - **`adapter::binance`** - REST instrument lookup and kline WebSocket
//!
//! - **`probe`** - The `BarProbe` actor and the bounded wait around it
//!
//! # Modules
//!
//! - [`cli`] - Command-line overrides
//! - [`config`] - Configuration loading from TOML, env credentials, logging
//! - [`domain`] - Identifiers, bar types, instruments and the completion signal
//! - [`error`] - Error types for the crate
//! - [`probe`] - Probe actor and run loop
//! - [`runtime`] - Actor/data-client runtime
//!
//! # Features
//!
//! - `testkit` - Scripted data client and builders for integration tests
//!
//! # Example
//!
//! ```no_run
//! use barprobe::config::Config;
//!
//! # async fn example() -> barprobe::error::Result<()> {
//! let config = Config::load(None)?;
//! let credentials = config.credentials()?;
//! let report = barprobe::probe::execute(&config, credentials).await?;
//! println!("{:?}", report.outcome);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod probe;
pub mod runtime;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
