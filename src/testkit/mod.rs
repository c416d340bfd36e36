//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`client`] - `ScriptedDataClient` and its factory, driven by a `DataScript`.
//! - [`domain`] - Builders for domain primitives: instruments, bars, credentials.
//! - [`node`] - Node and config assembly for scripted runs.

pub mod client;
pub mod domain;
pub mod node;
