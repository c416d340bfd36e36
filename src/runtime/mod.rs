//! Minimal trading runtime: actors, data clients and the node that hosts them.
//!
//! # Modules
//!
//! - [`actor`] - `Actor` callbacks and the `ActorContext` command surface
//! - [`client`] - `DataClient` / `DataClientFactory` traits and client config
//! - [`event`] - Data events reported by clients and node notifications
//! - [`node`] - `TradingNode` lifecycle and control surface

pub mod actor;
pub mod client;
mod engine;
pub mod event;
pub mod node;

pub use actor::{Actor, ActorContext, DataCommand};
pub use client::{Credentials, DataClient, DataClientConfig, DataClientFactory};
pub use event::{DataEvent, EventSender, NodeEvent};
pub use node::{NodeState, TradingNode, TradingNodeConfig};
