//! Canonical node assembly for scripted runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::client::{ClientCalls, DataScript, ScriptedClientFactory};
use super::domain::{bar_type, credentials, instrument_id};
use crate::domain::{AccountType, ClientId, CompletionSignal};
use crate::probe::{BarProbe, BarProbeConfig};
use crate::runtime::{Actor, DataClientConfig, TradingNode, TradingNodeConfig};

pub const CLIENT_ID: &str = "BINANCE-FUTURES-TESTNET";
pub const INSTRUMENT: &str = "BTCUSDT-PERP.BINANCE";
pub const BAR_TYPE: &str = "BTCUSDT-PERP.BINANCE-1-MINUTE-LAST-EXTERNAL";

/// One testnet USDT-M data client registered under [`CLIENT_ID`].
pub fn node_config() -> TradingNodeConfig {
    let mut data_clients = BTreeMap::new();
    data_clients.insert(
        ClientId::new(CLIENT_ID),
        DataClientConfig {
            credentials: credentials(),
            account_type: AccountType::UsdtFutures,
            testnet: true,
            http_url: None,
            ws_url: None,
        },
    );
    TradingNodeConfig {
        trader_id: "TESTER-001".parse().expect("valid trader id"),
        data_clients,
    }
}

/// A built node hosting `actors` on top of a scripted client.
pub fn scripted_node(script: DataScript, actors: Vec<Box<dyn Actor>>) -> (TradingNode, ClientCalls) {
    let factory = ScriptedClientFactory::new(script);
    let calls = factory.calls();

    let mut node = TradingNode::new(node_config());
    node.add_data_client_factory(CLIENT_ID, Arc::new(factory));
    for actor in actors {
        node.add_actor(actor).expect("node accepts actors before build");
    }
    node.build().expect("scripted node builds");
    (node, calls)
}

/// Probe config for [`INSTRUMENT`] / [`BAR_TYPE`] reporting to `signal`.
pub fn probe_config(signal: &CompletionSignal) -> BarProbeConfig {
    BarProbeConfig {
        instrument_id: instrument_id(INSTRUMENT),
        bar_type: bar_type(BAR_TYPE),
        signal: Some(signal.clone()),
    }
}

/// A built node hosting a single [`BarProbe`] on top of a scripted client.
pub fn probe_node(script: DataScript, signal: &CompletionSignal) -> (TradingNode, ClientCalls) {
    scripted_node(script, vec![Box::new(BarProbe::new(probe_config(signal)))])
}
