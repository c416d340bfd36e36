//! Bar-data smoke test: the probe actor, the run loop, and the wiring that
//! assembles them onto a trading node.

pub mod actor;
pub mod run;

use std::sync::Arc;
use std::task::Poll;

use tokio::signal;

use crate::adapter::binance::BinanceDataClientFactory;
use crate::config::Config;
use crate::domain::CompletionSignal;
use crate::error::Result;
use crate::runtime::{Credentials, TradingNode};

pub use actor::{BarProbe, BarProbeConfig, ProbeState};
pub use run::{run, wait_for_completion, RunOutcome, RunReport, WaitPolicy};

/// Assemble a node with the Binance data client and a bar probe, run it until
/// the first bar, a timeout, or CTRL+C, and tear it down.
pub async fn execute(config: &Config, credentials: Credentials) -> Result<RunReport> {
    let signal = CompletionSignal::new();
    let node_config = config.node_config(credentials)?;
    let probe_config = config.probe_config(signal.clone())?;

    let mut node = TradingNode::new(node_config);
    node.add_data_client_factory(
        config.client.id.as_str(),
        Arc::new(BinanceDataClientFactory),
    );
    node.add_actor(Box::new(BarProbe::new(probe_config)))?;
    node.build()?;

    // Polling once installs the handler, so CTRL+C during connect is caught.
    let mut ctrl_c = Box::pin(signal::ctrl_c());
    let early = futures_util::poll!(&mut ctrl_c);
    let interrupt = async move {
        let received = match early {
            Poll::Ready(received) => received,
            Poll::Pending => ctrl_c.await,
        };
        if received.is_err() {
            // Without a signal handler there is nothing to wait for.
            std::future::pending::<()>().await;
        }
    };

    run(&mut node, &signal, &config.wait_policy(), interrupt).await
}
