//! Events flowing from data clients into the node's dispatch engine.

use tokio::sync::mpsc;

use crate::domain::{Bar, BarType, ClientId, Instrument, InstrumentId};

/// Channel half handed to data clients for reporting results and data.
pub type EventSender = mpsc::UnboundedSender<DataEvent>;

/// Asynchronous results and market data produced by a data client.
#[derive(Debug, Clone)]
pub enum DataEvent {
    /// A requested instrument definition arrived.
    InstrumentReceived(Instrument),
    /// The venue could not provide the requested instrument.
    InstrumentRequestFailed {
        instrument_id: InstrumentId,
        reason: String,
    },
    /// The venue acknowledged a bar subscription.
    BarSubscribed { bar_type: BarType },
    /// The venue rejected a bar subscription.
    BarSubscriptionFailed { bar_type: BarType, reason: String },
    /// A completed bar.
    Bar(Bar),
    /// A client-side failure not tied to a specific request.
    ClientError { client_id: ClientId, reason: String },
    /// The client lost its connection.
    Disconnected { client_id: ClientId, reason: String },
}

/// Generic node notifications delivered to actors through `on_event`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    ClientConnected { client_id: ClientId },
    ClientDisconnected { client_id: ClientId, reason: String },
}

impl std::fmt::Display for NodeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClientConnected { client_id } => write!(f, "ClientConnected({client_id})"),
            Self::ClientDisconnected { client_id, reason } => {
                write!(f, "ClientDisconnected({client_id}, {reason})")
            }
        }
    }
}
