//! Data client boundary between the node and venue adapters.

use std::fmt;

use async_trait::async_trait;

use crate::domain::{AccountType, BarType, ClientId, InstrumentId, Venue};
use crate::error::Result;

use super::event::EventSender;

/// API key pair for a venue account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &"***")
            .finish()
    }
}

fn redact(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    format!("{visible}***")
}

/// Connection settings for one data client.
#[derive(Debug, Clone)]
pub struct DataClientConfig {
    pub credentials: Credentials,
    pub account_type: AccountType,
    /// Route to the venue's sandbox environment.
    pub testnet: bool,
    /// Override for the REST base URL.
    pub http_url: Option<String>,
    /// Override for the WebSocket base URL.
    pub ws_url: Option<String>,
}

/// Market-data connectivity for one venue.
///
/// Request methods only initiate work. Their outcomes are reported through
/// the [`EventSender`] the client was created with.
#[async_trait]
pub trait DataClient: Send {
    fn client_id(&self) -> &ClientId;

    fn venue(&self) -> &Venue;

    async fn connect(&mut self) -> Result<()>;

    async fn disconnect(&mut self) -> Result<()>;

    async fn request_instrument(&mut self, instrument_id: &InstrumentId) -> Result<()>;

    async fn subscribe_bars(&mut self, bar_type: &BarType) -> Result<()>;

    async fn unsubscribe_bars(&mut self, bar_type: &BarType) -> Result<()>;
}

/// Builds data clients for a registered client key.
pub trait DataClientFactory: Send + Sync {
    fn create(
        &self,
        client_id: &ClientId,
        config: &DataClientConfig,
        events: EventSender,
    ) -> Result<Box<dyn DataClient>>;
}
