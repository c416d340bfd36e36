//! Scripted [`DataClient`] for driving a node without a venue.
//!
//! A [`DataScript`] decides how each call behaves; [`ClientCalls`] shares
//! call counters with the test so it can assert on teardown.
//!
//! Bars are delivered by a timer task relative to the subscription, so tests
//! running on tokio's paused clock see them at exact virtual instants.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use super::domain::{bar_with_type, instrument};
use crate::domain::{BarType, ClientId, InstrumentId, Venue};
use crate::error::{Result, RuntimeError};
use crate::runtime::{DataClient, DataClientConfig, DataClientFactory, DataEvent, EventSender};

/// How the scripted client answers an instrument request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrumentReply {
    Known,
    Unknown(String),
    /// Never answers.
    Silent,
}

/// How the scripted client answers a bar subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeReply {
    /// Acknowledge through a `BarSubscribed` event.
    Ack,
    /// Reject asynchronously through a `BarSubscriptionFailed` event.
    Reject(String),
    /// Fail the `subscribe_bars` call itself.
    Fail(String),
}

/// Behaviour of a [`ScriptedDataClient`].
#[derive(Debug, Clone)]
pub struct DataScript {
    venue: Venue,
    connect_error: Option<String>,
    connect_delay: Option<Duration>,
    instrument: InstrumentReply,
    subscribe: SubscribeReply,
    bars: Vec<(Duration, Decimal)>,
    unsubscribe_error: Option<String>,
}

impl DataScript {
    /// A well-behaved `BINANCE` client that never publishes bars.
    pub fn new() -> Self {
        Self {
            venue: Venue::new("BINANCE"),
            connect_error: None,
            connect_delay: None,
            instrument: InstrumentReply::Known,
            subscribe: SubscribeReply::Ack,
            bars: Vec::new(),
            unsubscribe_error: None,
        }
    }

    pub fn with_venue(mut self, venue: &str) -> Self {
        self.venue = Venue::new(venue);
        self
    }

    pub fn failing_connect(mut self, reason: &str) -> Self {
        self.connect_error = Some(reason.to_string());
        self
    }

    /// Block `connect` for `delay` before answering, like a stalled handshake.
    pub fn hanging_connect(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub fn with_instrument_reply(mut self, reply: InstrumentReply) -> Self {
        self.instrument = reply;
        self
    }

    pub fn with_subscribe_reply(mut self, reply: SubscribeReply) -> Self {
        self.subscribe = reply;
        self
    }

    /// Publish a bar closing at `close`, `delay` after the subscription.
    pub fn with_bar_after(mut self, delay: Duration, close: Decimal) -> Self {
        self.bars.push((delay, close));
        self
    }

    pub fn failing_unsubscribe(mut self, reason: &str) -> Self {
        self.unsubscribe_error = Some(reason.to_string());
        self
    }
}

impl Default for DataScript {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared call counters for a scripted client.
#[derive(Debug, Clone, Default)]
pub struct ClientCalls {
    connect: Arc<AtomicU32>,
    disconnect: Arc<AtomicU32>,
    request_instrument: Arc<AtomicU32>,
    subscribe: Arc<AtomicU32>,
    unsubscribe: Arc<AtomicU32>,
    drop: Arc<AtomicU32>,
}

impl ClientCalls {
    pub fn connects(&self) -> u32 {
        self.connect.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> u32 {
        self.disconnect.load(Ordering::SeqCst)
    }

    pub fn instrument_requests(&self) -> u32 {
        self.request_instrument.load(Ordering::SeqCst)
    }

    pub fn subscribes(&self) -> u32 {
        self.subscribe.load(Ordering::SeqCst)
    }

    pub fn unsubscribes(&self) -> u32 {
        self.unsubscribe.load(Ordering::SeqCst)
    }

    /// Clients released, whether or not they were disconnected first.
    pub fn drops(&self) -> u32 {
        self.drop.load(Ordering::SeqCst)
    }

    fn bump(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct ScriptedDataClient {
    client_id: ClientId,
    script: DataScript,
    calls: ClientCalls,
    events: EventSender,
    bar_tasks: Vec<JoinHandle<()>>,
}

impl ScriptedDataClient {
    pub fn new(client_id: ClientId, script: DataScript, calls: ClientCalls, events: EventSender) -> Self {
        Self {
            client_id,
            script,
            calls,
            events,
            bar_tasks: Vec::new(),
        }
    }

    fn emit(&self, event: DataEvent) {
        let _ = self.events.send(event);
    }

    fn client_error(&self, reason: &str) -> RuntimeError {
        RuntimeError::Client {
            client_id: self.client_id.to_string(),
            reason: reason.to_string(),
        }
    }

    fn stop_bar_tasks(&mut self) {
        for task in self.bar_tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for ScriptedDataClient {
    fn drop(&mut self) {
        self.stop_bar_tasks();
        ClientCalls::bump(&self.calls.drop);
    }
}

#[async_trait]
impl DataClient for ScriptedDataClient {
    fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    fn venue(&self) -> &Venue {
        &self.script.venue
    }

    async fn connect(&mut self) -> Result<()> {
        ClientCalls::bump(&self.calls.connect);
        if let Some(delay) = self.script.connect_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script.connect_error {
            Some(reason) => Err(self.client_error(reason).into()),
            None => Ok(()),
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        ClientCalls::bump(&self.calls.disconnect);
        self.stop_bar_tasks();
        Ok(())
    }

    async fn request_instrument(&mut self, instrument_id: &InstrumentId) -> Result<()> {
        ClientCalls::bump(&self.calls.request_instrument);
        match &self.script.instrument {
            InstrumentReply::Known => {
                self.emit(DataEvent::InstrumentReceived(instrument(&instrument_id.to_string())));
            }
            InstrumentReply::Unknown(reason) => self.emit(DataEvent::InstrumentRequestFailed {
                instrument_id: instrument_id.clone(),
                reason: reason.clone(),
            }),
            InstrumentReply::Silent => {}
        }
        Ok(())
    }

    async fn subscribe_bars(&mut self, bar_type: &BarType) -> Result<()> {
        ClientCalls::bump(&self.calls.subscribe);
        match &self.script.subscribe {
            SubscribeReply::Ack => self.emit(DataEvent::BarSubscribed {
                bar_type: bar_type.clone(),
            }),
            SubscribeReply::Reject(reason) => {
                self.emit(DataEvent::BarSubscriptionFailed {
                    bar_type: bar_type.clone(),
                    reason: reason.clone(),
                });
                return Ok(());
            }
            SubscribeReply::Fail(reason) => return Err(self.client_error(reason).into()),
        }

        if self.script.bars.is_empty() {
            return Ok(());
        }
        let start = Instant::now();
        let bars = self.script.bars.clone();
        let bar_type = bar_type.clone();
        let events = self.events.clone();
        self.bar_tasks.push(tokio::spawn(async move {
            for (delay, close) in bars {
                sleep_until(start + delay).await;
                if events.send(DataEvent::Bar(bar_with_type(bar_type.clone(), close))).is_err() {
                    return;
                }
            }
        }));
        Ok(())
    }

    async fn unsubscribe_bars(&mut self, _bar_type: &BarType) -> Result<()> {
        ClientCalls::bump(&self.calls.unsubscribe);
        self.stop_bar_tasks();
        match &self.script.unsubscribe_error {
            Some(reason) => Err(self.client_error(reason).into()),
            None => Ok(()),
        }
    }
}

/// Factory producing [`ScriptedDataClient`]s that share one [`ClientCalls`].
pub struct ScriptedClientFactory {
    script: DataScript,
    calls: ClientCalls,
}

impl ScriptedClientFactory {
    pub fn new(script: DataScript) -> Self {
        Self {
            script,
            calls: ClientCalls::default(),
        }
    }

    /// Counters shared with every client this factory creates.
    pub fn calls(&self) -> ClientCalls {
        self.calls.clone()
    }
}

impl DataClientFactory for ScriptedClientFactory {
    fn create(
        &self,
        client_id: &ClientId,
        _config: &DataClientConfig,
        events: EventSender,
    ) -> Result<Box<dyn DataClient>> {
        Ok(Box::new(ScriptedDataClient::new(
            client_id.clone(),
            self.script.clone(),
            self.calls.clone(),
            events,
        )))
    }
}
