//! Binance kline WebSocket.
//!
//! # Connection Lifecycle
//!
//! 1. **Connection**: `connect()` opens the socket and spawns a reader task
//! 2. **Subscription**: `subscribe()` / `unsubscribe()` send requests with a
//!    fresh id; replies are matched back to the bar type by id
//! 3. **Message Loop**: closed klines become [`DataEvent::Bar`]s
//! 4. **Termination**: `close()` or a server close ends the task
//!
//! There is no reconnection. A lost connection is reported as
//! [`DataEvent::Disconnected`].

use std::collections::HashMap;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use super::messages::{KlineEvent, StreamRequest, WsMessage};
use crate::domain::{BarType, ClientId};
use crate::error::{AdapterError, Result};
use crate::runtime::{DataEvent, EventSender};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum StreamCommand {
    Subscribe {
        id: u64,
        stream: String,
        key: StreamKey,
        bar_type: BarType,
    },
    Unsubscribe {
        id: u64,
        stream: String,
        key: StreamKey,
    },
    Close,
}

/// Routes kline frames to bar types: upper-case venue symbol plus interval.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamKey {
    pub symbol: String,
    pub interval: String,
}

/// Handle to the kline WebSocket and its reader task.
pub struct BinanceKlineStream {
    url: String,
    client_id: ClientId,
    events: EventSender,
    commands: Option<mpsc::UnboundedSender<StreamCommand>>,
    task: Option<JoinHandle<()>>,
    next_id: u64,
}

impl BinanceKlineStream {
    #[must_use]
    pub fn new(url: String, client_id: ClientId, events: EventSender) -> Self {
        Self {
            url,
            client_id,
            events,
            commands: None,
            task: None,
            next_id: 1,
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.commands.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    pub async fn connect(&mut self) -> Result<()> {
        info!(url = %self.url, "Connecting to WebSocket");
        let (ws, response) = connect_async(self.url.as_str()).await?;
        info!(status = %response.status(), "WebSocket connected");

        let (tx, rx) = mpsc::unbounded_channel();
        let reader = StreamTask {
            client_id: self.client_id.clone(),
            events: self.events.clone(),
            pending: HashMap::new(),
            routes: HashMap::new(),
        };
        self.task = Some(tokio::spawn(reader.run(ws, rx)));
        self.commands = Some(tx);
        Ok(())
    }

    pub fn subscribe(&mut self, bar_type: &BarType, raw_symbol: &str, interval: &str) -> Result<()> {
        let stream = super::symbol::kline_stream(raw_symbol, interval);
        let id = self.next_request_id();
        info!(stream = %stream, id, "Subscribing to kline stream");
        self.send(StreamCommand::Subscribe {
            id,
            stream,
            key: StreamKey {
                symbol: raw_symbol.to_ascii_uppercase(),
                interval: interval.to_string(),
            },
            bar_type: bar_type.clone(),
        })
    }

    pub fn unsubscribe(&mut self, raw_symbol: &str, interval: &str) -> Result<()> {
        let stream = super::symbol::kline_stream(raw_symbol, interval);
        let id = self.next_request_id();
        info!(stream = %stream, id, "Unsubscribing from kline stream");
        self.send(StreamCommand::Unsubscribe {
            id,
            stream,
            key: StreamKey {
                symbol: raw_symbol.to_ascii_uppercase(),
                interval: interval.to_string(),
            },
        })
    }

    /// Close the socket and wait for the reader task to finish.
    pub async fn close(&mut self) {
        if let Some(tx) = self.commands.take() {
            let _ = tx.send(StreamCommand::Close);
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "WebSocket task ended abnormally");
            }
        }
    }

    fn next_request_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn send(&self, command: StreamCommand) -> Result<()> {
        self.commands
            .as_ref()
            .ok_or(AdapterError::NotConnected)?
            .send(command)
            .map_err(|_| AdapterError::NotConnected.into())
    }
}

impl Drop for BinanceKlineStream {
    fn drop(&mut self) {
        // A stream dropped without `close` must not leave its reader running.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// State owned by the reader task.
struct StreamTask {
    client_id: ClientId,
    events: EventSender,
    /// Outstanding subscribe requests by id.
    pending: HashMap<u64, BarType>,
    routes: HashMap<StreamKey, BarType>,
}

impl StreamTask {
    async fn run(mut self, ws: WsStream, mut commands: mpsc::UnboundedReceiver<StreamCommand>) {
        let (mut sink, mut stream) = ws.split();
        debug!("Entering WebSocket message loop");

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    let request = match command {
                        StreamCommand::Subscribe { id, stream, key, bar_type } => {
                            self.pending.insert(id, bar_type.clone());
                            self.routes.insert(key, bar_type);
                            StreamRequest::subscribe(stream, id)
                        }
                        StreamCommand::Unsubscribe { id, stream, key } => {
                            self.routes.remove(&key);
                            StreamRequest::unsubscribe(stream, id)
                        }
                        StreamCommand::Close => {
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        }
                    };
                    let sent = match serde_json::to_string(&request) {
                        Ok(json) => sink.send(Message::Text(json)).await.map_err(|e| e.to_string()),
                        Err(e) => Err(e.to_string()),
                    };
                    if let Err(reason) = sent {
                        self.disconnected(reason);
                        break;
                    }
                }
                frame = stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            trace!(bytes = text.len(), "Received WebSocket text frame");
                            self.handle_text(&text);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            trace!("Received WebSocket ping");
                            if let Err(e) = sink.send(Message::Pong(data)).await {
                                self.disconnected(format!("failed to send pong: {e}"));
                                break;
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!(frame = ?frame, "WebSocket closed by server");
                            self.disconnected(frame.map(|f| f.reason.to_string()).unwrap_or_default());
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            self.disconnected(e.to_string());
                            break;
                        }
                        None => {
                            self.disconnected("stream ended".into());
                            break;
                        }
                    }
                }
            }
        }
        debug!("WebSocket message loop finished");
    }

    fn handle_text(&mut self, text: &str) {
        match serde_json::from_str::<WsMessage>(text) {
            Ok(WsMessage::Response { id, .. }) => {
                if let Some(bar_type) = self.pending.remove(&id) {
                    self.emit(DataEvent::BarSubscribed { bar_type });
                }
            }
            Ok(WsMessage::Error { error, id }) => {
                let rejected = AdapterError::Rejected {
                    id: id.unwrap_or_default(),
                    code: error.code,
                    msg: error.msg,
                };
                match id.and_then(|id| self.pending.remove(&id)) {
                    Some(bar_type) => {
                        self.routes.retain(|_, routed| routed != &bar_type);
                        self.emit(DataEvent::BarSubscriptionFailed {
                            bar_type,
                            reason: rejected.to_string(),
                        });
                    }
                    None => self.emit(DataEvent::ClientError {
                        client_id: self.client_id.clone(),
                        reason: rejected.to_string(),
                    }),
                }
            }
            Ok(WsMessage::Kline(event)) => self.handle_kline(event),
            Ok(WsMessage::Unknown(_)) => {}
            Err(e) => {
                warn!(error = %e, bytes = text.len(), "Failed to parse message");
            }
        }
    }

    fn handle_kline(&mut self, event: KlineEvent) {
        if !event.kline.closed {
            return;
        }
        let key = StreamKey {
            symbol: event.symbol.to_ascii_uppercase(),
            interval: event.kline.interval.clone(),
        };
        let Some(bar_type) = self.routes.get(&key).cloned() else {
            trace!(symbol = %key.symbol, interval = %key.interval, "Kline for unrouted stream");
            return;
        };
        match event.kline.to_bar(bar_type, Utc::now()) {
            Ok(bar) => self.emit(DataEvent::Bar(bar)),
            Err(e) => warn!(error = %e, "Dropping malformed kline"),
        }
    }

    fn disconnected(&self, reason: String) {
        self.emit(DataEvent::Disconnected {
            client_id: self.client_id.clone(),
            reason,
        });
    }

    fn emit(&self, event: DataEvent) {
        if self.events.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }
}
