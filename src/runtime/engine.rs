//! Dispatch engine: owns actors and data clients, routes commands to clients
//! and events to actors.
//!
//! The engine runs as a single task. Actor callbacks never overlap, and any
//! commands an actor queues are executed before the next event is handled.

use std::collections::HashMap;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use crate::domain::{BarType, Instrument, InstrumentId, TraderId, Venue};
use crate::error::RuntimeError;

use super::actor::{Actor, ActorContext, DataCommand};
use super::client::DataClient;
use super::event::{DataEvent, EventSender, NodeEvent};

struct ActorSlot {
    actor: Box<dyn Actor>,
    ctx: ActorContext,
}

pub(crate) struct Engine {
    actors: Vec<ActorSlot>,
    clients: Vec<Box<dyn DataClient>>,
    events: mpsc::UnboundedReceiver<DataEvent>,
    // Keeps the channel open even when no client holds a sender.
    _events_tx: EventSender,
    instruments: HashMap<InstrumentId, Instrument>,
    instrument_requests: HashMap<InstrumentId, Vec<usize>>,
    bar_subscribers: HashMap<BarType, Vec<usize>>,
}

impl Engine {
    pub(crate) fn new(
        trader_id: &TraderId,
        actors: Vec<Box<dyn Actor>>,
        clients: Vec<Box<dyn DataClient>>,
        events_tx: EventSender,
        events: mpsc::UnboundedReceiver<DataEvent>,
    ) -> Self {
        let actors = actors
            .into_iter()
            .map(|actor| {
                let ctx = ActorContext::new(actor.id(), trader_id.clone());
                ActorSlot { actor, ctx }
            })
            .collect();

        Self {
            actors,
            clients,
            events,
            _events_tx: events_tx,
            instruments: HashMap::new(),
            instrument_requests: HashMap::new(),
            bar_subscribers: HashMap::new(),
        }
    }

    pub(crate) async fn connect_clients(&mut self) -> crate::error::Result<()> {
        for client in &mut self.clients {
            info!(client_id = %client.client_id(), venue = %client.venue(), "Connecting data client");
            client.connect().await?;
        }
        Ok(())
    }

    pub(crate) async fn disconnect_clients(&mut self) {
        for client in &mut self.clients {
            if let Err(e) = client.disconnect().await {
                warn!(client_id = %client.client_id(), error = %e, "Data client disconnect failed");
            }
        }
    }

    /// Run `on_start` for every actor, then notify them of connected clients.
    pub(crate) async fn start_actors(&mut self) {
        for idx in 0..self.actors.len() {
            self.with_actor(idx, |actor, ctx| actor.on_start(ctx));
            self.flush(idx).await;
        }

        let connected: Vec<NodeEvent> = self
            .clients
            .iter()
            .map(|c| NodeEvent::ClientConnected {
                client_id: c.client_id().clone(),
            })
            .collect();
        for event in connected {
            self.broadcast(|actor, ctx| actor.on_event(ctx, &event)).await;
        }
    }

    /// Run `on_stop` for every actor and execute the commands they queue.
    pub(crate) async fn stop_actors(&mut self) {
        for idx in 0..self.actors.len() {
            self.with_actor(idx, |actor, ctx| actor.on_stop(ctx));
            self.flush(idx).await;
        }
    }

    /// Dispatch events until shutdown is signalled, then hand the engine back.
    pub(crate) async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Self {
        debug!("Dispatch engine running");
        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                Some(event) = self.events.recv() => self.handle_event(event).await,
            }
        }
        debug!("Dispatch engine stopped");
        self
    }

    pub(crate) async fn handle_event(&mut self, event: DataEvent) {
        trace!(event = ?event, "Dispatching data event");
        match event {
            DataEvent::InstrumentReceived(instrument) => {
                let requesters = self
                    .instrument_requests
                    .remove(&instrument.id)
                    .unwrap_or_default();
                self.instruments
                    .insert(instrument.id.clone(), instrument.clone());
                for idx in requesters {
                    self.with_actor(idx, |actor, ctx| actor.on_instrument_cached(ctx, &instrument));
                    self.flush(idx).await;
                }
            }
            DataEvent::InstrumentRequestFailed {
                instrument_id,
                reason,
            } => {
                let requesters = self
                    .instrument_requests
                    .remove(&instrument_id)
                    .unwrap_or_default();
                for idx in requesters {
                    self.with_actor(idx, |actor, ctx| {
                        actor.on_instrument_request_failure(ctx, &instrument_id, &reason)
                    });
                    self.flush(idx).await;
                }
            }
            DataEvent::BarSubscribed { bar_type } => {
                for idx in self.subscribers(&bar_type) {
                    self.with_actor(idx, |actor, ctx| {
                        actor.on_bar_subscription_success(ctx, &bar_type, bar_type.spec())
                    });
                    self.flush(idx).await;
                }
            }
            DataEvent::BarSubscriptionFailed { bar_type, reason } => {
                let subscribers = self.bar_subscribers.remove(&bar_type).unwrap_or_default();
                for idx in subscribers {
                    self.fail_subscription(idx, &bar_type, &reason);
                    self.flush(idx).await;
                }
            }
            DataEvent::Bar(bar) => {
                for idx in self.subscribers(&bar.bar_type) {
                    self.with_actor(idx, |actor, ctx| actor.on_bar(ctx, &bar));
                    self.flush(idx).await;
                }
            }
            DataEvent::ClientError { client_id, reason } => {
                let error = RuntimeError::Client {
                    client_id: client_id.to_string(),
                    reason,
                };
                self.broadcast(|actor, ctx| actor.on_error(ctx, &error)).await;
            }
            DataEvent::Disconnected { client_id, reason } => {
                warn!(client_id = %client_id, reason = %reason, "Data client disconnected");
                let event = NodeEvent::ClientDisconnected { client_id, reason };
                self.broadcast(|actor, ctx| actor.on_event(ctx, &event)).await;
            }
        }
    }

    fn with_actor<F>(&mut self, idx: usize, f: F)
    where
        F: FnOnce(&mut dyn Actor, &mut ActorContext),
    {
        let slot = &mut self.actors[idx];
        f(slot.actor.as_mut(), &mut slot.ctx);
    }

    async fn broadcast<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut dyn Actor, &mut ActorContext),
    {
        for idx in 0..self.actors.len() {
            self.with_actor(idx, &mut f);
            self.flush(idx).await;
        }
    }

    fn subscribers(&self, bar_type: &BarType) -> Vec<usize> {
        self.bar_subscribers.get(bar_type).cloned().unwrap_or_default()
    }

    fn client_for(&mut self, venue: &Venue) -> Option<&mut Box<dyn DataClient>> {
        self.clients.iter_mut().find(|c| c.venue() == venue)
    }

    fn fail_subscription(&mut self, idx: usize, bar_type: &BarType, reason: &str) {
        self.with_actor(idx, |actor, ctx| {
            ctx.forget_subscription(bar_type);
            actor.on_bar_subscription_failure(ctx, bar_type, reason);
        });
    }

    fn fail_instrument_request(&mut self, instrument_id: &InstrumentId, reason: &str) {
        let requesters = self
            .instrument_requests
            .remove(instrument_id)
            .unwrap_or_default();
        for idx in requesters {
            self.with_actor(idx, |actor, ctx| {
                actor.on_instrument_request_failure(ctx, instrument_id, reason)
            });
        }
    }

    /// Execute queued commands for one actor until its queue stays empty.
    async fn flush(&mut self, idx: usize) {
        loop {
            let commands = self.actors[idx].ctx.drain_commands();
            if commands.is_empty() {
                break;
            }
            for command in commands {
                self.execute(idx, command).await;
            }
        }
    }

    async fn execute(&mut self, idx: usize, command: DataCommand) {
        debug!(actor_id = %self.actors[idx].ctx.actor_id(), command = ?command, "Executing data command");
        match command {
            DataCommand::RequestInstrument(instrument_id) => {
                if let Some(instrument) = self.instruments.get(&instrument_id).cloned() {
                    self.with_actor(idx, |actor, ctx| actor.on_instrument_cached(ctx, &instrument));
                    return;
                }

                let requesters = self
                    .instrument_requests
                    .entry(instrument_id.clone())
                    .or_default();
                let in_flight = !requesters.is_empty();
                if !requesters.contains(&idx) {
                    requesters.push(idx);
                }
                if in_flight {
                    return;
                }

                let result = match self.client_for(instrument_id.venue()) {
                    Some(client) => client
                        .request_instrument(&instrument_id)
                        .await
                        .map_err(|e| e.to_string()),
                    None => Err(RuntimeError::NoClientForVenue {
                        venue: instrument_id.venue().to_string(),
                    }
                    .to_string()),
                };
                if let Err(reason) = result {
                    self.fail_instrument_request(&instrument_id, &reason);
                }
            }
            DataCommand::SubscribeBars(bar_type) => {
                let subscribers = self.bar_subscribers.entry(bar_type.clone()).or_default();
                if subscribers.contains(&idx) {
                    return;
                }
                let already_live = !subscribers.is_empty();
                subscribers.push(idx);
                if already_live {
                    self.with_actor(idx, |actor, ctx| {
                        actor.on_bar_subscription_success(ctx, &bar_type, bar_type.spec())
                    });
                    return;
                }

                let venue = bar_type.instrument_id().venue().clone();
                let result = match self.client_for(&venue) {
                    Some(client) => client
                        .subscribe_bars(&bar_type)
                        .await
                        .map_err(|e| e.to_string()),
                    None => Err(RuntimeError::NoClientForVenue {
                        venue: venue.to_string(),
                    }
                    .to_string()),
                };
                if let Err(reason) = result {
                    self.bar_subscribers.remove(&bar_type);
                    self.fail_subscription(idx, &bar_type, &reason);
                }
            }
            DataCommand::UnsubscribeBars(bar_type) => {
                let Some(subscribers) = self.bar_subscribers.get_mut(&bar_type) else {
                    return;
                };
                subscribers.retain(|&i| i != idx);
                if !subscribers.is_empty() {
                    return;
                }
                self.bar_subscribers.remove(&bar_type);

                let venue = bar_type.instrument_id().venue().clone();
                let Some(client) = self.client_for(&venue) else {
                    return;
                };
                if let Err(e) = client.unsubscribe_bars(&bar_type).await {
                    let error = RuntimeError::Client {
                        client_id: client.client_id().to_string(),
                        reason: e.to_string(),
                    };
                    warn!(bar_type = %bar_type, error = %error, "Unsubscribe failed");
                    self.with_actor(idx, |actor, ctx| actor.on_error(ctx, &error));
                }
            }
        }
    }
}
