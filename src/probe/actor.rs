//! The bar probe actor.
//!
//! Requests the configured instrument, subscribes to its bar feed once the
//! instrument is cached, and sets the completion signal on the first bar.

use tracing::{debug, error, info, warn};

use crate::domain::{ActorId, Bar, BarSpecification, BarType, CompletionSignal, Instrument, InstrumentId};
use crate::error::RuntimeError;
use crate::runtime::{Actor, ActorContext, NodeEvent};

/// Parameters for a [`BarProbe`].
#[derive(Debug, Clone)]
pub struct BarProbeConfig {
    pub instrument_id: InstrumentId,
    pub bar_type: BarType,
    pub signal: Option<CompletionSignal>,
}

/// Probe lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Created,
    Started,
    AwaitingInstrument,
    Subscribed,
    Stopped,
}

pub struct BarProbe {
    id: ActorId,
    config: BarProbeConfig,
    state: ProbeState,
    bars_received: u64,
}

impl BarProbe {
    pub fn new(config: BarProbeConfig) -> Self {
        let id = ActorId::new(format!("BarProbe-{}", config.instrument_id));
        info!(actor_id = %id, "Probe actor created");
        Self {
            id,
            config,
            state: ProbeState::Created,
            bars_received: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> ProbeState {
        self.state
    }

    #[must_use]
    pub fn bars_received(&self) -> u64 {
        self.bars_received
    }
}

impl Actor for BarProbe {
    fn id(&self) -> ActorId {
        self.id.clone()
    }

    fn on_start(&mut self, ctx: &mut ActorContext) {
        self.state = ProbeState::Started;
        info!(instrument_id = %self.config.instrument_id, "Requesting instrument");
        ctx.request_instrument(&self.config.instrument_id);
        self.state = ProbeState::AwaitingInstrument;
    }

    fn on_stop(&mut self, ctx: &mut ActorContext) {
        info!(bars = self.bars_received, "Probe stopping");
        if self.state == ProbeState::Subscribed {
            if let Err(e) = ctx.unsubscribe_bars(&self.config.bar_type) {
                error!(bar_type = %self.config.bar_type, error = %e, "Unsubscribe failed");
            }
        }
        self.state = ProbeState::Stopped;
    }

    fn on_instrument_cached(&mut self, ctx: &mut ActorContext, instrument: &Instrument) {
        if instrument.id != self.config.instrument_id {
            return;
        }
        if self.state != ProbeState::AwaitingInstrument {
            debug!(instrument_id = %instrument.id, state = ?self.state, "Ignoring repeated instrument");
            return;
        }
        if !instrument.is_trading() {
            warn!(instrument_id = %instrument.id, status = %instrument.status, "Instrument is not trading");
        }
        info!(
            instrument_id = %instrument.id,
            raw_symbol = %instrument.raw_symbol,
            "Instrument cached"
        );
        info!(bar_type = %self.config.bar_type, "Subscribing to bars");
        ctx.subscribe_bars(&self.config.bar_type);
        self.state = ProbeState::Subscribed;
    }

    fn on_instrument_request_failure(
        &mut self,
        _ctx: &mut ActorContext,
        instrument_id: &InstrumentId,
        reason: &str,
    ) {
        error!(instrument_id = %instrument_id, reason = %reason, "Instrument request failed");
        if let Some(signal) = &self.config.signal {
            signal.abort(format!("instrument request for {instrument_id} failed: {reason}"));
        }
    }

    fn on_bar(&mut self, _ctx: &mut ActorContext, bar: &Bar) {
        if bar.bar_type != self.config.bar_type {
            return;
        }
        self.bars_received += 1;
        info!(bar = %bar, count = self.bars_received, "Bar received");
        if let Some(signal) = &self.config.signal {
            if !signal.is_set() {
                signal.set();
            }
        }
    }

    fn on_bar_subscription_success(
        &mut self,
        _ctx: &mut ActorContext,
        bar_type: &BarType,
        spec: &BarSpecification,
    ) {
        info!(bar_type = %bar_type, spec = %spec, "Bar subscription confirmed");
    }

    fn on_bar_subscription_failure(&mut self, _ctx: &mut ActorContext, bar_type: &BarType, error: &str) {
        error!(bar_type = %bar_type, error = %error, "Bar subscription failed");
    }

    fn on_error(&mut self, _ctx: &mut ActorContext, error: &RuntimeError) {
        error!(error = %error, "Runtime error");
    }

    fn on_event(&mut self, _ctx: &mut ActorContext, event: &NodeEvent) {
        debug!(event = %event, "Node event");
    }
}
