//! Actor trait and the context actors use to issue data commands.
//!
//! Callbacks are synchronous and run on the node's dispatch engine, one at a
//! time. Commands issued through [`ActorContext`] are queued and executed by
//! the engine once the callback returns.

use std::collections::HashSet;

use crate::domain::{ActorId, Bar, BarSpecification, BarType, Instrument, InstrumentId, TraderId};
use crate::error::RuntimeError;

use super::event::NodeEvent;

/// A data request queued by an actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataCommand {
    RequestInstrument(InstrumentId),
    SubscribeBars(BarType),
    UnsubscribeBars(BarType),
}

/// Per-actor handle onto the node's data services.
#[derive(Debug)]
pub struct ActorContext {
    actor_id: ActorId,
    trader_id: TraderId,
    subscriptions: HashSet<BarType>,
    pending: Vec<DataCommand>,
}

impl ActorContext {
    pub fn new(actor_id: ActorId, trader_id: TraderId) -> Self {
        Self {
            actor_id,
            trader_id,
            subscriptions: HashSet::new(),
            pending: Vec::new(),
        }
    }

    #[must_use]
    pub fn actor_id(&self) -> &ActorId {
        &self.actor_id
    }

    #[must_use]
    pub fn trader_id(&self) -> &TraderId {
        &self.trader_id
    }

    /// Ask the venue for an instrument definition.
    ///
    /// The answer arrives through `on_instrument_cached` or
    /// `on_instrument_request_failure`.
    pub fn request_instrument(&mut self, instrument_id: &InstrumentId) {
        self.pending
            .push(DataCommand::RequestInstrument(instrument_id.clone()));
    }

    /// Subscribe to a bar feed. Subscribing twice is a no-op.
    pub fn subscribe_bars(&mut self, bar_type: &BarType) {
        if self.subscriptions.insert(bar_type.clone()) {
            self.pending.push(DataCommand::SubscribeBars(bar_type.clone()));
        }
    }

    /// Cancel a bar subscription.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NotSubscribed`] if this actor holds no
    /// subscription for `bar_type`.
    pub fn unsubscribe_bars(&mut self, bar_type: &BarType) -> Result<(), RuntimeError> {
        if !self.subscriptions.remove(bar_type) {
            return Err(RuntimeError::NotSubscribed {
                bar_type: bar_type.to_string(),
            });
        }
        self.pending
            .push(DataCommand::UnsubscribeBars(bar_type.clone()));
        Ok(())
    }

    #[must_use]
    pub fn is_subscribed(&self, bar_type: &BarType) -> bool {
        self.subscriptions.contains(bar_type)
    }

    /// Take all commands queued since the last drain.
    pub fn drain_commands(&mut self) -> Vec<DataCommand> {
        std::mem::take(&mut self.pending)
    }

    /// Forget a subscription the venue rejected.
    pub(crate) fn forget_subscription(&mut self, bar_type: &BarType) {
        self.subscriptions.remove(bar_type);
    }
}

/// A lifecycle-managed, callback-driven unit of behavior hosted by a node.
///
/// Every callback has a no-op default, so implementors override only what
/// they react to.
pub trait Actor: Send {
    fn id(&self) -> ActorId;

    fn on_start(&mut self, _ctx: &mut ActorContext) {}

    fn on_stop(&mut self, _ctx: &mut ActorContext) {}

    fn on_instrument_cached(&mut self, _ctx: &mut ActorContext, _instrument: &Instrument) {}

    fn on_instrument_request_failure(
        &mut self,
        _ctx: &mut ActorContext,
        _instrument_id: &InstrumentId,
        _reason: &str,
    ) {
    }

    fn on_bar(&mut self, _ctx: &mut ActorContext, _bar: &Bar) {}

    fn on_bar_subscription_success(
        &mut self,
        _ctx: &mut ActorContext,
        _bar_type: &BarType,
        _spec: &BarSpecification,
    ) {
    }

    fn on_bar_subscription_failure(&mut self, _ctx: &mut ActorContext, _bar_type: &BarType, _error: &str) {}

    fn on_error(&mut self, _ctx: &mut ActorContext, _error: &RuntimeError) {}

    fn on_event(&mut self, _ctx: &mut ActorContext, _event: &NodeEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ActorContext {
        ActorContext::new(ActorId::from("Probe-000"), "TESTER-001".parse().unwrap())
    }

    fn bar_type() -> BarType {
        "BTCUSDT-PERP.BINANCE-1-MINUTE-LAST-EXTERNAL".parse().unwrap()
    }

    #[test]
    fn subscribe_queues_command_once() {
        let mut ctx = ctx();
        ctx.subscribe_bars(&bar_type());
        ctx.subscribe_bars(&bar_type());

        assert_eq!(ctx.drain_commands(), vec![DataCommand::SubscribeBars(bar_type())]);
        assert!(ctx.is_subscribed(&bar_type()));
    }

    #[test]
    fn unsubscribe_without_subscription_fails() {
        let mut ctx = ctx();
        let err = ctx.unsubscribe_bars(&bar_type()).unwrap_err();
        assert!(matches!(err, RuntimeError::NotSubscribed { .. }));
        assert!(ctx.drain_commands().is_empty());
    }

    #[test]
    fn unsubscribe_clears_subscription() {
        let mut ctx = ctx();
        ctx.subscribe_bars(&bar_type());
        ctx.drain_commands();

        ctx.unsubscribe_bars(&bar_type()).unwrap();
        assert!(!ctx.is_subscribed(&bar_type()));
        assert_eq!(ctx.drain_commands(), vec![DataCommand::UnsubscribeBars(bar_type())]);
    }

    #[test]
    fn drain_empties_queue() {
        let mut ctx = ctx();
        let id: InstrumentId = "BTCUSDT-PERP.BINANCE".parse().unwrap();
        ctx.request_instrument(&id);
        assert_eq!(ctx.drain_commands().len(), 1);
        assert!(ctx.drain_commands().is_empty());
    }
}
