//! Trading node: the runtime control surface.
//!
//! Lifecycle: `Created → Built → Running → Stopped → Disposed`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::{ClientId, TraderId};
use crate::error::{Result, RuntimeError};

use super::actor::Actor;
use super::client::{DataClientConfig, DataClientFactory};
use super::engine::Engine;

/// Static description of a node: who trades and which data clients to build.
#[derive(Debug, Clone)]
pub struct TradingNodeConfig {
    pub trader_id: TraderId,
    pub data_clients: BTreeMap<ClientId, DataClientConfig>,
}

/// Node lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Created,
    Built,
    Running,
    Stopped,
    Disposed,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Hosts actors and data clients and drives their event dispatch.
pub struct TradingNode {
    config: TradingNodeConfig,
    state: NodeState,
    factories: HashMap<ClientId, Arc<dyn DataClientFactory>>,
    actors: Vec<Box<dyn Actor>>,
    engine: Option<Engine>,
    task: Option<JoinHandle<Engine>>,
    shutdown: Option<watch::Sender<bool>>,
}

impl TradingNode {
    pub fn new(config: TradingNodeConfig) -> Self {
        Self {
            config,
            state: NodeState::Created,
            factories: HashMap::new(),
            actors: Vec::new(),
            engine: None,
            task: None,
            shutdown: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> NodeState {
        self.state
    }

    #[must_use]
    pub fn trader_id(&self) -> &TraderId {
        &self.config.trader_id
    }

    /// Register the factory that builds the data client configured under `key`.
    pub fn add_data_client_factory(
        &mut self,
        key: impl Into<ClientId>,
        factory: Arc<dyn DataClientFactory>,
    ) {
        self.factories.insert(key.into(), factory);
    }

    /// Register an actor. Actors must be added before [`build`](Self::build).
    pub fn add_actor(&mut self, actor: Box<dyn Actor>) -> Result<()> {
        self.expect_state(NodeState::Created, "add actor to")?;
        self.actors.push(actor);
        Ok(())
    }

    /// Create every configured data client through its registered factory.
    ///
    /// # Errors
    ///
    /// Fails if a configured client has no factory, or a factory fails.
    pub fn build(&mut self) -> Result<()> {
        self.expect_state(NodeState::Created, "build")?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut clients = Vec::with_capacity(self.config.data_clients.len());
        for (client_id, client_config) in &self.config.data_clients {
            let factory =
                self.factories
                    .get(client_id)
                    .ok_or_else(|| RuntimeError::MissingFactory {
                        client_id: client_id.to_string(),
                    })?;
            clients.push(factory.create(client_id, client_config, events_tx.clone())?);
            debug!(client_id = %client_id, "Data client built");
        }

        let actors = std::mem::take(&mut self.actors);
        info!(
            trader_id = %self.config.trader_id,
            clients = clients.len(),
            actors = actors.len(),
            "Node built"
        );
        self.engine = Some(Engine::new(
            &self.config.trader_id,
            actors,
            clients,
            events_tx,
            events_rx,
        ));
        self.state = NodeState::Built;
        Ok(())
    }

    /// Connect data clients, start actors and begin dispatching events.
    ///
    /// On failure the node moves to `Stopped` so that teardown can still
    /// dispose it. Dropping the future before it resolves drops the engine
    /// and its clients without a disconnect; only `dispose` is valid after.
    pub async fn start(&mut self) -> Result<()> {
        self.expect_state(NodeState::Built, "start")?;
        let Some(mut engine) = self.engine.take() else {
            return Err(self.invalid_state("start").into());
        };

        if let Err(e) = engine.connect_clients().await {
            engine.disconnect_clients().await;
            self.engine = Some(engine);
            self.state = NodeState::Stopped;
            return Err(e);
        }

        engine.start_actors().await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.task = Some(tokio::spawn(engine.run(shutdown_rx)));
        self.shutdown = Some(shutdown_tx);
        self.state = NodeState::Running;
        info!(trader_id = %self.config.trader_id, "Node running");
        Ok(())
    }

    /// Stop dispatching, run actor `on_stop` callbacks and disconnect clients.
    ///
    /// Stopping a node that is not running is a no-op.
    pub async fn stop(&mut self) -> Result<()> {
        if self.state != NodeState::Running {
            debug!(state = %self.state, "Stop requested on non-running node");
            return Ok(());
        }

        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        let task = self.task.take();
        self.state = NodeState::Stopped;

        let mut engine = match task {
            Some(task) => match task.await {
                Ok(engine) => engine,
                Err(e) => {
                    // The engine, its actors and its clients were dropped with the task.
                    error!(error = %e, "Engine task terminated, skipping actor stop and disconnect");
                    return Err(RuntimeError::EngineTerminated(e.to_string()).into());
                }
            },
            None => return Err(RuntimeError::EngineTerminated("no engine task".into()).into()),
        };

        engine.stop_actors().await;
        engine.disconnect_clients().await;
        self.engine = Some(engine);
        info!(trader_id = %self.config.trader_id, "Node stopped");
        Ok(())
    }

    /// Release all actors and clients. A running node is stopped first.
    pub async fn dispose(&mut self) {
        if self.state == NodeState::Disposed {
            return;
        }
        if self.state == NodeState::Running {
            if let Err(e) = self.stop().await {
                warn!(error = %e, "Stop during dispose failed");
            }
        }
        self.engine = None;
        self.actors.clear();
        self.factories.clear();
        self.state = NodeState::Disposed;
        info!(trader_id = %self.config.trader_id, "Node disposed");
    }

    fn expect_state(&self, expected: NodeState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid_state(operation).into())
        }
    }

    fn invalid_state(&self, operation: &'static str) -> RuntimeError {
        RuntimeError::InvalidState {
            operation,
            state: self.state.to_string(),
        }
    }
}
