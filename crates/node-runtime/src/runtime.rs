//! # Node Runtime
//!
//! Startup and shutdown of a whole node.
//!
//! ## Startup Sequence
//!
//! 1. Build node state ([`NodeContainer`])
//! 2. Bind the peer listener
//! 3. Start the dispatcher consumers
//! 4. Start peer listener, dialers and outbound broadcast
//! 5. Start the event reporter and block ticker
//!
//! Shutdown flips one watch channel. The dispatcher drains and stops, peer
//! connections are closed, and every task is awaited with a deadline.

use crate::adapters::peers::{PeerManager, PeerSettings};
use crate::container::{NodeConfig, NodeContainer};
use crate::handlers::{BlockTicker, EventReporter};
use anyhow::{Context, Result};
use fc_05_dispatch::{DispatchHandle, DispatchMetrics, Dispatcher, NodeContext};
use shared_bus::{EventFilter, InMemoryEventBus};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How long shutdown waits for tasks before abandoning them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A built but not yet started node.
pub struct NodeRuntime {
    container: NodeContainer,
}

impl NodeRuntime {
    pub fn build(config: NodeConfig) -> Result<Self> {
        Ok(Self {
            container: NodeContainer::build(config)?,
        })
    }

    pub fn context(&self) -> &Arc<NodeContext> {
        &self.container.ctx
    }

    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.container.bus
    }

    /// Bind, spawn every task and return a handle to the running node.
    pub async fn start(self) -> Result<RunningNode> {
        let NodeContainer {
            config,
            ctx,
            bus,
            node_id,
        } = self.container;

        let listen_addr = config.listen_addr()?;
        let listener = TcpListener::bind(listen_addr)
            .await
            .with_context(|| format!("Failed to bind {listen_addr}"))?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "Listening for peers");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Reporter subscribes before anything can publish.
        let reporter = EventReporter::new(bus.event_stream(EventFilter::all()), shutdown_rx.clone());

        let mut dispatcher = Dispatcher::new(ctx.clone(), config.dispatch.clone());
        let dispatch = dispatcher.handle();
        let metrics = dispatcher.metrics();
        let outbound = dispatcher.take_outbound();
        let dispatch_tasks = dispatcher.start(shutdown_rx.clone());
        info!(tasks = dispatch_tasks.len(), "Dispatcher started");

        let mut transport = config.transport_config(node_id)?;
        transport.listen_port = local_addr.port().to_string();
        let peers = PeerManager::new(
            PeerSettings {
                transport,
                max_payload: config.transport.max_payload,
                outbox: config.transport.peer_outbox,
                redial_interval: Duration::from_millis(config.network.redial_interval_ms),
            },
            dispatch.clone(),
            bus.clone(),
            shutdown_rx.clone(),
        );

        let mut tasks: Vec<JoinHandle<()>> = Vec::new();
        tasks.push(peers.listen(listener));
        if let Some(outbound) = outbound {
            tasks.push(peers.broadcast(outbound));
        }
        for addr in &config.network.peers {
            tasks.push(peers.dial(addr.clone()));
        }
        tasks.push(tokio::spawn(reporter.run()));

        if let Some(ticker) = BlockTicker::new(
            ctx.clone(),
            dispatch.clone(),
            Duration::from_millis(config.block.interval_ms),
            shutdown_rx.clone(),
        ) {
            tasks.push(tokio::spawn(ticker.run()));
        }

        info!(
            peers = config.network.peers.len(),
            role = ?ctx.role,
            "✅ Node started"
        );

        Ok(RunningNode {
            local_addr,
            dispatch,
            ctx,
            bus,
            metrics,
            peers,
            shutdown_tx,
            dispatch_tasks,
            tasks,
        })
    }
}

/// Handle to a started node.
pub struct RunningNode {
    local_addr: SocketAddr,
    dispatch: DispatchHandle,
    ctx: Arc<NodeContext>,
    bus: Arc<InMemoryEventBus>,
    metrics: Arc<DispatchMetrics>,
    peers: Arc<PeerManager>,
    shutdown_tx: watch::Sender<bool>,
    dispatch_tasks: fc_05_dispatch::DispatchTasks,
    tasks: Vec<JoinHandle<()>>,
}

impl RunningNode {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn dispatch_handle(&self) -> DispatchHandle {
        self.dispatch.clone()
    }

    pub fn context(&self) -> &Arc<NodeContext> {
        &self.ctx
    }

    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    pub fn peer_count(&self) -> usize {
        self.peers.peer_count()
    }

    /// Signal every task to stop, close peers and wait for the tasks.
    pub async fn shutdown(self) {
        info!("Initiating graceful shutdown...");
        if self.shutdown_tx.send(true).is_err() {
            warn!("All shutdown receivers already dropped");
        }
        self.peers.close_all();

        let Self {
            dispatch,
            dispatch_tasks,
            tasks,
            ..
        } = self;
        drop(dispatch);

        let wait = async {
            dispatch_tasks.join().await;
            for task in tasks {
                if let Err(e) = task.await {
                    error!(error = %e, "Task failed during shutdown");
                }
            }
        };
        if tokio::time::timeout(SHUTDOWN_GRACE, wait).await.is_err() {
            warn!("Shutdown grace period elapsed with tasks still running");
        }
        info!("Shutdown complete");
    }
}
