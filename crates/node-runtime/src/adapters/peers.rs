//! # Peer Connections
//!
//! TCP listener and dialer around [`WireTransport`]. Each connection gets a
//! reader task feeding `network_in` and a writer task draining a per-peer
//! outbox.
//!
//! ```text
//!  TCP ──► WireReader ──► DispatchHandle::submit_network ──► network_in
//!  TCP ◄── WireWriter ◄── peer outbox ◄── broadcast ◄── network_out
//! ```
//!
//! A full `network_in` stalls the reader, so a flood from one peer slows
//! that peer's socket rather than growing memory. The outbox is the
//! opposite: a peer that cannot keep up has parcels dropped for it.

use fc_01_wire::{
    CloseHandle, Parcel, ParcelError, TransportConfig, TransportError, WireReader, WireTransport,
    WireWriter,
};
use fc_05_dispatch::{DispatchHandle, Envelope, Origin};
use parking_lot::RwLock;
use shared_bus::{EventPublisher, NodeEvent};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

struct PeerLink {
    addr: String,
    outbox: mpsc::Sender<Arc<Parcel>>,
    close: CloseHandle,
}

/// Peer settings taken from node configuration.
#[derive(Debug, Clone)]
pub struct PeerSettings {
    pub transport: TransportConfig,
    pub max_payload: usize,
    pub outbox: usize,
    pub redial_interval: Duration,
}

impl PeerSettings {
    /// Idle time after which the writer sends a heartbeat. Kept well under
    /// the read timeout so a quiet but healthy link never trips it.
    fn heartbeat_interval(&self) -> Duration {
        (self.transport.read_timeout / 3).max(Duration::from_millis(1))
    }
}

pub struct PeerManager {
    settings: PeerSettings,
    dispatch: DispatchHandle,
    events: Arc<dyn EventPublisher>,
    peers: RwLock<HashMap<Uuid, PeerLink>>,
    shutdown: watch::Receiver<bool>,
}

impl PeerManager {
    pub fn new(
        settings: PeerSettings,
        dispatch: DispatchHandle,
        events: Arc<dyn EventPublisher>,
        shutdown: watch::Receiver<bool>,
    ) -> Arc<Self> {
        Arc::new(Self {
            settings,
            dispatch,
            events,
            peers: RwLock::new(HashMap::new()),
            shutdown,
        })
    }

    pub fn peer_count(&self) -> usize {
        self.peers.read().len()
    }

    pub fn peer_addrs(&self) -> Vec<String> {
        self.peers.read().values().map(|p| p.addr.clone()).collect()
    }

    /// Close every connection. Reader tasks observe the close and
    /// unregister themselves.
    pub fn close_all(&self) {
        for link in self.peers.read().values() {
            link.close.close();
        }
    }

    /// Accept connections until shutdown.
    pub fn listen(self: &Arc<Self>, listener: TcpListener) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut shutdown = this.shutdown.clone();
            loop {
                tokio::select! {
                    biased;
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    accepted = listener.accept() => match accepted {
                        Ok((stream, addr)) => {
                            info!(peer = %addr, "Accepted peer connection");
                            let _session = this.attach(stream, addr.to_string());
                        }
                        Err(e) => warn!(error = %e, "Accept failed"),
                    },
                }
            }
            info!("[PeerListener] Shutdown signal received");
        })
    }

    /// Keep a connection to `addr` open, redialing after failures or
    /// disconnects until shutdown.
    pub fn dial(self: &Arc<Self>, addr: String) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut shutdown = this.shutdown.clone();
            loop {
                if *shutdown.borrow() {
                    break;
                }
                match TcpStream::connect(&addr).await {
                    Ok(stream) => {
                        info!(peer = %addr, "Connected to peer");
                        let session = this.attach(stream, addr.clone());
                        tokio::select! {
                            _ = session => {}
                            changed = shutdown.changed() => {
                                if changed.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Err(e) => debug!(peer = %addr, error = %e, "Dial failed"),
                }
                tokio::select! {
                    () = tokio::time::sleep(this.settings.redial_interval) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!(peer = %addr, "[PeerDialer] Stopped");
        })
    }

    /// Register a connected stream and spawn its reader and writer. The
    /// returned handle resolves when the connection ends.
    pub fn attach(self: &Arc<Self>, stream: TcpStream, addr: String) -> JoinHandle<()> {
        if let Err(e) = stream.set_nodelay(true) {
            debug!(peer = %addr, error = %e, "set_nodelay failed");
        }
        let conn_id = Uuid::new_v4();
        let transport = WireTransport::new(stream, self.settings.transport.clone());
        let close = transport.close_handle();
        let (reader, writer) = transport.split();
        let (outbox_tx, outbox_rx) = mpsc::channel(self.settings.outbox.max(1));

        self.peers.write().insert(
            conn_id,
            PeerLink {
                addr: addr.clone(),
                outbox: outbox_tx,
                close,
            },
        );

        tokio::spawn(write_loop(
            writer,
            outbox_rx,
            self.settings.transport.network,
            self.settings.transport.node_id,
            self.settings.transport.listen_port.clone(),
            self.settings.heartbeat_interval(),
        ));

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.events
                .publish(NodeEvent::PeerConnected {
                    conn_id,
                    addr: addr.clone(),
                })
                .await;
            let reason = this.read_loop(reader, &addr).await;
            if let Some(link) = this.peers.write().remove(&conn_id) {
                link.close.close();
            }
            info!(peer = %addr, %conn_id, %reason, "Peer disconnected");
            this.events
                .publish(NodeEvent::PeerDisconnected {
                    conn_id,
                    addr,
                    reason,
                })
                .await;
        })
    }

    /// Feed decoded messages to the dispatcher until the connection fails.
    /// Returns the disconnect reason.
    #[instrument(skip(self, reader, addr), fields(peer = %addr))]
    async fn read_loop(&self, mut reader: WireReader<ReadHalf<TcpStream>>, addr: &str) -> String {
        loop {
            match reader.receive().await {
                Ok(Some(msg)) => {
                    trace!(command = msg.command(), "Message received");
                    if self.dispatch.submit_network(msg, addr).await.is_err() {
                        return "dispatcher stopped".to_string();
                    }
                }
                Ok(None) => trace!("Heartbeat"),
                Err(e) if is_fatal(&e) => return e.to_string(),
                Err(e) => debug!(error = %e, "Dropping undecodable parcel"),
            }
        }
    }

    /// Fan `network_out` to every connected peer except the one a message
    /// came from. Runs until the dispatcher closes `network_out`.
    pub fn broadcast(self: &Arc<Self>, mut outbound: mpsc::Receiver<Envelope>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(env) = outbound.recv().await {
                this.broadcast_one(&env);
            }
            debug!("[PeerBroadcast] Outbound queue closed");
        })
    }

    fn broadcast_one(&self, env: &Envelope) {
        let payload = match env.message.encode() {
            Ok(payload) if payload.is_empty() => return,
            Ok(payload) => payload,
            Err(e) => {
                warn!(command = env.message.command(), error = %e, "Cannot encode outbound message");
                return;
            }
        };
        if payload.len() > self.settings.max_payload {
            warn!(
                command = env.message.command(),
                size = payload.len(),
                max = self.settings.max_payload,
                "Outbound message exceeds max payload, not broadcast"
            );
            return;
        }
        let t = &self.settings.transport;
        let parcel = Arc::new(
            Parcel::new(t.network, payload)
                .with_node_id(t.node_id)
                .with_port(t.listen_port.clone()),
        );

        let source = match &env.origin {
            Origin::Peer(addr) => Some(addr.as_str()),
            Origin::Local => None,
        };
        let peers = self.peers.read();
        let mut sent = 0usize;
        for link in peers.values() {
            if source == Some(link.addr.as_str()) {
                continue;
            }
            match link.outbox.try_send(Arc::clone(&parcel)) {
                Ok(()) => sent += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(peer = %link.addr, "Peer outbox full, parcel dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        debug!(command = env.message.command(), peers = sent, "Broadcast");
    }
}

/// Errors after which the stream cannot be trusted or used. A bad length
/// prefix is fatal: only the prefix was consumed, so the next read would
/// start mid-frame. The remaining parcel errors cover a whole frame.
fn is_fatal(e: &TransportError) -> bool {
    match e {
        TransportError::Parcel(ParcelError::FrameLength { .. }) => true,
        TransportError::Parcel(_) | TransportError::Message(_) => false,
        _ => true,
    }
}

async fn write_loop(
    mut writer: WireWriter<WriteHalf<TcpStream>>,
    mut outbox: mpsc::Receiver<Arc<Parcel>>,
    network: shared_types::NetworkId,
    node_id: u64,
    port: String,
    heartbeat: Duration,
) {
    loop {
        let parcel = match tokio::time::timeout(heartbeat, outbox.recv()).await {
            Ok(Some(parcel)) => parcel,
            Ok(None) => break,
            Err(_) => Arc::new(
                Parcel::heartbeat(network)
                    .with_node_id(node_id)
                    .with_port(port.clone()),
            ),
        };
        if let Err(e) = writer.send_parcel(&parcel).await {
            debug!(error = %e, "Peer write failed");
            break;
        }
    }
    writer.close().await;
}
