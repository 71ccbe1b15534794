//! # Dispatch Queues
//!
//! The six bounded queues. Every queue has the same fixed capacity; a full
//! queue blocks its producer, which pushes backpressure back to the peer
//! read loops.
//!
//! ```text
//!  network_in ──┐                 ┌──► leader_in ───► lane executors ──► network_out
//!               ├──► validation ──┼──► follower_in ─► follower executor
//!  generic_in ──┘                 └──► network_invalid ─► invalid consumer
//! ```

use crate::domain::Envelope;
use tokio::sync::mpsc;

pub(crate) const NETWORK_IN: &str = "network_in";
pub(crate) const NETWORK_INVALID: &str = "network_invalid";
pub(crate) const NETWORK_OUT: &str = "network_out";
pub(crate) const GENERIC_IN: &str = "generic_in";
pub(crate) const LEADER_IN: &str = "leader_in";
pub(crate) const FOLLOWER_IN: &str = "follower_in";

pub(crate) struct QueueSenders {
    pub network_in: mpsc::Sender<Envelope>,
    pub network_invalid: mpsc::Sender<Envelope>,
    pub network_out: mpsc::Sender<Envelope>,
    pub generic_in: mpsc::Sender<Envelope>,
    pub leader_in: mpsc::Sender<Envelope>,
    pub follower_in: mpsc::Sender<Envelope>,
}

pub(crate) struct QueueReceivers {
    pub network_in: mpsc::Receiver<Envelope>,
    pub network_invalid: mpsc::Receiver<Envelope>,
    /// Taken by the runtime's broadcast task.
    pub network_out: Option<mpsc::Receiver<Envelope>>,
    pub generic_in: mpsc::Receiver<Envelope>,
    pub leader_in: mpsc::Receiver<Envelope>,
    pub follower_in: mpsc::Receiver<Envelope>,
}

pub(crate) fn queue_set(capacity: usize) -> (QueueSenders, QueueReceivers) {
    let capacity = capacity.max(1);
    let (network_in_tx, network_in_rx) = mpsc::channel(capacity);
    let (invalid_tx, invalid_rx) = mpsc::channel(capacity);
    let (out_tx, out_rx) = mpsc::channel(capacity);
    let (generic_tx, generic_rx) = mpsc::channel(capacity);
    let (leader_tx, leader_rx) = mpsc::channel(capacity);
    let (follower_tx, follower_rx) = mpsc::channel(capacity);
    (
        QueueSenders {
            network_in: network_in_tx,
            network_invalid: invalid_tx,
            network_out: out_tx,
            generic_in: generic_tx,
            leader_in: leader_tx,
            follower_in: follower_tx,
        },
        QueueReceivers {
            network_in: network_in_rx,
            network_invalid: invalid_rx,
            network_out: Some(out_rx),
            generic_in: generic_rx,
            leader_in: leader_rx,
            follower_in: follower_rx,
        },
    )
}
