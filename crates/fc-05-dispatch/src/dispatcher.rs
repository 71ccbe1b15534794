//! # Consensus Dispatcher
//!
//! Owns the six queues and spawns their consumers.
//!
//! ## Lifecycle
//!
//! 1. `Dispatcher::new` creates the queues.
//! 2. Hand out [`DispatchHandle`]s to whatever feeds messages in, and take
//!    the outbound receiver if the node has peers to broadcast to.
//! 3. `start` spawns the consumers. The pipeline drains and stops when
//!    every handle is dropped, or at once when `shutdown` turns `true`.
//!
//! Queue contents are never persisted; in-flight messages are lost on
//! restart.

use crate::consumers::follower::FollowerExecutor;
use crate::consumers::invalid::InvalidConsumer;
use crate::consumers::leader::{LaneExecutor, LeaderRouter};
use crate::consumers::validation::ValidationConsumer;
use crate::context::NodeContext;
use crate::domain::{
    DispatchConfig, DispatchError, DispatchMetrics, DispatchResult, Envelope, SeenCache,
};
use crate::queues::{queue_set, QueueReceivers, QueueSenders, GENERIC_IN, NETWORK_IN};
use fc_04_messages::Message;
use std::collections::BinaryHeap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Producer side of the intake queues. Cheap to clone; one per peer reader.
#[derive(Clone)]
pub struct DispatchHandle {
    network_in: mpsc::Sender<Envelope>,
    generic_in: mpsc::Sender<Envelope>,
}

impl DispatchHandle {
    /// Queue a message received from `peer`. Waits while `network_in` is
    /// full.
    ///
    /// # Errors
    /// `DispatchError::QueueClosed` once the dispatcher has stopped.
    pub async fn submit_network(&self, message: Message, peer: impl Into<String>) -> DispatchResult<()> {
        self.network_in
            .send(Envelope::from_peer(message, peer))
            .await
            .map_err(|_| DispatchError::QueueClosed(NETWORK_IN))
    }

    /// Queue a message this node created. Accepted local messages are also
    /// broadcast on the outbound queue.
    ///
    /// # Errors
    /// `DispatchError::QueueClosed` once the dispatcher has stopped.
    pub async fn submit_local(&self, message: Message) -> DispatchResult<()> {
        self.generic_in
            .send(Envelope::local(message))
            .await
            .map_err(|_| DispatchError::QueueClosed(GENERIC_IN))
    }

    /// Messages waiting on `network_in`.
    pub fn network_in_depth(&self) -> usize {
        self.network_in.max_capacity() - self.network_in.capacity()
    }
}

pub struct Dispatcher {
    ctx: Arc<NodeContext>,
    config: DispatchConfig,
    metrics: Arc<DispatchMetrics>,
    senders: QueueSenders,
    receivers: QueueReceivers,
}

impl Dispatcher {
    pub fn new(ctx: Arc<NodeContext>, config: DispatchConfig) -> Self {
        if config.lanes != ctx.ledger.lane_count() {
            warn!(
                configured = config.lanes,
                ledger = ctx.ledger.lane_count(),
                "Lane count differs from the ledger's; using the ledger's"
            );
        }
        let (senders, receivers) = queue_set(config.queue_capacity);
        Self {
            ctx,
            config,
            metrics: Arc::new(DispatchMetrics::default()),
            senders,
            receivers,
        }
    }

    pub fn handle(&self) -> DispatchHandle {
        DispatchHandle {
            network_in: self.senders.network_in.clone(),
            generic_in: self.senders.generic_in.clone(),
        }
    }

    /// Take the receiving end of `network_out`. Returns `None` after the
    /// first call. If never taken, outbound messages are discarded.
    pub fn take_outbound(&mut self) -> Option<mpsc::Receiver<Envelope>> {
        self.receivers.network_out.take()
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn context(&self) -> &Arc<NodeContext> {
        &self.ctx
    }

    /// Spawn every consumer onto the current runtime.
    pub fn start(self, shutdown: watch::Receiver<bool>) -> DispatchTasks {
        let Self {
            ctx,
            config,
            metrics,
            senders,
            receivers,
        } = self;
        let QueueSenders {
            network_invalid,
            network_out,
            leader_in,
            follower_in,
            ..
        } = senders;

        let lane_count = ctx.ledger.lane_count();
        let mut handles = Vec::with_capacity(lane_count as usize + 4);
        let mut lanes = Vec::with_capacity(lane_count as usize);
        for lane in 0..lane_count {
            let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
            lanes.push(tx);
            handles.push(tokio::spawn(
                LaneExecutor {
                    lane,
                    ctx: Arc::clone(&ctx),
                    metrics: Arc::clone(&metrics),
                    rx,
                    network_out: network_out.clone(),
                }
                .run(),
            ));
        }

        handles.push(tokio::spawn(
            LeaderRouter {
                rx: receivers.leader_in,
                lanes,
            }
            .run(),
        ));
        handles.push(tokio::spawn(
            FollowerExecutor {
                ctx: Arc::clone(&ctx),
                metrics: Arc::clone(&metrics),
                rx: receivers.follower_in,
            }
            .run(),
        ));
        handles.push(tokio::spawn(
            InvalidConsumer {
                ctx: Arc::clone(&ctx),
                metrics: Arc::clone(&metrics),
                rx: receivers.network_invalid,
            }
            .run(),
        ));
        handles.push(tokio::spawn(
            ValidationConsumer {
                ctx: Arc::clone(&ctx),
                metrics,
                retry: config.retry,
                seen: SeenCache::new(config.seen_capacity),
                network_in: receivers.network_in,
                generic_in: receivers.generic_in,
                invalid: network_invalid,
                leader: leader_in,
                follower: follower_in,
                network_out,
                shutdown,
                deferred: BinaryHeap::new(),
                deferred_capacity: config.deferred_capacity.max(1),
                seq: 0,
            }
            .run(),
        ));

        info!(
            lanes = lane_count,
            capacity = config.queue_capacity,
            role = ?ctx.role,
            chain_id = %ctx.chain_id.short(),
            "Dispatcher started"
        );
        DispatchTasks { handles }
    }
}

/// Join handles of the spawned consumers.
pub struct DispatchTasks {
    handles: Vec<JoinHandle<()>>,
}

impl DispatchTasks {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every consumer to stop.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Dispatch task panicked");
            }
        }
        info!("Dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RetryPolicy;
    use crate::test_support::{federated_node, Node};
    use fc_02_signatures::Ed25519Signer;
    use fc_04_messages::{EndOfBlockMsg, RejectCode, RejectMsg, RemoveServerMsg};
    use shared_bus::{EventFilter, EventTopic, NodeEvent, Subscription};
    use shared_types::{AuthorityRole, ChainId, ServerRole, Timestamp};
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    async fn next(sub: &mut Subscription) -> NodeEvent {
        timeout(WAIT, sub.recv()).await.unwrap().unwrap()
    }

    fn notice(reason: &str) -> Message {
        Message::from(RejectMsg::new("removeserver", RejectCode::INVALID, reason, None).unwrap())
    }

    #[tokio::test]
    async fn test_local_block_completion_leads_and_broadcasts() {
        let node = federated_node();
        let mut ledger_events = node.bus.subscribe(EventFilter::topics(vec![EventTopic::Ledger]));
        let mut dispatcher = node.dispatcher(DispatchConfig::default());
        let mut outbound = dispatcher.take_outbound().unwrap();
        let handle = dispatcher.handle();
        let (_tx, shutdown) = watch::channel(false);
        let _tasks = dispatcher.start(shutdown);

        let eob = node.signed(EndOfBlockMsg::new(node.chain_id, 0, Timestamp::now()));
        handle.submit_local(eob.clone()).await.unwrap();

        let sent = timeout(WAIT, outbound.recv()).await.unwrap().unwrap();
        assert_eq!(sent.message.msg_hash(), eob.msg_hash());
        match next(&mut ledger_events).await {
            NodeEvent::HeightAdvanced { height, .. } => assert_eq!(height, 1),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(node.ctx.ledger.height(), 1);
    }

    #[tokio::test]
    async fn test_peer_message_rebroadcast_after_leader_execution() {
        let node = federated_node();
        let mut executed = node.bus.subscribe(EventFilter::topics(vec![EventTopic::Execution]));
        let mut dispatcher = node.dispatcher(DispatchConfig::default());
        let mut outbound = dispatcher.take_outbound().unwrap();
        let metrics = dispatcher.metrics();
        let handle = dispatcher.handle();
        let (_tx, shutdown) = watch::channel(false);
        let _tasks = dispatcher.start(shutdown);

        let eob = node.signed(EndOfBlockMsg::new(node.chain_id, 0, Timestamp::now()));
        handle.submit_network(eob.clone(), "10.0.0.2:8108").await.unwrap();

        match next(&mut executed).await {
            NodeEvent::MessageExecuted { mode, outcome, .. } => {
                assert_eq!(mode, "leader");
                assert_eq!(outcome, "applied");
            }
            other => panic!("unexpected event {other:?}"),
        }
        let sent = timeout(WAIT, outbound.recv()).await.unwrap().unwrap();
        assert_eq!(sent.message.msg_hash(), eob.msg_hash());
        assert_eq!(metrics.snapshot().routed_leader, 1);
    }

    #[tokio::test]
    async fn test_client_follows_without_rebroadcast() {
        let node = Node::new(ServerRole::Client, ChainId::new([9; 32]));
        let mut executed = node.bus.subscribe(EventFilter::topics(vec![EventTopic::Execution]));
        let mut dispatcher = node.dispatcher(DispatchConfig::default());
        let mut outbound = dispatcher.take_outbound().unwrap();
        let metrics = dispatcher.metrics();
        let handle = dispatcher.handle();
        let (_tx, shutdown) = watch::channel(false);
        let _tasks = dispatcher.start(shutdown);

        let eob = node.signed(EndOfBlockMsg::new(node.federation_id(), 0, Timestamp::now()));
        handle.submit_network(eob, "10.0.0.2:8108").await.unwrap();

        match next(&mut executed).await {
            NodeEvent::MessageExecuted { mode, outcome, .. } => {
                assert_eq!(mode, "follower");
                assert_eq!(outcome, "applied");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(outbound.try_recv().is_err());
        let snap = metrics.snapshot();
        assert_eq!(snap.routed_follower, 1);
        assert_eq!(snap.routed_leader, 0);
        assert_eq!(node.ctx.ledger.height(), 1);
    }

    #[tokio::test]
    async fn test_unsigned_message_reported_invalid() {
        let node = federated_node();
        let mut validation = node.bus.subscribe(EventFilter::topics(vec![EventTopic::Validation]));
        let dispatcher = node.dispatcher(DispatchConfig::default());
        let metrics = dispatcher.metrics();
        let handle = dispatcher.handle();
        let (_tx, shutdown) = watch::channel(false);
        let _tasks = dispatcher.start(shutdown);

        let unsigned = Message::from(EndOfBlockMsg::new(node.chain_id, 0, Timestamp::now()));
        handle.submit_network(unsigned.clone(), "peer").await.unwrap();

        match next(&mut validation).await {
            NodeEvent::MessageInvalid { record } => {
                assert_eq!(record.msg_hash, unsigned.msg_hash());
                assert_eq!(record.command, "endofblock");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(metrics.snapshot().invalid, 1);
        assert_eq!(node.ctx.ledger.height(), 0);
    }

    #[tokio::test]
    async fn test_future_block_deferred_until_height_catches_up() {
        let node = federated_node();
        let mut ledger_events = node.bus.subscribe(EventFilter::topics(vec![EventTopic::Ledger]));
        let config = DispatchConfig {
            retry: RetryPolicy {
                max_attempts: 8,
                base_backoff_ms: 10,
                max_backoff_ms: 100,
            },
            ..DispatchConfig::default()
        };
        let dispatcher = node.dispatcher(config);
        let metrics = dispatcher.metrics();
        let handle = dispatcher.handle();
        let (_tx, shutdown) = watch::channel(false);
        let _tasks = dispatcher.start(shutdown);

        let ahead = node.signed(EndOfBlockMsg::new(node.chain_id, 1, Timestamp::now()));
        let current = node.signed(EndOfBlockMsg::new(node.chain_id, 0, Timestamp::now()));
        handle.submit_local(ahead).await.unwrap();
        handle.submit_local(current).await.unwrap();

        for expected in [1, 2] {
            match next(&mut ledger_events).await {
                NodeEvent::HeightAdvanced { height, .. } => assert_eq!(height, expected),
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert!(metrics.snapshot().deferred >= 1);
        assert_eq!(metrics.snapshot().deferred_expired, 0);
    }

    #[tokio::test]
    async fn test_deferred_message_expires_after_max_attempts() {
        let node = federated_node();
        let mut validation = node.bus.subscribe(EventFilter::topics(vec![EventTopic::Validation]));
        let config = DispatchConfig {
            retry: RetryPolicy {
                max_attempts: 3,
                base_backoff_ms: 1,
                max_backoff_ms: 5,
            },
            ..DispatchConfig::default()
        };
        let dispatcher = node.dispatcher(config);
        let metrics = dispatcher.metrics();
        let handle = dispatcher.handle();
        let (_tx, shutdown) = watch::channel(false);
        let _tasks = dispatcher.start(shutdown);

        let unknown = RemoveServerMsg::new(ChainId::new([42; 32]), AuthorityRole::Federated, Timestamp::now());
        handle.submit_network(node.signed(unknown), "peer").await.unwrap();

        match next(&mut validation).await {
            NodeEvent::DeferredExpired { record, attempts } => {
                assert_eq!(attempts, 3);
                assert_eq!(record.command, "removeserver");
            }
            other => panic!("unexpected event {other:?}"),
        }
        let snap = metrics.snapshot();
        assert_eq!(snap.deferred, 3);
        assert_eq!(snap.deferred_expired, 1);
        assert_eq!(snap.executed_ok + snap.executed_failed, 0);
    }

    #[tokio::test]
    async fn test_duplicates_dropped_and_order_kept() {
        let node = federated_node();
        let mut executed = node.bus.subscribe(EventFilter::topics(vec![EventTopic::Execution]));
        let dispatcher = node.dispatcher(DispatchConfig::default());
        let metrics = dispatcher.metrics();
        let handle = dispatcher.handle();
        let (_tx, shutdown) = watch::channel(false);
        let _tasks = dispatcher.start(shutdown);

        let (a, b, c) = (notice("a"), notice("b"), notice("c"));
        for msg in [&a, &a, &b, &c] {
            handle.submit_network(msg.clone(), "peer").await.unwrap();
        }

        let mut hashes = Vec::new();
        for _ in 0..3 {
            match next(&mut executed).await {
                NodeEvent::MessageExecuted { record, mode, outcome } => {
                    assert_eq!(mode, "follower");
                    assert_eq!(outcome, "logged");
                    hashes.push(record.msg_hash);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(hashes, vec![a.msg_hash(), b.msg_hash(), c.msg_hash()]);
        let snap = metrics.snapshot();
        assert_eq!(snap.received, 4);
        assert_eq!(snap.duplicates, 1);
        assert_eq!(snap.executed_ok, 3);
    }

    #[tokio::test]
    async fn test_forged_copy_does_not_shadow_genuine_vote() {
        let node = federated_node();
        let mut ledger_events = node.bus.subscribe(EventFilter::topics(vec![EventTopic::Ledger]));
        let mut validation = node.bus.subscribe(EventFilter::topics(vec![EventTopic::Validation]));
        let dispatcher = node.dispatcher(DispatchConfig::default());
        let metrics = dispatcher.metrics();
        let handle = dispatcher.handle();
        let (_tx, shutdown) = watch::channel(false);
        let _tasks = dispatcher.start(shutdown);

        let body = EndOfBlockMsg::new(node.chain_id, 0, Timestamp::from_millis(1_700_000_000_000));
        let mut forged = Message::from(body.clone());
        forged.sign(&Ed25519Signer::from_seed([9; 32])).unwrap();
        let genuine = node.signed(body);
        assert_eq!(forged.msg_hash(), genuine.msg_hash());

        handle.submit_network(forged, "10.0.0.9:8108").await.unwrap();
        handle.submit_network(genuine, "10.0.0.2:8108").await.unwrap();

        match next(&mut validation).await {
            NodeEvent::MessageInvalid { record } => assert_eq!(record.command, "endofblock"),
            other => panic!("unexpected event {other:?}"),
        }
        match next(&mut ledger_events).await {
            NodeEvent::HeightAdvanced { height, .. } => assert_eq!(height, 1),
            other => panic!("unexpected event {other:?}"),
        }
        let snap = metrics.snapshot();
        assert_eq!(snap.invalid, 1);
        assert_eq!(snap.duplicates, 0);
        assert_eq!(snap.executed_ok, 1);
    }

    #[tokio::test]
    async fn test_full_deferral_heap_pauses_intake() {
        let node = federated_node();
        let mut executed = node.bus.subscribe(EventFilter::topics(vec![EventTopic::Execution]));
        let config = DispatchConfig {
            retry: RetryPolicy {
                max_attempts: 2,
                base_backoff_ms: 200,
                max_backoff_ms: 200,
            },
            deferred_capacity: 1,
            ..DispatchConfig::default()
        };
        let dispatcher = node.dispatcher(config);
        let metrics = dispatcher.metrics();
        let handle = dispatcher.handle();
        let (_tx, shutdown) = watch::channel(false);
        let _tasks = dispatcher.start(shutdown);

        for height in [5, 6] {
            let ahead = node.signed(EndOfBlockMsg::new(node.chain_id, height, Timestamp::now()));
            handle.submit_network(ahead, "peer").await.unwrap();
        }
        let tail = notice("after the backlog");
        handle.submit_network(tail.clone(), "peer").await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let snap = metrics.snapshot();
        assert_eq!(snap.received, 1);
        assert_eq!(snap.deferred, 1);
        assert_eq!(handle.network_in_depth(), 2);

        // Each held vote expires after one retry, freeing the slot.
        match next(&mut executed).await {
            NodeEvent::MessageExecuted { record, .. } => assert_eq!(record.msg_hash, tail.msg_hash()),
            other => panic!("unexpected event {other:?}"),
        }
        let snap = metrics.snapshot();
        assert_eq!(snap.received, 3);
        assert_eq!(snap.deferred_expired, 2);
    }

    #[tokio::test]
    async fn test_full_queue_blocks_producer() {
        let node = federated_node();
        let config = DispatchConfig {
            queue_capacity: 1,
            ..DispatchConfig::default()
        };
        let dispatcher = node.dispatcher(config);
        let handle = dispatcher.handle();

        handle.submit_network(notice("a"), "peer").await.unwrap();
        assert_eq!(handle.network_in_depth(), 1);
        let blocked = timeout(Duration::from_millis(50), handle.submit_network(notice("b"), "peer")).await;
        assert!(blocked.is_err());
        drop(dispatcher);
    }

    #[tokio::test]
    async fn test_submit_after_dispatcher_dropped() {
        let node = federated_node();
        let dispatcher = node.dispatcher(DispatchConfig::default());
        let handle = dispatcher.handle();
        drop(dispatcher);

        let err = handle.submit_local(notice("a")).await.unwrap_err();
        assert_eq!(err, DispatchError::QueueClosed("generic_in"));
    }

    #[tokio::test]
    async fn test_shutdown_stops_all_tasks() {
        let node = federated_node();
        let dispatcher = node.dispatcher(DispatchConfig::default());
        let _handle = dispatcher.handle();
        let (tx, shutdown) = watch::channel(false);
        let tasks = dispatcher.start(shutdown);
        assert_eq!(tasks.len(), 4 + 4);

        tx.send_replace(true);
        timeout(WAIT, tasks.join()).await.unwrap();
    }

    #[tokio::test]
    async fn test_dropping_handles_drains_pipeline() {
        let node = federated_node();
        let dispatcher = node.dispatcher(DispatchConfig::default());
        let handle = dispatcher.handle();
        let (_tx, shutdown) = watch::channel(false);
        let tasks = dispatcher.start(shutdown);

        handle.submit_network(notice("a"), "peer").await.unwrap();
        drop(handle);
        timeout(WAIT, tasks.join()).await.unwrap();
    }
}
