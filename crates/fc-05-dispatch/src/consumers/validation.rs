//! # Validation Pipeline
//!
//! Single consumer of `network_in` and `generic_in`. Takes each message
//! through dedup, lane assignment and validation, then routes it by verdict.
//!
//! Deferred messages wait in a due-time heap and are re-validated once
//! their backoff elapses, up to the retry policy's attempt limit. The heap
//! is bounded: while it is full, intake pauses and the intake queues fill,
//! which blocks their producers like any other full queue.

use super::shutdown_signalled;
use crate::context::NodeContext;
use crate::domain::{
    DispatchError, DispatchMetrics, DispatchResult, Envelope, RetryPolicy, SeenCache,
};
use crate::queues::{FOLLOWER_IN, LEADER_IN, NETWORK_INVALID, NETWORK_OUT};
use fc_04_messages::MessageResult;
use shared_bus::NodeEvent;
use shared_types::Verdict;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, instrument, trace, warn};

pub(crate) struct Deferred {
    due: Instant,
    seq: u64,
    env: Envelope,
}

impl PartialEq for Deferred {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Deferred {}

impl PartialOrd for Deferred {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Deferred {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

pub(crate) struct ValidationConsumer {
    pub ctx: Arc<NodeContext>,
    pub metrics: Arc<DispatchMetrics>,
    pub retry: RetryPolicy,
    pub seen: SeenCache,
    pub network_in: mpsc::Receiver<Envelope>,
    pub generic_in: mpsc::Receiver<Envelope>,
    pub invalid: mpsc::Sender<Envelope>,
    pub leader: mpsc::Sender<Envelope>,
    pub follower: mpsc::Sender<Envelope>,
    pub network_out: mpsc::Sender<Envelope>,
    pub shutdown: watch::Receiver<bool>,
    pub deferred: BinaryHeap<Reverse<Deferred>>,
    pub deferred_capacity: usize,
    pub seq: u64,
}

impl ValidationConsumer {
    #[instrument(skip(self), name = "validation")]
    pub async fn run(mut self) {
        info!("[Validation] Started");
        let mut network_open = true;
        let mut generic_open = true;

        loop {
            if !network_open && !generic_open && self.deferred.is_empty() {
                info!("[Validation] Intake queues closed, stopping");
                break;
            }
            let next_due = self.deferred.peek().map(|Reverse(d)| d.due);
            let accepting = self.deferred.len() < self.deferred_capacity;

            let step = tokio::select! {
                biased;
                () = shutdown_signalled(&mut self.shutdown) => {
                    info!(deferred = self.deferred.len(), "[Validation] Shutdown requested, stopping");
                    break;
                }
                () = sleep_until(next_due.unwrap_or_else(Instant::now)), if next_due.is_some() => {
                    self.revalidate_due().await
                }
                msg = self.network_in.recv(), if network_open && accepting => match msg {
                    Some(env) => self.intake(env).await,
                    None => {
                        network_open = false;
                        Ok(())
                    }
                },
                msg = self.generic_in.recv(), if generic_open && accepting => match msg {
                    Some(env) => self.intake(env).await,
                    None => {
                        generic_open = false;
                        Ok(())
                    }
                },
            };

            if let Err(e) = step {
                error!(error = %e, "[Validation] Downstream queue closed, stopping");
                break;
            }
        }
    }

    async fn intake(&mut self, mut env: Envelope) -> DispatchResult<()> {
        self.metrics.inc_received();
        if !self.seen.insert(env.message.dedup_key()) {
            self.metrics.inc_duplicates();
            trace!(msg_hash = %env.short_hash(), origin = %env.origin, "Duplicate message dropped");
            return Ok(());
        }
        env.lane = self.ctx.ledger.compute_lane(&env.message.subject());
        self.process(env).await
    }

    async fn revalidate_due(&mut self) -> DispatchResult<()> {
        let now = Instant::now();
        while self.deferred.peek().is_some_and(|Reverse(d)| d.due <= now) {
            if let Some(Reverse(item)) = self.deferred.pop() {
                self.process(item.env).await?;
            }
        }
        Ok(())
    }

    async fn process(&mut self, env: Envelope) -> DispatchResult<()> {
        let verdict = self.ctx.validate(&env);
        debug!(
            command = env.message.command(),
            msg_hash = %env.short_hash(),
            lane = env.lane,
            attempts = env.attempts,
            %verdict,
            "Message validated"
        );
        match verdict {
            Verdict::Invalid => send(&self.invalid, env, NETWORK_INVALID).await,
            Verdict::Deferred => {
                self.defer(env).await;
                Ok(())
            }
            Verdict::Accepted => self.route(env).await,
        }
    }

    async fn defer(&mut self, mut env: Envelope) {
        env.attempts += 1;
        self.metrics.inc_deferred();
        match self.retry.next_delay(env.attempts) {
            Some(delay) => {
                trace!(
                    msg_hash = %env.short_hash(),
                    attempts = env.attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Message deferred"
                );
                self.seq += 1;
                self.deferred.push(Reverse(Deferred {
                    due: Instant::now() + delay,
                    seq: self.seq,
                    env,
                }));
            }
            None => {
                self.metrics.inc_deferred_expired();
                warn!(
                    command = env.message.command(),
                    msg_hash = %env.short_hash(),
                    attempts = env.attempts,
                    "Deferred message expired"
                );
                self.ctx
                    .events
                    .publish(NodeEvent::DeferredExpired {
                        record: env.record(),
                        attempts: env.attempts,
                    })
                    .await;
            }
        }
    }

    async fn route(&mut self, env: Envelope) -> DispatchResult<()> {
        if env.is_local() {
            if self.network_out.send(env.clone()).await.is_ok() {
                self.metrics.inc_broadcast();
            } else {
                trace!(
                    queue = NETWORK_OUT,
                    msg_hash = %env.short_hash(),
                    "No outbound consumer for local message"
                );
            }
        }

        let role = self.ctx.role_for(env.lane);
        let leader = candidate(env.message.is_leader_candidate(&role), &env, "leader");
        let follower = candidate(env.message.is_follower_candidate(&role), &env, "follower");

        match (leader, follower) {
            (true, true) => {
                self.metrics.inc_routed_leader();
                self.metrics.inc_routed_follower();
                send(&self.leader, env.clone(), LEADER_IN).await?;
                send(&self.follower, env, FOLLOWER_IN).await
            }
            (true, false) => {
                self.metrics.inc_routed_leader();
                send(&self.leader, env, LEADER_IN).await
            }
            (false, true) => {
                self.metrics.inc_routed_follower();
                send(&self.follower, env, FOLLOWER_IN).await
            }
            (false, false) => {
                self.metrics.inc_unrouted();
                debug!(
                    command = env.message.command(),
                    msg_hash = %env.short_hash(),
                    "Accepted message has no execution path on this node"
                );
                Ok(())
            }
        }
    }
}

/// A predicate error means the path is not defined for this message.
fn candidate(result: MessageResult<bool>, env: &Envelope, path: &str) -> bool {
    result.unwrap_or_else(|e| {
        debug!(command = env.message.command(), path, reason = %e, "Not a candidate");
        false
    })
}

async fn send(
    queue: &mpsc::Sender<Envelope>,
    env: Envelope,
    name: &'static str,
) -> DispatchResult<()> {
    queue
        .send(env)
        .await
        .map_err(|_| DispatchError::QueueClosed(name))
}
