//! # Block Ticker
//!
//! On a federated server, casts this node's End-of-Block vote for the
//! current height once per block interval. The vote enters the dispatcher
//! as a local message, so it is validated and broadcast like any other.

use fc_04_messages::{EndOfBlockMsg, Message};
use fc_05_dispatch::{DispatchHandle, NodeContext};
use shared_types::{ServerRole, Timestamp};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

pub struct BlockTicker {
    ctx: Arc<NodeContext>,
    dispatch: DispatchHandle,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
    last_voted: Option<u64>,
}

impl BlockTicker {
    /// `None` unless this node is federated and the interval is non-zero.
    pub fn new(
        ctx: Arc<NodeContext>,
        dispatch: DispatchHandle,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Option<Self> {
        if ctx.role != ServerRole::Federated || interval.is_zero() {
            return None;
        }
        Some(Self {
            ctx,
            dispatch,
            interval,
            shutdown,
            last_voted: None,
        })
    }

    #[instrument(skip(self), name = "block_ticker")]
    pub async fn run(mut self) {
        info!(interval_ms = self.interval.as_millis() as u64, "[BlockTicker] Started");
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.interval,
            self.interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if !self.tick().await {
                        break;
                    }
                }
            }
        }
        info!("[BlockTicker] Stopped");
    }

    /// Vote for the current height unless already done. Returns `false`
    /// once the dispatcher is gone.
    async fn tick(&mut self) -> bool {
        let height = self.ctx.ledger.height();
        if self.last_voted == Some(height) {
            debug!(height, "Height unchanged, vote already cast");
            return true;
        }

        let mut msg = Message::from(EndOfBlockMsg::new(
            self.ctx.chain_id,
            height,
            Timestamp::now(),
        ));
        if let Err(e) = msg.sign(self.ctx.signer.as_ref()) {
            warn!(height, error = %e, "Failed to sign End-of-Block");
            return true;
        }
        if self.dispatch.submit_local(msg).await.is_err() {
            return false;
        }
        self.last_voted = Some(height);
        info!(height, "🗳️ End-of-Block vote submitted");
        true
    }
}
