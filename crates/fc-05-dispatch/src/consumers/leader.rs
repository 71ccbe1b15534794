//! # Leader Execution
//!
//! `leader_in` is split across one executor per lane. Messages with the
//! same subject share a lane and run in order; different lanes run
//! concurrently. The ledger serializes the transitions themselves.

use super::execute_and_report;
use crate::context::NodeContext;
use crate::domain::{DispatchMetrics, Envelope, Origin};
use fc_03_ledger_state::Lane;
use fc_04_messages::ExecutionMode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Moves envelopes from `leader_in` to their lane executor.
pub(crate) struct LeaderRouter {
    pub rx: mpsc::Receiver<Envelope>,
    pub lanes: Vec<mpsc::Sender<Envelope>>,
}

impl LeaderRouter {
    #[instrument(skip(self), name = "leader_router")]
    pub async fn run(mut self) {
        info!(lanes = self.lanes.len(), "[LeaderRouter] Started");
        let count = self.lanes.len() as u32;
        while let Some(env) = self.rx.recv().await {
            if count == 0 {
                break;
            }
            let lane = (env.lane % count) as usize;
            if self.lanes[lane].send(env).await.is_err() {
                warn!(lane, "[LeaderRouter] Lane executor gone, stopping");
                break;
            }
        }
        info!("[LeaderRouter] Queue closed, stopping");
    }
}

/// Executes leader-path messages for one lane and rebroadcasts the ones
/// that came from peers.
pub(crate) struct LaneExecutor {
    pub lane: Lane,
    pub ctx: Arc<NodeContext>,
    pub metrics: Arc<DispatchMetrics>,
    pub rx: mpsc::Receiver<Envelope>,
    pub network_out: mpsc::Sender<Envelope>,
}

impl LaneExecutor {
    #[instrument(skip(self), fields(lane = self.lane), name = "lane_executor")]
    pub async fn run(mut self) {
        debug!("[LaneExecutor] Started");
        while let Some(env) = self.rx.recv().await {
            let ok = execute_and_report(&self.ctx, &self.metrics, &env, ExecutionMode::Leader).await;
            if ok && matches!(env.origin, Origin::Peer(_)) {
                self.rebroadcast(env).await;
            }
        }
        debug!("[LaneExecutor] Queue closed, stopping");
    }

    async fn rebroadcast(&self, env: Envelope) {
        let hash = env.short_hash();
        if self.network_out.send(env).await.is_ok() {
            self.metrics.inc_broadcast();
        } else {
            debug!(msg_hash = %hash, "No outbound consumer, rebroadcast skipped");
        }
    }
}
