use super::execute_and_report;
use crate::context::NodeContext;
use crate::domain::{DispatchMetrics, Envelope};
use fc_04_messages::ExecutionMode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, instrument};

/// Executes follower-path messages one at a time, in queue order.
pub(crate) struct FollowerExecutor {
    pub ctx: Arc<NodeContext>,
    pub metrics: Arc<DispatchMetrics>,
    pub rx: mpsc::Receiver<Envelope>,
}

impl FollowerExecutor {
    #[instrument(skip(self), name = "follower_executor")]
    pub async fn run(mut self) {
        info!("[FollowerExecutor] Started");
        while let Some(env) = self.rx.recv().await {
            execute_and_report(&self.ctx, &self.metrics, &env, ExecutionMode::Follower).await;
        }
        info!("[FollowerExecutor] Queue closed, stopping");
    }
}
