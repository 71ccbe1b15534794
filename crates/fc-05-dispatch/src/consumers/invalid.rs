use crate::context::NodeContext;
use crate::domain::{DispatchMetrics, Envelope};
use shared_bus::NodeEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

/// Drains `network_invalid`: counts, logs and reports dropped messages.
pub(crate) struct InvalidConsumer {
    pub ctx: Arc<NodeContext>,
    pub metrics: Arc<DispatchMetrics>,
    pub rx: mpsc::Receiver<Envelope>,
}

impl InvalidConsumer {
    #[instrument(skip(self), name = "invalid_consumer")]
    pub async fn run(mut self) {
        info!("[InvalidConsumer] Started");
        while let Some(env) = self.rx.recv().await {
            self.metrics.inc_invalid();
            warn!(
                command = env.message.command(),
                msg_hash = %env.short_hash(),
                origin = %env.origin,
                summary = %env.message.summary(),
                "Dropping invalid message"
            );
            self.ctx
                .events
                .publish(NodeEvent::MessageInvalid {
                    record: env.record(),
                })
                .await;
        }
        info!("[InvalidConsumer] Queue closed, stopping");
    }
}
