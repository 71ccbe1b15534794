//! Queue consumers. Each runs as its own task and exits when its input
//! queue closes, so closing the intake queues drains the whole pipeline.

pub(crate) mod follower;
pub(crate) mod invalid;
pub(crate) mod leader;
pub(crate) mod validation;

use crate::context::NodeContext;
use crate::domain::{DispatchMetrics, Envelope};
use fc_04_messages::{ExecutionContext, ExecutionMode, ExecutionOutcome, Message};
use shared_bus::NodeEvent;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Resolves once `shutdown` carries `true`. Never resolves if the sender is
/// gone; consumers then stop on queue closure alone.
pub(crate) async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn describe(outcome: ExecutionOutcome) -> String {
    match outcome {
        ExecutionOutcome::VotePending { votes, needed } => format!("pending {votes}/{needed}"),
        ExecutionOutcome::Applied => "applied".to_string(),
        ExecutionOutcome::Logged => "logged".to_string(),
    }
}

/// Execute `env` in `mode` and publish its terminal state. Returns whether
/// execution succeeded.
pub(crate) async fn execute_and_report(
    ctx: &NodeContext,
    metrics: &DispatchMetrics,
    env: &Envelope,
    mode: ExecutionMode,
) -> bool {
    let result = env.message.execute(&ExecutionContext {
        ledger: ctx.ledger.as_ref(),
        mode,
    });

    match result {
        Ok(report) => {
            metrics.inc_executed_ok();
            debug!(
                command = env.message.command(),
                msg_hash = %env.short_hash(),
                lane = env.lane,
                %mode,
                outcome = ?report.outcome,
                "Message executed"
            );
            ctx.events
                .publish(NodeEvent::MessageExecuted {
                    record: env.record(),
                    mode: mode.to_string(),
                    outcome: describe(report.outcome),
                })
                .await;
            if report.outcome == ExecutionOutcome::Applied {
                publish_ledger_change(ctx, &env.message).await;
            }
            true
        }
        Err(e) => {
            metrics.inc_executed_failed();
            warn!(
                command = env.message.command(),
                msg_hash = %env.short_hash(),
                lane = env.lane,
                %mode,
                error = %e,
                "Message execution failed"
            );
            ctx.events
                .publish(NodeEvent::ExecutionFailed {
                    record: env.record(),
                    mode: mode.to_string(),
                    error: e.to_string(),
                })
                .await;
            false
        }
    }
}

async fn publish_ledger_change(ctx: &NodeContext, message: &Message) {
    let event = match message {
        Message::EndOfBlock(_) => {
            let head = ctx.ledger.head();
            NodeEvent::HeightAdvanced {
                height: head.height,
                head: head.head,
            }
        }
        Message::AddServer(_) | Message::RemoveServer(_) => {
            let authorities = ctx.ledger.authorities();
            NodeEvent::AuthoritySetChanged {
                federated: authorities.federated_count(),
                total: authorities.len(),
            }
        }
        Message::Reject(_) => return,
    };
    ctx.events.publish(event).await;
}
