//! # Event Reporter
//!
//! Turns bus events into log lines. Every event is logged once at a level
//! matching its severity, and as an `EVENT_FLOW_JSON` line at debug for
//! log shippers.

use shared_bus::{EventStream, NodeEvent};
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, instrument, warn};

pub struct EventReporter {
    events: EventStream,
    shutdown: watch::Receiver<bool>,
}

impl EventReporter {
    pub fn new(events: EventStream, shutdown: watch::Receiver<bool>) -> Self {
        Self { events, shutdown }
    }

    #[instrument(skip(self), name = "event_reporter")]
    pub async fn run(mut self) {
        info!("[EventReporter] Started");
        loop {
            tokio::select! {
                biased;
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
                next = self.events.next() => match next {
                    Some(event) => report(&event),
                    None => break,
                },
            }
        }
        info!("[EventReporter] Stopped");
    }
}

fn report(event: &NodeEvent) {
    match event {
        NodeEvent::MessageExecuted {
            record,
            mode,
            outcome,
        } => info!(
            command = %record.command,
            hash = %short(&record.msg_hash),
            %mode,
            %outcome,
            "Executed {}",
            record.summary
        ),
        NodeEvent::ExecutionFailed {
            record,
            mode,
            error,
        } => error!(
            command = %record.command,
            hash = %short(&record.msg_hash),
            %mode,
            %error,
            "Execution failed"
        ),
        NodeEvent::MessageInvalid { record } => warn!(
            command = %record.command,
            hash = %short(&record.msg_hash),
            "Invalid message dropped"
        ),
        NodeEvent::DeferredExpired { record, attempts } => warn!(
            command = %record.command,
            hash = %short(&record.msg_hash),
            attempts,
            "Deferred message expired"
        ),
        NodeEvent::HeightAdvanced { height, head } => {
            info!(height, head = %short(head), "📦 Block complete")
        }
        NodeEvent::AuthoritySetChanged { federated, total } => {
            info!(federated, total, "Authority set changed")
        }
        NodeEvent::PeerConnected { conn_id, addr } => {
            info!(%conn_id, peer = %addr, "Peer connected")
        }
        NodeEvent::PeerDisconnected {
            conn_id,
            addr,
            reason,
        } => info!(%conn_id, peer = %addr, %reason, "Peer disconnected"),
    }

    match serde_json::to_string(event) {
        Ok(json) => debug!("EVENT_FLOW_JSON {}", json),
        Err(e) => debug!(error = %e, "Event not serializable"),
    }
}

fn short(hash: &[u8; 32]) -> String {
    hex::encode(&hash[..4])
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::{EventFilter, EventPublisher, InMemoryEventBus};
    use std::time::Duration;

    #[tokio::test]
    async fn test_reporter_stops_on_shutdown() {
        let bus = InMemoryEventBus::new();
        let (tx, rx) = watch::channel(false);
        let reporter = EventReporter::new(bus.event_stream(EventFilter::all()), rx);
        let task = tokio::spawn(reporter.run());

        bus.publish(NodeEvent::AuthoritySetChanged {
            federated: 1,
            total: 1,
        })
        .await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("reporter did not stop")
            .unwrap();
    }

    #[test]
    fn test_short_hash() {
        assert_eq!(short(&[0xab; 32]), "abababab");
    }
}
