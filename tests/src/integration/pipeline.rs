//! # Wire to Ledger Pipeline
//!
//! Frames written by a remote transport are decoded, dispatched, validated
//! and executed against the ledger, all over an in-memory duplex stream.
//!
//! ```text
//! remote WireTransport ──duplex──► WireReader ──► Dispatcher ──► LedgerState
//! ```

#[cfg(test)]
mod tests {
    use crate::fixtures::Federation;
    use fc_01_wire::{TransportConfig, WireTransport};
    use fc_02_signatures::{Ed25519Signer, MessageSigner};
    use fc_04_messages::{AddServerMsg, EndOfBlockMsg, Message};
    use fc_05_dispatch::{DispatchConfig, DispatchHandle, Dispatcher};
    use shared_bus::{EventFilter, EventTopic, NodeEvent};
    use shared_types::{AuthorityRole, ChainId, Timestamp};
    use std::time::Duration;
    use tokio::io::DuplexStream;
    use tokio::sync::watch;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    const WAIT: Duration = Duration::from_secs(5);

    /// Spawn a read loop feeding `dispatch` and return the remote end.
    fn connect(dispatch: DispatchHandle) -> WireTransport<DuplexStream> {
        let (local, remote) = tokio::io::duplex(64 * 1024);
        tokio::spawn(async move {
            let (mut reader, _writer) =
                WireTransport::new(local, TransportConfig::default()).split();
            while let Ok(next) = reader.receive().await {
                if let Some(msg) = next {
                    if dispatch.submit_network(msg, "duplex").await.is_err() {
                        break;
                    }
                }
            }
        });
        WireTransport::new(remote, TransportConfig::default())
    }

    fn eob(height: u64) -> EndOfBlockMsg {
        EndOfBlockMsg::new(ChainId::new([1; 32]), height, Timestamp::from_millis(1_000 + height))
    }

    #[tokio::test]
    async fn test_votes_over_wire_advance_client_ledger() {
        let fed = Federation::new(1);
        let (ctx, _bus) = fed.node(None);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let dispatcher = Dispatcher::new(ctx.clone(), DispatchConfig::default());
        let mut remote = connect(dispatcher.handle());
        let _tasks = dispatcher.start(shutdown_rx);

        // Height 1 arrives first and waits for height 0.
        remote.send(&fed.signed(0, eob(1))).await.unwrap();
        remote.send(&fed.signed(0, eob(0))).await.unwrap();

        timeout(WAIT, async {
            while ctx.ledger.height() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("client ledger did not reach height 2");
    }

    #[tokio::test]
    async fn test_unknown_signer_reported_invalid() {
        let fed = Federation::new(1);
        let (ctx, bus) = fed.node(None);
        let mut invalid = bus.event_stream(EventFilter::topics(vec![EventTopic::Validation]));
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let dispatcher = Dispatcher::new(ctx.clone(), DispatchConfig::default());
        let mut remote = connect(dispatcher.handle());
        let _tasks = dispatcher.start(shutdown_rx);

        let mut forged = Message::from(eob(0));
        forged.sign(&Ed25519Signer::from_seed([9; 32])).unwrap();
        remote.send(&forged).await.unwrap();

        let event = timeout(WAIT, invalid.next())
            .await
            .expect("no validation event")
            .expect("bus closed");
        match event {
            NodeEvent::MessageInvalid { record } => assert_eq!(record.command, "endofblock"),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(ctx.ledger.height(), 0);
    }

    #[tokio::test]
    async fn test_leader_executes_admin_and_queues_rebroadcast() {
        let fed = Federation::new(1);
        let (ctx, bus) = fed.node(Some(0));
        let mut ledger_events = bus.event_stream(EventFilter::topics(vec![EventTopic::Ledger]));
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut dispatcher = Dispatcher::new(ctx.clone(), DispatchConfig::default());
        let mut outbound = dispatcher.take_outbound().unwrap();
        let mut remote = connect(dispatcher.handle());
        let _tasks = dispatcher.start(shutdown_rx);

        let newcomer = Ed25519Signer::from_seed([7; 32]);
        let add = AddServerMsg::new(
            ChainId::new([7; 32]),
            AuthorityRole::Audit,
            newcomer.public_key(),
            Timestamp::from_millis(5),
        );
        let add = fed.signed(0, add);
        remote.send(&add).await.unwrap();

        let event = timeout(WAIT, ledger_events.next()).await.unwrap().unwrap();
        assert_eq!(
            event,
            NodeEvent::AuthoritySetChanged {
                federated: 1,
                total: 2
            }
        );

        let rebroadcast = timeout(WAIT, outbound.recv()).await.unwrap().unwrap();
        assert_eq!(rebroadcast.message.msg_hash(), add.msg_hash());
        assert!(!rebroadcast.is_local());
    }
}
