//! # Two-Node Federation
//!
//! A federated node and a client node connected over loopback TCP. The
//! federated node's block votes and admin messages must reach the client
//! and drive its ledger to the same state.

#[cfg(test)]
mod tests {
    use fc_02_signatures::{load_or_create_key, Ed25519Signer, MessageSigner};
    use fc_04_messages::{AddServerMsg, Message};
    use node_runtime::container::config::AuthorityEntry;
    use node_runtime::{NodeConfig, NodeRuntime, RunningNode};
    use shared_bus::{EventFilter, EventTopic, NodeEvent};
    use shared_types::{AuthorityRole, ChainId, ServerRole, Timestamp};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    const WAIT: Duration = Duration::from_secs(10);
    const LEADER_CHAIN: [u8; 32] = [0xA1; 32];

    struct Pair {
        leader: RunningNode,
        client: RunningNode,
        leader_key: Ed25519Signer,
        _dirs: (TempDir, TempDir),
    }

    fn base_config(dir: &TempDir, authority: &AuthorityEntry) -> NodeConfig {
        let mut config = NodeConfig::default();
        config.storage.data_dir = dir.path().to_path_buf();
        config.network.listen_addr = "127.0.0.1:0".to_string();
        config.network.redial_interval_ms = 50;
        config.authorities = vec![authority.clone()];
        config.block.interval_ms = 0;
        config
    }

    async fn start_pair(block_interval_ms: u64) -> Pair {
        let leader_dir = tempfile::tempdir().unwrap();
        let client_dir = tempfile::tempdir().unwrap();

        let leader_key = load_or_create_key(&leader_dir.path().join("node.key")).unwrap();
        let authority = AuthorityEntry {
            chain_id: hex::encode(LEADER_CHAIN),
            role: AuthorityRole::Federated,
            public_key: hex::encode(leader_key.public_key()),
        };

        let mut leader_config = base_config(&leader_dir, &authority);
        leader_config.identity.role = ServerRole::Federated;
        leader_config.block.interval_ms = block_interval_ms;
        let leader = NodeRuntime::build(leader_config)
            .unwrap()
            .start()
            .await
            .unwrap();
        assert_eq!(leader.context().chain_id, ChainId::new(LEADER_CHAIN));

        let mut client_config = base_config(&client_dir, &authority);
        client_config.network.peers = vec![leader.local_addr().to_string()];
        let client = NodeRuntime::build(client_config)
            .unwrap()
            .start()
            .await
            .unwrap();

        timeout(WAIT, async {
            while leader.peer_count() == 0 || client.peer_count() == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("nodes did not connect");

        Pair {
            leader,
            client,
            leader_key,
            _dirs: (leader_dir, client_dir),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_client_follows_block_votes() {
        let pair = start_pair(30).await;
        let client_ledger = pair.client.context().ledger.clone();

        timeout(WAIT, async {
            while client_ledger.height() < 3 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("client did not follow block votes");

        assert!(pair.leader.context().ledger.height() >= client_ledger.height());
        assert!(pair.client.metrics().snapshot().routed_follower >= 3);
        assert_eq!(pair.client.metrics().snapshot().routed_leader, 0);

        pair.client.shutdown().await;
        pair.leader.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_admin_change_reaches_client() {
        let pair = start_pair(0).await;
        let mut client_ledger_events = pair
            .client
            .bus()
            .event_stream(EventFilter::topics(vec![EventTopic::Ledger]));

        let auditor = Ed25519Signer::from_seed([0x42; 32]);
        let mut add = Message::from(AddServerMsg::new(
            ChainId::new([0x42; 32]),
            AuthorityRole::Audit,
            auditor.public_key(),
            Timestamp::now(),
        ));
        add.sign(&pair.leader_key).unwrap();
        pair.leader.dispatch_handle().submit_local(add).await.unwrap();

        let event = timeout(WAIT, client_ledger_events.next())
            .await
            .expect("client saw no ledger change")
            .unwrap();
        assert_eq!(
            event,
            NodeEvent::AuthoritySetChanged {
                federated: 1,
                total: 2
            }
        );
        assert!(pair
            .client
            .context()
            .ledger
            .authorities()
            .contains(&ChainId::new([0x42; 32])));

        pair.client.shutdown().await;
        pair.leader.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_disconnect_reported_on_shutdown() {
        let pair = start_pair(0).await;
        let mut peer_events = pair
            .client
            .bus()
            .event_stream(EventFilter::topics(vec![EventTopic::Peers]));

        pair.leader.shutdown().await;

        let event = timeout(WAIT, peer_events.next()).await.unwrap().unwrap();
        assert!(matches!(event, NodeEvent::PeerDisconnected { .. }));

        pair.client.shutdown().await;
    }
}
