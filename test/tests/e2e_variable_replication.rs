/// END-TO-END: replicated variables between a dedicated server and two clients
///
/// Player 1 is owned by client 7 and observed by clients 7 and 3. Client 7
/// writes its health, the server applies it and passes it on to client 3.
use tether_shared::{
    Behaviour, BehaviourIndex, BitWriter, ClientId, DeliveryMode, DeltaForwarding, EnvelopeReader,
    Instant, MessagingConfig, ObjectId, ReplicatedVariable, VariableChunk, VariableDeltaMessage,
    VariableError, VariableValue, VARIABLE_DELTA_TAG, VARIABLE_SNAPSHOT_TAG,
};
use tether_test::{exchange, exchange_n_times, init_logger, LocalNetwork, TestPeer, HEALTH};

const PLAYER: ObjectId = ObjectId(1);
const OWNER: ClientId = ClientId(7);
const WATCHER: ClientId = ClientId(3);

struct Session {
    network: LocalNetwork,
    server: TestPeer,
    owner: TestPeer,
    watcher: TestPeer,
    now: Instant,
}

impl Session {
    fn new(server_config: MessagingConfig) -> Self {
        init_logger();
        let network = LocalNetwork::new();
        let mut server = TestPeer::new(&network, server_config);
        let mut owner = TestPeer::client(&network, OWNER);
        let mut watcher = TestPeer::client(&network, WATCHER);
        let now = Instant::now();

        server.spawn_player(PLAYER, OWNER, &[OWNER, WATCHER], &now);
        owner.spawn_player(PLAYER, OWNER, &[], &now);
        watcher.spawn_player(PLAYER, OWNER, &[], &now);

        Self {
            network,
            server,
            owner,
            watcher,
            now,
        }
    }

    fn exchange(&mut self) {
        exchange(
            &mut [&mut self.owner, &mut self.watcher, &mut self.server],
            &self.now,
        );
    }

    fn exchange_twice(&mut self) {
        exchange_n_times(
            &mut [&mut self.owner, &mut self.watcher, &mut self.server],
            2,
            &self.now,
        );
    }
}

fn batch_tags(payload: &[u8]) -> Vec<u16> {
    EnvelopeReader::new(payload)
        .map(|envelope| envelope.expect("well formed batch").tag)
        .collect()
}

#[test]
fn first_replication_sends_one_snapshot_per_observer() {
    let mut session = Session::new(MessagingConfig::server());

    assert_eq!(session.server.replicate(&[PLAYER]), 2);
    session.server.flush();

    for observer in [OWNER, WATCHER] {
        let sent = session.network.sent_between(ClientId::SERVER, observer);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].delivery, DeliveryMode::ReliableSequenced);
        assert_eq!(batch_tags(&sent[0].payload), vec![VARIABLE_SNAPSHOT_TAG]);
    }
    assert!(session.server.manager.replicator().is_synced(PLAYER, WATCHER));

    // nothing changed since the snapshot
    assert_eq!(session.server.replicate(&[PLAYER]), 0);
}

#[test]
fn owner_write_reaches_other_observer_through_server() {
    let mut session = Session::new(MessagingConfig::server());
    session.server.replicate(&[PLAYER]);
    session.exchange();

    let changed = session
        .owner
        .player(PLAYER)
        .variables_mut()
        .set("Health", 50, OWNER)
        .unwrap();
    assert!(changed);
    assert_eq!(session.owner.replicate(&[PLAYER]), 1);
    assert_eq!(session.watcher.replicate(&[PLAYER]), 0);

    session.exchange_twice();

    assert_eq!(session.server.player(PLAYER).health(), Some(50));
    assert_eq!(session.watcher.player(PLAYER).health(), Some(50));

    // the relayed batch is byte for byte what the owner sent
    let from_owner = session.network.sent_between(OWNER, ClientId::SERVER);
    let to_watcher = session.network.sent_between(ClientId::SERVER, WATCHER);
    assert_eq!(batch_tags(&from_owner.last().unwrap().payload), vec![VARIABLE_DELTA_TAG]);
    assert_eq!(
        from_owner.last().unwrap().payload,
        to_watcher.last().unwrap().payload
    );

    // never echoed back to the writer, and not re-sent by the next pass
    assert_eq!(session.network.sent_between(ClientId::SERVER, OWNER).len(), 1);
    assert!(!session.server.player(PLAYER).variables().is_dirty());
    assert_eq!(session.server.replicate(&[PLAYER]), 0);
}

#[test]
fn keep_dirty_server_reserializes_for_other_observers() {
    let config = MessagingConfig {
        delta_forwarding: DeltaForwarding::KeepDirty,
        ..MessagingConfig::server()
    };
    let mut session = Session::new(config);
    session.server.replicate(&[PLAYER]);
    session.exchange();

    session
        .owner
        .player(PLAYER)
        .variables_mut()
        .set("Health", 20, OWNER)
        .unwrap();
    session.owner.replicate(&[PLAYER]);
    session.exchange();

    assert_eq!(session.server.player(PLAYER).health(), Some(20));
    assert!(session.server.player(PLAYER).variables().is_dirty());
    assert_eq!(session.network.sent_between(ClientId::SERVER, WATCHER).len(), 1);

    assert_eq!(session.server.replicate(&[PLAYER]), 1);
    session.exchange();

    assert_eq!(session.watcher.player(PLAYER).health(), Some(20));
    assert_eq!(session.network.sent_between(ClientId::SERVER, OWNER).len(), 1);
}

#[test]
fn consuming_server_does_not_forward() {
    let config = MessagingConfig {
        delta_forwarding: DeltaForwarding::Consume,
        ..MessagingConfig::server()
    };
    let mut session = Session::new(config);
    session.server.replicate(&[PLAYER]);
    session.exchange();

    session
        .owner
        .player(PLAYER)
        .variables_mut()
        .set("Health", 1, OWNER)
        .unwrap();
    session.owner.replicate(&[PLAYER]);
    session.exchange_twice();

    assert_eq!(session.server.player(PLAYER).health(), Some(1));
    assert_eq!(session.watcher.player(PLAYER).health(), Some(100));
    assert_eq!(session.server.replicate(&[PLAYER]), 0);
}

#[test]
fn non_owner_cannot_write_locally() {
    let mut session = Session::new(MessagingConfig::server());

    let result = session
        .watcher
        .player(PLAYER)
        .variables_mut()
        .set("Health", 1, WATCHER);
    assert!(matches!(result, Err(VariableError::PermissionDenied { .. })));
    assert_eq!(session.watcher.player(PLAYER).health(), Some(100));
    assert_eq!(session.watcher.replicate(&[PLAYER]), 0);
}

#[test]
fn forged_delta_from_non_owner_is_rejected() {
    let mut session = Session::new(MessagingConfig::server());
    session.server.replicate(&[PLAYER]);
    session.exchange();

    let forged = ReplicatedVariable::new("Health", 0);
    let mut writer = BitWriter::new();
    forged.serialize_delta(&mut writer);
    let message = VariableDeltaMessage::new(
        PLAYER,
        BehaviourIndex(0),
        DeliveryMode::ReliableSequenced,
        3,
        vec![VariableChunk::new(HEALTH, writer.to_bytes())],
    );
    session
        .watcher
        .manager
        .send(&message, ClientId::SERVER, DeliveryMode::ReliableSequenced)
        .unwrap();
    session.exchange_twice();

    assert_eq!(session.server.player(PLAYER).health(), Some(100));
    assert_eq!(session.owner.player(PLAYER).health(), Some(100));
    // nothing was relayed after the snapshots
    assert_eq!(session.network.sent_between(ClientId::SERVER, OWNER).len(), 1);
}

#[test]
fn server_written_name_reaches_every_observer() {
    let mut session = Session::new(MessagingConfig::server());
    session.server.replicate(&[PLAYER]);
    session.exchange();

    session
        .server
        .player(PLAYER)
        .variables_mut()
        .set("Name", "alice", ClientId::SERVER)
        .unwrap();
    assert_eq!(session.server.replicate(&[PLAYER]), 2);
    session.exchange();

    assert_eq!(session.owner.player(PLAYER).name(), Some("alice"));
    assert_eq!(session.watcher.player(PLAYER).name(), Some("alice"));
}

#[test]
fn position_uses_its_own_delivery_mode() {
    let mut session = Session::new(MessagingConfig::server());
    session.server.replicate(&[PLAYER]);
    session.exchange();

    let player = session.owner.player(PLAYER);
    player.variables_mut().set("Health", 90, OWNER).unwrap();
    player
        .variables_mut()
        .set(
            "Position",
            vec![VariableValue::Float(4.0), VariableValue::Float(0.0)],
            OWNER,
        )
        .unwrap();
    assert_eq!(session.owner.replicate(&[PLAYER]), 2);
    session.owner.flush();

    let modes: Vec<DeliveryMode> = session
        .network
        .sent_between(OWNER, ClientId::SERVER)
        .iter()
        .map(|batch| batch.delivery)
        .collect();
    assert_eq!(
        modes,
        vec![DeliveryMode::UnreliableSequenced, DeliveryMode::ReliableSequenced]
    );

    session.exchange_twice();
    assert_eq!(session.watcher.player(PLAYER).position(), Some((4.0, 0.0)));
    assert_eq!(session.watcher.player(PLAYER).health(), Some(90));
}

#[test]
fn observer_awaiting_snapshot_gets_no_relayed_delta() {
    let mut session = Session::new(MessagingConfig::server());

    // the server has not replicated yet, so nobody holds a snapshot
    session
        .owner
        .player(PLAYER)
        .variables_mut()
        .set("Health", 50, OWNER)
        .unwrap();
    session.owner.replicate(&[PLAYER]);
    session.owner.flush();
    session.server.update(&session.now);
    session.server.flush();
    assert!(session.network.sent_between(ClientId::SERVER, WATCHER).is_empty());
    assert_eq!(session.server.player(PLAYER).health(), Some(50));

    assert_eq!(session.server.replicate(&[PLAYER]), 2);
    session.server.flush();

    let tags: Vec<u16> = session
        .network
        .sent_between(ClientId::SERVER, WATCHER)
        .iter()
        .flat_map(|batch| batch_tags(&batch.payload))
        .collect();
    assert_eq!(tags, vec![VARIABLE_SNAPSHOT_TAG]);

    session.exchange();
    assert_eq!(session.watcher.player(PLAYER).health(), Some(50));
}

#[test]
fn disconnected_observer_is_no_longer_synced() {
    let mut session = Session::new(MessagingConfig::server());
    session.server.replicate(&[PLAYER]);
    assert!(session.server.manager.replicator().is_synced(PLAYER, WATCHER));

    session.network.disconnect(WATCHER);
    session.server.update(&session.now);
    assert!(!session.server.manager.replicator().is_synced(PLAYER, WATCHER));
    assert!(session.server.manager.replicator().is_synced(PLAYER, OWNER));
}
