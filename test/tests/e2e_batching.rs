/// END-TO-END: outgoing batches, loopback and per-message isolation
use tether_shared::{
    BehaviourIndex, ClientId, DeliveryMode, EnvelopeReader, Instant, MessageEnvelope,
    NetworkMessage, ObjectId, SendError,
};
use tether_test::{exchange, init_logger, ChatMessage, LocalNetwork, TestPeer, CHAT_TAG, EMOTE};

const CLIENT: ClientId = ClientId(3);

fn chat(peer: &mut TestPeer, text: &str, to: ClientId, delivery: DeliveryMode) {
    peer.manager
        .send(&ChatMessage::new(text), to, delivery)
        .unwrap();
}

fn texts(chats: Vec<(ClientId, String)>) -> Vec<String> {
    chats.into_iter().map(|(_, text)| text).collect()
}

#[test]
fn messages_share_a_batch_until_the_delivery_mode_changes() {
    init_logger();
    let network = LocalNetwork::new();
    let mut server = TestPeer::server(&network);
    let mut client = TestPeer::client(&network, CLIENT);
    let now = Instant::now();

    chat(&mut server, "a", CLIENT, DeliveryMode::Reliable);
    chat(&mut server, "b", CLIENT, DeliveryMode::Reliable);
    assert_eq!(server.manager.outbox().pending_batches(CLIENT), 1);
    chat(&mut server, "c", CLIENT, DeliveryMode::Unreliable);
    chat(&mut server, "d", CLIENT, DeliveryMode::Reliable);
    assert_eq!(server.manager.outbox().pending_batches(CLIENT), 3);

    assert_eq!(server.flush(), 3);
    let sent = network.sent_between(ClientId::SERVER, CLIENT);
    let modes: Vec<DeliveryMode> = sent.iter().map(|batch| batch.delivery).collect();
    assert_eq!(
        modes,
        vec![DeliveryMode::Reliable, DeliveryMode::Unreliable, DeliveryMode::Reliable]
    );
    assert_eq!(EnvelopeReader::new(&sent[0].payload).count(), 2);

    client.update(&now);
    assert_eq!(texts(client.chats()), vec!["a", "b", "c", "d"]);
    assert!(client
        .chats()
        .iter()
        .all(|(sender, _)| *sender == ClientId::SERVER));
}

#[test]
fn full_batches_start_a_new_one() {
    init_logger();
    let network = LocalNetwork::new();
    let mut server = TestPeer::server(&network);
    let mut client = TestPeer::client(&network, CLIENT);
    let now = Instant::now();

    let line = "x".repeat(100);
    for _ in 0..30 {
        chat(&mut server, &line, CLIENT, DeliveryMode::ReliableSequenced);
    }
    server.flush();

    let sent = network.sent_between(ClientId::SERVER, CLIENT);
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|batch| batch.payload.len() <= 1300));

    let summary = client.update(&now);
    assert_eq!(summary.handled, 30);
}

#[test]
fn oversized_message_needs_fragmented_delivery() {
    init_logger();
    let network = LocalNetwork::new();
    let mut server = TestPeer::server(&network);
    let mut client = TestPeer::client(&network, CLIENT);
    let now = Instant::now();

    let essay = "y".repeat(2000);
    let result = server
        .manager
        .send(&ChatMessage::new(&essay), CLIENT, DeliveryMode::Reliable);
    assert!(matches!(result, Err(SendError::MessageTooLarge { .. })));
    assert_eq!(server.manager.outbox().pending_batches(CLIENT), 0);

    chat(
        &mut server,
        &essay,
        CLIENT,
        DeliveryMode::ReliableFragmentedSequenced,
    );
    exchange(&mut [&mut server, &mut client], &now);
    assert_eq!(texts(client.chats()), vec![essay]);
}

#[test]
fn bad_envelopes_are_skipped_individually() {
    init_logger();
    let network = LocalNetwork::new();
    let mut server = TestPeer::server(&network);
    let now = Instant::now();

    let mut batch = Vec::new();
    // declares a 200 byte string with no bytes behind it
    batch.extend(MessageEnvelope::new(CHAT_TAG, vec![200]).to_bytes());
    batch.extend(MessageEnvelope::new(CHAT_TAG, ChatMessage::new("one").to_payload()).to_bytes());
    batch.extend(MessageEnvelope::new(999, vec![1, 2, 3]).to_bytes());
    batch.extend(MessageEnvelope::new(CHAT_TAG, ChatMessage::new("two").to_payload()).to_bytes());
    network.inject(CLIENT, ClientId::SERVER, batch, DeliveryMode::Reliable);

    let summary = server.update(&now);
    assert_eq!(summary.handled, 2);
    assert_eq!(summary.dropped, 2);
    assert_eq!(
        server.chats(),
        vec![(CLIENT, "one".to_string()), (CLIENT, "two".to_string())]
    );
}

#[test]
fn truncated_batch_keeps_what_came_before() {
    init_logger();
    let network = LocalNetwork::new();
    let mut server = TestPeer::server(&network);
    let now = Instant::now();

    let mut batch = MessageEnvelope::new(CHAT_TAG, ChatMessage::new("kept").to_payload()).to_bytes();
    let lost = MessageEnvelope::new(CHAT_TAG, ChatMessage::new("lost").to_payload()).to_bytes();
    batch.extend_from_slice(&lost[..lost.len() - 2]);
    network.inject(CLIENT, ClientId::SERVER, batch, DeliveryMode::Unreliable);

    let summary = server.update(&now);
    assert_eq!(summary.handled, 1);
    assert_eq!(summary.dropped, 1);
    assert_eq!(texts(server.chats()), vec!["kept"]);
}

#[test]
fn host_messages_to_itself_skip_the_transport() {
    init_logger();
    let network = LocalNetwork::new();
    let mut host = TestPeer::host(&network);
    let now = Instant::now();
    assert_eq!(host.client_id(), ClientId::SERVER);

    chat(&mut host, "note to self", ClientId::SERVER, DeliveryMode::Reliable);
    assert_eq!(host.manager.outbox().pending_loopback(), 1);
    assert_eq!(host.flush(), 0);
    assert!(network.sent().is_empty());

    let summary = host.update(&now);
    assert_eq!(summary.handled, 1);
    assert_eq!(host.chats(), vec![(ClientId::SERVER, "note to self".to_string())]);
    assert_eq!(host.manager.outbox().pending_loopback(), 0);
}

#[test]
fn host_player_invokes_its_own_procedures_locally() {
    init_logger();
    let network = LocalNetwork::new();
    let mut host = TestPeer::host(&network);
    let mut client = TestPeer::client(&network, CLIENT);
    let now = Instant::now();
    let player = ObjectId(2);
    host.spawn_player(player, ClientId::SERVER, &[CLIENT], &now);

    host.manager
        .send_rpc(
            player,
            BehaviourIndex(0),
            EMOTE,
            &"bows".to_string(),
            ClientId::SERVER,
        )
        .unwrap();
    exchange(&mut [&mut host, &mut client], &now);

    assert_eq!(
        host.player(player).emotes,
        vec![(ClientId::SERVER, "bows".to_string())]
    );
    // called by the server itself, so nothing is relayed
    assert!(network.sent_between(ClientId::SERVER, CLIENT).is_empty());
}

#[test]
fn disconnect_discards_queued_batches() {
    init_logger();
    let network = LocalNetwork::new();
    let mut server = TestPeer::server(&network);
    let _client = TestPeer::client(&network, CLIENT);
    let now = Instant::now();

    chat(&mut server, "too late", CLIENT, DeliveryMode::Reliable);
    assert_eq!(server.manager.outbox().pending_batches(CLIENT), 1);

    network.disconnect(CLIENT);
    server.update(&now);
    assert_eq!(server.manager.outbox().pending_batches(CLIENT), 0);
    assert_eq!(server.flush(), 0);
    assert!(network.sent_between(ClientId::SERVER, CLIENT).is_empty());
}

#[test]
fn sends_after_disconnect_are_dropped_until_reconnect() {
    init_logger();
    let network = LocalNetwork::new();
    let mut server = TestPeer::server(&network);
    let _client = TestPeer::client(&network, CLIENT);
    let now = Instant::now();
    server.update(&now);

    network.disconnect(CLIENT);
    server.update(&now);
    assert!(server.manager.outbox().is_disconnected(CLIENT));

    chat(&mut server, "anyone there?", CLIENT, DeliveryMode::Reliable);
    assert_eq!(server.manager.outbox().pending_batches(CLIENT), 0);
    assert_eq!(server.flush(), 0);

    let mut client = TestPeer::client(&network, CLIENT);
    server.update(&now);
    assert!(!server.manager.outbox().is_disconnected(CLIENT));

    chat(&mut server, "welcome back", CLIENT, DeliveryMode::Reliable);
    exchange(&mut [&mut server, &mut client], &now);
    assert_eq!(texts(client.chats()), vec!["welcome back"]);
    assert_eq!(network.sent_between(ClientId::SERVER, CLIENT).len(), 1);
}
