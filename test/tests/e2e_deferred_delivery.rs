/// END-TO-END: messages that arrive before what they depend on
///
/// A client can receive variable messages for an object before its own copy
/// of that object is spawned, and named messages before their handler is
/// registered. Both wait in the deferred queue and replay in arrival order,
/// unless they waited longer than the configured TTL.
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tether_shared::{
    hash_message_name, Behaviour, ClientId, DeliveryMode, Instant, ObjectId, TriggerKind,
};
use tether_test::{exchange, init_logger, ChatMessage, LocalNetwork, TestPeer};

const PLAYER: ObjectId = ObjectId(11);
const LATECOMER: ClientId = ClientId(3);

fn rename(server: &mut TestPeer, name: &str) {
    server
        .player(PLAYER)
        .variables_mut()
        .set("Name", name, ClientId::SERVER)
        .unwrap();
}

/// Server with the player spawned and observed by a client that has not
/// spawned it yet.
fn setup() -> (LocalNetwork, TestPeer, TestPeer, Instant) {
    init_logger();
    let network = LocalNetwork::new();
    let mut server = TestPeer::server(&network);
    let client = TestPeer::client(&network, LATECOMER);
    let now = Instant::now();
    server.spawn_player(PLAYER, ClientId(9), &[LATECOMER], &now);
    (network, server, client, now)
}

#[test]
fn early_variable_messages_replay_in_order_on_spawn() {
    let (_network, mut server, mut client, now) = setup();

    rename(&mut server, "alice");
    server.replicate(&[PLAYER]);
    let summary = exchange(&mut [&mut server, &mut client], &now);
    assert_eq!(summary.deferred, 1);

    rename(&mut server, "bob");
    server.replicate(&[PLAYER]);
    let summary = exchange(&mut [&mut server, &mut client], &now);
    assert_eq!(summary.deferred, 1);
    assert_eq!(
        client
            .manager
            .deferred()
            .pending_for(TriggerKind::OnObjectBecomesKnown, PLAYER.0),
        2
    );

    // snapshot then delta; the other order would leave "alice"
    let replayed = client.spawn_player(PLAYER, ClientId(9), &[], &now);
    assert_eq!(replayed.handled, 2);
    assert_eq!(client.player(PLAYER).name(), Some("bob"));
    assert!(client.manager.deferred().is_empty());
}

#[test]
fn deferred_message_does_not_block_the_rest_of_its_batch() {
    let (_network, mut server, mut client, now) = setup();

    server.replicate(&[PLAYER]);
    server
        .manager
        .send(&ChatMessage::new("welcome"), LATECOMER, DeliveryMode::ReliableSequenced)
        .unwrap();
    assert_eq!(server.manager.outbox().pending_batches(LATECOMER), 1);

    let summary = exchange(&mut [&mut server, &mut client], &now);
    assert_eq!(summary.deferred, 1);
    assert_eq!(summary.handled, 1);
    assert_eq!(client.chats(), vec![(ClientId::SERVER, "welcome".to_string())]);
}

#[test]
fn expired_messages_are_swept_and_never_applied() {
    let (_network, mut server, mut client, now) = setup();

    rename(&mut server, "ghost");
    server.replicate(&[PLAYER]);
    exchange(&mut [&mut server, &mut client], &now);
    assert_eq!(client.manager.deferred().len(), 1);

    let later = now.offset(Duration::from_millis(1500));
    let expired = client.manager.sweep_expired(&later);
    assert_eq!(expired.len(), 1);
    assert!(client.manager.deferred().is_empty());

    let replayed = client.spawn_player(PLAYER, ClientId(9), &[], &later);
    assert_eq!(replayed.total(), 0);
    assert_eq!(client.player(PLAYER).name(), Some("player"));
}

#[test]
fn stale_messages_are_skipped_when_the_object_appears() {
    let (_network, mut server, mut client, now) = setup();

    rename(&mut server, "ghost");
    server.replicate(&[PLAYER]);
    exchange(&mut [&mut server, &mut client], &now);

    // no sweep ran in between
    let later = now.offset(Duration::from_secs(5));
    let replayed = client.spawn_player(PLAYER, ClientId(9), &[], &later);
    assert_eq!(replayed.total(), 0);
    assert_eq!(client.player(PLAYER).name(), Some("player"));
}

#[test]
fn update_expires_deferred_messages() {
    let (_network, mut server, mut client, now) = setup();

    server.replicate(&[PLAYER]);
    exchange(&mut [&mut server, &mut client], &now);
    assert_eq!(client.manager.deferred().len(), 1);

    client.update(&now.offset(Duration::from_millis(999)));
    assert_eq!(client.manager.deferred().len(), 1);
    client.update(&now.offset(Duration::from_millis(1001)));
    assert!(client.manager.deferred().is_empty());
}

#[test]
fn named_message_waits_for_its_handler() {
    init_logger();
    let network = LocalNetwork::new();
    let mut server = TestPeer::server(&network);
    let mut client = TestPeer::client(&network, ClientId(4));
    let now = Instant::now();

    client
        .manager
        .send_named("score", &[3], ClientId::SERVER, DeliveryMode::Reliable)
        .unwrap();
    client
        .manager
        .send_named("score", &[5], ClientId::SERVER, DeliveryMode::Reliable)
        .unwrap();
    let summary = exchange(&mut [&mut client, &mut server], &now);
    assert_eq!(summary.deferred, 2);
    assert_eq!(
        server
            .manager
            .deferred()
            .pending_for(TriggerKind::OnCapabilityRegistered, hash_message_name("score")),
        2
    );

    let scores = Arc::new(Mutex::new(Vec::new()));
    let sink = scores.clone();
    let replayed = server.manager.register_named_handler(
        "score",
        Box::new(move |sender: ClientId, payload: &[u8]| {
            sink.lock().unwrap().push((sender, payload.to_vec()))
        }),
        &mut server.world,
        &now,
    );
    assert_eq!(replayed.handled, 2);
    assert_eq!(
        *scores.lock().unwrap(),
        vec![(ClientId(4), vec![3]), (ClientId(4), vec![5])]
    );

    // handled directly from now on
    client
        .manager
        .send_named("score", &[8], ClientId::SERVER, DeliveryMode::Reliable)
        .unwrap();
    let summary = exchange(&mut [&mut client, &mut server], &now);
    assert_eq!(summary.handled, 1);
    assert_eq!(scores.lock().unwrap().len(), 3);
}
