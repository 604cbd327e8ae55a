/// END-TO-END: procedure calls through a dedicated server
///
/// Player 1 is owned by client 7 and observed by clients 7 and 3. Relayed
/// procedures invoked by the owner run on the server and are passed on to the
/// other observers unchanged, still naming client 7 as the caller.
use tether_shared::{
    BehaviourIndex, ClientId, DeliveryMode, EnvelopeReader, Instant, MessageEnvelope, ObjectId,
    RpcMessage, RPC_MESSAGE_TAG,
};
use tether_test::{
    exchange, exchange_n_times, init_logger, ChatMessage, LocalNetwork, TestPeer, EMOTE, EXPLODE,
    STUMBLE, WAVE,
};

const PLAYER: ObjectId = ObjectId(1);
const OWNER: ClientId = ClientId(7);
const WATCHER: ClientId = ClientId(3);

fn setup() -> (LocalNetwork, TestPeer, TestPeer, TestPeer, Instant) {
    init_logger();
    let network = LocalNetwork::new();
    let mut server = TestPeer::server(&network);
    let mut owner = TestPeer::client(&network, OWNER);
    let mut watcher = TestPeer::client(&network, WATCHER);
    let now = Instant::now();

    server.spawn_player(PLAYER, OWNER, &[OWNER, WATCHER], &now);
    owner.spawn_player(PLAYER, OWNER, &[], &now);
    watcher.spawn_player(PLAYER, OWNER, &[], &now);
    (network, server, owner, watcher, now)
}

fn envelopes(network: &LocalNetwork, from: ClientId, to: ClientId) -> Vec<MessageEnvelope> {
    network
        .sent_between(from, to)
        .iter()
        .flat_map(|batch| {
            EnvelopeReader::new(&batch.payload)
                .map(|envelope| envelope.expect("well formed batch").to_envelope())
                .collect::<Vec<_>>()
        })
        .collect()
}

#[test]
fn owner_emote_runs_on_server_and_reaches_watcher() {
    let (network, mut server, mut owner, mut watcher, now) = setup();

    owner
        .manager
        .send_rpc(
            PLAYER,
            BehaviourIndex(0),
            EMOTE,
            &"waves hello".to_string(),
            ClientId::SERVER,
        )
        .unwrap();
    exchange_n_times(&mut [&mut owner, &mut watcher, &mut server], 2, &now);

    let expected = vec![(OWNER, "waves hello".to_string())];
    assert_eq!(server.player(PLAYER).emotes, expected);
    assert_eq!(watcher.player(PLAYER).emotes, expected);
    assert!(owner.player(PLAYER).emotes.is_empty());

    let sent = envelopes(&network, OWNER, ClientId::SERVER);
    let relayed = envelopes(&network, ClientId::SERVER, WATCHER);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].tag, RPC_MESSAGE_TAG);
    assert_eq!(relayed, sent);
    assert!(network.sent_between(ClientId::SERVER, OWNER).is_empty());
}

#[test]
fn non_owner_emote_is_rejected_and_not_relayed() {
    let (network, mut server, mut owner, mut watcher, now) = setup();

    watcher
        .manager
        .send_rpc(
            PLAYER,
            BehaviourIndex(0),
            EMOTE,
            &"not mine".to_string(),
            ClientId::SERVER,
        )
        .unwrap();
    let summary = exchange_n_times(&mut [&mut owner, &mut watcher, &mut server], 2, &now);

    assert_eq!(summary.dropped, 1);
    assert!(server.player(PLAYER).emotes.is_empty());
    assert!(network.sent_between(ClientId::SERVER, OWNER).is_empty());
}

#[test]
fn client_cannot_invoke_in_another_clients_name() {
    let (_network, mut server, mut owner, mut watcher, now) = setup();

    let spoofed = RpcMessage::new(OWNER, PLAYER, BehaviourIndex(0), WAVE, &());
    watcher
        .manager
        .send(&spoofed, ClientId::SERVER, DeliveryMode::Reliable)
        .unwrap();
    let summary = exchange(&mut [&mut owner, &mut watcher, &mut server], &now);

    assert_eq!(summary.dropped, 1);
    assert!(server.player(PLAYER).waves.is_empty());
}

#[test]
fn anyone_may_wave() {
    let (_network, mut server, mut owner, mut watcher, now) = setup();

    watcher
        .manager
        .send_rpc(PLAYER, BehaviourIndex(0), WAVE, &(), ClientId::SERVER)
        .unwrap();
    owner
        .manager
        .send_rpc(PLAYER, BehaviourIndex(0), WAVE, &(), ClientId::SERVER)
        .unwrap();
    exchange(&mut [&mut owner, &mut watcher, &mut server], &now);

    assert_eq!(server.player(PLAYER).waves, vec![OWNER, WATCHER]);
}

#[test]
fn server_calls_reach_clients_as_server() {
    let (_network, mut server, mut owner, mut watcher, now) = setup();

    server
        .manager
        .send_rpc(PLAYER, BehaviourIndex(0), WAVE, &(), WATCHER)
        .unwrap();
    exchange(&mut [&mut server, &mut owner, &mut watcher], &now);

    assert_eq!(watcher.player(PLAYER).waves, vec![ClientId::SERVER]);
}

#[test]
fn failing_procedures_do_not_stop_the_batch() {
    let (_network, mut server, mut owner, mut watcher, now) = setup();

    owner
        .manager
        .send_rpc(PLAYER, BehaviourIndex(0), EXPLODE, &(), ClientId::SERVER)
        .unwrap();
    owner
        .manager
        .send_rpc(PLAYER, BehaviourIndex(0), STUMBLE, &(), ClientId::SERVER)
        .unwrap();
    owner
        .manager
        .send(
            &ChatMessage::new("still here"),
            ClientId::SERVER,
            DeliveryMode::ReliableSequenced,
        )
        .unwrap();
    assert_eq!(owner.manager.outbox().pending_batches(ClientId::SERVER), 1);

    let summary = exchange(&mut [&mut owner, &mut watcher, &mut server], &now);

    assert_eq!(summary.dropped, 2);
    assert_eq!(summary.handled, 1);
    assert_eq!(server.chats(), vec![(OWNER, "still here".to_string())]);
}

#[test]
fn call_on_unspawned_object_waits_for_it() {
    init_logger();
    let network = LocalNetwork::new();
    let mut server = TestPeer::server(&network);
    let mut client = TestPeer::client(&network, WATCHER);
    let now = Instant::now();
    server.spawn_player(PLAYER, OWNER, &[WATCHER], &now);

    server
        .manager
        .send_rpc(PLAYER, BehaviourIndex(0), WAVE, &(), WATCHER)
        .unwrap();
    let summary = exchange(&mut [&mut server, &mut client], &now);
    assert_eq!(summary.deferred, 1);

    let replayed = client.spawn_player(PLAYER, OWNER, &[], &now);
    assert_eq!(replayed.handled, 1);
    assert_eq!(client.player(PLAYER).waves, vec![ClientId::SERVER]);
}
