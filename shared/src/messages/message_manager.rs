use log::{info, warn};

use tether_serde::{BitReader, Serde};

use crate::{
    backends::Instant,
    config::MessagingConfig,
    messages::{
        context::NetworkContext,
        deferred::{DeferredError, DeferredMessageManager, DeferredTrigger, TriggerKind},
        envelope::{EnvelopeReader, MessageEnvelope},
        error::{ReceiveError, SendError},
        message::NetworkMessage,
        named_message::{NamedMessage, NamedMessageHandler, NamedMessageHandlers},
        outbox::Outbox,
    },
    protocol::Protocol,
    rpc::RpcMessage,
    transport::{DeliveryMode, Transport, TransportEvent},
    types::{BehaviourIndex, ClientId, MessageTag, ObjectId, ProcedureId},
    world::{object::ObjectLookup, variable::VariableReplicator},
};

/// Counts of what happened to the envelopes of one receive call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReceiveSummary {
    pub handled: usize,
    pub deferred: usize,
    pub dropped: usize,
}

impl ReceiveSummary {
    pub fn total(&self) -> usize {
        self.handled + self.deferred + self.dropped
    }

    fn record(&mut self, outcome: DispatchOutcome) {
        match outcome {
            DispatchOutcome::Handled => self.handled += 1,
            DispatchOutcome::Deferred => self.deferred += 1,
            DispatchOutcome::Dropped => self.dropped += 1,
        }
    }
}

impl std::ops::AddAssign for ReceiveSummary {
    fn add_assign(&mut self, other: Self) {
        self.handled += other.handled;
        self.deferred += other.deferred;
        self.dropped += other.dropped;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DispatchOutcome {
    Handled,
    Deferred,
    Dropped,
}

/// Turns inbound batches into handled messages and outgoing messages into
/// per-destination batches.
///
/// One manager exists per process and is passed explicitly wherever messages
/// are sent or received. Every call runs to completion on the caller's
/// thread; a deferred message is replayed as a fresh dispatch on a later
/// call, never resumed.
pub struct MessageManager {
    config: MessagingConfig,
    protocol: Protocol,
    outbox: Outbox,
    deferred: DeferredMessageManager,
    named: NamedMessageHandlers,
    replicator: VariableReplicator,
}

impl MessageManager {
    /// Locks `protocol` if the caller has not done so already.
    pub fn new(mut protocol: Protocol, config: MessagingConfig) -> Self {
        if !protocol.is_locked() {
            protocol.lock();
        }
        Self {
            outbox: Outbox::new(&config),
            deferred: DeferredMessageManager::new(config.deferred_message_ttl),
            named: NamedMessageHandlers::new(),
            replicator: VariableReplicator::new(),
            protocol,
            config,
        }
    }

    pub fn config(&self) -> &MessagingConfig {
        &self.config
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn deferred(&self) -> &DeferredMessageManager {
        &self.deferred
    }

    pub fn replicator(&self) -> &VariableReplicator {
        &self.replicator
    }

    // Outgoing

    /// Serializes `message` into the batch for `destination`. Messages to the
    /// same destination and delivery mode keep their call order.
    pub fn send<M: NetworkMessage>(
        &mut self,
        message: &M,
        destination: ClientId,
        delivery: DeliveryMode,
    ) -> Result<(), SendError> {
        let tag = self.protocol.messages.try_tag_of::<M>()?;
        self.outbox
            .queue(destination, delivery, tag, &message.to_payload())
    }

    /// Serializes `message` once and queues it for every destination.
    pub fn send_to_many<M: NetworkMessage>(
        &mut self,
        message: &M,
        destinations: &[ClientId],
        delivery: DeliveryMode,
    ) -> Result<(), SendError> {
        let tag = self.protocol.messages.try_tag_of::<M>()?;
        self.forward_raw(tag, &message.to_payload(), destinations, delivery)
    }

    pub fn send_named(
        &mut self,
        name: &str,
        payload: &[u8],
        destination: ClientId,
        delivery: DeliveryMode,
    ) -> Result<(), SendError> {
        self.send(&NamedMessage::new(name, payload), destination, delivery)
    }

    /// Queues a call of `procedure_id` on a remote copy of the behaviour,
    /// using the delivery mode the procedure was registered with.
    pub fn send_rpc<A: Serde>(
        &mut self,
        object_id: ObjectId,
        behaviour_index: BehaviourIndex,
        procedure_id: ProcedureId,
        args: &A,
        destination: ClientId,
    ) -> Result<(), SendError> {
        let settings =
            self.protocol
                .rpcs
                .settings(procedure_id)
                .ok_or(SendError::UnknownProcedure {
                    procedure: procedure_id.0,
                })?;
        let message = RpcMessage::new(
            self.config.local_client_id,
            object_id,
            behaviour_index,
            procedure_id,
            args,
        );
        self.send(&message, destination, settings.delivery)
    }

    /// Queues an already serialized payload, byte for byte, to each
    /// destination.
    pub fn forward_raw(
        &mut self,
        tag: MessageTag,
        payload: &[u8],
        destinations: &[ClientId],
        delivery: DeliveryMode,
    ) -> Result<(), SendError> {
        for destination in destinations {
            self.outbox.queue(*destination, delivery, tag, payload)?;
        }
        Ok(())
    }

    /// Queues snapshots for observers that have not had one yet and deltas
    /// for everything dirty, then clears the dirty flags. Returns the number
    /// of messages queued.
    pub fn replicate(
        &mut self,
        objects: &mut dyn ObjectLookup,
        object_ids: &[ObjectId],
    ) -> Result<usize, SendError> {
        let mut replicator = std::mem::take(&mut self.replicator);
        let result = replicator.replicate(self, objects, object_ids);
        self.replicator = replicator;
        result
    }

    /// `client_id` starts observing `object_id` and is owed a snapshot.
    pub fn object_shown(&mut self, object_id: ObjectId, client_id: ClientId) {
        self.replicator.object_shown(object_id, client_id);
    }

    pub fn object_hidden(&mut self, object_id: ObjectId, client_id: ClientId) {
        self.replicator.object_hidden(object_id, client_id);
    }

    pub fn object_despawned(&mut self, object_id: ObjectId) {
        self.replicator.object_despawned(object_id);
    }

    /// Hands all pending batches to the transport.
    pub fn flush(&mut self, transport: &mut dyn Transport) -> usize {
        self.outbox.flush(transport)
    }

    // Incoming

    /// Dispatches every envelope in `batch`.
    ///
    /// A message that fails to decode or handle is logged and skipped, the
    /// rest of the batch still runs. A message waiting on an unknown object
    /// or an unregistered named handler is deferred. A broken envelope header
    /// ends the batch, since the following envelopes cannot be located.
    pub fn receive(
        &mut self,
        objects: &mut dyn ObjectLookup,
        sender: ClientId,
        batch: &[u8],
        delivery: DeliveryMode,
        now: &Instant,
    ) -> ReceiveSummary {
        let mut summary = ReceiveSummary::default();
        for envelope in EnvelopeReader::new(batch) {
            match envelope {
                Ok(envelope) => {
                    let outcome = self.dispatch_envelope(
                        objects,
                        sender,
                        delivery,
                        envelope.tag,
                        envelope.payload,
                        now,
                    );
                    summary.record(outcome);
                }
                Err(error) => {
                    warn!("batch from {} cut short: {}", sender, error);
                    summary.dropped += 1;
                }
            }
        }
        summary
    }

    /// Dispatches messages this process addressed to itself.
    pub fn receive_loopback(
        &mut self,
        objects: &mut dyn ObjectLookup,
        now: &Instant,
    ) -> ReceiveSummary {
        let local = self.config.local_client_id;
        let mut summary = ReceiveSummary::default();
        for message in self.outbox.take_loopback() {
            let outcome = self.dispatch_envelope(
                objects,
                local,
                message.delivery,
                message.envelope.tag,
                &message.envelope.payload,
                now,
            );
            summary.record(outcome);
        }
        summary
    }

    /// Replays, oldest first, every message deferred on `key`.
    pub fn resolve(
        &mut self,
        kind: TriggerKind,
        key: u64,
        objects: &mut dyn ObjectLookup,
        now: &Instant,
    ) -> ReceiveSummary {
        let mut summary = ReceiveSummary::default();
        for trigger in self.deferred.resolve(kind, key, now) {
            // a replay that defers again keeps its original capture time
            let outcome = self.dispatch_envelope(
                objects,
                trigger.sender,
                trigger.delivery,
                trigger.envelope.tag,
                &trigger.envelope.payload,
                &trigger.captured_at,
            );
            summary.record(outcome);
        }
        summary
    }

    /// Call once `object_id` can be resolved through the object table.
    pub fn object_became_known(
        &mut self,
        object_id: ObjectId,
        objects: &mut dyn ObjectLookup,
        now: &Instant,
    ) -> ReceiveSummary {
        self.resolve(TriggerKind::OnObjectBecomesKnown, object_id.0, objects, now)
    }

    /// Registers a named message handler and replays anything that arrived
    /// for it before registration.
    pub fn register_named_handler(
        &mut self,
        name: &str,
        handler: NamedMessageHandler,
        objects: &mut dyn ObjectLookup,
        now: &Instant,
    ) -> ReceiveSummary {
        let hash = self.named.register(name, handler);
        self.resolve(TriggerKind::OnCapabilityRegistered, hash, objects, now)
    }

    pub fn unregister_named_handler(&mut self, name: &str) -> bool {
        self.named.unregister(name)
    }

    pub fn sweep_expired(&mut self, now: &Instant) -> Vec<DeferredError> {
        self.deferred.sweep_expired(now)
    }

    /// One network tick: drains transport events, dispatches loopback
    /// messages, then expires stale deferred messages.
    pub fn update(
        &mut self,
        transport: &mut dyn Transport,
        objects: &mut dyn ObjectLookup,
        now: &Instant,
    ) -> ReceiveSummary {
        let mut summary = ReceiveSummary::default();
        loop {
            match transport.poll_event() {
                TransportEvent::Data {
                    client_id,
                    payload,
                    delivery,
                } => {
                    summary += self.receive(objects, client_id, &payload, delivery, now);
                }
                TransportEvent::Connect(client_id) => {
                    info!("{} connected", client_id);
                    self.outbox.add_destination(client_id);
                }
                TransportEvent::Disconnect(client_id) => {
                    info!("{} disconnected", client_id);
                    self.outbox.remove_destination(client_id);
                    self.replicator.client_disconnected(client_id);
                }
                TransportEvent::Nothing => break,
            }
        }
        summary += self.receive_loopback(objects, now);
        self.sweep_expired(now);
        summary
    }

    /// Drops queued batches, loopback messages and deferred messages.
    pub fn reset(&mut self) {
        self.outbox.clear();
        self.deferred.clear();
    }

    fn dispatch_envelope(
        &mut self,
        objects: &mut dyn ObjectLookup,
        sender: ClientId,
        delivery: DeliveryMode,
        tag: MessageTag,
        payload: &[u8],
        captured_at: &Instant,
    ) -> DispatchOutcome {
        let Some(registration) = self.protocol.messages.get(tag) else {
            warn!(
                "dropping message from {}: {}",
                sender,
                ReceiveError::UnknownMessageType { tag }
            );
            return DispatchOutcome::Dropped;
        };

        let result = {
            let mut context = NetworkContext {
                sender,
                delivery,
                tag,
                payload,
                objects,
                outbox: &mut self.outbox,
                registry: &self.protocol.messages,
                rpcs: &self.protocol.rpcs,
                named_handlers: &mut self.named,
                replicator: &self.replicator,
                config: &self.config,
            };
            let mut reader = BitReader::new(payload);
            registration.receive(&mut reader, &mut context)
        };

        let (kind, key) = match result {
            Ok(()) => return DispatchOutcome::Handled,
            Err(ReceiveError::TargetNotFound { object_id }) => {
                (TriggerKind::OnObjectBecomesKnown, object_id.0)
            }
            Err(ReceiveError::CapabilityNotRegistered { key }) => {
                (TriggerKind::OnCapabilityRegistered, key)
            }
            Err(error) => {
                warn!(
                    "dropping {} (tag {}) from {}: {}",
                    registration.name(),
                    tag,
                    sender,
                    error
                );
                return DispatchOutcome::Dropped;
            }
        };

        self.deferred.defer(DeferredTrigger {
            kind,
            key,
            sender,
            delivery,
            envelope: MessageEnvelope::new(tag, payload.to_vec()),
            captured_at: *captured_at,
        });
        DispatchOutcome::Deferred
    }
}
