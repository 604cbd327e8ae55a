use crate::{
    config::MessagingConfig,
    messages::{
        error::SendError, message::NetworkMessage, named_message::NamedMessageHandlers,
        outbox::Outbox, registry::MessageRegistry,
    },
    rpc::RpcTable,
    transport::DeliveryMode,
    types::{ClientId, MessageTag, ObjectId},
    world::{object::ObjectLookup, variable::VariableReplicator},
};

/// Everything a message handler may touch while one envelope is dispatched.
/// Built fresh for every envelope and dropped when its handler returns.
pub struct NetworkContext<'a> {
    pub(crate) sender: ClientId,
    pub(crate) delivery: DeliveryMode,
    pub(crate) tag: MessageTag,
    pub(crate) payload: &'a [u8],
    pub(crate) objects: &'a mut dyn ObjectLookup,
    pub(crate) outbox: &'a mut Outbox,
    pub(crate) registry: &'a MessageRegistry,
    pub(crate) rpcs: &'a RpcTable,
    pub(crate) named_handlers: &'a mut NamedMessageHandlers,
    pub(crate) replicator: &'a VariableReplicator,
    pub(crate) config: &'a MessagingConfig,
}

impl<'a> NetworkContext<'a> {
    /// Peer the envelope arrived from.
    pub fn sender(&self) -> ClientId {
        self.sender
    }

    pub fn delivery(&self) -> DeliveryMode {
        self.delivery
    }

    pub fn tag(&self) -> MessageTag {
        self.tag
    }

    /// The undecoded payload of the envelope being handled.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    pub fn objects(&self) -> &dyn ObjectLookup {
        &*self.objects
    }

    pub fn objects_mut(&mut self) -> &mut dyn ObjectLookup {
        &mut *self.objects
    }

    pub fn config(&self) -> &MessagingConfig {
        self.config
    }

    pub fn is_server(&self) -> bool {
        self.config.is_server()
    }

    pub fn local_client_id(&self) -> ClientId {
        self.config.local_client_id
    }

    /// Whether `client_id` already holds a snapshot of `object_id`.
    pub fn is_synced(&self, object_id: ObjectId, client_id: ClientId) -> bool {
        self.replicator.is_synced(object_id, client_id)
    }

    pub fn named_handlers_mut(&mut self) -> &mut NamedMessageHandlers {
        &mut *self.named_handlers
    }

    /// Splits the context so a procedure can run against the object table.
    pub fn rpc_parts(&mut self) -> (&RpcTable, &mut dyn ObjectLookup) {
        (self.rpcs, &mut *self.objects)
    }

    pub fn send<M: NetworkMessage>(
        &mut self,
        message: &M,
        destination: ClientId,
        delivery: DeliveryMode,
    ) -> Result<(), SendError> {
        let tag = self.registry.try_tag_of::<M>()?;
        self.outbox
            .queue(destination, delivery, tag, &message.to_payload())
    }

    /// Queues the received envelope, byte for byte, to each destination.
    pub fn forward_payload(
        &mut self,
        destinations: &[ClientId],
        delivery: DeliveryMode,
    ) -> Result<(), SendError> {
        for destination in destinations {
            self.outbox
                .queue(*destination, delivery, self.tag, self.payload)?;
        }
        Ok(())
    }
}
