use std::{any::TypeId, collections::HashMap};

use tether_serde::BitReader;

use crate::{
    messages::{
        context::NetworkContext,
        error::{ReceiveError, SendError},
        message::NetworkMessage,
    },
    protocol::ProtocolError,
    types::MessageTag,
};

type ReceiveFn =
    Box<dyn Fn(&mut BitReader, &mut NetworkContext) -> Result<(), ReceiveError> + Send + Sync>;

/// Deserializes and handles one registered message type.
pub struct MessageRegistration {
    name: &'static str,
    tag: MessageTag,
    version: u8,
    receive: ReceiveFn,
}

impl MessageRegistration {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn tag(&self) -> MessageTag {
        self.tag
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Decodes the payload under `reader` and runs the handler. Whole bytes
    /// left over after decoding make the message malformed.
    pub fn receive(
        &self,
        reader: &mut BitReader,
        context: &mut NetworkContext,
    ) -> Result<(), ReceiveError> {
        (self.receive)(reader, context)
    }
}

/// Maps message types to stable tags and their handlers. Filled once at
/// startup, read-only afterwards.
#[derive(Default)]
pub struct MessageRegistry {
    by_tag: HashMap<MessageTag, MessageRegistration>,
    by_type: HashMap<TypeId, MessageTag>,
}

impl MessageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_register<M, F>(&mut self, tag: MessageTag, handler: F) -> Result<(), ProtocolError>
    where
        M: NetworkMessage,
        F: Fn(M, &mut NetworkContext) -> Result<(), ReceiveError> + Send + Sync + 'static,
    {
        if let Some(existing) = self.by_tag.get(&tag) {
            return Err(ProtocolError::DuplicateMessageType {
                name: M::NAME,
                tag,
                existing: existing.name,
            });
        }
        if let Some(existing_tag) = self.by_type.get(&TypeId::of::<M>()) {
            return Err(ProtocolError::DuplicateMessageType {
                name: M::NAME,
                tag: *existing_tag,
                existing: M::NAME,
            });
        }

        let receive: ReceiveFn = Box::new(move |reader, context| {
            let message = M::deserialize(reader, context)?;
            if reader.remaining_bytes() > 0 {
                return Err(ReceiveError::MalformedMessage {
                    reason: "trailing bytes after payload",
                });
            }
            handler(message, context)
        });

        self.by_type.insert(TypeId::of::<M>(), tag);
        self.by_tag.insert(
            tag,
            MessageRegistration {
                name: M::NAME,
                tag,
                version: M::VERSION,
                receive,
            },
        );
        Ok(())
    }

    pub fn get(&self, tag: MessageTag) -> Option<&MessageRegistration> {
        self.by_tag.get(&tag)
    }

    pub fn name_of(&self, tag: MessageTag) -> &'static str {
        self.by_tag
            .get(&tag)
            .map(|registration| registration.name)
            .unwrap_or("<unregistered>")
    }

    pub fn tag_of<M: NetworkMessage>(&self) -> Option<MessageTag> {
        self.by_type.get(&TypeId::of::<M>()).copied()
    }

    pub fn try_tag_of<M: NetworkMessage>(&self) -> Result<MessageTag, SendError> {
        self.tag_of::<M>()
            .ok_or(SendError::UnregisteredMessage { name: M::NAME })
    }

    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }
}
