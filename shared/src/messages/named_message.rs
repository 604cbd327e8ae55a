use std::collections::HashMap;

use tether_serde::{read_varint, write_varint, BitReader, BitWrite, Serde};

use crate::{
    messages::{context::NetworkContext, error::ReceiveError, message::NetworkMessage},
    types::ClientId,
};

pub type NamedMessageHandler = Box<dyn FnMut(ClientId, &[u8]) + Send + Sync>;

/// Stable 64-bit identifier of a message name: the first eight bytes of its
/// blake3 digest, little endian.
pub fn hash_message_name(name: &str) -> u64 {
    let digest = blake3::hash(name.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(prefix)
}

/// Handlers for messages addressed by name rather than by registered type.
/// Unlike the registry, handlers may come and go at runtime.
#[derive(Default)]
pub struct NamedMessageHandlers {
    handlers: HashMap<u64, (String, NamedMessageHandler)>,
}

impl NamedMessageHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the name hash the handler was registered under.
    pub fn register(&mut self, name: &str, handler: NamedMessageHandler) -> u64 {
        let hash = hash_message_name(name);
        self.handlers.insert(hash, (name.to_string(), handler));
        hash
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.handlers.remove(&hash_message_name(name)).is_some()
    }

    pub fn contains(&self, hash: u64) -> bool {
        self.handlers.contains_key(&hash)
    }

    pub fn name_of(&self, hash: u64) -> Option<&str> {
        self.handlers.get(&hash).map(|(name, _)| name.as_str())
    }

    fn dispatch(&mut self, hash: u64, sender: ClientId, payload: &[u8]) -> bool {
        match self.handlers.get_mut(&hash) {
            Some((_, handler)) => {
                handler(sender, payload);
                true
            }
            None => false,
        }
    }
}

/// A payload addressed to a handler by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedMessage {
    pub name_hash: u64,
    pub payload: Vec<u8>,
}

impl NamedMessage {
    pub fn new(name: &str, payload: &[u8]) -> Self {
        Self {
            name_hash: hash_message_name(name),
            payload: payload.to_vec(),
        }
    }
}

impl NetworkMessage for NamedMessage {
    const NAME: &'static str = "NamedMessage";

    fn serialize(&self, writer: &mut dyn BitWrite) {
        self.name_hash.ser(writer);
        write_varint(writer, self.payload.len() as u64);
        writer.write_bytes(&self.payload);
    }

    fn deserialize(
        reader: &mut BitReader,
        context: &mut NetworkContext,
    ) -> Result<Self, ReceiveError> {
        let name_hash = u64::de(reader)?;
        if !context.named_handlers_mut().contains(name_hash) {
            return Err(ReceiveError::CapabilityNotRegistered { key: name_hash });
        }
        let len = usize::try_from(read_varint(reader)?).map_err(|_| ReceiveError::MalformedMessage {
            reason: "payload length out of range",
        })?;
        let payload = reader.read_bytes(len)?;
        Ok(Self { name_hash, payload })
    }
}

pub(crate) fn handle_named_message(
    message: NamedMessage,
    context: &mut NetworkContext,
) -> Result<(), ReceiveError> {
    let sender = context.sender();
    if context
        .named_handlers_mut()
        .dispatch(message.name_hash, sender, &message.payload)
    {
        Ok(())
    } else {
        Err(ReceiveError::CapabilityNotRegistered {
            key: message.name_hash,
        })
    }
}
