use thiserror::Error;

use tether_serde::SerdeErr;

use crate::{
    rpc::RpcError,
    types::{BehaviourIndex, ClientId, MessageTag, ObjectId},
    world::variable::VariableError,
};

/// Errors raised while splitting a batch into envelopes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The envelope header is truncated or declares more bytes than remain in the batch
    #[error("Malformed envelope at byte {offset}: {reason}. The rest of the batch cannot be located and is discarded")]
    MalformedMessage {
        offset: usize,
        reason: &'static str,
    },
}

/// Errors raised while deserializing or handling one received message.
///
/// `TargetNotFound` and `CapabilityNotRegistered` are not terminal: the
/// dispatcher defers the message until the dependency resolves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiveError {
    /// Payload bytes could not be decoded as the registered type
    #[error("Malformed message payload: {reason}")]
    MalformedMessage {
        reason: &'static str,
    },

    /// No message type is registered under this tag
    #[error("No message type registered for tag {tag}. Both peers must register the same message types")]
    UnknownMessageType {
        tag: MessageTag,
    },

    /// The message references an object that is not known locally yet
    #[error("Message targets {object_id}, which is not known locally")]
    TargetNotFound {
        object_id: ObjectId,
    },

    /// The message needs a handler that has not been registered yet
    #[error("Message needs capability {key:#018x}, which is not registered")]
    CapabilityNotRegistered {
        key: u64,
    },

    /// The object is known but has no behaviour at this index
    #[error("{object_id} has no {behaviour_index}")]
    BehaviourNotFound {
        object_id: ObjectId,
        behaviour_index: BehaviourIndex,
    },

    /// The sender is not allowed to do what the message asks
    #[error("Permission denied for {client}: {reason}")]
    PermissionDenied {
        client: ClientId,
        reason: String,
    },

    /// A replicated variable rejected the update
    #[error(transparent)]
    Variable(#[from] VariableError),

    /// A remote procedure call failed
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// A reply or forwarded copy could not be queued
    #[error(transparent)]
    Send(#[from] SendError),
}

impl From<SerdeErr> for ReceiveError {
    fn from(_: SerdeErr) -> Self {
        ReceiveError::MalformedMessage {
            reason: "payload ended early or holds an invalid value",
        }
    }
}

/// Errors raised while queueing an outgoing message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// The message type was never registered with the Protocol
    #[error("Message type {name} is not registered. Register it with Protocol::add_message() before sending")]
    UnregisteredMessage {
        name: &'static str,
    },

    /// One envelope does not fit in a single batch for this delivery mode
    #[error("Envelope of {bytes} bytes exceeds the {limit} byte batch limit. Use ReliableFragmentedSequenced for large messages")]
    MessageTooLarge {
        bytes: usize,
        limit: usize,
    },

    /// The procedure id has no registration
    #[error("No procedure registered with id {procedure}")]
    UnknownProcedure {
        procedure: u32,
    },
}
