//! # Tether Shared
//! Message dispatch, deferred delivery, replicated variables and remote
//! procedure calls, shared by every peer of a tether session.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use tether_serde::{
    BitField, BitReader, BitWrite, BitWriter, ConstBitLength, OwnedBitReader, Serde, SerdeErr,
    SignedInteger, SignedVariableInteger, UnsignedInteger, UnsignedVariableInteger,
};

mod backends;
mod config;
mod messages;
mod protocol;
mod rpc;
mod transport;
mod types;
mod world;

pub use backends::Instant;
pub use config::{DeltaForwarding, MessagingConfig, Topology};
pub use messages::{
    constants::{
        FIRST_USER_TAG, NAMED_MESSAGE_TAG, RPC_MESSAGE_TAG, VARIABLE_DELTA_TAG,
        VARIABLE_SNAPSHOT_TAG,
    },
    hash_message_name, DeferredError, DeferredMessageManager, DeferredTrigger, EnvelopeError,
    EnvelopeReader, LoopbackMessage, MessageEnvelope, MessageManager, MessageRegistration,
    MessageRegistry, NamedMessage, NamedMessageHandler, NamedMessageHandlers, NetworkContext,
    NetworkMessage, Outbox, RawEnvelope, ReceiveError, ReceiveSummary, SendError, TriggerKind,
};
pub use protocol::{Protocol, ProtocolError};
pub use rpc::{RpcCallContext, RpcError, RpcMessage, RpcResult, RpcSettings, RpcTable};
pub use transport::{DeliveryMode, Transport, TransportEvent};
pub use types::{BehaviourIndex, ClientId, MessageTag, ObjectId, ProcedureId};
pub use world::{
    object::{AsAnyMut, Behaviour, ObjectLookup},
    variable::{
        Permission, ReplicatedVariable, ValueChangedCallback, ValueKind, VariableChunk,
        VariableDeltaMessage, VariableError, VariableReplicator, VariableSet,
        VariableSnapshotMessage, VariableValue,
    },
};
