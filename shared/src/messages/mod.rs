pub mod constants;
pub mod context;
pub mod deferred;
pub mod envelope;
pub mod error;
pub mod message;
pub mod message_manager;
pub mod named_message;
pub mod outbox;
pub mod registry;

pub use context::NetworkContext;
pub use deferred::{DeferredError, DeferredMessageManager, DeferredTrigger, TriggerKind};
pub use envelope::{EnvelopeReader, MessageEnvelope, RawEnvelope};
pub use error::{EnvelopeError, ReceiveError, SendError};
pub use message::NetworkMessage;
pub use message_manager::{MessageManager, ReceiveSummary};
pub use named_message::{hash_message_name, NamedMessage, NamedMessageHandler, NamedMessageHandlers};
pub use outbox::{LoopbackMessage, Outbox};
pub use registry::{MessageRegistration, MessageRegistry};
