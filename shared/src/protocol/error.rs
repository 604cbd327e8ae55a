use thiserror::Error;

use crate::types::{MessageTag, ProcedureId};

/// Errors that can occur during protocol operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Protocol is locked and cannot be modified
    #[error("Protocol is already locked and cannot be modified. Protocol.lock() has been called and no further changes are allowed")]
    AlreadyLocked,

    /// A message type or tag was registered twice
    #[error("Cannot register {name} with tag {tag}: already taken by {existing}. Every message type needs exactly one unique tag")]
    DuplicateMessageType {
        name: &'static str,
        tag: MessageTag,
        existing: &'static str,
    },

    /// User message types must not use the tags kept for built-in messages
    #[error("Cannot register {name} with tag {tag}: tags below {first_user_tag} are reserved for built-in messages")]
    ReservedMessageType {
        name: &'static str,
        tag: MessageTag,
        first_user_tag: MessageTag,
    },

    /// A procedure id was registered twice
    #[error("Cannot register procedure '{name}' as {procedure}: already taken by '{existing}'")]
    DuplicateProcedure {
        procedure: ProcedureId,
        name: &'static str,
        existing: &'static str,
    },
}
