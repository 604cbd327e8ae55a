use thiserror::Error;

use crate::{types::ClientId, world::variable::ValueKind};

/// Errors that can occur while writing or applying replicated variables
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariableError {
    /// The writer does not satisfy the variable's write permission
    #[error("{client} may not write variable '{variable}' (owner: {owner}). The value and dirty flag are unchanged")]
    PermissionDenied {
        variable: String,
        client: ClientId,
        owner: ClientId,
    },

    /// The new value has a different shape than the variable was created with
    #[error("Variable '{variable}' holds {expected:?} values but was given {found:?}")]
    KindMismatch {
        variable: String,
        expected: ValueKind,
        found: ValueKind,
    },

    /// Received bytes could not be decoded as the variable's value
    #[error("Malformed data for variable '{variable}'")]
    Malformed {
        variable: String,
    },

    /// No variable with this name exists on the behaviour
    #[error("No variable named '{name}' on this behaviour")]
    UnknownVariable {
        name: String,
    },

    /// No variable at this index exists on the behaviour
    #[error("Variable index {index} out of range, behaviour has {len} variables")]
    IndexOutOfRange {
        index: u16,
        len: u16,
    },
}
