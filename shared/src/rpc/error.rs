use thiserror::Error;

use crate::types::{BehaviourIndex, ClientId, ObjectId, ProcedureId};

/// Errors that can occur while invoking a remote procedure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// The target object or behaviour does not exist locally
    #[error("RPC target {object_id} {behaviour_index} not found")]
    TargetNotFound {
        object_id: ObjectId,
        behaviour_index: BehaviourIndex,
    },

    /// No procedure is registered under this id
    #[error("No procedure registered for {procedure}. Register it with Protocol::add_procedure()")]
    UnknownProcedure {
        procedure: ProcedureId,
    },

    /// The procedure requires ownership and the invoker is not the owner
    #[error("{sender} may not invoke {procedure} on an object owned by {owner}")]
    PermissionDenied {
        procedure: ProcedureId,
        sender: ClientId,
        owner: ClientId,
    },

    /// The argument bytes do not decode as the procedure's argument type
    #[error("Malformed arguments for {procedure}")]
    MalformedArguments {
        procedure: ProcedureId,
    },

    /// The behaviour at the target index is not the type the procedure was registered for
    #[error("{procedure} is not defined on the behaviour at {object_id} {behaviour_index}")]
    BehaviourMismatch {
        procedure: ProcedureId,
        object_id: ObjectId,
        behaviour_index: BehaviourIndex,
    },

    /// The procedure body returned an error
    #[error("{procedure} failed: {reason}")]
    HandlerFailed {
        procedure: ProcedureId,
        reason: String,
    },

    /// The procedure body panicked
    #[error("{procedure} panicked: {message}")]
    HandlerPanicked {
        procedure: ProcedureId,
        message: String,
    },
}
