mod error;
mod permission;
mod replicated_variable;
mod replicator;
mod value;
mod variable_messages;
mod variable_set;

pub use error::VariableError;
pub use permission::Permission;
pub use replicated_variable::{ReplicatedVariable, ValueChangedCallback};
pub use replicator::VariableReplicator;
pub use value::{ValueKind, VariableValue};
pub use variable_messages::{VariableChunk, VariableDeltaMessage, VariableSnapshotMessage};
pub use variable_set::VariableSet;

pub(crate) use variable_messages::{handle_variable_delta, handle_variable_snapshot};
