mod deferred_message_manager;
mod error;

pub use deferred_message_manager::{DeferredMessageManager, DeferredTrigger, TriggerKind};
pub use error::DeferredError;
