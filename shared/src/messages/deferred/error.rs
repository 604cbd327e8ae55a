use std::time::Duration;

use thiserror::Error;

use crate::{
    messages::deferred::TriggerKind,
    types::{ClientId, MessageTag},
};

/// Problems found by the deferred message sweep. These are reported, never
/// returned from dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeferredError {
    /// A deferred message outlived its time to live without its dependency resolving
    #[error("Deferred message (tag {tag}) from {sender} waited {age:?} for {kind:?} key {key} and was discarded. Either the target was despawned before it spawned here, or the sender referenced something that never existed")]
    StaleDeferredTrigger {
        kind: TriggerKind,
        key: u64,
        tag: MessageTag,
        sender: ClientId,
        age: Duration,
    },
}
