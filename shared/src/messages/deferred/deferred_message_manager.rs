use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};

use log::{debug, warn};

use crate::{
    backends::Instant,
    messages::{deferred::DeferredError, envelope::MessageEnvelope},
    transport::DeliveryMode,
    types::ClientId,
};

/// What a deferred message is waiting for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// Keyed on the raw `ObjectId`.
    OnObjectBecomesKnown,
    /// Keyed on a named-message hash.
    OnCapabilityRegistered,
}

/// A received envelope parked until its dependency resolves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeferredTrigger {
    pub kind: TriggerKind,
    pub key: u64,
    pub sender: ClientId,
    pub delivery: DeliveryMode,
    pub envelope: MessageEnvelope,
    pub captured_at: Instant,
}

impl DeferredTrigger {
    fn age(&self, now: &Instant) -> Duration {
        self.captured_at.elapsed(now)
    }

    fn stale_error(&self, now: &Instant) -> DeferredError {
        DeferredError::StaleDeferredTrigger {
            kind: self.kind,
            key: self.key,
            tag: self.envelope.tag,
            sender: self.sender,
            age: self.age(now),
        }
    }
}

/// Buffers messages whose dependency is not resolvable yet.
///
/// Triggers sharing a key replay in capture order. A trigger older than the
/// time to live is never replayed, even if its key resolves later.
pub struct DeferredMessageManager {
    triggers: HashMap<(TriggerKind, u64), VecDeque<DeferredTrigger>>,
    ttl: Duration,
}

impl DeferredMessageManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            triggers: HashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn defer(&mut self, trigger: DeferredTrigger) {
        debug!(
            "deferring message (tag {}) from {} until {:?} {}",
            trigger.envelope.tag, trigger.sender, trigger.kind, trigger.key
        );
        self.triggers
            .entry((trigger.kind, trigger.key))
            .or_default()
            .push_back(trigger);
    }

    /// Removes and returns every live trigger waiting on `key`, oldest first.
    /// Expired ones are reported and discarded.
    pub fn resolve(&mut self, kind: TriggerKind, key: u64, now: &Instant) -> Vec<DeferredTrigger> {
        let Some(queue) = self.triggers.remove(&(kind, key)) else {
            return Vec::new();
        };
        let ttl = self.ttl;
        queue
            .into_iter()
            .filter(|trigger| {
                let live = trigger.age(now) <= ttl;
                if !live {
                    warn!("{}", trigger.stale_error(now));
                }
                live
            })
            .collect()
    }

    /// Discards every trigger older than the time to live and reports each.
    pub fn sweep_expired(&mut self, now: &Instant) -> Vec<DeferredError> {
        let ttl = self.ttl;
        let mut expired = Vec::new();
        self.triggers.retain(|_, queue| {
            queue.retain(|trigger| {
                if trigger.age(now) > ttl {
                    let error = trigger.stale_error(now);
                    warn!("{}", error);
                    expired.push(error);
                    false
                } else {
                    true
                }
            });
            !queue.is_empty()
        });
        expired
    }

    pub fn clear(&mut self) {
        self.triggers.clear();
    }

    pub fn len(&self) -> usize {
        self.triggers.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn pending_for(&self, kind: TriggerKind, key: u64) -> usize {
        self.triggers.get(&(kind, key)).map_or(0, VecDeque::len)
    }
}
