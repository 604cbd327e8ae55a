use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;

use tether_serde::BitWriter;

use crate::{
    config::MessagingConfig,
    messages::{
        envelope::{encoded_len, write_envelope, MessageEnvelope},
        error::SendError,
    },
    transport::{DeliveryMode, Transport},
    types::{ClientId, MessageTag},
};

struct Batch {
    delivery: DeliveryMode,
    bytes: Vec<u8>,
}

/// A message addressed to this process, delivered on the next update
/// without touching the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopbackMessage {
    pub delivery: DeliveryMode,
    pub envelope: MessageEnvelope,
}

/// Per-destination accumulation of outgoing envelopes.
///
/// Envelopes for one destination are appended to the newest batch while it
/// has the same delivery mode and room left; otherwise a new batch starts.
/// Batches are flushed in the order they were started. Messages for a
/// destination that disconnected are dropped until it connects again.
pub struct Outbox {
    local_client_id: ClientId,
    max_batch_bytes: usize,
    max_fragmented_batch_bytes: usize,
    queues: HashMap<ClientId, Vec<Batch>>,
    disconnected: HashSet<ClientId>,
    loopback: VecDeque<LoopbackMessage>,
}

impl Outbox {
    pub fn new(config: &MessagingConfig) -> Self {
        Self {
            local_client_id: config.local_client_id,
            max_batch_bytes: config.max_batch_bytes,
            max_fragmented_batch_bytes: config.max_fragmented_batch_bytes,
            queues: HashMap::new(),
            disconnected: HashSet::new(),
            loopback: VecDeque::new(),
        }
    }

    fn limit(&self, delivery: DeliveryMode) -> usize {
        if delivery.is_fragmented() {
            self.max_fragmented_batch_bytes
        } else {
            self.max_batch_bytes
        }
    }

    pub fn queue(
        &mut self,
        destination: ClientId,
        delivery: DeliveryMode,
        tag: MessageTag,
        payload: &[u8],
    ) -> Result<(), SendError> {
        if destination == self.local_client_id {
            self.loopback.push_back(LoopbackMessage {
                delivery,
                envelope: MessageEnvelope::new(tag, payload.to_vec()),
            });
            return Ok(());
        }
        if self.disconnected.contains(&destination) {
            debug!("dropping message (tag {}) for disconnected {}", tag, destination);
            return Ok(());
        }

        let bytes = encoded_len(tag, payload.len());
        let limit = self.limit(delivery);
        if bytes > limit {
            return Err(SendError::MessageTooLarge { bytes, limit });
        }

        let mut writer = BitWriter::with_capacity(bytes);
        write_envelope(&mut writer, tag, payload);
        let encoded = writer.to_bytes();

        let batches = self.queues.entry(destination).or_default();
        let starts_new_batch = match batches.last() {
            Some(batch) => batch.delivery != delivery || batch.bytes.len() + bytes > limit,
            None => true,
        };
        if starts_new_batch {
            batches.push(Batch {
                delivery,
                bytes: Vec::with_capacity(bytes),
            });
        }
        if let Some(batch) = batches.last_mut() {
            batch.bytes.extend_from_slice(&encoded);
        }
        Ok(())
    }

    pub fn add_destination(&mut self, client_id: ClientId) {
        self.disconnected.remove(&client_id);
        self.queues.entry(client_id).or_default();
    }

    /// Drops everything still queued for `client_id` and everything queued
    /// for it later, until [`add_destination`](Self::add_destination).
    pub fn remove_destination(&mut self, client_id: ClientId) {
        self.disconnected.insert(client_id);
        if let Some(batches) = self.queues.remove(&client_id) {
            if !batches.is_empty() {
                debug!("discarding {} unsent batches for {}", batches.len(), client_id);
            }
        }
    }

    /// Hands every pending batch to the transport. Returns the number of
    /// batches sent.
    pub fn flush(&mut self, transport: &mut dyn Transport) -> usize {
        let mut sent = 0;
        for (destination, batches) in self.queues.iter_mut() {
            for batch in batches.drain(..) {
                transport.send(*destination, &batch.bytes, batch.delivery);
                sent += 1;
            }
        }
        sent
    }

    pub fn take_loopback(&mut self) -> VecDeque<LoopbackMessage> {
        std::mem::take(&mut self.loopback)
    }

    pub fn pending_batches(&self, destination: ClientId) -> usize {
        self.queues.get(&destination).map_or(0, Vec::len)
    }

    pub fn is_disconnected(&self, destination: ClientId) -> bool {
        self.disconnected.contains(&destination)
    }

    pub fn pending_loopback(&self) -> usize {
        self.loopback.len()
    }

    pub fn clear(&mut self) {
        self.queues.clear();
        self.loopback.clear();
    }
}
