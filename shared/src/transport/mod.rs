//! Boundary with the packet transport. Connection management, congestion
//! control and socket I/O live behind [`Transport`].

mod delivery_mode;

pub use delivery_mode::DeliveryMode;

use crate::types::ClientId;

/// An event surfaced by [`Transport::poll_event`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    Data {
        client_id: ClientId,
        payload: Vec<u8>,
        delivery: DeliveryMode,
    },
    Connect(ClientId),
    Disconnect(ClientId),
    Nothing,
}

pub trait Transport {
    /// Hands one batch to the transport. Delivery guarantees are the
    /// transport's responsibility.
    fn send(&mut self, destination: ClientId, payload: &[u8], delivery: DeliveryMode);

    /// Returns [`TransportEvent::Nothing`] once no events are pending.
    fn poll_event(&mut self) -> TransportEvent;
}
