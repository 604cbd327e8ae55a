use std::time::Duration;

use crate::types::ClientId;

/// The role this process plays in the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topology {
    /// A server with no local player.
    DedicatedServer,
    /// A server that also runs a local player. The local player shares the
    /// server's id.
    Host,
    Client,
}

impl Topology {
    pub fn is_server(&self) -> bool {
        matches!(self, Topology::DedicatedServer | Topology::Host)
    }

    pub fn default_delta_forwarding(&self) -> DeltaForwarding {
        if self.is_server() {
            DeltaForwarding::RelayOriginal
        } else {
            DeltaForwarding::Consume
        }
    }
}

/// What a server does with a variable update it received from a client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeltaForwarding {
    /// Apply the update and stop there.
    Consume,
    /// Apply the update and leave the variable dirty, so the next replication
    /// pass re-serializes it for every other observer.
    KeepDirty,
    /// Apply the update and forward the received bytes unchanged to every
    /// other observer allowed to read all of them. Falls back to `KeepDirty`
    /// when some observer may only read part of the update.
    RelayOriginal,
}

#[derive(Clone, Debug)]
pub struct MessagingConfig {
    pub topology: Topology,
    /// Id this process writes and invokes as. `ClientId::SERVER` on servers,
    /// the assigned id on a client. Messages addressed to it are looped back.
    pub local_client_id: ClientId,
    pub delta_forwarding: DeltaForwarding,
    /// Deferred messages older than this are discarded by the expiry sweep.
    pub deferred_message_ttl: Duration,
    /// Upper bound of one outgoing batch.
    pub max_batch_bytes: usize,
    /// Upper bound of one outgoing batch sent fragmented.
    pub max_fragmented_batch_bytes: usize,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self::server()
    }
}

impl MessagingConfig {
    pub fn server() -> Self {
        Self::for_topology(Topology::DedicatedServer, ClientId::SERVER)
    }

    pub fn host() -> Self {
        Self::for_topology(Topology::Host, ClientId::SERVER)
    }

    pub fn client(local_client_id: ClientId) -> Self {
        Self::for_topology(Topology::Client, local_client_id)
    }

    fn for_topology(topology: Topology, local_client_id: ClientId) -> Self {
        Self {
            topology,
            local_client_id,
            delta_forwarding: topology.default_delta_forwarding(),
            deferred_message_ttl: Duration::from_secs(1),
            max_batch_bytes: 1300,
            max_fragmented_batch_bytes: 64_000,
        }
    }

    pub fn is_server(&self) -> bool {
        self.topology.is_server()
    }
}
