use std::collections::HashSet;

use tether_serde::BitWriter;

use crate::{
    messages::{MessageManager, SendError},
    transport::DeliveryMode,
    types::{BehaviourIndex, ClientId, ObjectId},
    world::{
        object::ObjectLookup,
        variable::{
            Permission, ReplicatedVariable, VariableChunk, VariableDeltaMessage,
            VariableSnapshotMessage,
        },
    },
};

/// Decides which variable state goes to which peer each tick.
///
/// On a server, a client that starts observing an object first receives a
/// snapshot of every variable it may read; deltas for that object are only
/// sent to it afterwards, whether serialized here or relayed from the owner.
/// On a client, dirty variables the client may write are sent to the server.
///
/// Owned by the [`MessageManager`], which drives it through
/// [`MessageManager::replicate`].
#[derive(Debug, Default)]
pub struct VariableReplicator {
    awaiting_snapshot: HashSet<(ObjectId, ClientId)>,
    synced: HashSet<(ObjectId, ClientId)>,
}

impl VariableReplicator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn object_shown(&mut self, object_id: ObjectId, client_id: ClientId) {
        self.synced.remove(&(object_id, client_id));
        self.awaiting_snapshot.insert((object_id, client_id));
    }

    pub(crate) fn object_hidden(&mut self, object_id: ObjectId, client_id: ClientId) {
        self.synced.remove(&(object_id, client_id));
        self.awaiting_snapshot.remove(&(object_id, client_id));
    }

    pub(crate) fn object_despawned(&mut self, object_id: ObjectId) {
        self.synced.retain(|(object, _)| *object != object_id);
        self.awaiting_snapshot.retain(|(object, _)| *object != object_id);
    }

    pub(crate) fn client_disconnected(&mut self, client_id: ClientId) {
        self.synced.retain(|(_, client)| *client != client_id);
        self.awaiting_snapshot.retain(|(_, client)| *client != client_id);
    }

    /// Whether `client_id` has received its snapshot of `object_id`, so
    /// deltas may be sent to it.
    pub fn is_synced(&self, object_id: ObjectId, client_id: ClientId) -> bool {
        self.synced.contains(&(object_id, client_id))
    }

    /// Queues snapshots and deltas for `object_ids`, then clears the dirty
    /// flags of every variable that was considered. Returns the number of
    /// messages queued.
    pub(crate) fn replicate(
        &mut self,
        manager: &mut MessageManager,
        objects: &mut dyn ObjectLookup,
        object_ids: &[ObjectId],
    ) -> Result<usize, SendError> {
        let is_server = manager.config().is_server();
        let local = manager.config().local_client_id;
        let mut queued = 0;

        for object_id in object_ids {
            let object_id = *object_id;
            let destinations: Vec<ClientId> = if is_server {
                objects
                    .observers_of(object_id)
                    .into_iter()
                    .filter(|client| *client != local)
                    .collect()
            } else {
                vec![ClientId::SERVER]
            };
            let needs_snapshot: Vec<ClientId> = destinations
                .iter()
                .copied()
                .filter(|client| is_server && self.awaiting_snapshot.contains(&(object_id, *client)))
                .collect();

            for index in 0..objects.behaviour_count(object_id) {
                let behaviour_index = BehaviourIndex(index);
                let Some(behaviour) = objects.try_resolve(object_id, behaviour_index) else {
                    continue;
                };
                let variables = behaviour.variables_mut();
                let count = variables.len();

                for destination in &destinations {
                    if needs_snapshot.contains(destination) {
                        let chunks = variables
                            .iter()
                            .filter(|(_, variable)| variable.can_client_read(*destination))
                            .map(|(variable_index, variable)| {
                                VariableChunk::new(variable_index, serialize(variable, true))
                            })
                            .collect();
                        let message =
                            VariableSnapshotMessage::new(object_id, behaviour_index, count, chunks);
                        manager.send(&message, *destination, DeliveryMode::ReliableSequenced)?;
                        queued += 1;
                        continue;
                    }
                    if is_server && !self.synced.contains(&(object_id, *destination)) {
                        continue;
                    }

                    for delivery in DeliveryMode::ALL {
                        let chunks: Vec<VariableChunk> = variables
                            .iter()
                            .filter(|(_, variable)| {
                                variable.delivery() == delivery
                                    && should_send_delta(variable, *destination, local, is_server)
                            })
                            .map(|(variable_index, variable)| {
                                VariableChunk::new(variable_index, serialize(variable, false))
                            })
                            .collect();
                        if chunks.is_empty() {
                            continue;
                        }
                        let message = VariableDeltaMessage::new(
                            object_id,
                            behaviour_index,
                            delivery,
                            count,
                            chunks,
                        );
                        manager.send(&message, *destination, delivery)?;
                        queued += 1;
                    }
                }

                variables.reset_dirty();
            }

            for client in needs_snapshot {
                self.awaiting_snapshot.remove(&(object_id, client));
                self.synced.insert((object_id, client));
            }
        }

        Ok(queued)
    }
}

fn should_send_delta(
    variable: &ReplicatedVariable,
    destination: ClientId,
    local: ClientId,
    is_server: bool,
) -> bool {
    if !variable.is_dirty() || !variable.can_client_read(destination) {
        return false;
    }
    if !is_server {
        return variable.can_client_write(local);
    }
    // the owner wrote this value, it already has it
    !(matches!(variable.write_permission(), Permission::OwnerOnly) && variable.owner() == destination)
}

fn serialize(variable: &ReplicatedVariable, full: bool) -> Vec<u8> {
    let mut writer = BitWriter::new();
    if full {
        variable.serialize_full(&mut writer);
    } else {
        variable.serialize_delta(&mut writer);
    }
    writer.to_bytes()
}
