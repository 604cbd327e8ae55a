use log::warn;

use tether_serde::{read_varint, write_varint, BitReader, BitWrite, Serde};

use crate::{
    config::DeltaForwarding,
    messages::{NetworkContext, NetworkMessage, ReceiveError},
    transport::DeliveryMode,
    types::{BehaviourIndex, ClientId, MessageTag, ObjectId},
    world::variable::{ReplicatedVariable, VariableError, VariableSet},
};

/// The serialized form of one variable inside a variable message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableChunk {
    pub index: u16,
    pub bytes: Vec<u8>,
}

impl VariableChunk {
    /// A zero length marks an absent variable on the wire, so empty output is
    /// padded to one byte.
    pub fn new(index: u16, mut bytes: Vec<u8>) -> Self {
        if bytes.is_empty() {
            bytes.push(0);
        }
        Self { index, bytes }
    }
}

/// Shared layout of delta and snapshot messages: object id, behaviour index,
/// delivery mode, variable count, then per variable a length (zero when
/// absent) followed by that many bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
struct VariablePayload {
    object_id: ObjectId,
    behaviour_index: BehaviourIndex,
    delivery: DeliveryMode,
    variable_count: u16,
    chunks: Vec<VariableChunk>,
}

impl VariablePayload {
    fn write(&self, writer: &mut dyn BitWrite) {
        self.object_id.ser(writer);
        self.behaviour_index.ser(writer);
        self.delivery.ser(writer);
        write_varint(writer, u64::from(self.variable_count));

        let mut chunks = self.chunks.iter().peekable();
        for index in 0..self.variable_count {
            match chunks.next_if(|chunk| chunk.index == index) {
                Some(chunk) => {
                    write_varint(writer, chunk.bytes.len() as u64);
                    writer.write_bytes(&chunk.bytes);
                }
                None => write_varint(writer, 0),
            }
        }
    }

    fn read(reader: &mut BitReader, context: &NetworkContext) -> Result<Self, ReceiveError> {
        let object_id = ObjectId::de(reader)?;
        if !context.objects().is_known_locally(object_id) {
            return Err(ReceiveError::TargetNotFound { object_id });
        }
        let behaviour_index = BehaviourIndex::de(reader)?;
        let delivery = DeliveryMode::de(reader)?;
        let variable_count =
            u16::try_from(read_varint(reader)?).map_err(|_| ReceiveError::MalformedMessage {
                reason: "variable count out of range",
            })?;

        let mut chunks = Vec::new();
        for index in 0..variable_count {
            let len = usize::try_from(read_varint(reader)?).map_err(|_| {
                ReceiveError::MalformedMessage {
                    reason: "variable length out of range",
                }
            })?;
            if len > 0 {
                chunks.push(VariableChunk {
                    index,
                    bytes: reader.read_bytes(len)?,
                });
            }
        }

        Ok(Self {
            object_id,
            behaviour_index,
            delivery,
            variable_count,
            chunks,
        })
    }
}

/// Changed variables of one behaviour.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableDeltaMessage {
    payload: VariablePayload,
}

impl VariableDeltaMessage {
    /// `chunks` must be sorted by index.
    pub fn new(
        object_id: ObjectId,
        behaviour_index: BehaviourIndex,
        delivery: DeliveryMode,
        variable_count: u16,
        chunks: Vec<VariableChunk>,
    ) -> Self {
        Self {
            payload: VariablePayload {
                object_id,
                behaviour_index,
                delivery,
                variable_count,
                chunks,
            },
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.payload.object_id
    }

    pub fn behaviour_index(&self) -> BehaviourIndex {
        self.payload.behaviour_index
    }

    pub fn delivery(&self) -> DeliveryMode {
        self.payload.delivery
    }

    pub fn chunks(&self) -> &[VariableChunk] {
        &self.payload.chunks
    }
}

impl NetworkMessage for VariableDeltaMessage {
    const NAME: &'static str = "VariableDeltaMessage";

    fn serialize(&self, writer: &mut dyn BitWrite) {
        self.payload.write(writer);
    }

    fn deserialize(
        reader: &mut BitReader,
        context: &mut NetworkContext,
    ) -> Result<Self, ReceiveError> {
        Ok(Self {
            payload: VariablePayload::read(reader, context)?,
        })
    }
}

/// Every variable of one behaviour a client may read, sent when the client
/// starts observing the object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableSnapshotMessage {
    payload: VariablePayload,
}

impl VariableSnapshotMessage {
    pub fn new(
        object_id: ObjectId,
        behaviour_index: BehaviourIndex,
        variable_count: u16,
        chunks: Vec<VariableChunk>,
    ) -> Self {
        Self {
            payload: VariablePayload {
                object_id,
                behaviour_index,
                delivery: DeliveryMode::ReliableSequenced,
                variable_count,
                chunks,
            },
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.payload.object_id
    }

    pub fn chunks(&self) -> &[VariableChunk] {
        &self.payload.chunks
    }
}

impl NetworkMessage for VariableSnapshotMessage {
    const NAME: &'static str = "VariableSnapshotMessage";

    fn serialize(&self, writer: &mut dyn BitWrite) {
        self.payload.write(writer);
    }

    fn deserialize(
        reader: &mut BitReader,
        context: &mut NetworkContext,
    ) -> Result<Self, ReceiveError> {
        Ok(Self {
            payload: VariablePayload::read(reader, context)?,
        })
    }
}

/// Applies a delta. A server receiving from a client also arranges for the
/// update to reach the other observers, as configured by
/// [`DeltaForwarding`].
pub(crate) fn handle_variable_delta(
    message: VariableDeltaMessage,
    context: &mut NetworkContext,
) -> Result<(), ReceiveError> {
    let sender = context.sender();
    let tag = context.tag();
    let local = context.local_client_id();
    let forwarding = context.config().delta_forwarding;
    let from_client = context.is_server() && !sender.is_server();
    let VariablePayload {
        object_id,
        behaviour_index,
        delivery,
        chunks,
        ..
    } = message.payload;

    // observers still owed a snapshot get the applied value inside it
    let observers: Vec<ClientId> = if from_client {
        context
            .objects()
            .observers_of(object_id)
            .into_iter()
            .filter(|client| {
                *client != sender && *client != local && context.is_synced(object_id, *client)
            })
            .collect()
    } else {
        Vec::new()
    };

    let relay = {
        let Some(behaviour) = context.objects_mut().try_resolve(object_id, behaviour_index) else {
            return Err(ReceiveError::BehaviourNotFound {
                object_id,
                behaviour_index,
            });
        };
        let variables = behaviour.variables_mut();

        // raw bytes are only relayed when every observer may see every
        // variable and none of them will be rejected
        let relay = from_client
            && forwarding == DeltaForwarding::RelayOriginal
            && chunks.iter().all(|chunk| {
                variables.get(chunk.index).is_some_and(|variable| {
                    variable.can_client_write(sender)
                        && observers
                            .iter()
                            .all(|observer| variable.can_client_read(*observer))
                })
            });
        let keep_dirty = from_client
            && match forwarding {
                DeltaForwarding::Consume => false,
                DeltaForwarding::KeepDirty => true,
                DeltaForwarding::RelayOriginal => !relay,
            };

        let rejected = apply_chunks(variables, &chunks, |variable, reader| {
            variable.apply_delta(reader, sender, keep_dirty)
        });
        report_rejected(VariableDeltaMessage::NAME, tag, sender, &rejected);
        relay
    };

    if relay && !observers.is_empty() {
        context.forward_payload(&observers, delivery)?;
    }
    Ok(())
}

pub(crate) fn handle_variable_snapshot(
    message: VariableSnapshotMessage,
    context: &mut NetworkContext,
) -> Result<(), ReceiveError> {
    let sender = context.sender();
    let tag = context.tag();
    let VariablePayload {
        object_id,
        behaviour_index,
        chunks,
        ..
    } = message.payload;

    let Some(behaviour) = context.objects_mut().try_resolve(object_id, behaviour_index) else {
        return Err(ReceiveError::BehaviourNotFound {
            object_id,
            behaviour_index,
        });
    };
    let rejected = apply_chunks(behaviour.variables_mut(), &chunks, |variable, reader| {
        variable.apply_full(reader, sender, false)
    });
    report_rejected(VariableSnapshotMessage::NAME, tag, sender, &rejected);
    Ok(())
}

fn apply_chunks<F>(
    variables: &mut VariableSet,
    chunks: &[VariableChunk],
    mut apply: F,
) -> Vec<VariableError>
where
    F: FnMut(&mut ReplicatedVariable, &mut BitReader) -> Result<(), VariableError>,
{
    let mut rejected = Vec::new();
    for chunk in chunks {
        let result = variables
            .try_get_mut(chunk.index)
            .and_then(|variable| apply(variable, &mut BitReader::new(&chunk.bytes)));
        if let Err(error) = result {
            rejected.push(error);
        }
    }
    rejected
}

fn report_rejected(name: &str, tag: MessageTag, sender: ClientId, rejected: &[VariableError]) {
    if rejected.is_empty() {
        return;
    }
    let reasons: Vec<String> = rejected.iter().map(ToString::to_string).collect();
    warn!(
        "{} (tag {}) from {}: skipped {} variable(s): {}",
        name,
        tag,
        sender,
        rejected.len(),
        reasons.join("; ")
    );
}
