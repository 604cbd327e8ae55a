use log::warn;

use tether_serde::{read_varint, write_varint, BitReader, BitWrite, BitWriter, Serde};

use crate::{
    messages::{NetworkContext, NetworkMessage, ReceiveError},
    rpc::RpcError,
    types::{BehaviourIndex, ClientId, ObjectId, ProcedureId},
};

/// A procedure call on one behaviour.
///
/// `sender` is the client that originally invoked the procedure, so a copy
/// relayed by the server still names the true invoker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcMessage {
    pub sender: ClientId,
    pub object_id: ObjectId,
    pub behaviour_index: BehaviourIndex,
    pub procedure_id: ProcedureId,
    pub args: Vec<u8>,
}

impl RpcMessage {
    pub fn new<A: Serde>(
        sender: ClientId,
        object_id: ObjectId,
        behaviour_index: BehaviourIndex,
        procedure_id: ProcedureId,
        args: &A,
    ) -> Self {
        let mut writer = BitWriter::new();
        args.ser(&mut writer);
        Self {
            sender,
            object_id,
            behaviour_index,
            procedure_id,
            args: writer.to_bytes(),
        }
    }
}

impl NetworkMessage for RpcMessage {
    const NAME: &'static str = "RpcMessage";

    fn serialize(&self, writer: &mut dyn BitWrite) {
        self.sender.ser(writer);
        self.object_id.ser(writer);
        self.behaviour_index.ser(writer);
        self.procedure_id.ser(writer);
        write_varint(writer, self.args.len() as u64);
        writer.write_bytes(&self.args);
    }

    fn deserialize(
        reader: &mut BitReader,
        context: &mut NetworkContext,
    ) -> Result<Self, ReceiveError> {
        let sender = ClientId::de(reader)?;
        let object_id = ObjectId::de(reader)?;
        if !context.objects().is_known_locally(object_id) {
            return Err(ReceiveError::TargetNotFound { object_id });
        }
        let behaviour_index = BehaviourIndex::de(reader)?;
        let procedure_id = ProcedureId::de(reader)?;
        let len = usize::try_from(read_varint(reader)?).map_err(|_| {
            ReceiveError::MalformedMessage {
                reason: "argument length out of range",
            }
        })?;
        let args = reader.read_bytes(len)?;
        Ok(Self {
            sender,
            object_id,
            behaviour_index,
            procedure_id,
            args,
        })
    }
}

pub(crate) fn handle_rpc_message(
    message: RpcMessage,
    context: &mut NetworkContext,
) -> Result<(), ReceiveError> {
    let transport_sender = context.sender();

    // only the server may speak for another client
    let invoker = if transport_sender.is_server() {
        message.sender
    } else if message.sender == transport_sender {
        transport_sender
    } else {
        return Err(ReceiveError::PermissionDenied {
            client: transport_sender,
            reason: format!("claimed to be {} when invoking an RPC", message.sender),
        });
    };

    let (rpcs, objects) = context.rpc_parts();
    let settings = rpcs.settings(message.procedure_id);
    let result = rpcs.invoke(
        objects,
        invoker,
        message.object_id,
        message.behaviour_index,
        message.procedure_id,
        &message.args,
    );

    let invoked = matches!(
        result,
        Ok(()) | Err(RpcError::HandlerFailed { .. }) | Err(RpcError::HandlerPanicked { .. })
    );
    if let Some(settings) = settings {
        if invoked && settings.relay && context.is_server() && !transport_sender.is_server() {
            let local = context.local_client_id();
            let destinations: Vec<ClientId> = context
                .objects()
                .observers_of(message.object_id)
                .into_iter()
                .filter(|client| *client != transport_sender && *client != local)
                .collect();
            if let Err(error) = context.forward_payload(&destinations, settings.delivery) {
                warn!(
                    "could not relay {} (tag {}) from {}: {}",
                    RpcMessage::NAME,
                    context.tag(),
                    transport_sender,
                    error
                );
            }
        }
    }

    result.map_err(ReceiveError::from)
}
