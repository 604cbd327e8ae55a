use std::{
    any::Any,
    collections::HashMap,
    panic::{catch_unwind, AssertUnwindSafe},
};

use tether_serde::{BitReader, Serde};

use crate::{
    protocol::ProtocolError,
    rpc::RpcError,
    transport::DeliveryMode,
    types::{BehaviourIndex, ClientId, ObjectId, ProcedureId},
    world::object::{AsAnyMut, Behaviour, ObjectLookup},
};

pub type RpcResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// How a procedure may be invoked and delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RpcSettings {
    /// Only the object's owner may invoke the procedure.
    pub requires_ownership: bool,
    pub delivery: DeliveryMode,
    /// A server that receives this call from a client forwards the received
    /// bytes to every other observer of the object.
    pub relay: bool,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self::server_rpc()
    }
}

impl RpcSettings {
    /// Called by clients on the server. Requires ownership.
    pub fn server_rpc() -> Self {
        Self {
            requires_ownership: true,
            delivery: DeliveryMode::ReliableSequenced,
            relay: false,
        }
    }

    /// Called by the server on clients.
    pub fn client_rpc() -> Self {
        Self {
            requires_ownership: false,
            delivery: DeliveryMode::ReliableSequenced,
            relay: false,
        }
    }

    pub fn with_delivery(mut self, delivery: DeliveryMode) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_relay(mut self) -> Self {
        self.relay = true;
        self
    }

    pub fn with_requires_ownership(mut self, requires_ownership: bool) -> Self {
        self.requires_ownership = requires_ownership;
        self
    }
}

/// Describes one invocation. Built per call and dropped when it returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RpcCallContext {
    pub sender: ClientId,
    pub object_id: ObjectId,
    pub behaviour_index: BehaviourIndex,
    pub procedure_id: ProcedureId,
    pub requires_ownership: bool,
}

type ProcedureFn = Box<
    dyn Fn(&mut dyn Behaviour, &mut BitReader, &RpcCallContext) -> Result<(), RpcError>
        + Send
        + Sync,
>;

struct Procedure {
    name: &'static str,
    settings: RpcSettings,
    call: ProcedureFn,
}

/// Procedure id to typed handler, filled at startup.
#[derive(Default)]
pub struct RpcTable {
    procedures: HashMap<ProcedureId, Procedure>,
}

impl RpcTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_add<B, A, F>(
        &mut self,
        procedure_id: ProcedureId,
        name: &'static str,
        settings: RpcSettings,
        handler: F,
    ) -> Result<(), ProtocolError>
    where
        B: Behaviour + 'static,
        A: Serde + 'static,
        F: Fn(&mut B, A, &RpcCallContext) -> RpcResult + Send + Sync + 'static,
    {
        if let Some(existing) = self.procedures.get(&procedure_id) {
            return Err(ProtocolError::DuplicateProcedure {
                procedure: procedure_id,
                name,
                existing: existing.name,
            });
        }

        let call: ProcedureFn = Box::new(move |behaviour, reader, context| {
            let procedure = context.procedure_id;
            let args = A::de(reader).map_err(|_| RpcError::MalformedArguments { procedure })?;
            if reader.remaining_bytes() > 0 {
                return Err(RpcError::MalformedArguments { procedure });
            }
            let Some(target) = behaviour.as_any_mut().downcast_mut::<B>() else {
                return Err(RpcError::BehaviourMismatch {
                    procedure,
                    object_id: context.object_id,
                    behaviour_index: context.behaviour_index,
                });
            };
            match catch_unwind(AssertUnwindSafe(|| handler(target, args, context))) {
                Ok(Ok(())) => Ok(()),
                Ok(Err(error)) => Err(RpcError::HandlerFailed {
                    procedure,
                    reason: error.to_string(),
                }),
                Err(payload) => Err(RpcError::HandlerPanicked {
                    procedure,
                    message: panic_message(payload.as_ref()),
                }),
            }
        });

        self.procedures.insert(
            procedure_id,
            Procedure {
                name,
                settings,
                call,
            },
        );
        Ok(())
    }

    pub fn contains(&self, procedure_id: ProcedureId) -> bool {
        self.procedures.contains_key(&procedure_id)
    }

    pub fn settings(&self, procedure_id: ProcedureId) -> Option<RpcSettings> {
        self.procedures
            .get(&procedure_id)
            .map(|procedure| procedure.settings)
    }

    pub fn name_of(&self, procedure_id: ProcedureId) -> Option<&'static str> {
        self.procedures
            .get(&procedure_id)
            .map(|procedure| procedure.name)
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }

    /// Resolves the target, checks ownership, decodes `args` and runs the
    /// procedure. Failures inside the procedure body, panics included, come
    /// back as errors.
    pub fn invoke(
        &self,
        objects: &mut dyn ObjectLookup,
        sender: ClientId,
        object_id: ObjectId,
        behaviour_index: BehaviourIndex,
        procedure_id: ProcedureId,
        args: &[u8],
    ) -> Result<(), RpcError> {
        let procedure = self
            .procedures
            .get(&procedure_id)
            .ok_or(RpcError::UnknownProcedure {
                procedure: procedure_id,
            })?;
        let target_not_found = RpcError::TargetNotFound {
            object_id,
            behaviour_index,
        };

        if !objects.is_known_locally(object_id) {
            return Err(target_not_found);
        }
        let Some(owner) = objects.owner_of(object_id) else {
            return Err(target_not_found);
        };
        if procedure.settings.requires_ownership && sender != owner {
            return Err(RpcError::PermissionDenied {
                procedure: procedure_id,
                sender,
                owner,
            });
        }
        let Some(behaviour) = objects.try_resolve(object_id, behaviour_index) else {
            return Err(target_not_found);
        };

        let context = RpcCallContext {
            sender,
            object_id,
            behaviour_index,
            procedure_id,
            requires_ownership: procedure.settings.requires_ownership,
        };
        let mut reader = BitReader::new(args);
        (procedure.call)(behaviour, &mut reader, &context)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
