use tether_serde::Serde;

use crate::{
    messages::{
        constants::{
            FIRST_USER_TAG, NAMED_MESSAGE_TAG, RPC_MESSAGE_TAG, VARIABLE_DELTA_TAG, VARIABLE_SNAPSHOT_TAG,
        },
        named_message::{handle_named_message, NamedMessage},
        MessageRegistry, NetworkContext, NetworkMessage, ReceiveError,
    },
    rpc::{handle_rpc_message, RpcCallContext, RpcMessage, RpcResult, RpcSettings, RpcTable},
    types::{MessageTag, ProcedureId},
    world::{
        object::Behaviour,
        variable::{
            handle_variable_delta, handle_variable_snapshot, VariableDeltaMessage,
            VariableSnapshotMessage,
        },
    },
};

pub mod error;
pub use error::ProtocolError;

/// Startup-time registration of message types and remote procedures.
///
/// Both peers must build identical protocols. The built-in messages that
/// carry RPCs, variable state and named messages are always registered.
pub struct Protocol {
    pub messages: MessageRegistry,
    pub rpcs: RpcTable,
    locked: bool,
}

impl Default for Protocol {
    fn default() -> Self {
        let mut messages = MessageRegistry::new();
        let builtins = [
            messages.try_register::<RpcMessage, _>(RPC_MESSAGE_TAG, handle_rpc_message),
            messages.try_register::<VariableDeltaMessage, _>(VARIABLE_DELTA_TAG, handle_variable_delta),
            messages.try_register::<VariableSnapshotMessage, _>(
                VARIABLE_SNAPSHOT_TAG,
                handle_variable_snapshot,
            ),
            messages.try_register::<NamedMessage, _>(NAMED_MESSAGE_TAG, handle_named_message),
        ];
        debug_assert!(builtins.iter().all(Result::is_ok));

        Self {
            messages,
            rpcs: RpcTable::new(),
            locked: false,
        }
    }
}

impl Protocol {
    pub fn builder() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// Panics if the protocol is locked, the tag is reserved, or the tag or
    /// type is already registered. Use `try_add_message` to handle these as errors.
    pub fn add_message<M, F>(&mut self, tag: MessageTag, handler: F) -> &mut Self
    where
        M: NetworkMessage,
        F: Fn(M, &mut NetworkContext) -> Result<(), ReceiveError> + Send + Sync + 'static,
    {
        if let Err(error) = self.try_add_message::<M, F>(tag, handler) {
            panic!("{}", error);
        }
        self
    }

    /// # Panics
    ///
    /// Panics if the protocol is locked or the procedure id is taken. Use
    /// `try_add_procedure` to handle these as errors.
    pub fn add_procedure<B, A, F>(
        &mut self,
        procedure_id: ProcedureId,
        name: &'static str,
        settings: RpcSettings,
        handler: F,
    ) -> &mut Self
    where
        B: Behaviour + 'static,
        A: Serde + 'static,
        F: Fn(&mut B, A, &RpcCallContext) -> RpcResult + Send + Sync + 'static,
    {
        if let Err(error) = self.try_add_procedure::<B, A, F>(procedure_id, name, settings, handler) {
            panic!("{}", error);
        }
        self
    }

    // Non-panicking builder methods

    pub fn try_add_message<M, F>(
        &mut self,
        tag: MessageTag,
        handler: F,
    ) -> Result<&mut Self, ProtocolError>
    where
        M: NetworkMessage,
        F: Fn(M, &mut NetworkContext) -> Result<(), ReceiveError> + Send + Sync + 'static,
    {
        self.try_check_lock()?;
        if tag < FIRST_USER_TAG {
            return Err(ProtocolError::ReservedMessageType {
                name: M::NAME,
                tag,
                first_user_tag: FIRST_USER_TAG,
            });
        }
        self.messages.try_register::<M, F>(tag, handler)?;
        Ok(self)
    }

    pub fn try_add_procedure<B, A, F>(
        &mut self,
        procedure_id: ProcedureId,
        name: &'static str,
        settings: RpcSettings,
        handler: F,
    ) -> Result<&mut Self, ProtocolError>
    where
        B: Behaviour + 'static,
        A: Serde + 'static,
        F: Fn(&mut B, A, &RpcCallContext) -> RpcResult + Send + Sync + 'static,
    {
        self.try_check_lock()?;
        self.rpcs
            .try_add::<B, A, F>(procedure_id, name, settings, handler)?;
        Ok(self)
    }

    pub fn try_lock(&mut self) -> Result<(), ProtocolError> {
        self.try_check_lock()?;
        self.locked = true;
        Ok(())
    }

    pub fn lock(&mut self) {
        self.check_lock();
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Checks if protocol is locked without panicking
    pub fn try_check_lock(&self) -> Result<(), ProtocolError> {
        if self.locked {
            Err(ProtocolError::AlreadyLocked)
        } else {
            Ok(())
        }
    }

    /// Checks if protocol is locked, panics if it is
    pub fn check_lock(&self) {
        if self.locked {
            panic!("Protocol already locked!");
        }
    }

    pub fn build(&mut self) -> Self {
        std::mem::take(self)
    }
}
