use tether_serde::{BitReader, BitWrite};

use crate::{
    transport::DeliveryMode,
    types::ClientId,
    world::variable::{Permission, ValueKind, VariableError, VariableValue},
};

pub type ValueChangedCallback = Box<dyn FnMut(&VariableValue, &VariableValue) + Send + Sync>;

/// A value replicated from its writer to every client allowed to read it.
///
/// `baseline` is the value most recently serialized for send. A variable is
/// dirty while `value` has not yet been serialized.
pub struct ReplicatedVariable {
    name: String,
    kind: ValueKind,
    value: VariableValue,
    baseline: VariableValue,
    dirty: bool,
    owner: ClientId,
    read_permission: Permission,
    write_permission: Permission,
    delivery: DeliveryMode,
    on_value_changed: Option<ValueChangedCallback>,
}

impl ReplicatedVariable {
    /// Readable by everyone, writable by the server.
    pub fn new(name: &str, initial: impl Into<VariableValue>) -> Self {
        let value = initial.into();
        Self {
            name: name.to_string(),
            kind: value.kind(),
            baseline: value.clone(),
            value,
            dirty: false,
            owner: ClientId::SERVER,
            read_permission: Permission::Everyone,
            write_permission: Permission::ServerOnly,
            delivery: DeliveryMode::ReliableSequenced,
            on_value_changed: None,
        }
    }

    pub fn with_read_permission(mut self, permission: Permission) -> Self {
        self.read_permission = permission;
        self
    }

    pub fn with_write_permission(mut self, permission: Permission) -> Self {
        self.write_permission = permission;
        self
    }

    pub fn with_delivery(mut self, delivery: DeliveryMode) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_owner(mut self, owner: ClientId) -> Self {
        self.owner = owner;
        self
    }

    /// Registers a callback invoked with `(previous, new)` whenever the value
    /// is set or applied from the network.
    pub fn on_value_changed<F>(&mut self, callback: F)
    where
        F: FnMut(&VariableValue, &VariableValue) + Send + Sync + 'static,
    {
        self.on_value_changed = Some(Box::new(callback));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn value(&self) -> &VariableValue {
        &self.value
    }

    pub fn owner(&self) -> ClientId {
        self.owner
    }

    pub fn set_owner(&mut self, owner: ClientId) {
        self.owner = owner;
    }

    pub fn delivery(&self) -> DeliveryMode {
        self.delivery
    }

    pub fn write_permission(&self) -> &Permission {
        &self.write_permission
    }

    pub fn read_permission(&self) -> &Permission {
        &self.read_permission
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Called once the current value has been serialized for every
    /// destination.
    pub fn reset_dirty(&mut self) {
        self.baseline = self.value.clone();
        self.dirty = false;
    }

    /// The server reads every variable.
    pub fn can_client_read(&self, client: ClientId) -> bool {
        client.is_server() || self.read_permission.allows(client, self.owner)
    }

    pub fn can_client_write(&self, client: ClientId) -> bool {
        self.write_permission.allows(client, self.owner)
    }

    /// Replaces the value on behalf of `writer`. Returns whether the value
    /// changed.
    pub fn set(
        &mut self,
        value: impl Into<VariableValue>,
        writer: ClientId,
    ) -> Result<bool, VariableError> {
        if !self.can_client_write(writer) {
            return Err(self.permission_denied(writer));
        }
        let value = value.into();
        if value.kind() != self.kind {
            return Err(VariableError::KindMismatch {
                variable: self.name.clone(),
                expected: self.kind.clone(),
                found: value.kind(),
            });
        }
        if value == self.value {
            return Ok(false);
        }

        let previous = std::mem::replace(&mut self.value, value);
        self.dirty = true;
        self.notify(&previous);
        Ok(true)
    }

    pub fn serialize_delta(&self, writer: &mut dyn BitWrite) {
        self.value.write_delta(writer, &self.baseline);
    }

    pub fn serialize_full(&self, writer: &mut dyn BitWrite) {
        self.value.write_full(writer);
    }

    /// Applies a delta received from `sender`. Data relayed by the server is
    /// trusted; data from a client must satisfy the write permission.
    ///
    /// With `keep_dirty` the variable stays dirty so the next replication pass
    /// forwards the new value to other observers.
    pub fn apply_delta(
        &mut self,
        reader: &mut BitReader,
        sender: ClientId,
        keep_dirty: bool,
    ) -> Result<(), VariableError> {
        self.check_remote_writer(sender)?;
        let value = VariableValue::read_delta(reader, &self.value).map_err(|_| self.malformed())?;
        self.accept(value, keep_dirty);
        Ok(())
    }

    pub fn apply_full(
        &mut self,
        reader: &mut BitReader,
        sender: ClientId,
        keep_dirty: bool,
    ) -> Result<(), VariableError> {
        self.check_remote_writer(sender)?;
        let value = VariableValue::read_full(reader, &self.kind).map_err(|_| self.malformed())?;
        self.accept(value, keep_dirty);
        Ok(())
    }

    fn check_remote_writer(&self, sender: ClientId) -> Result<(), VariableError> {
        if sender.is_server() || self.can_client_write(sender) {
            Ok(())
        } else {
            Err(self.permission_denied(sender))
        }
    }

    fn accept(&mut self, value: VariableValue, keep_dirty: bool) {
        let previous = std::mem::replace(&mut self.value, value);
        if keep_dirty {
            self.dirty = true;
        } else {
            self.baseline = self.value.clone();
        }
        self.notify(&previous);
    }

    fn notify(&mut self, previous: &VariableValue) {
        if let Some(callback) = self.on_value_changed.as_mut() {
            callback(previous, &self.value);
        }
    }

    fn permission_denied(&self, client: ClientId) -> VariableError {
        VariableError::PermissionDenied {
            variable: self.name.clone(),
            client,
            owner: self.owner,
        }
    }

    fn malformed(&self) -> VariableError {
        VariableError::Malformed {
            variable: self.name.clone(),
        }
    }
}

impl std::fmt::Debug for ReplicatedVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicatedVariable")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("dirty", &self.dirty)
            .field("owner", &self.owner)
            .field("read_permission", &self.read_permission)
            .field("write_permission", &self.write_permission)
            .finish()
    }
}
