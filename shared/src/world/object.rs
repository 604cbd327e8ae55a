use std::any::Any;

use crate::{
    types::{BehaviourIndex, ClientId, ObjectId},
    world::variable::VariableSet,
};

/// A replicated component attached to an object. It owns its variables and
/// is the receiver of remote procedure calls.
pub trait Behaviour: AsAnyMut {
    fn variables(&self) -> &VariableSet;
    fn variables_mut(&mut self) -> &mut VariableSet;
}

pub trait AsAnyMut {
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAnyMut for T {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Boundary with the object lifecycle. Spawning, despawning and visibility
/// are decided by the implementor; the messaging core only looks objects up
/// for the duration of a single dispatch.
pub trait ObjectLookup {
    fn is_known_locally(&self, object_id: ObjectId) -> bool;

    fn owner_of(&self, object_id: ObjectId) -> Option<ClientId>;

    /// Clients that currently see the object, in a stable order.
    fn observers_of(&self, object_id: ObjectId) -> Vec<ClientId>;

    fn behaviour_count(&self, object_id: ObjectId) -> u16;

    fn try_resolve(
        &mut self,
        object_id: ObjectId,
        index: BehaviourIndex,
    ) -> Option<&mut dyn Behaviour>;
}
