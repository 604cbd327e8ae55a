use crate::{
    types::ClientId,
    world::variable::{ReplicatedVariable, VariableError, VariableValue},
};

/// The ordered variables of one behaviour. A variable's position is its
/// index on the wire, so every peer must build the set in the same order.
#[derive(Debug, Default)]
pub struct VariableSet {
    variables: Vec<ReplicatedVariable>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, variable: ReplicatedVariable) -> Self {
        self.add(variable);
        self
    }

    pub fn add(&mut self, variable: ReplicatedVariable) -> u16 {
        self.variables.push(variable);
        (self.variables.len() - 1) as u16
    }

    pub fn len(&self) -> u16 {
        self.variables.len() as u16
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn get(&self, index: u16) -> Option<&ReplicatedVariable> {
        self.variables.get(usize::from(index))
    }

    pub fn get_mut(&mut self, index: u16) -> Option<&mut ReplicatedVariable> {
        self.variables.get_mut(usize::from(index))
    }

    pub fn try_get_mut(&mut self, index: u16) -> Result<&mut ReplicatedVariable, VariableError> {
        let len = self.len();
        self.variables
            .get_mut(usize::from(index))
            .ok_or(VariableError::IndexOutOfRange { index, len })
    }

    pub fn index_of(&self, name: &str) -> Option<u16> {
        self.variables
            .iter()
            .position(|variable| variable.name() == name)
            .map(|index| index as u16)
    }

    pub fn find(&self, name: &str) -> Option<&ReplicatedVariable> {
        self.variables.iter().find(|variable| variable.name() == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut ReplicatedVariable> {
        self.variables
            .iter_mut()
            .find(|variable| variable.name() == name)
    }

    /// Sets the named variable on behalf of `writer`.
    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<VariableValue>,
        writer: ClientId,
    ) -> Result<bool, VariableError> {
        match self.find_mut(name) {
            Some(variable) => variable.set(value, writer),
            None => Err(VariableError::UnknownVariable {
                name: name.to_string(),
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &ReplicatedVariable)> {
        self.variables
            .iter()
            .enumerate()
            .map(|(index, variable)| (index as u16, variable))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u16, &mut ReplicatedVariable)> {
        self.variables
            .iter_mut()
            .enumerate()
            .map(|(index, variable)| (index as u16, variable))
    }

    pub fn set_owner(&mut self, owner: ClientId) {
        for variable in &mut self.variables {
            variable.set_owner(owner);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.variables.iter().any(ReplicatedVariable::is_dirty)
    }

    pub fn reset_dirty(&mut self) {
        for variable in &mut self.variables {
            if variable.is_dirty() {
                variable.reset_dirty();
            }
        }
    }
}
