use tether_serde::{
    read_varint_signed, write_varint_signed, BitField, BitReader, BitWrite, Serde, SerdeErr,
};

/// The wire shape of a [`VariableValue`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Integer,
    Float,
    Double,
    Text,
    Struct(Vec<ValueKind>),
}

/// A replicated value. Floating point fields compare by bit pattern, so
/// `NaN == NaN` and `0.0 != -0.0`.
#[derive(Clone, Debug)]
pub enum VariableValue {
    Bool(bool),
    Integer(i64),
    Float(f32),
    Double(f64),
    Text(String),
    /// A fixed set of fields, replicated field-by-field in deltas.
    Struct(Vec<VariableValue>),
}

impl PartialEq for VariableValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Struct(a), Self::Struct(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for VariableValue {}

impl VariableValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Integer(_) => ValueKind::Integer,
            Self::Float(_) => ValueKind::Float,
            Self::Double(_) => ValueKind::Double,
            Self::Text(_) => ValueKind::Text,
            Self::Struct(fields) => ValueKind::Struct(fields.iter().map(Self::kind).collect()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_fields(&self) -> Option<&[VariableValue]> {
        match self {
            Self::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn write_full(&self, writer: &mut dyn BitWrite) {
        match self {
            Self::Bool(value) => value.ser(writer),
            Self::Integer(value) => write_varint_signed(writer, *value),
            Self::Float(value) => value.ser(writer),
            Self::Double(value) => value.ser(writer),
            Self::Text(value) => value.ser(writer),
            Self::Struct(fields) => {
                for field in fields {
                    field.write_full(writer);
                }
            }
        }
    }

    pub fn read_full(reader: &mut BitReader, kind: &ValueKind) -> Result<Self, SerdeErr> {
        Ok(match kind {
            ValueKind::Bool => Self::Bool(bool::de(reader)?),
            ValueKind::Integer => Self::Integer(read_varint_signed(reader)?),
            ValueKind::Float => Self::Float(f32::de(reader)?),
            ValueKind::Double => Self::Double(f64::de(reader)?),
            ValueKind::Text => Self::Text(String::de(reader)?),
            ValueKind::Struct(kinds) => {
                let mut fields = Vec::with_capacity(kinds.len());
                for kind in kinds {
                    fields.push(Self::read_full(reader, kind)?);
                }
                Self::Struct(fields)
            }
        })
    }

    /// Writes the part of `self` that differs from `baseline`. Scalars are
    /// always written whole; structs write a leading bitfield of changed
    /// fields followed by those fields.
    pub fn write_delta(&self, writer: &mut dyn BitWrite, baseline: &VariableValue) {
        let Self::Struct(fields) = self else {
            self.write_full(writer);
            return;
        };

        let baseline_fields = baseline.as_fields();
        let mut changed = BitField::new(fields.len());
        for (index, field) in fields.iter().enumerate() {
            let unchanged = baseline_fields
                .and_then(|base| base.get(index))
                .is_some_and(|base| base == field);
            changed.set(index, !unchanged);
        }

        changed.ser(writer);
        for (index, field) in fields.iter().enumerate() {
            if changed.get(index) {
                field.write_full(writer);
            }
        }
    }

    /// Reads a delta written by [`Self::write_delta`] on top of `current`.
    pub fn read_delta(reader: &mut BitReader, current: &VariableValue) -> Result<Self, SerdeErr> {
        let Self::Struct(fields) = current else {
            return Self::read_full(reader, &current.kind());
        };

        let changed = BitField::de(reader, fields.len())?;
        let mut output = fields.clone();
        for (index, field) in output.iter_mut().enumerate() {
            if changed.get(index) {
                *field = Self::read_full(reader, &field.kind())?;
            }
        }
        Ok(Self::Struct(output))
    }
}

impl From<bool> for VariableValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for VariableValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for VariableValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for VariableValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f32> for VariableValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<f64> for VariableValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<VariableValue>> for VariableValue {
    fn from(fields: Vec<VariableValue>) -> Self {
        Self::Struct(fields)
    }
}
