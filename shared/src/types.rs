use std::fmt;

use tether_serde::{read_varint, varint_len, write_varint, BitReader, BitWrite, Serde, SerdeErr};

/// Identifies one spawned replicated object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// Identifies one replicated behaviour attached to an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BehaviourIndex(pub u16);

/// Identifies a connected peer. [`ClientId::SERVER`] is the server or host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl ClientId {
    pub const SERVER: ClientId = ClientId(0);

    pub fn is_server(&self) -> bool {
        *self == Self::SERVER
    }
}

/// Identifies a registered remote procedure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcedureId(pub u32);

/// Stable wire identifier of a message type.
pub type MessageTag = u16;

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

impl fmt::Display for BehaviourIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "behaviour#{}", self.0)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_server() {
            write!(f, "server")
        } else {
            write!(f, "client#{}", self.0)
        }
    }
}

impl fmt::Display for ProcedureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "procedure#{}", self.0)
    }
}

// Identifiers travel as varints so every value of the field survives the
// round trip; a decoded value wider than the field is malformed.

impl Serde for ObjectId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        write_varint(writer, self.0);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        read_varint(reader).map(Self)
    }

    fn bit_length(&self) -> u32 {
        varint_len(self.0) as u32 * 8
    }
}

impl Serde for BehaviourIndex {
    fn ser(&self, writer: &mut dyn BitWrite) {
        write_varint(writer, u64::from(self.0));
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let value = read_varint(reader)?;
        u16::try_from(value).map(Self).map_err(|_| SerdeErr)
    }

    fn bit_length(&self) -> u32 {
        varint_len(u64::from(self.0)) as u32 * 8
    }
}

impl Serde for ClientId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        write_varint(writer, self.0);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        read_varint(reader).map(Self)
    }

    fn bit_length(&self) -> u32 {
        varint_len(self.0) as u32 * 8
    }
}

impl Serde for ProcedureId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        write_varint(writer, u64::from(self.0));
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let value = read_varint(reader)?;
        u32::try_from(value).map(Self).map_err(|_| SerdeErr)
    }

    fn bit_length(&self) -> u32 {
        varint_len(u64::from(self.0)) as u32 * 8
    }
}
