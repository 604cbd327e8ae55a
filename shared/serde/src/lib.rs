//! Wire primitives shared by every tether message.
//!
//! Bits are written least-significant first within each byte, so a writer that
//! only ever writes whole bytes produces exactly those bytes on the wire.

mod arithmetic;
mod bit_field;
mod bit_reader;
mod bit_writer;
mod error;
mod impls;
mod integer;
mod packing;
mod serde;

pub use arithmetic::{ceiling_div, used_byte_count, zigzag_decode, zigzag_encode};
pub use bit_field::BitField;
pub use bit_reader::{BitReader, OwnedBitReader};
pub use bit_writer::{BitCounter, BitWrite, BitWriter};
pub use error::SerdeErr;
pub use integer::{
    SerdeInteger, SignedInteger, SignedVariableInteger, UnsignedInteger, UnsignedVariableInteger,
};
pub use packing::{
    read_bit_packed_u16, read_bit_packed_u32, read_bit_packed_u64, read_varint, read_varint_signed,
    varint_len, write_bit_packed_u16, write_bit_packed_u32, write_bit_packed_u64, write_varint,
    write_varint_signed, VarInt, VarUint, BIT_PACKED_U16_MAX, BIT_PACKED_U32_MAX,
    BIT_PACKED_U64_MAX,
};
pub use serde::{ConstBitLength, Serde};
