//! Byte-oriented integer packing.
//!
//! `varint` packs small values into a single byte and is used for envelope
//! headers and length prefixes. The `bit_packed` family stores the byte count
//! in the low bits of the first byte and is used for identifiers.

use crate::{
    arithmetic::{used_byte_count, zigzag_decode, zigzag_encode},
    bit_reader::BitReader,
    bit_writer::BitWrite,
    error::SerdeErr,
    serde::Serde,
};

const VARINT_ONE_BYTE_MAX: u64 = 240;
const VARINT_TWO_BYTE_MAX: u64 = 2287;
const VARINT_THREE_BYTE_MAX: u64 = 67823;
const VARINT_TWO_BYTE_PREFIX: u8 = 241;
const VARINT_THREE_BYTE_PREFIX: u8 = 249;
const VARINT_WIDE_PREFIX: u8 = 247;

pub const BIT_PACKED_U16_MAX: u16 = (1 << 15) - 1;
pub const BIT_PACKED_U32_MAX: u32 = (1 << 30) - 1;
pub const BIT_PACKED_U64_MAX: u64 = (1 << 61) - 1;

pub fn write_varint(writer: &mut dyn BitWrite, value: u64) {
    if value <= VARINT_ONE_BYTE_MAX {
        writer.write_byte(value as u8);
    } else if value <= VARINT_TWO_BYTE_MAX {
        let rest = value - VARINT_ONE_BYTE_MAX;
        writer.write_byte(VARINT_TWO_BYTE_PREFIX + (rest >> 8) as u8);
        writer.write_byte(rest as u8);
    } else if value <= VARINT_THREE_BYTE_MAX {
        // big endian offset from the two byte range
        let rest = value - (VARINT_TWO_BYTE_MAX + 1);
        writer.write_byte(VARINT_THREE_BYTE_PREFIX);
        writer.write_byte((rest >> 8) as u8);
        writer.write_byte(rest as u8);
    } else {
        let count = used_byte_count(value);
        writer.write_byte(VARINT_WIDE_PREFIX + count as u8);
        write_le_bytes(writer, value, count);
    }
}

pub fn read_varint(reader: &mut BitReader) -> Result<u64, SerdeErr> {
    let first = reader.read_byte()?;
    match first {
        0..=240 => Ok(u64::from(first)),
        241..=248 => {
            let second = reader.read_byte()?;
            Ok(VARINT_ONE_BYTE_MAX
                + (u64::from(first - VARINT_TWO_BYTE_PREFIX) << 8)
                + u64::from(second))
        }
        VARINT_THREE_BYTE_PREFIX => {
            let high = reader.read_byte()?;
            let low = reader.read_byte()?;
            Ok(VARINT_TWO_BYTE_MAX + 1 + (u64::from(high) << 8) + u64::from(low))
        }
        _ => {
            let count = usize::from(first - VARINT_WIDE_PREFIX);
            read_le_bytes(reader, 0, 0, count)
        }
    }
}

/// Encoded size of `value` in bytes.
pub fn varint_len(value: u64) -> usize {
    if value <= VARINT_ONE_BYTE_MAX {
        1
    } else if value <= VARINT_TWO_BYTE_MAX {
        2
    } else if value <= VARINT_THREE_BYTE_MAX {
        3
    } else {
        1 + used_byte_count(value)
    }
}

pub fn write_varint_signed(writer: &mut dyn BitWrite, value: i64) {
    write_varint(writer, zigzag_encode(value));
}

pub fn read_varint_signed(reader: &mut BitReader) -> Result<i64, SerdeErr> {
    read_varint(reader).map(zigzag_decode)
}

/// Fails without writing for values above [`BIT_PACKED_U16_MAX`].
pub fn write_bit_packed_u16(writer: &mut dyn BitWrite, value: u16) -> Result<(), SerdeErr> {
    if value > BIT_PACKED_U16_MAX {
        return Err(SerdeErr);
    }
    if value <= 0x7F {
        writer.write_byte((value << 1) as u8);
    } else {
        let shifted = (value << 1) | 1;
        writer.write_byte(shifted as u8);
        writer.write_byte((shifted >> 8) as u8);
    }
    Ok(())
}

pub fn read_bit_packed_u16(reader: &mut BitReader) -> Result<u16, SerdeErr> {
    let first = reader.read_byte()?;
    if first & 1 == 0 {
        return Ok(u16::from(first >> 1));
    }
    let second = reader.read_byte()?;
    Ok(((u16::from(second) << 8) | u16::from(first)) >> 1)
}

/// Fails without writing for values above [`BIT_PACKED_U32_MAX`].
pub fn write_bit_packed_u32(writer: &mut dyn BitWrite, value: u32) -> Result<(), SerdeErr> {
    if value > BIT_PACKED_U32_MAX {
        return Err(SerdeErr);
    }
    let shifted = u64::from(value) << 2;
    let count = used_byte_count(shifted);
    write_le_bytes(writer, shifted | (count as u64 - 1), count);
    Ok(())
}

pub fn read_bit_packed_u32(reader: &mut BitReader) -> Result<u32, SerdeErr> {
    let first = reader.read_byte()?;
    let count = usize::from(first & 0b11) + 1;
    let value = read_le_bytes(reader, u64::from(first), 1, count)? >> 2;
    Ok(value as u32)
}

/// Fails without writing for values above [`BIT_PACKED_U64_MAX`].
pub fn write_bit_packed_u64(writer: &mut dyn BitWrite, value: u64) -> Result<(), SerdeErr> {
    if value > BIT_PACKED_U64_MAX {
        return Err(SerdeErr);
    }
    let shifted = value << 3;
    let count = used_byte_count(shifted);
    write_le_bytes(writer, shifted | (count as u64 - 1), count);
    Ok(())
}

pub fn read_bit_packed_u64(reader: &mut BitReader) -> Result<u64, SerdeErr> {
    let first = reader.read_byte()?;
    let count = usize::from(first & 0b111) + 1;
    Ok(read_le_bytes(reader, u64::from(first), 1, count)? >> 3)
}

fn write_le_bytes(writer: &mut dyn BitWrite, value: u64, count: usize) {
    for index in 0..count {
        writer.write_byte((value >> (8 * index)) as u8);
    }
}

fn read_le_bytes(
    reader: &mut BitReader,
    mut value: u64,
    already_read: usize,
    count: usize,
) -> Result<u64, SerdeErr> {
    if count > 8 {
        return Err(SerdeErr);
    }
    for index in already_read..count {
        value |= u64::from(reader.read_byte()?) << (8 * index);
    }
    Ok(value)
}

/// An unsigned integer carried in `varint` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct VarUint(pub u64);

impl Serde for VarUint {
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

/// A signed integer carried zig-zag encoded in `varint` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct VarInt(pub i64);

impl Serde for VarInt {
    fn ser(&self, writer: &mut dyn BitWrite) {
        write_varint_signed(writer, self.0);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        read_varint_signed(reader).map(Self)
    }

    fn bit_length(&self) -> u32 {
        varint_len(zigzag_encode(self.0)) as u32 * 8
    }
}
