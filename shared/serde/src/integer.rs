use crate::{
    arithmetic::{zigzag_decode, zigzag_encode},
    bit_reader::BitReader,
    bit_writer::BitWrite,
    error::SerdeErr,
    serde::Serde,
};

pub type UnsignedInteger<const BITS: u8> = SerdeInteger<false, false, BITS>;
pub type SignedInteger<const BITS: u8> = SerdeInteger<true, false, BITS>;
pub type UnsignedVariableInteger<const BITS: u8> = SerdeInteger<false, true, BITS>;
pub type SignedVariableInteger<const BITS: u8> = SerdeInteger<true, true, BITS>;

/// An integer written with an exact number of bits.
///
/// Fixed integers always occupy `BITS` bits. Variable integers are written in
/// `BITS`-sized chunks, each preceded by a continuation bit. Signed values are
/// zig-zag encoded first, so `SignedInteger<4>` holds -8..=7.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SerdeInteger<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> {
    value: i64,
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> SerdeInteger<SIGNED, VARIABLE, BITS> {
    /// Panics if `value` does not fit. Use [`Self::try_new`] for untrusted input.
    pub fn new<T: Into<i64>>(value: T) -> Self {
        let value = value.into();
        match Self::try_new(value) {
            Ok(integer) => integer,
            Err(_) => panic!("with {} bits, can't encode {}", BITS, value),
        }
    }

    pub fn try_new<T: Into<i64>>(value: T) -> Result<Self, SerdeErr> {
        let value = value.into();
        if Self::fits(value) {
            Ok(Self { value })
        } else {
            Err(SerdeErr)
        }
    }

    pub fn get(&self) -> i64 {
        self.value
    }

    pub fn set<T: Into<i64>>(&mut self, value: T) -> Result<(), SerdeErr> {
        *self = Self::try_new(value)?;
        Ok(())
    }

    fn fits(value: i64) -> bool {
        if BITS == 0 || BITS > 64 || (!SIGNED && value < 0) {
            return false;
        }
        if VARIABLE || BITS == 64 {
            return true;
        }
        Self::to_wire(value) < (1u64 << BITS)
    }

    fn to_wire(value: i64) -> u64 {
        if SIGNED {
            zigzag_encode(value)
        } else {
            value as u64
        }
    }

    fn from_wire(wire: u64) -> Result<i64, SerdeErr> {
        if SIGNED {
            Ok(zigzag_decode(wire))
        } else {
            i64::try_from(wire).map_err(|_| SerdeErr)
        }
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> Serde
    for SerdeInteger<SIGNED, VARIABLE, BITS>
{
    fn ser(&self, writer: &mut dyn BitWrite) {
        let mut wire = Self::to_wire(self.value);
        loop {
            let proceed = VARIABLE && BITS < 64 && (wire >> BITS) != 0;
            if VARIABLE {
                writer.write_bit(proceed);
            }
            for _ in 0..BITS {
                writer.write_bit(wire & 1 != 0);
                wire >>= 1;
            }
            if !proceed {
                return;
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if BITS == 0 || BITS > 64 {
            return Err(SerdeErr);
        }
        let mut wire = 0u64;
        let mut shift = 0u32;
        loop {
            let proceed = VARIABLE && reader.read_bit()?;
            for _ in 0..BITS {
                if reader.read_bit()? {
                    if shift >= 64 {
                        return Err(SerdeErr);
                    }
                    wire |= 1 << shift;
                }
                shift += 1;
            }
            if !proceed {
                break;
            }
        }
        let value = Self::from_wire(wire)?;
        Self::try_new(value)
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> From<SerdeInteger<SIGNED, VARIABLE, BITS>>
    for i64
{
    fn from(integer: SerdeInteger<SIGNED, VARIABLE, BITS>) -> Self {
        integer.value
    }
}
