use crate::error::SerdeErr;

/// Reads values written by a [`BitWriter`](crate::BitWriter) from a borrowed
/// byte slice.
pub struct BitReader<'b> {
    buffer: &'b [u8],
    position: usize,
}

impl<'b> BitReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    pub fn read_bit(&mut self) -> Result<bool, SerdeErr> {
        let Some(byte) = self.buffer.get(self.position / 8) else {
            return Err(SerdeErr);
        };
        let bit = (byte >> (self.position % 8)) & 1 != 0;
        self.position += 1;
        Ok(bit)
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        if self.position % 8 == 0 {
            let Some(byte) = self.buffer.get(self.position / 8) else {
                return Err(SerdeErr);
            };
            self.position += 8;
            return Ok(*byte);
        }

        let mut output = 0u8;
        for index in 0..8 {
            if self.read_bit()? {
                output |= 1 << index;
            }
        }
        Ok(output)
    }

    /// `len` is usually a length prefix from the wire, so it is checked
    /// against what is left before anything is allocated.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, SerdeErr> {
        if len > self.remaining_bytes() {
            return Err(SerdeErr);
        }
        let mut output = Vec::with_capacity(len);
        for _ in 0..len {
            output.push(self.read_byte()?);
        }
        Ok(output)
    }

    /// Borrows the next `len` bytes without copying. Requires the reader to be
    /// byte aligned.
    pub fn read_slice(&mut self, len: usize) -> Result<&'b [u8], SerdeErr> {
        if self.position % 8 != 0 {
            return Err(SerdeErr);
        }
        let start = self.position / 8;
        let end = start.checked_add(len).ok_or(SerdeErr)?;
        let slice = self.buffer.get(start..end).ok_or(SerdeErr)?;
        self.position += len * 8;
        Ok(slice)
    }

    /// Skips any padding left in the current byte.
    pub fn align(&mut self) {
        let remainder = self.position % 8;
        if remainder != 0 {
            self.position += 8 - remainder;
        }
    }

    pub fn remaining_bits(&self) -> usize {
        (self.buffer.len() * 8).saturating_sub(self.position)
    }

    /// Whole unread bytes. Padding bits of a partially read byte do not count.
    pub fn remaining_bytes(&self) -> usize {
        self.remaining_bits() / 8
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_bits() == 0
    }

    pub fn bit_position(&self) -> usize {
        self.position
    }
}

/// A reader that owns its buffer, used when bytes outlive the batch they
/// arrived in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedBitReader {
    buffer: Box<[u8]>,
}

impl OwnedBitReader {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            buffer: bytes.into(),
        }
    }

    pub fn borrow(&self) -> BitReader<'_> {
        BitReader::new(&self.buffer)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn take_bytes(self) -> Vec<u8> {
        self.buffer.into_vec()
    }
}
