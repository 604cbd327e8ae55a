use crate::{arithmetic::ceiling_div, bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr};

/// A run of flag bits padded to whole bytes, written ahead of the values
/// whose presence it marks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitField {
    bytes: Vec<u8>,
    len: usize,
}

impl BitField {
    pub fn new(len: usize) -> Self {
        Self {
            bytes: vec![0; ceiling_div(len as u64, 8) as usize],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn get(&self, index: usize) -> bool {
        index < self.len && self.bytes[index / 8] & (1 << (index % 8)) != 0
    }

    pub fn set(&mut self, index: usize, value: bool) {
        if index >= self.len {
            return;
        }
        let mask = 1 << (index % 8);
        if value {
            self.bytes[index / 8] |= mask;
        } else {
            self.bytes[index / 8] &= !mask;
        }
    }

    pub fn is_clear(&self) -> bool {
        self.bytes.iter().all(|byte| *byte == 0)
    }

    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|byte| byte.count_ones() as usize).sum()
    }

    pub fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_bytes(&self.bytes);
    }

    /// Reads a field of `len` flags. Flags set past `len` are malformed.
    pub fn de(reader: &mut BitReader, len: usize) -> Result<Self, SerdeErr> {
        let mut field = Self::new(len);
        for byte in field.bytes.iter_mut() {
            *byte = reader.read_byte()?;
        }
        let used = len % 8;
        if used != 0 {
            if let Some(last) = field.bytes.last() {
                if last >> used != 0 {
                    return Err(SerdeErr);
                }
            }
        }
        Ok(field)
    }
}
