pub trait BitWrite {
    fn write_bit(&mut self, bit: bool);
    fn write_byte(&mut self, byte: u8);
    fn count_bits(&mut self, bits: u32);
    fn is_counter(&self) -> bool;

    fn write_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.write_byte(*byte);
        }
    }
}

/// A growable bit writer. Messages are bounded by batch limits upstream,
/// not by the writer.
pub struct BitWriter {
    scratch: u8,
    scratch_index: u8,
    buffer: Vec<u8>,
    bits_written: u32,
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWriter {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            scratch: 0,
            scratch_index: 0,
            buffer: Vec::with_capacity(bytes),
            bits_written: 0,
        }
    }

    fn flush_scratch(&mut self) {
        if self.scratch_index > 0 {
            let byte = (self.scratch << (8 - self.scratch_index)).reverse_bits();
            self.buffer.push(byte);
            self.scratch = 0;
            self.scratch_index = 0;
        }
    }

    /// Pads the current partial byte with zero bits.
    pub fn align(&mut self) {
        if self.scratch_index > 0 {
            self.bits_written += u32::from(8 - self.scratch_index);
            self.flush_scratch();
        }
    }

    pub fn to_bytes(mut self) -> Vec<u8> {
        self.flush_scratch();
        self.buffer
    }

    pub fn bits_written(&self) -> u32 {
        self.bits_written
    }

    /// Length of the output once the trailing partial byte is padded.
    pub fn byte_len(&self) -> usize {
        self.buffer.len() + usize::from(self.scratch_index > 0)
    }
}

impl BitWrite for BitWriter {
    fn write_bit(&mut self, bit: bool) {
        self.scratch <<= 1;

        if bit {
            self.scratch |= 1;
        }

        self.scratch_index += 1;
        self.bits_written += 1;

        if self.scratch_index >= 8 {
            self.buffer.push(self.scratch.reverse_bits());
            self.scratch_index = 0;
            self.scratch = 0;
        }
    }

    fn write_byte(&mut self, byte: u8) {
        if self.scratch_index == 0 {
            self.buffer.push(byte);
            self.bits_written += 8;
            return;
        }
        let mut temp = byte;
        for _ in 0..8 {
            self.write_bit(temp & 1 != 0);
            temp >>= 1;
        }
    }

    fn count_bits(&mut self, _bits: u32) {}

    fn is_counter(&self) -> bool {
        false
    }
}

/// Measures how many bits a value would occupy without producing output.
#[derive(Default)]
pub struct BitCounter {
    count: u32,
}

impl BitCounter {
    pub fn new() -> Self {
        Self { count: 0 }
    }

    pub fn bits_needed(&self) -> u32 {
        self.count
    }
}

impl BitWrite for BitCounter {
    fn write_bit(&mut self, _: bool) {
        self.count += 1;
    }

    fn write_byte(&mut self, _: u8) {
        self.count += 8;
    }

    fn count_bits(&mut self, bits: u32) {
        self.count += bits;
    }

    fn is_counter(&self) -> bool {
        true
    }
}
