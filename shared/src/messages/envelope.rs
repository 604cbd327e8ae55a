//! Envelope framing: `[tag: varint][payload_length: varint][payload]`.

use tether_serde::{read_varint, varint_len, write_varint, BitReader, BitWrite, BitWriter};

use crate::{messages::error::EnvelopeError, types::MessageTag};

/// An envelope borrowed from a received batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawEnvelope<'a> {
    pub tag: MessageTag,
    pub payload: &'a [u8],
}

impl RawEnvelope<'_> {
    pub fn to_envelope(&self) -> MessageEnvelope {
        MessageEnvelope {
            tag: self.tag,
            payload: self.payload.to_vec(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEnvelope {
    pub tag: MessageTag,
    pub payload: Vec<u8>,
}

impl MessageEnvelope {
    pub fn new(tag: MessageTag, payload: Vec<u8>) -> Self {
        Self { tag, payload }
    }

    pub fn encoded_len(&self) -> usize {
        encoded_len(self.tag, self.payload.len())
    }

    pub fn write(&self, writer: &mut dyn BitWrite) {
        write_envelope(writer, self.tag, &self.payload);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BitWriter::with_capacity(self.encoded_len());
        self.write(&mut writer);
        writer.to_bytes()
    }

    /// Decodes exactly one envelope spanning all of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let mut reader = EnvelopeReader::new(bytes);
        let envelope = match reader.next() {
            Some(result) => result?.to_envelope(),
            None => {
                return Err(EnvelopeError::MalformedMessage {
                    offset: 0,
                    reason: "empty buffer",
                })
            }
        };
        if reader.offset() != bytes.len() {
            return Err(EnvelopeError::MalformedMessage {
                offset: reader.offset(),
                reason: "bytes remain after the envelope",
            });
        }
        Ok(envelope)
    }
}

pub fn write_envelope(writer: &mut dyn BitWrite, tag: MessageTag, payload: &[u8]) {
    write_varint(writer, u64::from(tag));
    write_varint(writer, payload.len() as u64);
    writer.write_bytes(payload);
}

pub fn encoded_len(tag: MessageTag, payload_len: usize) -> usize {
    varint_len(u64::from(tag)) + varint_len(payload_len as u64) + payload_len
}

/// Iterates the envelopes of a batch. Stops after the first framing error,
/// since the next envelope boundary is unknown from then on.
pub struct EnvelopeReader<'a> {
    reader: BitReader<'a>,
    failed: bool,
}

impl<'a> EnvelopeReader<'a> {
    pub fn new(batch: &'a [u8]) -> Self {
        Self {
            reader: BitReader::new(batch),
            failed: false,
        }
    }

    /// Byte offset of the next envelope.
    pub fn offset(&self) -> usize {
        self.reader.bit_position() / 8
    }

    fn read_envelope(&mut self) -> Result<RawEnvelope<'a>, EnvelopeError> {
        let offset = self.offset();
        let malformed = |reason| EnvelopeError::MalformedMessage { offset, reason };

        let tag = read_varint(&mut self.reader).map_err(|_| malformed("truncated type tag"))?;
        let tag = MessageTag::try_from(tag).map_err(|_| malformed("type tag out of range"))?;
        let len = read_varint(&mut self.reader).map_err(|_| malformed("truncated length"))?;
        let len = usize::try_from(len).map_err(|_| malformed("length out of range"))?;
        let payload = self
            .reader
            .read_slice(len)
            .map_err(|_| malformed("declared length exceeds the remaining bytes"))?;
        Ok(RawEnvelope { tag, payload })
    }
}

impl<'a> Iterator for EnvelopeReader<'a> {
    type Item = Result<RawEnvelope<'a>, EnvelopeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.reader.is_exhausted() {
            return None;
        }
        let result = self.read_envelope();
        self.failed = result.is_err();
        Some(result)
    }
}
