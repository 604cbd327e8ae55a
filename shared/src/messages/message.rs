use tether_serde::{BitReader, BitWrite, BitWriter};

use crate::messages::{context::NetworkContext, error::ReceiveError};

/// A message type that can be registered with the
/// [`Protocol`](crate::Protocol).
///
/// `deserialize` receives the dispatch context so it can report a missing
/// dependency with [`ReceiveError::TargetNotFound`], which defers the message
/// instead of dropping it.
pub trait NetworkMessage: Sized + 'static {
    const NAME: &'static str;

    /// Bumped when the payload layout changes.
    const VERSION: u8 = 0;

    fn serialize(&self, writer: &mut dyn BitWrite);

    fn deserialize(
        reader: &mut BitReader,
        context: &mut NetworkContext,
    ) -> Result<Self, ReceiveError>;

    fn to_payload(&self) -> Vec<u8> {
        let mut writer = BitWriter::new();
        self.serialize(&mut writer);
        writer.to_bytes()
    }
}
