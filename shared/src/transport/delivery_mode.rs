use tether_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedInteger};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeliveryMode {
    Unreliable,
    UnreliableSequenced,
    Reliable,
    ReliableSequenced,
    ReliableFragmentedSequenced,
}

impl DeliveryMode {
    pub const ALL: [DeliveryMode; 5] = [
        DeliveryMode::Unreliable,
        DeliveryMode::UnreliableSequenced,
        DeliveryMode::Reliable,
        DeliveryMode::ReliableSequenced,
        DeliveryMode::ReliableFragmentedSequenced,
    ];

    pub fn is_reliable(&self) -> bool {
        matches!(
            self,
            DeliveryMode::Reliable
                | DeliveryMode::ReliableSequenced
                | DeliveryMode::ReliableFragmentedSequenced
        )
    }

    pub fn is_sequenced(&self) -> bool {
        matches!(
            self,
            DeliveryMode::UnreliableSequenced
                | DeliveryMode::ReliableSequenced
                | DeliveryMode::ReliableFragmentedSequenced
        )
    }

    pub fn is_fragmented(&self) -> bool {
        *self == DeliveryMode::ReliableFragmentedSequenced
    }

    fn index(&self) -> u8 {
        match self {
            DeliveryMode::Unreliable => 0,
            DeliveryMode::UnreliableSequenced => 1,
            DeliveryMode::Reliable => 2,
            DeliveryMode::ReliableSequenced => 3,
            DeliveryMode::ReliableFragmentedSequenced => 4,
        }
    }
}

impl Serde for DeliveryMode {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedInteger::<3>::new(self.index()).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let index = UnsignedInteger::<3>::de(reader)?.get();
        Self::ALL
            .get(usize::try_from(index).map_err(|_| SerdeErr)?)
            .copied()
            .ok_or(SerdeErr)
    }

    fn bit_length(&self) -> u32 {
        3
    }
}
