/// PROPERTY-BASED TESTS: wire format invariants
///
/// 1. A batch of envelopes splits back into the same envelopes, in order
/// 2. A struct delta applied to its baseline reproduces the new value
/// 3. A registered message survives a send through the outbox and dispatch
use proptest::prelude::*;
use tether_shared::{
    BitReader, BitWriter, ClientId, DeliveryMode, EnvelopeReader, Instant, MessageEnvelope,
    VariableValue,
};
use tether_test::{LocalNetwork, TestPeer};

fn envelope_strategy() -> impl Strategy<Value = MessageEnvelope> {
    (any::<u16>(), prop::collection::vec(any::<u8>(), 0..600))
        .prop_map(|(tag, payload)| MessageEnvelope::new(tag, payload))
}

fn position_strategy() -> impl Strategy<Value = VariableValue> {
    (-1000.0f32..1000.0, -1000.0f32..1000.0, any::<i64>(), ".{0,12}").prop_map(
        |(x, y, frame, label)| {
            VariableValue::Struct(vec![
                VariableValue::Float(x),
                VariableValue::Float(y),
                VariableValue::Integer(frame),
                VariableValue::Text(label),
            ])
        },
    )
}

proptest! {
    #[test]
    fn prop_batch_splits_into_its_envelopes(
        envelopes in prop::collection::vec(envelope_strategy(), 0..12),
    ) {
        let batch: Vec<u8> = envelopes.iter().flat_map(|envelope| envelope.to_bytes()).collect();
        prop_assert_eq!(
            batch.len(),
            envelopes.iter().map(|envelope| envelope.encoded_len()).sum::<usize>()
        );

        let decoded: Vec<MessageEnvelope> = EnvelopeReader::new(&batch)
            .map(|raw| raw.map(|raw| raw.to_envelope()))
            .collect::<Result<_, _>>()
            .unwrap();
        prop_assert_eq!(decoded, envelopes);
    }

    /// Truncating a batch never yields an envelope that was not sent.
    #[test]
    fn prop_truncated_batch_only_yields_prefix(
        envelopes in prop::collection::vec(envelope_strategy(), 1..6),
        cut in 1usize..64,
    ) {
        let batch: Vec<u8> = envelopes.iter().flat_map(|envelope| envelope.to_bytes()).collect();
        let keep = batch.len().saturating_sub(cut);

        let mut intact = Vec::new();
        let mut failed = false;
        for raw in EnvelopeReader::new(&batch[..keep]) {
            match raw {
                Ok(raw) => intact.push(raw.to_envelope()),
                Err(_) => failed = true,
            }
        }
        prop_assert!(intact.len() < envelopes.len());
        prop_assert_eq!(&intact[..], &envelopes[..intact.len()]);
        let ends_on_boundary = intact.iter().map(|e| e.encoded_len()).sum::<usize>() == keep;
        prop_assert_eq!(failed, !ends_on_boundary);
    }

    #[test]
    fn prop_struct_delta_rebuilds_value(
        baseline in position_strategy(),
        next in position_strategy(),
    ) {
        let mut writer = BitWriter::new();
        next.write_delta(&mut writer, &baseline);
        let bytes = writer.to_bytes();

        let mut reader = BitReader::new(&bytes);
        prop_assert_eq!(VariableValue::read_delta(&mut reader, &baseline).unwrap(), next);
    }

    #[test]
    fn prop_unchanged_struct_delta_is_tiny(value in position_strategy()) {
        let mut writer = BitWriter::new();
        value.write_delta(&mut writer, &value);
        // only the changed-field bitfield
        prop_assert_eq!(writer.to_bytes().len(), 1);
    }

    #[test]
    fn prop_chat_text_arrives_intact(texts in prop::collection::vec(".{0,80}", 1..8)) {
        let network = LocalNetwork::new();
        let mut server = TestPeer::server(&network);
        let mut client = TestPeer::client(&network, ClientId(5));
        let now = Instant::now();

        for text in &texts {
            client
                .manager
                .send(&tether_test::ChatMessage::new(text), ClientId::SERVER, DeliveryMode::Reliable)
                .unwrap();
        }
        client.flush();
        let summary = server.update(&now);

        prop_assert_eq!(summary.handled, texts.len());
        let expected: Vec<(ClientId, String)> =
            texts.into_iter().map(|text| (ClientId(5), text)).collect();
        prop_assert_eq!(server.chats(), expected);
    }
}
