use proptest::prelude::*;

use btx_primitives::util::{TxReader, TxWriter, VarInt};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn varint_roundtrip(value in any::<u64>()) {
        let bytes = VarInt(value).to_bytes();
        prop_assert_eq!(bytes.len(), VarInt(value).length());

        let mut reader = TxReader::new(&bytes);
        prop_assert_eq!(reader.read_varint().unwrap().value(), value);
        prop_assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn writer_reader_roundtrip(
        a in any::<u32>(),
        b in any::<u64>(),
        c in any::<i64>(),
        data in prop::collection::vec(any::<u8>(), 0..128),
    ) {
        let mut writer = TxWriter::new();
        writer.write_u32_le(a);
        writer.write_u64_le(b);
        writer.write_i64_le(c);
        writer.write_var_bytes(&data);
        let bytes = writer.into_bytes();

        let mut reader = TxReader::new(&bytes);
        prop_assert_eq!(reader.read_u32_le().unwrap(), a);
        prop_assert_eq!(reader.read_u64_le().unwrap(), b);
        prop_assert_eq!(reader.read_i64_le().unwrap(), c);
        prop_assert_eq!(reader.read_var_bytes().unwrap(), &data[..]);
        prop_assert_eq!(reader.remaining(), 0);
    }
}
