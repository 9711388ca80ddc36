#![no_main]
use ari_stream::{
    decode_symbol, BinaryContextModel, ContextTrieModel, ModelConfig, RangeDecoder, SliceSource,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // Byte 0: max_order (-1..=4), byte 1: number of values to decode
    let max_order = i32::from(data[0] % 6) - 1;
    let count = usize::from(data[1]) * 4;
    let stream = &data[2..];

    let Ok(mut symbols) = ContextTrieModel::new(ModelConfig::new(64, 64, max_order, 200)) else {
        return;
    };
    let Ok(mut flags) = BinaryContextModel::new(64, max_order, 60) else {
        return;
    };
    let mut decoder = RangeDecoder::new(SliceSource::new(stream));
    for _ in 0..count {
        let Ok(value) = decode_symbol(&mut decoder, &mut symbols) else {
            return;
        };
        assert!(value < 64);
        let Ok(bit) = decode_symbol(&mut decoder, &mut flags) else {
            return;
        };
        assert!(bit < 2);
        symbols.shift_context(value).expect("decoded value is a valid context");
        flags.shift_context(value).expect("decoded value is a valid context");
    }
});
