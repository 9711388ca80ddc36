#![no_main]
use ari_stream::CodecOptions;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    // Byte 0: max_order (-1..=4)
    // Bytes 1-2: rescale threshold (2..)
    // Byte 3: flush interval
    let options = CodecOptions {
        max_order: (data[0] % 6) as i8 - 1,
        rescale_threshold: u16::from_le_bytes([data[1], data[2]]).max(2),
        flush_interval: u32::from(data[3]),
    };
    let input = &data[4..];

    let packed = ari_stream::compress(input, &options).expect("valid options");
    let unpacked = ari_stream::decompress(&packed).expect("own stream decodes");
    assert_eq!(unpacked, input);

    let packed = ari_stream::compress_blocks(input, 97, &options).expect("valid options");
    let unpacked = ari_stream::decompress_blocks(&packed).expect("own blocks decode");
    assert_eq!(unpacked, input);
});
