#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Headers may claim any length; the overrun guard must end the pass
    let _ = ari_stream::decompress(data);
    let _ = ari_stream::decompress_blocks(data);
});
