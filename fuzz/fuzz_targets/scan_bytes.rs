#![no_main]
use bonjson::{DecodeFlags, Map};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = Map::scan(data, DecodeFlags::default());
});
