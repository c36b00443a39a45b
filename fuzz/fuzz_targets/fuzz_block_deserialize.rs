#![no_main]

use ferrite_types::{Block, BufReader};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Typed binary form: tag byte plus body.
    if let Ok(block) = Block::deserialize_typed(&mut BufReader::new(data)) {
        // Anything that decodes must re-encode to the same bytes it
        // consumed and hash stably.
        let mut out = Vec::new();
        block.serialize_typed(&mut out);
        assert_eq!(&out[..], &data[..out.len()]);
        let _ = block.hash();
        let _ = block.full_hash();
    }

    // JSON form.
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(block) = Block::from_json(text) {
            let reparsed = Block::from_json(&block.to_json()).unwrap();
            assert_eq!(reparsed, block);
        }
    }
});
