#![no_main]

use ferrite_types::{BlockType, BufReader, Vote};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    // First byte selects the payload kind the envelope would carry.
    let kind = BlockType::from_u8(data[0] % 7).unwrap_or(BlockType::NotABlock);
    if let Ok(vote) = Vote::deserialize(&mut BufReader::new(&data[1..]), kind) {
        let mut out = Vec::new();
        vote.serialize(&mut out);
        let _ = vote.hash();
        let _ = vote.full_hash();
    }
});
