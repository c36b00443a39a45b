#![no_main]

use ferrite_messages::{MessageParser, MessageVisitor};
use ferrite_types::{NetworkParams, Networks};
use libfuzzer_sys::fuzz_target;

struct NullVisitor;

impl MessageVisitor for NullVisitor {}

fuzz_target!(|data: &[u8]| {
    // Arbitrary datagrams must never panic the parser; the worst outcome
    // is a parse status.
    let params = NetworkParams::new(Networks::Test);
    let mut parser = MessageParser::new(&params);
    parser.deserialize_buffer(data, &mut NullVisitor);
});
