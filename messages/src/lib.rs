//! Node-to-node wire protocol.
//!
//! Every message starts with the 8-byte envelope: two magic bytes (`R` plus
//! the network discriminator), three protocol versions, the message type
//! tag, and a 16-bit extensions field. Bodies are fixed-layout big-endian
//! except the historically little-endian vote sequence and bulk-pull count.

pub mod header;
pub mod messages;
pub mod parser;

pub use header::{HeaderParseError, MessageHeader, MessageType};
pub use messages::{
    BulkPull, BulkPullAccount, BulkPullBlocks, ConfirmAck, ConfirmReq, FrontierReq, Keepalive,
    NodeIdHandshake, Publish,
};
pub use parser::{MessageParser, MessageVisitor, ParseStatus, MAX_SAFE_UDP_MESSAGE_SIZE};
