//! The 8-byte message envelope.

use ferrite_types::{BlockType, BufReader, NetworkParams, Networks, WireError, WriteExt};
use thiserror::Error;

/// Wire tags. Stable values; never renumber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    Keepalive = 2,
    Publish = 3,
    ConfirmReq = 4,
    ConfirmAck = 5,
    BulkPull = 6,
    BulkPush = 7,
    FrontierReq = 8,
    BulkPullBlocks = 9,
    NodeIdHandshake = 10,
    BulkPullAccount = 11,
}

impl MessageType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            2 => Some(MessageType::Keepalive),
            3 => Some(MessageType::Publish),
            4 => Some(MessageType::ConfirmReq),
            5 => Some(MessageType::ConfirmAck),
            6 => Some(MessageType::BulkPull),
            7 => Some(MessageType::BulkPush),
            8 => Some(MessageType::FrontierReq),
            9 => Some(MessageType::BulkPullBlocks),
            10 => Some(MessageType::NodeIdHandshake),
            11 => Some(MessageType::BulkPullAccount),
            _ => None,
        }
    }
}

/// Why a header failed to parse, each mapping to a distinct parse status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum HeaderParseError {
    #[error("header truncated")]
    Truncated,
    #[error("magic bytes are not a recognized envelope")]
    InvalidMagic,
    #[error("message is for a different network")]
    InvalidNetwork,
    #[error("unknown message type tag")]
    InvalidMessageType,
    #[error("peer protocol version is below the supported minimum")]
    OutdatedVersion,
}

/// `{ magic[2], version_max, version_using, version_min, type, extensions }`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageHeader {
    pub magic: [u8; 2],
    pub version_max: u8,
    pub version_using: u8,
    pub version_min: u8,
    pub message_type: MessageType,
    pub extensions: u16,
}

/// Bits 8–11 of extensions carry the block type for publish/confirm_req/
/// confirm_ack.
const BLOCK_TYPE_MASK: u16 = 0x0f00;
/// Bit 0 of bulk_pull extensions: a count follows the range.
const BULK_PULL_COUNT_PRESENT: u16 = 0x0001;
/// Bits 0–1 of node_id_handshake extensions.
const HANDSHAKE_QUERY: u16 = 0x0001;
const HANDSHAKE_RESPONSE: u16 = 0x0002;

impl MessageHeader {
    pub const SERIALIZED_SIZE: usize = 8;

    pub fn new(params: &NetworkParams, message_type: MessageType) -> Self {
        Self {
            magic: params.network.magic(),
            version_max: params.protocol_version,
            version_using: params.protocol_version,
            version_min: params.protocol_version_min,
            message_type,
            extensions: 0,
        }
    }

    pub fn serialize(&self, buf: &mut Vec<u8>) {
        buf.put_bytes(&self.magic);
        buf.put_u8(self.version_max);
        buf.put_u8(self.version_using);
        buf.put_u8(self.version_min);
        buf.put_u8(self.message_type.as_u8());
        buf.put_u16_be(self.extensions);
    }

    /// Parse and validate against the local network and minimum version.
    pub fn deserialize(
        reader: &mut BufReader<'_>,
        params: &NetworkParams,
    ) -> Result<Self, HeaderParseError> {
        let raw: [u8; 8] = reader.read_array().map_err(|_: WireError| HeaderParseError::Truncated)?;
        let magic = [raw[0], raw[1]];
        let network = Networks::from_magic(magic).ok_or(HeaderParseError::InvalidMagic)?;
        if network != params.network {
            return Err(HeaderParseError::InvalidNetwork);
        }
        let version_max = raw[2];
        let version_using = raw[3];
        let version_min = raw[4];
        if version_using < params.protocol_version_min {
            return Err(HeaderParseError::OutdatedVersion);
        }
        let message_type =
            MessageType::from_u8(raw[5]).ok_or(HeaderParseError::InvalidMessageType)?;
        let extensions = u16::from_be_bytes([raw[6], raw[7]]);
        Ok(Self {
            magic,
            version_max,
            version_using,
            version_min,
            message_type,
            extensions,
        })
    }

    pub fn block_type(&self) -> BlockType {
        BlockType::from_u8(((self.extensions & BLOCK_TYPE_MASK) >> 8) as u8)
            .unwrap_or(BlockType::Invalid)
    }

    pub fn set_block_type(&mut self, block_type: BlockType) {
        self.extensions &= !BLOCK_TYPE_MASK;
        self.extensions |= (block_type.as_u8() as u16) << 8;
    }

    pub fn bulk_pull_count_present(&self) -> bool {
        self.message_type == MessageType::BulkPull && self.extensions & BULK_PULL_COUNT_PRESENT != 0
    }

    pub fn set_bulk_pull_count_present(&mut self, present: bool) {
        if present {
            self.extensions |= BULK_PULL_COUNT_PRESENT;
        } else {
            self.extensions &= !BULK_PULL_COUNT_PRESENT;
        }
    }

    pub fn handshake_query(&self) -> bool {
        self.extensions & HANDSHAKE_QUERY != 0
    }

    pub fn handshake_response(&self) -> bool {
        self.extensions & HANDSHAKE_RESPONSE != 0
    }

    pub fn set_handshake_query(&mut self, on: bool) {
        if on {
            self.extensions |= HANDSHAKE_QUERY;
        } else {
            self.extensions &= !HANDSHAKE_QUERY;
        }
    }

    pub fn set_handshake_response(&mut self, on: bool) {
        if on {
            self.extensions |= HANDSHAKE_RESPONSE;
        } else {
            self.extensions &= !HANDSHAKE_RESPONSE;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> NetworkParams {
        NetworkParams::new(Networks::Test)
    }

    #[test]
    fn roundtrip() {
        let mut header = MessageHeader::new(&params(), MessageType::Publish);
        header.set_block_type(BlockType::State);
        let mut buf = Vec::new();
        header.serialize(&mut buf);
        assert_eq!(buf.len(), MessageHeader::SERIALIZED_SIZE);

        let decoded = MessageHeader::deserialize(&mut BufReader::new(&buf), &params()).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.block_type(), BlockType::State);
    }

    #[test]
    fn wrong_magic_and_network() {
        let mut buf = Vec::new();
        MessageHeader::new(&params(), MessageType::Keepalive).serialize(&mut buf);

        let mut bad_magic = buf.clone();
        bad_magic[0] = b'S';
        assert_eq!(
            MessageHeader::deserialize(&mut BufReader::new(&bad_magic), &params()),
            Err(HeaderParseError::InvalidMagic)
        );

        // Beta traffic on a test node.
        let mut other_network = buf.clone();
        other_network[1] = b'B';
        assert_eq!(
            MessageHeader::deserialize(&mut BufReader::new(&other_network), &params()),
            Err(HeaderParseError::InvalidNetwork)
        );
    }

    #[test]
    fn outdated_version_rejected() {
        let mut buf = Vec::new();
        let mut header = MessageHeader::new(&params(), MessageType::Keepalive);
        header.version_using = params().protocol_version_min - 1;
        header.serialize(&mut buf);
        assert_eq!(
            MessageHeader::deserialize(&mut BufReader::new(&buf), &params()),
            Err(HeaderParseError::OutdatedVersion)
        );
    }

    #[test]
    fn unknown_type_rejected() {
        let mut buf = Vec::new();
        MessageHeader::new(&params(), MessageType::Keepalive).serialize(&mut buf);
        buf[5] = 99;
        assert_eq!(
            MessageHeader::deserialize(&mut BufReader::new(&buf), &params()),
            Err(HeaderParseError::InvalidMessageType)
        );
    }

    #[test]
    fn handshake_flags() {
        let mut header = MessageHeader::new(&params(), MessageType::NodeIdHandshake);
        assert!(!header.handshake_query() && !header.handshake_response());
        header.set_handshake_query(true);
        header.set_handshake_response(true);
        assert!(header.handshake_query() && header.handshake_response());
        header.set_handshake_query(false);
        assert!(!header.handshake_query() && header.handshake_response());
    }
}
