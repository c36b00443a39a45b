//! Typed message bodies.
//!
//! Serialization always emits the envelope first. Deserializers take the
//! already-parsed header, since the body layout of publish, confirm_req,
//! and confirm_ack depends on the header's block-type bits.

use crate::header::{MessageHeader, MessageType};
use ferrite_types::{
    Account, Amount, Block, BlockHash, BufReader, NetworkParams, Signature, Vote, WireError,
    WriteExt,
};
use std::net::Ipv6Addr;

/// Peer advertisement: always eight slots, unused ones zeroed. IPv4 peers
/// travel as v4-mapped IPv6 addresses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keepalive {
    pub header: MessageHeader,
    pub peers: [(Ipv6Addr, u16); 8],
}

impl Keepalive {
    pub const PEER_COUNT: usize = 8;

    pub fn new(params: &NetworkParams) -> Self {
        Self {
            header: MessageHeader::new(params, MessageType::Keepalive),
            peers: [(Ipv6Addr::UNSPECIFIED, 0); 8],
        }
    }

    pub fn serialize(&self, buf: &mut Vec<u8>) {
        self.header.serialize(buf);
        for (address, port) in &self.peers {
            buf.put_bytes(&address.octets());
            buf.put_u16_be(*port);
        }
    }

    pub fn deserialize(reader: &mut BufReader<'_>, header: MessageHeader) -> Result<Self, WireError> {
        let mut peers = [(Ipv6Addr::UNSPECIFIED, 0u16); 8];
        for slot in &mut peers {
            let octets: [u8; 16] = reader.read_array()?;
            let port = reader.read_u16_be()?;
            *slot = (Ipv6Addr::from(octets), port);
        }
        Ok(Self { header, peers })
    }
}

/// Gossip of a single block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Publish {
    pub header: MessageHeader,
    pub block: Block,
}

impl Publish {
    pub fn new(params: &NetworkParams, block: Block) -> Self {
        let mut header = MessageHeader::new(params, MessageType::Publish);
        header.set_block_type(block.block_type());
        Self { header, block }
    }

    pub fn serialize(&self, buf: &mut Vec<u8>) {
        self.header.serialize(buf);
        self.block.serialize(buf);
    }

    pub fn deserialize(reader: &mut BufReader<'_>, header: MessageHeader) -> Result<Self, WireError> {
        let block = Block::deserialize(reader, header.block_type())?;
        Ok(Self { header, block })
    }
}

/// Ask representatives to vote on a block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmReq {
    pub header: MessageHeader,
    pub block: Block,
}

impl ConfirmReq {
    pub fn new(params: &NetworkParams, block: Block) -> Self {
        let mut header = MessageHeader::new(params, MessageType::ConfirmReq);
        header.set_block_type(block.block_type());
        Self { header, block }
    }

    pub fn serialize(&self, buf: &mut Vec<u8>) {
        self.header.serialize(buf);
        self.block.serialize(buf);
    }

    pub fn deserialize(reader: &mut BufReader<'_>, header: MessageHeader) -> Result<Self, WireError> {
        let block = Block::deserialize(reader, header.block_type())?;
        Ok(Self { header, block })
    }
}

/// A representative's vote. The payload is either one full block or a hash
/// list signalled by the `not_a_block` type in the envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmAck {
    pub header: MessageHeader,
    pub vote: Vote,
}

impl ConfirmAck {
    pub fn new(params: &NetworkParams, vote: Vote) -> Self {
        let mut header = MessageHeader::new(params, MessageType::ConfirmAck);
        header.set_block_type(vote.wire_block_type());
        Self { header, vote }
    }

    pub fn serialize(&self, buf: &mut Vec<u8>) {
        self.header.serialize(buf);
        self.vote.serialize(buf);
    }

    pub fn deserialize(reader: &mut BufReader<'_>, header: MessageHeader) -> Result<Self, WireError> {
        let vote = Vote::deserialize(reader, header.block_type())?;
        Ok(Self { header, vote })
    }
}

/// Request a range of blocks from one account chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkPull {
    pub header: MessageHeader,
    pub start: BlockHash,
    pub end: BlockHash,
    /// Optional cap on returned blocks; little-endian on the wire.
    pub count: Option<u32>,
}

impl BulkPull {
    pub fn new(params: &NetworkParams, start: BlockHash, end: BlockHash, count: Option<u32>) -> Self {
        let mut header = MessageHeader::new(params, MessageType::BulkPull);
        header.set_bulk_pull_count_present(count.is_some());
        Self {
            header,
            start,
            end,
            count,
        }
    }

    pub fn serialize(&self, buf: &mut Vec<u8>) {
        self.header.serialize(buf);
        buf.put_bytes(self.start.as_bytes());
        buf.put_bytes(self.end.as_bytes());
        if let Some(count) = self.count {
            buf.put_u8(0);
            buf.put_u32_le(count);
        }
    }

    pub fn deserialize(reader: &mut BufReader<'_>, header: MessageHeader) -> Result<Self, WireError> {
        let start = BlockHash::new(reader.read_array()?);
        let end = BlockHash::new(reader.read_array()?);
        let count = if header.bulk_pull_count_present() {
            if reader.read_u8()? != 0 {
                return Err(WireError);
            }
            Some(reader.read_u32_le()?)
        } else {
            None
        };
        Ok(Self {
            header,
            start,
            end,
            count,
        })
    }
}

/// Request the pending entries of one account above a minimum amount.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkPullAccount {
    pub header: MessageHeader,
    pub account: Account,
    pub minimum_amount: Amount,
    pub flags: u8,
}

impl BulkPullAccount {
    pub fn new(params: &NetworkParams, account: Account, minimum_amount: Amount, flags: u8) -> Self {
        Self {
            header: MessageHeader::new(params, MessageType::BulkPullAccount),
            account,
            minimum_amount,
            flags,
        }
    }

    pub fn serialize(&self, buf: &mut Vec<u8>) {
        self.header.serialize(buf);
        buf.put_bytes(self.account.as_bytes());
        buf.put_bytes(&self.minimum_amount.to_be_bytes());
        buf.put_u8(self.flags);
    }

    pub fn deserialize(reader: &mut BufReader<'_>, header: MessageHeader) -> Result<Self, WireError> {
        Ok(Self {
            header,
            account: Account::new(reader.read_array()?),
            minimum_amount: Amount::from_be_bytes(reader.read_array()?),
            flags: reader.read_u8()?,
        })
    }
}

/// Legacy ranged block pull.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkPullBlocks {
    pub header: MessageHeader,
    pub min_hash: BlockHash,
    pub max_hash: BlockHash,
    pub mode: u8,
    pub max_count: u32,
}

impl BulkPullBlocks {
    pub fn new(params: &NetworkParams, min_hash: BlockHash, max_hash: BlockHash, mode: u8, max_count: u32) -> Self {
        Self {
            header: MessageHeader::new(params, MessageType::BulkPullBlocks),
            min_hash,
            max_hash,
            mode,
            max_count,
        }
    }

    pub fn serialize(&self, buf: &mut Vec<u8>) {
        self.header.serialize(buf);
        buf.put_bytes(self.min_hash.as_bytes());
        buf.put_bytes(self.max_hash.as_bytes());
        buf.put_u8(self.mode);
        buf.put_u32_be(self.max_count);
    }

    pub fn deserialize(reader: &mut BufReader<'_>, header: MessageHeader) -> Result<Self, WireError> {
        Ok(Self {
            header,
            min_hash: BlockHash::new(reader.read_array()?),
            max_hash: BlockHash::new(reader.read_array()?),
            mode: reader.read_u8()?,
            max_count: reader.read_u32_be()?,
        })
    }
}

/// Ask a peer to stream account frontiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrontierReq {
    pub header: MessageHeader,
    pub start: Account,
    pub age: u32,
    pub count: u32,
}

impl FrontierReq {
    pub fn new(params: &NetworkParams, start: Account, age: u32, count: u32) -> Self {
        Self {
            header: MessageHeader::new(params, MessageType::FrontierReq),
            start,
            age,
            count,
        }
    }

    pub fn serialize(&self, buf: &mut Vec<u8>) {
        self.header.serialize(buf);
        buf.put_bytes(self.start.as_bytes());
        buf.put_u32_be(self.age);
        buf.put_u32_be(self.count);
    }

    pub fn deserialize(reader: &mut BufReader<'_>, header: MessageHeader) -> Result<Self, WireError> {
        Ok(Self {
            header,
            start: Account::new(reader.read_array()?),
            age: reader.read_u32_be()?,
            count: reader.read_u32_be()?,
        })
    }
}

/// Header-only marker opening a block upload stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkPush {
    pub header: MessageHeader,
}

impl BulkPush {
    pub fn new(params: &NetworkParams) -> Self {
        Self {
            header: MessageHeader::new(params, MessageType::BulkPush),
        }
    }

    pub fn serialize(&self, buf: &mut Vec<u8>) {
        self.header.serialize(buf);
    }
}

/// Identity challenge/response. The query is an opaque 32-byte cookie; the
/// response proves ownership of the claimed node account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeIdHandshake {
    pub header: MessageHeader,
    pub query: Option<[u8; 32]>,
    pub response: Option<(Account, Signature)>,
}

impl NodeIdHandshake {
    pub fn new(
        params: &NetworkParams,
        query: Option<[u8; 32]>,
        response: Option<(Account, Signature)>,
    ) -> Self {
        let mut header = MessageHeader::new(params, MessageType::NodeIdHandshake);
        header.set_handshake_query(query.is_some());
        header.set_handshake_response(response.is_some());
        Self {
            header,
            query,
            response,
        }
    }

    pub fn serialize(&self, buf: &mut Vec<u8>) {
        self.header.serialize(buf);
        if let Some(query) = &self.query {
            buf.put_bytes(query);
        }
        if let Some((account, signature)) = &self.response {
            buf.put_bytes(account.as_bytes());
            buf.put_bytes(signature.as_bytes());
        }
    }

    pub fn deserialize(reader: &mut BufReader<'_>, header: MessageHeader) -> Result<Self, WireError> {
        let query = if header.handshake_query() {
            Some(reader.read_array()?)
        } else {
            None
        };
        let response = if header.handshake_response() {
            let account = Account::new(reader.read_array()?);
            let signature = Signature(reader.read_array()?);
            Some((account, signature))
        } else {
            None
        };
        Ok(Self {
            header,
            query,
            response,
        })
    }
}
