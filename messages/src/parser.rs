//! Datagram parsing and dispatch.
//!
//! The parser validates the envelope, decodes the body, checks the
//! proof-of-work of any carried block, and only then hands the message to
//! the visitor. Any failure sets a parse status and suppresses dispatch.

use crate::header::{HeaderParseError, MessageHeader, MessageType};
use crate::messages::{ConfirmAck, ConfirmReq, Keepalive, NodeIdHandshake, Publish};
use ferrite_types::{BufReader, NetworkParams, VoteBlock};
use ferrite_work::work_validate;

/// MTU minus IP and UDP headers; anything larger travels over the
/// connected bootstrap stream.
pub const MAX_SAFE_UDP_MESSAGE_SIZE: usize = 508;

/// Outcome of a parse attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseStatus {
    Success,
    InsufficientWork,
    InvalidHeader,
    InvalidMessageType,
    InvalidKeepalive,
    InvalidPublish,
    InvalidConfirmReq,
    InvalidConfirmAck,
    InvalidNodeIdHandshake,
    OutdatedVersion,
    InvalidMagic,
    InvalidNetwork,
}

/// Receiver of successfully parsed datagram messages.
pub trait MessageVisitor {
    fn keepalive(&mut self, message: &Keepalive) {
        let _ = message;
    }
    fn publish(&mut self, message: &Publish) {
        let _ = message;
    }
    fn confirm_req(&mut self, message: &ConfirmReq) {
        let _ = message;
    }
    fn confirm_ack(&mut self, message: &ConfirmAck) {
        let _ = message;
    }
    fn node_id_handshake(&mut self, message: &NodeIdHandshake) {
        let _ = message;
    }
}

pub struct MessageParser<'a> {
    params: &'a NetworkParams,
    pub status: ParseStatus,
}

impl<'a> MessageParser<'a> {
    pub fn new(params: &'a NetworkParams) -> Self {
        Self {
            params,
            status: ParseStatus::Success,
        }
    }

    /// Parse one datagram and dispatch it into `visitor`. The status is
    /// left at `Success` only if the visitor ran.
    pub fn deserialize_buffer(&mut self, bytes: &[u8], visitor: &mut dyn MessageVisitor) {
        self.status = ParseStatus::Success;
        if bytes.len() > MAX_SAFE_UDP_MESSAGE_SIZE {
            self.status = ParseStatus::InvalidHeader;
            return;
        }
        let mut reader = BufReader::new(bytes);
        let header = match MessageHeader::deserialize(&mut reader, self.params) {
            Ok(header) => header,
            Err(error) => {
                self.status = match error {
                    HeaderParseError::Truncated => ParseStatus::InvalidHeader,
                    HeaderParseError::InvalidMagic => ParseStatus::InvalidMagic,
                    HeaderParseError::InvalidNetwork => ParseStatus::InvalidNetwork,
                    HeaderParseError::InvalidMessageType => ParseStatus::InvalidMessageType,
                    HeaderParseError::OutdatedVersion => ParseStatus::OutdatedVersion,
                };
                return;
            }
        };

        match header.message_type {
            MessageType::Keepalive => match Keepalive::deserialize(&mut reader, header) {
                Ok(message) if reader.is_empty() => visitor.keepalive(&message),
                _ => self.status = ParseStatus::InvalidKeepalive,
            },
            MessageType::Publish => match Publish::deserialize(&mut reader, header) {
                Ok(message) if reader.is_empty() => {
                    if self.work_ok(&message.block) {
                        visitor.publish(&message);
                    } else {
                        self.status = ParseStatus::InsufficientWork;
                    }
                }
                _ => self.status = ParseStatus::InvalidPublish,
            },
            MessageType::ConfirmReq => match ConfirmReq::deserialize(&mut reader, header) {
                Ok(message) if reader.is_empty() => {
                    if self.work_ok(&message.block) {
                        visitor.confirm_req(&message);
                    } else {
                        self.status = ParseStatus::InsufficientWork;
                    }
                }
                _ => self.status = ParseStatus::InvalidConfirmReq,
            },
            MessageType::ConfirmAck => match ConfirmAck::deserialize(&mut reader, header) {
                Ok(message) if reader.is_empty() => {
                    let carried_block_clears = message.vote.blocks.iter().all(|entry| match entry {
                        VoteBlock::Block(block) => self.work_ok(block),
                        VoteBlock::Hash(_) => true,
                    });
                    if carried_block_clears {
                        visitor.confirm_ack(&message);
                    } else {
                        self.status = ParseStatus::InsufficientWork;
                    }
                }
                _ => self.status = ParseStatus::InvalidConfirmAck,
            },
            MessageType::NodeIdHandshake => {
                match NodeIdHandshake::deserialize(&mut reader, header) {
                    Ok(message) if reader.is_empty() => visitor.node_id_handshake(&message),
                    _ => self.status = ParseStatus::InvalidNodeIdHandshake,
                }
            }
            // Stream-only message types never arrive as datagrams.
            MessageType::BulkPull
            | MessageType::BulkPush
            | MessageType::FrontierReq
            | MessageType::BulkPullBlocks
            | MessageType::BulkPullAccount => {
                self.status = ParseStatus::InvalidMessageType;
            }
        }
    }

    fn work_ok(&self, block: &ferrite_types::Block) -> bool {
        work_validate(&block.root(), block.work(), self.params.publish_threshold)
    }
}
