//! The five block variants and their codecs.
//!
//! Every block carries a signature and a 64-bit proof-of-work nonce. The
//! typed binary form prefixes the body with a one-byte variant tag (used at
//! rest and when the envelope has no block-type field); the untyped form is
//! the bare body. The variant tags are stable wire values.
//!
//! `hash()` is blake2b-256 over the variant-specific fields; state blocks
//! prepend a 32-byte preamble equal to the variant tag so their hashes can
//! never collide with legacy variants.

use crate::account::Account;
use crate::amount::Amount;
use crate::hash::{blake2b_256_parts, BlockHash, Root};
use crate::keys::Signature;
use crate::wire::{BufReader, WireError, WriteExt};
use serde_json::{json, Value};
use thiserror::Error;

/// One-byte block variant tag. Stable wire values; never renumber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockType {
    Invalid = 0,
    NotABlock = 1,
    Send = 2,
    Receive = 3,
    Open = 4,
    Change = 5,
    State = 6,
}

impl BlockType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(BlockType::Invalid),
            1 => Some(BlockType::NotABlock),
            2 => Some(BlockType::Send),
            3 => Some(BlockType::Receive),
            4 => Some(BlockType::Open),
            5 => Some(BlockType::Change),
            6 => Some(BlockType::State),
            _ => None,
        }
    }

    /// Serialized body length (without the tag byte) for a real variant.
    pub fn serialized_size(self) -> usize {
        match self {
            BlockType::Send => 32 + 32 + 16 + 64 + 8,
            BlockType::Receive => 32 + 32 + 64 + 8,
            BlockType::Open => 32 + 32 + 32 + 64 + 8,
            BlockType::Change => 32 + 32 + 64 + 8,
            BlockType::State => 32 + 32 + 32 + 16 + 32 + 64 + 8,
            BlockType::Invalid | BlockType::NotABlock => 0,
        }
    }
}

/// A 32-byte field interpreted by context: a source block hash when
/// receiving, a destination account when sending, or an epoch sentinel.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Link(pub [u8; 32]);

impl Link {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_block_hash(&self) -> BlockHash {
        BlockHash::new(self.0)
    }

    pub fn as_account(&self) -> Account {
        Account::new(self.0)
    }

    pub fn encode_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02X}", b)).collect()
    }

    pub fn decode_hex(s: &str) -> Option<Self> {
        BlockHash::decode_hex(s).map(|h| Self(*h.as_bytes()))
    }
}

impl From<BlockHash> for Link {
    fn from(h: BlockHash) -> Self {
        Self(*h.as_bytes())
    }
}

impl From<Account> for Link {
    fn from(a: Account) -> Self {
        Self(*a.as_bytes())
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let head: String = self.0[..4].iter().map(|b| format!("{:02X}", b)).collect();
        write!(f, "Link({}…)", head)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendBlock {
    pub previous: BlockHash,
    pub destination: Account,
    pub balance: Amount,
    pub signature: Signature,
    pub work: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiveBlock {
    pub previous: BlockHash,
    pub source: BlockHash,
    pub signature: Signature,
    pub work: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenBlock {
    pub source: BlockHash,
    pub representative: Account,
    pub account: Account,
    pub signature: Signature,
    pub work: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeBlock {
    pub previous: BlockHash,
    pub representative: Account,
    pub signature: Signature,
    pub work: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateBlock {
    pub account: Account,
    pub previous: BlockHash,
    pub representative: Account,
    pub balance: Amount,
    pub link: Link,
    pub signature: Signature,
    pub work: u64,
}

/// A block, polymorphic over the five variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Send(SendBlock),
    Receive(ReceiveBlock),
    Open(OpenBlock),
    Change(ChangeBlock),
    State(StateBlock),
}

/// Errors from the JSON block codec.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BlockJsonError {
    #[error("document is not valid JSON")]
    Malformed,
    #[error("unknown block type string")]
    UnknownType,
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("invalid field {0}")]
    InvalidField(&'static str),
}

/// Whether a block of type `candidate` may directly follow a block of type
/// `previous` on the same chain. Legacy variants may never follow a state
/// block; state blocks may follow anything.
pub fn valid_predecessor(previous: BlockType, candidate: BlockType) -> bool {
    match candidate {
        BlockType::Send | BlockType::Receive | BlockType::Change => matches!(
            previous,
            BlockType::Send | BlockType::Receive | BlockType::Open | BlockType::Change
        ),
        BlockType::State => matches!(
            previous,
            BlockType::Send
                | BlockType::Receive
                | BlockType::Open
                | BlockType::Change
                | BlockType::State
        ),
        // Opens have no predecessor.
        BlockType::Open | BlockType::Invalid | BlockType::NotABlock => false,
    }
}

impl Block {
    pub fn block_type(&self) -> BlockType {
        match self {
            Block::Send(_) => BlockType::Send,
            Block::Receive(_) => BlockType::Receive,
            Block::Open(_) => BlockType::Open,
            Block::Change(_) => BlockType::Change,
            Block::State(_) => BlockType::State,
        }
    }

    /// blake2b-256 over the variant-specific fields.
    pub fn hash(&self) -> BlockHash {
        let digest = match self {
            Block::Send(b) => blake2b_256_parts(&[
                b.previous.as_bytes(),
                b.destination.as_bytes(),
                &b.balance.to_be_bytes(),
            ]),
            Block::Receive(b) => {
                blake2b_256_parts(&[b.previous.as_bytes(), b.source.as_bytes()])
            }
            Block::Open(b) => blake2b_256_parts(&[
                b.source.as_bytes(),
                b.representative.as_bytes(),
                b.account.as_bytes(),
            ]),
            Block::Change(b) => {
                blake2b_256_parts(&[b.previous.as_bytes(), b.representative.as_bytes()])
            }
            Block::State(b) => {
                let mut preamble = [0u8; 32];
                preamble[31] = BlockType::State.as_u8();
                blake2b_256_parts(&[
                    &preamble,
                    b.account.as_bytes(),
                    b.previous.as_bytes(),
                    b.representative.as_bytes(),
                    &b.balance.to_be_bytes(),
                    b.link.as_bytes(),
                ])
            }
        };
        BlockHash::new(digest)
    }

    /// Identity over content, signature, and work. Interning key for the
    /// block uniquer, where the same hashables with different work must not
    /// collapse.
    pub fn full_hash(&self) -> BlockHash {
        let digest = blake2b_256_parts(&[
            self.hash().as_bytes(),
            self.signature().as_bytes(),
            &self.work().to_le_bytes(),
        ]);
        BlockHash::new(digest)
    }

    /// Hash of the preceding block on this chain; zero for opens.
    pub fn previous(&self) -> BlockHash {
        match self {
            Block::Send(b) => b.previous,
            Block::Receive(b) => b.previous,
            Block::Open(_) => BlockHash::ZERO,
            Block::Change(b) => b.previous,
            Block::State(b) => b.previous,
        }
    }

    /// The election/work key: `previous` when set, otherwise the account.
    pub fn root(&self) -> Root {
        match self {
            Block::Open(b) => BlockHash::new(*b.account.as_bytes()),
            Block::State(b) if b.previous.is_zero() => {
                BlockHash::new(*b.account.as_bytes())
            }
            other => other.previous(),
        }
    }

    /// Source block hash for receive and open blocks.
    pub fn source(&self) -> Option<BlockHash> {
        match self {
            Block::Receive(b) => Some(b.source),
            Block::Open(b) => Some(b.source),
            _ => None,
        }
    }

    /// The state-block link field; zero for legacy variants.
    pub fn link(&self) -> Link {
        match self {
            Block::State(b) => b.link,
            _ => Link::ZERO,
        }
    }

    pub fn destination(&self) -> Option<Account> {
        match self {
            Block::Send(b) => Some(b.destination),
            _ => None,
        }
    }

    pub fn representative(&self) -> Option<Account> {
        match self {
            Block::Open(b) => Some(b.representative),
            Block::Change(b) => Some(b.representative),
            Block::State(b) => Some(b.representative),
            _ => None,
        }
    }

    pub fn balance(&self) -> Option<Amount> {
        match self {
            Block::Send(b) => Some(b.balance),
            Block::State(b) => Some(b.balance),
            _ => None,
        }
    }

    /// The account named inside the block itself (open and state only).
    pub fn account(&self) -> Option<Account> {
        match self {
            Block::Open(b) => Some(b.account),
            Block::State(b) => Some(b.account),
            _ => None,
        }
    }

    pub fn signature(&self) -> &Signature {
        match self {
            Block::Send(b) => &b.signature,
            Block::Receive(b) => &b.signature,
            Block::Open(b) => &b.signature,
            Block::Change(b) => &b.signature,
            Block::State(b) => &b.signature,
        }
    }

    pub fn set_signature(&mut self, signature: Signature) {
        match self {
            Block::Send(b) => b.signature = signature,
            Block::Receive(b) => b.signature = signature,
            Block::Open(b) => b.signature = signature,
            Block::Change(b) => b.signature = signature,
            Block::State(b) => b.signature = signature,
        }
    }

    pub fn work(&self) -> u64 {
        match self {
            Block::Send(b) => b.work,
            Block::Receive(b) => b.work,
            Block::Open(b) => b.work,
            Block::Change(b) => b.work,
            Block::State(b) => b.work,
        }
    }

    pub fn set_work(&mut self, work: u64) {
        match self {
            Block::Send(b) => b.work = work,
            Block::Receive(b) => b.work = work,
            Block::Open(b) => b.work = work,
            Block::Change(b) => b.work = work,
            Block::State(b) => b.work = work,
        }
    }

    /// Untyped body: the envelope (or table) already names the variant.
    pub fn serialize(&self, buf: &mut Vec<u8>) {
        match self {
            Block::Send(b) => {
                buf.put_bytes(b.previous.as_bytes());
                buf.put_bytes(b.destination.as_bytes());
                buf.put_bytes(&b.balance.to_be_bytes());
                buf.put_bytes(b.signature.as_bytes());
                buf.put_u64_be(b.work);
            }
            Block::Receive(b) => {
                buf.put_bytes(b.previous.as_bytes());
                buf.put_bytes(b.source.as_bytes());
                buf.put_bytes(b.signature.as_bytes());
                buf.put_u64_be(b.work);
            }
            Block::Open(b) => {
                buf.put_bytes(b.source.as_bytes());
                buf.put_bytes(b.representative.as_bytes());
                buf.put_bytes(b.account.as_bytes());
                buf.put_bytes(b.signature.as_bytes());
                buf.put_u64_be(b.work);
            }
            Block::Change(b) => {
                buf.put_bytes(b.previous.as_bytes());
                buf.put_bytes(b.representative.as_bytes());
                buf.put_bytes(b.signature.as_bytes());
                buf.put_u64_be(b.work);
            }
            Block::State(b) => {
                buf.put_bytes(b.account.as_bytes());
                buf.put_bytes(b.previous.as_bytes());
                buf.put_bytes(b.representative.as_bytes());
                buf.put_bytes(&b.balance.to_be_bytes());
                buf.put_bytes(b.link.as_bytes());
                buf.put_bytes(b.signature.as_bytes());
                buf.put_u64_be(b.work);
            }
        }
    }

    /// Typed form: one-byte variant tag followed by the body.
    pub fn serialize_typed(&self, buf: &mut Vec<u8>) {
        buf.put_u8(self.block_type().as_u8());
        self.serialize(buf);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.block_type().serialized_size());
        self.serialize(&mut buf);
        buf
    }

    /// Decode an untyped body whose variant the caller already knows.
    pub fn deserialize(reader: &mut BufReader<'_>, block_type: BlockType) -> Result<Self, WireError> {
        match block_type {
            BlockType::Send => Ok(Block::Send(SendBlock {
                previous: BlockHash::new(reader.read_array()?),
                destination: Account::new(reader.read_array()?),
                balance: Amount::from_be_bytes(reader.read_array()?),
                signature: Signature(reader.read_array()?),
                work: reader.read_u64_be()?,
            })),
            BlockType::Receive => Ok(Block::Receive(ReceiveBlock {
                previous: BlockHash::new(reader.read_array()?),
                source: BlockHash::new(reader.read_array()?),
                signature: Signature(reader.read_array()?),
                work: reader.read_u64_be()?,
            })),
            BlockType::Open => Ok(Block::Open(OpenBlock {
                source: BlockHash::new(reader.read_array()?),
                representative: Account::new(reader.read_array()?),
                account: Account::new(reader.read_array()?),
                signature: Signature(reader.read_array()?),
                work: reader.read_u64_be()?,
            })),
            BlockType::Change => Ok(Block::Change(ChangeBlock {
                previous: BlockHash::new(reader.read_array()?),
                representative: Account::new(reader.read_array()?),
                signature: Signature(reader.read_array()?),
                work: reader.read_u64_be()?,
            })),
            BlockType::State => Ok(Block::State(StateBlock {
                account: Account::new(reader.read_array()?),
                previous: BlockHash::new(reader.read_array()?),
                representative: Account::new(reader.read_array()?),
                balance: Amount::from_be_bytes(reader.read_array()?),
                link: Link(reader.read_array()?),
                signature: Signature(reader.read_array()?),
                work: reader.read_u64_be()?,
            })),
            BlockType::Invalid | BlockType::NotABlock => Err(WireError),
        }
    }

    /// Decode the typed form (tag byte then body).
    pub fn deserialize_typed(reader: &mut BufReader<'_>) -> Result<Self, WireError> {
        let tag = BlockType::from_u8(reader.read_u8()?).ok_or(WireError)?;
        Self::deserialize(reader, tag)
    }

    pub fn to_json(&self) -> String {
        let value = match self {
            Block::Send(b) => json!({
                "type": "send",
                "previous": b.previous.encode_hex(),
                "destination": b.destination.encode_account(),
                "balance": b.balance.encode_hex(),
                "work": format!("{:016x}", b.work),
                "signature": b.signature.encode_hex(),
            }),
            Block::Receive(b) => json!({
                "type": "receive",
                "previous": b.previous.encode_hex(),
                "source": b.source.encode_hex(),
                "work": format!("{:016x}", b.work),
                "signature": b.signature.encode_hex(),
            }),
            Block::Open(b) => json!({
                "type": "open",
                "source": b.source.encode_hex(),
                "representative": b.representative.encode_account(),
                "account": b.account.encode_account(),
                "work": format!("{:016x}", b.work),
                "signature": b.signature.encode_hex(),
            }),
            Block::Change(b) => json!({
                "type": "change",
                "previous": b.previous.encode_hex(),
                "representative": b.representative.encode_account(),
                "work": format!("{:016x}", b.work),
                "signature": b.signature.encode_hex(),
            }),
            Block::State(b) => json!({
                "type": "state",
                "account": b.account.encode_account(),
                "previous": b.previous.encode_hex(),
                "representative": b.representative.encode_account(),
                "balance": b.balance.encode_dec(),
                "link": b.link.encode_hex(),
                "link_as_account": b.link.as_account().encode_account(),
                "signature": b.signature.encode_hex(),
                "work": format!("{:016x}", b.work),
            }),
        };
        value.to_string()
    }

    pub fn from_json(input: &str) -> Result<Self, BlockJsonError> {
        let value: Value = serde_json::from_str(input).map_err(|_| BlockJsonError::Malformed)?;
        let type_str = get_str(&value, "type")?;
        match type_str {
            "send" => Ok(Block::Send(SendBlock {
                previous: get_hash(&value, "previous")?,
                destination: get_account(&value, "destination")?,
                balance: Amount::decode_hex(get_str(&value, "balance")?)
                    .ok_or(BlockJsonError::InvalidField("balance"))?,
                signature: get_signature(&value)?,
                work: get_work(&value)?,
            })),
            "receive" => Ok(Block::Receive(ReceiveBlock {
                previous: get_hash(&value, "previous")?,
                source: get_hash(&value, "source")?,
                signature: get_signature(&value)?,
                work: get_work(&value)?,
            })),
            "open" => Ok(Block::Open(OpenBlock {
                source: get_hash(&value, "source")?,
                representative: get_account(&value, "representative")?,
                account: get_account(&value, "account")?,
                signature: get_signature(&value)?,
                work: get_work(&value)?,
            })),
            "change" => Ok(Block::Change(ChangeBlock {
                previous: get_hash(&value, "previous")?,
                representative: get_account(&value, "representative")?,
                signature: get_signature(&value)?,
                work: get_work(&value)?,
            })),
            "state" => Ok(Block::State(StateBlock {
                account: get_account(&value, "account")?,
                previous: get_hash(&value, "previous")?,
                representative: get_account(&value, "representative")?,
                balance: Amount::decode_dec(get_str(&value, "balance")?)
                    .ok_or(BlockJsonError::InvalidField("balance"))?,
                link: Link::decode_hex(get_str(&value, "link")?)
                    .ok_or(BlockJsonError::InvalidField("link"))?,
                signature: get_signature(&value)?,
                work: get_work(&value)?,
            })),
            _ => Err(BlockJsonError::UnknownType),
        }
    }
}

fn get_str<'a>(value: &'a Value, field: &'static str) -> Result<&'a str, BlockJsonError> {
    value
        .get(field)
        .ok_or(BlockJsonError::MissingField(field))?
        .as_str()
        .ok_or(BlockJsonError::InvalidField(field))
}

fn get_hash(value: &Value, field: &'static str) -> Result<BlockHash, BlockJsonError> {
    BlockHash::decode_hex(get_str(value, field)?).ok_or(BlockJsonError::InvalidField(field))
}

fn get_account(value: &Value, field: &'static str) -> Result<Account, BlockJsonError> {
    let s = get_str(value, field)?;
    // Accounts appear both in the fer_ form and as raw hex.
    Account::decode_account(s)
        .or_else(|| Account::decode_hex(s))
        .ok_or(BlockJsonError::InvalidField(field))
}

fn get_signature(value: &Value) -> Result<Signature, BlockJsonError> {
    Signature::decode_hex(get_str(value, "signature")?)
        .ok_or(BlockJsonError::InvalidField("signature"))
}

fn get_work(value: &Value) -> Result<u64, BlockJsonError> {
    let s = get_str(value, "work")?;
    if s.len() != 16 {
        return Err(BlockJsonError::InvalidField("work"));
    }
    u64::from_str_radix(s, 16).map_err(|_| BlockJsonError::InvalidField("work"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_send() -> Block {
        Block::Send(SendBlock {
            previous: BlockHash::new([1; 32]),
            destination: Account::new([2; 32]),
            balance: Amount::new(100),
            signature: Signature([3; 64]),
            work: 0x1234_5678_9ABC_DEF0,
        })
    }

    fn sample_state(previous: BlockHash) -> Block {
        Block::State(StateBlock {
            account: Account::new([4; 32]),
            previous,
            representative: Account::new([5; 32]),
            balance: Amount::new(7_000),
            link: Link([6; 32]),
            signature: Signature([7; 64]),
            work: 42,
        })
    }

    #[test]
    fn binary_roundtrip_all_variants() {
        let blocks = vec![
            sample_send(),
            Block::Receive(ReceiveBlock {
                previous: BlockHash::new([8; 32]),
                source: BlockHash::new([9; 32]),
                signature: Signature([1; 64]),
                work: 1,
            }),
            Block::Open(OpenBlock {
                source: BlockHash::new([10; 32]),
                representative: Account::new([11; 32]),
                account: Account::new([12; 32]),
                signature: Signature([2; 64]),
                work: 2,
            }),
            Block::Change(ChangeBlock {
                previous: BlockHash::new([13; 32]),
                representative: Account::new([14; 32]),
                signature: Signature([3; 64]),
                work: 3,
            }),
            sample_state(BlockHash::new([15; 32])),
        ];

        for block in blocks {
            let mut buf = Vec::new();
            block.serialize(&mut buf);
            assert_eq!(buf.len(), block.block_type().serialized_size());
            let decoded =
                Block::deserialize(&mut BufReader::new(&buf), block.block_type()).unwrap();
            assert_eq!(decoded, block);
            assert_eq!(decoded.hash(), block.hash());

            let mut typed = Vec::new();
            block.serialize_typed(&mut typed);
            let decoded = Block::deserialize_typed(&mut BufReader::new(&typed)).unwrap();
            assert_eq!(decoded, block);
        }
    }

    #[test]
    fn truncated_body_rejected() {
        let mut buf = Vec::new();
        sample_send().serialize(&mut buf);
        buf.pop();
        assert!(Block::deserialize(&mut BufReader::new(&buf), BlockType::Send).is_err());
    }

    #[test]
    fn unknown_tag_rejected() {
        assert!(Block::deserialize_typed(&mut BufReader::new(&[99u8; 200])).is_err());
        assert!(Block::deserialize_typed(&mut BufReader::new(&[1u8; 200])).is_err());
    }

    #[test]
    fn json_roundtrip() {
        for block in [sample_send(), sample_state(BlockHash::new([15; 32]))] {
            let text = block.to_json();
            let decoded = Block::from_json(&text).unwrap();
            assert_eq!(decoded, block);
            assert_eq!(decoded.hash(), block.hash());
        }
    }

    #[test]
    fn json_rejects_missing_and_wrong_type() {
        assert_eq!(
            Block::from_json(r#"{"type":"send"}"#),
            Err(BlockJsonError::MissingField("previous"))
        );
        assert_eq!(
            Block::from_json(r#"{"type":"teleport"}"#),
            Err(BlockJsonError::UnknownType)
        );
        assert_eq!(Block::from_json("not json"), Err(BlockJsonError::Malformed));
    }

    #[test]
    fn state_preamble_separates_hash_domains() {
        // A state block and a legacy block never share a hash even when the
        // overlapping fields coincide.
        let state = sample_state(BlockHash::new([1; 32]));
        assert_ne!(state.hash(), sample_send().hash());
    }

    #[test]
    fn root_follows_previous_or_account() {
        let send = sample_send();
        assert_eq!(send.root(), send.previous());

        let open = Block::Open(OpenBlock {
            source: BlockHash::new([1; 32]),
            representative: Account::new([2; 32]),
            account: Account::new([3; 32]),
            signature: Signature::ZERO,
            work: 0,
        });
        assert_eq!(open.root(), BlockHash::new([3; 32]));
        assert!(open.previous().is_zero());

        let state_open = sample_state(BlockHash::ZERO);
        assert_eq!(state_open.root(), BlockHash::new([4; 32]));
        let state_chained = sample_state(BlockHash::new([9; 32]));
        assert_eq!(state_chained.root(), BlockHash::new([9; 32]));
    }

    #[test]
    fn full_hash_covers_signature_and_work() {
        let a = sample_send();
        let mut b = a.clone();
        assert_eq!(a.full_hash(), b.full_hash());
        b.set_work(a.work() + 1);
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.full_hash(), b.full_hash());
    }

    #[test]
    fn predecessor_rules() {
        use BlockType::*;
        // Legacy blocks may extend any legacy block.
        for prev in [Send, Receive, Open, Change] {
            assert!(valid_predecessor(prev, Send));
            assert!(valid_predecessor(prev, Receive));
            assert!(valid_predecessor(prev, Change));
            assert!(valid_predecessor(prev, State));
        }
        // Nothing legacy may follow a state block.
        assert!(!valid_predecessor(State, Send));
        assert!(!valid_predecessor(State, Receive));
        assert!(!valid_predecessor(State, Change));
        assert!(valid_predecessor(State, State));
        // Opens never have a predecessor.
        assert!(!valid_predecessor(Send, Open));
    }
}
