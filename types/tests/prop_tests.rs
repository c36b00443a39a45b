//! Property tests for the codec layer: every block variant must survive the
//! binary and JSON round trips with a stable hash.

use ferrite_types::{
    Account, Amount, Block, BlockHash, BufReader, ChangeBlock, Link, OpenBlock, ReceiveBlock,
    SendBlock, Signature, StateBlock,
};
use proptest::prelude::*;

fn arb_bytes32() -> impl Strategy<Value = [u8; 32]> {
    any::<[u8; 32]>()
}

fn arb_signature() -> impl Strategy<Value = Signature> {
    any::<[u8; 32]>().prop_map(|half| {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&half);
        bytes[32..].copy_from_slice(&half);
        Signature(bytes)
    })
}

prop_compose! {
    fn arb_send()(prev in arb_bytes32(), dest in arb_bytes32(), balance in any::<u128>(),
                  sig in arb_signature(), work in any::<u64>()) -> Block {
        Block::Send(SendBlock {
            previous: BlockHash::new(prev),
            destination: Account::new(dest),
            balance: Amount::new(balance),
            signature: sig,
            work,
        })
    }
}

prop_compose! {
    fn arb_receive()(prev in arb_bytes32(), source in arb_bytes32(),
                     sig in arb_signature(), work in any::<u64>()) -> Block {
        Block::Receive(ReceiveBlock {
            previous: BlockHash::new(prev),
            source: BlockHash::new(source),
            signature: sig,
            work,
        })
    }
}

prop_compose! {
    fn arb_open()(source in arb_bytes32(), rep in arb_bytes32(), account in arb_bytes32(),
                  sig in arb_signature(), work in any::<u64>()) -> Block {
        Block::Open(OpenBlock {
            source: BlockHash::new(source),
            representative: Account::new(rep),
            account: Account::new(account),
            signature: sig,
            work,
        })
    }
}

prop_compose! {
    fn arb_change()(prev in arb_bytes32(), rep in arb_bytes32(),
                    sig in arb_signature(), work in any::<u64>()) -> Block {
        Block::Change(ChangeBlock {
            previous: BlockHash::new(prev),
            representative: Account::new(rep),
            signature: sig,
            work,
        })
    }
}

prop_compose! {
    fn arb_state()(account in arb_bytes32(), prev in arb_bytes32(), rep in arb_bytes32(),
                   balance in any::<u128>(), link in arb_bytes32(),
                   sig in arb_signature(), work in any::<u64>()) -> Block {
        Block::State(StateBlock {
            account: Account::new(account),
            previous: BlockHash::new(prev),
            representative: Account::new(rep),
            balance: Amount::new(balance),
            link: Link(link),
            signature: sig,
            work,
        })
    }
}

fn arb_block() -> impl Strategy<Value = Block> {
    prop_oneof![arb_send(), arb_receive(), arb_open(), arb_change(), arb_state()]
}

proptest! {
    #[test]
    fn binary_roundtrip(block in arb_block()) {
        let mut buf = Vec::new();
        block.serialize_typed(&mut buf);
        let decoded = Block::deserialize_typed(&mut BufReader::new(&buf)).unwrap();
        prop_assert_eq!(&decoded, &block);
        prop_assert_eq!(decoded.hash(), block.hash());
        prop_assert_eq!(decoded.full_hash(), block.full_hash());
    }

    #[test]
    fn json_roundtrip(block in arb_block()) {
        let decoded = Block::from_json(&block.to_json()).unwrap();
        prop_assert_eq!(&decoded, &block);
        prop_assert_eq!(decoded.hash(), block.hash());
    }

    #[test]
    fn account_encoding_roundtrip(bytes in arb_bytes32()) {
        let account = Account::new(bytes);
        let encoded = account.encode_account();
        prop_assert_eq!(Account::decode_account(&encoded), Some(account));
    }

    #[test]
    fn amount_codecs_roundtrip(raw in any::<u128>()) {
        let amount = Amount::new(raw);
        prop_assert_eq!(Amount::decode_hex(&amount.encode_hex()), Some(amount));
        prop_assert_eq!(Amount::decode_dec(&amount.encode_dec()), Some(amount));
    }
}
