//! Genesis construction.
//!
//! The test network's genesis open block is rebuilt from the development
//! key: the account opens itself, delegating the full supply to itself. Beta
//! and live networks load their genesis from configuration instead.

use ferrite_crypto::{sign_message, KeyPair};
use ferrite_store::GenesisRecord;
use ferrite_types::params::{DEV_GENESIS_PRIVATE_KEY, DEV_GENESIS_WORK};
use ferrite_types::{Block, BlockHash, NetworkParams, OpenBlock, Signature};

/// The development/test genesis record, signed with the embedded key.
pub fn dev_genesis(params: &NetworkParams) -> GenesisRecord {
    let key = KeyPair::from_hex(DEV_GENESIS_PRIVATE_KEY).expect("embedded key is valid hex");
    let account = params.genesis_account;
    let mut block = Block::Open(OpenBlock {
        source: BlockHash::new(*account.as_bytes()),
        representative: account,
        account,
        signature: Signature::ZERO,
        work: DEV_GENESIS_WORK,
    });
    let signature = sign_message(block.hash().as_bytes(), &key.private);
    block.set_signature(signature);

    GenesisRecord {
        block,
        account,
        amount: params.genesis_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrite_types::Networks;

    #[test]
    fn genesis_is_self_open() {
        let params = NetworkParams::new(Networks::Test);
        let record = dev_genesis(&params);
        assert_eq!(record.account, params.genesis_account);
        assert_eq!(record.block.account(), Some(params.genesis_account));
        assert_eq!(
            record.block.source(),
            Some(BlockHash::new(*params.genesis_account.as_bytes()))
        );
        assert!(record.block.previous().is_zero());
    }

    #[test]
    fn genesis_signature_verifies() {
        let params = NetworkParams::new(Networks::Test);
        let record = dev_genesis(&params);
        assert!(ferrite_crypto::verify_signature(
            record.block.hash().as_bytes(),
            record.block.signature(),
            &params.genesis_account.public_key(),
        ));
    }

    #[test]
    fn genesis_work_is_the_known_nonce() {
        let params = NetworkParams::new(Networks::Test);
        let record = dev_genesis(&params);
        assert_eq!(record.block.work(), DEV_GENESIS_WORK);
    }
}
