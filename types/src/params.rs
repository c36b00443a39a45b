//! Per-network protocol parameters.
//!
//! There are no process-wide constants: a [`NetworkParams`] value is built at
//! startup for exactly one network and threaded through every component.

use crate::account::Account;
use crate::amount::Amount;
use crate::block::Link;

/// Hex private key of the development/test genesis account. Never funded on
/// beta or live.
pub const DEV_GENESIS_PRIVATE_KEY: &str =
    "34F0A37AAD20F4A260F0A5B3CB3D7FB50673212263E58A380BC10474BB039CE4";
/// Hex public key of the test genesis account.
pub const DEV_GENESIS_PUBLIC_KEY: &str =
    "C1F3DE05322FB72A3A58BC979A9A04CDEE939283C3FEF480A5A0B3B00B9AA061";
/// Precomputed work nonce for the test genesis open block.
pub const DEV_GENESIS_WORK: u64 = 0xd5ad4edd87823eff;

/// Which network a node serves. A single binary serves exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Networks {
    Test,
    Beta,
    Live,
}

impl Networks {
    /// Wire magic: `R` followed by the network discriminator.
    pub fn magic(&self) -> [u8; 2] {
        match self {
            Networks::Test => [b'R', b'A'],
            Networks::Beta => [b'R', b'B'],
            Networks::Live => [b'R', b'C'],
        }
    }

    pub fn from_magic(magic: [u8; 2]) -> Option<Self> {
        match magic {
            [b'R', b'A'] => Some(Networks::Test),
            [b'R', b'B'] => Some(Networks::Beta),
            [b'R', b'C'] => Some(Networks::Live),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Networks::Test => "test",
            Networks::Beta => "beta",
            Networks::Live => "live",
        }
    }
}

/// Parameter set selecting one network's constants.
#[derive(Clone, Debug)]
pub struct NetworkParams {
    pub network: Networks,
    pub protocol_version: u8,
    pub protocol_version_min: u8,
    /// Minimum proof-of-work value a block must clear.
    pub publish_threshold: u64,
    /// Election announcement cadence.
    pub announcement_interval_ms: u64,
    pub genesis_account: Account,
    pub genesis_amount: Amount,
    /// The all-zero account; funds sent here are destroyed.
    pub burn_account: Account,
    /// Sentinel link value marking epoch-upgrade state blocks.
    pub epoch_link: Link,
    /// Required signer for epoch-upgrade blocks.
    pub epoch_signer: Account,
}

impl NetworkParams {
    pub const PROTOCOL_VERSION: u8 = 12;
    pub const PROTOCOL_VERSION_MIN: u8 = 7;

    const PUBLISH_TEST_THRESHOLD: u64 = 0xff00_0000_0000_0000;
    const PUBLISH_FULL_THRESHOLD: u64 = 0xffff_ffc0_0000_0000;

    pub fn new(network: Networks) -> Self {
        let genesis_account = Account::decode_hex(DEV_GENESIS_PUBLIC_KEY)
            .expect("genesis key constant is valid hex");
        let mut epoch_link = [0u8; 32];
        epoch_link[..14].copy_from_slice(b"epoch v1 block");

        Self {
            network,
            protocol_version: Self::PROTOCOL_VERSION,
            protocol_version_min: Self::PROTOCOL_VERSION_MIN,
            publish_threshold: match network {
                Networks::Test => Self::PUBLISH_TEST_THRESHOLD,
                Networks::Beta | Networks::Live => Self::PUBLISH_FULL_THRESHOLD,
            },
            announcement_interval_ms: match network {
                Networks::Test => 10,
                Networks::Beta | Networks::Live => 16_000,
            },
            genesis_account,
            genesis_amount: Amount::MAX,
            burn_account: Account::ZERO,
            epoch_link: Link(epoch_link),
            epoch_signer: genesis_account,
        }
    }

    /// Override the genesis account (beta/live sets are configured, not
    /// compiled in).
    pub fn with_genesis_account(mut self, account: Account) -> Self {
        self.genesis_account = account;
        self
    }

    /// Override the epoch sentinel and its required signer.
    pub fn with_epoch(mut self, link: Link, signer: Account) -> Self {
        self.epoch_link = link;
        self.epoch_signer = signer;
        self
    }

    /// Window within which a representative's vote counts it as online:
    /// five announcement periods.
    pub fn online_weight_window_ms(&self) -> u64 {
        self.announcement_interval_ms * 5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_roundtrip() {
        for network in [Networks::Test, Networks::Beta, Networks::Live] {
            assert_eq!(Networks::from_magic(network.magic()), Some(network));
        }
        assert_eq!(Networks::from_magic([b'R', b'D']), None);
        assert_eq!(Networks::from_magic([b'S', b'A']), None);
    }

    #[test]
    fn test_network_constants() {
        let params = NetworkParams::new(Networks::Test);
        assert_eq!(params.publish_threshold, 0xff00_0000_0000_0000);
        assert_eq!(params.announcement_interval_ms, 10);
        assert_eq!(params.genesis_amount, Amount::MAX);
        assert!(params.burn_account.is_zero());
        assert_eq!(params.epoch_signer, params.genesis_account);
    }

    #[test]
    fn live_threshold_is_harder() {
        let test = NetworkParams::new(Networks::Test);
        let live = NetworkParams::new(Networks::Live);
        assert!(live.publish_threshold > test.publish_threshold);
        assert_eq!(live.announcement_interval_ms, 16_000);
    }
}
