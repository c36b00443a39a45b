//! Node configuration with TOML file support.
//!
//! Amount-valued options travel as decimal strings since TOML has no
//! 128-bit integers. Parse failures are fatal at startup; a loaded config
//! never errors afterwards.

use crate::NodeError;
use ferrite_types::{Account, Amount, Link};
use serde::{Deserialize, Serialize};

/// Configuration for a ferrite node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// UDP/TCP listen port.
    #[serde(default = "default_peering_port")]
    pub peering_port: u16,

    /// External proof-of-work generators.
    #[serde(default)]
    pub work_peers: Vec<String>,

    /// Initial peer DNS names.
    #[serde(default)]
    pub preconfigured_peers: Vec<String>,

    /// Trusted representatives used for bootstrap weights, `fer_…` form.
    #[serde(default)]
    pub preconfigured_representatives: Vec<String>,

    /// Numerator of the gap-cache bootstrap trigger fraction.
    #[serde(default = "default_bootstrap_fraction")]
    pub bootstrap_fraction_numerator: u32,

    /// Minimum balance delta that triggers an automatic receive (decimal).
    #[serde(default = "default_receive_minimum")]
    pub receive_minimum: String,

    /// Floor used in the quorum delta (decimal).
    #[serde(default = "default_online_weight_minimum")]
    pub online_weight_minimum: String,

    /// Quorum percentage, 0–100.
    #[serde(default = "default_online_weight_quorum")]
    pub online_weight_quorum: u8,

    /// Wallet key fan-out factor.
    #[serde(default = "default_password_fanout")]
    pub password_fanout: u32,

    #[serde(default = "default_io_threads")]
    pub io_threads: u32,

    #[serde(default = "default_network_threads")]
    pub network_threads: u32,

    #[serde(default = "default_work_threads")]
    pub work_threads: u32,

    /// Whether this node generates votes.
    #[serde(default)]
    pub enable_voting: bool,

    #[serde(default = "default_bootstrap_connections")]
    pub bootstrap_connections: u32,

    #[serde(default = "default_bootstrap_connections_max")]
    pub bootstrap_connections_max: u32,

    /// HTTP callback on confirmation.
    #[serde(default)]
    pub callback_address: String,
    #[serde(default)]
    pub callback_port: u16,
    #[serde(default)]
    pub callback_target: String,

    /// Accept loopback peers.
    #[serde(default)]
    pub allow_local_peers: bool,

    /// Sentinel link value marking epoch-upgrade state blocks (hex).
    #[serde(default)]
    pub epoch_block_link: String,

    /// Required signer for epoch-upgrade blocks (hex or `fer_…`).
    #[serde(default)]
    pub epoch_block_signer: String,

    /// Write-transaction duration cap for the block processor, ms.
    #[serde(default = "default_batch_max_time")]
    pub block_processor_batch_max_time: u64,
}

/// Boolean switches outside the config file.
#[derive(Clone, Copy, Debug, Default)]
pub struct NodeFlags {
    pub disable_backup: bool,
    pub disable_lazy_bootstrap: bool,
    pub disable_legacy_bootstrap: bool,
    pub disable_bootstrap_listener: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_peering_port() -> u16 {
    7_075
}

fn default_bootstrap_fraction() -> u32 {
    1
}

fn default_receive_minimum() -> String {
    // 10^24 raw.
    "1000000000000000000000000".to_string()
}

fn default_online_weight_minimum() -> String {
    // 60 million units of 10^30 raw.
    "60000000000000000000000000000000000000".to_string()
}

fn default_online_weight_quorum() -> u8 {
    50
}

fn default_password_fanout() -> u32 {
    1024
}

fn default_io_threads() -> u32 {
    4
}

fn default_network_threads() -> u32 {
    4
}

fn default_work_threads() -> u32 {
    4
}

fn default_bootstrap_connections() -> u32 {
    4
}

fn default_bootstrap_connections_max() -> u32 {
    64
}

fn default_batch_max_time() -> u64 {
    5_000
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    /// Check every parsed-at-use field now so nothing fails after init.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.online_weight_quorum > 100 {
            return Err(NodeError::Config(
                "online_weight_quorum must be 0–100".into(),
            ));
        }
        self.receive_minimum_amount()?;
        self.online_weight_minimum_amount()?;
        if !self.epoch_block_link.is_empty() {
            self.epoch_link()?;
        }
        if !self.epoch_block_signer.is_empty() {
            self.epoch_signer()?;
        }
        for rep in &self.preconfigured_representatives {
            Account::decode_account(rep)
                .ok_or_else(|| NodeError::Config(format!("bad representative {rep}")))?;
        }
        Ok(())
    }

    pub fn receive_minimum_amount(&self) -> Result<Amount, NodeError> {
        Amount::decode_dec(&self.receive_minimum)
            .ok_or_else(|| NodeError::Config("receive_minimum is not a decimal amount".into()))
    }

    pub fn online_weight_minimum_amount(&self) -> Result<Amount, NodeError> {
        Amount::decode_dec(&self.online_weight_minimum).ok_or_else(|| {
            NodeError::Config("online_weight_minimum is not a decimal amount".into())
        })
    }

    pub fn epoch_link(&self) -> Result<Link, NodeError> {
        Link::decode_hex(&self.epoch_block_link)
            .ok_or_else(|| NodeError::Config("epoch_block_link is not 64 hex characters".into()))
    }

    pub fn epoch_signer(&self) -> Result<Account, NodeError> {
        Account::decode_account(&self.epoch_block_signer)
            .or_else(|| Account::decode_hex(&self.epoch_block_signer))
            .ok_or_else(|| NodeError::Config("epoch_block_signer is not an account".into()))
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty config uses defaults")
    }
}
