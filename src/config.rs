//! # Configuration Constants
//!
//! Consensus constants for Taproot commitments plus the small amount of
//! runtime configuration the command-line tool reads from the environment.

/// BIP341 consensus constants
pub mod taproot {
    /// Leaf version for BIP342 tapscript
    pub const TAPSCRIPT_LEAF_VERSION: u8 = 0xc0;

    /// Mask selecting the leaf version bits of the control block's first byte
    pub const LEAF_VERSION_MASK: u8 = 0xfe;

    /// First byte of an annex witness element; never a valid leaf version
    pub const ANNEX_TAG: u8 = 0x50;

    /// Version/parity byte plus the 32-byte internal key
    pub const CONTROL_BLOCK_BASE_SIZE: usize = 33;

    /// Size of one sibling hash in the control block path
    pub const CONTROL_BLOCK_NODE_SIZE: usize = 32;

    /// Maximum number of path elements (tree depth) allowed by BIP341
    pub const MAX_TREE_DEPTH: usize = 128;

    /// Largest possible control block
    pub const CONTROL_BLOCK_MAX_SIZE: usize =
        CONTROL_BLOCK_BASE_SIZE + CONTROL_BLOCK_NODE_SIZE * MAX_TREE_DEPTH;

    /// Upper bound on a leaf script.
    ///
    /// Tapscript removes the 10,000 byte script limit, so the only remaining
    /// bound is the block weight limit the script has to fit into.
    pub const MAX_LEAF_SCRIPT_SIZE: usize = 4_000_000;

    /// NUMS (Nothing Up My Sleeve) internal key from BIP341.
    ///
    /// `H = lift_x(SHA256(G))`, a point with no known discrete logarithm.
    /// Committing to it disables the key path.
    pub const NUMS_INTERNAL_KEY: &str =
        "50929b74c1a04954b78b4b6035e97a5e078a5a0f28ec96d547bfee9ace803ac0";
}

/// Network defaults
pub mod network {
    use bitcoin::Network;

    /// Network used when none is configured
    pub const DEFAULT_NETWORK: Network = Network::Testnet;
}

/// File paths and names
pub mod files {
    /// Commitment record written by `commit` and read by `control-block`
    pub const DEFAULT_RECORD_FILE: &str = "taproot_commitment.json";
}

/// Environment variable names
pub mod env {
    /// Network override (bitcoin, testnet, signet, regtest)
    pub const NETWORK: &str = "TAPCOMMIT_NETWORK";

    /// Commitment record path override
    pub const RECORD_FILE: &str = "TAPCOMMIT_RECORD_FILE";
}

use crate::error::{TaprootError, TaprootResult};
use bitcoin::Network;
use std::path::PathBuf;
use std::str::FromStr;

/// Runtime settings resolved from the environment (and `.env`, if present)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Network addresses are encoded for
    pub network: Network,

    /// Where commitment records are stored
    pub record_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            network: network::DEFAULT_NETWORK,
            record_file: PathBuf::from(files::DEFAULT_RECORD_FILE),
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults for unset variables
    pub fn from_env() -> TaprootResult<Self> {
        dotenv::dotenv().ok();

        let mut settings = Self::default();
        if let Ok(value) = std::env::var(env::NETWORK) {
            settings.network = parse_network(&value)?;
        }
        if let Ok(value) = std::env::var(env::RECORD_FILE) {
            settings.record_file = PathBuf::from(value);
        }
        log::debug!(
            "Resolved settings: network={}, record_file={}",
            settings.network,
            settings.record_file.display()
        );
        Ok(settings)
    }
}

/// Parse a network name as printed by `bitcoin::Network`'s `Display`
pub fn parse_network(value: &str) -> TaprootResult<Network> {
    let normalized = value.trim().to_lowercase();
    let name = match normalized.as_str() {
        "mainnet" | "main" => "bitcoin",
        "test" => "testnet",
        other => other,
    };
    Network::from_str(name)
        .map_err(|_| TaprootError::config(format!("unknown network '{}'", value)))
}
