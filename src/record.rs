//! # Commitment Records
//!
//! JSON file written when an output is committed and read back when it is
//! spent. Everything is hex so the file can be inspected and edited by hand:
//!
//! ```json
//! {
//!   "network": "testnet",
//!   "internal_key": "50be5f...b4d3",
//!   "merkle_root": "fe78d8...659e",
//!   "output_key": "a46780...b6d9",
//!   "parity": 1,
//!   "address": "tb1p53nc...kd43h",
//!   "tree": [{"script": "a820...8851", "version": 192}]
//! }
//! ```
//!
//! The tree is stored as its arena listing, children before parents with the
//! root last, so the file nests no deeper for a 128-level tree than for a
//! single leaf.
//!
//! A loaded record is untrusted until `restore` has recomputed the root,
//! the tweak and the address from the stored tree and internal key.

use crate::address::{decode_address_for, encode_address};
use crate::config::parse_network;
use crate::error::{TaprootError, TaprootResult};
use crate::tagged_hash::TapNodeHash;
use crate::tree::{FlatTree, ScriptTree};
use crate::tweak::{tweak_public_key, verify_tweak, TweakResult};
use crate::utils::{fs::write_file_atomic, keys::parse_x_only};
use bitcoin::secp256k1::{Parity, Secp256k1, Verification, XOnlyPublicKey};
use bitcoin::Network;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Persisted description of one committed output
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentRecord {
    /// Network name as printed by `bitcoin::Network`
    pub network: String,
    /// Hex x-only internal key
    pub internal_key: String,
    /// Hex Merkle root, absent for a key-only output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merkle_root: Option<String>,
    /// Hex x-only output key
    pub output_key: String,
    /// Output key parity, 0 for even and 1 for odd
    pub parity: u8,
    /// Bech32m address of the output
    pub address: String,
    /// Arena listing of the script tree, absent for a key-only output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree: Option<FlatTree>,
}

/// A record whose commitment has been recomputed and checked
#[derive(Clone, Debug)]
pub struct RestoredCommitment {
    /// Network the address was checked against
    pub network: Network,
    /// Untweaked internal key
    pub internal_key: XOnlyPublicKey,
    /// Tree rebuilt from the record; its leaf ids are valid for spending
    pub tree: ScriptTree,
    /// Recomputed output key and parity
    pub tweak: TweakResult,
    /// Address as stored, known to encode `tweak.output_key`
    pub address: String,
}

impl CommitmentRecord {
    /// Describe a commitment that has already been tweaked
    pub fn new(
        internal_key: XOnlyPublicKey,
        tree: &ScriptTree,
        tweak: &TweakResult,
        network: Network,
    ) -> Self {
        Self {
            network: network.to_string(),
            internal_key: internal_key.to_string(),
            merkle_root: tree.merkle_root().map(|root| root.to_string()),
            output_key: tweak.output_key.to_string(),
            parity: tweak.parity.to_u8(),
            address: encode_address(&tweak.output_key, network),
            tree: tree.flatten(),
        }
    }

    /// Write the record as pretty JSON, atomically replacing any old file
    pub fn save(&self, path: &Path) -> TaprootResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_file_atomic(path, json.as_bytes())?;
        log::info!("Saved commitment record to {}", path.display());
        Ok(())
    }

    /// Read a record without checking it
    pub fn load(path: &Path) -> TaprootResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let record: CommitmentRecord = serde_json::from_str(&json)?;
        log::debug!("Loaded commitment record for {}", record.address);
        Ok(record)
    }

    /// Rebuild the tree and recompute the commitment.
    ///
    /// # Errors
    /// - `InvalidTweak` if the record has a Merkle root but no tree
    /// - `CommitmentMismatch` if the stored root, output key, parity or
    ///   address disagree with what the tree and internal key produce
    /// - `InvalidKey`, `InvalidAddress`, `Hex` for unparseable fields
    pub fn restore<C: Verification>(&self, secp: &Secp256k1<C>) -> TaprootResult<RestoredCommitment> {
        let network = parse_network(&self.network)?;
        let internal_key = parse_x_only(&self.internal_key)?;
        let tree = match &self.tree {
            Some(flat) => ScriptTree::from_flat(flat)?,
            None => ScriptTree::empty(),
        };
        let stored_root = self
            .merkle_root
            .as_deref()
            .map(TapNodeHash::from_str)
            .transpose()?;

        if tree.is_empty() && stored_root.is_some() {
            return Err(TaprootError::tweak(
                "record has a Merkle root but no script tree to derive it from",
            ));
        }
        if tree.merkle_root() != stored_root {
            return Err(TaprootError::mismatch(format!(
                "stored root {:?} differs from recomputed root {:?}",
                self.merkle_root,
                tree.merkle_root().map(|root| root.to_string())
            )));
        }

        let claimed = TweakResult {
            output_key: parse_x_only(&self.output_key)?,
            parity: match self.parity {
                0 => Parity::Even,
                1 => Parity::Odd,
                other => {
                    return Err(TaprootError::mismatch(format!("parity {} is not 0 or 1", other)))
                }
            },
        };
        verify_tweak(secp, &internal_key, tree.merkle_root(), &claimed)?;

        let address_key = decode_address_for(&self.address, network)?;
        if address_key != claimed.output_key {
            return Err(TaprootError::mismatch(format!(
                "address {} does not encode output key {}",
                self.address, claimed.output_key
            )));
        }

        let tweak = tweak_public_key(secp, &internal_key, tree.merkle_root())?;
        Ok(RestoredCommitment {
            network,
            internal_key,
            tree,
            tweak,
            address: self.address.clone(),
        })
    }
}
