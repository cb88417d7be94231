//! # Control Blocks
//!
//! A control block proves that a revealed leaf script is committed in a
//! Taproot output key without revealing any other leaf.
//!
//! ## Wire Format
//!
//! ```text
//! byte 0       (leaf_version & 0xfe) | output_key_parity
//! bytes 1..33  internal key (x-only)
//! bytes 33..   N sibling hashes of 32 bytes, leaf-to-root, 0 <= N <= 128
//! ```
//!
//! ## Verification
//!
//! 1. Recompute the leaf hash from the leaf version and the revealed script
//! 2. Fold the sibling hashes into it to get a candidate Merkle root
//! 3. Tweak the internal key with that root
//! 4. Accept only if output key and parity both match the spent output

use crate::config::taproot::{
    CONTROL_BLOCK_BASE_SIZE, CONTROL_BLOCK_MAX_SIZE, CONTROL_BLOCK_NODE_SIZE,
    LEAF_VERSION_MASK, MAX_TREE_DEPTH,
};
use crate::error::{TaprootError, TaprootResult};
use crate::leaf::{compute_leaf_hash, LeafVersion};
use crate::tagged_hash::TapNodeHash;
use crate::tree::{MerklePath, NodeId, ScriptTree};
use crate::tweak::tweak_public_key;
use bitcoin::secp256k1::{Parity, Secp256k1, Verification, XOnlyPublicKey};
use bitcoin::Script;

/// Parsed control block
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ControlBlock {
    /// Version of the revealed leaf
    pub leaf_version: LeafVersion,

    /// Parity of the output key's y coordinate
    pub output_key_parity: Parity,

    /// Untweaked internal key
    pub internal_key: XOnlyPublicKey,

    /// Sibling hashes from the leaf up to the root
    pub merkle_branch: MerklePath,
}

impl ControlBlock {
    /// Build the control block for one leaf of a sealed tree.
    ///
    /// # Errors
    /// - `PreconditionViolated` if `leaf` is not a leaf of `tree`, including
    ///   ids issued for another tree
    pub fn build(
        tree: &ScriptTree,
        leaf: NodeId,
        internal_key: XOnlyPublicKey,
        output_key_parity: Parity,
    ) -> TaprootResult<Self> {
        let leaf_version = tree
            .leaf(leaf)
            .map(|l| l.version())
            .ok_or_else(|| TaprootError::precondition("a leaf of the tree", format!("node {}", leaf)))?;
        let merkle_branch = tree.sibling_path(leaf)?;
        Ok(Self {
            leaf_version,
            output_key_parity,
            internal_key,
            merkle_branch,
        })
    }

    /// Serialized size: `33 + 32 * depth`
    pub fn size(&self) -> usize {
        CONTROL_BLOCK_BASE_SIZE + CONTROL_BLOCK_NODE_SIZE * self.merkle_branch.len()
    }

    /// Serialize to wire format
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size());
        bytes.push(self.leaf_version.to_consensus() | self.output_key_parity.to_u8());
        bytes.extend_from_slice(&self.internal_key.serialize());
        for sibling in &self.merkle_branch {
            bytes.extend_from_slice(sibling.as_ref());
        }
        bytes
    }

    /// Parse wire bytes.
    ///
    /// # Errors
    /// - `MalformedControlBlock` for a length shorter than 33 bytes, a path
    ///   that is not a whole number of 32-byte hashes, a path deeper than 128,
    ///   a first byte carrying the annex tag, or an internal key that is not a
    ///   valid x coordinate
    pub fn decode(bytes: &[u8]) -> TaprootResult<Self> {
        if bytes.len() < CONTROL_BLOCK_BASE_SIZE {
            return Err(TaprootError::malformed(format!(
                "{} bytes is shorter than the {} byte minimum",
                bytes.len(),
                CONTROL_BLOCK_BASE_SIZE
            )));
        }
        let path_len = bytes.len() - CONTROL_BLOCK_BASE_SIZE;
        if path_len % CONTROL_BLOCK_NODE_SIZE != 0 {
            return Err(TaprootError::malformed(format!(
                "path of {} bytes is not a multiple of {}",
                path_len, CONTROL_BLOCK_NODE_SIZE
            )));
        }
        if bytes.len() > CONTROL_BLOCK_MAX_SIZE {
            return Err(TaprootError::malformed(format!(
                "path depth {} exceeds maximum of {}",
                path_len / CONTROL_BLOCK_NODE_SIZE,
                MAX_TREE_DEPTH
            )));
        }

        let leaf_version = LeafVersion::from_consensus(bytes[0] & LEAF_VERSION_MASK).map_err(|_| {
            TaprootError::malformed(format!("first byte {:#04x} carries the annex tag", bytes[0]))
        })?;
        let output_key_parity = if bytes[0] & 1 == 1 {
            Parity::Odd
        } else {
            Parity::Even
        };
        let internal_key = XOnlyPublicKey::from_slice(&bytes[1..CONTROL_BLOCK_BASE_SIZE])
            .map_err(|e| TaprootError::malformed(format!("invalid internal key: {}", e)))?;

        let siblings = bytes[CONTROL_BLOCK_BASE_SIZE..]
            .chunks_exact(CONTROL_BLOCK_NODE_SIZE)
            .map(|chunk| {
                let mut hash = [0u8; 32];
                hash.copy_from_slice(chunk);
                TapNodeHash::from_byte_array(hash)
            })
            .collect();
        let merkle_branch = MerklePath::from_hashes(siblings)
            .map_err(|e| TaprootError::malformed(e.to_string()))?;

        Ok(Self {
            leaf_version,
            output_key_parity,
            internal_key,
            merkle_branch,
        })
    }

    /// Merkle root implied by this control block for `script`
    pub fn merkle_root_for(&self, script: &Script) -> TapNodeHash {
        let leaf_hash = compute_leaf_hash(self.leaf_version, script);
        self.merkle_branch.fold_root(leaf_hash.into())
    }

    /// Check that `script` is committed in `output_key`.
    ///
    /// # Errors
    /// - `CommitmentMismatch` if the recomputed output key or parity differs
    /// - `InvalidTweak` for degenerate tweak arithmetic
    pub fn verify_taproot_commitment<C: Verification>(
        &self,
        secp: &Secp256k1<C>,
        output_key: &XOnlyPublicKey,
        script: &Script,
    ) -> TaprootResult<()> {
        let root = self.merkle_root_for(script);
        let recomputed = tweak_public_key(secp, &self.internal_key, Some(root))?;

        if recomputed.output_key != *output_key {
            log::debug!(
                "Control block commits to {} but output key is {}",
                recomputed.output_key,
                output_key
            );
            return Err(TaprootError::mismatch(format!(
                "recomputed output key {} does not match {}",
                recomputed.output_key, output_key
            )));
        }
        if recomputed.parity != self.output_key_parity {
            return Err(TaprootError::mismatch(format!(
                "control block parity {} does not match recomputed parity {}",
                self.output_key_parity.to_u8(),
                recomputed.parity.to_u8()
            )));
        }
        Ok(())
    }
}

/// Parse control block bytes and verify them against a revealed script
pub fn verify_control_block<C: Verification>(
    secp: &Secp256k1<C>,
    output_key: &XOnlyPublicKey,
    script: &Script,
    control_block: &[u8],
) -> TaprootResult<ControlBlock> {
    let parsed = ControlBlock::decode(control_block)?;
    parsed.verify_taproot_commitment(secp, output_key, script)?;
    Ok(parsed)
}
