//! # Tapcommit: Taproot Script-Tree Commitments
//!
//! Builds a tree of alternative spending scripts, commits it into a single
//! x-only public key (BIP341), and produces and verifies the control blocks
//! that prove a revealed script belongs to that commitment.
//!
//! ## Commitment Flow
//!
//! ```text
//! Leaf ──> ScriptTree ──> merkle root ──> tweak(internal key) ──> output key ──> address
//!              │                                                      │
//!              └── sibling path ──> ControlBlock ──> script-path witness
//! ```
//!
//! ## Module Structure
//!
//! - [`tagged_hash`]: BIP340 tagged hashes and the typed hash outputs
//! - [`leaf`]: leaf scripts, leaf versions and leaf hashes
//! - [`tree`]: arena-backed script trees, Merkle roots and sibling paths
//! - [`tweak`]: internal key tweaking and tweaked signing keys
//! - [`control_block`]: control block wire format and commitment checks
//! - [`address`]: bech32m P2TR addresses
//! - [`scripts`]: known leaf script templates and their interpreter
//! - [`spend`]: witness assembly and verification
//! - [`record`]: JSON commitment records
//! - [`config`], [`error`], [`utils`]: constants, error types and helpers

pub mod address;
pub mod config;
pub mod control_block;
pub mod error;
pub mod leaf;
pub mod record;
pub mod scripts;
pub mod spend;
pub mod tagged_hash;
pub mod tree;
pub mod tweak;
pub mod utils;

// Re-export commonly used types
pub use control_block::ControlBlock;
pub use error::{TaprootError, TaprootResult};
pub use leaf::{Leaf, LeafVersion};
pub use record::CommitmentRecord;
pub use scripts::{ExecutionContext, LeafScript, ScriptInterpreter, TemplateInterpreter};
pub use spend::{SpendState, TaprootSpend};
pub use tagged_hash::{TapLeafHash, TapNodeHash, TapTweakHash};
pub use tree::{FlatNode, FlatTree, MerklePath, NodeId, ScriptTree, TreeBuilder, TreeShape};
pub use tweak::{tweak_public_key, TweakResult};
