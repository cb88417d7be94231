//! # Spend Module
//!
//! Assembles and verifies the witnesses that spend a Taproot output.
//!
//! ## Spending Paths
//!
//! - **Key path**: witness is a single Schnorr signature made with the
//!   tweaked private key. Nothing about the script tree is revealed.
//! - **Script path**: witness is the leaf's stack items followed by the leaf
//!   script and its control block. Only the spent leaf and its sibling
//!   hashes are revealed.
//!
//! ## Lifecycle
//!
//! ```text
//! Unbuilt -> TreeFrozen -> Tweaked -> KeyPathReady    -> Witnessed
//!                                  \-> ScriptPathReady -> Witnessed
//! ```

pub mod builder;
pub mod verify;


pub use builder::{SpendState, TaprootSpend};
pub use verify::{classify_witness, verify_key_path, verify_script_path, verify_witness, SpendPath};
