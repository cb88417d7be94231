//! Spend builder state machine

use crate::address::encode_address;
use crate::control_block::ControlBlock;
use crate::error::{TaprootError, TaprootResult};
use crate::tree::{NodeId, ScriptTree};
use crate::tweak::{tweak_keypair, tweak_public_key, TweakResult};
use bitcoin::secp256k1::{Keypair, Message, Secp256k1, Signing, Verification, XOnlyPublicKey};
use bitcoin::{Network, Witness};
use std::fmt;
use std::sync::Arc;

/// Where a spend is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpendState {
    /// Only the internal key is known
    Unbuilt,
    /// Script tree fixed; no further leaves can be added
    TreeFrozen,
    /// Output key and parity computed
    Tweaked,
    /// Key path chosen, waiting for a signature
    KeyPathReady,
    /// Leaf chosen and control block built, waiting for stack items
    ScriptPathReady,
    /// Witness complete
    Witnessed,
}

impl fmt::Display for SpendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpendState::Unbuilt => "Unbuilt",
            SpendState::TreeFrozen => "TreeFrozen",
            SpendState::Tweaked => "Tweaked",
            SpendState::KeyPathReady => "KeyPathReady",
            SpendState::ScriptPathReady => "ScriptPathReady",
            SpendState::Witnessed => "Witnessed",
        };
        f.write_str(name)
    }
}

/// Builds the witness for one Taproot input.
///
/// Each step is valid in exactly one state; calling a step out of order
/// fails with `PreconditionViolated` and leaves the builder unchanged.
#[derive(Clone, Debug)]
pub struct TaprootSpend {
    internal_key: XOnlyPublicKey,
    tree: Option<Arc<ScriptTree>>,
    tweak: Option<TweakResult>,
    control_block: Option<ControlBlock>,
    leaf: Option<NodeId>,
    witness: Option<Witness>,
    state: SpendState,
}

impl TaprootSpend {
    /// Start a spend for an output committed to `internal_key`
    pub fn new(internal_key: XOnlyPublicKey) -> Self {
        Self {
            internal_key,
            tree: None,
            tweak: None,
            control_block: None,
            leaf: None,
            witness: None,
            state: SpendState::Unbuilt,
        }
    }

    fn require(&self, expected: SpendState) -> TaprootResult<()> {
        if self.state != expected {
            return Err(TaprootError::precondition(
                expected.to_string(),
                self.state.to_string(),
            ));
        }
        Ok(())
    }

    /// Fix the script tree; use `ScriptTree::empty()` for a key-only output
    pub fn freeze_tree(&mut self, tree: Arc<ScriptTree>) -> TaprootResult<()> {
        self.require(SpendState::Unbuilt)?;
        log::debug!(
            "Freezing tree with {} leaves, depth {}",
            tree.leaf_count(),
            tree.depth()
        );
        self.tree = Some(tree);
        self.state = SpendState::TreeFrozen;
        Ok(())
    }

    /// Commit the frozen tree into the internal key
    pub fn tweak<C: Verification>(&mut self, secp: &Secp256k1<C>) -> TaprootResult<TweakResult> {
        self.require(SpendState::TreeFrozen)?;
        let root = self.tree.as_ref().and_then(|tree| tree.merkle_root());
        let result = tweak_public_key(secp, &self.internal_key, root)?;
        self.tweak = Some(result);
        self.state = SpendState::Tweaked;
        Ok(result)
    }

    /// Choose the key path
    pub fn key_path(&mut self) -> TaprootResult<()> {
        self.require(SpendState::Tweaked)?;
        self.state = SpendState::KeyPathReady;
        Ok(())
    }

    /// Choose the script path through `leaf` and build its control block.
    ///
    /// # Errors
    /// - `PreconditionViolated` if not tweaked, or if `leaf` is not a leaf
    ///   of the frozen tree, including ids issued by another tree
    pub fn script_path(&mut self, leaf: NodeId) -> TaprootResult<&ControlBlock> {
        self.require(SpendState::Tweaked)?;
        let (tree, tweak) = match (&self.tree, &self.tweak) {
            (Some(tree), Some(tweak)) => (tree, tweak),
            _ => return Err(TaprootError::precondition("a frozen and tweaked tree", "none")),
        };
        let control_block = ControlBlock::build(tree, leaf, self.internal_key, tweak.parity)?;
        log::debug!(
            "Script path through leaf {}: control block of {} bytes",
            leaf,
            control_block.size()
        );

        self.leaf = Some(leaf);
        self.state = SpendState::ScriptPathReady;
        Ok(&*self.control_block.insert(control_block))
    }

    /// Sign `sighash` with the tweaked key and produce the key-path witness.
    ///
    /// # Errors
    /// - `InvalidKey` if `keypair` is not the internal key
    pub fn sign_key_path<C: Signing>(
        &mut self,
        secp: &Secp256k1<C>,
        keypair: &Keypair,
        sighash: [u8; 32],
    ) -> TaprootResult<&Witness> {
        self.require(SpendState::KeyPathReady)?;
        let (signer, _) = keypair.x_only_public_key();
        if signer != self.internal_key {
            return Err(TaprootError::key(format!(
                "keypair for {} does not match internal key {}",
                signer, self.internal_key
            )));
        }

        let root = self.tree.as_ref().and_then(|tree| tree.merkle_root());
        let tweaked = tweak_keypair(secp, keypair, root)?;
        let message = Message::from_digest(sighash);
        let aux_rand: [u8; 32] = rand::random();
        let signature = secp.sign_schnorr_with_aux_rand(&message, &tweaked, &aux_rand);

        let mut witness = Witness::new();
        witness.push(signature.serialize());
        self.state = SpendState::Witnessed;
        Ok(&*self.witness.insert(witness))
    }

    /// Produce the script-path witness `[..stack, script, control block]`
    pub fn witness_script_path(&mut self, stack: Vec<Vec<u8>>) -> TaprootResult<&Witness> {
        self.require(SpendState::ScriptPathReady)?;
        let (tree, leaf, control_block) = match (&self.tree, self.leaf, &self.control_block) {
            (Some(tree), Some(leaf), Some(control_block)) => (tree, leaf, control_block),
            _ => return Err(TaprootError::precondition("a selected leaf", "none")),
        };
        let script = tree
            .leaf(leaf)
            .map(|l| l.script().to_owned())
            .ok_or_else(|| TaprootError::precondition("a leaf of the tree", leaf.to_string()))?;

        let mut witness = Witness::new();
        for item in &stack {
            witness.push(item);
        }
        witness.push(script.as_bytes());
        witness.push(control_block.serialize());
        self.state = SpendState::Witnessed;
        Ok(&*self.witness.insert(witness))
    }

    /// Current lifecycle state
    pub fn state(&self) -> SpendState {
        self.state
    }

    /// Untweaked key the output commits to
    pub fn internal_key(&self) -> XOnlyPublicKey {
        self.internal_key
    }

    /// Frozen script tree; its leaf ids are the ones `script_path` accepts
    pub fn tree(&self) -> Option<&Arc<ScriptTree>> {
        self.tree.as_ref()
    }

    /// Output key and parity, once tweaked
    pub fn output_key(&self) -> Option<TweakResult> {
        self.tweak
    }

    /// Control block of the chosen leaf, on the script path
    pub fn control_block(&self) -> Option<&ControlBlock> {
        self.control_block.as_ref()
    }

    /// Final witness, once built
    pub fn witness(&self) -> Option<&Witness> {
        self.witness.as_ref()
    }

    /// P2TR address of the output being spent
    pub fn address(&self, network: Network) -> TaprootResult<String> {
        let tweak = self
            .tweak
            .ok_or_else(|| TaprootError::precondition("Tweaked", self.state.to_string()))?;
        Ok(encode_address(&tweak.output_key, network))
    }
}
