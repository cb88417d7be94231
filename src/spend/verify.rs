//! Witness verification against an output key

use crate::config::taproot::ANNEX_TAG;
use crate::control_block::ControlBlock;
use crate::error::{TaprootError, TaprootResult};
use crate::leaf::LeafVersion;
use crate::scripts::{ExecutionContext, ScriptInterpreter};
use bitcoin::secp256k1::{schnorr, Message, Secp256k1, Verification, XOnlyPublicKey};
use bitcoin::{Script, Witness};

/// A witness split into the parts of its spending path
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpendPath<'a> {
    /// Single signature for the tweaked key
    KeyPath { signature: &'a [u8] },

    /// Stack items, revealed script and control block bytes
    ScriptPath {
        stack: Vec<&'a [u8]>,
        script: &'a Script,
        control_block: &'a [u8],
    },
}

/// Split a witness into its spending path.
///
/// A trailing annex (two or more elements, last starting with `0x50`) is
/// dropped before classification.
///
/// # Errors
/// - `InvalidWitness` for an empty witness
pub fn classify_witness(witness: &Witness) -> TaprootResult<SpendPath<'_>> {
    let mut items: Vec<&[u8]> = witness.iter().collect();
    if items.len() >= 2 && items.last().and_then(|last| last.first()) == Some(&ANNEX_TAG) {
        log::debug!("Dropping annex of {} bytes", items[items.len() - 1].len());
        items.pop();
    }

    match items.as_slice() {
        [] => Err(TaprootError::witness("empty witness")),
        [signature] => Ok(SpendPath::KeyPath {
            signature: *signature,
        }),
        [stack @ .., script, control_block] => Ok(SpendPath::ScriptPath {
            stack: stack.to_vec(),
            script: Script::from_bytes(*script),
            control_block: *control_block,
        }),
    }
}

/// Verify a key-path signature against the output key.
///
/// # Errors
/// - `InvalidWitness` if the witness is not a key-path witness
/// - `InvalidSignature` if the signature is malformed or does not verify
pub fn verify_key_path<C: Verification>(
    secp: &Secp256k1<C>,
    output_key: &XOnlyPublicKey,
    witness: &Witness,
    sighash: [u8; 32],
) -> TaprootResult<()> {
    match classify_witness(witness)? {
        SpendPath::KeyPath { signature } => check_key_signature(secp, output_key, signature, sighash),
        SpendPath::ScriptPath { .. } => Err(TaprootError::witness(format!(
            "expected a single signature, got {} elements",
            witness.len()
        ))),
    }
}

fn check_key_signature<C: Verification>(
    secp: &Secp256k1<C>,
    output_key: &XOnlyPublicKey,
    signature: &[u8],
    sighash: [u8; 32],
) -> TaprootResult<()> {
    let raw = match signature.len() {
        64 => signature,
        65 if signature[64] != 0 => &signature[..64],
        n => {
            return Err(TaprootError::InvalidSignature {
                message: format!("signature of {} bytes", n),
            })
        }
    };
    let signature = schnorr::Signature::from_slice(raw).map_err(|e| TaprootError::InvalidSignature {
        message: e.to_string(),
    })?;
    secp.verify_schnorr(&signature, &Message::from_digest(sighash), output_key)
        .map_err(|_| TaprootError::InvalidSignature {
            message: format!("signature does not verify for output key {}", output_key),
        })
}

/// Verify a script-path witness: commitment first, then script execution.
///
/// # Errors
/// - `InvalidWitness` if the witness is not a script-path witness
/// - `MalformedControlBlock` if the control block cannot be parsed
/// - `CommitmentMismatch` if the script is not committed in `output_key`
/// - `ScriptExecution` if the script rejects the stack
pub fn verify_script_path<C: Verification>(
    secp: &Secp256k1<C>,
    output_key: &XOnlyPublicKey,
    witness: &Witness,
    interpreter: &dyn ScriptInterpreter,
    ctx: &ExecutionContext,
) -> TaprootResult<ControlBlock> {
    match classify_witness(witness)? {
        SpendPath::ScriptPath {
            stack,
            script,
            control_block,
        } => check_script_path(secp, output_key, &stack, script, control_block, interpreter, ctx),
        SpendPath::KeyPath { .. } => Err(TaprootError::witness(
            "expected stack items, script and control block, got a single element",
        )),
    }
}

fn check_script_path<C: Verification>(
    secp: &Secp256k1<C>,
    output_key: &XOnlyPublicKey,
    stack: &[&[u8]],
    script: &Script,
    control_block: &[u8],
    interpreter: &dyn ScriptInterpreter,
    ctx: &ExecutionContext,
) -> TaprootResult<ControlBlock> {
    let control_block = ControlBlock::decode(control_block)?;
    control_block.verify_taproot_commitment(secp, output_key, script)?;

    if control_block.leaf_version != LeafVersion::TAPSCRIPT {
        return Err(TaprootError::execution(format!(
            "leaf version {} has no interpreter",
            control_block.leaf_version
        )));
    }
    interpreter.execute(script, stack, ctx)?;
    log::debug!(
        "Script path verified at depth {} for {}",
        control_block.merkle_branch.len(),
        output_key
    );
    Ok(control_block)
}

/// Verify any Taproot witness, dispatching on its shape.
///
/// The key path checks the signature against `ctx.sighash`.
pub fn verify_witness<C: Verification>(
    secp: &Secp256k1<C>,
    output_key: &XOnlyPublicKey,
    witness: &Witness,
    interpreter: &dyn ScriptInterpreter,
    ctx: &ExecutionContext,
) -> TaprootResult<()> {
    match classify_witness(witness)? {
        SpendPath::KeyPath { signature } => {
            check_key_signature(secp, output_key, signature, ctx.sighash)
        }
        SpendPath::ScriptPath {
            stack,
            script,
            control_block,
        } => check_script_path(secp, output_key, &stack, script, control_block, interpreter, ctx)
            .map(|_| ()),
    }
}
