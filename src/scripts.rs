//! # Leaf Script Templates
//!
//! The closed set of tapscripts this crate knows how to build, recognize and
//! execute. It is not a general script interpreter: `TemplateInterpreter`
//! only runs scripts that `LeafScript::from_script` recognizes and rejects
//! everything else.
//!
//! ## Templates
//!
//! ```text
//! HashLock      OP_SHA256 <digest> OP_EQUALVERIFY OP_TRUE
//! CheckSig      <key> OP_CHECKSIG
//! CsvCheckSig   <blocks> OP_CSV OP_DROP <key> OP_CHECKSIG
//! Multisig      <k1> OP_CHECKSIG <k2> OP_CHECKSIGADD ... <m> OP_NUMEQUAL
//! Inscription   <key> OP_CHECKSIG OP_0 OP_IF "ord" OP_1 <content type>
//!               OP_0 <body chunks> OP_ENDIF
//! ```
//!
//! Stack items passed to the interpreter are in witness order, bottom of the
//! stack first, exactly as they precede the script in a script-path witness.

use crate::error::{TaprootError, TaprootResult};
use crate::leaf::Leaf;
use bitcoin::blockdata::script::{Builder, Instruction, PushBytes};
use bitcoin::opcodes::all::{
    OP_CHECKSIG, OP_CHECKSIGADD, OP_CSV, OP_DROP, OP_ENDIF, OP_EQUALVERIFY, OP_IF, OP_NUMEQUAL,
    OP_PUSHNUM_1, OP_PUSHNUM_16, OP_SHA256,
};
use bitcoin::opcodes::OP_0;
use bitcoin::secp256k1::{schnorr, Message, Secp256k1, VerifyOnly, XOnlyPublicKey};
use bitcoin::transaction::Version;
use bitcoin::{Script, ScriptBuf, Sequence};
use sha2::{Digest, Sha256};
use std::fmt;

/// Marker pushed at the start of an inscription envelope
pub const INSCRIPTION_MARKER: &[u8] = b"ord";

/// Largest single push allowed in tapscript
pub const MAX_PUSH_SIZE: usize = 520;

/// `nSequence` bit that disables relative lock-time
const SEQUENCE_DISABLE_FLAG: u32 = 1 << 31;

/// `nSequence` bit selecting time-based (rather than block-based) lock-time
const SEQUENCE_TYPE_FLAG: u32 = 1 << 22;

const SEQUENCE_VALUE_MASK: u32 = 0x0000_ffff;

/// SHA256 digest committed by a hash lock
pub fn hash_lock_digest(preimage: &[u8]) -> [u8; 32] {
    Sha256::digest(preimage).into()
}

/// Known leaf script shapes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeafScript {
    /// Spendable by revealing the SHA256 preimage of `digest`
    HashLock { digest: [u8; 32] },

    /// Single-key Schnorr signature
    CheckSig { key: XOnlyPublicKey },

    /// Signature after a relative lock-time of `blocks`
    CsvCheckSig { blocks: u16, key: XOnlyPublicKey },

    /// `threshold`-of-n signatures using `OP_CHECKSIGADD`
    Multisig {
        threshold: usize,
        keys: Vec<XOnlyPublicKey>,
    },

    /// Single-key spend carrying an Ordinals-style inscription envelope
    Inscription {
        key: XOnlyPublicKey,
        content_type: String,
        body: Vec<u8>,
    },
}

impl LeafScript {
    /// Hash lock on the SHA256 of `preimage`
    pub fn hash_lock(preimage: &[u8]) -> Self {
        LeafScript::HashLock {
            digest: hash_lock_digest(preimage),
        }
    }

    /// Short template name
    pub fn name(&self) -> &'static str {
        match self {
            LeafScript::HashLock { .. } => "hash-lock",
            LeafScript::CheckSig { .. } => "checksig",
            LeafScript::CsvCheckSig { .. } => "csv-checksig",
            LeafScript::Multisig { .. } => "multisig",
            LeafScript::Inscription { .. } => "inscription",
        }
    }

    /// Assemble the script.
    ///
    /// # Errors
    /// - `InvalidScript` for a multisig threshold outside `1..=n` or an
    ///   inscription content type longer than one push
    pub fn to_script(&self) -> TaprootResult<ScriptBuf> {
        let script = match self {
            LeafScript::HashLock { digest } => Builder::new()
                .push_opcode(OP_SHA256)
                .push_slice(digest)
                .push_opcode(OP_EQUALVERIFY)
                .push_opcode(OP_PUSHNUM_1)
                .into_script(),

            LeafScript::CheckSig { key } => Builder::new()
                .push_x_only_key(key)
                .push_opcode(OP_CHECKSIG)
                .into_script(),

            LeafScript::CsvCheckSig { blocks, key } => Builder::new()
                .push_int(i64::from(*blocks))
                .push_opcode(OP_CSV)
                .push_opcode(OP_DROP)
                .push_x_only_key(key)
                .push_opcode(OP_CHECKSIG)
                .into_script(),

            LeafScript::Multisig { threshold, keys } => {
                if keys.is_empty() || *threshold == 0 || *threshold > keys.len() {
                    return Err(TaprootError::script(format!(
                        "multisig threshold {} of {} keys",
                        threshold,
                        keys.len()
                    )));
                }
                let mut builder = Builder::new();
                for (index, key) in keys.iter().enumerate() {
                    builder = builder.push_x_only_key(key).push_opcode(if index == 0 {
                        OP_CHECKSIG
                    } else {
                        OP_CHECKSIGADD
                    });
                }
                builder
                    .push_int(*threshold as i64)
                    .push_opcode(OP_NUMEQUAL)
                    .into_script()
            }

            LeafScript::Inscription {
                key,
                content_type,
                body,
            } => {
                let mut builder = Builder::new()
                    .push_x_only_key(key)
                    .push_opcode(OP_CHECKSIG)
                    .push_opcode(OP_0)
                    .push_opcode(OP_IF)
                    .push_slice(push_bytes(INSCRIPTION_MARKER)?)
                    .push_opcode(OP_PUSHNUM_1)
                    .push_slice(push_bytes(content_type.as_bytes())?)
                    .push_opcode(OP_0);
                for chunk in body.chunks(MAX_PUSH_SIZE) {
                    builder = builder.push_slice(push_bytes(chunk)?);
                }
                builder.push_opcode(OP_ENDIF).into_script()
            }
        };
        Ok(script)
    }

    /// Assemble the script as a tapscript leaf
    pub fn to_leaf(&self) -> TaprootResult<Leaf> {
        Leaf::new(self.to_script()?)
    }

    /// Recognize a script built by `to_script`.
    ///
    /// Returns `None` for anything else, including non-canonical encodings
    /// of a known shape.
    pub fn from_script(script: &Script) -> Option<Self> {
        let instructions = script
            .instructions()
            .collect::<Result<Vec<_>, _>>()
            .ok()?;
        let candidate = recognize(&instructions)?;
        match candidate.to_script() {
            Ok(rebuilt) if rebuilt.as_script() == script => Some(candidate),
            _ => None,
        }
    }
}

impl fmt::Display for LeafScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeafScript::HashLock { digest } => write!(f, "hash-lock({})", hex::encode(digest)),
            LeafScript::CheckSig { key } => write!(f, "checksig({})", key),
            LeafScript::CsvCheckSig { blocks, key } => {
                write!(f, "csv-checksig({} blocks, {})", blocks, key)
            }
            LeafScript::Multisig { threshold, keys } => {
                write!(f, "multisig({}-of-{})", threshold, keys.len())
            }
            LeafScript::Inscription {
                content_type, body, ..
            } => write!(f, "inscription({}, {} bytes)", content_type, body.len()),
        }
    }
}

fn push_bytes(data: &[u8]) -> TaprootResult<&PushBytes> {
    <&PushBytes>::try_from(data)
        .map_err(|_| TaprootError::script(format!("push of {} bytes is too large", data.len())))
}

fn recognize(ins: &[Instruction<'_>]) -> Option<LeafScript> {
    use Instruction::{Op, PushBytes as Push};

    match ins {
        [Op(sha), Push(digest), Op(eqv), Op(one)]
            if *sha == OP_SHA256 && *eqv == OP_EQUALVERIFY && *one == OP_PUSHNUM_1 =>
        {
            Some(LeafScript::HashLock {
                digest: digest.as_bytes().try_into().ok()?,
            })
        }

        [Push(key), Op(cs)] if *cs == OP_CHECKSIG => Some(LeafScript::CheckSig {
            key: x_only(key.as_bytes())?,
        }),

        [blocks, Op(csv), Op(drop), Push(key), Op(cs)]
            if *csv == OP_CSV && *drop == OP_DROP && *cs == OP_CHECKSIG =>
        {
            Some(LeafScript::CsvCheckSig {
                blocks: u16::try_from(read_int(blocks)?).ok()?,
                key: x_only(key.as_bytes())?,
            })
        }

        [Push(key), Op(cs), Push(zero), Op(op_if), Push(marker), Op(one), Push(ct), Push(sep), rest @ ..]
            if *cs == OP_CHECKSIG
                && zero.as_bytes().is_empty()
                && *op_if == OP_IF
                && marker.as_bytes() == INSCRIPTION_MARKER
                && *one == OP_PUSHNUM_1
                && sep.as_bytes().is_empty() =>
        {
            let (last, chunks) = rest.split_last()?;
            if !matches!(last, Op(op) if *op == OP_ENDIF) {
                return None;
            }
            let mut body = Vec::new();
            for chunk in chunks {
                match chunk {
                    Push(bytes) => body.extend_from_slice(bytes.as_bytes()),
                    Op(_) => return None,
                }
            }
            Some(LeafScript::Inscription {
                key: x_only(key.as_bytes())?,
                content_type: String::from_utf8(ct.as_bytes().to_vec()).ok()?,
                body,
            })
        }

        [Push(_), Op(cs), .., threshold, Op(numeq)] if *cs == OP_CHECKSIG && *numeq == OP_NUMEQUAL => {
            let body = &ins[..ins.len() - 2];
            let mut keys = Vec::with_capacity(body.len() / 2);
            for (index, pair) in body.chunks(2).enumerate() {
                let expected = if index == 0 { OP_CHECKSIG } else { OP_CHECKSIGADD };
                match pair {
                    [Push(key), Op(op)] if *op == expected => keys.push(x_only(key.as_bytes())?),
                    _ => return None,
                }
            }
            Some(LeafScript::Multisig {
                threshold: usize::try_from(read_int(threshold)?).ok()?,
                keys,
            })
        }

        _ => None,
    }
}

fn x_only(bytes: &[u8]) -> Option<XOnlyPublicKey> {
    XOnlyPublicKey::from_slice(bytes).ok()
}

/// Small integer from `OP_0`, `OP_1`..`OP_16`, or a minimal script number push
fn read_int(ins: &Instruction<'_>) -> Option<i64> {
    match ins {
        Instruction::Op(op) => {
            let byte = op.to_u8();
            if (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_16.to_u8()).contains(&byte) {
                Some(i64::from(byte - OP_PUSHNUM_1.to_u8() + 1))
            } else {
                None
            }
        }
        Instruction::PushBytes(bytes) => decode_script_num(bytes.as_bytes()),
    }
}

/// Decode a little-endian sign-magnitude script number of at most 4 bytes
fn decode_script_num(bytes: &[u8]) -> Option<i64> {
    if bytes.len() > 4 {
        return None;
    }
    let Some((&last, _)) = bytes.split_last() else {
        return Some(0);
    };
    let mut value: i64 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        value |= i64::from(*byte) << (8 * i);
    }
    if last & 0x80 != 0 {
        value &= !(0x80i64 << (8 * (bytes.len() - 1)));
        value = -value;
    }
    Some(value)
}

/// Spending transaction data a script can observe
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionContext {
    /// BIP341 signature message digest for the input being spent
    pub sighash: [u8; 32],

    /// `nSequence` of the input being spent
    pub sequence: Sequence,

    /// Version of the spending transaction; relative lock-times need 2 or more
    pub tx_version: Version,
}

impl ExecutionContext {
    /// Context with a sighash, a final sequence and a version 2 transaction
    pub fn new(sighash: [u8; 32]) -> Self {
        Self {
            sighash,
            sequence: Sequence::MAX,
            tx_version: Version::TWO,
        }
    }

    /// Replace the input sequence
    pub fn with_sequence(mut self, sequence: Sequence) -> Self {
        self.sequence = sequence;
        self
    }

    /// Replace the transaction version
    pub fn with_tx_version(mut self, tx_version: Version) -> Self {
        self.tx_version = tx_version;
        self
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new([0u8; 32])
    }
}

/// Executes a revealed leaf script against its witness stack
pub trait ScriptInterpreter: Send + Sync {
    /// Succeed iff the script accepts `stack`.
    ///
    /// # Errors
    /// - `ScriptExecution` when the script fails or is not supported
    fn execute(&self, script: &Script, stack: &[&[u8]], ctx: &ExecutionContext)
        -> TaprootResult<()>;
}

/// Interpreter for the `LeafScript` templates
pub struct TemplateInterpreter {
    secp: Secp256k1<VerifyOnly>,
}

impl TemplateInterpreter {
    /// Interpreter with its own verification-only secp context
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::verification_only(),
        }
    }

    /// BIP342 `OP_CHECKSIG` on one stack item.
    ///
    /// An empty signature yields `false`; any other signature must be valid.
    fn check_sig(
        &self,
        key: &XOnlyPublicKey,
        sig: &[u8],
        ctx: &ExecutionContext,
    ) -> TaprootResult<bool> {
        let raw = match sig.len() {
            0 => return Ok(false),
            64 => sig,
            65 if sig[64] != 0 => &sig[..64],
            n => {
                return Err(TaprootError::execution(format!(
                    "signature of {} bytes has the wrong size",
                    n
                )))
            }
        };
        let signature = schnorr::Signature::from_slice(raw)
            .map_err(|e| TaprootError::execution(format!("unparseable signature: {}", e)))?;
        let message = Message::from_digest(ctx.sighash);
        self.secp
            .verify_schnorr(&signature, &message, key)
            .map_err(|_| TaprootError::execution(format!("signature does not verify for {}", key)))?;
        Ok(true)
    }

    fn single_sig(
        &self,
        key: &XOnlyPublicKey,
        stack: &[&[u8]],
        ctx: &ExecutionContext,
    ) -> TaprootResult<()> {
        let [sig] = stack else {
            return Err(TaprootError::execution(format!(
                "expected 1 stack item, got {}",
                stack.len()
            )));
        };
        if self.check_sig(key, sig, ctx)? {
            Ok(())
        } else {
            Err(TaprootError::execution("empty signature"))
        }
    }

    /// BIP112 relative lock-time check in blocks
    fn check_sequence(blocks: u16, ctx: &ExecutionContext) -> TaprootResult<()> {
        // BIP68 compares the version as unsigned
        if (ctx.tx_version.0 as u32) < 2 {
            return Err(TaprootError::execution(format!(
                "relative lock-time needs transaction version 2, got {}",
                ctx.tx_version.0
            )));
        }
        let raw = ctx.sequence.to_consensus_u32();
        if raw & SEQUENCE_DISABLE_FLAG != 0 {
            return Err(TaprootError::execution(
                "input sequence has relative lock-time disabled",
            ));
        }
        if raw & SEQUENCE_TYPE_FLAG != 0 {
            return Err(TaprootError::execution(
                "input sequence is time-based, script requires blocks",
            ));
        }
        let waited = raw & SEQUENCE_VALUE_MASK;
        if waited < u32::from(blocks) {
            return Err(TaprootError::execution(format!(
                "relative lock-time of {} blocks not met, sequence allows {}",
                blocks, waited
            )));
        }
        Ok(())
    }
}

impl Default for TemplateInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptInterpreter for TemplateInterpreter {
    fn execute(
        &self,
        script: &Script,
        stack: &[&[u8]],
        ctx: &ExecutionContext,
    ) -> TaprootResult<()> {
        let template = LeafScript::from_script(script).ok_or_else(|| {
            TaprootError::execution(format!("unsupported script {}", hex::encode(script.as_bytes())))
        })?;
        log::debug!("Executing {} with {} stack items", template, stack.len());

        match &template {
            LeafScript::HashLock { digest } => {
                let [preimage] = stack else {
                    return Err(TaprootError::execution(format!(
                        "hash lock expects 1 stack item, got {}",
                        stack.len()
                    )));
                };
                if hash_lock_digest(preimage) != *digest {
                    return Err(TaprootError::execution("preimage does not match hash lock"));
                }
                Ok(())
            }

            LeafScript::CheckSig { key } | LeafScript::Inscription { key, .. } => {
                self.single_sig(key, stack, ctx)
            }

            LeafScript::CsvCheckSig { blocks, key } => {
                Self::check_sequence(*blocks, ctx)?;
                self.single_sig(key, stack, ctx)
            }

            LeafScript::Multisig { threshold, keys } => {
                if stack.len() != keys.len() {
                    return Err(TaprootError::execution(format!(
                        "multisig expects {} stack items, got {}",
                        keys.len(),
                        stack.len()
                    )));
                }
                // The first key consumes the top of the stack, i.e. the last
                // witness item
                let mut valid = 0usize;
                for (key, sig) in keys.iter().zip(stack.iter().rev()) {
                    if self.check_sig(key, sig, ctx)? {
                        valid += 1;
                    }
                }
                if valid != *threshold {
                    return Err(TaprootError::execution(format!(
                        "{} valid signatures, threshold is {}",
                        valid, threshold
                    )));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::secp256k1::{Keypair, SecretKey};

    const HELLOWORLD_SCRIPT: &str =
        "a820936a185caaa266bb9cbe981e9e05cb78cd732b0b3280eb944412bb6f8f8f07af8851";

    fn keypair(seed: u8) -> Keypair {
        let secp = Secp256k1::new();
        Keypair::from_secret_key(&secp, &SecretKey::from_slice(&[seed; 32]).unwrap())
    }

    fn sign(keypair: &Keypair, sighash: [u8; 32]) -> Vec<u8> {
        let secp = Secp256k1::new();
        secp.sign_schnorr_no_aux_rand(&Message::from_digest(sighash), keypair)
            .serialize()
            .to_vec()
    }

    #[test]
    fn test_hash_lock_script_bytes() {
        let script = LeafScript::hash_lock(b"helloworld").to_script().unwrap();
        assert_eq!(hex::encode(script.as_bytes()), HELLOWORLD_SCRIPT);
    }

    #[test]
    fn test_recognizes_every_template() {
        let key = keypair(1).x_only_public_key().0;
        let templates = vec![
            LeafScript::hash_lock(b"helloworld"),
            LeafScript::CheckSig { key },
            LeafScript::CsvCheckSig { blocks: 144, key },
            LeafScript::CsvCheckSig { blocks: 5, key },
            LeafScript::Multisig {
                threshold: 2,
                keys: vec![key, keypair(2).x_only_public_key().0, keypair(3).x_only_public_key().0],
            },
            LeafScript::Multisig {
                threshold: 1,
                keys: vec![key],
            },
            LeafScript::Inscription {
                key,
                content_type: "text/plain;charset=utf-8".to_string(),
                body: br#"{"p":"brc-20","op":"mint","tick":"DEMO","amt":"1000"}"#.to_vec(),
            },
            LeafScript::Inscription {
                key,
                content_type: "application/octet-stream".to_string(),
                body: vec![0xab; 1200],
            },
        ];
        for template in templates {
            let script = template.to_script().unwrap();
            assert_eq!(LeafScript::from_script(&script), Some(template.clone()), "{}", template);
        }
    }

    #[test]
    fn test_unknown_scripts_are_not_recognized() {
        assert_eq!(LeafScript::from_script(&ScriptBuf::from_bytes(vec![0x51])), None);
        // Hash lock digest of the wrong length
        let short = Builder::new()
            .push_opcode(OP_SHA256)
            .push_slice([0u8; 20])
            .push_opcode(OP_EQUALVERIFY)
            .push_opcode(OP_PUSHNUM_1)
            .into_script();
        assert_eq!(LeafScript::from_script(&short), None);
    }

    #[test]
    fn test_invalid_multisig_threshold() {
        let key = keypair(1).x_only_public_key().0;
        let bad = LeafScript::Multisig {
            threshold: 2,
            keys: vec![key],
        };
        assert!(matches!(bad.to_script(), Err(TaprootError::InvalidScript { .. })));
    }

    #[test]
    fn test_script_num_decoding() {
        assert_eq!(decode_script_num(&[]), Some(0));
        assert_eq!(decode_script_num(&[0x90, 0x00]), Some(144));
        assert_eq!(decode_script_num(&[0x81]), Some(-1));
        assert_eq!(decode_script_num(&[0xff, 0xff, 0x00]), Some(0xffff));
        assert_eq!(decode_script_num(&[0, 0, 0, 0, 1]), None);
    }

    #[test]
    fn test_hash_lock_execution() {
        let interpreter = TemplateInterpreter::new();
        let script = LeafScript::hash_lock(b"helloworld").to_script().unwrap();
        let ctx = ExecutionContext::default();

        assert!(interpreter.execute(&script, &[b"helloworld".as_slice()], &ctx).is_ok());
        assert!(matches!(
            interpreter.execute(&script, &[b"helloworld!".as_slice()], &ctx),
            Err(TaprootError::ScriptExecution { .. })
        ));
        assert!(matches!(
            interpreter.execute(&script, &[], &ctx),
            Err(TaprootError::ScriptExecution { .. })
        ));
    }

    #[test]
    fn test_checksig_execution() {
        let interpreter = TemplateInterpreter::new();
        let signer = keypair(7);
        let script = LeafScript::CheckSig {
            key: signer.x_only_public_key().0,
        }
        .to_script()
        .unwrap();
        let ctx = ExecutionContext::new([0x42; 32]);

        let sig = sign(&signer, ctx.sighash);
        assert!(interpreter.execute(&script, &[sig.as_slice()], &ctx).is_ok());

        let mut with_type = sig.clone();
        with_type.push(0x01);
        assert!(interpreter.execute(&script, &[with_type.as_slice()], &ctx).is_ok());

        let other_ctx = ExecutionContext::new([0x43; 32]);
        assert!(interpreter.execute(&script, &[sig.as_slice()], &other_ctx).is_err());
        assert!(interpreter.execute(&script, &[&[][..]], &ctx).is_err());
    }

    #[test]
    fn test_csv_execution() {
        let interpreter = TemplateInterpreter::new();
        let signer = keypair(8);
        let script = LeafScript::CsvCheckSig {
            blocks: 144,
            key: signer.x_only_public_key().0,
        }
        .to_script()
        .unwrap();
        let sighash = [0x11; 32];
        let sig = sign(&signer, sighash);

        let matured = ExecutionContext::new(sighash).with_sequence(Sequence::from_height(144));
        assert!(interpreter.execute(&script, &[sig.as_slice()], &matured).is_ok());

        let early = ExecutionContext::new(sighash).with_sequence(Sequence::from_height(143));
        assert!(interpreter.execute(&script, &[sig.as_slice()], &early).is_err());

        let disabled = ExecutionContext::new(sighash);
        assert!(interpreter.execute(&script, &[sig.as_slice()], &disabled).is_err());

        let time_based =
            ExecutionContext::new(sighash).with_sequence(Sequence::from_512_second_intervals(200));
        assert!(interpreter.execute(&script, &[sig.as_slice()], &time_based).is_err());

        let version_one = matured.with_tx_version(Version::ONE);
        assert!(matches!(
            interpreter.execute(&script, &[sig.as_slice()], &version_one),
            Err(TaprootError::ScriptExecution { .. })
        ));
        let version_three = matured.with_tx_version(Version::non_standard(3));
        assert!(interpreter.execute(&script, &[sig.as_slice()], &version_three).is_ok());
    }

    #[test]
    fn test_multisig_execution() {
        let interpreter = TemplateInterpreter::new();
        let signers = [keypair(11), keypair(12), keypair(13)];
        let script = LeafScript::Multisig {
            threshold: 2,
            keys: signers.iter().map(|k| k.x_only_public_key().0).collect(),
        }
        .to_script()
        .unwrap();
        let ctx = ExecutionContext::new([0x99; 32]);
        let sigs: Vec<Vec<u8>> = signers.iter().map(|k| sign(k, ctx.sighash)).collect();

        // Witness order is the reverse of key order
        let first_and_third: [&[u8]; 3] = [&sigs[2], &[], &sigs[0]];
        assert!(interpreter.execute(&script, &first_and_third, &ctx).is_ok());

        let only_one: [&[u8]; 3] = [&[], &[], &sigs[0]];
        assert!(interpreter.execute(&script, &only_one, &ctx).is_err());

        let all_three: [&[u8]; 3] = [&sigs[2], &sigs[1], &sigs[0]];
        assert!(interpreter.execute(&script, &all_three, &ctx).is_err());

        let wrong_order: [&[u8]; 3] = [&sigs[0], &[], &sigs[2]];
        assert!(interpreter.execute(&script, &wrong_order, &ctx).is_err());
    }

    #[test]
    fn test_unsupported_script_is_execution_error() {
        let interpreter = TemplateInterpreter::new();
        let result = interpreter.execute(
            &ScriptBuf::from_bytes(vec![0x51]),
            &[],
            &ExecutionContext::default(),
        );
        assert!(matches!(result, Err(TaprootError::ScriptExecution { .. })));
    }
}
