//! # Script Leaves
//!
//! A leaf is one alternative spending condition: a tapscript plus the leaf
//! version it is interpreted under. Its commitment hash is
//!
//! ```text
//! tagged_hash("TapLeaf", leaf_version || compact_size(len(script)) || script)
//! ```

use crate::config::taproot::{ANNEX_TAG, MAX_LEAF_SCRIPT_SIZE, TAPSCRIPT_LEAF_VERSION};
use crate::error::{TaprootError, TaprootResult};
use crate::tagged_hash::TapLeafHash;
use bitcoin::consensus::encode::{serialize, VarInt};
use bitcoin::{Script, ScriptBuf};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Leaf version byte; always even and never the annex tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LeafVersion(u8);

impl LeafVersion {
    /// BIP342 tapscript (`0xc0`)
    pub const TAPSCRIPT: LeafVersion = LeafVersion(TAPSCRIPT_LEAF_VERSION);

    /// Validate a leaf version byte
    pub fn from_consensus(version: u8) -> TaprootResult<Self> {
        if version & 1 != 0 || version == ANNEX_TAG {
            return Err(TaprootError::InvalidLeafVersion { version });
        }
        Ok(LeafVersion(version))
    }

    /// The raw version byte
    pub fn to_consensus(self) -> u8 {
        self.0
    }
}

impl Default for LeafVersion {
    fn default() -> Self {
        LeafVersion::TAPSCRIPT
    }
}

impl fmt::Display for LeafVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// Bitcoin's CompactSize encoding of a length.
///
/// One byte below 253, otherwise a marker byte (`0xfd`, `0xfe`, `0xff`)
/// followed by a 2, 4 or 8 byte little-endian integer.
pub fn compact_size(len: usize) -> Vec<u8> {
    serialize(&VarInt(len as u64))
}

/// Compute the leaf hash for a version and raw script
pub fn compute_leaf_hash(version: LeafVersion, script: &Script) -> TapLeafHash {
    let mut engine = TapLeafHash::engine();
    engine.input(&[version.to_consensus()]);
    engine.input(&compact_size(script.len()));
    engine.input(script.as_bytes());
    TapLeafHash::from_engine(engine)
}

/// A single spending condition committed into the script tree
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "LeafSpec", into = "LeafSpec")]
pub struct Leaf {
    version: LeafVersion,
    script: ScriptBuf,
}

impl Leaf {
    /// Create a tapscript leaf
    pub fn new(script: ScriptBuf) -> TaprootResult<Self> {
        Self::with_version(script, LeafVersion::TAPSCRIPT)
    }

    /// Create a leaf with an explicit version.
    ///
    /// # Errors
    /// - `InvalidScript` if the script has a truncated push or exceeds
    ///   `MAX_LEAF_SCRIPT_SIZE`
    pub fn with_version(script: ScriptBuf, version: LeafVersion) -> TaprootResult<Self> {
        if script.len() > MAX_LEAF_SCRIPT_SIZE {
            return Err(TaprootError::script(format!(
                "script is {} bytes, maximum is {}",
                script.len(),
                MAX_LEAF_SCRIPT_SIZE
            )));
        }
        if let Some(Err(e)) = script.instructions().find(|ins| ins.is_err()) {
            return Err(TaprootError::script(format!("unparseable script: {}", e)));
        }
        Ok(Self { version, script })
    }

    /// Create a tapscript leaf from hex-encoded script bytes
    pub fn from_hex(script_hex: &str) -> TaprootResult<Self> {
        Self::new(ScriptBuf::from_bytes(hex::decode(script_hex)?))
    }

    /// Leaf version
    pub fn version(&self) -> LeafVersion {
        self.version
    }

    /// Leaf script
    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Commitment hash of this leaf
    pub fn leaf_hash(&self) -> TapLeafHash {
        compute_leaf_hash(self.version, &self.script)
    }
}

/// JSON form of a leaf: hex script plus optional version
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafSpec {
    /// Hex-encoded script bytes
    pub script: String,

    /// Leaf version byte, tapscript when omitted
    #[serde(default = "default_leaf_version")]
    pub version: u8,
}

fn default_leaf_version() -> u8 {
    TAPSCRIPT_LEAF_VERSION
}

impl TryFrom<LeafSpec> for Leaf {
    type Error = TaprootError;

    fn try_from(spec: LeafSpec) -> Result<Self, Self::Error> {
        let version = LeafVersion::from_consensus(spec.version)?;
        Leaf::with_version(ScriptBuf::from_bytes(hex::decode(&spec.script)?), version)
    }
}

impl From<Leaf> for LeafSpec {
    fn from(leaf: Leaf) -> Self {
        LeafSpec {
            script: hex::encode(leaf.script.as_bytes()),
            version: leaf.version.to_consensus(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::opcodes::all::OP_PUSHBYTES_32;

    #[test]
    fn test_compact_size_boundaries() {
        assert_eq!(compact_size(0), vec![0x00]);
        assert_eq!(compact_size(252), vec![0xfc]);
        assert_eq!(compact_size(253), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(compact_size(0xffff), vec![0xfd, 0xff, 0xff]);
        assert_eq!(compact_size(0x10000), vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(
            compact_size(0x1_0000_0000),
            vec![0xff, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_leaf_hash_vectors() {
        let op_true = Leaf::from_hex("51").unwrap();
        assert_eq!(
            op_true.leaf_hash().to_string(),
            "a85b2107f791b26a84e7586c28cec7cb61202ed3d01944d832500f363782d675"
        );

        let hash_lock = Leaf::from_hex(
            "a820936a185caaa266bb9cbe981e9e05cb78cd732b0b3280eb944412bb6f8f8f07af8851",
        )
        .unwrap();
        assert_eq!(
            hash_lock.leaf_hash().to_string(),
            "fe78d8523ce9603014b28739a51ef826f791aa17511e617af6dc96a8f10f659e"
        );
    }

    #[test]
    fn test_long_script_uses_extended_length() {
        let script = ScriptBuf::from_bytes(vec![0x51; 300]);
        let leaf = Leaf::new(script.clone()).unwrap();

        let mut preimage = vec![0xc0, 0xfd, 0x2c, 0x01];
        preimage.extend_from_slice(script.as_bytes());
        assert_eq!(
            leaf.leaf_hash().to_byte_array(),
            crate::tagged_hash::tagged_hash("TapLeaf", &preimage)
        );
    }

    #[test]
    fn test_leaf_version_validation() {
        assert!(LeafVersion::from_consensus(0xc0).is_ok());
        assert!(LeafVersion::from_consensus(0xc2).is_ok());
        assert!(matches!(
            LeafVersion::from_consensus(0xc1),
            Err(TaprootError::InvalidLeafVersion { version: 0xc1 })
        ));
        assert!(matches!(
            LeafVersion::from_consensus(0x50),
            Err(TaprootError::InvalidLeafVersion { .. })
        ));
    }

    #[test]
    fn test_version_changes_hash() {
        let script = ScriptBuf::from_bytes(vec![0x51]);
        let tapscript = Leaf::new(script.clone()).unwrap();
        let future = Leaf::with_version(script, LeafVersion::from_consensus(0xc2).unwrap()).unwrap();
        assert_ne!(tapscript.leaf_hash(), future.leaf_hash());
    }

    #[test]
    fn test_truncated_push_is_rejected() {
        // Announces a 32-byte push but carries only two bytes
        let script = ScriptBuf::from_bytes(vec![OP_PUSHBYTES_32.to_u8(), 0x01, 0x02]);
        assert!(matches!(
            Leaf::new(script),
            Err(TaprootError::InvalidScript { .. })
        ));
    }

    #[test]
    fn test_leaf_json() {
        let leaf: Leaf = serde_json::from_str(r#"{"script":"51"}"#).unwrap();
        assert_eq!(leaf.version(), LeafVersion::TAPSCRIPT);
        assert_eq!(leaf.script().as_bytes(), &[0x51]);

        let json = serde_json::to_string(&leaf).unwrap();
        assert_eq!(json, r#"{"script":"51","version":192}"#);

        assert!(serde_json::from_str::<Leaf>(r#"{"script":"51","version":193}"#).is_err());
        assert!(serde_json::from_str::<Leaf>(r#"{"script":"zz"}"#).is_err());
    }
}
