//! # BIP340 Tagged Hashes
//!
//! `tagged_hash(tag, data) = SHA256(SHA256(tag) || SHA256(tag) || data)`.
//!
//! Every hash in a Taproot commitment is tagged. The three tags are bound to
//! marker types, and each output type can only be produced by an engine for
//! its own tag, so a leaf hash can never be computed with the branch tag.

use sha2::{Digest, Sha256};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

/// A BIP340 hash tag known at compile time
pub trait HashTag {
    /// The tag string hashed into the prefix
    const NAME: &'static str;
}

/// Tag for leaf commitments
#[derive(Debug)]
pub enum TapLeafTag {}

/// Tag for branch commitments
#[derive(Debug)]
pub enum TapBranchTag {}

/// Tag for the key tweak
#[derive(Debug)]
pub enum TapTweakTag {}

impl HashTag for TapLeafTag {
    const NAME: &'static str = "TapLeaf";
}

impl HashTag for TapBranchTag {
    const NAME: &'static str = "TapBranch";
}

impl HashTag for TapTweakTag {
    const NAME: &'static str = "TapTweak";
}

/// Compute a tagged hash for an arbitrary runtime tag
pub fn tagged_hash(tag: &str, data: &[u8]) -> [u8; 32] {
    let mut engine = prefixed_engine(tag);
    engine.update(data);
    engine.finalize().into()
}

fn prefixed_engine(tag: &str) -> Sha256 {
    let tag_hash = Sha256::digest(tag.as_bytes());
    let mut engine = Sha256::new();
    engine.update(tag_hash.as_slice());
    engine.update(tag_hash.as_slice());
    engine
}

/// Incremental tagged-hash engine for a fixed tag
pub struct TaggedEngine<T: HashTag> {
    engine: Sha256,
    _tag: PhantomData<T>,
}

impl<T: HashTag> TaggedEngine<T> {
    /// Start a new engine with the tag prefix already absorbed
    pub fn new() -> Self {
        Self {
            engine: prefixed_engine(T::NAME),
            _tag: PhantomData,
        }
    }

    /// Absorb more data
    pub fn input(&mut self, data: &[u8]) {
        self.engine.update(data);
    }

    fn finalize(self) -> [u8; 32] {
        self.engine.finalize().into()
    }
}

impl<T: HashTag> Default for TaggedEngine<T> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! tap_hash_type {
    ($(#[$meta:meta])* $name:ident, $tag:ty) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Start an engine for this hash's tag
            pub fn engine() -> TaggedEngine<$tag> {
                TaggedEngine::new()
            }

            /// Finish an engine into this hash type
            pub fn from_engine(engine: TaggedEngine<$tag>) -> Self {
                Self(engine.finalize())
            }

            /// Wrap raw bytes that are already known to be this kind of hash
            pub const fn from_byte_array(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Raw hash bytes
            pub const fn to_byte_array(self) -> [u8; 32] {
                self.0
            }

            /// Borrow the raw hash bytes
            pub fn as_byte_array(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = hex::FromHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut bytes = [0u8; 32];
                hex::decode_to_slice(s, &mut bytes)?;
                Ok(Self(bytes))
            }
        }
    };
}

tap_hash_type!(
    /// Hash of a single leaf: `tagged_hash("TapLeaf", version || compact_size || script)`
    TapLeafHash,
    TapLeafTag
);

tap_hash_type!(
    /// Hash of any tree node; a leaf hash or a branch hash
    TapNodeHash,
    TapBranchTag
);

tap_hash_type!(
    /// Scalar bytes added to the internal key
    TapTweakHash,
    TapTweakTag
);

impl From<TapLeafHash> for TapNodeHash {
    fn from(leaf: TapLeafHash) -> Self {
        TapNodeHash(leaf.0)
    }
}

impl TapNodeHash {
    /// Combine two child hashes into their parent.
    ///
    /// Children are sorted before hashing, which makes the result
    /// independent of child order.
    pub fn from_node_hashes(a: TapNodeHash, b: TapNodeHash) -> TapNodeHash {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        let mut engine = TapNodeHash::engine();
        engine.input(first.as_ref());
        engine.input(second.as_ref());
        TapNodeHash::from_engine(engine)
    }
}
