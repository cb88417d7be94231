//! # Taproot Key Tweaking
//!
//! Commits a script tree into a public key:
//!
//! ```text
//! t = tagged_hash("TapTweak", P || merkle_root)      (root omitted if absent)
//! Q = lift_x(P) + t * G
//! output_key = x(Q), parity = y(Q) mod 2
//! ```
//!
//! For key-path spending the matching private key is `d + t` when `d * G`
//! has an even y coordinate and `-d + t` otherwise, since x-only keys always
//! stand for the even-y point.

use crate::error::{TaprootError, TaprootResult};
use crate::tagged_hash::{TapNodeHash, TapTweakHash};
use bitcoin::secp256k1::{
    Keypair, Parity, PublicKey, Scalar, Secp256k1, Signing, Verification, XOnlyPublicKey,
};
use std::fmt;

/// Output key and its y-coordinate parity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TweakResult {
    /// X-only output key placed in the scriptPubKey
    pub output_key: XOnlyPublicKey,

    /// Parity of the full output point, carried in the control block
    pub parity: Parity,
}

impl fmt::Display for TweakResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} y)",
            self.output_key,
            if self.parity == Parity::Odd { "odd" } else { "even" }
        )
    }
}

/// `tagged_hash("TapTweak", internal_key || merkle_root)`
pub fn tap_tweak_hash(
    internal_key: &XOnlyPublicKey,
    merkle_root: Option<TapNodeHash>,
) -> TapTweakHash {
    let mut engine = TapTweakHash::engine();
    engine.input(&internal_key.serialize());
    if let Some(root) = merkle_root {
        engine.input(root.as_ref());
    }
    TapTweakHash::from_engine(engine)
}

/// Interpret a tweak hash as a scalar.
///
/// # Errors
/// - `InvalidTweak` if the hash is not below the curve order
pub fn tweak_scalar(tweak: TapTweakHash) -> TaprootResult<Scalar> {
    Scalar::from_be_bytes(tweak.to_byte_array())
        .map_err(|_| TaprootError::tweak(format!("tweak {} is not below the curve order", tweak)))
}

/// Tweak an internal key with an optional Merkle root.
///
/// # Errors
/// - `InvalidTweak` if the tweak overflows the curve order or the result is
///   the point at infinity
pub fn tweak_public_key<C: Verification>(
    secp: &Secp256k1<C>,
    internal_key: &XOnlyPublicKey,
    merkle_root: Option<TapNodeHash>,
) -> TaprootResult<TweakResult> {
    let tweak = tap_tweak_hash(internal_key, merkle_root);
    let scalar = tweak_scalar(tweak)?;

    let even_point = PublicKey::from_x_only_public_key(*internal_key, Parity::Even);
    let tweaked = even_point
        .add_exp_tweak(secp, &scalar)
        .map_err(|e| TaprootError::tweak(format!("tweaked point is invalid: {}", e)))?;
    let (output_key, parity) = tweaked.x_only_public_key();

    log::debug!(
        "Tweaked {} with root {:?}: output {} parity {:?}",
        internal_key,
        merkle_root.map(|root| root.to_string()),
        output_key,
        parity
    );
    Ok(TweakResult { output_key, parity })
}

/// Produce the keypair that signs for the tweaked output key.
///
/// # Errors
/// - `InvalidTweak` if the tweak overflows the curve order or the tweaked
///   secret is zero
pub fn tweak_keypair<C: Signing>(
    secp: &Secp256k1<C>,
    keypair: &Keypair,
    merkle_root: Option<TapNodeHash>,
) -> TaprootResult<Keypair> {
    let (internal_key, parity) = keypair.x_only_public_key();
    let scalar = tweak_scalar(tap_tweak_hash(&internal_key, merkle_root))?;

    let secret = match parity {
        Parity::Even => keypair.secret_key(),
        Parity::Odd => keypair.secret_key().negate(),
    };
    let tweaked = secret
        .add_tweak(&scalar)
        .map_err(|e| TaprootError::tweak(format!("tweaked secret is invalid: {}", e)))?;
    Ok(Keypair::from_secret_key(secp, &tweaked))
}

/// Check that `result` is what `internal_key` tweaks to under `merkle_root`
pub fn verify_tweak<C: Verification>(
    secp: &Secp256k1<C>,
    internal_key: &XOnlyPublicKey,
    merkle_root: Option<TapNodeHash>,
    result: &TweakResult,
) -> TaprootResult<()> {
    let recomputed = tweak_public_key(secp, internal_key, merkle_root)?;
    if recomputed.output_key != result.output_key {
        return Err(TaprootError::mismatch(format!(
            "expected output key {}, recomputed {}",
            result.output_key, recomputed.output_key
        )));
    }
    if recomputed.parity != result.parity {
        return Err(TaprootError::mismatch(format!(
            "expected parity {}, recomputed {}",
            result.parity.to_u8(),
            recomputed.parity.to_u8()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::secp256k1::SecretKey;
    use std::str::FromStr;

    fn xonly(s: &str) -> XOnlyPublicKey {
        XOnlyPublicKey::from_str(s).unwrap()
    }

    #[test]
    fn test_key_only_vector() {
        // BIP341 wallet test vector 0
        let secp = Secp256k1::verification_only();
        let internal = xonly("d6889cb081036e0faefa3a35157ad71086b123b2b144b649798b494c300a961d");
        let result = tweak_public_key(&secp, &internal, None).unwrap();
        assert_eq!(
            result.output_key.to_string(),
            "53a1f6e454df1aa2776a2814a721372d6258050de330b3c6d10ee8f4e0dda343"
        );
        assert_eq!(result.parity, Parity::Odd);
    }

    #[test]
    fn test_hash_lock_commitment_vector() {
        let secp = Secp256k1::verification_only();
        let internal = xonly("50be5fc44ec580c387bf45df275aaa8b27e2d7716af31f10eeed357d126bb4d3");
        let root = TapNodeHash::from_str(
            "fe78d8523ce9603014b28739a51ef826f791aa17511e617af6dc96a8f10f659e",
        )
        .unwrap();

        assert_eq!(
            tap_tweak_hash(&internal, Some(root)).to_string(),
            "184064d0b2fc2485f5ca4cb38907603e0837e26f3b66c6e3c9fcdd621844ea38"
        );
        let result = tweak_public_key(&secp, &internal, Some(root)).unwrap();
        assert_eq!(
            result.output_key.to_string(),
            "a46780148be98aaa861ad0b5dfc5c9b935d515c7be8c9e2bc6cedfa594e2b6d9"
        );
        assert_eq!(result.parity, Parity::Odd);
    }

    #[test]
    fn test_parity_determinism() {
        let secp = Secp256k1::verification_only();
        let internal = xonly("50be5fc44ec580c387bf45df275aaa8b27e2d7716af31f10eeed357d126bb4d3");
        let root = Some(TapNodeHash::from_byte_array([7u8; 32]));
        let first = tweak_public_key(&secp, &internal, root).unwrap();
        let second = tweak_public_key(&secp, &internal, root).unwrap();
        assert_eq!(first, second);
        assert!(verify_tweak(&secp, &internal, root, &first).is_ok());
    }

    #[test]
    fn test_verify_tweak_detects_wrong_root() {
        let secp = Secp256k1::verification_only();
        let internal = xonly("50be5fc44ec580c387bf45df275aaa8b27e2d7716af31f10eeed357d126bb4d3");
        let result = tweak_public_key(&secp, &internal, None).unwrap();
        let other_root = Some(TapNodeHash::from_byte_array([1u8; 32]));
        assert!(matches!(
            verify_tweak(&secp, &internal, other_root, &result),
            Err(TaprootError::CommitmentMismatch { .. })
        ));

        let flipped = TweakResult {
            output_key: result.output_key,
            parity: if result.parity == Parity::Odd { Parity::Even } else { Parity::Odd },
        };
        assert!(matches!(
            verify_tweak(&secp, &internal, None, &flipped),
            Err(TaprootError::CommitmentMismatch { .. })
        ));
    }

    #[test]
    fn test_tweak_overflow_is_rejected() {
        let overflow = TapTweakHash::from_byte_array([0xff; 32]);
        assert!(matches!(
            tweak_scalar(overflow),
            Err(TaprootError::InvalidTweak { .. })
        ));
    }

    #[test]
    fn test_tweaked_keypair_matches_output_key_for_both_parities() {
        let secp = Secp256k1::new();
        let root = Some(TapNodeHash::from_byte_array([9u8; 32]));
        let mut seen = (false, false);

        for seed in 1u8..=32 {
            let secret = SecretKey::from_slice(&[seed; 32]).unwrap();
            let keypair = Keypair::from_secret_key(&secp, &secret);
            let (internal, parity) = keypair.x_only_public_key();
            match parity {
                Parity::Even => seen.0 = true,
                Parity::Odd => seen.1 = true,
            }

            let expected = tweak_public_key(&secp, &internal, root).unwrap();
            let tweaked = tweak_keypair(&secp, &keypair, root).unwrap();
            let (tweaked_key, tweaked_parity) = tweaked.x_only_public_key();
            assert_eq!(tweaked_key, expected.output_key);
            assert_eq!(tweaked_parity, expected.parity);
        }
        assert!(seen.0 && seen.1, "seeds should cover both parities");
    }
}
