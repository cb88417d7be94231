//! # Taproot Addresses
//!
//! Bech32m encoding of a witness version 1 program. The program is the
//! 32-byte x-only output key; the human-readable part selects the network
//! (`bc` mainnet, `tb` testnet and signet, `bcrt` regtest).

use crate::error::{TaprootError, TaprootResult};
use bitcoin::key::TweakedPublicKey;
use bitcoin::secp256k1::XOnlyPublicKey;
use bitcoin::{Address, Network, ScriptBuf};
use std::str::FromStr;

/// Networks tried in order when decoding; signet shares testnet's prefix
const DECODE_NETWORKS: [Network; 3] = [Network::Bitcoin, Network::Testnet, Network::Regtest];

/// Display width kept at each end by `format_short`
const SHORT_PREFIX: usize = 8;
const SHORT_SUFFIX: usize = 5;

/// Encode an output key as a P2TR address
pub fn encode_address(output_key: &XOnlyPublicKey, network: Network) -> String {
    Address::p2tr_tweaked(TweakedPublicKey::dangerous_assume_tweaked(*output_key), network)
        .to_string()
}

/// The `OP_1 <32-byte key>` scriptPubKey for an output key
pub fn script_pubkey(output_key: &XOnlyPublicKey) -> ScriptBuf {
    ScriptBuf::new_p2tr_tweaked(TweakedPublicKey::dangerous_assume_tweaked(*output_key))
}

/// Decode a P2TR address into its output key and network.
///
/// # Errors
/// - `InvalidAddress` for bad checksums, non-Taproot programs, programs that
///   are not a valid x coordinate, or unknown prefixes
pub fn decode_address(address: &str) -> TaprootResult<(XOnlyPublicKey, Network)> {
    let invalid = || TaprootError::InvalidAddress {
        address: address.to_string(),
    };

    let unchecked = Address::from_str(address).map_err(|e| {
        log::debug!("Address {} failed to parse: {}", address, e);
        invalid()
    })?;
    let network = DECODE_NETWORKS
        .iter()
        .copied()
        .find(|network| unchecked.is_valid_for_network(*network))
        .ok_or_else(invalid)?;
    let checked = unchecked.require_network(network).map_err(|_| invalid())?;

    let spk = checked.script_pubkey();
    if !spk.is_p2tr() {
        return Err(invalid());
    }
    let output_key = XOnlyPublicKey::from_slice(&spk.as_bytes()[2..34]).map_err(|_| invalid())?;
    Ok((output_key, network))
}

/// Decode an address and require that it belongs to `network`.
///
/// Testnet and signet addresses are interchangeable here since they share
/// a prefix.
pub fn decode_address_for(address: &str, network: Network) -> TaprootResult<XOnlyPublicKey> {
    let (output_key, decoded) = decode_address(address)?;
    let same_prefix = |n: Network| match n {
        Network::Signet => Network::Testnet,
        other => other,
    };
    if same_prefix(decoded) != same_prefix(network) {
        return Err(TaprootError::InvalidAddress {
            address: format!("{} is not a {} address", address, network),
        });
    }
    Ok(output_key)
}

/// Shorten an address for display, like `tb1p53nc...kd43h`
pub fn format_short(address: &str) -> String {
    if address.len() <= SHORT_PREFIX + SHORT_SUFFIX + 3 {
        address.to_string()
    } else {
        format!(
            "{}...{}",
            &address[..SHORT_PREFIX],
            &address[address.len() - SHORT_SUFFIX..]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH_LOCK_OUTPUT: &str =
        "a46780148be98aaa861ad0b5dfc5c9b935d515c7be8c9e2bc6cedfa594e2b6d9";
    const HASH_LOCK_ADDRESS: &str =
        "tb1p53ncq9ytax924ps66z6al3wfhy6a29w8h6xfu27xem06t98zkmvsakd43h";

    fn key(s: &str) -> XOnlyPublicKey {
        XOnlyPublicKey::from_str(s).unwrap()
    }

    #[test]
    fn test_encode_vectors() {
        assert_eq!(
            encode_address(&key(HASH_LOCK_OUTPUT), Network::Testnet),
            HASH_LOCK_ADDRESS
        );
        // BIP341 wallet test vector 0
        assert_eq!(
            encode_address(
                &key("53a1f6e454df1aa2776a2814a721372d6258050de330b3c6d10ee8f4e0dda343"),
                Network::Bitcoin
            ),
            "bc1p2wsldez5mud2yam29q22wgfh9439spgduvct83k3pm50fcxa5dps59h4z5"
        );
    }

    #[test]
    fn test_decode_round_trip() {
        let output = key(HASH_LOCK_OUTPUT);
        for network in [Network::Bitcoin, Network::Testnet, Network::Regtest] {
            let address = encode_address(&output, network);
            assert_eq!(decode_address(&address).unwrap(), (output, network));
        }

        let signet = encode_address(&output, Network::Signet);
        assert_eq!(signet, HASH_LOCK_ADDRESS);
        assert_eq!(decode_address_for(&signet, Network::Signet).unwrap(), output);
    }

    #[test]
    fn test_script_pubkey() {
        let spk = script_pubkey(&key(HASH_LOCK_OUTPUT));
        assert!(spk.is_p2tr());
        assert_eq!(hex::encode(spk.as_bytes()), format!("5120{}", HASH_LOCK_OUTPUT));
    }

    #[test]
    fn test_rejects_bad_checksum() {
        let mut corrupted = HASH_LOCK_ADDRESS.to_string();
        corrupted.pop();
        corrupted.push('x');
        assert!(matches!(
            decode_address(&corrupted),
            Err(TaprootError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_rejects_segwit_v0() {
        assert!(matches!(
            decode_address("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"),
            Err(TaprootError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_network_mismatch() {
        assert!(decode_address_for(HASH_LOCK_ADDRESS, Network::Bitcoin).is_err());
        assert!(decode_address_for(HASH_LOCK_ADDRESS, Network::Testnet).is_ok());
    }

    #[test]
    fn test_format_short() {
        assert_eq!(format_short(HASH_LOCK_ADDRESS), "tb1p53nc...kd43h");
        assert_eq!(format_short("tb1pshort"), "tb1pshort");
    }
}
