//! # Utility Functions
//!
//! Key parsing and generation plus file helpers shared by the library and
//! the command-line tool.

/// Key parsing and generation
pub mod keys {
    use crate::error::{TaprootError, TaprootResult};
    use bitcoin::secp256k1::{Keypair, Secp256k1, SecretKey, Signing, XOnlyPublicKey};
    use std::str::FromStr;

    /// Generate a random keypair
    pub fn generate_keypair<C: Signing>(secp: &Secp256k1<C>) -> Keypair {
        loop {
            // Retry the rare draw that is zero or not below the curve order
            let bytes: [u8; 32] = rand::random();
            if let Ok(secret) = SecretKey::from_slice(&bytes) {
                return Keypair::from_secret_key(secp, &secret);
            }
        }
    }

    /// Parse a hex-encoded 32-byte private key
    pub fn parse_keypair<C: Signing>(secp: &Secp256k1<C>, hex_key: &str) -> TaprootResult<Keypair> {
        let secret = SecretKey::from_str(hex_key.trim())
            .map_err(|e| TaprootError::key(format!("invalid private key: {}", e)))?;
        Ok(Keypair::from_secret_key(secp, &secret))
    }

    /// Parse a hex-encoded x-only public key
    pub fn parse_x_only(hex_key: &str) -> TaprootResult<XOnlyPublicKey> {
        XOnlyPublicKey::from_str(hex_key.trim())
            .map_err(|e| TaprootError::key(format!("invalid x-only key '{}': {}", hex_key, e)))
    }
}

/// File system utilities
pub mod fs {
    use crate::error::TaprootResult;
    use std::fs;
    use std::path::Path;

    /// Write through a temporary sibling file and rename it into place
    pub fn write_file_atomic(path: &Path, content: &[u8]) -> TaprootResult<()> {
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, path)?;
        log::debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::secp256k1::Secp256k1;

    #[test]
    fn test_generated_keys_differ() {
        let secp = Secp256k1::new();
        let a = keys::generate_keypair(&secp);
        let b = keys::generate_keypair(&secp);
        assert_ne!(a.x_only_public_key().0, b.x_only_public_key().0);
    }

    #[test]
    fn test_parse_keys() {
        let secp = Secp256k1::new();
        let keypair = keys::parse_keypair(
            &secp,
            "82a3ddde60ca9ebece3ef5af4e02b0f44113703520895047c32d081d762e29ac",
        )
        .unwrap();
        assert_eq!(
            keypair.x_only_public_key().0,
            keys::parse_x_only("50be5fc44ec580c387bf45df275aaa8b27e2d7716af31f10eeed357d126bb4d3")
                .unwrap()
        );
        assert!(keys::parse_keypair(&secp, "00").is_err());
        assert!(keys::parse_x_only("not hex").is_err());
    }

    #[test]
    fn test_atomic_write() {
        let dir = std::env::temp_dir().join(format!("tapcommit-utils-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.json");

        fs::write_file_atomic(&path, b"{}").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
        assert!(!path.with_extension("tmp").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
