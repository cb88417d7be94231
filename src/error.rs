//! # Error Types for Taproot Commitments
//!
//! This module provides the error type shared by every commitment operation:
//! tree construction, key tweaking, control block parsing and verification,
//! and witness assembly.
//!
//! Verification failures (`CommitmentMismatch`, `ScriptExecution`,
//! `InvalidSignature`) describe well-formed data that does not satisfy the
//! commitment. They are kept apart from malformed-input errors so that a
//! tampered witness is never reported as a parsing bug.

use thiserror::Error;

/// Main error type for all commitment operations
#[derive(Debug, Error)]
pub enum TaprootError {
    /// Settings that cannot be used, such as an unknown network name
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Leaf script is unparseable or larger than the consensus bound
    #[error("Invalid leaf script: {message}")]
    InvalidScript { message: String },

    /// Leaf version byte is odd or collides with the annex tag
    #[error("Invalid leaf version: {version:#04x}")]
    InvalidLeafVersion { version: u8 },

    /// Script tree exceeds the BIP341 depth limit
    #[error("Script tree too deep: depth {depth} exceeds maximum of {max}")]
    TreeTooDeep { depth: usize, max: usize },

    /// Degenerate elliptic-curve arithmetic during tweaking
    #[error("Invalid tweak: {message}")]
    InvalidTweak { message: String },

    /// Control block has the wrong length, alignment or key encoding
    #[error("Malformed control block: {message}")]
    MalformedControlBlock { message: String },

    /// Recomputed output key or parity does not match the claimed output
    #[error("Commitment mismatch: {message}")]
    CommitmentMismatch { message: String },

    /// Operation invoked in the wrong lifecycle state
    #[error("Precondition violated: expected {expected}, found {actual}")]
    PreconditionViolated { expected: String, actual: String },

    /// Revealed script rejected the supplied stack items
    #[error("Script execution failed: {message}")]
    ScriptExecution { message: String },

    /// Key-path Schnorr signature did not verify
    #[error("Invalid signature: {message}")]
    InvalidSignature { message: String },

    /// Public or private key could not be parsed or does not match
    #[error("Invalid key: {message}")]
    InvalidKey { message: String },

    /// Address parsing and validation errors
    #[error("Invalid address: {address}")]
    InvalidAddress { address: String },

    /// Witness stack has an unusable shape
    #[error("Invalid witness: {message}")]
    InvalidWitness { message: String },

    /// File I/O operations
    #[error("File operation failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON processing error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Hex decoding errors
    #[error("Hex decoding error: {source}")]
    Hex {
        #[from]
        source: hex::FromHexError,
    },
}

/// Result type alias for commitment operations
pub type TaprootResult<T> = Result<T, TaprootError>;

impl TaprootError {
    /// Create a configuration error with a message
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid script error with a message
    pub fn script(message: impl Into<String>) -> Self {
        Self::InvalidScript {
            message: message.into(),
        }
    }

    /// Create an invalid tweak error with a message
    pub fn tweak(message: impl Into<String>) -> Self {
        Self::InvalidTweak {
            message: message.into(),
        }
    }

    /// Create a malformed control block error with a message
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedControlBlock {
            message: message.into(),
        }
    }

    /// Create a commitment mismatch error with a message
    pub fn mismatch(message: impl Into<String>) -> Self {
        Self::CommitmentMismatch {
            message: message.into(),
        }
    }

    /// Create a precondition error from the expected and actual states
    pub fn precondition(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::PreconditionViolated {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a script execution error with a message
    pub fn execution(message: impl Into<String>) -> Self {
        Self::ScriptExecution {
            message: message.into(),
        }
    }

    /// Create an invalid key error with a message
    pub fn key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Create an invalid witness error with a message
    pub fn witness(message: impl Into<String>) -> Self {
        Self::InvalidWitness {
            message: message.into(),
        }
    }

    /// Check if this error means well-formed data failed verification
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            TaprootError::CommitmentMismatch { .. }
                | TaprootError::ScriptExecution { .. }
                | TaprootError::InvalidSignature { .. }
        )
    }

    /// Check if this error was caused by input that could not be parsed
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            TaprootError::InvalidScript { .. }
                | TaprootError::InvalidLeafVersion { .. }
                | TaprootError::MalformedControlBlock { .. }
                | TaprootError::InvalidKey { .. }
                | TaprootError::InvalidAddress { .. }
                | TaprootError::InvalidWitness { .. }
                | TaprootError::Hex { .. }
                | TaprootError::Json { .. }
        )
    }
}
