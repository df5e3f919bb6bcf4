//! Error types for note keys and signed notes.

/// Errors that can occur while parsing keys or signing/opening notes.
#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    /// The signer key string is structurally invalid.
    #[error("malformed signer key")]
    MalformedSignerKey,

    /// The verifier key string is structurally invalid.
    #[error("malformed verifier key")]
    MalformedVerifierKey,

    /// The key hash embedded in a key string does not match the key.
    #[error("key hash mismatch for {name}: declared {declared:08x}, computed {computed:08x}")]
    KeyHashMismatch {
        /// Key name.
        name: String,
        /// Hash written in the key string.
        declared: u32,
        /// Hash computed from the key material.
        computed: u32,
    },

    /// The key uses an algorithm other than Ed25519.
    #[error("unsupported key algorithm: {0}")]
    UnsupportedAlgorithm(u8),

    /// The key name is empty, contains `+`, or contains whitespace.
    #[error("invalid key name: {0:?}")]
    InvalidName(String),

    /// The note text or signature block is malformed.
    #[error("malformed note")]
    MalformedNote,

    /// A signature from a known key failed verification.
    #[error("invalid signature for key {name}+{hash:08x}")]
    InvalidSignature {
        /// Key name.
        name: String,
        /// Key hash.
        hash: u32,
    },

    /// The note carries no signature from any known key.
    #[error("note has no verifiable signatures")]
    UnverifiedNote,
}
