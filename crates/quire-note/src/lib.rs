//! Signed notes for Quire checkpoints.
//!
//! A signed note is a UTF-8 text body followed by a blank line and one or
//! more signature lines of the form `— <key name> <base64>`. The base64
//! payload is a 4-byte key hash followed by an Ed25519 signature over the
//! text. Keys are encoded as strings:
//!
//! - signer: `PRIVATE+KEY+<name>+<hash>+<base64 key>`
//! - verifier: `<name>+<hash>+<base64 key>`
//!
//! where `<hash>` is the 8-hex-digit [`key_hash`] of the public key.

mod error;
mod keys;
mod note;


pub use error::NoteError;
pub use keys::{NoteSigner, NoteVerifier, generate_key, key_hash};
pub use note::{Note, NoteSignature, open, sign};
