//! Checkpoint body and its signed-note codec.
//!
//! The body is three lines followed by optional extension lines:
//!
//! ```text
//! <origin>
//! <size, decimal>
//! <root hash, base64>
//! [extension lines...]
//! ```

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use quire_note::{NoteSigner, NoteVerifier};

use crate::error::CheckpointError;

/// An authenticated snapshot of the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    /// Log identity; matches the signing key's name.
    pub origin: String,
    /// Number of entries committed.
    pub size: u64,
    /// Root hash over the first `size` entries.
    pub hash: Vec<u8>,
    /// Extra body lines after the hash, carried verbatim.
    pub extensions: Vec<String>,
}

impl Checkpoint {
    /// Create a checkpoint with no extension lines.
    pub fn new(origin: impl Into<String>, size: u64, hash: impl Into<Vec<u8>>) -> Self {
        Self {
            origin: origin.into(),
            size,
            hash: hash.into(),
            extensions: Vec::new(),
        }
    }

    /// Render the note text body.
    pub fn marshal(&self) -> String {
        let mut out = format!(
            "{}\n{}\n{}\n",
            self.origin,
            self.size,
            STANDARD.encode(&self.hash)
        );
        for line in &self.extensions {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Parse a note text body.
    pub fn unmarshal(text: &str) -> Result<Self, CheckpointError> {
        let mut lines = text.splitn(4, '\n');
        let (Some(origin), Some(size), Some(hash), Some(rest)) =
            (lines.next(), lines.next(), lines.next(), lines.next())
        else {
            return Err(CheckpointError::invalid("too few newlines"));
        };

        if origin.is_empty() {
            return Err(CheckpointError::invalid("empty origin"));
        }
        if size.is_empty() || !size.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CheckpointError::invalid(format!("size invalid: {size:?}")));
        }
        let size = size
            .parse::<u64>()
            .map_err(|e| CheckpointError::invalid(format!("size invalid: {e}")))?;
        let hash = STANDARD
            .decode(hash)
            .map_err(|e| CheckpointError::invalid(format!("invalid hash: {e}")))?;

        Ok(Self {
            origin: origin.to_string(),
            size,
            hash,
            extensions: rest.split_terminator('\n').map(str::to_string).collect(),
        })
    }
}

/// Sign `checkpoint` as a note with `signer`.
///
/// The checkpoint origin must be the signer's name.
pub fn sign_checkpoint(
    checkpoint: &Checkpoint,
    signer: &NoteSigner,
) -> Result<Vec<u8>, CheckpointError> {
    if checkpoint.origin != signer.name() {
        return Err(CheckpointError::Sign {
            reason: format!(
                "origin {:?} does not match signer {:?}",
                checkpoint.origin,
                signer.name()
            ),
        });
    }
    quire_note::sign(&checkpoint.marshal(), &[signer]).map_err(|e| CheckpointError::Sign {
        reason: e.to_string(),
    })
}

/// Open a signed checkpoint, verify it with `verifier` and parse the body.
///
/// Every failure here is [`CheckpointError::Invalid`]: the bytes exist but
/// cannot be trusted.
pub fn parse_and_verify(
    bytes: &[u8],
    verifier: &NoteVerifier,
) -> Result<Checkpoint, CheckpointError> {
    let note = quire_note::open(bytes, &[verifier])?;

    if !note
        .sigs
        .iter()
        .any(|s| s.name == verifier.name() && s.hash == verifier.key_hash())
    {
        return Err(CheckpointError::invalid("no log signature found on note"));
    }

    let checkpoint = Checkpoint::unmarshal(&note.text)?;
    if checkpoint.origin != verifier.name() {
        return Err(CheckpointError::invalid(format!(
            "got origin {:?} but expected {:?}",
            checkpoint.origin,
            verifier.name()
        )));
    }
    Ok(checkpoint)
}
