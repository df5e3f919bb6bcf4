//! Signing and opening notes.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::NoteError;
use crate::keys::{NoteSigner, NoteVerifier, is_valid_name};

/// Prefix of every signature line.
const SIG_PREFIX: &str = "\u{2014} ";

/// Maximum number of signature lines accepted when opening a note.
const MAX_SIGNATURES: usize = 100;

/// A single signature line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSignature {
    /// Key name.
    pub name: String,
    /// Key hash.
    pub hash: u32,
    /// Base64 of `hash || signature`, as it appears on the line.
    pub base64: String,
}

/// An opened note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    /// Text body, ending in `\n`.
    pub text: String,
    /// Signatures verified by one of the supplied verifiers.
    pub sigs: Vec<NoteSignature>,
    /// Signatures from keys that were not supplied.
    pub unverified_sigs: Vec<NoteSignature>,
}

/// Whether `text` can be carried as note text.
fn is_valid_text(text: &str) -> bool {
    text.ends_with('\n') && !text.chars().any(|c| c < '\u{20}' && c != '\n')
}

/// Sign `text` with every signer and return the serialized note.
pub fn sign(text: &str, signers: &[&NoteSigner]) -> Result<Vec<u8>, NoteError> {
    if !is_valid_text(text) {
        return Err(NoteError::MalformedNote);
    }

    let mut sigs = String::new();
    for signer in signers {
        if !is_valid_name(signer.name()) {
            return Err(NoteError::InvalidName(signer.name().to_string()));
        }
        let mut payload = signer.key_hash().to_be_bytes().to_vec();
        payload.extend_from_slice(&signer.sign(text.as_bytes()));

        sigs.push_str(SIG_PREFIX);
        sigs.push_str(signer.name());
        sigs.push(' ');
        sigs.push_str(&STANDARD.encode(payload));
        sigs.push('\n');
    }

    let mut out = Vec::with_capacity(text.len() + 1 + sigs.len());
    out.extend_from_slice(text.as_bytes());
    out.push(b'\n');
    out.extend_from_slice(sigs.as_bytes());
    Ok(out)
}

/// Parse a serialized note and verify its signatures against `known`.
///
/// Signatures from keys not in `known` are returned as unverified. A
/// signature from a known key that does not verify is an error, as is a
/// note with no verified signature at all.
pub fn open(msg: &[u8], known: &[&NoteVerifier]) -> Result<Note, NoteError> {
    let msg = std::str::from_utf8(msg).map_err(|_| NoteError::MalformedNote)?;
    if msg.chars().any(|c| c < '\u{20}' && c != '\n') {
        return Err(NoteError::MalformedNote);
    }

    let split = msg.rfind("\n\n").ok_or(NoteError::MalformedNote)?;
    let (text, sigs) = (&msg[..split + 1], &msg[split + 2..]);
    if !sigs.ends_with('\n') {
        return Err(NoteError::MalformedNote);
    }

    let mut note = Note {
        text: text.to_string(),
        sigs: Vec::new(),
        unverified_sigs: Vec::new(),
    };
    let mut seen: Vec<(String, u32)> = Vec::new();

    for (count, line) in sigs.split_terminator('\n').enumerate() {
        if count >= MAX_SIGNATURES {
            return Err(NoteError::MalformedNote);
        }
        let line = line.strip_prefix(SIG_PREFIX).ok_or(NoteError::MalformedNote)?;
        let (name, b64) = line.split_once(' ').ok_or(NoteError::MalformedNote)?;
        let raw = STANDARD.decode(b64).map_err(|_| NoteError::MalformedNote)?;
        if !is_valid_name(name) || raw.len() < 5 {
            return Err(NoteError::MalformedNote);
        }
        let hash = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let signature = NoteSignature {
            name: name.to_string(),
            hash,
            base64: b64.to_string(),
        };

        let Some(verifier) = known
            .iter()
            .find(|v| v.name() == name && v.key_hash() == hash)
        else {
            if !note.unverified_sigs.contains(&signature) {
                note.unverified_sigs.push(signature);
            }
            continue;
        };

        // Repeated signatures by one key are dropped.
        if seen.iter().any(|(n, h)| n == name && *h == hash) {
            continue;
        }
        seen.push((name.to_string(), hash));

        if !verifier.verify(text.as_bytes(), &raw[4..]) {
            return Err(NoteError::InvalidSignature {
                name: name.to_string(),
                hash,
            });
        }
        note.sigs.push(signature);
    }

    if note.sigs.is_empty() {
        return Err(NoteError::UnverifiedNote);
    }
    Ok(note)
}
