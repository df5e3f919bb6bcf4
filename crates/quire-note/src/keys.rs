//! Ed25519 note signer and verifier keys.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::error::NoteError;

/// Algorithm byte for Ed25519 keys.
const ALG_ED25519: u8 = 1;

/// Compute the key hash identifying `key` under `name`.
///
/// `key` is the encoded public key: the algorithm byte followed by the raw
/// key bytes. The hash is the first four bytes of
/// `SHA-256(name || "\n" || key)`, read big-endian.
pub fn key_hash(name: &str, key: &[u8]) -> u32 {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(b"\n");
    hasher.update(key);
    let sum = hasher.finalize();
    u32::from_be_bytes([sum[0], sum[1], sum[2], sum[3]])
}

/// Whether `name` can be used as a key name.
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('+') && !name.chars().any(char::is_whitespace)
}

/// Parse the `<hash>` field of a key string: exactly 8 hex digits.
fn parse_hash(hash16: &str) -> Option<u32> {
    if hash16.len() != 8 {
        return None;
    }
    u32::from_str_radix(hash16, 16).ok()
}

/// Encode a public key as `ALG || key`.
fn encode_public(key: &VerifyingKey) -> Vec<u8> {
    let mut out = Vec::with_capacity(33);
    out.push(ALG_ED25519);
    out.extend_from_slice(key.as_bytes());
    out
}

/// Signs note text on behalf of a named key.
pub struct NoteSigner {
    name: String,
    hash: u32,
    key: SigningKey,
}

impl NoteSigner {
    /// Build a signer from a name and a 32-byte Ed25519 seed.
    pub fn from_seed(name: &str, seed: &[u8; 32]) -> Result<Self, NoteError> {
        if !is_valid_name(name) {
            return Err(NoteError::InvalidName(name.to_string()));
        }
        let key = SigningKey::from_bytes(seed);
        let hash = key_hash(name, &encode_public(&key.verifying_key()));
        Ok(Self {
            name: name.to_string(),
            hash,
            key,
        })
    }

    /// Parse a `PRIVATE+KEY+<name>+<hash>+<key>` signer string.
    pub fn parse(skey: &str) -> Result<Self, NoteError> {
        let rest = skey
            .strip_prefix("PRIVATE+KEY+")
            .ok_or(NoteError::MalformedSignerKey)?;
        let (name, rest) = rest.split_once('+').ok_or(NoteError::MalformedSignerKey)?;
        let (hash16, key64) = rest.split_once('+').ok_or(NoteError::MalformedSignerKey)?;

        let declared = parse_hash(hash16).ok_or(NoteError::MalformedSignerKey)?;
        let key = STANDARD
            .decode(key64)
            .map_err(|_| NoteError::MalformedSignerKey)?;
        if !is_valid_name(name) || key.is_empty() {
            return Err(NoteError::MalformedSignerKey);
        }
        if key[0] != ALG_ED25519 {
            return Err(NoteError::UnsupportedAlgorithm(key[0]));
        }
        let seed: [u8; 32] = key[1..]
            .try_into()
            .map_err(|_| NoteError::MalformedSignerKey)?;

        let signer = Self::from_seed(name, &seed)?;
        if signer.hash != declared {
            return Err(NoteError::KeyHashMismatch {
                name: name.to_string(),
                declared,
                computed: signer.hash,
            });
        }
        Ok(signer)
    }

    /// Key name (the log origin for checkpoint signers).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key hash of the corresponding public key.
    pub fn key_hash(&self) -> u32 {
        self.hash
    }

    /// Sign `msg`, returning the 64-byte Ed25519 signature.
    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        let signature: Signature = self.key.sign(msg);
        signature.to_bytes().to_vec()
    }

    /// The verifier matching this signer.
    pub fn verifier(&self) -> NoteVerifier {
        NoteVerifier {
            name: self.name.clone(),
            hash: self.hash,
            key: self.key.verifying_key(),
        }
    }

    /// Encode this signer back into its `PRIVATE+KEY+...` string form.
    pub fn to_key_string(&self) -> String {
        let mut key = Vec::with_capacity(33);
        key.push(ALG_ED25519);
        key.extend_from_slice(self.key.as_bytes());
        format!(
            "PRIVATE+KEY+{}+{:08x}+{}",
            self.name,
            self.hash,
            STANDARD.encode(key)
        )
    }
}

impl fmt::Debug for NoteSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoteSigner")
            .field("name", &self.name)
            .field("hash", &format_args!("{:08x}", self.hash))
            .finish_non_exhaustive()
    }
}

/// Verifies note signatures made by a named key.
#[derive(Clone)]
pub struct NoteVerifier {
    name: String,
    hash: u32,
    key: VerifyingKey,
}

impl NoteVerifier {
    /// Parse a `<name>+<hash>+<key>` verifier string.
    pub fn parse(vkey: &str) -> Result<Self, NoteError> {
        let (name, rest) = vkey.split_once('+').ok_or(NoteError::MalformedVerifierKey)?;
        let (hash16, key64) = rest.split_once('+').ok_or(NoteError::MalformedVerifierKey)?;

        let declared = parse_hash(hash16).ok_or(NoteError::MalformedVerifierKey)?;
        let key = STANDARD
            .decode(key64)
            .map_err(|_| NoteError::MalformedVerifierKey)?;
        if !is_valid_name(name) || key.is_empty() {
            return Err(NoteError::MalformedVerifierKey);
        }

        let computed = key_hash(name, &key);
        if computed != declared {
            return Err(NoteError::KeyHashMismatch {
                name: name.to_string(),
                declared,
                computed,
            });
        }
        if key[0] != ALG_ED25519 {
            return Err(NoteError::UnsupportedAlgorithm(key[0]));
        }
        let raw: [u8; 32] = key[1..]
            .try_into()
            .map_err(|_| NoteError::MalformedVerifierKey)?;
        let key = VerifyingKey::from_bytes(&raw).map_err(|_| NoteError::MalformedVerifierKey)?;

        Ok(Self {
            name: name.to_string(),
            hash: declared,
            key,
        })
    }

    /// Key name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key hash.
    pub fn key_hash(&self) -> u32 {
        self.hash
    }

    /// Check an Ed25519 signature over `msg`. Wrong-length signatures fail.
    pub fn verify(&self, msg: &[u8], sig: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(sig) else {
            return false;
        };
        self.key.verify(msg, &signature).is_ok()
    }

    /// Encode this verifier back into its `<name>+<hash>+<key>` string form.
    pub fn to_key_string(&self) -> String {
        format!(
            "{}+{:08x}+{}",
            self.name,
            self.hash,
            STANDARD.encode(encode_public(&self.key))
        )
    }
}

impl fmt::Debug for NoteVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NoteVerifier({}+{:08x})", self.name, self.hash)
    }
}

/// Generate a fresh Ed25519 key pair for `name`.
///
/// Returns `(signer, verifier)` key strings.
pub fn generate_key(name: &str) -> Result<(String, String), NoteError> {
    use rand::RngCore;

    let mut seed = [0u8; 32];
    rand::rng().fill_bytes(&mut seed);
    let signer = NoteSigner::from_seed(name, &seed)?;
    Ok((signer.to_key_string(), signer.verifier().to_key_string()))
}
