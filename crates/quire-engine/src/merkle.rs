//! RFC 6962 Merkle tree hashing.
//!
//! The reference engine keeps only a compact range (the roots of the perfect
//! subtrees covering the log, left to right), which is enough to append
//! leaves and compute the root of the whole tree.

use sha2::{Digest, Sha256};

/// A SHA-256 digest.
pub type Hash = [u8; 32];

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// Root of the empty tree: `SHA-256("")`.
pub fn empty_root() -> Hash {
    Sha256::digest(b"").into()
}

/// Hash of a leaf: `SHA-256(0x00 || data)`.
pub fn leaf_hash(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash of an interior node: `SHA-256(0x01 || left || right)`.
pub fn node_hash(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Root over a full list of leaf hashes, by direct recursion.
pub fn root(leaves: &[Hash]) -> Hash {
    match leaves.len() {
        0 => empty_root(),
        1 => leaves[0],
        n => {
            // Largest power of two strictly less than n.
            let split = 1 << (usize::BITS - 1 - (n - 1).leading_zeros());
            node_hash(&root(&leaves[..split]), &root(&leaves[split..]))
        }
    }
}

/// Compact representation of a growing tree.
#[derive(Debug, Clone, Default)]
pub struct MerkleRange {
    /// `(height, hash)` of each perfect subtree, heights strictly decreasing.
    nodes: Vec<(u32, Hash)>,
    size: u64,
}

impl MerkleRange {
    /// An empty range.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of leaves appended.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Append a leaf hash.
    pub fn append(&mut self, leaf: Hash) {
        self.nodes.push((0, leaf));
        self.size += 1;

        // Merge equal-height neighbours, like carrying in binary addition.
        loop {
            let n = self.nodes.len();
            if n < 2 || self.nodes[n - 2].0 != self.nodes[n - 1].0 {
                break;
            }
            let (height, right) = self.nodes[n - 1];
            let (_, left) = self.nodes[n - 2];
            self.nodes.truncate(n - 2);
            self.nodes.push((height + 1, node_hash(&left, &right)));
        }
    }

    /// Root hash of the tree over all appended leaves.
    pub fn root(&self) -> Hash {
        let mut nodes = self.nodes.iter().rev();
        let Some((_, last)) = nodes.next() else {
            return empty_root();
        };
        nodes.fold(*last, |acc, (_, left)| node_hash(left, &acc))
    }
}
