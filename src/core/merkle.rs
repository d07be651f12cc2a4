use sha2::{Digest, Sha256};

/// A node in the Merkle tree built over a file's chunk digests.
///
/// Leaves carry chunk digests; interior nodes carry the combined digest of
/// their two children. The identity node (empty hash, no children) stands
/// for zero-length input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleNode {
    pub hash: Vec<u8>,
    pub is_leaf: bool,
    pub children: Vec<MerkleNode>,
}

impl MerkleNode {
    fn leaf(hash: Vec<u8>) -> Self {
        MerkleNode {
            hash,
            is_leaf: true,
            children: Vec::new(),
        }
    }
}

/// SHA-256 digest of a single chunk.
pub fn hash_chunk(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}

/// Combined digest of two child hashes: a fresh SHA-256 over `a ∥ b`.
pub fn combine_hashes(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(a);
    hasher.update(b);
    hasher.finalize().to_vec()
}

/// Lowercase hex encoding, used for chunk-index keys and root comparison.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Split `data` into fixed-size chunks (the last one may be short) and hash
/// each. Empty input yields an empty list.
pub fn chunk_hashes(data: &[u8], chunk_size: usize) -> Vec<Vec<u8>> {
    data.chunks(chunk_size).map(hash_chunk).collect()
}

/// Build a Merkle tree over ordered leaf hashes.
///
/// Nodes are paired left-to-right level by level; an odd trailing node is
/// carried up unchanged rather than duplicated. An empty hash list produces
/// the identity node, a single hash becomes the root directly, so a
/// one-chunk file's root equals the SHA-256 of its bytes.
pub fn build_merkle_tree(hashes: Vec<Vec<u8>>) -> MerkleNode {
    if hashes.is_empty() {
        return MerkleNode::leaf(Vec::new());
    }

    let mut level: Vec<MerkleNode> = hashes.into_iter().map(MerkleNode::leaf).collect();
    loop {
        if level.len() == 1 {
            return level.swap_remove(0);
        }

        let mut next = Vec::with_capacity(level.len() / 2 + 1);
        let mut carry: Option<MerkleNode> = None;
        for node in level {
            match carry.take() {
                None => carry = Some(node),
                Some(left) => {
                    let hash = combine_hashes(&left.hash, &node.hash);
                    next.push(MerkleNode {
                        hash,
                        is_leaf: false,
                        children: vec![left, node],
                    });
                }
            }
        }
        // odd node at end of level rides up to the next one
        if let Some(unpaired) = carry {
            next.push(unpaired);
        }
        level = next;
    }
}

/// In-order leaf hashes of a tree, matching the chunk order they were built
/// from.
pub fn collect_leaves(node: &MerkleNode) -> Vec<Vec<u8>> {
    if node.is_leaf {
        return vec![node.hash.clone()];
    }
    node.children.iter().flat_map(collect_leaves).collect()
}
