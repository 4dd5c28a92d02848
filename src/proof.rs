//! # Merkle Proofs
//!
//! Proof emission fills an external write-only database with
//! `hash -> encoded node` entries for the search path of a key. A
//! verifier holding only the trusted root hash replays the walk against
//! that database, following hash references and decoding inline children
//! directly.

use std::collections::HashMap;

use alloy_primitives::{keccak256, B256};

use crate::error::{Result, TrieError};
use crate::nibbles::Nibbles;
use crate::rlp;

/// Write-only sink a proof is emitted into.
///
/// Implementations need not be in-memory maps; anything that accepts
/// `hash -> encoded node` entries works.
pub trait ProofSink {
    /// Store an encoded node under its hash
    fn insert(&mut self, hash: B256, encoded: Vec<u8>);
}

/// Read-only lookup a verifier resolves hash references through.
pub trait ProofSource {
    /// Get an encoded node by hash
    fn lookup(&self, hash: &B256) -> Option<Vec<u8>>;
}

/// In-memory proof database
#[derive(Debug, Clone, Default)]
pub struct MemoryProofDb {
    nodes: HashMap<B256, Vec<u8>>,
}

impl MemoryProofDb {
    pub fn new() -> Self {
        MemoryProofDb {
            nodes: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl ProofSink for MemoryProofDb {
    fn insert(&mut self, hash: B256, encoded: Vec<u8>) {
        self.nodes.insert(hash, encoded);
    }
}

impl ProofSource for MemoryProofDb {
    fn lookup(&self, hash: &B256) -> Option<Vec<u8>> {
        self.nodes.get(hash).cloned()
    }
}

/// Verify a membership proof against a trusted root hash.
///
/// Fetches the root's encoding from `db`, then walks downward consuming
/// the key's nibbles. Hash references are resolved through `db` and every
/// fetched node is digest-checked, so a tampered database cannot produce
/// a value. Returns the proven value.
pub fn verify_proof(root: &B256, key: &[u8], db: &impl ProofSource) -> Result<Vec<u8>> {
    let root_node = fetch(db, root)?;
    let nibbles = Nibbles::from_bytes(key);
    verify_node(db, &root_node, &nibbles)
}

/// Fetch an encoded node and check it hashes to the requested digest.
fn fetch(db: &impl ProofSource, hash: &B256) -> Result<Vec<u8>> {
    let encoded = db
        .lookup(hash)
        .ok_or_else(|| TrieError::NodeMissing(hex::encode(hash)))?;
    let actual = keccak256(&encoded);
    if actual != *hash {
        return Err(TrieError::HashMismatch {
            expected: hex::encode(hash),
            actual: hex::encode(actual),
        });
    }
    Ok(encoded)
}

/// Walk a single encoded node, consuming nibbles from `key`.
fn verify_node(db: &impl ProofSource, node_data: &[u8], key: &Nibbles) -> Result<Vec<u8>> {
    let items = rlp::decode_list(node_data)?;

    if items.len() == 2 {
        let (path, is_leaf) = Nibbles::from_compact(&items[0]);

        if is_leaf {
            return if path == *key {
                Ok(items[1].clone())
            } else {
                Err(TrieError::KeyNotFound)
            };
        }

        // Extension: the whole path must match
        if key.common_prefix_len(&path) < path.len() {
            return Err(TrieError::KeyNotFound);
        }
        let child = resolve_child(db, &items[1])?;
        verify_node(db, &child, &key.slice(path.len()))
    } else if items.len() == 17 {
        match key.first() {
            None => {
                if items[16].is_empty() {
                    Err(TrieError::KeyNotFound)
                } else {
                    Ok(items[16].clone())
                }
            }
            Some(idx) => {
                let child_item = &items[idx as usize];
                if child_item.is_empty() {
                    return Err(TrieError::KeyNotFound);
                }
                let child = resolve_child(db, child_item)?;
                verify_node(db, &child, &key.slice(1))
            }
        }
    } else {
        Err(TrieError::InvalidEncoding)
    }
}

/// Resolve a child reference item: a 32-byte string is a hash reference
/// looked up in the database, anything shorter is the child's encoding
/// spliced inline by the parent.
fn resolve_child(db: &impl ProofSource, item: &[u8]) -> Result<Vec<u8>> {
    if item.len() == 32 {
        fetch(db, &B256::from_slice(item))
    } else {
        Ok(item.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::PatriciaTrie;

    #[test]
    fn test_proof_of_empty_trie() {
        let trie = PatriciaTrie::new();
        assert!(trie.proof_for(b"anything").is_none());
    }

    #[test]
    fn test_proof_for_present_key() {
        let mut trie = PatriciaTrie::new();
        trie.insert(b"hello", b"world".to_vec());

        let root = trie.root_hash();
        let db = trie.proof_for(b"hello").expect("key is present");

        assert!(!db.is_empty());
        assert_eq!(verify_proof(&root, b"hello", &db), Ok(b"world".to_vec()));
    }

    #[test]
    fn test_proof_for_absent_key() {
        let mut trie = PatriciaTrie::new();
        trie.insert(b"hello", b"world".to_vec());

        assert!(trie.proof_for(b"missing").is_none());
        // Shares a prefix with a present key but stops short
        assert!(trie.proof_for(b"hell").is_none());
    }

    #[test]
    fn test_proof_verify_fails_wrong_root() {
        let mut trie = PatriciaTrie::new();
        trie.insert(b"hello", b"world".to_vec());
        let db = trie.proof_for(b"hello").unwrap();

        let mut other = PatriciaTrie::new();
        other.insert(b"hello", b"different".to_vec());
        let wrong_root = other.root_hash();

        assert!(verify_proof(&wrong_root, b"hello", &db).is_err());
    }

    #[test]
    fn test_proof_recovers_value_in_branching_trie() {
        let pairs: Vec<(&[u8], &[u8])> = vec![
            (&[1, 2, 3, 4], b"hello"),
            (&[1, 2, 5, 4], b"world"),
            (&[1, 2, 6, 4], b"haha"),
            (&[1, 7, 3, 4], b"yessir"),
            (&[9, 2, 3, 4], b"tweet it"),
        ];

        let mut trie = PatriciaTrie::new();
        for (key, value) in &pairs {
            trie.insert(key, value.to_vec());
        }
        let root = trie.root_hash();

        // A verifier holding only the root hash and the key recovers the
        // value from the emitted database
        let db = trie.proof_for(&[1, 2, 3, 4]).expect("key is present");
        assert_eq!(
            verify_proof(&root, &[1, 2, 3, 4], &db),
            Ok(b"hello".to_vec())
        );

        for (key, value) in &pairs {
            let db = trie.proof_for(key).expect("key is present");
            assert_eq!(verify_proof(&root, key, &db), Ok(value.to_vec()));
        }
    }

    #[test]
    fn test_proof_for_key_ending_at_branch() {
        let mut trie = PatriciaTrie::new();
        trie.insert(b"do", b"verb".to_vec());
        trie.insert(b"dog", b"puppy".to_vec());

        let root = trie.root_hash();

        let db = trie.proof_for(b"do").expect("key is present");
        assert_eq!(verify_proof(&root, b"do", &db), Ok(b"verb".to_vec()));

        let db = trie.proof_for(b"dog").expect("key is present");
        assert_eq!(verify_proof(&root, b"dog", &db), Ok(b"puppy".to_vec()));
    }

    #[test]
    fn test_tampered_proof_fails() {
        let mut trie = PatriciaTrie::new();
        trie.insert(b"hello", b"world".to_vec());

        let root = trie.root_hash();
        let mut db = trie.proof_for(b"hello").unwrap();

        // Replace the root entry with a forged node claiming another value
        let forged = crate::node::Node::leaf(
            crate::nibbles::Nibbles::from_bytes(b"hello"),
            b"forged".to_vec(),
        )
        .encode();
        db.insert(root, forged);

        assert!(matches!(
            verify_proof(&root, b"hello", &db),
            Err(TrieError::HashMismatch { .. })
        ));
    }

    #[test]
    fn test_proof_stale_after_update() {
        let mut trie = PatriciaTrie::new();
        trie.insert(b"key", b"value1".to_vec());

        let root1 = trie.root_hash();
        let db1 = trie.proof_for(b"key").unwrap();

        trie.insert(b"key", b"value2".to_vec());
        let root2 = trie.root_hash();
        let db2 = trie.proof_for(b"key").unwrap();

        assert_ne!(root1, root2);
        assert_eq!(verify_proof(&root1, b"key", &db1), Ok(b"value1".to_vec()));
        assert_eq!(verify_proof(&root2, b"key", &db2), Ok(b"value2".to_vec()));

        // The old database cannot satisfy the new root
        assert!(verify_proof(&root2, b"key", &db1).is_err());
    }

    #[test]
    fn test_proof_stale_after_delete() {
        let mut trie = PatriciaTrie::new();
        trie.insert(b"key1", b"value1".to_vec());
        trie.insert(b"key2", b"value2".to_vec());

        let root_before = trie.root_hash();
        let db_before = trie.proof_for(b"key1").unwrap();
        assert_eq!(
            verify_proof(&root_before, b"key1", &db_before),
            Ok(b"value1".to_vec())
        );

        trie.delete(b"key1");
        let root_after = trie.root_hash();

        assert!(trie.proof_for(b"key1").is_none());
        assert!(verify_proof(&root_after, b"key1", &db_before).is_err());

        let db_key2 = trie.proof_for(b"key2").unwrap();
        assert_eq!(
            verify_proof(&root_after, b"key2", &db_key2),
            Ok(b"value2".to_vec())
        );
    }

    #[test]
    fn test_proofs_in_deep_trie() {
        let mut trie = PatriciaTrie::new();

        for i in 0u32..50 {
            let key = format!("key{:04}", i);
            let value = format!("value{}", i);
            trie.insert(key.as_bytes(), value.into_bytes());
        }

        let root = trie.root_hash();

        for i in [0u32, 10, 25, 49] {
            let key = format!("key{:04}", i);
            let expected = format!("value{}", i);

            let db = trie.proof_for(key.as_bytes()).expect("key is present");
            assert!(db.len() > 1, "deep trie proofs span multiple nodes");
            assert_eq!(
                verify_proof(&root, key.as_bytes(), &db),
                Ok(expected.into_bytes())
            );
        }

        assert!(trie.proof_for(b"key9999").is_none());
    }
}
