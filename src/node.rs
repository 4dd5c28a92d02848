//! # MPT Node Types
//!
//! The MPT has four node kinds:
//! 1. Empty - absence of a node
//! 2. Leaf - stores a value at the end of a key
//! 3. Extension - shares a common prefix path
//! 4. Branch - 16-way branch point + optional value
//!
//! Nodes own their children outright; the canonical encoding embeds a
//! child inline when its encoding is under 32 bytes and by keccak256
//! reference otherwise.

use alloy_primitives::{keccak256, B256};

use crate::nibbles::Nibbles;
use crate::rlp;

/// MPT node types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Empty node (null)
    Empty,

    /// Leaf node: [encoded_path, value]
    /// The path is the remaining key nibbles
    Leaf { path: Nibbles, value: Vec<u8> },

    /// Extension node: [encoded_path, child]
    /// Shares a common prefix to save space
    Extension { path: Nibbles, next: Box<Node> },

    /// Branch node: [child0, child1, ..., child15, value]
    /// 16 children (one per nibble) + optional value
    Branch {
        children: Box<[Node; 16]>,
        value: Option<Vec<u8>>,
    },
}

impl Default for Node {
    fn default() -> Self {
        Node::Empty
    }
}

impl Node {
    /// Create empty branch node
    pub fn empty_branch() -> Self {
        Node::Branch {
            children: Box::new([
                Node::Empty,
                Node::Empty,
                Node::Empty,
                Node::Empty,
                Node::Empty,
                Node::Empty,
                Node::Empty,
                Node::Empty,
                Node::Empty,
                Node::Empty,
                Node::Empty,
                Node::Empty,
                Node::Empty,
                Node::Empty,
                Node::Empty,
                Node::Empty,
            ]),
            value: None,
        }
    }

    /// Create leaf node
    pub fn leaf(path: Nibbles, value: Vec<u8>) -> Self {
        Node::Leaf { path, value }
    }

    /// Create extension node
    pub fn extension(path: Nibbles, next: Node) -> Self {
        Node::Extension {
            path,
            next: Box::new(next),
        }
    }

    /// Check if node is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }

    /// Canonical encoding of this node's subtree.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Node::Empty => vec![rlp::EMPTY_STRING],

            Node::Leaf { path, value } => {
                let mut payload = rlp::encode_bytes(&path.to_compact(true));
                payload.extend(rlp::encode_bytes(value));
                rlp::encode_list(&payload)
            }

            Node::Extension { path, next } => {
                let mut payload = rlp::encode_bytes(&path.to_compact(false));
                append_child_ref(&mut payload, next);
                rlp::encode_list(&payload)
            }

            Node::Branch { children, value } => {
                let mut payload = Vec::new();
                for child in children.iter() {
                    append_child_ref(&mut payload, child);
                }
                match value {
                    Some(v) => payload.extend(rlp::encode_bytes(v)),
                    None => payload.push(rlp::EMPTY_STRING),
                }
                rlp::encode_list(&payload)
            }
        }
    }

    /// Keccak-256 of the canonical encoding.
    ///
    /// For the empty node this is the well-known empty trie root.
    pub fn hash(&self) -> B256 {
        keccak256(self.encode())
    }
}

/// Append a child reference to a parent payload: nothing for an empty
/// slot, the child's encoding spliced in verbatim when it is under 32
/// bytes, its keccak256 digest as a byte string otherwise.
///
/// The threshold applies to the encoded child, not its in-memory size.
fn append_child_ref(payload: &mut Vec<u8>, child: &Node) {
    match child {
        Node::Empty => payload.push(rlp::EMPTY_STRING),
        _ => {
            let encoded = child.encode();
            if encoded.len() < 32 {
                payload.extend(encoded);
            } else {
                payload.extend(rlp::encode_bytes(keccak256(&encoded).as_slice()));
            }
        }
    }
}

#[cfg(test)]
impl Node {
    /// Walk the subtree and panic on any structural violation:
    /// no leaf/extension path with out-of-range nibbles, no empty values,
    /// non-empty extension paths targeting branches only, and branches
    /// with at least two live entries.
    pub(crate) fn assert_invariants(&self) {
        match self {
            Node::Empty => {}

            Node::Leaf { path, value } => {
                assert!(path.as_slice().iter().all(|n| *n < 16), "leaf path nibble out of range");
                assert!(!value.is_empty(), "leaf with empty value");
            }

            Node::Extension { path, next } => {
                assert!(!path.is_empty(), "extension with empty path");
                assert!(path.as_slice().iter().all(|n| *n < 16), "extension path nibble out of range");
                assert!(
                    matches!(**next, Node::Branch { .. }),
                    "extension target is not a branch"
                );
                next.assert_invariants();
            }

            Node::Branch { children, value } => {
                let live = children.iter().filter(|c| !c.is_empty()).count()
                    + usize::from(value.is_some());
                assert!(live >= 2, "branch with fewer than two live entries");
                if let Some(v) = value {
                    assert!(!v.is_empty(), "branch with empty value");
                }
                for child in children.iter() {
                    child.assert_invariants();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::EMPTY_ROOT;

    #[test]
    fn test_empty_node() {
        let node = Node::Empty;
        assert!(node.is_empty());
        assert_eq!(node.encode(), vec![0x80]);
        assert_eq!(node.hash(), EMPTY_ROOT);
    }

    #[test]
    fn test_leaf_encoding() {
        // Leaf over key bytes [1,2,3,4] holding "hello":
        // [0x20 0x01 0x02 0x03 0x04] + "hello", both short strings
        let node = Node::leaf(Nibbles::from_bytes(&[1, 2, 3, 4]), b"hello".to_vec());
        let encoded = node.encode();
        assert_eq!(
            encoded,
            vec![
                0xcc, 0x85, 0x20, 0x01, 0x02, 0x03, 0x04, 0x85, b'h', b'e', b'l', b'l', b'o'
            ]
        );
    }

    #[test]
    fn test_small_child_is_inlined() {
        let leaf = Node::leaf(Nibbles::from_raw(vec![3, 0, 4]), b"hi".to_vec());
        let leaf_encoded = leaf.encode();
        assert!(leaf_encoded.len() < 32);

        let branch = {
            let mut branch = Node::empty_branch();
            if let Node::Branch {
                ref mut children,
                ref mut value,
            } = branch
            {
                children[0] = leaf;
                *value = Some(b"x".to_vec());
            }
            branch
        };

        // The child's encoding appears verbatim inside the parent's
        let parent_encoded = branch.encode();
        assert!(parent_encoded
            .windows(leaf_encoded.len())
            .any(|w| w == &leaf_encoded[..]));
    }

    #[test]
    fn test_large_child_is_hashed() {
        let leaf = Node::leaf(Nibbles::from_raw(vec![3, 0, 4]), vec![0xee; 40]);
        let leaf_encoded = leaf.encode();
        assert!(leaf_encoded.len() >= 32);
        let leaf_hash = keccak256(&leaf_encoded);

        let branch = {
            let mut branch = Node::empty_branch();
            if let Node::Branch {
                ref mut children,
                ref mut value,
            } = branch
            {
                children[0] = leaf;
                *value = Some(b"x".to_vec());
            }
            branch
        };

        let parent_encoded = branch.encode();
        // The digest is embedded, the raw child encoding is not
        assert!(parent_encoded
            .windows(32)
            .any(|w| w == leaf_hash.as_slice()));
        assert!(!parent_encoded
            .windows(leaf_encoded.len())
            .any(|w| w == &leaf_encoded[..]));
    }

    #[test]
    fn test_extension_encoding() {
        let mut branch = Node::empty_branch();
        if let Node::Branch {
            ref mut children, ..
        } = branch
        {
            children[1] = Node::leaf(Nibbles::from_raw(vec![2]), b"a".to_vec());
            children[7] = Node::leaf(Nibbles::from_raw(vec![9]), b"b".to_vec());
        }
        let node = Node::extension(Nibbles::from_raw(vec![0, 1]), branch);

        let encoded = node.encode();
        assert!(!encoded.is_empty());
        // First item is the compact path for an even extension
        assert_eq!(&encoded[1..4], &[0x82, 0x00, 0x01]);
    }

    #[test]
    fn test_branch_with_value_has_17_items() {
        let mut branch = Node::empty_branch();
        if let Node::Branch {
            ref mut children,
            ref mut value,
        } = branch
        {
            children[0] = Node::leaf(Nibbles::from_raw(vec![1]), b"a".to_vec());
            *value = Some(b"value".to_vec());
        }

        let items = crate::rlp::decode_list(&branch.encode()).unwrap();
        assert_eq!(items.len(), 17);
        assert_eq!(items[16], b"value".to_vec());
    }
}
