//! # Patricia Trie
//!
//! The main trie data structure with insert, get, and delete operations.
//! Nodes are owned by their parent edge; mutation rebuilds the affected
//! subtree and splices the new root in place of the old one.

use alloy_primitives::{keccak256, B256};

use crate::nibbles::Nibbles;
use crate::node::Node;
use crate::proof::{MemoryProofDb, ProofSink};

/// Empty trie root hash: keccak256 of the encoded empty byte string.
pub const EMPTY_ROOT: B256 = B256::new([
    0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8,
    0x6e, 0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63,
    0xb4, 0x21,
]);

/// Merkle Patricia Trie
#[derive(Debug, Clone, Default)]
pub struct PatriciaTrie {
    /// Root node
    root: Node,
}

impl PatriciaTrie {
    /// Create new empty trie
    pub fn new() -> Self {
        PatriciaTrie { root: Node::Empty }
    }

    /// Check if trie is empty
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Get root hash.
    ///
    /// The empty trie hashes to the well-known sentinel [`EMPTY_ROOT`].
    pub fn root_hash(&self) -> B256 {
        self.root.hash()
    }

    /// Get value for key.
    ///
    /// The returned slice borrows the trie and stays valid until the next
    /// mutation.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        let nibbles = Nibbles::from_bytes(key);
        Self::get_node(&self.root, &nibbles)
    }

    /// Internal recursive get
    fn get_node<'a>(node: &'a Node, key: &Nibbles) -> Option<&'a [u8]> {
        match node {
            Node::Empty => None,

            Node::Leaf { path, value } => {
                if path == key {
                    Some(value)
                } else {
                    None
                }
            }

            Node::Extension { path, next } => {
                if key.common_prefix_len(path) < path.len() {
                    return None;
                }
                Self::get_node(next, &key.slice(path.len()))
            }

            Node::Branch { children, value } => match key.first() {
                None => value.as_deref(),
                Some(idx) => Self::get_node(&children[idx as usize], &key.slice(1)),
            },
        }
    }

    /// Insert key-value pair, replacing any previous value.
    ///
    /// Inserting an empty value is equivalent to [`delete`](Self::delete):
    /// the trie never stores empty values, so the branch-value encoding
    /// slot stays unambiguous.
    pub fn insert(&mut self, key: &[u8], value: Vec<u8>) {
        if value.is_empty() {
            self.delete(key);
            return;
        }
        let nibbles = Nibbles::from_bytes(key);
        let root = std::mem::take(&mut self.root);
        self.root = Self::insert_node(root, nibbles, value);
    }

    /// Internal recursive insert, consuming the old subtree and returning
    /// the new one.
    fn insert_node(node: Node, key: Nibbles, value: Vec<u8>) -> Node {
        match node {
            Node::Empty => Node::leaf(key, value),

            Node::Leaf {
                path,
                value: leaf_value,
            } => {
                let common = key.common_prefix_len(&path);
                if common == key.len() && common == path.len() {
                    // Same key, update in place
                    return Node::leaf(key, value);
                }

                // Split into a branch; whichever side runs out of nibbles
                // at the split point stores its value on the branch itself.
                let mut branch = Node::empty_branch();
                if let Node::Branch {
                    ref mut children,
                    value: ref mut branch_value,
                } = branch
                {
                    if common == path.len() {
                        *branch_value = Some(leaf_value);
                    } else {
                        let idx = path.get(common).unwrap() as usize;
                        children[idx] = Node::leaf(path.slice(common + 1), leaf_value);
                    }

                    if common == key.len() {
                        *branch_value = Some(value);
                    } else {
                        let idx = key.get(common).unwrap() as usize;
                        children[idx] = Node::leaf(key.slice(common + 1), value);
                    }
                }

                if common == 0 {
                    branch
                } else {
                    Node::extension(key.slice_range(0, common), branch)
                }
            }

            Node::Extension { path, next } => {
                let common = key.common_prefix_len(&path);
                if common == path.len() {
                    // Full match, skip through and continue below
                    let rest = key.slice(common);
                    return Node::Extension {
                        path,
                        next: Box::new(Self::insert_node(*next, rest, value)),
                    };
                }

                // Partial match: shorten this extension and fan out at a
                // new branch holding the diverging remainders.
                let mut branch = Node::empty_branch();
                if let Node::Branch {
                    ref mut children,
                    value: ref mut branch_value,
                } = branch
                {
                    let idx = path.get(common).unwrap() as usize;
                    children[idx] = if common + 1 == path.len() {
                        *next
                    } else {
                        Node::Extension {
                            path: path.slice(common + 1),
                            next,
                        }
                    };

                    if common < key.len() {
                        let idx = key.get(common).unwrap() as usize;
                        children[idx] = Node::leaf(key.slice(common + 1), value);
                    } else if common == key.len() {
                        *branch_value = Some(value);
                    } else {
                        unreachable!("common prefix longer than key");
                    }
                }

                if common == 0 {
                    branch
                } else {
                    Node::extension(path.slice_range(0, common), branch)
                }
            }

            Node::Branch {
                mut children,
                value: branch_value,
            } => match key.first() {
                None => Node::Branch {
                    children,
                    value: Some(value),
                },
                Some(idx) => {
                    let idx = idx as usize;
                    let child = std::mem::take(&mut children[idx]);
                    children[idx] = Self::insert_node(child, key.slice(1), value);
                    Node::Branch {
                        children,
                        value: branch_value,
                    }
                }
            },
        }
    }

    /// Delete key from trie. Returns whether the key was present; deleting
    /// an absent key leaves the trie untouched.
    pub fn delete(&mut self, key: &[u8]) -> bool {
        let nibbles = Nibbles::from_bytes(key);
        let root = std::mem::take(&mut self.root);
        let (dirty, new_root) = Self::delete_node(root, &nibbles);
        self.root = new_root;
        dirty
    }

    /// Internal recursive delete.
    ///
    /// Returns `(dirty, new_subroot)`; a clean result hands the subtree
    /// back unchanged, a dirty one carries the repaired replacement so
    /// structural fixes propagate upward.
    fn delete_node(node: Node, key: &Nibbles) -> (bool, Node) {
        match node {
            Node::Empty => (false, Node::Empty),

            Node::Leaf { path, value } => {
                if path == *key {
                    (true, Node::Empty)
                } else {
                    (false, Node::Leaf { path, value })
                }
            }

            Node::Extension { path, next } => {
                if key.common_prefix_len(&path) < path.len() {
                    return (false, Node::Extension { path, next });
                }
                let rest = key.slice(path.len());
                let (dirty, child) = Self::delete_node(*next, &rest);
                if !dirty {
                    return (
                        false,
                        Node::Extension {
                            path,
                            next: Box::new(child),
                        },
                    );
                }
                (true, Self::collapse_extension(path, child))
            }

            Node::Branch { mut children, value } => match key.first() {
                None => {
                    if value.is_none() {
                        return (false, Node::Branch { children, value });
                    }
                    (true, Self::collapse_branch(children, None))
                }
                Some(idx) => {
                    let idx = idx as usize;
                    let child = std::mem::take(&mut children[idx]);
                    let (dirty, new_child) = Self::delete_node(child, &key.slice(1));
                    children[idx] = new_child;
                    if !dirty {
                        return (false, Node::Branch { children, value });
                    }
                    (true, Self::collapse_branch(children, value))
                }
            },
        }
    }

    /// Repair an extension whose child changed: merge runs of nibbles so
    /// an extension never sits directly above a leaf or another extension.
    fn collapse_extension(path: Nibbles, child: Node) -> Node {
        match child {
            Node::Empty => Node::Empty,

            Node::Leaf {
                path: child_path,
                value,
            } => {
                let mut merged = path;
                merged.extend(&child_path);
                Node::Leaf {
                    path: merged,
                    value,
                }
            }

            Node::Extension {
                path: child_path,
                next,
            } => {
                let mut merged = path;
                merged.extend(&child_path);
                Node::Extension { path: merged, next }
            }

            branch @ Node::Branch { .. } => Node::extension(path, branch),
        }
    }

    /// Repair a branch after a deletion: a branch must keep at least two
    /// live entries (counting its value), otherwise it folds into its
    /// single remaining entry.
    fn collapse_branch(mut children: Box<[Node; 16]>, value: Option<Vec<u8>>) -> Node {
        let live_children = children.iter().filter(|c| !c.is_empty()).count();

        if live_children >= 2 || (live_children == 1 && value.is_some()) {
            return Node::Branch { children, value };
        }

        if live_children == 0 {
            match value {
                Some(value) => {
                    return Node::Leaf {
                        path: Nibbles::new(),
                        value,
                    }
                }
                None => unreachable!("branch reduced to zero live entries"),
            }
        }

        // Single live child, no value: fold it upward behind its nibble
        let idx = children
            .iter()
            .position(|c| !c.is_empty())
            .expect("one live child");
        let child = std::mem::take(&mut children[idx]);
        let mut prefix = Nibbles::new();
        prefix.push(idx as u8);

        match child {
            Node::Leaf { path, value } => {
                prefix.extend(&path);
                Node::Leaf {
                    path: prefix,
                    value,
                }
            }

            Node::Extension { path, next } => {
                prefix.extend(&path);
                Node::Extension { path: prefix, next }
            }

            branch @ Node::Branch { .. } => Node::extension(prefix, branch),

            Node::Empty => unreachable!("live child vanished"),
        }
    }

    /// Emit a membership proof for `key` into `sink`.
    ///
    /// Every node on the search path, the root included, is written as
    /// `hash -> canonical encoding`. Returns whether the walk ended at the
    /// key's value; on a miss the sink may hold a partial path.
    pub fn prove(&self, key: &[u8], sink: &mut dyn ProofSink) -> bool {
        let nibbles = Nibbles::from_bytes(key);
        Self::prove_node(&self.root, &nibbles, sink)
    }

    /// Internal recursive proof emission
    fn prove_node(node: &Node, key: &Nibbles, sink: &mut dyn ProofSink) -> bool {
        if node.is_empty() {
            return false;
        }

        let encoded = node.encode();
        sink.insert(keccak256(&encoded), encoded);

        match node {
            Node::Empty => unreachable!("handled above"),

            Node::Leaf { path, .. } => path == key,

            Node::Extension { path, next } => {
                if key.common_prefix_len(path) < path.len() {
                    return false;
                }
                Self::prove_node(next, &key.slice(path.len()), sink)
            }

            Node::Branch { children, value } => match key.first() {
                None => value.is_some(),
                Some(idx) => Self::prove_node(&children[idx as usize], &key.slice(1), sink),
            },
        }
    }

    /// Build an in-memory proof database for `key`, or `None` when the key
    /// is absent.
    pub fn proof_for(&self, key: &[u8]) -> Option<MemoryProofDb> {
        let mut db = MemoryProofDb::new();
        if self.prove(key, &mut db) {
            Some(db)
        } else {
            None
        }
    }

    #[cfg(test)]
    pub(crate) fn root_node(&self) -> &Node {
        &self.root
    }
}
