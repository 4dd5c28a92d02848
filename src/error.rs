//! # Error types for MPT

use thiserror::Error;

/// MPT error types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrieError {
    #[error("Key not found")]
    KeyNotFound,

    #[error("Invalid node encoding")]
    InvalidEncoding,

    #[error("Node not found: {0}")]
    NodeMissing(String),

    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
}

/// Result type for trie operations
pub type Result<T> = std::result::Result<T, TrieError>;
