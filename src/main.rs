//! # Merkle Patricia Trie Demo
//!
//! Demonstration of the MPT implementation

use mpt_trie::{verify_proof, PatriciaTrie};

fn main() {
    println!("🌳 Merkle Patricia Trie Demo\n");

    // =========================================
    // Test 1: Empty Trie
    // =========================================
    println!("=== Test 1: Empty Trie ===");
    let trie = PatriciaTrie::new();

    println!("Is empty: {}", trie.is_empty());
    println!("Root hash: 0x{}", hex::encode(trie.root_hash()));
    println!("(This is the well-known empty trie root)");
    println!();

    // =========================================
    // Test 2: Single Insert
    // =========================================
    println!("=== Test 2: Single Insert ===");
    let mut trie = PatriciaTrie::new();

    trie.insert(&[0x01, 0x02, 0x03, 0x04], b"hello".to_vec());

    println!("Inserted: [01 02 03 04] -> 'hello'");
    println!("Root hash: 0x{}", hex::encode(trie.root_hash()));

    let value = trie.get(&[0x01, 0x02, 0x03, 0x04]);
    println!(
        "Get [01 02 03 04]: {:?}",
        value.map(|v| String::from_utf8_lossy(v).to_string())
    );
    println!("Get [01 02]: {:?}", trie.get(&[0x01, 0x02]));
    println!();

    // =========================================
    // Test 3: Shared Prefix and Overwrite
    // =========================================
    println!("=== Test 3: Shared Prefix and Overwrite ===");

    trie.insert(&[0x01, 0x02], b"world".to_vec());
    println!("Inserted: [01 02] -> 'world'");
    println!("Root hash: 0x{}", hex::encode(trie.root_hash()));

    trie.insert(&[0x01, 0x02], b"trie".to_vec());
    println!("Overwrote: [01 02] -> 'trie'");
    println!("Root hash: 0x{}", hex::encode(trie.root_hash()));
    println!();

    // =========================================
    // Test 4: Deletions
    // =========================================
    println!("=== Test 4: Deletions ===");
    let mut trie = PatriciaTrie::new();

    trie.insert(b"do", b"verb".to_vec());
    trie.insert(b"dog", b"puppy".to_vec());
    trie.insert(b"doge", b"coin".to_vec());

    println!("Inserted 3 keys");
    println!("Root: 0x{}...", &hex::encode(trie.root_hash())[..16]);

    let deleted = trie.delete(b"dog");
    println!("Deleted 'dog': {}", deleted);
    println!("Root: 0x{}...", &hex::encode(trie.root_hash())[..16]);

    println!("Remaining values:");
    for key in &["do", "dog", "doge"] {
        match trie.get(key.as_bytes()) {
            Some(v) => println!("  '{}' -> '{}'", key, String::from_utf8_lossy(v)),
            None => println!("  '{}' -> DELETED", key),
        }
    }
    println!();

    // =========================================
    // Test 5: Deterministic Roots
    // =========================================
    println!("=== Test 5: Deterministic Roots ===");

    let pairs: [(&[u8], &[u8]); 5] = [
        (&[1, 2, 3, 4], b"hello"),
        (&[1, 2, 5, 4], b"world"),
        (&[1, 2, 6, 4], b"haha"),
        (&[1, 7, 3, 4], b"yessir"),
        (&[9, 2, 3, 4], b"tweet it"),
    ];

    let mut trie_a = PatriciaTrie::new();
    for (key, value) in pairs {
        trie_a.insert(key, value.to_vec());
    }

    let mut trie_b = PatriciaTrie::new();
    for (key, value) in pairs.iter().rev() {
        trie_b.insert(key, value.to_vec());
    }

    println!("Trie A (forward insertion order):");
    println!("  Root: 0x{}", hex::encode(trie_a.root_hash()));
    println!("Trie B (reverse insertion order):");
    println!("  Root: 0x{}", hex::encode(trie_b.root_hash()));
    println!(
        "Same content = same root: {}",
        trie_a.root_hash() == trie_b.root_hash()
    );
    println!();

    // =========================================
    // Test 6: Merkle Proofs
    // =========================================
    println!("=== Test 6: Merkle Proofs ===");

    let root = trie_a.root_hash();
    let db = trie_a.proof_for(&[1, 2, 3, 4]).expect("key is present");

    println!("Proof database for [01 02 03 04]: {} nodes", db.len());

    match verify_proof(&root, &[1, 2, 3, 4], &db) {
        Ok(value) => println!(
            "Verified against root: '{}'",
            String::from_utf8_lossy(&value)
        ),
        Err(err) => println!("Verification failed: {}", err),
    }

    match trie_a.proof_for(&[1, 2, 3, 5]) {
        Some(_) => println!("Unexpected proof for absent key"),
        None => println!("No proof for absent key [01 02 03 05]"),
    }

    println!();
    println!("✅ All MPT demos completed!");
}
