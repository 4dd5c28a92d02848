use std::collections::BTreeMap;

use proptest::prelude::*;
use proptest_derive::Arbitrary;

use crate::nibbles::Nibbles;
use crate::trie::{PatriciaTrie, EMPTY_ROOT};

/// Simple model implementation using BTreeMap for comparison
#[derive(Default, Clone)]
struct Model {
    map: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl Model {
    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.map.insert(key, value);
    }

    fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.map.get(key).map(Vec::as_slice)
    }

    fn remove(&mut self, key: &[u8]) -> bool {
        self.map.remove(key).is_some()
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Actions to test against both implementations
#[derive(Arbitrary, Debug, Clone)]
enum Action {
    Insert(KeyValue),
    Get(Key),
    Delete(Key),
}

/// Wrapper for key generation with custom strategy
#[derive(Debug, Clone)]
struct Key(Vec<u8>);

/// Wrapper for key-value pair
#[derive(Debug, Clone)]
struct KeyValue {
    key: Key,
    value: Vec<u8>,
}

impl Arbitrary for Key {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            // Empty key
            Just(Key(vec![])),
            // Short keys (1-4 bytes)
            prop::collection::vec(any::<u8>(), 1..4).prop_map(Key),
            // Medium keys (4-32 bytes)
            prop::collection::vec(any::<u8>(), 4..32).prop_map(Key),
            // Keys drawn from a tiny alphabet so paths collide often
            prop::collection::vec(0x10u8..0x14, 1..6).prop_map(Key),
            // Keys with shared prefixes to exercise extension splitting
            "[a-d]{2,4}".prop_map(|prefix| {
                let mut key = prefix.into_bytes();
                key.extend_from_slice(b"/suffix");
                Key(key)
            }),
        ]
        .boxed()
    }
}

impl Arbitrary for KeyValue {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (any::<Key>(), prop::collection::vec(any::<u8>(), 1..24))
            .prop_map(|(key, value)| KeyValue { key, value })
            .boxed()
    }
}

/// Test harness that executes actions on both PatriciaTrie and Model
#[derive(Default)]
struct Test {
    trie: PatriciaTrie,
    model: Model,
}

impl Test {
    fn execute(&mut self, action: Action) {
        match action {
            Action::Insert(kv) => {
                let key = kv.key.0;
                self.trie.insert(&key, kv.value.clone());
                self.model.insert(key.clone(), kv.value);
                assert_eq!(
                    self.trie.get(&key),
                    self.model.get(&key),
                    "Get after insert mismatch: key={:?}",
                    key
                );
            }
            Action::Get(key) => {
                assert_eq!(
                    self.trie.get(&key.0),
                    self.model.get(&key.0),
                    "Get mismatch: key={:?}",
                    key.0
                );
            }
            Action::Delete(key) => {
                let trie_result = self.trie.delete(&key.0);
                let model_result = self.model.remove(&key.0);
                assert_eq!(
                    trie_result, model_result,
                    "Delete mismatch: key={:?}, trie={}, model={}",
                    key.0, trie_result, model_result
                );
            }
        }

        // Structural invariants hold after every operation
        self.trie.root_node().assert_invariants();
        assert_eq!(
            self.trie.is_empty(),
            self.model.is_empty(),
            "is_empty mismatch"
        );
    }

    /// The root commits to content alone: rebuilding from the model must
    /// reproduce the mutated trie's root hash.
    fn assert_root_matches_rebuilt(&self) {
        let mut rebuilt = PatriciaTrie::new();
        for (key, value) in &self.model.map {
            rebuilt.insert(key, value.clone());
        }
        assert_eq!(
            self.trie.root_hash(),
            rebuilt.root_hash(),
            "mutated trie root differs from rebuilt trie root"
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn proptest_vs_btreemap(actions in prop::collection::vec(any::<Action>(), 1..64)) {
        let mut test = Test::default();
        for action in actions {
            test.execute(action);
        }
        for (key, value) in &test.model.map {
            prop_assert_eq!(test.trie.get(key), Some(value.as_slice()));
        }
        test.assert_root_matches_rebuilt();
    }

    #[test]
    fn proptest_root_is_order_independent(kvs in prop::collection::btree_map(
        any::<Key>().prop_map(|k| k.0),
        prop::collection::vec(any::<u8>(), 1..16),
        0..16,
    )) {
        let mut forward = PatriciaTrie::new();
        for (key, value) in &kvs {
            forward.insert(key, value.clone());
        }

        let mut reverse = PatriciaTrie::new();
        for (key, value) in kvs.iter().rev() {
            reverse.insert(key, value.clone());
        }

        prop_assert_eq!(forward.root_hash(), reverse.root_hash());
    }

    #[test]
    fn proptest_compact_encoding_round_trip(
        raw in prop::collection::vec(0u8..16, 0..64),
        is_leaf in any::<bool>(),
    ) {
        let path = Nibbles::from_raw(raw);
        let encoded = path.to_compact(is_leaf);
        let (decoded, decoded_leaf) = Nibbles::from_compact(&encoded);
        prop_assert_eq!(decoded, path);
        prop_assert_eq!(decoded_leaf, is_leaf);
    }

    #[test]
    fn proptest_delete_all_restores_empty_root(kvs in prop::collection::btree_map(
        any::<Key>().prop_map(|k| k.0),
        prop::collection::vec(any::<u8>(), 1..16),
        0..16,
    )) {
        let mut trie = PatriciaTrie::new();
        for (key, value) in &kvs {
            trie.insert(key, value.clone());
        }

        for key in kvs.keys().rev() {
            prop_assert!(trie.delete(key));
            trie.root_node().assert_invariants();
        }

        prop_assert!(trie.is_empty());
        prop_assert_eq!(trie.root_hash(), EMPTY_ROOT);
    }
}
