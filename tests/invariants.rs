//! # Invariant Testing for Plustree
//!
//! This module contains tests designed to validate tree invariants across
//! structure modifications. It focuses on:
//!
//! - Boundary conditions for splits, redistribution and merges
//! - Root promotion and demotion
//! - Randomized operations with invariant validation

use plustree::{BPlusTree, NodeDump};
use rand::prelude::*;

/// Sizes of every leaf, left to right.
fn leaf_sizes<K, V>(tree: &BPlusTree<K, V>) -> Vec<usize> {
	tree.dump().nodes().iter().filter(|n| n.is_leaf()).map(NodeDump::size).collect()
}

// ===========================================================================
// Split Boundary Tests
// ===========================================================================

/// Fills a leaf to capacity, then inserts one more to trigger a split.
#[test]
fn split_at_exact_leaf_capacity() {
	let mut tree: BPlusTree<i32, i32> = BPlusTree::new(4, 8).unwrap();

	for i in 0..8 {
		tree.insert(i, i * 10);
	}
	tree.assert_invariants();
	assert_eq!(tree.height(), 1);

	tree.insert(8, 80);
	tree.assert_invariants();
	assert_eq!(tree.height(), 2);
	// 9 entries split at ceil(9 / 2)
	assert_eq!(leaf_sizes(&tree), vec![5, 4]);

	for i in 0..=8 {
		assert_eq!(tree.get(&i), Some(&(i * 10)), "Key {} not found after split", i);
	}
}

/// Fills an inner node to capacity so that the next leaf split splits it too.
#[test]
fn split_at_exact_inner_capacity() {
	let mut tree: BPlusTree<i32, i32> = BPlusTree::new(3, 2).unwrap();

	let mut i = 0;
	while tree.height() < 3 {
		tree.insert(i, i);
		tree.assert_invariants();
		i += 1;
	}

	let dump = tree.dump();
	let inner_sizes: Vec<usize> = dump.nodes().iter().filter(|n| !n.is_leaf()).map(NodeDump::size).collect();
	// New root over two inner nodes, each at least half full.
	assert_eq!(inner_sizes[0], 2);
	assert!(inner_sizes[1..].iter().all(|&n| (2..=3).contains(&n)));
}

/// Ascending inserts exercise the rightmost-split path only.
#[test]
fn sequential_ascending_insert() {
	let mut tree: BPlusTree<i32, i32> = BPlusTree::new(3, 3).unwrap();
	for i in 0..1000 {
		tree.insert(i, i);
	}
	tree.assert_invariants();
	assert_eq!(tree.len(), 1000);
}

/// Descending inserts exercise the leftmost-split path only.
#[test]
fn sequential_descending_insert() {
	let mut tree: BPlusTree<i32, i32> = BPlusTree::new(3, 3).unwrap();
	for i in (0..1000).rev() {
		tree.insert(i, i);
	}
	tree.assert_invariants();
	assert_eq!(tree.keys().copied().collect::<Vec<_>>(), (0..1000).collect::<Vec<_>>());
}

// ===========================================================================
// Merge and Redistribution Tests
// ===========================================================================

#[test]
fn redistribute_at_exactly_twice_minimum() {
	// max_leaf 4 => min_leaf 2; five entries split into [0, 1, 2] [3, 4]
	let mut tree: BPlusTree<i32, i32> = BPlusTree::new(3, 4).unwrap();
	for i in 0..5 {
		tree.insert(i, i);
	}
	assert_eq!(leaf_sizes(&tree), vec![3, 2]);

	// remove 4 -> [0, 1, 2] + [3] holds 4 = 2 * min_leaf entries
	tree.remove(&4);
	tree.assert_invariants();
	assert_eq!(leaf_sizes(&tree), vec![2, 2]);
	assert_eq!(tree.height(), 2);
}

#[test]
fn merge_below_twice_minimum() {
	let mut tree: BPlusTree<i32, i32> = BPlusTree::new(3, 4).unwrap();
	for i in 0..5 {
		tree.insert(i, i);
	}
	tree.remove(&0);
	tree.remove(&4);
	tree.assert_invariants();
	// [1, 2] [3] would be 3 < 4 entries: merged back into the root leaf
	assert_eq!(leaf_sizes(&tree), vec![3]);
	assert_eq!(tree.height(), 1);
}

#[test]
fn cascading_merge_shrinks_height() {
	let mut tree: BPlusTree<i32, i32> = BPlusTree::new(3, 2).unwrap();
	for i in 0..200 {
		tree.insert(i, i);
	}
	let tall = tree.height();
	assert!(tall >= 4);

	let mut heights = vec![tall];
	for i in 0..200 {
		tree.remove(&i);
		tree.assert_invariants();
		if heights.last() != Some(&tree.height()) {
			heights.push(tree.height());
		}
	}
	// Height only ever drops one level at a time.
	assert!(heights.windows(2).all(|w| w[0] == w[1] + 1), "{heights:?}");
	assert_eq!(tree.height(), 1);
}

#[test]
fn remove_from_middle_keeps_chain_linked() {
	let mut tree: BPlusTree<i32, i32> = BPlusTree::new(3, 3).unwrap();
	for i in 0..300 {
		tree.insert(i, i);
	}
	for i in 100..200 {
		tree.remove(&i);
		tree.assert_invariants();
	}
	let forward: Vec<i32> = tree.keys().copied().collect();
	let mut backward: Vec<i32> = tree.keys().rev().copied().collect();
	backward.reverse();
	assert_eq!(forward, backward);
	assert_eq!(forward.len(), 200);
}

// ===========================================================================
// Randomized Operation Tests
// ===========================================================================

/// Random inserts and removes on small nodes, validating after every step.
#[test]
fn random_operations_small_nodes() {
	let mut rng = StdRng::seed_from_u64(0x5eed);
	for (max_inner, max_leaf) in [(3, 2), (3, 3), (4, 5), (7, 4)] {
		let mut tree: BPlusTree<i32, i32> = BPlusTree::new(max_inner, max_leaf).unwrap();
		let mut expected = std::collections::BTreeMap::new();

		for _ in 0..2000 {
			let key = rng.random_range(0..200);
			if rng.random_bool(0.6) {
				assert_eq!(tree.insert(key, key * 3), expected.insert(key, key * 3));
			} else {
				assert_eq!(tree.remove(&key), expected.remove(&key));
			}
			tree.assert_invariants();
		}

		assert_eq!(tree.len(), expected.len());
		assert!(tree.iter().eq(expected.iter()));
	}
}

/// Random keys inserted then removed in a different random order.
#[test]
fn random_insert_then_shuffled_remove() {
	let mut rng = rand::rng();
	let mut keys: Vec<u32> = (0..2000).collect();
	keys.shuffle(&mut rng);

	let mut tree: BPlusTree<u32, u32> = BPlusTree::new(5, 6).unwrap();
	for &k in &keys {
		tree.insert(k, k);
	}
	tree.assert_invariants();

	keys.shuffle(&mut rng);
	for (removed, &k) in keys.iter().enumerate() {
		assert_eq!(tree.remove(&k), Some(k));
		assert_eq!(tree.len(), keys.len() - removed - 1);
		if removed % 50 == 0 {
			tree.assert_invariants();
		}
	}
	tree.assert_invariants();
	assert!(tree.is_empty());
}

/// Overwrites never change structure or length.
#[test]
fn random_overwrites_keep_shape() {
	let mut rng = StdRng::seed_from_u64(7);
	let mut tree: BPlusTree<i32, i32> = BPlusTree::new(3, 3).unwrap();
	for i in 0..500 {
		tree.insert(i, 0);
	}
	let nodes = tree.count_nodes();

	for _ in 0..2000 {
		let key = rng.random_range(0..500);
		assert!(tree.insert(key, 1).is_some());
	}
	assert_eq!(tree.count_nodes(), nodes);
	assert_eq!(tree.len(), 500);
	tree.assert_invariants();
}
