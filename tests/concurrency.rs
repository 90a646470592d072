//! # Shared-Access Tests for Plustree
//!
//! The tree has no internal synchronization: mutation needs `&mut self`.
//! These tests share it between threads behind an external
//! `parking_lot::RwLock`, checking that readers always observe a valid tree
//! and that writers serialized by the lock lose no updates.

use parking_lot::RwLock;
use plustree::BPlusTree;
use rand::prelude::*;
use std::sync::Arc;
use std::thread;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn tree_is_send_and_sync() {
	assert_send_sync::<BPlusTree<i32, String>>();
	assert_send_sync::<BPlusTree<String, Vec<u8>>>();
}

// ===========================================================================
// Writer Tests
// ===========================================================================

#[test]
fn concurrent_insert_disjoint_ranges() {
	let tree = Arc::new(RwLock::new(BPlusTree::<i32, i32>::new(4, 4).unwrap()));
	let num_threads = 4;
	let entries_per_thread = 500;

	let handles: Vec<_> = (0..num_threads)
		.map(|t| {
			let tree = Arc::clone(&tree);
			thread::spawn(move || {
				for i in 0..entries_per_thread {
					let key = t * entries_per_thread + i;
					tree.write().insert(key, key * 10);
				}
			})
		})
		.collect();

	for h in handles {
		h.join().unwrap();
	}

	let tree = tree.read();
	tree.assert_invariants();
	assert_eq!(tree.len(), (num_threads * entries_per_thread) as usize);
	for key in 0..num_threads * entries_per_thread {
		assert_eq!(tree.get(&key), Some(&(key * 10)), "Missing key {}", key);
	}
}

#[test]
fn concurrent_insert_and_remove_same_keys() {
	let tree = Arc::new(RwLock::new(BPlusTree::<i32, usize>::new(3, 3).unwrap()));
	let num_threads = 4;

	let handles: Vec<_> = (0..num_threads)
		.map(|t| {
			let tree = Arc::clone(&tree);
			thread::spawn(move || {
				let mut rng = StdRng::seed_from_u64(t as u64);
				for _ in 0..1000 {
					let key = rng.random_range(0..64);
					let mut guard = tree.write();
					if rng.random_bool(0.5) {
						guard.insert(key, t);
					} else {
						guard.remove(&key);
					}
				}
			})
		})
		.collect();

	for h in handles {
		h.join().unwrap();
	}

	let tree = tree.read();
	tree.assert_invariants();
	assert!(tree.len() <= 64);
	assert!(tree.values().all(|&t| t < num_threads));
}

// ===========================================================================
// Reader Tests
// ===========================================================================

#[test]
fn readers_see_consistent_snapshots_during_writes() {
	let tree = Arc::new(RwLock::new(BPlusTree::<u32, u32>::new(3, 4).unwrap()));
	let writer = {
		let tree = Arc::clone(&tree);
		thread::spawn(move || {
			// Keys are always inserted in pairs so readers can check parity.
			for i in 0..500u32 {
				let mut guard = tree.write();
				guard.insert(2 * i, i);
				guard.insert(2 * i + 1, i);
				if i % 3 == 0 {
					guard.remove(&(2 * (i / 2)));
					guard.remove(&(2 * (i / 2) + 1));
				}
			}
		})
	};

	let readers: Vec<_> = (0..4)
		.map(|_| {
			let tree = Arc::clone(&tree);
			thread::spawn(move || {
				for _ in 0..200 {
					let guard = tree.read();
					let keys: Vec<u32> = guard.keys().copied().collect();
					assert_eq!(keys.len(), guard.len());
					assert_eq!(keys.len() % 2, 0);
					assert!(keys.windows(2).all(|w| w[0] < w[1]));
				}
			})
		})
		.collect();

	writer.join().unwrap();
	for r in readers {
		r.join().unwrap();
	}
	tree.read().assert_invariants();
}

#[test]
fn many_concurrent_range_scans() {
	let mut tree = BPlusTree::new(4, 8).unwrap();
	tree.extend((0..10_000).map(|k| (k, k * 2)));
	let tree = Arc::new(RwLock::new(tree));

	let handles: Vec<_> = (0..4)
		.map(|t| {
			let tree = Arc::clone(&tree);
			thread::spawn(move || {
				let lo = t * 2500;
				let hi = lo + 2499;
				let guard = tree.read();
				let mut count = 0;
				for (k, v) in guard.range(&lo, &hi) {
					assert_eq!(*v, *k * 2);
					count += 1;
				}
				count
			})
		})
		.collect();

	let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
	assert_eq!(total, 10_000);
}
