//! # Plustree: An Ordered B+ Tree Map
//!
//! This crate provides an in-memory ordered map backed by a B+ tree, with
//! ordered range scans over linked leaves and plain-text snapshots.
//!
//! ## Design Overview
//!
//! **Inner nodes** hold an ordered list of slots, each pairing a boundary key
//! with a child. A key is routed to the first slot whose boundary is greater
//! than it. The last slot of every inner node holds the
//! [`OrderedKey::Unbounded`] sentinel, so every key has somewhere to go.
//!
//! **Leaf nodes** hold the entries, sorted by key, and are doubly linked into
//! a single chain. Scans descend the tree once and then follow the chain.
//!
//! **Balancing** keeps every node except the root between half full (rounded
//! up) and full:
//! - an overfull node is split in two and a separator is promoted to its
//!   parent; an overfull root grows a new root above it;
//! - an underfull node first tries to borrow from a neighbour
//!   (redistribution), and merges with it when the pair is too small; an
//!   inner root left with a single child is replaced by that child.
//!
//! ### Tree Structure
//!
//! ```text
//!                    ┌──────────────────────┐
//!                    │      Inner Node      │  <- boundaries + children
//!                    │  [ 5 │ 9 │ INF ]     │
//!                    └──┬─────┬─────┬───────┘
//!                       │     │     │
//!              ┌────────┘     │     └────────┐
//!              ▼              ▼              ▼
//!        ┌──────────┐  ┌──────────┐  ┌──────────┐
//!        │   Leaf   │◄─►   Leaf   │◄─►   Leaf   │  <- entries, linked in order
//!        │ [1, 3]   │  │ [5, 7]   │  │ [9, 12]  │
//!        └──────────┘  └──────────┘  └──────────┘
//! ```
//!
//! ## Basic Usage
//!
//! ```
//! use plustree::BPlusTree;
//!
//! let mut tree = BPlusTree::new(4, 4).unwrap();
//!
//! tree.insert(3, "three");
//! tree.insert(1, "one");
//! tree.insert(2, "two");
//!
//! assert_eq!(tree.get(&2), Some(&"two"));
//! assert_eq!(tree.remove(&1), Some("one"));
//!
//! let keys: Vec<_> = tree.keys().copied().collect();
//! assert_eq!(keys, vec![2, 3]);
//! ```
//!
//! ## Snapshots
//!
//! [`BPlusTree::save`] writes the whole tree as line-oriented text and
//! [`BPlusTree::load`] rebuilds it; see [`codec`] for the format. Keys and
//! values are converted with caller-supplied [`StringCodec`]s.
//!
//! ## Thread Safety
//!
//! The tree has no internal synchronization. Mutation takes `&mut self`; to
//! share a tree between threads, wrap it in a lock.

use std::borrow::Borrow;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::mem;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

pub mod codec;
pub mod config;
pub mod dump;
pub mod error;
pub mod iter;
pub mod key;
mod node;

pub use codec::{DisplayCodec, StringCodec};
pub use config::TreeConfig;
pub use dump::{NodeDump, TreeDump};
pub use error::{Error, Result};
pub use key::OrderedKey;

use codec::{SnapshotReader, SnapshotWriter};
use node::{InnerNode, LeafArena, LeafId, LeafNode, Node, Split};

// ---------------------------------------------------------------------------
// Core Tree Structure
// ---------------------------------------------------------------------------

/// An ordered map backed by a B+ tree.
///
/// # Type Parameters
///
/// - `K`: The key type. Must implement `Ord + Clone` for mutation; boundary
///   keys are cloned into inner nodes on splits.
/// - `V`: The value type.
///
/// # Internal Structure
///
/// - `root` is either a single leaf (height 1) or an inner node.
/// - Leaves live in an arena owned by the tree and are addressed by handle,
///   which lets them link to their neighbours without shared ownership.
/// - `len` counts entries and is maintained on every insert and remove, so
///   [`len`](BPlusTree::len) never scans.
pub struct BPlusTree<K, V> {
	root: Node<K>,
	leaves: LeafArena<K, V>,
	config: TreeConfig,

	/// Number of entries in the tree.
	len: usize,

	/// The current height of the tree.
	/// - Height 1: Tree contains only a single leaf node (the root)
	/// - Height N: N-1 levels of inner nodes plus one level of leaves
	height: usize,
}

impl<K, V> Default for BPlusTree<K, V> {
	fn default() -> Self {
		Self::with_config(TreeConfig::default())
	}
}

impl<K, V> BPlusTree<K, V> {
	// -----------------------------------------------------------------------
	// Construction
	// -----------------------------------------------------------------------

	/// Creates an empty tree with the given maximum node sizes.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidConfig`] if `max_inner < 3` or `max_leaf < 2`.
	///
	/// # Example
	///
	/// ```
	/// use plustree::BPlusTree;
	///
	/// let tree: BPlusTree<u32, String> = BPlusTree::new(3, 3).unwrap();
	/// assert!(tree.is_empty());
	/// assert_eq!(tree.height(), 1); // Single leaf node
	///
	/// assert!(BPlusTree::<u32, String>::new(2, 3).is_err());
	/// ```
	pub fn new(max_inner: usize, max_leaf: usize) -> Result<Self> {
		Ok(Self::with_config(TreeConfig::new(max_inner, max_leaf)?))
	}

	/// Creates an empty tree from a validated configuration.
	pub fn with_config(config: TreeConfig) -> Self {
		let mut leaves = LeafArena::new();
		let root = Node::Leaf(leaves.alloc(LeafNode::new()));
		BPlusTree {
			root,
			leaves,
			config,
			len: 0,
			height: 1,
		}
	}

	// -----------------------------------------------------------------------
	// Tree Metadata
	// -----------------------------------------------------------------------

	/// Returns the size limits this tree was built with.
	pub fn config(&self) -> TreeConfig {
		self.config
	}

	/// Maximum number of slots per inner node.
	pub fn max_inner(&self) -> usize {
		self.config.max_inner()
	}

	/// Maximum number of entries per leaf node.
	pub fn max_leaf(&self) -> usize {
		self.config.max_leaf()
	}

	/// Returns the number of entries in the tree.
	///
	/// Maintained incrementally; this is O(1).
	pub fn len(&self) -> usize {
		self.len
	}

	/// Returns `true` if the tree holds no entries.
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Returns the current height of the tree.
	///
	/// - Height 1: Tree contains only a single leaf node (the root)
	/// - Height 2: One inner root with leaf children
	/// - Height N: N-1 levels of inner nodes plus leaves
	pub fn height(&self) -> usize {
		self.height
	}

	/// Counts every node in the tree by walking it. Diagnostic only.
	pub fn count_nodes(&self) -> usize {
		self.root.count_nodes()
	}

	/// Captures the node structure, depth first, without modifying anything.
	///
	/// # Example
	///
	/// ```
	/// use plustree::BPlusTree;
	///
	/// let mut tree = BPlusTree::new(3, 3).unwrap();
	/// for k in 1..=4 {
	/// 	tree.insert(k, ());
	/// }
	/// assert_eq!(tree.dump().to_string(), "I[3, INF]\n   L[1, 2]\n   L[3, 4]\n");
	/// ```
	pub fn dump(&self) -> TreeDump<'_, K> {
		TreeDump::capture(&self.root, &self.leaves)
	}

	// -----------------------------------------------------------------------
	// Ordered Traversal
	// -----------------------------------------------------------------------

	/// Iterates over all entries in ascending key order.
	///
	/// The iterator is double-ended: iterating from the back follows the
	/// leaves' `prev` links.
	pub fn iter(&self) -> iter::Iter<'_, K, V> {
		iter::Iter::new(&self.leaves, self.root.first_leaf(), self.root.last_leaf(), self.len)
	}

	/// Iterates over all keys in ascending order.
	pub fn keys(&self) -> iter::Keys<'_, K, V> {
		iter::Keys {
			inner: self.iter(),
		}
	}

	/// Iterates over all values in ascending key order.
	pub fn values(&self) -> iter::Values<'_, K, V> {
		iter::Values {
			inner: self.iter(),
		}
	}

	/// Returns the entry with the smallest key.
	pub fn first_key_value(&self) -> Option<(&K, &V)> {
		self.iter().next()
	}

	/// Returns the entry with the largest key.
	pub fn last_key_value(&self) -> Option<(&K, &V)> {
		self.iter().next_back()
	}

	/// Returns `true` if any entry holds `value`. Scans every leaf.
	pub fn contains_value(&self, value: &V) -> bool
	where
		V: PartialEq,
	{
		self.values().any(|v| v == value)
	}

	/// Removes every entry, leaving a single empty leaf as the root.
	pub fn clear(&mut self) {
		debug!(entries = self.len, "tree.clear");
		*self = Self::with_config(self.config);
	}
}

impl<K: Ord + Clone, V> BPlusTree<K, V> {
	// -----------------------------------------------------------------------
	// Point Operations
	// -----------------------------------------------------------------------

	/// Returns a reference to the value stored under `key`.
	pub fn get<Q>(&self, key: &Q) -> Option<&V>
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		self.leaves[self.root.find_leaf(key)].get(key)
	}

	/// Returns a mutable reference to the value stored under `key`.
	pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		let leaf = &mut self.leaves[self.root.find_leaf(key)];
		match leaf.lower_bound(key) {
			(pos, true) => Some(&mut leaf.values[pos]),
			(_, false) => None,
		}
	}

	/// Returns `true` if the tree holds an entry for `key`.
	pub fn contains_key<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		self.get(key).is_some()
	}

	/// Inserts an entry, returning the value previously stored under `key`.
	///
	/// Overwriting an existing key leaves [`len`](BPlusTree::len) unchanged.
	/// Grows the tree by at most one level.
	///
	/// # Example
	///
	/// ```
	/// use plustree::BPlusTree;
	///
	/// let mut tree = BPlusTree::new(3, 3).unwrap();
	/// assert_eq!(tree.insert("a", 1), None);
	/// assert_eq!(tree.insert("a", 2), Some(1));
	/// assert_eq!(tree.len(), 1);
	/// ```
	pub fn insert(&mut self, key: K, value: V) -> Option<V> {
		let previous = self.root.insert(&mut self.leaves, &self.config, key, value);
		if previous.is_none() {
			self.len += 1;
		}
		if self.root.is_overfull(&self.leaves, &self.config) {
			self.promote_root();
		}
		previous
	}

	/// Removes the entry for `key`, returning its value.
	///
	/// Removing a missing key changes nothing and returns `None`. Shrinks the
	/// tree by at most one level.
	pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		let removed = self.root.remove(&mut self.leaves, &self.config, key)?;
		self.len -= 1;
		self.demote_root();
		Some(removed)
	}

	/// Splits an overfull root and places a new two-slot root above it.
	fn promote_root(&mut self) {
		let Split {
			promoted,
			right,
		} = self.root.split(&mut self.leaves);
		let left = mem::replace(&mut self.root, Node::Inner(Box::new(InnerNode::new())));
		self.root = Node::Inner(Box::new(InnerNode::from_split(left, promoted, right)));
		self.height += 1;
		debug!(height = self.height, entries = self.len, "tree.root.promote");
	}

	/// Replaces an inner root that is down to one child with that child.
	fn demote_root(&mut self) {
		let only_child = match &mut self.root {
			Node::Inner(inner) if inner.len() == 1 => inner.children.pop(),
			_ => None,
		};
		if let Some(child) = only_child {
			self.root = child;
			self.height -= 1;
			debug!(height = self.height, entries = self.len, "tree.root.demote");
		}
	}

	// -----------------------------------------------------------------------
	// Range Queries
	// -----------------------------------------------------------------------

	/// Entries with keys in `lo..=hi`, ascending. Empty if `lo > hi`.
	///
	/// # Example
	///
	/// ```
	/// use plustree::BPlusTree;
	///
	/// let mut tree = BPlusTree::new(3, 3).unwrap();
	/// for k in 0..10 {
	/// 	tree.insert(k, k * 10);
	/// }
	/// let found: Vec<_> = tree.range(&3, &5).map(|(k, _)| *k).collect();
	/// assert_eq!(found, vec![3, 4, 5]);
	/// ```
	pub fn range(&self, lo: &K, hi: &K) -> iter::Range<'_, K, V> {
		if lo > hi {
			return iter::Range::empty(&self.leaves);
		}
		self.seek(lo, Some(hi.clone()))
	}

	/// Entries with keys `>= lo`, ascending.
	pub fn range_from(&self, lo: &K) -> iter::Range<'_, K, V> {
		self.seek(lo, None)
	}

	/// Entries with keys `<= hi`, ascending, starting at the leftmost leaf.
	pub fn range_to(&self, hi: &K) -> iter::Range<'_, K, V> {
		iter::Range::new(&self.leaves, self.root.first_leaf(), 0, Some(hi.clone()))
	}

	fn seek(&self, lo: &K, upper: Option<K>) -> iter::Range<'_, K, V> {
		let leaf = self.root.find_leaf(lo);
		let (pos, _) = self.leaves[leaf].lower_bound(lo);
		iter::Range::new(&self.leaves, leaf, pos, upper)
	}

	// -----------------------------------------------------------------------
	// Snapshots
	// -----------------------------------------------------------------------

	/// Writes the tree to `path` in snapshot format, replacing the file.
	///
	/// # Errors
	///
	/// [`Error::Unencodable`] if a key or value renders to text that would not
	/// read back, or [`Error::Io`] if the file cannot be written. A failed
	/// save leaves any existing file at `path` untouched.
	pub fn save<P, KC, VC>(&self, path: P, key_codec: KC, value_codec: VC) -> Result<()>
	where
		P: AsRef<Path>,
		KC: StringCodec<K>,
		VC: StringCodec<V>,
	{
		let path = path.as_ref();
		let dir = match path.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent,
			_ => Path::new("."),
		};
		// The previous snapshot stays in place until the new one is complete.
		let mut staged = NamedTempFile::new_in(dir)?;
		self.write_to(BufWriter::new(staged.as_file_mut()), key_codec, value_codec)?;
		staged.as_file().sync_all()?;
		staged.persist(path).map_err(|err| Error::Io(err.error))?;
		debug!(
			path = %path.display(),
			entries = self.len,
			height = self.height,
			"tree.snapshot.save"
		);
		Ok(())
	}

	/// Writes the tree in snapshot format to any writer.
	pub fn write_to<W, KC, VC>(&self, out: W, key_codec: KC, value_codec: VC) -> Result<()>
	where
		W: Write,
		KC: StringCodec<K>,
		VC: StringCodec<V>,
	{
		SnapshotWriter::new(out, &self.leaves, key_codec, value_codec).write(&self.config, &self.root)
	}

	/// Rebuilds a tree from a snapshot file written by [`save`](BPlusTree::save).
	///
	/// The node size limits are taken from the snapshot.
	///
	/// # Errors
	///
	/// [`Error::Malformed`] if the text is truncated, does not parse, or
	/// describes a tree that breaks ordering or occupancy rules;
	/// [`Error::Io`] if the file cannot be read.
	pub fn load<P, KC, VC>(path: P, key_codec: KC, value_codec: VC) -> Result<Self>
	where
		P: AsRef<Path>,
		KC: StringCodec<K>,
		VC: StringCodec<V>,
	{
		let file = File::open(path.as_ref())?;
		Self::read_from(BufReader::new(file), key_codec, value_codec)
	}

	/// Rebuilds a tree from snapshot text read from any buffered reader.
	pub fn read_from<R, KC, VC>(input: R, key_codec: KC, value_codec: VC) -> Result<Self>
	where
		R: BufRead,
		KC: StringCodec<K>,
		VC: StringCodec<V>,
	{
		let snapshot = SnapshotReader::new(input, key_codec, value_codec).read()?;
		let tree = BPlusTree {
			height: snapshot.root.height(),
			root: snapshot.root,
			leaves: snapshot.leaves,
			config: snapshot.config,
			len: snapshot.len,
		};
		debug!(
			entries = tree.len,
			nodes = tree.count_nodes(),
			height = tree.height,
			"tree.snapshot.load"
		);
		Ok(tree)
	}
}

impl<K: Ord + Clone, V> Extend<(K, V)> for BPlusTree<K, V> {
	fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, entries: I) {
		for (key, value) in entries {
			self.insert(key, value);
		}
	}
}

impl<'a, K, V> IntoIterator for &'a BPlusTree<K, V> {
	type Item = (&'a K, &'a V);
	type IntoIter = iter::Iter<'a, K, V>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for BPlusTree<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.iter()).finish()
	}
}

// ===========================================================================
// Invariant Validation
// ===========================================================================

impl<K: Ord + fmt::Debug, V> BPlusTree<K, V> {
	/// Validates all tree invariants. Panics with diagnostic info if any
	/// invariant is violated.
	///
	/// Meant to be called from tests after operations to verify the tree
	/// maintains its structural integrity.
	///
	/// # Invariants Checked
	///
	/// 1. Height consistency: all leaves at depth `height - 1`
	/// 2. Key ordering: keys strictly ascending within each node
	/// 3. Boundary ranges: every key in slot `i` is `>= keys[i-1]` and `< keys[i]`
	/// 4. Sentinel placement: only the last slot of an inner node is `Unbounded`
	/// 5. Occupancy: non-root nodes hold between the minimum and maximum
	/// 6. Leaf chain: `next`/`prev` links visit the leaves in tree order
	/// 7. Entry count: `len()` matches the number of stored entries
	pub fn assert_invariants(&self) {
		let mut chain = Vec::new();
		let mut leaf_depth = None;
		let entries = self.validate_node(&self.root, 0, None, None, &mut leaf_depth, &mut chain);

		assert_eq!(entries, self.len, "len() {} != stored entries {}", self.len, entries);
		assert_eq!(
			leaf_depth.map(|depth| depth + 1),
			Some(self.height),
			"leaves at depth {:?} but height is {}",
			leaf_depth,
			self.height
		);
		assert_eq!(
			self.leaves.live(),
			chain.len(),
			"arena holds {} leaves but only {} are reachable",
			self.leaves.live(),
			chain.len()
		);

		// Invariant 6: the chain mirrors the in-order leaf sequence
		assert_eq!(self.leaves[chain[0]].prev, None, "leftmost leaf has a prev link");
		assert_eq!(self.leaves[chain[chain.len() - 1]].next, None, "rightmost leaf has a next link");
		for pair in chain.windows(2) {
			assert_eq!(self.leaves[pair[0]].next, Some(pair[1]), "broken next link after {:?}", pair[0]);
			assert_eq!(self.leaves[pair[1]].prev, Some(pair[0]), "broken prev link before {:?}", pair[1]);
		}
	}

	/// Recursively validates a node and its subtree, returning its entry count.
	///
	/// # Arguments
	/// * `lower` - Inclusive lower bound from the parent, None if leftmost
	/// * `upper` - Exclusive upper bound from the parent, None if rightmost
	fn validate_node(
		&self,
		node: &Node<K>,
		depth: usize,
		lower: Option<&K>,
		upper: Option<&K>,
		leaf_depth: &mut Option<usize>,
		chain: &mut Vec<LeafId>,
	) -> usize {
		match node {
			Node::Leaf(id) => {
				let leaf = &self.leaves[*id];

				// Invariant 1: Height consistency
				match *leaf_depth {
					Some(expected) => {
						assert_eq!(depth, expected, "leaf at depth {} but others at {}", depth, expected)
					}
					None => *leaf_depth = Some(depth),
				}

				assert_eq!(
					leaf.keys.len(),
					leaf.values.len(),
					"Leaf keys.len() {} != values.len() {}",
					leaf.keys.len(),
					leaf.values.len()
				);

				// Invariant 5: Occupancy
				assert!(leaf.len() <= self.config.max_leaf(), "leaf overfull: {:?}", leaf.keys);
				if depth > 0 {
					assert!(
						leaf.len() >= self.config.min_leaf(),
						"leaf underfull at depth {}: {:?}",
						depth,
						leaf.keys
					);
				}

				// Invariant 2: Key ordering
				for i in 1..leaf.keys.len() {
					assert!(
						leaf.keys[i - 1] < leaf.keys[i],
						"Keys not sorted at positions {} and {}: {:?} >= {:?}",
						i - 1,
						i,
						leaf.keys[i - 1],
						leaf.keys[i]
					);
				}

				// Invariant 3: Boundary ranges
				for key in &leaf.keys[..] {
					if let Some(lower) = lower {
						assert!(key >= lower, "Key {:?} below parent lower bound {:?}", key, lower);
					}
					if let Some(upper) = upper {
						assert!(key < upper, "Key {:?} not below parent boundary {:?}", key, upper);
					}
				}

				chain.push(*id);
				leaf.len()
			}
			Node::Inner(inner) => {
				assert_eq!(
					inner.keys.len(),
					inner.children.len(),
					"Inner keys.len() {} != children.len() {}",
					inner.keys.len(),
					inner.children.len()
				);

				// Invariant 5: Occupancy
				let min = if depth == 0 {
					2
				} else {
					self.config.min_inner()
				};
				assert!(
					(min..=self.config.max_inner()).contains(&inner.len()),
					"inner node at depth {} has {} slots: {:?}",
					depth,
					inner.len(),
					inner.keys
				);

				// Invariant 4: Sentinel placement
				let (last, bounded) = inner.keys.split_last().expect("inner node without slots");
				assert!(last.is_unbounded(), "last boundary {:?} is not INF", last);
				for (i, boundary) in bounded.iter().enumerate() {
					assert!(!boundary.is_unbounded(), "INF boundary at slot {} of {}", i, inner.len());
				}

				// Invariant 2: Key ordering
				for i in 1..bounded.len() {
					assert!(
						bounded[i - 1] < bounded[i],
						"Inner keys not sorted at {} and {}: {:?} >= {:?}",
						i - 1,
						i,
						bounded[i - 1],
						bounded[i]
					);
				}

				// Recurse into children
				let mut entries = 0;
				let mut child_lower = lower;
				for (boundary, child) in inner.keys.iter().zip(&inner.children) {
					let child_upper = boundary.as_bounded().or(upper);
					entries +=
						self.validate_node(child, depth + 1, child_lower, child_upper, leaf_depth, chain);
					child_lower = boundary.as_bounded();
				}
				entries
			}
		}
	}
}
