//! Tree nodes and the split/merge/redistribute algorithms.
//!
//! ## Ownership
//!
//! Inner nodes own their children outright. Leaves live in a [`LeafArena`]
//! owned by the tree and are addressed with copyable [`LeafId`] handles: the
//! handle stored in a parent slot is the owning reference, while the
//! `prev`/`next` handles stored in each leaf are cross-links used only for
//! ordered traversal.
//!
//! ```text
//!                 Inner [ 5 | 9 | INF ]
//!                   │      │       │
//!        ┌──────────┘      │       └──────────┐
//!        ▼                 ▼                  ▼
//!   Leaf#0 [1 3] ◄──► Leaf#2 [5 7] ◄──► Leaf#1 [9 11 12]
//! ```
//!
//! ## Slot Semantics
//!
//! Slot `i` of an inner node pairs `keys[i]` with `children[i]`. Every key in
//! `children[i]` is strictly less than `keys[i]` and at least `keys[i - 1]`.
//! The last slot holds [`OrderedKey::Unbounded`].

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::mem;
use std::ops::{Index, IndexMut};

use smallvec::SmallVec;
use tracing::trace;

use crate::config::TreeConfig;
use crate::key::OrderedKey;

/// Number of keys stored inline before a node spills to the heap.
const INLINE_SLOTS: usize = 8;

// ===========================================================================
// Balancing Results
// ===========================================================================

/// Outcome of splitting an overfull node.
///
/// The split node keeps the lower half; `right` is the new sibling that
/// must be linked into the parent after it, separated by `promoted`.
pub(crate) struct Split<K> {
	pub(crate) promoted: K,
	pub(crate) right: Node<K>,
}

/// Outcome of trying to rebalance two adjacent siblings.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Redistribution<K> {
	/// Entries were moved; `boundary` is the new separator between the pair.
	Moved {
		boundary: K,
	},
	/// The pair holds too few entries to leave both halves at minimum
	/// occupancy. The caller must merge them instead.
	TooSmall,
}

// ===========================================================================
// Leaf Arena
// ===========================================================================

/// Handle to a leaf stored in a [`LeafArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct LeafId(usize);

/// Slab of leaf nodes with slot reuse.
pub(crate) struct LeafArena<K, V> {
	slots: Vec<Option<LeafNode<K, V>>>,
	free: Vec<LeafId>,
}

impl<K, V> LeafArena<K, V> {
	pub(crate) fn new() -> Self {
		LeafArena {
			slots: Vec::new(),
			free: Vec::new(),
		}
	}

	/// Stores a leaf and returns its handle, reusing a released slot if any.
	pub(crate) fn alloc(&mut self, leaf: LeafNode<K, V>) -> LeafId {
		match self.free.pop() {
			Some(id) => {
				self.slots[id.0] = Some(leaf);
				id
			}
			None => {
				self.slots.push(Some(leaf));
				LeafId(self.slots.len() - 1)
			}
		}
	}

	/// Removes a leaf from the arena. The handle must not be used afterwards.
	pub(crate) fn release(&mut self, id: LeafId) -> LeafNode<K, V> {
		let leaf = self.slots[id.0].take().expect("released a leaf handle twice");
		self.free.push(id);
		leaf
	}

	/// Number of leaves currently stored.
	pub(crate) fn live(&self) -> usize {
		self.slots.len() - self.free.len()
	}

	/// Mutable access to two distinct leaves at once.
	pub(crate) fn pair_mut(
		&mut self,
		a: LeafId,
		b: LeafId,
	) -> (&mut LeafNode<K, V>, &mut LeafNode<K, V>) {
		assert_ne!(a, b, "a leaf cannot be paired with itself");
		let (first, second) = if a.0 < b.0 {
			let (lo, hi) = self.slots.split_at_mut(b.0);
			(&mut lo[a.0], &mut hi[0])
		} else {
			let (lo, hi) = self.slots.split_at_mut(a.0);
			(&mut hi[0], &mut lo[b.0])
		};
		(
			first.as_mut().expect("dangling leaf handle"),
			second.as_mut().expect("dangling leaf handle"),
		)
	}
}

impl<K, V> Index<LeafId> for LeafArena<K, V> {
	type Output = LeafNode<K, V>;

	#[inline]
	fn index(&self, id: LeafId) -> &LeafNode<K, V> {
		self.slots[id.0].as_ref().expect("dangling leaf handle")
	}
}

impl<K, V> IndexMut<LeafId> for LeafArena<K, V> {
	#[inline]
	fn index_mut(&mut self, id: LeafId) -> &mut LeafNode<K, V> {
		self.slots[id.0].as_mut().expect("dangling leaf handle")
	}
}

// ===========================================================================
// Node
// ===========================================================================

/// A node in the B+ tree, either inner (routing) or leaf (data).
///
/// All leaves are at the same depth. Inner nodes hold only separators.
pub(crate) enum Node<K> {
	/// An inner node routing keys to its children.
	Inner(Box<InnerNode<K>>),
	/// A leaf holding entries, stored in the tree's arena.
	Leaf(LeafId),
}

impl<K: fmt::Debug> fmt::Debug for Node<K> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Node::Inner(inner) => f.debug_tuple("Inner").field(inner).finish(),
			Node::Leaf(id) => f.debug_tuple("Leaf").field(id).finish(),
		}
	}
}

impl<K> Node<K> {
	/// Returns `true` if the node holds more than its maximum.
	#[inline]
	pub(crate) fn is_overfull<V>(&self, leaves: &LeafArena<K, V>, config: &TreeConfig) -> bool {
		match self {
			Node::Inner(inner) => inner.len() > config.max_inner(),
			Node::Leaf(id) => leaves[*id].len() > config.max_leaf(),
		}
	}

	/// Returns `true` if the node holds fewer than its minimum.
	#[inline]
	pub(crate) fn is_underfull<V>(&self, leaves: &LeafArena<K, V>, config: &TreeConfig) -> bool {
		match self {
			Node::Inner(inner) => inner.len() < config.min_inner(),
			Node::Leaf(id) => leaves[*id].len() < config.min_leaf(),
		}
	}

	/// Leftmost leaf of this subtree.
	pub(crate) fn first_leaf(&self) -> LeafId {
		let mut node = self;
		loop {
			match node {
				Node::Inner(inner) => {
					node = inner.children.first().expect("inner node without children")
				}
				Node::Leaf(id) => return *id,
			}
		}
	}

	/// Rightmost leaf of this subtree.
	pub(crate) fn last_leaf(&self) -> LeafId {
		let mut node = self;
		loop {
			match node {
				Node::Inner(inner) => {
					node = inner.children.last().expect("inner node without children")
				}
				Node::Leaf(id) => return *id,
			}
		}
	}

	/// Number of levels in this subtree, counting the leaf level.
	pub(crate) fn height(&self) -> usize {
		let mut height = 1;
		let mut node = self;
		while let Node::Inner(inner) = node {
			node = inner.children.first().expect("inner node without children");
			height += 1;
		}
		height
	}

	/// Counts this node and every node below it.
	pub(crate) fn count_nodes(&self) -> usize {
		match self {
			Node::Inner(inner) => 1 + inner.children.iter().map(Node::count_nodes).sum::<usize>(),
			Node::Leaf(_) => 1,
		}
	}
}

impl<K: Ord> Node<K> {
	/// Descends to the leaf responsible for `key`.
	pub(crate) fn find_leaf<Q>(&self, key: &Q) -> LeafId
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		let mut node = self;
		loop {
			match node {
				Node::Inner(inner) => node = inner.child_for(key),
				Node::Leaf(id) => return *id,
			}
		}
	}

	pub(crate) fn remove<Q, V>(
		&mut self,
		leaves: &mut LeafArena<K, V>,
		config: &TreeConfig,
		key: &Q,
	) -> Option<V>
	where
		K: Borrow<Q> + Clone,
		Q: ?Sized + Ord,
	{
		match self {
			Node::Inner(inner) => inner.remove(leaves, config, key),
			Node::Leaf(id) => leaves[*id].remove(key),
		}
	}
}

impl<K: Ord + Clone> Node<K> {
	pub(crate) fn insert<V>(
		&mut self,
		leaves: &mut LeafArena<K, V>,
		config: &TreeConfig,
		key: K,
		value: V,
	) -> Option<V> {
		match self {
			Node::Inner(inner) => inner.insert(leaves, config, key, value),
			Node::Leaf(id) => leaves[*id].insert(key, value),
		}
	}

	/// Splits an overfull node in two.
	///
	/// A split leaf is linked into the leaf chain directly after itself.
	pub(crate) fn split<V>(&mut self, leaves: &mut LeafArena<K, V>) -> Split<K> {
		match self {
			Node::Inner(inner) => {
				let (promoted, right) = inner.split();
				Split {
					promoted,
					right: Node::Inner(Box::new(right)),
				}
			}
			Node::Leaf(id) => {
				let id = *id;
				let (promoted, mut right) = leaves[id].split();
				let next = leaves[id].next;
				right.prev = Some(id);
				right.next = next;
				let right_id = leaves.alloc(right);
				if let Some(next) = next {
					leaves[next].prev = Some(right_id);
				}
				leaves[id].next = Some(right_id);
				Split {
					promoted,
					right: Node::Leaf(right_id),
				}
			}
		}
	}

	/// Absorbs `right`, the sibling directly after this node.
	///
	/// `parent_key` is the separator between the two in their parent. It is
	/// only needed for inner nodes, where it becomes a regular boundary.
	pub(crate) fn merge<V>(&mut self, right: Node<K>, leaves: &mut LeafArena<K, V>, parent_key: K) {
		match (self, right) {
			(Node::Inner(left), Node::Inner(right)) => left.merge(*right, parent_key),
			(Node::Leaf(left), Node::Leaf(right)) => {
				let absorbed = leaves.release(right);
				let next = absorbed.next;
				leaves[*left].merge(absorbed);
				if let Some(next) = next {
					leaves[next].prev = Some(*left);
				}
			}
			_ => unreachable!("siblings at the same depth must be the same kind of node"),
		}
	}

	/// Evens out this node and `right`, the sibling directly after it.
	pub(crate) fn redistribute<V>(
		&mut self,
		right: &mut Node<K>,
		leaves: &mut LeafArena<K, V>,
		config: &TreeConfig,
		parent_key: &K,
	) -> Redistribution<K> {
		match (self, right) {
			(Node::Inner(left), Node::Inner(right)) => {
				left.redistribute(right, config.min_inner(), parent_key)
			}
			(Node::Leaf(left), Node::Leaf(right)) => {
				let (left, right) = leaves.pair_mut(*left, *right);
				left.redistribute(right, config.min_leaf())
			}
			_ => unreachable!("siblings at the same depth must be the same kind of node"),
		}
	}
}

// ===========================================================================
// Leaf Node
// ===========================================================================

/// A leaf node, storing entries in ascending key order.
///
/// `keys` and `values` are parallel arrays. `prev` and `next` link the leaf
/// into the tree-wide chain used for ordered scans.
pub(crate) struct LeafNode<K, V> {
	/// Sorted keys, no duplicates.
	pub(crate) keys: SmallVec<[K; INLINE_SLOTS]>,
	/// Values corresponding to keys (same index).
	pub(crate) values: SmallVec<[V; INLINE_SLOTS]>,
	/// Leaf holding the next smaller keys, if any.
	pub(crate) prev: Option<LeafId>,
	/// Leaf holding the next larger keys, if any.
	pub(crate) next: Option<LeafId>,
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for LeafNode<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LeafNode")
			.field("keys", &self.keys)
			.field("values", &self.values)
			.field("prev", &self.prev)
			.field("next", &self.next)
			.finish()
	}
}

impl<K, V> LeafNode<K, V> {
	/// Creates a new, empty, unlinked leaf.
	pub(crate) fn new() -> LeafNode<K, V> {
		LeafNode {
			keys: SmallVec::new(),
			values: SmallVec::new(),
			prev: None,
			next: None,
		}
	}

	#[inline]
	pub(crate) fn len(&self) -> usize {
		self.keys.len()
	}

	/// Appends an entry without searching. The caller keeps keys ascending.
	pub(crate) fn push(&mut self, key: K, value: V) {
		self.keys.push(key);
		self.values.push(value);
	}

	/// Binary search for a key.
	///
	/// Returns `(position, exact_match)`, where `position` is the first index
	/// whose key is not less than `key`.
	#[inline]
	pub(crate) fn lower_bound<Q>(&self, key: &Q) -> (usize, bool)
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		match self.keys.binary_search_by(|probe| probe.borrow().cmp(key)) {
			Ok(pos) => (pos, true),
			Err(pos) => (pos, false),
		}
	}

	pub(crate) fn get<Q>(&self, key: &Q) -> Option<&V>
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		match self.lower_bound(key) {
			(pos, true) => Some(&self.values[pos]),
			(_, false) => None,
		}
	}

	/// Inserts or overwrites an entry, returning the previous value.
	pub(crate) fn insert(&mut self, key: K, value: V) -> Option<V>
	where
		K: Ord,
	{
		match self.lower_bound(&key) {
			(pos, true) => Some(mem::replace(&mut self.values[pos], value)),
			(pos, false) => {
				self.keys.insert(pos, key);
				self.values.insert(pos, value);
				None
			}
		}
	}

	pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		match self.lower_bound(key) {
			(pos, true) => {
				self.keys.remove(pos);
				Some(self.values.remove(pos))
			}
			(_, false) => None,
		}
	}

	/// Absorbs every entry of `right` and takes over its `next` link.
	///
	/// The leaf after `right` still points back at `right` and has to be
	/// relinked by the caller.
	pub(crate) fn merge(&mut self, right: LeafNode<K, V>) {
		trace!(left = self.len(), right = right.len(), "node.leaf.merge");
		self.keys.extend(right.keys);
		self.values.extend(right.values);
		self.next = right.next;
	}
}

impl<K: Clone, V> LeafNode<K, V> {
	/// Moves the upper half of the entries into a new, unlinked leaf.
	///
	/// The left half keeps `ceil(n / 2)` entries. The promoted key is the
	/// first key of the new leaf and stays in it (copy-up).
	pub(crate) fn split(&mut self) -> (K, LeafNode<K, V>) {
		let mid = self.len().div_ceil(2);
		let right = LeafNode {
			keys: self.keys.drain(mid..).collect(),
			values: self.values.drain(mid..).collect(),
			prev: None,
			next: None,
		};
		let promoted = right.keys.first().expect("split requires at least two entries").clone();
		trace!(left = self.len(), right = right.len(), "node.leaf.split");
		(promoted, right)
	}

	/// Shares entries evenly with `right`.
	///
	/// Fails with [`Redistribution::TooSmall`] unless the pair holds at least
	/// `2 * min_leaf` entries. On success the left side keeps
	/// `floor(total / 2)` entries.
	pub(crate) fn redistribute(
		&mut self,
		right: &mut LeafNode<K, V>,
		min_leaf: usize,
	) -> Redistribution<K> {
		let total = self.len() + right.len();
		if total < min_leaf * 2 {
			return Redistribution::TooSmall;
		}

		self.keys.extend(right.keys.drain(..));
		self.values.extend(right.values.drain(..));
		let mid = total / 2;
		right.keys = self.keys.drain(mid..).collect();
		right.values = self.values.drain(mid..).collect();

		trace!(left = self.len(), right = right.len(), "node.leaf.redistribute");
		Redistribution::Moved {
			boundary: right.keys[0].clone(),
		}
	}
}

// ===========================================================================
// Inner Node
// ===========================================================================

/// An inner (routing) node.
///
/// # Structure
///
/// ```text
/// keys:      [ K0,  K1,  ...  INF ]
/// children:  [ C0,  C1,  ...  Cn  ]
///
/// Navigation: follow the first slot i with key < keys[i].
///             A key equal to keys[i] goes to slot i + 1.
/// ```
pub(crate) struct InnerNode<K> {
	/// Boundaries, ascending; the last one is always `Unbounded`.
	pub(crate) keys: SmallVec<[OrderedKey<K>; INLINE_SLOTS]>,
	/// One child per boundary.
	pub(crate) children: SmallVec<[Node<K>; INLINE_SLOTS]>,
}

impl<K: fmt::Debug> fmt::Debug for InnerNode<K> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("InnerNode")
			.field("keys", &self.keys)
			.field("children", &self.children)
			.finish()
	}
}

impl<K> InnerNode<K> {
	/// Creates a new inner node with no slots.
	pub(crate) fn new() -> InnerNode<K> {
		InnerNode {
			keys: SmallVec::new(),
			children: SmallVec::new(),
		}
	}

	/// Builds the two-slot root created when the old root splits.
	pub(crate) fn from_split(left: Node<K>, promoted: K, right: Node<K>) -> InnerNode<K> {
		let mut root = InnerNode::new();
		root.push(OrderedKey::Bounded(promoted), left);
		root.push(OrderedKey::Unbounded, right);
		root
	}

	#[inline]
	pub(crate) fn len(&self) -> usize {
		self.children.len()
	}

	/// Appends a slot. The caller keeps boundaries ascending.
	pub(crate) fn push(&mut self, key: OrderedKey<K>, child: Node<K>) {
		self.keys.push(key);
		self.children.push(child);
	}

	/// Index of the slot whose subtree covers `key`.
	#[inline]
	pub(crate) fn child_index<Q>(&self, key: &Q) -> usize
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		// Boundaries <= key are skipped, so equal keys route right.
		self.keys.partition_point(|boundary| boundary.cmp_key(key) != Ordering::Greater)
	}

	#[inline]
	pub(crate) fn child_for<Q>(&self, key: &Q) -> &Node<K>
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		self.children.get(self.child_index(key)).expect("inner node must route every key to a child")
	}

	/// Absorbs `right`; this node's `Unbounded` slot becomes `parent_key`.
	pub(crate) fn merge(&mut self, right: InnerNode<K>, parent_key: K) {
		trace!(left = self.len(), right = right.len(), "node.inner.merge");
		*self.keys.last_mut().expect("inner node without slots") = OrderedKey::Bounded(parent_key);
		self.keys.extend(right.keys);
		self.children.extend(right.children);
	}

	/// Moves the upper half of the slots into a new node.
	///
	/// The left half keeps `ceil(n / 2)` slots. The boundary of its last slot
	/// is pushed up to the parent and replaced with `Unbounded`.
	pub(crate) fn split(&mut self) -> (K, InnerNode<K>) {
		let mid = self.len().div_ceil(2);
		let right = InnerNode {
			keys: self.keys.drain(mid..).collect(),
			children: self.children.drain(mid..).collect(),
		};
		let promoted = self.close_right_edge();
		trace!(left = self.len(), right = right.len(), "node.inner.split");
		(promoted, right)
	}

	/// Turns the last boundary into `Unbounded`, returning the key it held.
	fn close_right_edge(&mut self) -> K {
		let last = self.keys.last_mut().expect("inner node without slots");
		mem::replace(last, OrderedKey::Unbounded)
			.into_bounded()
			.expect("only the last slot of the unsplit node is unbounded")
	}
}

impl<K: Clone> InnerNode<K> {
	/// Shares slots evenly with `right`.
	///
	/// Fails with [`Redistribution::TooSmall`] unless the pair holds at least
	/// `2 * min_inner` slots.
	pub(crate) fn redistribute(
		&mut self,
		right: &mut InnerNode<K>,
		min_inner: usize,
		parent_key: &K,
	) -> Redistribution<K> {
		let total = self.len() + right.len();
		if total < min_inner * 2 {
			return Redistribution::TooSmall;
		}

		*self.keys.last_mut().expect("inner node without slots") =
			OrderedKey::Bounded(parent_key.clone());
		self.keys.extend(right.keys.drain(..));
		self.children.extend(right.children.drain(..));
		let mid = total / 2;
		right.keys = self.keys.drain(mid..).collect();
		right.children = self.children.drain(mid..).collect();

		trace!(left = self.len(), right = right.len(), "node.inner.redistribute");
		Redistribution::Moved {
			boundary: self.close_right_edge(),
		}
	}
}

impl<K: Ord + Clone> InnerNode<K> {
	fn insert<V>(
		&mut self,
		leaves: &mut LeafArena<K, V>,
		config: &TreeConfig,
		key: K,
		value: V,
	) -> Option<V> {
		let idx = self.child_index(&key);
		let previous = self.children[idx].insert(leaves, config, key, value);

		if self.children[idx].is_overfull(leaves, config) {
			// The slot keeps its boundary but now leads to the right half; the
			// left half gets a new slot in front of it.
			let Split {
				promoted,
				right,
			} = self.children[idx].split(leaves);
			let left = mem::replace(&mut self.children[idx], right);
			self.keys.insert(idx, OrderedKey::Bounded(promoted));
			self.children.insert(idx, left);
		}

		previous
	}

	fn remove<Q, V>(&mut self, leaves: &mut LeafArena<K, V>, config: &TreeConfig, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		let idx = self.child_index(key);
		let removed = self.children[idx].remove(leaves, config, key)?;

		if self.children[idx].is_underfull(leaves, config) {
			self.rebalance(leaves, config, idx);
		}

		Some(removed)
	}

	/// Repairs the underfull child at `idx` together with a neighbour.
	///
	/// The right neighbour is used unless the child is the last slot, in which
	/// case the pair is formed with the left neighbour instead.
	fn rebalance<V>(&mut self, leaves: &mut LeafArena<K, V>, config: &TreeConfig, idx: usize) {
		let first = if idx + 1 == self.len() {
			idx.checked_sub(1).expect("an inner node with one child cannot rebalance it")
		} else {
			idx
		};
		let second = first + 1;
		let parent_key =
			self.keys[first].as_bounded().cloned().expect("only the last slot is unbounded");

		let (left, right) = self.children.split_at_mut(second);
		match left[first].redistribute(&mut right[0], leaves, config, &parent_key) {
			Redistribution::Moved {
				boundary,
			} => {
				self.keys[first] = OrderedKey::Bounded(boundary);
			}
			Redistribution::TooSmall => {
				let absorbed_key = self.keys.remove(second);
				let absorbed = self.children.remove(second);
				self.children[first].merge(absorbed, leaves, parent_key);
				self.keys[first] = absorbed_key;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn leaf_of(keys: &[i32]) -> LeafNode<i32, i32> {
		let mut leaf = LeafNode::new();
		for &k in keys {
			leaf.push(k, k * 10);
		}
		leaf
	}

	fn inner_of(bounds: &[i32], leaves: &mut LeafArena<i32, i32>) -> InnerNode<i32> {
		let mut inner = InnerNode::new();
		for &b in bounds {
			inner.push(OrderedKey::Bounded(b), Node::Leaf(leaves.alloc(LeafNode::new())));
		}
		inner.push(OrderedKey::Unbounded, Node::Leaf(leaves.alloc(LeafNode::new())));
		inner
	}

	fn bounds(inner: &InnerNode<i32>) -> Vec<OrderedKey<i32>> {
		inner.keys.iter().cloned().collect()
	}

	// -----------------------------------------------------------------------
	// LeafNode
	// -----------------------------------------------------------------------

	#[test]
	fn leaf_lower_bound_positions() {
		let leaf = leaf_of(&[10, 20, 30]);
		assert_eq!(leaf.lower_bound(&5), (0, false));
		assert_eq!(leaf.lower_bound(&20), (1, true));
		assert_eq!(leaf.lower_bound(&25), (2, false));
		assert_eq!(leaf.lower_bound(&35), (3, false));

		let empty: LeafNode<i32, i32> = LeafNode::new();
		assert_eq!(empty.lower_bound(&1), (0, false));
	}

	#[test]
	fn leaf_insert_overwrites_in_place() {
		let mut leaf = leaf_of(&[1, 3]);
		assert_eq!(leaf.insert(2, 20), None);
		assert_eq!(leaf.insert(3, 99), Some(30));
		assert_eq!(&leaf.keys[..], &[1, 2, 3]);
		assert_eq!(&leaf.values[..], &[10, 20, 99]);
	}

	#[test]
	fn leaf_remove_missing_key_is_noop() {
		let mut leaf = leaf_of(&[1, 3]);
		assert_eq!(leaf.remove(&2), None);
		assert_eq!(leaf.remove(&3), Some(30));
		assert_eq!(&leaf.keys[..], &[1]);
	}

	#[test]
	fn leaf_split_keeps_ceil_half_on_the_left() {
		let mut leaf = leaf_of(&[1, 2, 3, 4, 5]);
		let (promoted, right) = leaf.split();
		assert_eq!(promoted, 4);
		assert_eq!(&leaf.keys[..], &[1, 2, 3]);
		assert_eq!(&right.keys[..], &[4, 5]);
		assert_eq!(&right.values[..], &[40, 50]);
	}

	#[test]
	fn leaf_split_relinks_chain() {
		let mut leaves = LeafArena::new();
		let a = leaves.alloc(leaf_of(&[1, 2, 3, 4]));
		let c = leaves.alloc(leaf_of(&[9]));
		leaves[a].next = Some(c);
		leaves[c].prev = Some(a);

		let mut node = Node::Leaf(a);
		let split = node.split(&mut leaves);
		let Node::Leaf(b) = split.right else {
			panic!("leaf split must produce a leaf");
		};

		assert_eq!(split.promoted, 3);
		assert_eq!(leaves[a].next, Some(b));
		assert_eq!(leaves[b].prev, Some(a));
		assert_eq!(leaves[b].next, Some(c));
		assert_eq!(leaves[c].prev, Some(b));
	}

	#[test]
	fn leaf_redistribute_at_exact_threshold() {
		// min_leaf = 2: 1 + 3 entries is exactly 2 * min and must redistribute.
		let mut left = leaf_of(&[1]);
		let mut right = leaf_of(&[5, 6, 7]);
		assert_eq!(
			left.redistribute(&mut right, 2),
			Redistribution::Moved {
				boundary: 6
			}
		);
		assert_eq!(&left.keys[..], &[1, 5]);
		assert_eq!(&right.keys[..], &[6, 7]);
		assert_eq!(&right.values[..], &[60, 70]);
	}

	#[test]
	fn leaf_redistribute_below_threshold_fails() {
		let mut left = leaf_of(&[1]);
		let mut right = leaf_of(&[5, 6]);
		assert_eq!(left.redistribute(&mut right, 2), Redistribution::TooSmall);
		assert_eq!(&left.keys[..], &[1]);
		assert_eq!(&right.keys[..], &[5, 6]);
	}

	#[test]
	fn leaf_merge_releases_and_relinks() {
		let mut leaves = LeafArena::new();
		let a = leaves.alloc(leaf_of(&[1]));
		let b = leaves.alloc(leaf_of(&[4, 5]));
		let c = leaves.alloc(leaf_of(&[8, 9]));
		leaves[a].next = Some(b);
		leaves[b].prev = Some(a);
		leaves[b].next = Some(c);
		leaves[c].prev = Some(b);

		let mut left = Node::Leaf(a);
		left.merge(Node::Leaf(b), &mut leaves, 4);

		assert_eq!(&leaves[a].keys[..], &[1, 4, 5]);
		assert_eq!(leaves[a].next, Some(c));
		assert_eq!(leaves[c].prev, Some(a));
		assert_eq!(leaves.live(), 2);

		// The released slot is reused.
		assert_eq!(leaves.alloc(LeafNode::new()), b);
	}

	// -----------------------------------------------------------------------
	// InnerNode
	// -----------------------------------------------------------------------

	#[test]
	fn inner_routes_equal_keys_right() {
		let mut leaves = LeafArena::new();
		let inner = inner_of(&[10, 20], &mut leaves);
		assert_eq!(inner.child_index(&5), 0);
		assert_eq!(inner.child_index(&10), 1);
		assert_eq!(inner.child_index(&19), 1);
		assert_eq!(inner.child_index(&20), 2);
		assert_eq!(inner.child_index(&i32::MAX), 2);
	}

	#[test]
	fn inner_split_pushes_up_last_left_boundary() {
		let mut leaves = LeafArena::new();
		let mut inner = inner_of(&[10, 20, 30], &mut leaves);
		let (promoted, right) = inner.split();

		assert_eq!(promoted, 20);
		assert_eq!(bounds(&inner), vec![OrderedKey::Bounded(10), OrderedKey::Unbounded]);
		assert_eq!(bounds(&right), vec![OrderedKey::Bounded(30), OrderedKey::Unbounded]);
	}

	#[test]
	fn inner_merge_resolves_sentinel_to_parent_key() {
		let mut leaves = LeafArena::new();
		let mut left = inner_of(&[10], &mut leaves);
		let right = inner_of(&[30], &mut leaves);
		left.merge(right, 20);

		assert_eq!(
			bounds(&left),
			vec![
				OrderedKey::Bounded(10),
				OrderedKey::Bounded(20),
				OrderedKey::Bounded(30),
				OrderedKey::Unbounded
			]
		);
		assert_eq!(left.len(), 4);
	}

	#[test]
	fn inner_redistribute_moves_boundary() {
		let mut leaves = LeafArena::new();
		// min_inner = 2: 1 + 3 slots is exactly 2 * min.
		let mut left = inner_of(&[], &mut leaves);
		let mut right = inner_of(&[30, 40], &mut leaves);

		assert_eq!(
			left.redistribute(&mut right, 2, &20),
			Redistribution::Moved {
				boundary: 30
			}
		);
		assert_eq!(bounds(&left), vec![OrderedKey::Bounded(20), OrderedKey::Unbounded]);
		assert_eq!(bounds(&right), vec![OrderedKey::Bounded(40), OrderedKey::Unbounded]);
	}

	#[test]
	fn inner_redistribute_below_threshold_fails() {
		let mut leaves = LeafArena::new();
		let mut left = inner_of(&[], &mut leaves);
		let mut right = inner_of(&[30], &mut leaves);
		assert_eq!(left.redistribute(&mut right, 2, &20), Redistribution::TooSmall);
		assert_eq!(left.len(), 1);
		assert_eq!(right.len(), 2);
	}
}
