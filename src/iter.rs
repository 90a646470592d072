//! Iterators over the leaf chain of a [`BPlusTree`](crate::BPlusTree).
//!
//! Every iterator here walks leaves through their `next` (and, for
//! [`Iter::next_back`], `prev`) links rather than re-descending the tree.
use std::iter::FusedIterator;

use crate::node::{LeafArena, LeafId};

#[derive(Debug, Clone, Copy)]
struct Cursor {
	leaf: LeafId,
	pos: usize,
}

/// Double-ended iterator over all entries, ascending by key.
///
/// Created by [`BPlusTree::iter`](crate::BPlusTree::iter).
pub struct Iter<'a, K, V> {
	leaves: &'a LeafArena<K, V>,
	/// Next position to yield from the front.
	front: Cursor,
	/// One past the next position to yield from the back.
	back: Cursor,
	remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
	pub(crate) fn new(leaves: &'a LeafArena<K, V>, first: LeafId, last: LeafId, len: usize) -> Self {
		Iter {
			leaves,
			front: Cursor {
				leaf: first,
				pos: 0,
			},
			back: Cursor {
				leaf: last,
				pos: leaves[last].len(),
			},
			remaining: len,
		}
	}
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
	type Item = (&'a K, &'a V);

	fn next(&mut self) -> Option<Self::Item> {
		if self.remaining == 0 {
			return None;
		}
		let leaves = self.leaves;
		loop {
			let leaf = &leaves[self.front.leaf];
			if self.front.pos < leaf.len() {
				let pos = self.front.pos;
				self.front.pos += 1;
				self.remaining -= 1;
				return Some((&leaf.keys[pos], &leaf.values[pos]));
			}
			self.front = Cursor {
				leaf: leaf.next.expect("leaf chain ended before every entry was visited"),
				pos: 0,
			};
		}
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(self.remaining, Some(self.remaining))
	}
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
	fn next_back(&mut self) -> Option<Self::Item> {
		if self.remaining == 0 {
			return None;
		}
		let leaves = self.leaves;
		loop {
			if self.back.pos > 0 {
				let leaf = &leaves[self.back.leaf];
				self.back.pos -= 1;
				self.remaining -= 1;
				return Some((&leaf.keys[self.back.pos], &leaf.values[self.back.pos]));
			}
			let prev = leaves[self.back.leaf]
				.prev
				.expect("leaf chain ended before every entry was visited");
			self.back = Cursor {
				leaf: prev,
				pos: leaves[prev].len(),
			};
		}
	}
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over the keys of a tree, ascending.
pub struct Keys<'a, K, V> {
	pub(crate) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
	type Item = &'a K;

	fn next(&mut self) -> Option<&'a K> {
		self.inner.next().map(|(k, _)| k)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		self.inner.size_hint()
	}
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
	fn next_back(&mut self) -> Option<Self::Item> {
		self.inner.next_back().map(|(k, _)| k)
	}
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// Iterator over the values of a tree, in key order.
pub struct Values<'a, K, V> {
	pub(crate) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
	type Item = &'a V;

	fn next(&mut self) -> Option<&'a V> {
		self.inner.next().map(|(_, v)| v)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		self.inner.size_hint()
	}
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
	fn next_back(&mut self) -> Option<Self::Item> {
		self.inner.next_back().map(|(_, v)| v)
	}
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

impl<K, V> FusedIterator for Values<'_, K, V> {}

/// Forward iterator over an inclusive key range.
///
/// Created by [`BPlusTree::range`](crate::BPlusTree::range),
/// [`BPlusTree::range_from`](crate::BPlusTree::range_from) and
/// [`BPlusTree::range_to`](crate::BPlusTree::range_to). Starts at a position
/// found by descending the tree once, then follows `next` links until a key
/// exceeds the upper bound.
pub struct Range<'a, K, V> {
	leaves: &'a LeafArena<K, V>,
	/// `None` once the range is exhausted.
	leaf: Option<LeafId>,
	pos: usize,
	/// Inclusive upper bound, `None` to run to the end of the tree.
	upper: Option<K>,
}

impl<'a, K, V> Range<'a, K, V> {
	pub(crate) fn new(leaves: &'a LeafArena<K, V>, start: LeafId, pos: usize, upper: Option<K>) -> Self {
		Range {
			leaves,
			leaf: Some(start),
			pos,
			upper,
		}
	}

	pub(crate) fn empty(leaves: &'a LeafArena<K, V>) -> Self {
		Range {
			leaves,
			leaf: None,
			pos: 0,
			upper: None,
		}
	}
}

impl<'a, K: Ord, V> Iterator for Range<'a, K, V> {
	type Item = (&'a K, &'a V);

	fn next(&mut self) -> Option<Self::Item> {
		let leaves = self.leaves;
		loop {
			let leaf = &leaves[self.leaf?];
			if self.pos < leaf.len() {
				let key = &leaf.keys[self.pos];
				if self.upper.as_ref().is_some_and(|upper| key > upper) {
					self.leaf = None;
					return None;
				}
				let value = &leaf.values[self.pos];
				self.pos += 1;
				return Some((key, value));
			}
			self.leaf = leaf.next;
			self.pos = 0;
		}
	}
}

impl<K: Ord, V> FusedIterator for Range<'_, K, V> {}
