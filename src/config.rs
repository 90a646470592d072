//! Node size limits.

use crate::error::{Error, Result};

/// Default capacity for inner (index) nodes.
/// Each inner node can hold up to `INNER_CAPACITY` slots, one per child.
/// A larger value reduces tree height but increases split/merge costs.
pub const INNER_CAPACITY: usize = 64;

/// Default capacity for leaf nodes.
/// Each leaf node can hold up to `LEAF_CAPACITY` key-value pairs.
pub const LEAF_CAPACITY: usize = 64;

/// Smallest inner capacity for which splits and merges stay well defined.
pub const MIN_INNER_CAPACITY: usize = 3;

/// Smallest leaf capacity for which splits and merges stay well defined.
pub const MIN_LEAF_CAPACITY: usize = 2;

/// Maximum node sizes for a tree, and the minimums derived from them.
///
/// A node overflows when it holds more than its maximum and underflows when
/// it holds fewer than half of it (rounded up). Only the root is allowed to
/// underflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
	max_inner: usize,
	max_leaf: usize,
}

impl TreeConfig {
	/// Validates and builds a configuration.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidConfig`] if `max_inner < 3` or `max_leaf < 2`.
	pub fn new(max_inner: usize, max_leaf: usize) -> Result<Self> {
		if max_inner < MIN_INNER_CAPACITY || max_leaf < MIN_LEAF_CAPACITY {
			return Err(Error::InvalidConfig {
				max_inner,
				max_leaf,
			});
		}
		Ok(TreeConfig {
			max_inner,
			max_leaf,
		})
	}

	/// Maximum number of slots in an inner node.
	#[inline]
	pub fn max_inner(&self) -> usize {
		self.max_inner
	}

	/// Maximum number of entries in a leaf node.
	#[inline]
	pub fn max_leaf(&self) -> usize {
		self.max_leaf
	}

	/// Minimum slots for a non-root inner node: `ceil(max_inner / 2)`.
	#[inline]
	pub fn min_inner(&self) -> usize {
		self.max_inner.div_ceil(2)
	}

	/// Minimum entries for a non-root leaf: `ceil(max_leaf / 2)`.
	#[inline]
	pub fn min_leaf(&self) -> usize {
		self.max_leaf.div_ceil(2)
	}
}

impl Default for TreeConfig {
	fn default() -> Self {
		TreeConfig {
			max_inner: INNER_CAPACITY,
			max_leaf: LEAF_CAPACITY,
		}
	}
}
