//! Read-only structural snapshots for diagnostics and visualization.

use std::fmt;

use crate::key::OrderedKey;
use crate::node::{LeafArena, Node};

/// One node of a [`TreeDump`], in depth-first pre-order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "lowercase"))]
pub enum NodeDump<'a, K> {
	/// An inner node and its slot boundaries, the last being `Unbounded`.
	Inner {
		/// Distance from the root (root = 0).
		depth: usize,
		/// Slot boundaries, one per child.
		boundaries: Vec<OrderedKey<&'a K>>,
	},
	/// A leaf node and its keys.
	Leaf {
		/// Distance from the root (root = 0).
		depth: usize,
		/// Keys stored in the leaf, ascending.
		keys: Vec<&'a K>,
	},
}

impl<K> NodeDump<'_, K> {
	/// Distance from the root.
	pub fn depth(&self) -> usize {
		match self {
			NodeDump::Inner {
				depth,
				..
			}
			| NodeDump::Leaf {
				depth,
				..
			} => *depth,
		}
	}

	/// Number of slots (inner) or entries (leaf).
	pub fn size(&self) -> usize {
		match self {
			NodeDump::Inner {
				boundaries,
				..
			} => boundaries.len(),
			NodeDump::Leaf {
				keys,
				..
			} => keys.len(),
		}
	}

	/// Returns `true` for leaf nodes.
	pub fn is_leaf(&self) -> bool {
		matches!(self, NodeDump::Leaf { .. })
	}
}

/// Depth-first listing of every node in a tree.
///
/// Borrowing the tree keeps the dump consistent with it: no mutation can
/// happen while a dump is alive. `Display` renders one node per line,
/// indented by depth.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TreeDump<'a, K> {
	nodes: Vec<NodeDump<'a, K>>,
}

impl<'a, K> TreeDump<'a, K> {
	pub(crate) fn capture<V>(root: &'a Node<K>, leaves: &'a LeafArena<K, V>) -> Self {
		let mut nodes = Vec::new();
		let mut stack = vec![(root, 0)];
		while let Some((node, depth)) = stack.pop() {
			match node {
				Node::Inner(inner) => {
					nodes.push(NodeDump::Inner {
						depth,
						boundaries: inner.keys.iter().map(OrderedKey::as_ref).collect(),
					});
					// Reversed so the leftmost child is popped first.
					stack.extend(inner.children.iter().rev().map(|child| (child, depth + 1)));
				}
				Node::Leaf(id) => nodes.push(NodeDump::Leaf {
					depth,
					keys: leaves[*id].keys.iter().collect(),
				}),
			}
		}
		TreeDump {
			nodes,
		}
	}

	/// Nodes in depth-first pre-order, starting at the root.
	pub fn nodes(&self) -> &[NodeDump<'a, K>] {
		&self.nodes
	}

	/// Number of leaf nodes.
	pub fn leaf_count(&self) -> usize {
		self.nodes.iter().filter(|node| node.is_leaf()).count()
	}
}

impl<K: fmt::Display> fmt::Display for TreeDump<'_, K> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for node in &self.nodes {
			write!(f, "{:width$}", "", width = node.depth() * 3)?;
			match node {
				NodeDump::Inner {
					boundaries,
					..
				} => {
					f.write_str("I[")?;
					write_joined(f, boundaries)?;
				}
				NodeDump::Leaf {
					keys,
					..
				} => {
					f.write_str("L[")?;
					write_joined(f, keys)?;
				}
			}
			f.write_str("]\n")?;
		}
		Ok(())
	}
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
	for (i, item) in items.iter().enumerate() {
		if i > 0 {
			f.write_str(", ")?;
		}
		write!(f, "{item}")?;
	}
	Ok(())
}
