//! # Plain-Text Snapshot Codec
//!
//! A snapshot is the whole tree written out depth-first, one item per line:
//!
//! ```text
//! 3              <- max inner size
//! 3              <- max leaf size
//! I,2            <- root: inner node with 2 slots
//! 3              <- boundary of slot 0
//!  L,2           <- child of slot 0 (indentation is cosmetic)
//!  1|one
//!  2|two
//! INF            <- boundary of the last slot
//!  L,2
//!  3|three
//!  4|four
//! ```
//!
//! Keys and values are turned into text by two independent
//! [`StringCodec`]s. A leaf line is split at its first `|`, so values may
//! contain `|` but keys may not; neither may span lines.
//!
//! Reading rebuilds a fresh tree and checks it against the same invariants
//! the balancing code maintains (ordering, occupancy, uniform depth). Any
//! failure discards the partial result.

use std::fmt;
use std::io::{self, BufRead, Lines, Write};
use std::iter::Peekable;
use std::marker::PhantomData;
use std::str::FromStr;

use crate::config::TreeConfig;
use crate::error::{BoxError, Error, Result};
use crate::key::OrderedKey;
use crate::node::{InnerNode, LeafArena, LeafId, LeafNode, Node};

/// Marker for the boundary of an inner node's last slot.
const UNBOUNDED_MARKER: &str = "INF";

/// Separates a leaf entry's key text from its value text.
const ENTRY_SEPARATOR: char = '|';

/// Deepest node nesting a snapshot may describe.
const MAX_DEPTH: usize = usize::BITS as usize;

// ===========================================================================
// Codecs
// ===========================================================================

/// Converts values of type `T` to and from single-line text.
pub trait StringCodec<T> {
	/// Renders `value` as text.
	fn encode(&self, value: &T) -> String;

	/// Parses text produced by [`encode`](StringCodec::encode).
	fn decode(&self, text: &str) -> std::result::Result<T, BoxError>;
}

impl<T, C: StringCodec<T> + ?Sized> StringCodec<T> for &C {
	fn encode(&self, value: &T) -> String {
		(**self).encode(value)
	}

	fn decode(&self, text: &str) -> std::result::Result<T, BoxError> {
		(**self).decode(text)
	}
}

/// Codec for any type with matching `Display` and `FromStr` implementations,
/// such as integers and `String`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayCodec;

impl<T> StringCodec<T> for DisplayCodec
where
	T: fmt::Display + FromStr,
	T::Err: Into<BoxError>,
{
	fn encode(&self, value: &T) -> String {
		value.to_string()
	}

	fn decode(&self, text: &str) -> std::result::Result<T, BoxError> {
		text.parse::<T>().map_err(Into::into)
	}
}

/// Codec built from a pair of closures.
///
/// ```
/// use plustree::codec::{FnCodec, StringCodec};
/// use plustree::error::BoxError;
///
/// let hex = FnCodec::new(
/// 	|v: &u32| format!("{v:x}"),
/// 	|s: &str| -> Result<u32, BoxError> { Ok(u32::from_str_radix(s, 16)?) },
/// );
/// assert_eq!(hex.encode(&255), "ff");
/// assert_eq!(hex.decode("ff").unwrap(), 255);
/// ```
pub struct FnCodec<T, E, D> {
	encode: E,
	decode: D,
	_marker: PhantomData<fn(T) -> T>,
}

impl<T, E, D> FnCodec<T, E, D>
where
	E: Fn(&T) -> String,
	D: Fn(&str) -> std::result::Result<T, BoxError>,
{
	/// Wraps an encoder and a decoder.
	pub fn new(encode: E, decode: D) -> Self {
		FnCodec {
			encode,
			decode,
			_marker: PhantomData,
		}
	}
}

impl<T, E, D> StringCodec<T> for FnCodec<T, E, D>
where
	E: Fn(&T) -> String,
	D: Fn(&str) -> std::result::Result<T, BoxError>,
{
	fn encode(&self, value: &T) -> String {
		(self.encode)(value)
	}

	fn decode(&self, text: &str) -> std::result::Result<T, BoxError> {
		(self.decode)(text)
	}
}

// ===========================================================================
// Writer
// ===========================================================================

/// Writes a tree in snapshot format.
pub(crate) struct SnapshotWriter<'t, W, K, V, KC, VC> {
	out: W,
	leaves: &'t LeafArena<K, V>,
	key_codec: KC,
	value_codec: VC,
}

impl<'t, W, K, V, KC, VC> SnapshotWriter<'t, W, K, V, KC, VC>
where
	W: Write,
	KC: StringCodec<K>,
	VC: StringCodec<V>,
{
	pub(crate) fn new(out: W, leaves: &'t LeafArena<K, V>, key_codec: KC, value_codec: VC) -> Self {
		SnapshotWriter {
			out,
			leaves,
			key_codec,
			value_codec,
		}
	}

	pub(crate) fn write(mut self, config: &TreeConfig, root: &Node<K>) -> Result<()> {
		writeln!(self.out, "{}", config.max_inner())?;
		writeln!(self.out, "{}", config.max_leaf())?;
		self.write_node(root, 0)?;
		self.out.flush()?;
		Ok(())
	}

	fn write_node(&mut self, node: &Node<K>, depth: usize) -> Result<()> {
		let pad = depth;
		match node {
			Node::Inner(inner) => {
				writeln!(self.out, "{:pad$}I,{}", "", inner.len())?;
				for (boundary, child) in inner.keys.iter().zip(&inner.children) {
					match boundary {
						OrderedKey::Bounded(key) => {
							let text = self.encode_key(key)?;
							writeln!(self.out, "{:pad$}{text}", "")?;
						}
						OrderedKey::Unbounded => writeln!(self.out, "{:pad$}{UNBOUNDED_MARKER}", "")?,
					}
					self.write_node(child, depth + 1)?;
				}
			}
			Node::Leaf(id) => {
				let leaves = self.leaves;
				let leaf = &leaves[*id];
				writeln!(self.out, "{:pad$}L,{}", "", leaf.len())?;
				for (key, value) in leaf.keys.iter().zip(&leaf.values) {
					let key = self.encode_key(key)?;
					let value = self.value_codec.encode(value);
					if value.contains(['\n', '\r']) {
						return Err(Error::Unencodable {
							reason: format!("value text {value:?} spans multiple lines"),
						});
					}
					writeln!(self.out, "{:pad$}{key}{ENTRY_SEPARATOR}{value}", "")?;
				}
			}
		}
		Ok(())
	}

	fn encode_key(&self, key: &K) -> Result<String> {
		let text = self.key_codec.encode(key);
		let reason = if text.contains(['\n', '\r']) {
			"spans multiple lines"
		} else if text.contains(ENTRY_SEPARATOR) {
			"contains the entry separator '|'"
		} else if text.starts_with(char::is_whitespace) {
			"starts with whitespace, which is trimmed on load"
		} else {
			return Ok(text);
		};
		Err(Error::Unencodable {
			reason: format!("key text {text:?} {reason}"),
		})
	}
}

// ===========================================================================
// Reader
// ===========================================================================

/// A tree rebuilt from a snapshot, not yet wrapped in a `BPlusTree`.
pub(crate) struct Snapshot<K, V> {
	pub(crate) config: TreeConfig,
	pub(crate) root: Node<K>,
	pub(crate) leaves: LeafArena<K, V>,
	pub(crate) len: usize,
}

/// Key range a subtree must fall into: `lower <= key < upper`.
#[derive(Clone, Copy)]
struct Bounds<'b, K> {
	lower: Option<&'b K>,
	upper: Option<&'b K>,
}

impl<K: Ord> Bounds<'_, K> {
	fn admits(&self, key: &K) -> bool {
		self.lower.map_or(true, |lower| key >= lower) && self.upper.map_or(true, |upper| key < upper)
	}

	/// Boundaries may touch the range edges.
	fn admits_boundary(&self, key: &K) -> bool {
		self.lower.map_or(true, |lower| key >= lower) && self.upper.map_or(true, |upper| key <= upper)
	}
}

/// Parses a snapshot into a fresh tree.
pub(crate) struct SnapshotReader<R: BufRead, K, V, KC, VC> {
	lines: Peekable<Lines<R>>,
	line: usize,
	config: TreeConfig,
	leaves: LeafArena<K, V>,
	leaf_depth: Option<usize>,
	last_leaf: Option<LeafId>,
	len: usize,
	key_codec: KC,
	value_codec: VC,
}

impl<R, K, V, KC, VC> SnapshotReader<R, K, V, KC, VC>
where
	R: BufRead,
	K: Ord,
	KC: StringCodec<K>,
	VC: StringCodec<V>,
{
	pub(crate) fn new(input: R, key_codec: KC, value_codec: VC) -> Self {
		SnapshotReader {
			lines: input.lines().peekable(),
			line: 0,
			config: TreeConfig::default(),
			leaves: LeafArena::new(),
			leaf_depth: None,
			last_leaf: None,
			len: 0,
			key_codec,
			value_codec,
		}
	}

	pub(crate) fn read(mut self) -> Result<Snapshot<K, V>> {
		let max_inner = self.read_size("max inner size")?;
		let max_leaf = self.read_size("max leaf size")?;
		let header_end = self.line;
		self.config = TreeConfig::new(max_inner, max_leaf)
			.map_err(|err| Error::malformed(header_end, err.to_string()))?;

		let root = self.read_node(
			0,
			Bounds {
				lower: None,
				upper: None,
			},
		)?;

		while self.has_more_lines() {
			if !self.next_line()?.trim().is_empty() {
				return Err(Error::malformed(self.line, "unexpected data after the root node"));
			}
		}

		Ok(Snapshot {
			config: self.config,
			root,
			leaves: self.leaves,
			len: self.len,
		})
	}

	fn next_line(&mut self) -> Result<String> {
		match self.lines.next() {
			Some(line) => {
				self.line += 1;
				line.map_err(|err| match err.kind() {
					io::ErrorKind::InvalidData => Error::malformed(self.line, "line is not valid UTF-8"),
					_ => Error::Io(err),
				})
			}
			None => Err(Error::malformed(self.line + 1, "unexpected end of input")),
		}
	}

	fn has_more_lines(&mut self) -> bool {
		self.lines.peek().is_some()
	}

	fn read_size(&mut self, what: &str) -> Result<usize> {
		let line = self.next_line()?;
		line.trim()
			.parse::<usize>()
			.map_err(|err| Error::malformed(self.line, format!("invalid {what} {line:?}: {err}")))
	}

	fn read_node(&mut self, depth: usize, bounds: Bounds<'_, K>) -> Result<Node<K>> {
		let line = self.next_line()?;
		// Every inner node has at least two children, so no tree that fits in
		// memory is deeper than this.
		if depth > MAX_DEPTH {
			return Err(Error::malformed(self.line, format!("nodes nested deeper than {MAX_DEPTH} levels")));
		}
		let Some((tag, count)) = line.trim().split_once(',') else {
			return Err(Error::malformed(self.line, format!("expected node header, found {line:?}")));
		};
		let count = count
			.trim()
			.parse::<usize>()
			.map_err(|err| Error::malformed(self.line, format!("invalid slot count {count:?}: {err}")))?;

		match tag.trim() {
			"I" => self.read_inner(depth, count, bounds),
			"L" => self.read_leaf(depth, count, bounds),
			other => Err(Error::malformed(self.line, format!("unknown node kind {other:?}"))),
		}
	}

	fn read_inner(&mut self, depth: usize, count: usize, bounds: Bounds<'_, K>) -> Result<Node<K>> {
		let min = if depth == 0 {
			2
		} else {
			self.config.min_inner()
		};
		if count < min || count > self.config.max_inner() {
			return Err(Error::malformed(
				self.line,
				format!("inner node with {count} slots outside {min}..={}", self.config.max_inner()),
			));
		}

		let mut inner = InnerNode::new();
		for slot in 0..count {
			let line = self.next_line()?;
			let text = line.trim_start();
			let boundary = if slot + 1 == count {
				if text.trim_end() != UNBOUNDED_MARKER {
					return Err(Error::malformed(
						self.line,
						format!("last slot boundary must be {UNBOUNDED_MARKER}, found {text:?}"),
					));
				}
				OrderedKey::Unbounded
			} else {
				let key = self.decode_key(text)?;
				let after_previous = match inner.keys.last() {
					Some(OrderedKey::Bounded(previous)) => previous < &key,
					_ => true,
				};
				if !after_previous || !bounds.admits_boundary(&key) {
					return Err(Error::malformed(self.line, "inner node boundaries out of order"));
				}
				OrderedKey::Bounded(key)
			};

			let child_bounds = Bounds {
				lower: match inner.keys.last() {
					Some(OrderedKey::Bounded(previous)) => Some(previous),
					_ => bounds.lower,
				},
				upper: boundary.as_bounded().or(bounds.upper),
			};
			let child = self.read_node(depth + 1, child_bounds)?;
			inner.push(boundary, child);
		}

		Ok(Node::Inner(Box::new(inner)))
	}

	fn read_leaf(&mut self, depth: usize, count: usize, bounds: Bounds<'_, K>) -> Result<Node<K>> {
		match self.leaf_depth {
			Some(expected) if expected != depth => {
				return Err(Error::malformed(
					self.line,
					format!("leaf at depth {depth}, expected every leaf at depth {expected}"),
				));
			}
			_ => self.leaf_depth = Some(depth),
		}
		let min = if depth == 0 {
			0
		} else {
			self.config.min_leaf()
		};
		if count < min || count > self.config.max_leaf() {
			return Err(Error::malformed(
				self.line,
				format!("leaf with {count} entries outside {min}..={}", self.config.max_leaf()),
			));
		}

		let mut leaf = LeafNode::new();
		for _ in 0..count {
			let line = self.next_line()?;
			let Some((key, value)) = line.trim_start().split_once(ENTRY_SEPARATOR) else {
				return Err(Error::malformed(self.line, format!("expected key|value, found {line:?}")));
			};
			let key = self.decode_key(key)?;
			let value = self
				.value_codec
				.decode(value)
				.map_err(|err| Error::malformed(self.line, format!("cannot decode value {value:?}: {err}")))?;

			let ascending = leaf.keys.last().map_or(true, |previous| previous < &key);
			if !ascending || !bounds.admits(&key) {
				return Err(Error::malformed(self.line, "leaf keys out of order"));
			}
			leaf.push(key, value);
		}

		// Leaves arrive left to right, so each one follows the last.
		leaf.prev = self.last_leaf;
		let id = self.leaves.alloc(leaf);
		if let Some(prev) = self.last_leaf {
			self.leaves[prev].next = Some(id);
		}
		self.last_leaf = Some(id);
		self.len += count;

		Ok(Node::Leaf(id))
	}

	fn decode_key(&self, text: &str) -> Result<K> {
		self.key_codec
			.decode(text)
			.map_err(|err| Error::malformed(self.line, format!("cannot decode key {text:?}: {err}")))
	}
}
