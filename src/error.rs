//! # Error Types for the B+ Tree
//!
//! Lookups and removals never fail: a missing key is reported as `None`.
//! The errors in this module cover the fallible edges of the crate:
//!
//! - building a tree from an unusable configuration,
//! - writing a snapshot whose text would not read back,
//! - reading a snapshot that is truncated or malformed,
//! - I/O failures underneath either of the above.
//!
//! ## Load Atomicity
//!
//! ```text
//! read_from(reader)
//!      │
//!      ▼
//! Parse header ──────────► Err(Malformed) ──► caller keeps its old tree
//!      │
//!      ▼
//! Build fresh tree ──────► Err(Malformed | Io)
//!      │
//!      ▼
//! Validate structure ────► Err(Malformed)
//!      │
//!      ▼ (Ok)
//! Return new tree
//! ```
//!
//! A failed load never hands back a partially reconstructed tree.

use thiserror::Error;

/// Boxed error returned by [`StringCodec::decode`](crate::codec::StringCodec::decode).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while configuring, saving or loading a tree.
#[derive(Error, Debug)]
pub enum Error {
	/// Node size limits too small for the balancing thresholds to make sense.
	///
	/// Inner nodes need room for at least 3 slots and leaves for at least 2
	/// entries, otherwise the half-full minimums collapse and splits can
	/// produce nodes that are immediately underfull.
	#[error("invalid tree configuration: max_inner={max_inner} (min 3), max_leaf={max_leaf} (min 2)")]
	InvalidConfig {
		/// Requested maximum number of slots per inner node.
		max_inner: usize,
		/// Requested maximum number of entries per leaf node.
		max_leaf: usize,
	},

	/// The persisted text could not be turned back into a tree.
	///
	/// `line` is 1-based and points at the line where parsing stopped.
	#[error("malformed snapshot at line {line}: {reason}")]
	Malformed {
		/// Line number of the offending input.
		line: usize,
		/// Human readable description of what was expected.
		reason: String,
	},

	/// A key or value rendered to text that the snapshot format cannot hold.
	#[error("cannot encode snapshot: {reason}")]
	Unencodable {
		/// What was wrong with the rendered text.
		reason: String,
	},

	/// Underlying reader or writer failed.
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl Error {
	pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
		Error::Malformed {
			line,
			reason: reason.into(),
		}
	}
}

/// A Result type alias using the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
