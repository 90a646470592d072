//! Boundary keys for inner node slots.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;

/// A separator stored in an inner node slot.
///
/// Every inner node routes keys through an ordered list of boundaries. All
/// but the last are real keys; the last is [`OrderedKey::Unbounded`], which
/// compares greater than any key and so catches everything to the right of
/// the previous boundary.
///
/// The derived ordering relies on variant order: `Bounded(_)` sorts before
/// `Unbounded`, and two bounded keys compare by `K`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum OrderedKey<K> {
	/// A real key.
	Bounded(K),
	/// Greater than every real key.
	Unbounded,
}

impl<K> OrderedKey<K> {
	/// Returns `true` for the sentinel.
	#[inline]
	pub fn is_unbounded(&self) -> bool {
		matches!(self, OrderedKey::Unbounded)
	}

	/// Returns the real key, if any.
	#[inline]
	pub fn as_bounded(&self) -> Option<&K> {
		match self {
			OrderedKey::Bounded(key) => Some(key),
			OrderedKey::Unbounded => None,
		}
	}

	/// Consumes the boundary and returns the real key, if any.
	#[inline]
	pub fn into_bounded(self) -> Option<K> {
		match self {
			OrderedKey::Bounded(key) => Some(key),
			OrderedKey::Unbounded => None,
		}
	}

	/// Borrows the contained key.
	#[inline]
	pub fn as_ref(&self) -> OrderedKey<&K> {
		match self {
			OrderedKey::Bounded(key) => OrderedKey::Bounded(key),
			OrderedKey::Unbounded => OrderedKey::Unbounded,
		}
	}

	/// Compares this boundary against a real (possibly borrowed) key.
	///
	/// `Unbounded` is greater than everything.
	#[inline]
	pub fn cmp_key<Q>(&self, key: &Q) -> Ordering
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
	{
		match self {
			OrderedKey::Bounded(bound) => bound.borrow().cmp(key),
			OrderedKey::Unbounded => Ordering::Greater,
		}
	}
}

impl<K> From<K> for OrderedKey<K> {
	fn from(key: K) -> Self {
		OrderedKey::Bounded(key)
	}
}

impl<K: fmt::Debug> fmt::Debug for OrderedKey<K> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderedKey::Bounded(key) => fmt::Debug::fmt(key, f),
			OrderedKey::Unbounded => f.write_str("INF"),
		}
	}
}

impl<K: fmt::Display> fmt::Display for OrderedKey<K> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderedKey::Bounded(key) => fmt::Display::fmt(key, f),
			OrderedKey::Unbounded => f.write_str("INF"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unbounded_is_greater_than_every_key() {
		assert!(OrderedKey::Unbounded > OrderedKey::Bounded(i64::MAX));
		assert!(OrderedKey::Bounded(i64::MIN) < OrderedKey::Unbounded);
		assert_eq!(OrderedKey::<i64>::Unbounded, OrderedKey::Unbounded);
	}

	#[test]
	fn bounded_keys_compare_by_key() {
		assert!(OrderedKey::Bounded(3) < OrderedKey::Bounded(4));
		assert_eq!(OrderedKey::Bounded(7).cmp(&OrderedKey::Bounded(7)), Ordering::Equal);
	}

	#[test]
	fn cmp_key_with_borrowed_form() {
		let boundary = OrderedKey::Bounded(String::from("m"));
		assert_eq!(boundary.cmp_key("a"), Ordering::Greater);
		assert_eq!(boundary.cmp_key("m"), Ordering::Equal);
		assert_eq!(boundary.cmp_key("z"), Ordering::Less);
		assert_eq!(OrderedKey::<String>::Unbounded.cmp_key("zzz"), Ordering::Greater);
	}

	#[test]
	fn renders_sentinel_as_inf() {
		assert_eq!(OrderedKey::<u8>::Unbounded.to_string(), "INF");
		assert_eq!(format!("{:?}", OrderedKey::Bounded(5)), "5");
	}
}
