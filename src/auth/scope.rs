//! Scope modeling for authorization requests and granted token scopes.

// std
use std::collections::BTreeSet;
// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError};
// self
use crate::_prelude::*;

/// Scopes requested by the bootstrap authorization flow: playback control, library, and
/// playlist access.
pub const DEFAULT_SCOPES: &[&str] = &[
	"user-read-playback-state",
	"user-modify-playback-state",
	"user-read-currently-playing",
	"user-read-recently-played",
	"user-library-read",
	"user-library-modify",
	"playlist-read-private",
	"playlist-modify-public",
	"playlist-modify-private",
];

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Normalized (deduplicated, sorted) set of OAuth scopes.
///
/// On the wire a scope set is a single space-delimited string, which is how the token endpoint
/// reports granted scopes and how the authorize endpoint expects requested ones.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeSet(Arc<[String]>);
impl ScopeSet {
	/// Creates a normalized scope set from any iterator.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut set = BTreeSet::new();

		for scope in scopes {
			let owned: String = scope.into();

			if owned.is_empty() {
				return Err(ScopeValidationError::Empty);
			}
			if owned.chars().any(char::is_whitespace) {
				return Err(ScopeValidationError::ContainsWhitespace { scope: owned });
			}

			set.insert(owned);
		}

		Ok(Self(set.into_iter().collect::<Vec<_>>().into()))
	}

	/// The scope set requested by the bootstrap authorization flow.
	pub fn spotify_defaults() -> Self {
		Self::new(DEFAULT_SCOPES.iter().copied()).unwrap_or_default()
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns true if the normalized set contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.0.binary_search_by(|candidate| candidate.as_str().cmp(scope)).is_ok()
	}

	/// Iterator over normalized scopes.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}

	/// Space-delimited wire representation.
	pub fn normalized(&self) -> String {
		self.0.join(" ")
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeSet").field(&self.0).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s.split_whitespace())
	}
}
impl Serialize for ScopeSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.normalized())
	}
}
impl<'de> Deserialize<'de> for ScopeSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		raw.parse().map_err(DeError::custom)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn scopes_normalize_and_deduplicate() {
		let lhs = ScopeSet::new(["user-library-read", "streaming", "streaming"])
			.expect("Left-hand scope set should be valid.");
		let rhs = ScopeSet::from_str("streaming  user-library-read")
			.expect("Right-hand scope string should parse.");

		assert_eq!(lhs, rhs);
		assert_eq!(lhs.normalized(), "streaming user-library-read");
		assert!(lhs.contains("streaming"));
		assert!(!lhs.contains("user-follow-read"));
	}

	#[test]
	fn invalid_scopes_error() {
		assert_eq!(ScopeSet::new([""]), Err(ScopeValidationError::Empty));
		assert!(matches!(
			ScopeSet::new(["contains space"]),
			Err(ScopeValidationError::ContainsWhitespace { .. })
		));
		assert!(ScopeSet::from_str("").expect("Empty string is an empty set.").is_empty());
	}

	#[test]
	fn serde_uses_space_delimited_strings() {
		let scopes: ScopeSet = serde_json::from_str("\"playlist-read-private user-read-email\"")
			.expect("Scope string should deserialize.");

		assert_eq!(scopes.len(), 2);
		assert_eq!(
			serde_json::to_string(&scopes).expect("Scope set should serialize."),
			"\"playlist-read-private user-read-email\""
		);
	}

	#[test]
	fn defaults_cover_playback_and_library() {
		let scopes = ScopeSet::spotify_defaults();

		assert_eq!(scopes.len(), DEFAULT_SCOPES.len());
		assert!(scopes.contains("user-modify-playback-state"));
		assert!(scopes.contains("user-library-modify"));
	}
}
