//! Slash-delimited repository paths and the project-name / tag regexes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// `[a-z0-9]+(?:[._-][a-z0-9]+)*` repeated and slash-joined; intentionally
/// permissive enough to match the Distribution Spec's path component grammar.
fn path_component_regex() -> &'static regex::Regex {
	static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
	RE.get_or_init(|| regex::Regex::new(r"^[a-z0-9]+(?:(?:[._]|__|[-]+)[a-z0-9]+)*$").unwrap())
}

/// The project-name regex a rename target is validated against.
fn project_name_regex() -> &'static regex::Regex {
	static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
	RE.get_or_init(|| regex::Regex::new(r"^[a-z0-9]+(?:(?:[._]|__|[-]+)[a-z0-9]+)*$").unwrap())
}

/// The tag reference regex from the Distribution Spec.
pub fn tag_name_regex() -> &'static regex::Regex {
	static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
	RE.get_or_init(|| regex::Regex::new(r"^[a-zA-Z0-9_][a-zA-Z0-9._-]{0,127}$").unwrap())
}

/// A validated, slash-delimited repository path, e.g. `group/sub/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryPath(String);

impl RepositoryPath {
	/// Parses and validates `path`. Every slash-delimited segment must match
	/// the path-component grammar.
	pub fn parse(path: &str) -> Result<Self, Error> {
		if path.is_empty() || path.starts_with('/') || path.ends_with('/') || path.contains("//") {
			return Err(Error::invalid_query_param("path", path));
		}
		for segment in path.split('/') {
			if !path_component_regex().is_match(segment) {
				return Err(Error::invalid_query_param("path", path));
			}
		}
		Ok(Self(path.to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// The last slash-delimited segment, e.g. `name` for `group/sub/name`.
	pub fn name(&self) -> &str {
		self.0.rsplit('/').next().unwrap_or(&self.0)
	}

	/// The first slash-delimited segment, which resolves to a [`crate::Namespace`].
	pub fn namespace_segment(&self) -> &str {
		self.0.split('/').next().unwrap_or(&self.0)
	}

	/// `true` if `other` names a strict descendant of this path
	/// (`self/anything`, not `self` itself).
	pub fn is_ancestor_of(&self, other: &RepositoryPath) -> bool {
		other.0.len() > self.0.len()
			&& other.0.starts_with(self.0.as_str())
			&& other.0.as_bytes()[self.0.len()] == b'/'
	}

	pub fn into_string(self) -> String {
		self.0
	}
}

impl fmt::Display for RepositoryPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl AsRef<str> for RepositoryPath {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

/// Validates a rename target's new project name (the last path segment, not
/// a full path).
pub fn validate_project_name(name: &str) -> Result<(), Error> {
	if project_name_regex().is_match(name) {
		Ok(())
	} else {
		Err(Error::invalid_body_param(
			"name",
			format!("{name:?} does not match the project name pattern"),
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_nested_paths() {
		assert!(RepositoryPath::parse("group/sub/name").is_ok());
		assert!(RepositoryPath::parse("single").is_ok());
	}

	#[test]
	fn rejects_malformed_paths() {
		assert!(RepositoryPath::parse("").is_err());
		assert!(RepositoryPath::parse("/leading").is_err());
		assert!(RepositoryPath::parse("trailing/").is_err());
		assert!(RepositoryPath::parse("double//slash").is_err());
		assert!(RepositoryPath::parse("Upper/Case").is_err());
	}

	#[test]
	fn name_is_last_segment() {
		let path = RepositoryPath::parse("group/sub/name").unwrap();
		assert_eq!(path.name(), "name");
		assert_eq!(path.namespace_segment(), "group");
	}

	#[test]
	fn ancestor_detection_requires_slash_boundary() {
		let foo = RepositoryPath::parse("foo").unwrap();
		let foo_bar = RepositoryPath::parse("foo/bar").unwrap();
		let foobar = RepositoryPath::parse("foobar").unwrap();
		assert!(foo.is_ancestor_of(&foo_bar));
		assert!(!foo.is_ancestor_of(&foobar));
		assert!(!foo.is_ancestor_of(&foo));
	}

	#[test]
	fn tag_regex_matches_spec_grammar() {
		assert!(tag_name_regex().is_match("latest"));
		assert!(tag_name_regex().is_match("import-tag"));
		assert!(!tag_name_regex().is_match(".leading-dot"));
	}
}
