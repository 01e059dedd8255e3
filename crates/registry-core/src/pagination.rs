//! Cursor pagination shared by the tag-list and descendant-list endpoints.

use crate::error::Error;

/// Upper bound on `n` accepted by any paginated listing (§6).
pub const MAX_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// A validated page request: `n` items, optionally starting after `last`,
/// optionally filtered by `name` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
	pub n: u32,
	pub last: Option<String>,
	pub name: Option<String>,
}

impl PageRequest {
	pub fn parse(n: Option<&str>, last: Option<&str>, name: Option<&str>) -> Result<Self, Error> {
		let n = match n {
			None => DEFAULT_PAGE_SIZE,
			Some(raw) => {
				let parsed: u32 = raw
					.parse()
					.map_err(|_| Error::invalid_query_param("n", raw))?;
				if parsed < 1 || parsed > MAX_PAGE_SIZE {
					return Err(Error::invalid_query_param("n", raw));
				}
				parsed
			}
		};
		if let Some(last) = last {
			if !crate::path::tag_name_regex().is_match(last) {
				return Err(Error::invalid_query_param("last", last));
			}
		}
		Ok(Self {
			n,
			last: last.map(str::to_string),
			name: name.map(str::to_string),
		})
	}
}

/// A page of results plus whether more rows follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
	pub items: Vec<T>,
	pub has_more: bool,
}
