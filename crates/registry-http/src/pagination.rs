//! RFC 5988 `Link` headers and the in-memory slicing used by the one
//! listing endpoint (`repository-paths/…/repositories/list`) whose store
//! method has no native pagination.

use registry_core::PageRequest;

/// Builds the `Link: <url>; rel="next"` header value for a page that has
/// more rows following it. `base_url` already carries the endpoint's path;
/// `next_last` is the cursor value for the next page's `last` parameter.
pub fn next_link(base_url: &str, next_last: &str, n: u32, name_filter: Option<&str>) -> String {
	let mut url = format!("{base_url}?n={n}&last={next_last}");
	if let Some(name) = name_filter {
		url.push_str(&format!("&name={name}"));
	}
	format!("<{url}>; rel=\"next\"")
}

/// Slices `items` (assumed sorted by `key`) the same way a cursor-paginated
/// store query would: skip past `last`, optionally filter by `name` prefix,
/// then take `n` and report whether more rows remain.
pub fn paginate_in_memory<T>(mut items: Vec<T>, page: &PageRequest, key: impl Fn(&T) -> &str) -> (Vec<T>, bool) {
	items.sort_by(|a, b| key(a).cmp(key(b)));

	if let Some(name) = &page.name {
		items.retain(|item| key(item).starts_with(name.as_str()));
	}
	if let Some(last) = &page.last {
		items.retain(|item| key(item) > last.as_str());
	}

	let has_more = items.len() > page.n as usize;
	items.truncate(page.n as usize);
	(items, has_more)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn slices_past_the_cursor_and_reports_more() {
		let items = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];
		let page = PageRequest::parse(Some("2"), Some("a"), None).unwrap();
		let (page_items, has_more) = paginate_in_memory(items, &page, |s| s.as_str());
		assert_eq!(page_items, vec!["b".to_string(), "c".to_string()]);
		assert!(has_more);
	}

	#[test]
	fn name_filter_is_a_prefix_match() {
		let items = vec!["foo".to_string(), "foobar".to_string(), "bar".to_string()];
		let page = PageRequest::parse(None, None, Some("foo")).unwrap();
		let (page_items, has_more) = paginate_in_memory(items, &page, |s| s.as_str());
		assert_eq!(page_items, vec!["foo".to_string(), "foobar".to_string()]);
		assert!(!has_more);
	}
}
