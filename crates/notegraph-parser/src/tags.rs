//! Tag syntax and nested-tag helpers.

/// Characters allowed in a tag after the `#`.
pub fn is_tag_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '/')
}

/// Characters that, directly before `#`, stop it from opening a tag.
pub(crate) fn blocks_tag(prev: char) -> bool {
    prev.is_alphanumeric() || matches!(prev, '_' | '\\' | '&' | '#' | '/')
}

/// Validate and clean a tag name written without `#`.
///
/// Returns `None` when nothing valid is left or the name is purely numeric
/// (`#1985` is a number, not a tag).
pub fn normalize_tag(name: &str) -> Option<String> {
    let name = name.trim().trim_start_matches('#').trim_end_matches('/');
    if name.is_empty() || name.starts_with('/') || !name.chars().all(is_tag_char) {
        return None;
    }
    if name.chars().all(|c| c.is_ascii_digit() || c == '/') {
        return None;
    }
    Some(name.to_string())
}

/// Every prefix of a nested tag, shortest first.
///
/// `tag_ancestors("a/b/c") == ["a", "a/b", "a/b/c"]`
pub fn tag_ancestors(tag: &str) -> Vec<String> {
    let mut ancestors = Vec::new();
    for (i, c) in tag.char_indices() {
        if c == '/' && i > 0 {
            ancestors.push(tag[..i].to_string());
        }
    }
    if !tag.is_empty() {
        ancestors.push(tag.to_string());
    }
    ancestors.dedup();
    ancestors
}

/// First segment of a nested tag.
pub fn top_level(tag: &str) -> &str {
    tag.split('/').next().unwrap_or(tag)
}
