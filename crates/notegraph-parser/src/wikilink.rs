//! Wikilink and markdown link target syntax.

use std::borrow::Cow;

use notegraph_core::Anchor;

/// The parts of a wikilink's inner text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiTarget {
    pub target: String,
    pub anchor: Option<Anchor>,
    pub alias: Option<String>,
}

/// Split `target#anchor|alias` into its parts.
///
/// The alias is everything after the first `|`; the anchor is everything
/// after the first `#` of the remainder. `^` at the start of the anchor
/// marks a block reference. A `\|` separator, as written inside table
/// cells, counts as `|`.
pub fn split_wikilink_inner(inner: &str) -> WikiTarget {
    let (left, alias) = match inner.split_once('|') {
        Some((left, alias)) => (left.strip_suffix('\\').unwrap_or(left), non_empty(alias)),
        None => (inner, None),
    };
    let (target, anchor) = match left.split_once('#') {
        Some((target, fragment)) => (target, Anchor::parse(fragment)),
        None => (left, None),
    };
    WikiTarget {
        target: target.trim().to_string(),
        anchor,
        alias,
    }
}

/// Whether a link destination points outside the vault.
///
/// True for anything with a URL scheme (`https:`, `mailto:`, `obsidian:`),
/// protocol-relative `//host` and bare `www.` hosts. A single-letter scheme
/// is read as a Windows drive and treated as local.
pub fn is_external_target(target: &str) -> bool {
    let target = target.trim();
    if target.starts_with("//") || target.starts_with("www.") {
        return true;
    }
    let Some((scheme, _)) = target.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let starts_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    starts_alpha
        && scheme.len() > 1
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
}

/// Percent-decode a markdown link destination, keeping the raw text when it
/// is not valid percent-encoding.
pub fn decode_destination(destination: &str) -> Cow<'_, str> {
    urlencoding::decode(destination).unwrap_or(Cow::Borrowed(destination))
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_target() {
        let parts = split_wikilink_inner("Sussudio");
        assert_eq!(parts.target, "Sussudio");
        assert_eq!(parts.anchor, None);
        assert_eq!(parts.alias, None);
    }

    #[test]
    fn escaped_pipe_separates_alias() {
        let parts = split_wikilink_inner("A\\|alias");
        assert_eq!(parts.target, "A");
        assert_eq!(parts.alias.as_deref(), Some("alias"));

        let parts = split_wikilink_inner("A#Heading\\|alias");
        assert_eq!(parts.target, "A");
        assert_eq!(parts.anchor, Some(Anchor::Heading("Heading".to_string())));
    }

    #[test]
    fn alias_heading_and_block() {
        let parts = split_wikilink_inner("Sussudio#Lyrics|the song");
        assert_eq!(parts.target, "Sussudio");
        assert_eq!(parts.anchor, Some(Anchor::Heading("Lyrics".into())));
        assert_eq!(parts.alias.as_deref(), Some("the song"));

        let parts = split_wikilink_inner("Sussudio#^verse-1");
        assert_eq!(parts.anchor, Some(Anchor::Block("verse-1".into())));
    }

    #[test]
    fn whitespace_around_parts_is_trimmed() {
        let parts = split_wikilink_inner("Egg.jpg | 125");
        assert_eq!(parts.target, "Egg.jpg");
        assert_eq!(parts.alias.as_deref(), Some("125"));
    }

    #[test]
    fn same_note_anchor_has_empty_target() {
        let parts = split_wikilink_inner("#Heading");
        assert_eq!(parts.target, "");
        assert_eq!(parts.anchor, Some(Anchor::Heading("Heading".into())));
    }

    #[test]
    fn external_detection() {
        assert!(is_external_target("https://example.com/x.md"));
        assert!(is_external_target("mailto:someone@example.com"));
        assert!(is_external_target("obsidian://open?vault=x"));
        assert!(is_external_target("www.example.com"));
        assert!(!is_external_target("notes/B.md"));
        assert!(!is_external_target("C:/notes/B.md"));
        assert!(!is_external_target("Meeting 10:30.md"));
    }

    #[test]
    fn destinations_are_percent_decoded() {
        assert_eq!(decode_destination("Note%20with%20spaces.md"), "Note with spaces.md");
        assert_eq!(decode_destination("100%.md"), "100%.md");
    }
}
