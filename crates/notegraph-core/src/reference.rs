//! Raw references extracted from note text, before resolution.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Syntactic kind of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    /// `[[target]]`
    Wikilink,
    /// `![[target]]`
    Embed,
    /// `[text](destination)`
    MarkdownLink,
    /// `#tag`
    Tag,
    /// `$...$` or `$$...$$`
    Math,
}

impl ReferenceKind {
    /// Kinds that point at another file and may become graph edges.
    #[must_use]
    pub fn is_navigable(self) -> bool {
        matches!(self, Self::Wikilink | Self::Embed | Self::MarkdownLink)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wikilink => "wikilink",
            Self::Embed => "embed",
            Self::MarkdownLink => "markdown-link",
            Self::Tag => "tag",
            Self::Math => "math",
        }
    }
}

/// Sub-note anchor carried by a link.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "value")]
pub enum Anchor {
    /// `#Heading`
    Heading(String),
    /// `#^block-id`
    Block(String),
}

impl Anchor {
    /// Parse the text after a `#` in a link target.
    #[must_use]
    pub fn parse(fragment: &str) -> Option<Self> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return None;
        }
        match fragment.strip_prefix('^') {
            Some(block) if !block.is_empty() => Some(Self::Block(block.to_string())),
            Some(_) => None,
            None => Some(Self::Heading(fragment.to_string())),
        }
    }
}

/// A reference occurrence found in a note body.
///
/// The source note is not stored here: extraction works on bare text and
/// callers pair each reference with the note it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReference {
    pub kind: ReferenceKind,

    /// Inner text as written, including any anchor and alias.
    pub raw: String,

    /// Target with alias and anchor removed. For tags this is the tag name
    /// without `#`; for math it is the expression between the delimiters.
    pub target: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,

    /// Alias (`[[a|alias]]`) or markdown link text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Markdown link pointing outside the vault (URL with a scheme).
    #[serde(default)]
    pub external: bool,

    /// Math delimited by `$$`.
    #[serde(default)]
    pub display_math: bool,

    /// Byte range of the whole occurrence in the note body.
    pub span: Range<usize>,
}

impl RawReference {
    pub fn new(
        kind: ReferenceKind,
        raw: impl Into<String>,
        target: impl Into<String>,
        span: Range<usize>,
    ) -> Self {
        Self {
            kind,
            raw: raw.into(),
            target: target.into(),
            anchor: None,
            alias: None,
            external: false,
            display_math: false,
            span,
        }
    }

    #[must_use]
    pub fn with_anchor(mut self, anchor: Option<Anchor>) -> Self {
        self.anchor = anchor;
        self
    }

    #[must_use]
    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_distinguish_blocks_from_headings() {
        assert_eq!(Anchor::parse("Intro"), Some(Anchor::Heading("Intro".into())));
        assert_eq!(Anchor::parse("^abc123"), Some(Anchor::Block("abc123".into())));
        assert_eq!(Anchor::parse(""), None);
        assert_eq!(Anchor::parse("^"), None);
    }

    #[test]
    fn only_link_kinds_are_navigable() {
        assert!(ReferenceKind::Wikilink.is_navigable());
        assert!(ReferenceKind::Embed.is_navigable());
        assert!(ReferenceKind::MarkdownLink.is_navigable());
        assert!(!ReferenceKind::Tag.is_navigable());
        assert!(!ReferenceKind::Math.is_navigable());
    }
}
