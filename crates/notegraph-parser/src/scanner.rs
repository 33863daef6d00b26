//! Lazy reference scanner.
//!
//! [`extract`] runs the region pass up front (it has to see the whole text
//! to know where code and math end) and then walks the masked text one
//! reference at a time.

use std::ops::Range;

use notegraph_core::{Anchor, RawReference, ReferenceKind};

use crate::regions::{find_regions, mask, Region, RegionKind};
use crate::tags::{blocks_tag, is_tag_char, normalize_tag};
use crate::wikilink::{decode_destination, is_external_target, split_wikilink_inner};

/// Iterator over the references in one note body, in order of appearance.
#[derive(Debug)]
pub struct References<'a> {
    text: &'a str,
    masked: String,
    math: std::vec::IntoIter<Region>,
    next_math: Option<Region>,
    pending: Option<RawReference>,
    pos: usize,
    exhausted: bool,
}

/// Scan `text` for wikilinks, embeds, markdown links, tags and math.
///
/// Never fails: malformed syntax is plain text.
pub fn extract(text: &str) -> References<'_> {
    let regions = find_regions(text);
    let masked = mask(text, &regions);
    let mut math = regions
        .into_iter()
        .filter(Region::is_math)
        .collect::<Vec<_>>()
        .into_iter();
    let next_math = math.next();
    References {
        text,
        masked,
        math,
        next_math,
        pending: None,
        pos: 0,
        exhausted: false,
    }
}

impl Iterator for References<'_> {
    type Item = RawReference;

    fn next(&mut self) -> Option<RawReference> {
        if self.pending.is_none() && !self.exhausted {
            let (found, pos) = scan(&self.masked, self.pos);
            self.pos = pos;
            self.exhausted = found.is_none();
            self.pending = found;
        }

        let math_first = match (&self.next_math, &self.pending) {
            (Some(math), Some(pending)) => math.span.start < pending.span.start,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if math_first {
            let region = self.next_math.take()?;
            self.next_math = self.math.next();
            return Some(math_reference(self.text, region));
        }
        self.pending.take()
    }
}

fn math_reference(text: &str, region: Region) -> RawReference {
    let raw = &text[region.span.clone()];
    let content = text[region.content.clone()].trim();
    let mut reference = RawReference::new(ReferenceKind::Math, raw, content, region.span);
    reference.display_math = region.kind == RegionKind::DisplayMath;
    reference
}

enum Step {
    Emit(RawReference, usize),
    /// Syntax consumed without producing a reference.
    Skip(usize),
    /// Not the start of any syntax; move one byte on.
    Literal,
}

fn scan(s: &str, mut pos: usize) -> (Option<RawReference>, usize) {
    let bytes = s.as_bytes();
    while pos < bytes.len() {
        let next = bytes.get(pos + 1).copied();
        let step = match bytes[pos] {
            b'\\' if next.is_some_and(|b| b.is_ascii_punctuation()) => Step::Skip(pos + 2),
            b'!' if bytes[pos + 1..].starts_with(b"[[") => {
                wikilink(s, pos, pos + 1, ReferenceKind::Embed)
            }
            b'!' if next == Some(b'[') => markdown_link(s, pos, pos + 1),
            b'[' if next == Some(b'[') => wikilink(s, pos, pos, ReferenceKind::Wikilink),
            b'[' => markdown_link(s, pos, pos),
            b'#' => tag(s, pos),
            _ => Step::Literal,
        };
        match step {
            Step::Emit(reference, end) => return (Some(reference), end),
            Step::Skip(end) => pos = end,
            Step::Literal => pos += 1,
        }
    }
    (None, pos)
}

fn wikilink(s: &str, start: usize, open: usize, kind: ReferenceKind) -> Step {
    let inner_start = open + 2;
    let rest = &s[inner_start..];
    let line = &rest[..rest.find('\n').unwrap_or(rest.len())];
    let Some(close) = line.find("]]") else {
        return Step::Literal;
    };
    let inner = &line[..close];
    if inner.trim().is_empty() || inner.contains(['[', ']']) {
        return Step::Literal;
    }

    let end = inner_start + close + 2;
    let parts = split_wikilink_inner(inner);
    if parts.target.is_empty() {
        // `[[#Heading]]` points into the same note.
        return Step::Skip(end);
    }
    let reference = RawReference::new(kind, inner, parts.target, start..end)
        .with_anchor(parts.anchor)
        .with_alias(parts.alias);
    Step::Emit(reference, end)
}

struct LinkSyntax {
    text: Range<usize>,
    destination: Range<usize>,
    end: usize,
}

fn markdown_link(s: &str, start: usize, open: usize) -> Step {
    let Some(link) = parse_markdown_link(s.as_bytes(), open) else {
        return Step::Literal;
    };

    let destination = &s[link.destination.clone()];
    if destination.trim().is_empty() {
        return Step::Skip(link.end);
    }
    let decoded = decode_destination(destination);
    let external = is_external_target(&decoded);

    let (target, anchor) = if external {
        (decoded.to_string(), None)
    } else {
        match decoded.split_once('#') {
            Some((target, fragment)) => (target.to_string(), Anchor::parse(fragment)),
            None => (decoded.to_string(), None),
        }
    };
    if target.trim().is_empty() {
        // `[text](#heading)` points into the same note.
        return Step::Skip(link.end);
    }

    let alias = s[link.text].trim();
    let mut reference =
        RawReference::new(ReferenceKind::MarkdownLink, destination, target.trim(), start..link.end)
            .with_anchor(anchor)
            .with_alias((!alias.is_empty()).then(|| alias.to_string()));
    reference.external = external;
    Step::Emit(reference, link.end)
}

fn parse_markdown_link(bytes: &[u8], open: usize) -> Option<LinkSyntax> {
    let mut pos = open + 1;
    let mut depth = 0usize;
    loop {
        match *bytes.get(pos)? {
            b'\\' => pos += 1,
            b'[' => depth += 1,
            b']' if depth == 0 => break,
            b']' => depth -= 1,
            b'\n' => return None,
            _ => {}
        }
        pos += 1;
    }
    let text = open + 1..pos;
    if bytes.get(pos + 1) != Some(&b'(') {
        return None;
    }

    pos += 2;
    pos = skip_spaces(bytes, pos);
    let destination = if bytes.get(pos) == Some(&b'<') {
        let start = pos + 1;
        let len = bytes[start..]
            .iter()
            .position(|b| matches!(b, b'>' | b'\n'))?;
        if bytes[start + len] != b'>' {
            return None;
        }
        pos = start + len + 1;
        start..start + len
    } else {
        let start = pos;
        let mut parens = 0usize;
        while let Some(&b) = bytes.get(pos) {
            match b {
                b'\\' => pos += 2,
                b'(' => {
                    parens += 1;
                    pos += 1;
                }
                b')' if parens == 0 => break,
                b')' => {
                    parens -= 1;
                    pos += 1;
                }
                b' ' | b'\t' | b'\n' => break,
                _ => pos += 1,
            }
        }
        pos = pos.min(bytes.len());
        start..pos
    };

    pos = skip_spaces(bytes, pos);
    if let Some(&quote @ (b'"' | b'\'')) = bytes.get(pos) {
        let len = bytes[pos + 1..].iter().position(|b| *b == quote)?;
        pos = skip_spaces(bytes, pos + 1 + len + 1);
    }
    if bytes.get(pos) != Some(&b')') {
        return None;
    }
    Some(LinkSyntax {
        text,
        destination,
        end: pos + 1,
    })
}

fn skip_spaces(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos) == Some(&b' ') {
        pos += 1;
    }
    pos
}

fn tag(s: &str, hash: usize) -> Step {
    if s[..hash].chars().next_back().is_some_and(blocks_tag) {
        return Step::Literal;
    }
    let rest = &s[hash + 1..];
    let len = rest
        .char_indices()
        .find(|(_, c)| !is_tag_char(*c))
        .map_or(rest.len(), |(i, _)| i);
    let Some(name) = normalize_tag(&rest[..len]) else {
        return Step::Literal;
    };
    let end = hash + 1 + len;
    let reference = RawReference::new(ReferenceKind::Tag, &s[hash..end], name, hash..end);
    Step::Emit(reference, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(text: &str, kind: ReferenceKind) -> Vec<String> {
        extract(text)
            .filter(|r| r.kind == kind)
            .map(|r| r.target)
            .collect()
    }

    #[test]
    fn wikilinks_embeds_and_aliases() {
        let text = "See [[Sussudio|the song]] and ![[Egg.jpg|125]] plus [[Isolated note#Intro]].";
        let refs: Vec<_> = extract(text).collect();
        assert_eq!(refs.len(), 3);

        assert_eq!(refs[0].kind, ReferenceKind::Wikilink);
        assert_eq!(refs[0].target, "Sussudio");
        assert_eq!(refs[0].alias.as_deref(), Some("the song"));
        assert_eq!(refs[0].raw, "Sussudio|the song");
        assert_eq!(&text[refs[0].span.clone()], "[[Sussudio|the song]]");

        assert_eq!(refs[1].kind, ReferenceKind::Embed);
        assert_eq!(refs[1].target, "Egg.jpg");
        assert_eq!(&text[refs[1].span.clone()], "![[Egg.jpg|125]]");

        assert_eq!(refs[2].target, "Isolated note");
        assert_eq!(refs[2].anchor, Some(Anchor::Heading("Intro".into())));
    }

    #[test]
    fn links_in_code_are_not_links() {
        let text = "```\n[[Hidden]]\n```\nInline `[[Also hidden]]` but [[Visible]].\n  ~~~\n  [[Tilde]]\n  ~~~\n";
        assert_eq!(targets(text, ReferenceKind::Wikilink), vec!["Visible"]);
    }

    #[test]
    fn indented_code_hides_links_and_tags() {
        let text = "para\n\n    [[InIndentedCode]] #tagincode\n\nafter [[Shown]]";
        let refs: Vec<_> = extract(text).collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].target, "Shown");

        let list = "- item\n\n    [[InListItem]]\n";
        assert_eq!(targets(list, ReferenceKind::Wikilink), vec!["InListItem"]);
    }

    #[test]
    fn escaped_pipe_in_table_cell() {
        let text = "| link | note |\n| --- | --- |\n| [[A\\|alias]] | x |\n";
        let refs: Vec<_> = extract(text).collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].target, "A");
        assert_eq!(refs[0].alias.as_deref(), Some("alias"));
    }

    #[test]
    fn markdown_links_local_and_external() {
        let text = "[Obsidian](https://obsidian.md) and [B](folder/B%20note.md#Part \"title\") and [in page](#top) and ![pic](<Egg 2.jpg>)";
        let refs: Vec<_> = extract(text).collect();
        assert_eq!(refs.len(), 3);

        assert!(refs[0].external);
        assert_eq!(refs[0].target, "https://obsidian.md");
        assert_eq!(refs[0].alias.as_deref(), Some("Obsidian"));

        assert!(!refs[1].external);
        assert_eq!(refs[1].raw, "folder/B%20note.md#Part");
        assert_eq!(refs[1].target, "folder/B note.md");
        assert_eq!(refs[1].anchor, Some(Anchor::Heading("Part".into())));

        assert_eq!(refs[2].target, "Egg 2.jpg");
        assert_eq!(&text[refs[2].span.clone()], "![pic](<Egg 2.jpg>)");
    }

    #[test]
    fn nested_parentheses_in_destination() {
        let refs: Vec<_> = extract("[x](Note (draft).md)").collect();
        assert_eq!(refs.len(), 0, "space ends a bare destination");
        let refs: Vec<_> = extract("[x](Note_(draft).md)").collect();
        assert_eq!(refs[0].target, "Note_(draft).md");
    }

    #[test]
    fn tags_follow_boundary_rules() {
        let text = "#y1982 #y_1982 #y-1982 #y1982/sep #y2000/party-over/oops/out-of-time \
                    \\#escaped a#b &#123; #1985 ## heading-ish #trailing/";
        assert_eq!(
            targets(text, ReferenceKind::Tag),
            vec![
                "y1982",
                "y_1982",
                "y-1982",
                "y1982/sep",
                "y2000/party-over/oops/out-of-time",
                "trailing",
            ]
        );
    }

    #[test]
    fn headings_are_not_tags() {
        assert_eq!(targets("# Title\n## Sub #real", ReferenceKind::Tag), vec!["real"]);
    }

    #[test]
    fn anchors_inside_links_are_not_tags() {
        let text = "[[Note#Heading]] [x](B.md#Part) https://site.com/#frag";
        assert!(targets(text, ReferenceKind::Tag).is_empty());
    }

    #[test]
    fn math_is_verbatim_and_ordered() {
        let text = "[[A]] then $\\beta_{0}$ then [[B]]\n$$\n\\hat{\\beta}_{GEE}\n$$\n";
        let refs: Vec<_> = extract(text).collect();
        let kinds: Vec<_> = refs.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ReferenceKind::Wikilink,
                ReferenceKind::Math,
                ReferenceKind::Wikilink,
                ReferenceKind::Math,
            ]
        );
        assert_eq!(refs[1].target, "\\beta_{0}");
        assert!(!refs[1].display_math);
        assert_eq!(refs[3].target, "\\hat{\\beta}_{GEE}");
        assert!(refs[3].display_math);
    }

    #[test]
    fn links_inside_math_are_ignored() {
        let text = "$[[x]]_{#tag}$";
        let refs: Vec<_> = extract(text).collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, ReferenceKind::Math);
    }

    #[test]
    fn malformed_syntax_is_plain_text() {
        let text = "[[unterminated and [x]( and [y] and # lone and [[]] and [[#Same note]]";
        assert_eq!(extract(text).count(), 0);
    }

    #[test]
    fn iteration_is_lazy() {
        let text = "[[A]] [[B]] [[C]]";
        let mut refs = extract(text);
        assert_eq!(refs.next().map(|r| r.target), Some("A".to_string()));
        assert_eq!(refs.next().map(|r| r.target), Some("B".to_string()));
        assert_eq!(refs.next().map(|r| r.target), Some("C".to_string()));
        assert!(refs.next().is_none());
        assert!(refs.next().is_none());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn never_panics_and_spans_are_in_bounds(text in "\\PC{0,200}") {
                for reference in extract(&text) {
                    prop_assert!(reference.span.end <= text.len());
                    prop_assert!(text.is_char_boundary(reference.span.start));
                    prop_assert!(text.is_char_boundary(reference.span.end));
                }
            }

            #[test]
            fn markdown_noise_never_panics(text in "[\\[\\]()!#$`~\\\\a-z|^ \n]{0,120}") {
                let spans: Vec<_> = extract(&text).map(|r| r.span).collect();
                for pair in spans.windows(2) {
                    prop_assert!(pair[0].start <= pair[1].start);
                }
            }

            #[test]
            fn inline_math_is_reproduced_verbatim(body in "[a-z_{}^\\\\]{1,20}[a-z}]") {
                let text = format!("before ${body}$ after");
                let math: Vec<_> = extract(&text)
                    .filter(|r| r.kind == ReferenceKind::Math)
                    .collect();
                prop_assert_eq!(math.len(), 1);
                prop_assert_eq!(&math[0].target, &body);
            }
        }
    }
}
