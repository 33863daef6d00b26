//! First pass over a note: locate code and math regions.
//!
//! Everything inside these regions is opaque to the reference scanner and
//! is cut out of plaintext renderings.
//! Math has to be found before any markdown-aware pass sees the text, or
//! LaTeX subscripts such as `\beta_{0}` get read as emphasis markers.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// Fenced block (```` ``` ```` or `~~~`), indented block or inline
    /// code span.
    Code,
    /// `$...$`
    InlineMath,
    /// `$$...$$`
    DisplayMath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub kind: RegionKind,
    /// Whole region including delimiters.
    pub span: Range<usize>,
    /// Content between the delimiters.
    pub content: Range<usize>,
}

impl Region {
    #[must_use]
    pub fn is_math(&self) -> bool {
        matches!(self.kind, RegionKind::InlineMath | RegionKind::DisplayMath)
    }
}

/// Find every code and math region in `text`, in order, non-overlapping.
pub fn find_regions(text: &str) -> Vec<Region> {
    let bytes = text.as_bytes();
    let mut regions = Vec::new();
    let mut i = 0;
    let mut line_start = true;
    // Line state for indented code: it needs a blank line before it and
    // does not start inside a list.
    let mut prev_blank = true;
    let mut this_blank = false;
    let mut in_list = false;

    while i < bytes.len() {
        if line_start {
            let line = &bytes[i..line_end(bytes, i)];
            let (indent, rest) = split_indent(line);
            this_blank = rest.iter().all(u8::is_ascii_whitespace);
            if !this_blank && indent >= 4 && prev_blank && !in_list {
                let region = indented_block(bytes, i);
                i = region.span.end;
                regions.push(region);
                prev_blank = false;
                continue;
            }
            if !this_blank && indent < 4 {
                in_list = is_list_marker(rest);
            }
            if let Some(region) = fenced_block(bytes, i) {
                i = region.span.end;
                regions.push(region);
                prev_blank = false;
                continue;
            }
        }

        match bytes[i] {
            b'\\' => {
                let escaped = bytes.get(i + 1).is_some_and(u8::is_ascii_punctuation);
                i += if escaped { 2 } else { 1 };
                line_start = false;
            }
            b'`' => {
                let run = run_length(bytes, i, b'`');
                match code_span(bytes, i, run) {
                    Some(region) => {
                        i = region.span.end;
                        regions.push(region);
                    }
                    None => i += run,
                }
                line_start = false;
            }
            b'$' => {
                match math_span(bytes, i) {
                    Some(region) => {
                        i = region.span.end;
                        regions.push(region);
                    }
                    None => i += run_length(bytes, i, b'$'),
                }
                line_start = false;
            }
            b'\n' => {
                i += 1;
                line_start = true;
                prev_blank = this_blank;
            }
            _ => {
                i += 1;
                line_start = false;
            }
        }
    }

    regions
}

/// Replace every byte inside `regions` with a space, keeping newlines.
///
/// Byte offsets are preserved, so positions found in the masked text are
/// valid in the unmasked text.
pub fn mask(text: &str, regions: &[Region]) -> String {
    let mut bytes = text.as_bytes().to_vec();
    for region in regions {
        for byte in &mut bytes[region.span.clone()] {
            if *byte != b'\n' {
                *byte = b' ';
            }
        }
    }
    // Regions start and end on ASCII delimiters, so whole characters are
    // replaced and the result stays valid UTF-8.
    String::from_utf8_lossy(&bytes).into_owned()
}

fn run_length(bytes: &[u8], from: usize, ch: u8) -> usize {
    bytes[from..].iter().take_while(|b| **b == ch).count()
}

fn line_end(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|b| *b == b'\n')
        .map_or(bytes.len(), |p| from + p)
}

/// Indentation width (tabs to the next multiple of four) and the rest of
/// the line.
fn split_indent(line: &[u8]) -> (usize, &[u8]) {
    let mut width = 0;
    for (i, b) in line.iter().enumerate() {
        match b {
            b' ' => width += 1,
            b'\t' => width += 4 - width % 4,
            _ => return (width, &line[i..]),
        }
    }
    (width, &[])
}

fn is_list_marker(rest: &[u8]) -> bool {
    let followed_by_space =
        |at: usize| rest.get(at).is_none_or(|b| matches!(b, b' ' | b'\t' | b'\r'));
    match rest.first() {
        Some(b'-' | b'*' | b'+') => followed_by_space(1),
        Some(b) if b.is_ascii_digit() => {
            let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
            digits <= 9
                && matches!(rest.get(digits), Some(b'.' | b')'))
                && followed_by_space(digits + 1)
        }
        _ => false,
    }
}

/// Indented code starting at `start`: every following line indented by
/// four or more, with blank lines inside. Trailing blank lines are not part
/// of the block.
fn indented_block(bytes: &[u8], start: usize) -> Region {
    let mut end = start;
    let mut pos = start;
    while pos < bytes.len() {
        let eol = line_end(bytes, pos);
        let (indent, rest) = split_indent(&bytes[pos..eol]);
        let blank = rest.iter().all(u8::is_ascii_whitespace);
        if !blank && indent < 4 {
            break;
        }
        let next = (eol + 1).min(bytes.len());
        if !blank {
            end = next;
        }
        pos = next;
    }
    Region {
        kind: RegionKind::Code,
        span: start..end,
        content: start..end,
    }
}

fn fenced_block(bytes: &[u8], start: usize) -> Option<Region> {
    let indent = bytes[start..].iter().take(4).take_while(|b| **b == b' ').count();
    if indent > 3 {
        return None;
    }
    let fence_start = start + indent;
    let fence_char = *bytes.get(fence_start)?;
    if fence_char != b'`' && fence_char != b'~' {
        return None;
    }
    let fence_len = run_length(bytes, fence_start, fence_char);
    if fence_len < 3 {
        return None;
    }
    let info_end = line_end(bytes, fence_start);
    if fence_char == b'`' && bytes[fence_start + fence_len..info_end].contains(&b'`') {
        return None;
    }

    let content_start = (info_end + 1).min(bytes.len());
    let mut pos = content_start;
    while pos < bytes.len() {
        let end = line_end(bytes, pos);
        if is_closing_fence(&bytes[pos..end], fence_char, fence_len) {
            return Some(Region {
                kind: RegionKind::Code,
                span: start..(end + 1).min(bytes.len()),
                content: content_start..pos,
            });
        }
        pos = end + 1;
    }

    // Unclosed fences run to the end of the document.
    Some(Region {
        kind: RegionKind::Code,
        span: start..bytes.len(),
        content: content_start..bytes.len(),
    })
}

fn is_closing_fence(line: &[u8], fence_char: u8, min_len: usize) -> bool {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let indent = line.iter().take_while(|b| **b == b' ').count();
    if indent > 3 {
        return false;
    }
    let rest = &line[indent..];
    let run = rest.iter().take_while(|b| **b == fence_char).count();
    run >= min_len && rest[run..].iter().all(u8::is_ascii_whitespace)
}

fn code_span(bytes: &[u8], start: usize, run: usize) -> Option<Region> {
    let content_start = start + run;
    let mut pos = content_start;
    while pos < bytes.len() {
        if bytes[pos] == b'`' {
            let closing = run_length(bytes, pos, b'`');
            if closing == run {
                return Some(Region {
                    kind: RegionKind::Code,
                    span: start..pos + closing,
                    content: content_start..pos,
                });
            }
            pos += closing;
        } else {
            pos += 1;
        }
    }
    None
}

fn math_span(bytes: &[u8], start: usize) -> Option<Region> {
    if bytes.get(start + 1) == Some(&b'$') {
        return display_math(bytes, start);
    }

    let content_start = start + 1;
    let first = *bytes.get(content_start)?;
    if first.is_ascii_whitespace() {
        return None;
    }

    let mut pos = content_start;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b'\n' if bytes.get(pos + 1) == Some(&b'\n') => return None,
            b'$' => {
                let closes = !bytes[pos - 1].is_ascii_whitespace()
                    && !bytes.get(pos + 1).is_some_and(u8::is_ascii_digit);
                if closes {
                    return Some(Region {
                        kind: RegionKind::InlineMath,
                        span: start..pos + 1,
                        content: content_start..pos,
                    });
                }
                pos += 1;
            }
            _ => pos += 1,
        }
    }
    None
}

fn display_math(bytes: &[u8], start: usize) -> Option<Region> {
    let content_start = start + 2;
    let mut pos = content_start;
    while pos + 1 < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b'$' if bytes[pos + 1] == b'$' => {
                if pos == content_start {
                    return None;
                }
                return Some(Region {
                    kind: RegionKind::DisplayMath,
                    span: start..pos + 2,
                    content: content_start..pos,
                });
            }
            _ => pos += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents<'a>(text: &'a str, regions: &[Region]) -> Vec<(RegionKind, &'a str)> {
        regions
            .iter()
            .map(|r| (r.kind, &text[r.content.clone()]))
            .collect()
    }

    #[test]
    fn inline_and_display_math() {
        let text = "Estimate $\\beta_{0}$ first.\n\n$$\n\\hat{\\beta}_{GEE}\n$$\n";
        let regions = find_regions(text);
        assert_eq!(
            contents(text, &regions),
            vec![
                (RegionKind::InlineMath, "\\beta_{0}"),
                (RegionKind::DisplayMath, "\n\\hat{\\beta}_{GEE}\n"),
            ]
        );
    }

    #[test]
    fn dollar_amounts_are_not_math() {
        assert!(find_regions("It costs $5 and $6 today.").is_empty());
        assert!(find_regions("Trailing $ alone").is_empty());
        assert!(find_regions("$ spaced $").is_empty());
    }

    #[test]
    fn escaped_dollar_does_not_open_math() {
        assert!(find_regions("Price: \\$x$ here").is_empty());
    }

    #[test]
    fn inline_math_stops_at_paragraph_break() {
        assert!(find_regions("$a\n\nb$").is_empty());
    }

    #[test]
    fn fenced_blocks_and_code_spans() {
        let text = "Before\n```rust\nlet x = [[Not a link]];\n```\nUse `[[nope]]` and ~~~\n~~~\nfenced\n~~~\n";
        let regions = find_regions(text);
        let kinds: Vec<_> = regions.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![RegionKind::Code, RegionKind::Code, RegionKind::Code]);
        assert_eq!(&text[regions[0].content.clone()], "let x = [[Not a link]];\n");
        assert_eq!(&text[regions[1].content.clone()], "[[nope]]");
        assert_eq!(&text[regions[2].content.clone()], "fenced\n");
    }

    #[test]
    fn math_inside_code_is_not_math() {
        let text = "```\n$x_1$\n```\n";
        let regions = find_regions(text);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].kind, RegionKind::Code);
    }

    #[test]
    fn indented_block_after_blank_line_is_code() {
        let text = "para\n\n    [[InIndentedCode]] #tagincode\n\n\tmore code\n\nafter";
        let regions = find_regions(text);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].kind, RegionKind::Code);
        assert_eq!(
            &text[regions[0].span.clone()],
            "    [[InIndentedCode]] #tagincode\n\n\tmore code\n"
        );
    }

    #[test]
    fn indented_lines_that_are_not_code() {
        // Lazy paragraph continuation.
        assert!(find_regions("para\n    still para\n").is_empty());
        // List item continuation.
        assert!(find_regions("- item\n\n    more of the item\n").is_empty());
        assert!(find_regions("1. item\n\n    more of the item\n").is_empty());
        // A paragraph after the list ends it.
        let text = "- item\n\nplain\n\n    code\n";
        assert_eq!(find_regions(text).len(), 1);
    }

    #[test]
    fn unclosed_fence_runs_to_end() {
        let text = "```\n[[A]]\nstill code";
        let regions = find_regions(text);
        assert_eq!(regions[0].span, 0..text.len());
    }

    #[test]
    fn mask_preserves_offsets_and_newlines() {
        let text = "a $x_é$ b\n```\nc\n```\n";
        let masked = mask(text, &find_regions(text));
        assert_eq!(masked.len(), text.len());
        assert!(masked.starts_with("a "));
        assert!(!masked.contains('$'));
        assert!(!masked.contains('`'));
        assert_eq!(masked.matches('\n').count(), text.matches('\n').count());
    }
}
