//! Plaintext renderings of a note body.
//!
//! Math and code are cut out with the same region pass the reference
//! scanner uses, so both agree on what is math. The rest goes through
//! `pulldown-cmark` with wikilink support switched on.

use std::borrow::Cow;

use pulldown_cmark::{Event, LinkType, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

use notegraph_core::GatherConfig;

use crate::regions::{find_regions, RegionKind};

/// Switches for the gather phase renderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatherOptions {
    /// Drop inline code and fenced blocks.
    pub remove_code: bool,
    /// Keep `#` heading markers in readable text.
    pub keep_headings: bool,
    /// Keep paragraph breaks in readable text; otherwise it is one line.
    pub keep_paragraphs: bool,
}

impl Default for GatherOptions {
    fn default() -> Self {
        Self::from(&GatherConfig::default())
    }
}

impl From<&GatherConfig> for GatherOptions {
    fn from(config: &GatherConfig) -> Self {
        Self {
            remove_code: config.remove_code,
            keep_headings: config.keep_headings,
            keep_paragraphs: config.keep_paragraphs,
        }
    }
}

pub(crate) fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_WIKILINKS);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);
    options
}

/// Body text with math (and, by default, code) removed but markdown link
/// syntax kept.
pub fn source_text(body: &str, options: &GatherOptions) -> String {
    render(body, Mode::Source, options)
}

/// Body text for reading: links become their display text; embeds,
/// strikethrough, emphasis markers, math and (by default) code are removed.
pub fn readable_text(body: &str, options: &GatherOptions) -> String {
    render(body, Mode::Readable, options)
}

fn render(body: &str, mode: Mode, options: &GatherOptions) -> String {
    let mut renderer = Renderer {
        mode,
        options,
        out: String::with_capacity(body.len()),
        skip: 0,
        links: Vec::new(),
    };
    let prose = strip_regions(body, options.remove_code);
    for event in Parser::new_ext(&prose, markdown_options()) {
        renderer.event(event);
    }
    renderer.finish()
}

/// `body` without its math regions, and without code regions when
/// `remove_code` is set.
fn strip_regions(body: &str, remove_code: bool) -> Cow<'_, str> {
    let dropped: Vec<_> = find_regions(body)
        .into_iter()
        .filter(|region| region.is_math() || (remove_code && region.kind == RegionKind::Code))
        .collect();
    if dropped.is_empty() {
        return Cow::Borrowed(body);
    }
    let mut kept = String::with_capacity(body.len());
    let mut from = 0;
    for region in dropped {
        kept.push_str(&body[from..region.span.start]);
        from = region.span.end;
    }
    kept.push_str(&body[from..]);
    Cow::Owned(kept)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Source,
    Readable,
}

struct PendingLink {
    embed: bool,
    wiki: bool,
    dest: String,
    text: String,
}

impl PendingLink {
    fn render(&self) -> String {
        let bang = if self.embed { "!" } else { "" };
        if !self.wiki {
            return format!("{bang}[{}]({})", self.text, self.dest);
        }
        if self.text.is_empty() || self.text == self.dest {
            format!("{bang}[[{}]]", self.dest)
        } else {
            format!("{bang}[[{}|{}]]", self.dest, self.text)
        }
    }
}

struct Renderer<'o> {
    mode: Mode,
    options: &'o GatherOptions,
    out: String,
    /// Depth of elements whose text is dropped.
    skip: usize,
    /// Links being rebuilt in source mode, innermost last.
    links: Vec<PendingLink>,
}

impl Renderer<'_> {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.push(&text),
            Event::Code(code) => {
                if !self.options.remove_code {
                    self.push(&code);
                }
            }
            Event::SoftBreak | Event::HardBreak => self.push(self.line_break()),
            Event::Rule => self.push(self.block_break()),
            Event::FootnoteReference(label) if self.mode == Mode::Source => {
                self.push(&format!("[^{label}]"));
            }
            Event::TaskListMarker(done) if self.mode == Mode::Source => {
                self.push(if done { "[x] " } else { "[ ] " });
            }
            // Math, raw HTML and the rest carry no prose.
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                if self.mode == Mode::Source || self.options.keep_headings {
                    let marker = "#".repeat(level as usize);
                    self.push(&marker);
                    self.push(" ");
                }
            }
            Tag::CodeBlock(_) if self.options.remove_code => self.skip += 1,
            Tag::MetadataBlock(_) => self.skip += 1,
            Tag::Strikethrough if self.mode == Mode::Readable => self.skip += 1,
            Tag::Image { .. } if self.mode == Mode::Readable => self.skip += 1,
            Tag::Image {
                link_type, dest_url, ..
            } => self.open_link(true, link_type, &dest_url),
            Tag::Link {
                link_type, dest_url, ..
            } if self.mode == Mode::Source => self.open_link(false, link_type, &dest_url),
            Tag::Item if self.mode == Mode::Source => self.push("- "),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) | TagEnd::Paragraph => self.push(self.block_break()),
            TagEnd::CodeBlock => {
                if self.options.remove_code {
                    self.skip = self.skip.saturating_sub(1);
                } else {
                    self.push(self.block_break());
                }
            }
            TagEnd::MetadataBlock(_) => self.skip = self.skip.saturating_sub(1),
            TagEnd::Strikethrough | TagEnd::Image if self.mode == Mode::Readable => {
                self.skip = self.skip.saturating_sub(1);
            }
            TagEnd::Image => self.close_link(),
            TagEnd::Link if self.mode == Mode::Source => self.close_link(),
            TagEnd::Item => self.push(self.line_break()),
            TagEnd::TableCell => self.push(" "),
            TagEnd::TableHead | TagEnd::TableRow => self.push(self.line_break()),
            _ => {}
        }
    }

    fn open_link(&mut self, embed: bool, link_type: LinkType, dest: &str) {
        if self.skip > 0 {
            return;
        }
        self.links.push(PendingLink {
            embed,
            wiki: matches!(link_type, LinkType::WikiLink { .. }),
            dest: dest.to_string(),
            text: String::new(),
        });
    }

    fn close_link(&mut self) {
        if self.skip > 0 {
            return;
        }
        if let Some(link) = self.links.pop() {
            let rendered = link.render();
            self.push(&rendered);
        }
    }

    fn push(&mut self, text: &str) {
        if self.skip > 0 {
            return;
        }
        match self.links.last_mut() {
            Some(link) => link.text.push_str(text),
            None => self.out.push_str(text),
        }
    }

    fn line_break(&self) -> &'static str {
        if self.mode == Mode::Source || self.options.keep_paragraphs {
            "\n"
        } else {
            " "
        }
    }

    fn block_break(&self) -> &'static str {
        if self.mode == Mode::Source || self.options.keep_paragraphs {
            "\n\n"
        } else {
            " "
        }
    }

    fn finish(mut self) -> String {
        while let Some(link) = self.links.pop() {
            self.out.push_str(&link.render());
        }

        if self.mode == Mode::Readable && !self.options.keep_paragraphs {
            let line = self.out.split_whitespace().collect::<Vec<_>>().join(" ");
            return if line.is_empty() { line } else { line + "\n" };
        }

        let mut text = String::with_capacity(self.out.len());
        let mut blank_run = 0;
        for line in self.out.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                blank_run += 1;
                if blank_run > 1 {
                    continue;
                }
            } else {
                blank_run = 0;
            }
            text.push_str(line);
            text.push('\n');
        }
        let trimmed = text.trim_matches('\n');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}\n")
        }
    }
}
