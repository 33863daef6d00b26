//! YAML front matter splitting and parsing.
//!
//! Front matter is optional. When a note starts with a `---` line and a
//! later line is exactly `---`, the text between them is YAML:
//! ```markdown
//! ---
//! title: Sussudio
//! tags: [y1982, music]
//! ---
//!
//! # Body content here
//! ```
//! A `---` line anywhere else is a thematic break and belongs to the body.

use std::collections::BTreeMap;

use crate::error::{NotegraphError, Result};

/// Parsed front matter: top-level YAML keys mapped to JSON-shaped values.
pub type FrontMatter = BTreeMap<String, serde_json::Value>;

/// Split a note into its raw YAML block (if any) and its body.
///
/// Never fails: a note without a well-formed opening and closing delimiter
/// is returned whole as body.
pub fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let Some(after_open) = content
        .strip_prefix("---")
        .and_then(|rest| rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')))
    else {
        return (None, content);
    };

    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            let yaml = &after_open[..offset];
            let body = &after_open[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }

    (None, content)
}

/// Parse a note into front matter and body.
///
/// Empty YAML and YAML that is not a mapping yield empty front matter.
///
/// # Errors
///
/// Returns [`NotegraphError::Parse`] if the YAML block is malformed or has
/// keys that are not strings.
pub fn parse_frontmatter(content: &str) -> Result<(FrontMatter, &str)> {
    let (yaml, body) = split_frontmatter(content);
    let Some(yaml) = yaml else {
        return Ok((FrontMatter::new(), body));
    };

    let value: serde_json::Value =
        serde_yaml::from_str(yaml).map_err(|e| NotegraphError::Parse(e.to_string()))?;

    let front_matter = match value {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => FrontMatter::new(),
    };
    Ok((front_matter, body))
}

/// Tags declared in front matter under `tags` or `tag`.
///
/// Accepts a YAML list or a comma/space separated string. Leading `#` is
/// stripped; empty entries are dropped.
pub fn frontmatter_tags(front_matter: &FrontMatter) -> Vec<String> {
    let Some(value) = front_matter.get("tags").or_else(|| front_matter.get("tag")) else {
        return Vec::new();
    };

    let raw: Vec<String> = match value {
        serde_json::Value::String(s) => s
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::to_string)
            .collect(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    raw.into_iter()
        .map(|tag| tag.trim().trim_start_matches('#').to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}
