//! Result formatting: JSON, Table, and Markdown output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Output format for result sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    #[default]
    Table,
    Markdown,
}

/// A single row in a result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Rows sharing one column layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Display order of the columns.
    pub columns: Vec<String>,
    pub rows: Vec<ResultRow>,
    pub total: usize,
}

impl QueryResult {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            total: 0,
        }
    }

    /// One-column result from a list of values.
    pub fn list<T: Into<serde_json::Value>>(
        column: &str,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        let mut result = Self::new([column]);
        for value in values {
            result.push([value.into()]);
        }
        result
    }

    /// Append a row; values pair up with columns in order.
    pub fn push(&mut self, values: impl IntoIterator<Item = serde_json::Value>) {
        let fields = self.columns.iter().cloned().zip(values).collect();
        self.rows.push(ResultRow { fields });
        self.total = self.rows.len();
    }
}

/// Format results in the specified output format.
#[must_use]
pub fn format_results(result: &QueryResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json(result),
        OutputFormat::Table => format_table(result),
        OutputFormat::Markdown => format_markdown(result),
    }
}

fn format_json(result: &QueryResult) -> String {
    serde_json::to_string_pretty(result).unwrap_or_else(|_| "[]".to_string())
}

fn format_table(result: &QueryResult) -> String {
    if result.rows.is_empty() {
        return "(no results)".to_string();
    }
    let columns = &result.columns;

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in &result.rows {
        for (i, col) in columns.iter().enumerate() {
            widths[i] = widths[i].max(cell(row, col).chars().count());
        }
    }

    let mut output = String::new();

    let header: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:width$}", c, width = widths[i]))
        .collect();
    output.push_str(header.join(" | ").trim_end());
    output.push('\n');

    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(&sep.join("-+-"));
    output.push('\n');

    for row in &result.rows {
        let vals: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{:width$}", cell(row, col), width = widths[i]))
            .collect();
        output.push_str(vals.join(" | ").trim_end());
        output.push('\n');
    }

    output
}

fn format_markdown(result: &QueryResult) -> String {
    if result.rows.is_empty() {
        return "*No results*\n".to_string();
    }
    let columns = &result.columns;

    let mut output = String::new();

    output.push_str("| ");
    output.push_str(&columns.join(" | "));
    output.push_str(" |\n");

    output.push_str("| ");
    let seps: Vec<&str> = columns.iter().map(|_| "---").collect();
    output.push_str(&seps.join(" | "));
    output.push_str(" |\n");

    for row in &result.rows {
        output.push_str("| ");
        let vals: Vec<String> = columns
            .iter()
            .map(|col| cell(row, col).replace('|', "\\|"))
            .collect();
        output.push_str(&vals.join(" | "));
        output.push_str(" |\n");
    }

    output
}

fn cell(row: &ResultRow, column: &str) -> String {
    row.fields
        .get(column)
        .map(value_to_display)
        .unwrap_or_default()
}

fn value_to_display(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(value_to_display)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_result() -> QueryResult {
        let mut result = QueryResult::new(["note", "n_backlinks", "tags"]);
        result.push([json!("Sussudio"), json!(2), json!(["y1982", "music"])]);
        result.push([json!("Isolated note"), json!(0), json!([])]);
        result
    }

    #[test]
    fn format_as_json() {
        let result = sample_result();
        let output = format_results(&result, OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["total"], 2);
        assert_eq!(parsed["rows"][0]["fields"]["note"], "Sussudio");
        assert_eq!(parsed["columns"][1], "n_backlinks");
    }

    #[test]
    fn format_as_table_keeps_column_order() {
        let output = format_results(&sample_result(), OutputFormat::Table);
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].starts_with("note"));
        assert!(lines[0].find("n_backlinks") < lines[0].find("tags"));
        assert!(lines[1].contains("-+-"));
        assert!(lines[2].contains("y1982, music"));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn format_as_markdown() {
        let output = format_results(&sample_result(), OutputFormat::Markdown);
        assert!(output.starts_with("| note | n_backlinks | tags |\n| --- | --- | --- |\n"));
        assert!(output.contains("| Isolated note | 0 |  |\n"));
    }

    #[test]
    fn markdown_escapes_pipes() {
        let result = QueryResult::list("link", ["B|alias"]);
        let output = format_results(&result, OutputFormat::Markdown);
        assert!(output.contains("B\\|alias"));
    }

    #[test]
    fn format_empty_result() {
        let result = QueryResult::new(["note"]);
        assert_eq!(format_results(&result, OutputFormat::Table), "(no results)");
        assert_eq!(
            format_results(&result, OutputFormat::Markdown),
            "*No results*\n"
        );
    }
}
