//! Raw tabular results from data providers
//!
//! Providers return heterogeneous tables (news rows, price rows, indicator
//! rows). A [`Frame`] keeps them as string cells under named columns, which
//! is all the summarization prompts need.

use comfy_table::{ContentArrangement, Table, presets::ASCII_MARKDOWN};
use serde::{Deserialize, Serialize};

/// A simple column-oriented table with string cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Column names, in display order
    pub columns: Vec<String>,
    /// Rows; every row has exactly `columns.len()` cells
    pub rows: Vec<Vec<String>>,
}

impl Frame {
    /// Create an empty frame with the given columns
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; short rows are padded with empty cells, long rows are
    /// truncated to the column count
    pub fn push_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cells: Vec<String> = row.into_iter().map(Into::into).collect();
        cells.resize(self.columns.len(), String::new());
        self.rows.push(cells);
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the frame has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All cells of a named column, or None if the column does not exist.
    ///
    /// The fields are public, so a frame deserialized from an external
    /// payload may carry short rows; those yield empty cells.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(
            self.rows
                .iter()
                .map(|r| r.get(idx).map_or("", String::as_str))
                .collect(),
        )
    }

    /// Render the frame as markdown-style text for LLM prompts
    pub fn render(&self) -> String {
        if self.is_empty() {
            return "(no rows)".to_string();
        }

        let mut table = Table::new();
        table
            .load_preset(ASCII_MARKDOWN)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(&self.columns);
        for row in &self.rows {
            table.add_row(row);
        }
        table.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn news_frame() -> Frame {
        let mut frame = Frame::new(["title", "content", "pub_time", "url"]);
        frame.push_row([
            "Central bank holds rates",
            "Policy rate unchanged at 3.45%",
            "2024-08-19 09:15:00",
            "https://example.com/1",
        ]);
        frame.push_row(["Chip sector rallies", "Semis up 4% on export news", "2024-08-19 10:02:00", ""]);
        frame
    }

    #[test]
    fn test_push_row_pads_and_truncates() {
        let mut frame = Frame::new(["a", "b"]);
        frame.push_row(["1"]);
        frame.push_row(["1", "2", "3"]);

        assert_eq!(frame.rows[0], vec!["1".to_string(), String::new()]);
        assert_eq!(frame.rows[1], vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_column_access() {
        let frame = news_frame();
        let titles = frame.column("title").unwrap();
        assert_eq!(titles, vec!["Central bank holds rates", "Chip sector rallies"]);
        assert!(frame.column("missing").is_none());
    }

    #[test]
    fn test_column_tolerates_short_deserialized_rows() {
        let frame: Frame = serde_json::from_value(serde_json::json!({
            "columns": ["title", "url"],
            "rows": [["Chip sector rallies", "https://example.com/1"], ["Rates held"]],
        }))
        .unwrap();

        let urls = frame.column("url").unwrap();
        assert_eq!(urls, vec!["https://example.com/1", ""]);
    }

    #[test]
    fn test_render() {
        let frame = news_frame();
        let text = frame.render();
        assert!(text.contains("title"));
        assert!(text.contains("Chip sector rallies"));

        let empty = Frame::new(["a"]);
        assert_eq!(empty.render(), "(no rows)");
    }

    #[test]
    fn test_serde_round_trip() {
        let frame = news_frame();
        let value = serde_json::to_value(&frame).unwrap();
        let back: Frame = serde_json::from_value(value).unwrap();
        assert_eq!(back, frame);
    }
}
