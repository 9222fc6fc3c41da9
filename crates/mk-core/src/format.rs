//! Structured value formatter
//!
//! Renders labelled, arbitrarily nested values as a boxed two-column table.
//! Used to print command parameter summaries before a command runs.

use std::collections::BTreeMap;

use console::{measure_text_width, pad_str, Alignment};

/// Glyph shown for `true`
pub const CHECK_MARK: &str = "✓";
/// Glyph shown for `false`
pub const DASH: &str = "-";

/// A displayable value: scalar, sequence, or keyed mapping
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    Bool(bool),
    Text(String),
    List(Vec<InfoValue>),
    /// Ordered key/value pairs
    Map(Vec<(String, InfoValue)>),
}

impl InfoValue {
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<InfoValue>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<InfoValue>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Render into display lines
    pub fn render_lines(&self) -> Vec<String> {
        match self {
            Self::Bool(true) => vec![CHECK_MARK.to_string()],
            Self::Bool(false) => vec![DASH.to_string()],
            Self::Text(s) => s.lines().map(str::to_string).collect::<Vec<_>>().or_blank(),
            Self::List(items) => items
                .iter()
                .flat_map(InfoValue::render_lines)
                .collect::<Vec<_>>()
                .or_blank(),
            Self::Map(entries) => {
                let key_width = entries
                    .iter()
                    .map(|(k, _)| measure_text_width(k))
                    .max()
                    .unwrap_or(0);
                let mut lines = Vec::new();
                for (key, value) in entries {
                    for (i, line) in value.render_lines().into_iter().enumerate() {
                        let label = if i == 0 { key.as_str() } else { "" };
                        let label = pad_str(label, key_width, Alignment::Left, None);
                        lines.push(format!("{label}  {line}").trim_end().to_string());
                    }
                }
                lines.or_blank()
            }
        }
    }
}

trait OrBlank {
    fn or_blank(self) -> Self;
}

impl OrBlank for Vec<String> {
    fn or_blank(mut self) -> Self {
        if self.is_empty() {
            self.push(String::new());
        }
        self
    }
}

impl From<bool> for InfoValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for InfoValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for InfoValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for InfoValue {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

macro_rules! info_value_from_display {
    ($($t:ty),*) => {
        $(
            impl From<$t> for InfoValue {
                fn from(v: $t) -> Self {
                    Self::Text(v.to_string())
                }
            }
        )*
    };
}

info_value_from_display!(i32, i64, u32, u64, usize, f64, char);

impl<T: Into<InfoValue>> From<Vec<T>> for InfoValue {
    fn from(items: Vec<T>) -> Self {
        Self::list(items)
    }
}

impl<T: Into<InfoValue>, const N: usize> From<[T; N]> for InfoValue {
    fn from(items: [T; N]) -> Self {
        Self::list(items)
    }
}

impl<K: Into<String>, V: Into<InfoValue>> From<BTreeMap<K, V>> for InfoValue {
    fn from(entries: BTreeMap<K, V>) -> Self {
        Self::map(entries)
    }
}

impl From<serde_json::Value> for InfoValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Text(String::new()),
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Text(n.to_string()),
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::list(items),
            Value::Object(entries) => Self::map(entries),
        }
    }
}

/// Ordered label → value annotations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfoTable {
    rows: Vec<(String, InfoValue)>,
}

impl InfoTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<InfoValue>) {
        self.rows.push((name.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[(String, InfoValue)] {
        &self.rows
    }

    /// Render as a rounded box table, one row per label
    pub fn render(&self) -> String {
        let rendered: Vec<(&str, Vec<String>)> = self
            .rows
            .iter()
            .map(|(name, value)| (name.as_str(), value.render_lines()))
            .collect();

        let label_width = rendered
            .iter()
            .map(|(name, _)| measure_text_width(name))
            .max()
            .unwrap_or(0);
        let value_width = rendered
            .iter()
            .flat_map(|(_, lines)| lines.iter().map(|l| measure_text_width(l)))
            .max()
            .unwrap_or(0);

        let mut out = Vec::with_capacity(rendered.len() + 2);
        out.push(format!(
            "╭{}┬{}╮",
            "─".repeat(label_width + 2),
            "─".repeat(value_width + 2)
        ));
        for (name, lines) in &rendered {
            for (i, line) in lines.iter().enumerate() {
                let label = if i == 0 { *name } else { "" };
                out.push(format!(
                    "│ {} │ {} │",
                    pad_str(label, label_width, Alignment::Left, None),
                    pad_str(line, value_width, Alignment::Left, None)
                ));
            }
        }
        out.push(format!(
            "╰{}┴{}╯",
            "─".repeat(label_width + 2),
            "─".repeat(value_width + 2)
        ));
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_glyphs() {
        assert_eq!(InfoValue::from(true).render_lines(), vec!["✓"]);
        assert_eq!(InfoValue::from(false).render_lines(), vec!["-"]);
    }

    #[test]
    fn test_groups_render_each_element() {
        let mut table = InfoTable::new();
        table.add("Groups", ["a", "b"]);
        let text = table.render();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("Groups"));
        assert!(lines[1].contains(" a "));
        assert!(lines[2].contains(" b "));
        assert!(!lines[2].contains("Groups"));
    }

    #[test]
    fn test_sequence_with_mapping_element() {
        let mut table = InfoTable::new();
        table.add(
            "Groups",
            InfoValue::list([
                InfoValue::from("a"),
                InfoValue::map([("tester", "qa@example.com")]),
                InfoValue::from("b"),
            ]),
        );
        let text = table.render();
        assert!(text.contains("Groups"));
        assert!(text.contains(" a "));
        assert!(text.contains("tester  qa@example.com"));
        assert!(text.contains(" b "));
    }

    #[test]
    fn test_rows_are_aligned() {
        let mut table = InfoTable::new();
        table.add("Scheme", "Runner");
        table.add("Export", true);
        let text = table.render();
        let widths: Vec<usize> = text.lines().map(measure_text_width).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_nested_map_continuation_lines_are_indented() {
        let value = InfoValue::map([("ids", InfoValue::list(["1", "2"]))]);
        assert_eq!(value.render_lines(), vec!["ids  1", "     2"]);
    }

    #[test]
    fn test_from_json() {
        let value: InfoValue = serde_json::json!({"a": [1, true], "b": null}).into();
        let lines = value.render_lines();
        assert_eq!(lines, vec!["a  1", "   ✓", "b"]);
    }

    #[test]
    fn test_empty_values_render_blank_line() {
        assert_eq!(InfoValue::list(Vec::<String>::new()).render_lines(), vec![""]);
        assert_eq!(InfoValue::from("").render_lines(), vec![""]);
    }
}
