use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Row = BTreeMap<String, Value>;
pub type TableData = Vec<Row>;

/// Stable, caller-supplied identifier of a row within one view.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives an id from a row's key column. Numbers and strings are accepted.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RowId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Live row data owned by the grid layer. The edit engine only ever looks rows
/// up by id, overwrites fields in place and asks for changed rows to be redrawn.
pub trait RowSource {
    fn row(&self, id: &RowId) -> Option<&Row>;

    fn row_mut(&mut self, id: &RowId) -> Option<&mut Row>;

    /// Called once after a batch of patches has been written to `ids`.
    fn refresh_rows(&mut self, ids: &[RowId]);
}

/// A plain in-memory row source keyed by one column of each row. Ids are
/// indexed when rows are loaded; the first row wins on duplicate ids.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct GridRows {
    key_column: String,
    rows: TableData,
    index: HashMap<RowId, usize>,
    dirty: Vec<RowId>,
}

impl GridRows {
    pub fn new(key_column: impl Into<String>, rows: TableData) -> Self {
        let mut grid = Self {
            key_column: key_column.into(),
            rows: Vec::new(),
            index: HashMap::new(),
            dirty: Vec::new(),
        };
        grid.replace_rows(rows);
        grid
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    pub fn rows(&self) -> &TableData {
        &self.rows
    }

    /// Swaps in a freshly fetched data set. Pending edits are not touched here;
    /// the edit session re-applies them on top.
    pub fn replace_rows(&mut self, rows: TableData) {
        self.index.clear();
        for (idx, row) in rows.iter().enumerate() {
            if let Some(id) = row.get(&self.key_column).and_then(RowId::from_value) {
                self.index.entry(id).or_insert(idx);
            }
        }
        self.rows = rows;
        self.dirty.clear();
    }

    pub fn row_id_at(&self, index: usize) -> Option<RowId> {
        self.rows
            .get(index)
            .and_then(|row| row.get(&self.key_column))
            .and_then(RowId::from_value)
    }

    /// Ids passed to the most recent `refresh_rows` calls, drained on read.
    pub fn take_dirty(&mut self) -> Vec<RowId> {
        std::mem::take(&mut self.dirty)
    }

    fn index_of(&self, id: &RowId) -> Option<usize> {
        self.index.get(id).copied()
    }
}

impl RowSource for GridRows {
    fn row(&self, id: &RowId) -> Option<&Row> {
        self.index_of(id).and_then(|idx| self.rows.get(idx))
    }

    fn row_mut(&mut self, id: &RowId) -> Option<&mut Row> {
        let idx = self.index_of(id)?;
        self.rows.get_mut(idx)
    }

    fn refresh_rows(&mut self, ids: &[RowId]) {
        for id in ids {
            if !self.dirty.contains(id) {
                self.dirty.push(id.clone());
            }
        }
    }
}

/// Formats a JSON value for display in a table cell.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Parses raw cell input: JSON literals where they parse, plain strings otherwise.
pub fn parse_cell_input(input: &str) -> Value {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value @ (Value::Number(_) | Value::Bool(_) | Value::Null)) => value,
        _ => Value::String(input.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;

    fn student(id: i64, name: &str) -> Row {
        BTreeMap::from([
            ("id".to_string(), json!(id)),
            ("name".to_string(), json!(name)),
        ])
    }

    #[test]
    fn test_lookup_follows_reloaded_rows() {
        let mut grid = GridRows::new("id", vec![student(1, "Ada"), student(2, "Alan")]);
        assert_eq!(grid.row(&RowId::from("2")).unwrap()["name"], json!("Alan"));

        grid.replace_rows(vec![student(2, "Alan"), student(3, "Grace")]);
        assert!(grid.row(&RowId::from("1")).is_none());
        assert_eq!(grid.row(&RowId::from("2")), Some(&grid.rows()[0]));
        grid.row_mut(&RowId::from("3"))
            .unwrap()
            .insert("name".to_string(), json!("Grace H."));
        assert_eq!(grid.rows()[1]["name"], json!("Grace H."));
    }

    #[test]
    fn test_duplicate_ids_resolve_to_first_row() {
        let grid = GridRows::new("id", vec![student(1, "first"), student(1, "second")]);
        assert_eq!(grid.row(&RowId::from("1")).unwrap()["name"], json!("first"));
    }

    #[test]
    fn test_rows_without_key_are_not_addressable() {
        let mut keyless = student(1, "Ada");
        keyless.remove("id");
        let grid = GridRows::new("id", vec![keyless]);
        assert!(grid.row_id_at(0).is_none());
        assert!(grid.row(&RowId::from("1")).is_none());
    }

    #[test]
    fn test_parse_cell_input_keeps_text_verbatim() {
        assert_eq!(parse_cell_input(" 42 "), json!(42));
        assert_eq!(parse_cell_input(""), Value::Null);
        assert_eq!(parse_cell_input("Ada"), json!("Ada"));
    }
}
