use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::state::data_model::RowId;

/// One tracked cell. `original_value` is pinned to the first value seen in
/// this session and never moves on later edits of the same cell. `None`
/// means the field did not exist; it is omitted from the serialized form,
/// while an explicit `null` original is kept.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellEdit {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_value"
    )]
    pub original_value: Option<Value>,
    pub new_value: Value,
}

impl CellEdit {
    pub fn is_noop(&self) -> bool {
        self.original_value.as_ref() == Some(&self.new_value)
    }
}

fn present_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Field key to edit for one row, in order of first edit.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowDiff(IndexMap<String, CellEdit>);

impl RowDiff {
    pub fn get(&self, field: &str) -> Option<&CellEdit> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellEdit)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// What a single `record` call did to the diff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffChange {
    Unchanged,
    Created,
    Updated,
    Reverted,
}

impl DiffChange {
    pub fn is_mutation(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// All unsaved edits of the session. Rows with no entries are never kept.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionDiff(BTreeMap<RowId, RowDiff>);

impl SessionDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one resolved old/new pair for `(row_id, field)`.
    pub fn record(
        &mut self,
        row_id: &RowId,
        field: &str,
        old: Option<Value>,
        new: Value,
    ) -> DiffChange {
        if let Some(row) = self.0.get_mut(row_id) {
            if let Some(edit) = row.0.get_mut(field) {
                if edit.new_value == new {
                    return DiffChange::Unchanged;
                }
                if edit.original_value.as_ref() == Some(&new) {
                    row.0.shift_remove(field);
                    if row.0.is_empty() {
                        self.0.remove(row_id);
                    }
                    return DiffChange::Reverted;
                }
                edit.new_value = new;
                return DiffChange::Updated;
            }
        }

        if old.as_ref() == Some(&new) {
            return DiffChange::Unchanged;
        }
        self.0.entry(row_id.clone()).or_default().0.insert(
            field.to_string(),
            CellEdit {
                original_value: old,
                new_value: new,
            },
        );
        DiffChange::Created
    }

    pub fn get(&self, row_id: &RowId, field: &str) -> Option<&CellEdit> {
        self.0.get(row_id).and_then(|row| row.get(field))
    }

    pub fn row(&self, row_id: &RowId) -> Option<&RowDiff> {
        self.0.get(row_id)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&RowId, &RowDiff)> {
        self.0.iter()
    }

    pub fn row_ids(&self) -> Vec<RowId> {
        self.0.keys().cloned().collect()
    }

    /// Total number of tracked cells, always computed from the entries.
    pub fn edit_count(&self) -> usize {
        self.0.values().map(RowDiff::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Drops no-op entries and empty rows, e.g. after reading a draft written
    /// by another process.
    pub fn normalize(&mut self) {
        for row in self.0.values_mut() {
            row.0.retain(|_, edit| !edit.is_noop());
        }
        self.0.retain(|_, row| !row.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn noop_record_creates_nothing() {
        let mut diff = SessionDiff::new();
        let change = diff.record(&RowId::from("1"), "name", Some(json!("a")), json!("a"));
        assert_eq!(change, DiffChange::Unchanged);
        assert!(diff.is_empty());
    }

    #[test]
    fn revert_prunes_row() {
        let mut diff = SessionDiff::new();
        let id = RowId::from("1");
        diff.record(&id, "name", Some(json!("a")), json!("b"));
        assert_eq!(diff.edit_count(), 1);
        assert_eq!(diff.record(&id, "name", Some(json!("b")), json!("a")), DiffChange::Reverted);
        assert!(diff.row(&id).is_none());
        assert_eq!(diff.edit_count(), 0);
    }

    #[test]
    fn serializes_as_nested_maps() {
        let mut diff = SessionDiff::new();
        diff.record(&RowId::from("7"), "grade", Some(json!(1)), json!(2));
        let value = serde_json::to_value(&diff).unwrap();
        assert_eq!(
            value,
            json!({ "7": { "grade": { "originalValue": 1, "newValue": 2 } } })
        );
    }

    #[test]
    fn absent_original_is_omitted_and_null_is_kept() {
        let mut diff = SessionDiff::new();
        diff.record(&RowId::from("1"), "nickname", None, json!("x"));
        diff.record(&RowId::from("1"), "notes", Some(Value::Null), json!("y"));

        let value = serde_json::to_value(&diff).unwrap();
        assert_eq!(
            value,
            json!({ "1": {
                "nickname": { "newValue": "x" },
                "notes": { "originalValue": null, "newValue": "y" }
            } })
        );
        let back: SessionDiff = serde_json::from_value(value).unwrap();
        assert_eq!(back, diff);
        assert_eq!(back.get(&RowId::from("1"), "nickname").unwrap().original_value, None);
    }

    #[test]
    fn absent_original_never_matches_null() {
        let mut diff = SessionDiff::new();
        let change = diff.record(&RowId::from("1"), "nickname", None, Value::Null);
        assert_eq!(change, DiffChange::Created);
        assert_eq!(diff.edit_count(), 1);
    }

    #[test]
    fn normalize_drops_noops_and_empty_rows() {
        let mut diff: SessionDiff = serde_json::from_value(json!({
            "1": { "a": { "originalValue": 1, "newValue": 1 } },
            "2": { "b": { "originalValue": 1, "newValue": 3 } }
        }))
        .unwrap();
        diff.normalize();
        assert_eq!(diff.edit_count(), 1);
        assert!(diff.row(&RowId::from("1")).is_none());
    }
}
