use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::io::draft_store::{DraftScope, DraftStore};
use crate::state::data_model::{Row, RowId, RowSource};
use crate::state::diff::{CellEdit, DiffChange, SessionDiff};
use crate::state::error::{AccessorError, EditError};
use crate::state::field::{CellChange, CustomAccessor, Field, FieldPath, ACCESSOR_KEY_PREFIX};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchDirection {
    ToNew,
    ToOriginal,
}

/// A single field write against a live row. A `None` value removes the field.
#[derive(Clone, Debug, PartialEq)]
pub struct RowPatch {
    pub row_id: RowId,
    pub field: Field,
    pub value: Option<Value>,
}

impl RowPatch {
    pub fn apply(&self, row: &mut Row) -> Result<(), AccessorError> {
        self.field.assign(row, self.value.as_ref())
    }
}

struct DraftBinding {
    store: DraftStore,
    scope: DraftScope,
    ttl: Duration,
}

/// Owns the session diff. Every mutation is mirrored to the draft store when
/// one is attached; persistence problems are logged and otherwise ignored.
pub struct DiffEngine {
    diff: SessionDiff,
    accessors: HashMap<String, CustomAccessor>,
    drafts: Option<DraftBinding>,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffEngine {
    pub fn new() -> Self {
        Self {
            diff: SessionDiff::new(),
            accessors: HashMap::new(),
            drafts: None,
        }
    }

    /// Attaches draft persistence and resumes any unexpired draft for `scope`.
    pub fn with_drafts(mut store: DraftStore, scope: DraftScope, ttl: Duration) -> Self {
        let diff = match store.get(&scope) {
            Ok(Some(diff)) => {
                debug!(key = %scope.key(), edits = diff.edit_count(), "resumed draft");
                diff
            }
            Ok(None) => SessionDiff::new(),
            Err(err) => {
                warn!(key = %scope.key(), error = %err, "draft unavailable, editing without persistence");
                SessionDiff::new()
            }
        };
        Self {
            diff,
            accessors: HashMap::new(),
            drafts: Some(DraftBinding { store, scope, ttl }),
        }
    }

    /// Makes a virtual field known ahead of any edit, so entries resumed from
    /// a draft are written back through its setter. Entries of virtual fields
    /// that were never registered are left out of `materialize`.
    pub fn register_accessor(&mut self, accessor: CustomAccessor) {
        self.accessors.insert(accessor.name().to_string(), accessor);
    }

    pub fn diff(&self) -> &SessionDiff {
        &self.diff
    }

    pub fn edit_count(&self) -> usize {
        self.diff.edit_count()
    }

    pub fn cell_edit(&self, row_id: &RowId, field: &str) -> Option<&CellEdit> {
        self.diff.get(row_id, field)
    }

    pub fn is_cell_edited(&self, row_id: &RowId, field: &str) -> bool {
        self.cell_edit(row_id, field).is_some()
    }

    pub fn edited_row_ids(&self) -> Vec<RowId> {
        self.diff.row_ids()
    }

    /// Folds one cell change into the diff.
    ///
    /// `current_row` is the live row after the grid applied the change. It is
    /// only consulted for accessor fields, whose prior value is rebuilt on a
    /// scratch copy of the row by writing the old value through the setter and
    /// reading it back through the getter. If the accessor fails the diff is
    /// left exactly as it was.
    pub fn record_change(
        &mut self,
        change: CellChange,
        current_row: Option<&Row>,
    ) -> Result<DiffChange, EditError> {
        let CellChange {
            row_id,
            field,
            new_value,
            old_value,
        } = change;
        let key = field.key();

        let (old, new) = match &field {
            Field::Path(_) => (old_value, new_value),
            Field::Accessor(accessor) => {
                let row = current_row.ok_or_else(|| EditError::RowNotFound(row_id.clone()))?;
                let old = resolve_through(accessor, row, &old_value.unwrap_or(Value::Null))?;
                let new = resolve_through(accessor, row, &new_value)?;
                (Some(old), new)
            }
        };

        if let Field::Accessor(accessor) = field {
            self.accessors
                .entry(accessor.name().to_string())
                .or_insert(accessor);
        }

        let outcome = self.diff.record(&row_id, &key, old, new);
        trace!(row = %row_id, field = %key, ?outcome, "recorded cell change");
        if outcome.is_mutation() {
            self.persist();
        }
        Ok(outcome)
    }

    /// Builds the writes that move every edited cell to its new or original
    /// value. Within a row, patches follow the order fields were first edited.
    pub fn materialize(&self, direction: PatchDirection) -> Vec<RowPatch> {
        let mut patches = Vec::with_capacity(self.diff.edit_count());
        for (row_id, row_diff) in self.diff.rows() {
            for (key, edit) in row_diff.iter() {
                let Some(field) = self.field_for_key(key) else {
                    warn!(row = %row_id, field = key, "skipping edit with no registered accessor or invalid path");
                    continue;
                };
                let value = match direction {
                    PatchDirection::ToNew => Some(edit.new_value.clone()),
                    PatchDirection::ToOriginal => edit.original_value.clone(),
                };
                patches.push(RowPatch {
                    row_id: row_id.clone(),
                    field,
                    value,
                });
            }
        }
        patches
    }

    /// Empties the diff and drops the persisted draft.
    pub fn clear(&mut self) {
        self.diff.clear();
        self.persist();
    }

    fn field_for_key(&self, key: &str) -> Option<Field> {
        match key.strip_prefix(ACCESSOR_KEY_PREFIX) {
            Some(name) => self.accessors.get(name).cloned().map(Field::Accessor),
            None => FieldPath::parse(key).ok().map(Field::Path),
        }
    }

    fn persist(&mut self) {
        let Some(binding) = self.drafts.as_mut() else {
            return;
        };
        if let Err(err) = binding.store.set(&binding.scope, &self.diff, binding.ttl) {
            warn!(key = %binding.scope.key(), error = %err, "failed to persist draft");
        }
    }
}

fn resolve_through(
    accessor: &CustomAccessor,
    row: &Row,
    value: &Value,
) -> Result<Value, AccessorError> {
    let mut scratch = row.clone();
    accessor.set(&mut scratch, value)?;
    accessor.get(&scratch)
}

/// Writes `patches` into `rows` and triggers one redraw of every row touched.
/// Patches for rows the source no longer holds are skipped. Returns the ids
/// of the rows that were written.
pub fn apply_patches(rows: &mut dyn RowSource, patches: &[RowPatch]) -> Vec<RowId> {
    let mut touched: Vec<RowId> = Vec::new();
    for patch in patches {
        let Some(row) = rows.row_mut(&patch.row_id) else {
            debug!(row = %patch.row_id, "patch target not loaded");
            continue;
        };
        match patch.apply(row) {
            Ok(()) => {
                if !touched.contains(&patch.row_id) {
                    touched.push(patch.row_id.clone());
                }
            }
            Err(err) => {
                warn!(row = %patch.row_id, error = %err, "failed to apply patch");
            }
        }
    }
    if !touched.is_empty() {
        rows.refresh_rows(&touched);
    }
    touched
}
