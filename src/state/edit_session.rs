use std::fmt::Display;
use std::future::Future;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::io::draft_store::{DraftScope, DraftStore};
use crate::state::config::EditConfig;
use crate::state::data_model::{RowId, RowSource};
use crate::state::diff::{CellEdit, DiffChange, SessionDiff};
use crate::state::diff_engine::{apply_patches, DiffEngine, PatchDirection};
use crate::state::error::EditError;
use crate::state::field::{CellChange, CustomAccessor, Field};
use crate::state::session::{EditSessionState, SessionStateMachine};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing to commit, or a save was already in flight.
    Skipped,
    Saved { edits: usize },
    Failed { message: String },
}

/// The bulk-edit session behind one grid view: collects cell changes, exposes
/// the count and state the save bar shows, and runs the save/cancel protocol.
pub struct EditSession {
    engine: DiffEngine,
    machine: SessionStateMachine,
    last_error: Option<String>,
    on_discard: Option<Box<dyn FnMut(usize)>>,
}

impl EditSession {
    /// A session whose edits live in memory only.
    pub fn new(config: &EditConfig) -> Self {
        Self::from_engine(DiffEngine::new(), config)
    }

    /// A session backed by a draft store, resuming any unexpired draft.
    pub fn open(config: &EditConfig, store: DraftStore, scope: DraftScope) -> Self {
        Self::from_engine(DiffEngine::with_drafts(store, scope, config.draft_ttl), config)
    }

    fn from_engine(engine: DiffEngine, config: &EditConfig) -> Self {
        Self {
            engine,
            machine: SessionStateMachine::new(config.status_display),
            last_error: None,
            on_discard: None,
        }
    }

    pub fn register_accessor(&mut self, accessor: CustomAccessor) {
        self.engine.register_accessor(accessor);
    }

    /// Called with the number of edits thrown away by `cancel`.
    pub fn on_discard(&mut self, callback: impl FnMut(usize) + 'static) {
        self.on_discard = Some(Box::new(callback));
    }

    pub fn state(&self) -> EditSessionState {
        self.machine.state(self.engine.edit_count())
    }

    pub fn edit_count(&self) -> usize {
        self.engine.edit_count()
    }

    pub fn diff(&self) -> &SessionDiff {
        self.engine.diff()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn display_deadline(&self) -> Option<Instant> {
        self.machine.display_deadline()
    }

    pub fn cell_edit(&self, row_id: &RowId, field: &str) -> Option<&CellEdit> {
        self.engine.cell_edit(row_id, field)
    }

    pub fn is_cell_edited(&self, row_id: &RowId, field: &str) -> bool {
        self.engine.is_cell_edited(row_id, field)
    }

    pub fn edited_row_ids(&self) -> Vec<RowId> {
        self.engine.edited_row_ids()
    }

    /// Records a change the grid has already applied to `rows`. Rejected while
    /// a save is in flight.
    pub fn record_change(
        &mut self,
        change: CellChange,
        rows: &dyn RowSource,
    ) -> Result<DiffChange, EditError> {
        if self.machine.is_saving() {
            return Err(EditError::SaveInProgress);
        }
        let row = rows.row(&change.row_id);
        let outcome = self.engine.record_change(change, row)?;
        if outcome.is_mutation() {
            self.machine.rest();
        }
        Ok(outcome)
    }

    /// Writes `new_value` into the live row and records it, as one step. When
    /// the write or the record is rejected the row is put back exactly as it
    /// was, so the grid never shows a value the diff does not track.
    pub fn apply_edit(
        &mut self,
        rows: &mut dyn RowSource,
        row_id: RowId,
        field: Field,
        new_value: Value,
    ) -> Result<DiffChange, EditError> {
        if self.machine.is_saving() {
            return Err(EditError::SaveInProgress);
        }
        let row = rows
            .row_mut(&row_id)
            .ok_or_else(|| EditError::RowNotFound(row_id.clone()))?;
        let snapshot = row.clone();
        let old_value = field.lookup(row)?;
        if let Err(err) = field.write(row, &new_value) {
            *row = snapshot;
            return Err(err.into());
        }

        let change = CellChange::new(row_id.clone(), field, new_value, old_value);
        match self.record_change(change, &*rows) {
            Ok(outcome) => {
                rows.refresh_rows(std::slice::from_ref(&row_id));
                Ok(outcome)
            }
            Err(err) => {
                if let Some(row) = rows.row_mut(&row_id) {
                    *row = snapshot;
                }
                Err(err)
            }
        }
    }

    /// Enters `Saving` and hands out the diff to submit. Returns `None` when
    /// there is nothing to save or a save is already running.
    pub fn begin_save(&mut self) -> Option<SessionDiff> {
        if self.engine.edit_count() == 0 {
            debug!("save requested with no pending edits");
            return None;
        }
        if !self.machine.begin_save() {
            return None;
        }
        Some(self.engine.diff().clone())
    }

    /// Settles a save started with `begin_save`. Success clears the diff;
    /// failure keeps it staged for a retry.
    pub fn finish_save<E: Display>(&mut self, result: Result<(), E>) -> SaveOutcome {
        if !self.machine.is_saving() {
            return SaveOutcome::Skipped;
        }
        match result {
            Ok(()) => {
                let edits = self.engine.edit_count();
                self.machine.succeed();
                self.engine.clear();
                self.last_error = None;
                info!(edits, "bulk save committed");
                SaveOutcome::Saved { edits }
            }
            Err(err) => {
                let message = err.to_string();
                self.machine.fail();
                error!(error = %message, edits = self.engine.edit_count(), "bulk save failed");
                self.last_error = Some(message.clone());
                SaveOutcome::Failed { message }
            }
        }
    }

    /// Submits every pending edit in one call to `commit` and settles the
    /// session on its result. Dropping the returned future before it settles
    /// counts as a failed save: edits stay staged and the lock is released.
    pub async fn save<F, Fut, E>(&mut self, commit: F) -> SaveOutcome
    where
        F: FnOnce(SessionDiff) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        let Some(diff) = self.begin_save() else {
            return SaveOutcome::Skipped;
        };
        let mut guard = InFlightSave(self);
        let result = commit(diff).await;
        guard.0.finish_save(result)
    }

    /// Snaps every edited cell back to its original value, redraws those rows
    /// and drops the diff. Ignored while a save is in flight.
    pub fn cancel(&mut self, rows: &mut dyn RowSource) -> bool {
        if self.machine.is_saving() {
            return false;
        }
        let patches = self.engine.materialize(PatchDirection::ToOriginal);
        apply_patches(rows, &patches);

        let discarded = self.engine.edit_count();
        self.engine.clear();
        self.machine.rest();
        self.last_error = None;
        if discarded > 0 {
            debug!(discarded, "edits discarded");
            if let Some(callback) = self.on_discard.as_mut() {
                callback(discarded);
            }
        }
        true
    }

    /// Lays pending edits over a freshly loaded data set so staged values stay
    /// visible until they are saved or cancelled.
    pub fn on_data_loaded(&mut self, rows: &mut dyn RowSource) -> Vec<RowId> {
        let patches = self.engine.materialize(PatchDirection::ToNew);
        apply_patches(rows, &patches)
    }
}

/// Settles a save whose future was dropped mid-flight.
struct InFlightSave<'a>(&'a mut EditSession);

impl Drop for InFlightSave<'_> {
    fn drop(&mut self) {
        if self.0.machine.is_saving() {
            self.0
                .finish_save(Err::<(), _>("save abandoned before it settled"));
        }
    }
}
