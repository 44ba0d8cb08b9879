use std::env;
use std::path::PathBuf;

use dioxus::prelude::*;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::io::draft_store::{DraftScope, DraftStore};
use crate::io::storage::{FileStorage, MemoryStorage};
use crate::io::{atomic_write_string, json_io};
use crate::state::config::EditConfig;
use crate::state::data_model::{self, GridRows, RowId, TableData};
use crate::state::diff::SessionDiff;
use crate::state::edit_session::{EditSession, SaveOutcome};
use crate::state::field::Field;
use crate::ui::table;

pub const VIEW_PATH: &str = "/students/roster";

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("could not write bulk save: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode bulk save: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Builds the session for the roster view. Drafts go to `BULKEDIT_DRAFT_DIR`
/// when it is set and usable, otherwise they only live for this process.
pub fn open_session(config: &EditConfig) -> EditSession {
    let user = env::var("BULKEDIT_USER").unwrap_or_else(|_| "local".to_string());
    let scope = DraftScope::new(user, VIEW_PATH);

    let store = match env::var("BULKEDIT_DRAFT_DIR").map(FileStorage::open) {
        Ok(Ok(storage)) => DraftStore::new(storage),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "draft directory unusable, keeping drafts in memory");
            DraftStore::new(MemoryStorage::new())
        }
        Err(_) => DraftStore::new(MemoryStorage::new()),
    };

    let mut session = EditSession::open(config, store, scope);
    for column in table::roster_columns() {
        if let Field::Accessor(accessor) = column.field {
            session.register_accessor(accessor);
        }
    }
    session.on_discard(|count| info!(count, "roster edits discarded"));
    session
}

/// Loads the roster from `BULKEDIT_OPEN`, falling back to a built-in sample.
pub fn load_roster() -> Result<TableData, json_io::JsonIoError> {
    match env::var("BULKEDIT_OPEN") {
        Ok(path) => json_io::load_rows(&PathBuf::from(path)),
        Err(_) => json_io::parse_rows(SAMPLE_ROSTER),
    }
}

/// Replaces the grid's data and re-applies pending edits on top of it.
pub fn refresh_rows(
    mut rows: Signal<GridRows>,
    mut session: Signal<EditSession>,
    mut error_message: Signal<Option<String>>,
) {
    match load_roster() {
        Ok(data) => {
            rows.with_mut(|grid| {
                grid.replace_rows(data);
                session.with_mut(|session| session.on_data_loaded(grid));
            });
            error_message.set(None);
        }
        Err(err) => error_message.set(Some(err.to_string())),
    }
}

/// Writes one edited cell into the grid and records it in the session. A
/// rejected edit leaves the row untouched.
pub fn commit_cell(
    mut rows: Signal<GridRows>,
    mut session: Signal<EditSession>,
    mut error_message: Signal<Option<String>>,
    row_id: RowId,
    field: Field,
    input: String,
) {
    let new_value = match &field {
        Field::Accessor(_) => Value::String(input),
        Field::Path(_) => data_model::parse_cell_input(&input),
    };

    let recorded = rows.with_mut(|grid| {
        session.with_mut(|session| session.apply_edit(grid, row_id, field, new_value))
    });
    match recorded {
        Ok(_) => error_message.set(None),
        Err(err) => error_message.set(Some(err.to_string())),
    }
}

/// Submits the staged diff and keeps the save bar ticking until the status
/// message lapses.
pub async fn save_edits(
    mut session: Signal<EditSession>,
    mut status_tick: Signal<u64>,
    mut error_message: Signal<Option<String>>,
) {
    let Some(diff) = session.with_mut(|session| session.begin_save()) else {
        return;
    };
    let result = submit_bulk(diff).await;
    let outcome = session.with_mut(|session| session.finish_save(result));
    if let SaveOutcome::Failed { message } = outcome {
        error_message.set(Some(message));
    } else {
        error_message.set(None);
    }

    let deadline = session.read().display_deadline();
    if let Some(deadline) = deadline {
        tokio::time::sleep_until(deadline).await;
        status_tick += 1;
    }
}

pub fn cancel_edits(
    mut rows: Signal<GridRows>,
    mut session: Signal<EditSession>,
    mut error_message: Signal<Option<String>>,
) {
    rows.with_mut(|grid| {
        session.with_mut(|session| session.cancel(grid));
    });
    error_message.set(None);
}

/// The demo's bulk-save endpoint: the diff is written to `BULKEDIT_OUTBOX`
/// when set, otherwise only logged.
async fn submit_bulk(diff: SessionDiff) -> Result<(), CommitError> {
    let payload = serde_json::to_string_pretty(&diff)?;
    match env::var("BULKEDIT_OUTBOX") {
        Ok(path) => atomic_write_string(&PathBuf::from(path), &payload)?,
        Err(_) => info!(edits = diff.edit_count(), "bulk save submitted"),
    }
    Ok(())
}

const SAMPLE_ROSTER: &str = r#"[
  { "id": 1, "name": "Ada Byron", "grade": 7, "contact": { "email": "ada@example.org" }, "phone": { "area": "555", "number": "1234567" } },
  { "id": 2, "name": "Alan Turing", "grade": 8, "contact": { "email": "alan@example.org" }, "phone": { "area": "555", "number": "7654321" } },
  { "id": 3, "name": "Grace Hopper", "grade": 7, "contact": { "email": "grace@example.org" }, "phone": { "area": "555", "number": "1112222" } }
]"#;
