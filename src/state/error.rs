use thiserror::Error;

use crate::state::data_model::RowId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldPathError {
    #[error("field path is empty")]
    Empty,
    #[error("field path `{0}` has an empty segment")]
    EmptySegment(String),
    #[error("field path `{0}` uses the reserved accessor prefix")]
    Reserved(String),
}

/// Raised by a custom accessor's getter or setter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("accessor `{field}` failed: {reason}")]
pub struct AccessorError {
    pub field: String,
    pub reason: String,
}

impl AccessorError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error(transparent)]
    InvalidPath(#[from] FieldPathError),
    #[error(transparent)]
    Accessor(#[from] AccessorError),
    #[error("row `{0}` not found")]
    RowNotFound(RowId),
    #[error("a save is in progress; edits are locked until it settles")]
    SaveInProgress,
}
