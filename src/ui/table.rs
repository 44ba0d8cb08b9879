use dioxus::prelude::{Key, *};
use serde_json::{json, Value};

use crate::state::data_model::{self, GridRows, RowId};
use crate::state::edit_session::EditSession;
use crate::state::error::AccessorError;
use crate::state::field::{CustomAccessor, Field};
use crate::state::session::EditSessionState;
use crate::ui::actions;

#[derive(Clone, Debug, PartialEq)]
pub struct GridColumn {
    pub title: &'static str,
    pub field: Field,
}

#[derive(Clone, PartialEq)]
struct EditingCell {
    row_id: RowId,
    column: usize,
    draft: String,
}

/// Columns of the roster view. `fullPhone` is assembled from `phone.area`
/// and `phone.number`.
pub fn roster_columns() -> Vec<GridColumn> {
    let mut columns = Vec::new();
    for (title, path) in [("Name", "name"), ("Grade", "grade"), ("Email", "contact.email")] {
        if let Ok(field) = Field::path(path) {
            columns.push(GridColumn { title, field });
        }
    }
    columns.push(GridColumn {
        title: "Phone",
        field: Field::Accessor(full_phone_accessor()),
    });
    columns
}

pub fn full_phone_accessor() -> CustomAccessor {
    CustomAccessor::new(
        "fullPhone",
        |row| {
            let area = row.get("phone").and_then(|p| p.get("area")).and_then(Value::as_str);
            let number = row.get("phone").and_then(|p| p.get("number")).and_then(Value::as_str);
            match (area, number) {
                (Some(area), Some(number)) => Ok(Value::String(format!("{area}{number}"))),
                _ => Ok(Value::Null),
            }
        },
        |row, value| {
            let digits = value
                .as_str()
                .ok_or_else(|| AccessorError::new("fullPhone", "expected a string"))?;
            if digits.len() < 3 || !digits.is_char_boundary(3) {
                return Err(AccessorError::new("fullPhone", "phone number too short"));
            }
            let (area, number) = digits.split_at(3);
            row.insert("phone".to_string(), json!({ "area": area, "number": number }));
            Ok(())
        },
    )
}

#[component]
pub fn Table(
    rows: Signal<GridRows>,
    session: Signal<EditSession>,
    error_message: Signal<Option<String>>,
) -> Element {
    let editing = use_signal::<Option<EditingCell>>(|| None);
    let columns = roster_columns();
    let locked = session.read().state() == EditSessionState::Saving;

    let grid = rows.read();
    let body: Vec<(RowId, Vec<(usize, Field, String)>)> = grid
        .rows()
        .iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let row_id = grid.row_id_at(index)?;
            let cells = columns
                .iter()
                .enumerate()
                .map(|(column_index, column)| {
                    let display = column
                        .field
                        .read(row)
                        .map(|value| data_model::display_value(&value))
                        .unwrap_or_default();
                    (column_index, column.field.clone(), display)
                })
                .collect();
            Some((row_id, cells))
        })
        .collect();
    drop(grid);

    if body.is_empty() {
        return rsx! {
            p { class: "empty-message", id: "empty-message", "No students loaded." }
        };
    }

    rsx! {
        div { class: "table-container", id: "table-container",
            table {
                thead {
                    tr {
                        for column in &columns {
                            th { "{column.title}" }
                        }
                    }
                }
                tbody {
                    for (row_id, cells) in body {
                        tr { key: "{row_id}",
                            for (column_index, field, display) in cells {
                                TableCell {
                                    rows,
                                    session,
                                    error_message,
                                    editing,
                                    row_id: row_id.clone(),
                                    column_index,
                                    field,
                                    display,
                                    locked,
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn TableCell(
    rows: Signal<GridRows>,
    session: Signal<EditSession>,
    error_message: Signal<Option<String>>,
    editing: Signal<Option<EditingCell>>,
    row_id: RowId,
    column_index: usize,
    field: Field,
    display: String,
    locked: bool,
) -> Element {
    let mut editing = editing;
    let is_editing = editing
        .read()
        .as_ref()
        .map(|cell| cell.row_id == row_id && cell.column == column_index)
        .unwrap_or(false);

    if is_editing {
        let draft = editing
            .read()
            .as_ref()
            .map(|cell| cell.draft.clone())
            .unwrap_or_default();
        let on_blur = {
            let row_id = row_id.clone();
            let field = field.clone();
            move |_: FocusEvent| {
                finish_edit(rows, session, error_message, editing, row_id.clone(), field.clone())
            }
        };
        let on_keydown = move |evt: KeyboardEvent| match evt.key() {
            Key::Enter => finish_edit(
                rows,
                session,
                error_message,
                editing,
                row_id.clone(),
                field.clone(),
            ),
            Key::Escape => editing.set(None),
            _ => {}
        };
        return rsx! {
            td { class: "editing-cell",
                input {
                    class: "cell-input",
                    value: "{draft}",
                    autofocus: true,
                    oninput: move |evt| {
                        let value = evt.value();
                        editing.with_mut(|cell| {
                            if let Some(cell) = cell {
                                cell.draft = value;
                            }
                        });
                    },
                    onblur: on_blur,
                    onkeydown: on_keydown,
                }
            }
        };
    }

    let edited = session.read().is_cell_edited(&row_id, &field.key());
    let class = if edited { "cell cell-edited" } else { "cell" };
    let seed = display.clone();
    rsx! {
        td {
            class: "{class}",
            onclick: move |_| {
                if locked {
                    return;
                }
                editing.set(Some(EditingCell {
                    row_id: row_id.clone(),
                    column: column_index,
                    draft: seed.clone(),
                }));
            },
            "{display}"
        }
    }
}

fn finish_edit(
    rows: Signal<GridRows>,
    session: Signal<EditSession>,
    error_message: Signal<Option<String>>,
    mut editing: Signal<Option<EditingCell>>,
    row_id: RowId,
    field: Field,
) {
    let draft = editing.read().as_ref().map(|cell| cell.draft.clone());
    editing.set(None);
    if let Some(draft) = draft {
        actions::commit_cell(rows, session, error_message, row_id, field, draft);
    }
}
