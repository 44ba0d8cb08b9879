use dioxus::prelude::*;

use crate::state::data_model::GridRows;
use crate::state::edit_session::EditSession;
use crate::state::session::EditSessionState;
use crate::ui::actions;

#[component]
pub fn SaveBar(
    rows: Signal<GridRows>,
    session: Signal<EditSession>,
    status_tick: Signal<u64>,
    error_message: Signal<Option<String>>,
) -> Element {
    // Re-render when a transient status lapses.
    let _ = status_tick.read();

    let (state, edit_count) = {
        let session = session.read();
        (session.state(), session.edit_count())
    };
    let busy = state == EditSessionState::Saving;
    let error_text = error_message.read().clone();

    let status = match state {
        EditSessionState::Idle => String::new(),
        EditSessionState::Editing if edit_count == 1 => "1 unsaved change".to_string(),
        EditSessionState::Editing => format!("{edit_count} unsaved changes"),
        EditSessionState::Saving => "Saving\u{2026}".to_string(),
        EditSessionState::Saved => "\u{2714} Saved".to_string(),
        EditSessionState::Error => format!("Save failed, {edit_count} changes kept"),
    };

    rsx! {
        div { class: "save-bar save-bar-{state}", id: "save-bar",
            span { class: "save-status", id: "save-status", "{status}" }
            button {
                class: "toolbar-btn",
                id: "btn-save",
                disabled: busy || edit_count == 0,
                onclick: move |_| {
                    spawn(async move {
                        actions::save_edits(session, status_tick, error_message).await;
                    });
                },
                "\u{1F4BE} Save"
            }
            button {
                class: "toolbar-btn",
                id: "btn-cancel",
                disabled: busy || edit_count == 0,
                onclick: move |_| actions::cancel_edits(rows, session, error_message),
                "\u{21A9} Cancel"
            }
            if let Some(message) = error_text {
                span { class: "error-message", "{message}" }
            }
        }
    }
}
