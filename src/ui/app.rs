use dioxus::prelude::*;

use crate::state::config::EditConfig;
use crate::state::data_model::GridRows;
use crate::ui::actions;
use crate::ui::save_bar::SaveBar;
use crate::ui::table::Table;

const STYLES: Asset = asset!("/assets/styles.css");

#[component]
pub fn App() -> Element {
    let rows = use_signal(|| GridRows::new("id", Vec::new()));
    let session = use_signal(|| actions::open_session(&EditConfig::default()));
    let status_tick = use_signal(|| 0u64);
    let error_message = use_signal::<Option<String>>(|| None);

    use_effect(move || actions::refresh_rows(rows, session, error_message));

    rsx! {
        document::Stylesheet { href: STYLES }
        div { class: "app",
            div { class: "toolbar",
                button {
                    class: "toolbar-btn",
                    id: "btn-reload",
                    onclick: move |_| actions::refresh_rows(rows, session, error_message),
                    "\u{21BB} Reload"
                }
                SaveBar { rows, session, status_tick, error_message }
            }
            Table { rows, session, error_message }
        }
    }
}
