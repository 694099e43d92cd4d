use crossterm::event::{KeyCode, KeyEvent};
use tracing::debug;

use crate::tui::app::App;
use crate::tui::mode::Mode;

/// Typing a query. Enter applies it as the board filter; Esc keeps the
/// previous filter.
pub fn handle_search(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.search_input.clear();
            app.mode = Mode::Normal;
        }
        KeyCode::Enter => {
            let query = app.search_input.value().trim().to_string();
            app.search_input.clear();
            app.mode = Mode::Normal;
            app.board.search = if query.is_empty() { None } else { Some(query) };
            debug!(search = ?app.board.search, "search applied");
            if app.reload_tasks() {
                app.selection.task = 0;
                app.clamp_selection();
                if let Some(query) = &app.board.search {
                    let hits: usize = app.board.tasks.values().map(Vec::len).sum();
                    let message = format!("{hits} match(es) for \"{query}\"");
                    app.notices.info(message);
                }
            }
        }
        _ => {
            app.search_input.handle_key(key);
        }
    }
}
