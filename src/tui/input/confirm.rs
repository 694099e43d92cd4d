use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::info;

use crate::tui::app::{App, DeleteTarget};
use crate::tui::mode::Mode;

use super::*;

/// y / n / Esc; anything else leaves the question open.
fn answer(key: KeyEvent) -> Option<bool> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return None;
    }
    match key.code {
        KeyCode::Char('y' | 'Y') => Some(true),
        KeyCode::Char('n' | 'N') | KeyCode::Esc => Some(false),
        _ => None,
    }
}

pub fn handle_delete_task_confirm(app: &mut App, key: KeyEvent) {
    let Some(confirmed) = answer(key) else {
        return;
    };
    let target = app.pending_delete.take();
    app.mode = Mode::Normal;
    let Some(DeleteTarget::Task { id, title }) = target else {
        return;
    };
    if !confirmed {
        return;
    }

    let ctx = app.ctx();
    match app.store().delete_task(&ctx, id) {
        Ok(()) => {
            info!(task = id, "task deleted");
            if app.board.is_filtered() {
                app.reload_tasks();
            } else {
                app.board.remove_task(id);
            }
            app.selection.task = 0;
            app.notices.info(format!("Deleted \"{title}\""));
        }
        Err(err) => app.report("Failed to delete task", err),
    }
}

pub fn handle_delete_column_confirm(app: &mut App, key: KeyEvent) {
    let Some(confirmed) = answer(key) else {
        return;
    };
    let target = app.pending_delete.take();
    app.mode = Mode::Normal;
    let Some(DeleteTarget::Column { id, name }) = target else {
        return;
    };
    if !confirmed {
        return;
    }

    let ctx = app.ctx();
    match app.store().delete_column(&ctx, id) {
        Ok(()) => {
            info!(column = id, "column deleted");
            if app.reload_board() {
                let len = app.board.columns.len();
                app.selection.after_structural_change(len);
                app.clamp_selection();
            }
            app.notices.info(format!("Deleted column \"{name}\""));
        }
        Err(err) => app.report("Failed to delete column", err),
    }
}

/// The discard question is consumed exactly once: yes drops the session,
/// no goes back to editing it.
pub fn handle_discard_confirm(app: &mut App, key: KeyEvent) {
    let Some(confirmed) = answer(key) else {
        return;
    };
    let Some(discard) = app.discard.take() else {
        app.mode = Mode::Normal;
        return;
    };
    if confirmed {
        clear_session(app, discard.source_mode);
    } else {
        app.mode = discard.source_mode;
    }
}
