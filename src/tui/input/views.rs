use crossterm::event::{KeyCode, KeyEvent};

use crate::model::TaskId;
use crate::tui::app::{App, TaskView};
use crate::tui::keymap::{Action, Scope};
use crate::tui::mode::Mode;

use super::*;

pub fn open_task_view(app: &mut App, id: TaskId) {
    let ctx = app.ctx();
    let store = app.store();
    let loaded = store.get_task_detail(&ctx, id).and_then(|detail| {
        Ok(TaskView {
            detail,
            parents: store.list_parents(&ctx, id)?,
            children: store.list_children(&ctx, id)?,
            scroll: 0,
        })
    });
    match loaded {
        Ok(view) => {
            app.task_view = Some(view);
            app.mode = Mode::ViewTask;
        }
        Err(err) => app.report("Failed to load task", err),
    }
}

pub fn handle_view_task(app: &mut App, key: KeyEvent) {
    let Some(view) = app.task_view.as_mut() else {
        app.mode = Mode::Normal;
        return;
    };
    if key.code == KeyCode::Esc {
        app.task_view = None;
        app.mode = Mode::Normal;
        return;
    }
    match app.keymap.lookup(Scope::Board, key) {
        Some(Action::Quit | Action::ViewTask) => {
            app.task_view = None;
            app.mode = Mode::Normal;
        }
        Some(Action::MoveUp) => view.scroll = view.scroll.saturating_sub(1),
        Some(Action::MoveDown) => view.scroll = view.scroll.saturating_add(1),
        Some(Action::EditTask) => {
            let id = view.detail.id;
            app.task_view = None;
            app.mode = Mode::Normal;
            open_edit_task_form(app, id);
        }
        Some(Action::Comments) => {
            let id = view.detail.id;
            app.task_view = None;
            open_comments(app, id, Mode::Normal);
        }
        _ => {}
    }
}

pub fn handle_help_overlay(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.mode = Mode::Normal;
        return;
    }
    match app.keymap.lookup(Scope::Board, key) {
        Some(Action::Help | Action::Quit) => app.mode = Mode::Normal,
        Some(Action::MoveUp) => app.help_scroll = app.help_scroll.saturating_sub(1),
        Some(Action::MoveDown) => app.help_scroll = app.help_scroll.saturating_add(1),
        _ => {}
    }
}

/// Any key goes back to the form.
pub fn handle_task_form_help(app: &mut App, _key: KeyEvent) {
    app.mode = Mode::TaskForm;
}
