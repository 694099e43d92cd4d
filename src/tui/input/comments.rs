use crossterm::event::{KeyCode, KeyEvent};
use tracing::info;

use crate::model::TaskId;
use crate::tui::app::{App, CommentsView};
use crate::tui::keymap::{Action, Scope};
use crate::tui::mode::Mode;

use super::*;

pub fn open_comments(app: &mut App, task_id: TaskId, return_mode: Mode) {
    let ctx = app.ctx();
    let loaded = app.store().get_task_detail(&ctx, task_id).and_then(|detail| {
        let comments = app.store().list_comments(&ctx, task_id)?;
        Ok((detail.title, comments))
    });
    match loaded {
        Ok((task_title, comments)) => {
            app.comments = Some(CommentsView {
                task_id,
                task_title,
                comments,
                cursor: 0,
                return_mode,
            });
            app.mode = Mode::CommentsView;
        }
        Err(err) => app.report("Failed to load comments", err),
    }
}

/// Re-read the open list, keeping the cursor in range.
pub fn reload_comments(app: &mut App) {
    let Some(task_id) = app.comments.as_ref().map(|v| v.task_id) else {
        return;
    };
    let ctx = app.ctx();
    match app.store().list_comments(&ctx, task_id) {
        Ok(comments) => {
            if let Some(view) = app.comments.as_mut() {
                view.cursor = view.cursor.min(comments.len().saturating_sub(1));
                view.comments = comments;
            }
        }
        Err(err) => app.report("Failed to load comments", err),
    }
}

pub fn handle_comments_view(app: &mut App, key: KeyEvent) {
    let Some(view) = app.comments.as_mut() else {
        app.mode = Mode::Normal;
        return;
    };
    if key.code == KeyCode::Esc {
        app.mode = view.return_mode;
        app.comments = None;
        return;
    }
    if key.code == KeyCode::Enter {
        open_edit_comment(app);
        return;
    }

    match app.keymap.lookup(Scope::Board, key) {
        Some(Action::MoveUp) => view.cursor = view.cursor.saturating_sub(1),
        Some(Action::MoveDown) => {
            if view.cursor + 1 < view.comments.len() {
                view.cursor += 1;
            }
        }
        Some(Action::AddTask) => open_new_comment(app),
        Some(Action::EditTask) => open_edit_comment(app),
        Some(Action::DeleteTask) => delete_comment(app),
        Some(Action::Quit | Action::Comments) => {
            app.mode = view.return_mode;
            app.comments = None;
        }
        _ => {}
    }
}

fn delete_comment(app: &mut App) {
    let Some(id) = app.comments.as_ref().and_then(|v| v.selected()).map(|c| c.id) else {
        app.notices.info("No comment selected");
        return;
    };
    let ctx = app.ctx();
    match app.store().delete_comment(&ctx, id) {
        Ok(()) => {
            info!(comment = id, "comment deleted");
            reload_comments(app);
        }
        Err(err) => app.report("Failed to delete comment", err),
    }
}
