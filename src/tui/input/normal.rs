use crossterm::event::{KeyCode, KeyEvent};
use tracing::debug;

use crate::model::{Shift, TaskId};
use crate::store::StoreError;
use crate::tui::app::{App, DeleteTarget};
use crate::tui::keymap::{Action, Scope};
use crate::tui::mode::Mode;
use crate::tui::picker::PickerKind;

use super::*;

pub fn handle_normal(app: &mut App, key: KeyEvent) {
    // Esc clears an active search filter
    if key.code == KeyCode::Esc {
        if app.board.search.take().is_some() {
            app.reload_tasks();
            app.notices.info("Search cleared");
        }
        return;
    }

    let Some(action) = app.keymap.lookup(Scope::Board, key) else {
        return;
    };
    match action {
        Action::MoveLeft => {
            if !app.selection.move_left() && !app.board.columns.is_empty() {
                app.notices.info("Already at the first column");
            }
        }
        Action::MoveRight => {
            let len = app.board.columns.len();
            if !app.selection.move_right(len) && len > 0 {
                app.notices.info("Already at the last column");
            }
        }
        Action::MoveUp => {
            if !app.selection.move_up() && !current_tasks_empty(app) {
                app.notices.info("Already at the first task");
            }
        }
        Action::MoveDown => {
            let len = app.board.tasks_in(app.selection.column).len();
            if !app.selection.move_down(len) && len > 0 {
                app.notices.info("Already at the last task");
            }
        }
        Action::ScrollLeft => {
            app.selection.scroll_left();
        }
        Action::ScrollRight => {
            let len = app.board.columns.len();
            app.selection.scroll_right(len);
        }
        Action::MoveTaskLeft => move_task_sideways(app, false),
        Action::MoveTaskRight => move_task_sideways(app, true),
        Action::MoveTaskUp => shift_task(app, Shift::Up),
        Action::MoveTaskDown => shift_task(app, Shift::Down),
        Action::AddTask => open_new_task_form(app),
        Action::EditTask => {
            if let Some(id) = require_task(app) {
                open_edit_task_form(app, id);
            }
        }
        Action::DeleteTask => {
            if let Some(task) = app.selected_task() {
                app.pending_delete = Some(DeleteTarget::Task {
                    id: task.id,
                    title: task.title.clone(),
                });
                app.mode = Mode::DeleteTaskConfirm;
            } else {
                app.notices.info("No task selected");
            }
        }
        Action::ViewTask => {
            if let Some(id) = require_task(app) {
                open_task_view(app, id);
            }
        }
        Action::AddColumn => open_new_column(app, Mode::AddColumn),
        Action::AddColumnForm => open_new_column(app, Mode::AddColumnForm),
        Action::RenameColumn => open_edit_column(app, Mode::EditColumn),
        Action::EditColumnForm => open_edit_column(app, Mode::EditColumnForm),
        Action::DeleteColumn => {
            if let Some(column) = app.selected_column() {
                app.pending_delete = Some(DeleteTarget::Column {
                    id: column.id,
                    name: column.name.clone(),
                });
                app.mode = Mode::DeleteColumnConfirm;
            } else {
                app.notices.info("No column selected");
            }
        }
        Action::NewProject => open_new_project_form(app),
        Action::EditProject => open_edit_project_form(app),
        Action::NextProject => cycle_project(app, true),
        Action::PrevProject => cycle_project(app, false),
        Action::Labels => open_view_picker(app, PickerKind::Label),
        Action::Parents => open_view_picker(app, PickerKind::Parent),
        Action::Children => open_view_picker(app, PickerKind::Child),
        Action::Priority => open_view_picker(app, PickerKind::Priority),
        Action::TaskType => open_view_picker(app, PickerKind::Type),
        Action::Status => open_view_picker(app, PickerKind::Status),
        Action::Comments => {
            if let Some(id) = require_task(app) {
                open_comments(app, id, Mode::Normal);
            }
        }
        Action::Search => {
            app.search_input.clear();
            app.mode = Mode::Search;
        }
        Action::Help => {
            app.help_scroll = 0;
            app.mode = Mode::HelpOverlay;
        }
        Action::Refresh => refresh_all(app),
        Action::Quit => app.should_quit = true,
        // Form-scope actions are never looked up here
        Action::FormSave
        | Action::FormLabels
        | Action::FormParents
        | Action::FormChildren
        | Action::FormPriority
        | Action::FormType
        | Action::FormHelp => {}
    }
}

fn current_tasks_empty(app: &App) -> bool {
    app.board.tasks_in(app.selection.column).is_empty()
}

/// Move the selected task to the neighbouring column. At the board edge this
/// is a no-op and the store is not called.
fn move_task_sideways(app: &mut App, right: bool) {
    let Some(id) = require_task(app) else {
        return;
    };
    let from = app.selection.column;
    let target = if right {
        from + 1
    } else {
        match from.checked_sub(1) {
            Some(t) => t,
            None => return,
        }
    };
    let Some(column_id) = app.board.column(target).map(|c| c.id) else {
        return;
    };

    let ctx = app.ctx();
    if let Err(err) = app.store().move_task(&ctx, id, column_id) {
        app.report("Failed to move task", err);
        return;
    }
    debug!(task = id, column = column_id, "task moved");
    app.refresh_summary(id);
    app.select_task(id);
}

/// Reorder inside the column; the cache is patched by swapping neighbours.
/// Under a search filter the neighbour may be hidden, so the store decides
/// where the edge is and the filtered listing is read back.
fn shift_task(app: &mut App, shift: Shift) {
    let Some(id) = require_task(app) else {
        return;
    };
    if app.board.is_filtered() {
        shift_filtered_task(app, id, shift);
        return;
    }
    let index = app.selection.task;
    let len = app.board.tasks_in(app.selection.column).len();
    let target = match shift {
        Shift::Up if index > 0 => index - 1,
        Shift::Down if index + 1 < len => index + 1,
        _ => {
            edge_notice(app, shift);
            return;
        }
    };
    let Some(column_id) = app.selected_column().map(|c| c.id) else {
        return;
    };

    let ctx = app.ctx();
    if let Err(err) = app.store().shift_task(&ctx, id, shift) {
        app.report("Failed to reorder task", err);
        return;
    }
    app.board.swap(column_id, index, target);
    app.selection.task = target;
}

fn shift_filtered_task(app: &mut App, id: TaskId, shift: Shift) {
    if shift == Shift::Up && app.selected_task().is_some_and(|t| t.position == 0) {
        edge_notice(app, shift);
        return;
    }
    let ctx = app.ctx();
    match app.store().shift_task(&ctx, id, shift) {
        Ok(()) => {}
        Err(StoreError::Invalid(_)) => {
            edge_notice(app, shift);
            return;
        }
        Err(err) => {
            app.report("Failed to reorder task", err);
            return;
        }
    }
    if app.reload_tasks() {
        app.select_task(id);
    }
}

fn edge_notice(app: &mut App, shift: Shift) {
    match shift {
        Shift::Up => app.notices.info("Already at the top of the column"),
        Shift::Down => app.notices.info("Already at the bottom of the column"),
    }
}

fn cycle_project(app: &mut App, forward: bool) {
    let len = app.board.projects.len();
    if len < 2 {
        app.notices.info("No other project");
        return;
    }
    let current = app
        .board
        .projects
        .iter()
        .position(|p| p.id == app.board.project_id)
        .unwrap_or(0);
    let next = if forward {
        (current + 1) % len
    } else {
        (current + len - 1) % len
    };
    let id = app.board.projects[next].id;
    app.switch_project(id);
}

/// Manual refresh: projects and the open board from scratch.
fn refresh_all(app: &mut App) {
    if app.reload_projects() && app.reload_board() {
        app.notices.info("Board reloaded");
    }
}
