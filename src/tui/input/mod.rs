mod comments;
mod confirm;
mod forms;
mod normal;
mod pickers;
mod search;
mod views;

use crossterm::event::{KeyCode, KeyEvent};

use super::app::App;
use super::mode::Mode;

// Import all submodule functions into this module's namespace
// so that submodules can access cross-module functions via `use super::*;`
#[allow(unused_imports)]
use comments::*;
#[allow(unused_imports)]
use confirm::*;
#[allow(unused_imports)]
use forms::*;
#[allow(unused_imports)]
use normal::*;
#[allow(unused_imports)]
use pickers::*;
#[allow(unused_imports)]
use search::*;
#[allow(unused_imports)]
use views::*;

/// Handle a key event in the current mode. The match is the mode → handler
/// table; exactly one handler owns each key.
pub fn handle_key(app: &mut App, key: KeyEvent) {
    // Ignore bare modifier key presses (Shift, Ctrl, Alt, etc.)
    if matches!(key.code, KeyCode::Modifier(_)) {
        return;
    }

    match app.mode {
        Mode::Normal => handle_normal(app, key),
        Mode::DeleteTaskConfirm => handle_delete_task_confirm(app, key),
        Mode::DeleteColumnConfirm => handle_delete_column_confirm(app, key),
        Mode::DiscardConfirm => handle_discard_confirm(app, key),
        Mode::AddColumn | Mode::EditColumn | Mode::AddColumnForm | Mode::EditColumnForm => {
            handle_column_form(app, key)
        }
        Mode::TaskForm => handle_task_form(app, key),
        Mode::ProjectForm => handle_project_form(app, key),
        Mode::CommentForm | Mode::CommentEdit => handle_comment_form(app, key),
        Mode::CommentsView => handle_comments_view(app, key),
        Mode::HelpOverlay => handle_help_overlay(app, key),
        Mode::TaskFormHelpOverlay => handle_task_form_help(app, key),
        Mode::LabelPicker
        | Mode::ParentPicker
        | Mode::ChildPicker
        | Mode::PriorityPicker
        | Mode::TypePicker
        | Mode::StatusPicker => handle_picker(app, key),
        Mode::RelationTypePicker => handle_relation_type_picker(app, key),
        Mode::Search => handle_search(app, key),
        Mode::ViewTask => handle_view_task(app, key),
    }
}

/// Precondition helper: the selected task's id, or a notice and None.
fn require_task(app: &mut App) -> Option<crate::model::TaskId> {
    let id = app.selected_task().map(|t| t.id);
    if id.is_none() {
        app.notices.info("No task selected");
    }
    id
}

fn require_column(app: &mut App) -> Option<crate::model::ColumnId> {
    let id = app.selected_column().map(|c| c.id);
    if id.is_none() {
        app.notices.info("No column selected");
    }
    id
}
