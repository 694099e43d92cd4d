pub mod board_view;
pub mod comments_view;
pub mod header;
pub mod help_overlay;
pub mod helpers;
pub mod popups;
pub mod status_row;
pub mod task_view;

#[cfg(test)]
pub mod test_helpers;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::widgets::Block;

use super::app::App;
use super::mode::Mode;

/// Main render function: the board underneath, then whatever the mode
/// puts on top of it.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let bg_style = Style::default().bg(app.theme.background);
    frame.render_widget(Block::default().style(bg_style), area);

    // Layout: header (2 rows) | board | status row (1 row)
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // project tabs + separator
            Constraint::Min(1),    // board
            Constraint::Length(1), // status row
        ])
        .split(area);

    header::render_header(frame, app, chunks[0]);
    board_view::render_board(frame, app, chunks[1]);
    render_overlay(frame, app, area);
    status_row::render_status_row(frame, app, chunks[2]);
}

fn render_overlay(frame: &mut Frame, app: &App, area: Rect) {
    match app.mode {
        Mode::Normal
        | Mode::Search
        | Mode::AddColumn
        | Mode::EditColumn
        | Mode::DeleteTaskConfirm
        | Mode::DeleteColumnConfirm => {}
        Mode::DiscardConfirm => {
            // Keep the form being discarded visible underneath
            if let Some(discard) = &app.discard {
                render_session(frame, app, area, discard.source_mode);
            }
        }
        _ => render_session(frame, app, area, app.mode),
    }
    if matches!(
        app.mode,
        Mode::DeleteTaskConfirm | Mode::DeleteColumnConfirm | Mode::DiscardConfirm
    ) {
        popups::render_confirm(frame, app, area);
    }
}

/// Draw the popup stack that `mode` owns
fn render_session(frame: &mut Frame, app: &App, area: Rect, mode: Mode) {
    match mode {
        Mode::TaskForm | Mode::TaskFormHelpOverlay => {
            render_task_form(frame, app, area);
            if mode == Mode::TaskFormHelpOverlay {
                popups::render_form_help(frame, app, area);
            }
        }
        Mode::ProjectForm => {
            if let Some(s) = &app.project_form {
                popups::render_form(frame, app, area, &s.form, Vec::new());
            }
        }
        Mode::AddColumnForm | Mode::EditColumnForm => {
            if let Some(s) = &app.column_form {
                popups::render_form(frame, app, area, &s.form, Vec::new());
            }
        }
        Mode::CommentsView | Mode::CommentForm | Mode::CommentEdit => {
            if let Some(view) = &app.comments {
                comments_view::render_comments_view(frame, app, area, view);
            }
            if mode != Mode::CommentsView
                && let Some(s) = &app.comment_form
            {
                popups::render_form(frame, app, area, &s.form, Vec::new());
            }
        }
        Mode::LabelPicker
        | Mode::ParentPicker
        | Mode::ChildPicker
        | Mode::PriorityPicker
        | Mode::TypePicker
        | Mode::StatusPicker
        | Mode::RelationTypePicker => {
            if let Some(picker) = &app.picker {
                if picker.is_form_bound() {
                    render_task_form(frame, app, area);
                }
                popups::render_picker(frame, app, area, picker);
            }
            if mode == Mode::RelationTypePicker
                && let Some(chooser) = &app.relation_picker
            {
                popups::render_relation_type_picker(frame, app, area, chooser);
            }
        }
        Mode::HelpOverlay => help_overlay::render_help_overlay(frame, app, area),
        Mode::ViewTask => {
            if let Some(view) = &app.task_view {
                task_view::render_task_view(frame, app, area, view);
            }
        }
        Mode::Normal
        | Mode::Search
        | Mode::AddColumn
        | Mode::EditColumn
        | Mode::DeleteTaskConfirm
        | Mode::DeleteColumnConfirm
        | Mode::DiscardConfirm => {}
    }
}

fn render_task_form(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(s) = &app.task_form {
        let extras = popups::task_form_extras(app, &s.fields);
        popups::render_form(frame, app, area, &s.form, extras);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::app::{DeleteTarget, DiscardContext};
    use crate::tui::form::{FormSession, TaskFields};
    use crate::tui::render::test_helpers::*;

    fn draw(app: &App) -> String {
        render_to_string(TERM_W, TERM_H, |frame, _area| render(frame, app))
    }

    #[test]
    fn board_frame_has_tabs_columns_and_status() {
        let mut app = app_with_board(&["Todo", "Doing"], &[(0, "Ship it")]);
        app.selection.size = 2;
        app.notices.info("Board reloaded");
        let out = draw(&app);
        assert!(out.contains("Demo"), "{out}");
        assert!(out.contains("Todo (1)"));
        assert!(out.contains("Ship it"));
        assert!(out.contains("Board reloaded"));
    }

    #[test]
    fn discard_question_sits_over_its_form() {
        let mut app = app_with_board(&["Todo"], &[]);
        app.task_form = Some(FormSession::open(0, TaskFields::default(), "New task"));
        app.discard = Some(DiscardContext {
            source_mode: Mode::TaskForm,
            message: "Discard changes to this task?".into(),
        });
        app.mode = Mode::DiscardConfirm;
        let out = draw(&app);
        assert!(out.contains("New task"), "{out}");
        assert!(out.contains("Discard changes to this task?"));
    }

    #[test]
    fn delete_confirm_names_the_task() {
        let mut app = app_with_board(&["Todo"], &[(0, "Old idea")]);
        app.pending_delete = Some(DeleteTarget::Task {
            id: 1,
            title: "Old idea".into(),
        });
        app.mode = Mode::DeleteTaskConfirm;
        let out = draw(&app);
        assert!(out.contains("Delete \"Old idea\"?"), "{out}");
    }
}
