use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::tui::app::{App, DeleteTarget};
use crate::tui::form::{FieldKind, Form, TaskFields};
use crate::tui::keymap::{Action, Scope};
use crate::tui::picker::{PickerRow, PickerSession, RelationTypePicker};
use crate::util::unicode;

use super::helpers::{centered_rect_fixed, with_cursor};

/// Rows shown for a multiline field
const MULTILINE_ROWS: usize = 5;
const FORM_WIDTH: u16 = 64;
const PICKER_WIDTH: u16 = 48;
const PICKER_ROWS: usize = 12;

fn popup_block(app: &App, title: &str) -> Block<'static> {
    let bg = app.theme.background;
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.highlight).bg(bg))
        .title(Span::styled(
            format!(" {title} "),
            Style::default()
                .fg(app.theme.text_bright)
                .bg(bg)
                .add_modifier(Modifier::BOLD),
        ))
        .style(Style::default().bg(bg))
}

fn draw_popup(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    title: &str,
    lines: Vec<Line>,
    width: u16,
) {
    let height = (lines.len() as u16).saturating_add(2);
    let rect = centered_rect_fixed(width, height, area);
    frame.render_widget(Clear, rect);
    let paragraph = Paragraph::new(lines)
        .block(popup_block(app, title))
        .style(Style::default().bg(app.theme.background));
    frame.render_widget(paragraph, rect);
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

/// Render a form popup. `extra` lines (selections made outside the text
/// fields) go between the fields and the key hint.
pub fn render_form(frame: &mut Frame, app: &App, area: Rect, form: &Form, extra: Vec<Line>) {
    let bg = app.theme.background;
    let width = FORM_WIDTH.min(area.width);
    let inner = width.saturating_sub(4) as usize;
    let mut lines: Vec<Line> = Vec::new();

    for (i, field) in form.fields.iter().enumerate() {
        let focused = i == form.focus;
        let label_style = if focused {
            Style::default()
                .fg(app.theme.highlight)
                .bg(bg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(app.theme.dim).bg(bg)
        };
        lines.push(Line::from(Span::styled(format!(" {}", field.label), label_style)));

        let shown = with_cursor(
            field.input.value(),
            field.input.cursor(),
            focused && form.cursor_on,
        );
        let rows = match field.kind {
            FieldKind::Line => 1,
            FieldKind::Multiline => MULTILINE_ROWS,
        };
        // Scroll multiline text so the cursor line stays visible
        let first = field.input.cursor_line().saturating_sub(rows - 1);
        for row in 0..rows {
            let text = shown.get(first + row).map_or("", String::as_str);
            lines.push(Line::from(vec![
                Span::styled(" \u{2502} ", Style::default().fg(app.theme.column_border).bg(bg)),
                Span::styled(
                    unicode::truncate_to_width(text, inner),
                    Style::default().fg(app.theme.text_bright).bg(bg),
                ),
            ]));
        }
        lines.push(Line::from(""));
    }

    if !extra.is_empty() {
        lines.extend(extra);
        lines.push(Line::from(""));
    }
    // Enter only breaks lines inside a multiline field
    let enter = match form.focused().map(|f| f.kind) {
        Some(FieldKind::Multiline) => "Enter new line  ",
        _ => "",
    };
    lines.push(Line::from(Span::styled(
        format!(
            " {enter}{} save  Tab next field  Esc cancel",
            app.keymap.keys_label(Action::FormSave)
        ),
        Style::default().fg(app.theme.dim).bg(bg),
    )));

    draw_popup(frame, app, area, &form.title, lines, width);
}

/// Summary of the task form's picker-backed fields
pub fn task_form_extras(app: &App, fields: &TaskFields) -> Vec<Line<'static>> {
    let bg = app.theme.background;
    let key_style = Style::default().fg(app.theme.dim).bg(bg);
    let value_style = Style::default().fg(app.theme.text).bg(bg);

    let labels: Vec<&str> = app
        .board
        .labels
        .iter()
        .filter(|l| fields.labels.contains(&l.id))
        .map(|l| l.name.as_str())
        .collect();
    let priority = app
        .board
        .priorities
        .iter()
        .find(|p| p.id == fields.priority_id)
        .map_or("?", |p| p.description.as_str());
    let task_type = app
        .board
        .types
        .iter()
        .find(|t| t.id == fields.type_id)
        .map_or("?", |t| t.description.as_str());

    let row = |action: Action, name: &str, value: String| {
        Line::from(vec![
            Span::styled(format!(" {name:<10}"), key_style),
            Span::styled(value, value_style),
            Span::styled(format!("  ({})", app.keymap.keys_label(action)), key_style),
        ])
    };
    let none_if_empty = |s: String| if s.is_empty() { "none".to_string() } else { s };
    vec![
        row(Action::FormLabels, "Labels", none_if_empty(labels.join(", "))),
        row(
            Action::FormParents,
            "Parents",
            fields.parents.len().to_string(),
        ),
        row(
            Action::FormChildren,
            "Children",
            fields.children.len().to_string(),
        ),
        row(Action::FormPriority, "Priority", priority.to_string()),
        row(Action::FormType, "Type", task_type.to_string()),
    ]
}

/// Form-scope key list shown over the task form
pub fn render_form_help(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let mut lines: Vec<Line> = Action::all()
        .filter(|a| a.scope() == Scope::Form)
        .map(|a| {
            Line::from(vec![
                Span::styled(
                    format!(" {:<14}", app.keymap.keys_label(a)),
                    Style::default().fg(app.theme.highlight).bg(bg),
                ),
                Span::styled(a.description(), Style::default().fg(app.theme.text).bg(bg)),
            ])
        })
        .collect();
    lines.push(Line::from(vec![
        Span::styled(
            format!(" {:<14}", "tab/shift+tab"),
            Style::default().fg(app.theme.highlight).bg(bg),
        ),
        Span::styled(
            "Next / previous field",
            Style::default().fg(app.theme.text).bg(bg),
        ),
    ]));
    lines.push(Line::from(vec![
        Span::styled(
            format!(" {:<14}", "enter"),
            Style::default().fg(app.theme.highlight).bg(bg),
        ),
        Span::styled(
            "New line in the description",
            Style::default().fg(app.theme.text).bg(bg),
        ),
    ]));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " Press any key to return",
        Style::default().fg(app.theme.dim).bg(bg),
    )));
    draw_popup(frame, app, area, "Task form keys", lines, 48);
}

// ---------------------------------------------------------------------------
// Confirmations
// ---------------------------------------------------------------------------

pub fn render_confirm(frame: &mut Frame, app: &App, area: Rect) {
    let (title, message) = match (&app.pending_delete, &app.discard) {
        (Some(DeleteTarget::Task { title, .. }), _) => {
            ("Delete task", format!("Delete \"{title}\"?"))
        }
        (Some(DeleteTarget::Column { name, .. }), _) => (
            "Delete column",
            format!("Delete column \"{name}\" and every task in it?"),
        ),
        (None, Some(discard)) => ("Unsaved changes", discard.message.clone()),
        (None, None) => return,
    };
    let bg = app.theme.background;
    let width: u16 = 52;
    let mut lines: Vec<Line> = vec![Line::from("")];
    for text in unicode::wrap_to_width(&message, width.saturating_sub(4) as usize) {
        lines.push(Line::from(Span::styled(
            format!(" {text}"),
            Style::default().fg(app.theme.text_bright).bg(bg),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled(" y", Style::default().fg(app.theme.highlight).bg(bg)),
        Span::styled(" yes   ", Style::default().fg(app.theme.text).bg(bg)),
        Span::styled("n", Style::default().fg(app.theme.highlight).bg(bg)),
        Span::styled(" no", Style::default().fg(app.theme.text).bg(bg)),
    ]));
    draw_popup(frame, app, area, title, lines, width);
}

// ---------------------------------------------------------------------------
// Pickers
// ---------------------------------------------------------------------------

pub fn render_picker(frame: &mut Frame, app: &App, area: Rect, picker: &PickerSession) {
    let bg = app.theme.background;
    let inner = PICKER_WIDTH.saturating_sub(2) as usize;
    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(vec![
        Span::styled(" filter: ", Style::default().fg(app.theme.dim).bg(bg)),
        Span::styled(
            picker.filter.clone(),
            Style::default().fg(app.theme.text_bright).bg(bg),
        ),
        Span::styled("\u{258C}", Style::default().fg(app.theme.highlight).bg(bg)),
    ]));
    lines.push(Line::from(""));

    let rows = picker.rows();
    if rows.is_empty() {
        lines.push(Line::from(Span::styled(
            " no matches",
            Style::default().fg(app.theme.dim).bg(bg),
        )));
    }
    let first = picker.cursor.saturating_sub(PICKER_ROWS - 1);
    for (i, row) in rows.iter().enumerate().skip(first).take(PICKER_ROWS) {
        let focused = i == picker.cursor;
        let row_bg = if focused { app.theme.selection_bg } else { bg };
        let line = match *row {
            PickerRow::Item(index) => {
                let item = &picker.items[index];
                let mark = if picker.kind.is_single_select() {
                    if item.selected { "(\u{2022}) " } else { "( ) " }
                } else if item.selected {
                    "[x] "
                } else {
                    "[ ] "
                };
                let name_color = item
                    .color
                    .as_deref()
                    .map_or(app.theme.text, |c| app.theme.stored_color(c));
                let mut spans = vec![
                    Span::styled(format!(" {mark}"), Style::default().fg(app.theme.dim).bg(row_bg)),
                    Span::styled(
                        unicode::truncate_to_width(&item.name, inner.saturating_sub(20)),
                        Style::default().fg(name_color).bg(row_bg),
                    ),
                ];
                if let Some(hint) = &item.hint {
                    spans.push(Span::styled(
                        format!("  {hint}"),
                        Style::default().fg(app.theme.dim).bg(row_bg),
                    ));
                }
                if item.selected
                    && let Some(ty) = item.relation_type
                    && let Some(rt) = app.board.relation_types.iter().find(|t| t.id == ty)
                {
                    spans.push(Span::styled(
                        format!("  {}", rt.parent_to_child),
                        Style::default().fg(app.theme.stored_color(&rt.color)).bg(row_bg),
                    ));
                }
                Line::from(spans)
            }
            PickerRow::Create => Line::from(Span::styled(
                format!(" + create label \"{}\"", picker.filter.trim()),
                Style::default().fg(app.theme.green).bg(row_bg),
            )),
        };
        lines.push(line);
    }

    if let Some(draft) = &picker.draft {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled(" new label ", Style::default().fg(app.theme.dim).bg(bg)),
            Span::styled(
                format!("\u{25CF} {}", draft.name),
                Style::default().fg(app.theme.stored_color(draft.color())).bg(bg),
            ),
        ]));
        lines.push(Line::from(Span::styled(
            " \u{2190}/\u{2192} colour  Enter create  Esc back",
            Style::default().fg(app.theme.dim).bg(bg),
        )));
    } else {
        let hint = if picker.kind.is_single_select() {
            " Enter choose  Esc close"
        } else if picker.kind.is_relation() {
            " Enter toggle  Tab relation type  Esc close"
        } else {
            " Enter toggle  Esc close"
        };
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            hint,
            Style::default().fg(app.theme.dim).bg(bg),
        )));
    }

    draw_popup(frame, app, area, picker.kind.title(), lines, PICKER_WIDTH);
}

pub fn render_relation_type_picker(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    chooser: &RelationTypePicker,
) {
    let bg = app.theme.background;
    let mut lines: Vec<Line> = Vec::new();
    for (i, ty) in chooser.items.iter().enumerate() {
        let row_bg = if i == chooser.cursor {
            app.theme.selection_bg
        } else {
            bg
        };
        let mut spans = vec![
            Span::styled(
                format!(" {} / {}", ty.parent_to_child, ty.child_to_parent),
                Style::default().fg(app.theme.stored_color(&ty.color)).bg(row_bg),
            ),
        ];
        if ty.is_blocking {
            spans.push(Span::styled(
                "  blocking",
                Style::default().fg(app.theme.red).bg(row_bg),
            ));
        }
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " Enter apply  Esc back",
        Style::default().fg(app.theme.dim).bg(bg),
    )));
    draw_popup(frame, app, area, "Relation type", lines, 40);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::form::{FieldSet, ProjectFields};
    use crate::tui::mode::Mode;
    use crate::tui::picker::{PickerItem, PickerKind};
    use crate::tui::render::test_helpers::*;

    #[test]
    fn form_shows_fields_and_save_key() {
        let app = app_with_board(&["Todo"], &[]);
        let form = ProjectFields {
            name: "Roadmap".into(),
            description: String::new(),
        }
        .build_form("Edit project");
        let out = render_to_string(TERM_W, TERM_H, |frame, area| {
            render_form(frame, &app, area, &form, Vec::new());
        });
        assert!(out.contains("Edit project"), "{out}");
        assert!(out.contains("Roadmap"));
        assert!(out.contains("ctrl+s save"));
    }

    #[test]
    fn multiline_focus_says_enter_breaks_lines() {
        let app = app_with_board(&["Todo"], &[]);
        let mut form = ProjectFields::default().build_form("New project");
        let out = render_to_string(TERM_W, TERM_H, |frame, area| {
            render_form(frame, &app, area, &form, Vec::new());
        });
        assert!(!out.contains("Enter new line"), "{out}");

        form.focus = 1;
        let out = render_to_string(TERM_W, TERM_H, |frame, area| {
            render_form(frame, &app, area, &form, Vec::new());
        });
        assert!(out.contains("Enter new line  ctrl+s save"), "{out}");
    }

    #[test]
    fn form_help_lists_save_and_new_line() {
        let app = app_with_board(&["Todo"], &[]);
        let out = render_to_string(TERM_W, TERM_H, |frame, area| {
            render_form_help(frame, &app, area);
        });
        assert!(out.contains("ctrl+s"), "{out}");
        assert!(out.contains("New line in the description"));
    }

    #[test]
    fn picker_marks_selection_and_offers_create() {
        let app = app_with_board(&["Todo"], &[]);
        let mut bug = PickerItem::new(1, "bug");
        bug.selected = true;
        let mut picker = PickerSession::new(
            PickerKind::Label,
            vec![bug, PickerItem::new(2, "docs")],
            Mode::Normal,
            7,
        );
        let out = render_to_string(TERM_W, TERM_H, |frame, area| {
            render_picker(frame, &app, area, &picker);
        });
        assert!(out.contains("[x] bug"), "{out}");
        assert!(out.contains("[ ] docs"));

        picker.push_filter('u');
        picker.push_filter('i');
        let out = render_to_string(TERM_W, TERM_H, |frame, area| {
            render_picker(frame, &app, area, &picker);
        });
        assert!(out.contains("create label \"ui\""), "{out}");
    }
}
