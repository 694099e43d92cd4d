use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::model::TaskSummary;
use crate::tui::app::App;
use crate::tui::keymap::Action;
use crate::util::unicode;

/// Lines per card, including the gap below it
const CARD_HEIGHT: usize = 4;

/// Render the visible window of columns
pub fn render_board(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    if app.board.projects.is_empty() {
        let hint = format!(
            " No projects yet. Press {} to create one.",
            app.keymap.keys_label(Action::NewProject)
        );
        render_hint(frame, app, area, hint);
        return;
    }
    if app.board.columns.is_empty() {
        let hint = format!(
            " No columns. Press {} to add one.",
            app.keymap.keys_label(Action::AddColumn)
        );
        render_hint(frame, app, area, hint);
        return;
    }

    let len = app.board.columns.len();
    let visible = app.selection.visible(len);
    let mut constraints: Vec<Constraint> = visible
        .clone()
        .map(|_| Constraint::Length(app.settings.column_width))
        .collect();
    constraints.push(Constraint::Min(0));
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (slot, index) in visible.clone().enumerate() {
        let more_left = slot == 0 && index > 0;
        let more_right = index + 1 == visible.end && visible.end < len;
        render_column(frame, app, chunks[slot], index, more_left, more_right);
    }
    let rest = chunks[chunks.len() - 1];
    frame.render_widget(Block::default().style(Style::default().bg(bg)), rest);
}

fn render_hint(frame: &mut Frame, app: &App, area: Rect, hint: String) {
    let paragraph = Paragraph::new(Line::from(Span::styled(
        hint,
        Style::default().fg(app.theme.dim).bg(app.theme.background),
    )))
    .style(Style::default().bg(app.theme.background));
    frame.render_widget(paragraph, area);
}

fn render_column(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    index: usize,
    more_left: bool,
    more_right: bool,
) {
    let Some(column) = app.board.column(index) else {
        return;
    };
    let bg = app.theme.background;
    let is_selected = index == app.selection.column;
    let tasks = app.board.tasks_in(index);

    let mut title = format!(" {} ({}) ", column.name, tasks.len());
    if more_left {
        title = format!("\u{25C0}{title}");
    }
    if more_right {
        title.push('\u{25B6}');
    }
    let (border, title_style) = if is_selected {
        (
            app.theme.selection_border,
            Style::default()
                .fg(app.theme.text_bright)
                .bg(bg)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        (app.theme.column_border, Style::default().fg(app.theme.text).bg(bg))
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border).bg(bg))
        .title(Span::styled(
            unicode::truncate_to_width(&title, area.width.saturating_sub(2) as usize),
            title_style,
        ))
        .style(Style::default().bg(bg));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if tasks.is_empty() {
        let empty = Paragraph::new(Span::styled(
            " empty",
            Style::default().fg(app.theme.dim).bg(bg),
        ));
        frame.render_widget(empty, inner);
        return;
    }

    // Keep the selected card on screen
    let fits = (inner.height as usize / CARD_HEIGHT).max(1);
    let first = if is_selected && app.selection.task >= fits {
        app.selection.task + 1 - fits
    } else {
        0
    };

    let width = inner.width as usize;
    let mut lines: Vec<Line> = Vec::new();
    for (i, task) in tasks.iter().enumerate().skip(first).take(fits) {
        let selected = is_selected && i == app.selection.task;
        lines.extend(card_lines(app, task, selected, width));
        lines.push(Line::from(""));
    }
    frame.render_widget(
        Paragraph::new(lines).style(Style::default().bg(bg)),
        inner,
    );
}

/// Three lines: title, labels, priority and type
fn card_lines(app: &App, task: &TaskSummary, selected: bool, width: usize) -> Vec<Line<'static>> {
    let card_bg = if selected {
        app.theme.selection_bg
    } else {
        app.theme.background
    };
    let base = Style::default().bg(card_bg);
    let marker = if selected { "\u{258E}" } else { " " };
    let marker_span = Span::styled(marker, base.fg(app.theme.selection_border));
    let inner_width = width.saturating_sub(1);

    let title_style = if selected {
        base.fg(app.theme.text_bright).add_modifier(Modifier::BOLD)
    } else {
        base.fg(app.theme.text)
    };
    let title = Line::from(vec![
        marker_span.clone(),
        Span::styled(unicode::fit_to_width(&task.title, inner_width), title_style),
    ]);

    let mut label_spans = vec![marker_span.clone()];
    let mut used = 0;
    for label in &task.labels {
        let text = format!("\u{25CF}{} ", label.name);
        let w = unicode::display_width(&text);
        if used + w > inner_width {
            break;
        }
        used += w;
        label_spans.push(Span::styled(text, base.fg(app.theme.stored_color(&label.color))));
    }
    label_spans.push(Span::styled(" ".repeat(inner_width - used), base));

    let mut meta_spans = vec![
        marker_span,
        Span::styled(
            task.priority.clone(),
            base.fg(app.theme.stored_color(&task.priority_color)),
        ),
        Span::styled(format!(" \u{00B7} {}", task.task_type), base.fg(app.theme.dim)),
    ];
    if task.is_blocked {
        meta_spans.push(Span::styled(" \u{2298} blocked", base.fg(app.theme.red)));
    }
    let meta_width: usize = meta_spans
        .iter()
        .map(|s| unicode::display_width(&s.content))
        .sum();
    if meta_width < width {
        meta_spans.push(Span::styled(" ".repeat(width - meta_width), base));
    }

    vec![title, Line::from(label_spans), Line::from(meta_spans)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::render::test_helpers::*;

    #[test]
    fn columns_show_titles_counts_and_cards() {
        let mut app = app_with_board(&["Todo", "Done"], &[(0, "Write parser"), (0, "Fix bug")]);
        app.selection.size = 3;
        let out = render_to_string(TERM_W, TERM_H, |frame, area| {
            render_board(frame, &app, area);
        });
        assert!(out.contains("Todo (2)"), "{out}");
        assert!(out.contains("Write parser"));
        assert!(out.contains("Fix bug"));
        assert!(out.contains("Done (0)"));
        assert!(out.contains("empty"));
    }

    #[test]
    fn hidden_columns_are_marked() {
        let mut app = app_with_board(&["A", "B", "C"], &[]);
        app.selection.size = 2;
        let out = render_to_string(TERM_W, TERM_H, |frame, area| {
            render_board(frame, &app, area);
        });
        assert!(out.contains("B (0) \u{25B6}"), "{out}");
        assert!(!out.contains("C (0)"));
    }

    #[test]
    fn empty_board_explains_itself() {
        let app = app_with_board(&[], &[]);
        let out = render_to_string(TERM_W, TERM_H, |frame, area| {
            render_board(frame, &app, area);
        });
        assert!(out.contains("No columns."), "{out}");
    }
}
