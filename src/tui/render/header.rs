use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::app::App;

use super::helpers::{push_right_aligned, spans_width};

/// Project tabs with the feed state on the right, separator line below
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // tabs
            Constraint::Length(1), // separator
        ])
        .split(area);

    let sep_cols = render_tabs(frame, app, chunks[0]);
    render_separator(frame, app, chunks[1], &sep_cols);
}

/// Render tabs and return the column positions of each separator character.
fn render_tabs(frame: &mut Frame, app: &App, area: Rect) -> Vec<usize> {
    let bg = app.theme.background;
    let bg_style = Style::default().bg(bg);
    let sep = Span::styled("\u{2502}", Style::default().fg(app.theme.dim).bg(bg));

    let mut spans: Vec<Span> = vec![
        Span::styled(" ", bg_style),
        Span::styled("\u{25A6}", Style::default().fg(app.theme.purple).bg(bg)),
        Span::styled(" ", bg_style),
    ];
    let mut sep_cols = Vec::new();

    if app.board.projects.is_empty() {
        spans.push(Span::styled(
            " no projects ",
            Style::default().fg(app.theme.dim).bg(bg),
        ));
    }
    for project in &app.board.projects {
        let is_current = project.id == app.board.project_id;
        spans.push(Span::styled(
            format!(" {} ", project.name),
            tab_style(app, is_current),
        ));
        sep_cols.push(spans_width(&spans));
        spans.push(sep.clone());
    }

    let mut right: Vec<Span> = Vec::new();
    if let Some(query) = &app.board.search {
        right.push(Span::styled(
            format!("/{query}  "),
            Style::default().fg(app.theme.yellow).bg(bg),
        ));
    }
    if app.sync.is_enabled() {
        let state = app.sync.state();
        right.push(Span::styled(
            format!("\u{25CF} {} ", state.label()),
            Style::default().fg(app.theme.connection_color(state)).bg(bg),
        ));
    }
    push_right_aligned(&mut spans, right, area.width as usize, bg);

    frame.render_widget(Paragraph::new(Line::from(spans)).style(bg_style), area);
    sep_cols
}

fn render_separator(frame: &mut Frame, app: &App, area: Rect, sep_cols: &[usize]) {
    let line: String = (0..area.width as usize)
        .map(|col| {
            if sep_cols.contains(&col) {
                '\u{2534}'
            } else {
                '\u{2500}'
            }
        })
        .collect();
    let widget =
        Paragraph::new(line).style(Style::default().fg(app.theme.dim).bg(app.theme.background));
    frame.render_widget(widget, area);
}

/// Style for a tab: highlighted if current, normal otherwise
fn tab_style(app: &App, is_current: bool) -> Style {
    if is_current {
        Style::default()
            .fg(app.theme.text_bright)
            .bg(app.theme.selection_bg)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(app.theme.text).bg(app.theme.background)
    }
}
