use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::tui::app::{App, CommentsView};
use crate::tui::keymap::Action;
use crate::util::unicode;

use super::helpers::centered_rect;

pub fn render_comments_view(frame: &mut Frame, app: &App, area: Rect, view: &CommentsView) {
    let rect = centered_rect(70, 80, area);
    frame.render_widget(Clear, rect);

    let bg = app.theme.background;
    let width = rect.width.saturating_sub(6) as usize;
    let mut lines: Vec<Line> = Vec::new();
    // Line index of the selected comment, for scrolling
    let mut cursor_line = 0usize;

    if view.comments.is_empty() {
        lines.push(Line::from(Span::styled(
            " No comments yet",
            Style::default().fg(app.theme.dim).bg(bg),
        )));
    }
    for (i, comment) in view.comments.iter().enumerate() {
        let selected = i == view.cursor;
        if selected {
            cursor_line = lines.len();
        }
        let row_bg = if selected { app.theme.selection_bg } else { bg };
        let marker = if selected { " \u{258E}" } else { "  " };
        lines.push(Line::from(vec![
            Span::styled(
                marker,
                Style::default().fg(app.theme.selection_border).bg(row_bg),
            ),
            Span::styled(
                comment.author.clone(),
                Style::default()
                    .fg(app.theme.cyan)
                    .bg(row_bg)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", comment.created_at.format("%Y-%m-%d %H:%M")),
                Style::default().fg(app.theme.dim).bg(row_bg),
            ),
        ]));
        for text in unicode::wrap_to_width(&comment.message, width) {
            lines.push(Line::from(Span::styled(
                format!("   {text}"),
                Style::default().fg(app.theme.text).bg(bg),
            )));
        }
        lines.push(Line::from(""));
    }

    let hint = format!(
        " {} add  {} edit  {} delete  Esc close ",
        app.keymap.keys_label(Action::AddTask),
        app.keymap.keys_label(Action::EditTask),
        app.keymap.keys_label(Action::DeleteTask),
    );
    let inner_height = rect.height.saturating_sub(2) as usize;
    let scroll = cursor_line.saturating_sub(inner_height.saturating_sub(4)) as u16;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.highlight).bg(bg))
        .title(Span::styled(
            format!(" Comments: {} ", view.task_title),
            Style::default()
                .fg(app.theme.text_bright)
                .bg(bg)
                .add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Span::styled(hint, Style::default().fg(app.theme.dim).bg(bg)))
        .style(Style::default().bg(bg));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .scroll((scroll, 0))
        .style(Style::default().bg(bg));
    frame.render_widget(paragraph, rect);
}
