use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::app::App;
use crate::tui::keymap::Action;
use crate::tui::mode::Mode;
use crate::util::unicode;

use super::helpers::{push_right_aligned, spans_width};

/// Render the status row (bottom of screen)
pub fn render_status_row(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let width = area.width as usize;

    let line = match app.mode {
        Mode::Search => prompt_line(
            app,
            "/",
            app.search_input.value(),
            "Enter search  Esc cancel",
            width,
        ),
        Mode::AddColumn | Mode::EditColumn => {
            let label = if app.mode == Mode::AddColumn {
                "New column: "
            } else {
                "Rename column: "
            };
            let value = app
                .column_form
                .as_ref()
                .map_or("", |s| s.form.value("name"));
            prompt_line(app, label, value, "Enter save  Esc cancel", width)
        }
        _ => {
            let mut spans: Vec<Span> = Vec::new();
            if app.mode != Mode::Normal {
                spans.push(Span::styled(
                    format!(" {} ", app.mode.label()),
                    Style::default()
                        .fg(app.theme.background)
                        .bg(app.theme.highlight)
                        .add_modifier(Modifier::BOLD),
                ));
            }
            if let Some(notice) = app.notices.latest() {
                let room = width.saturating_sub(spans_width(&spans) + 1);
                spans.push(Span::styled(
                    format!(" {}", unicode::truncate_to_width(&notice.message, room)),
                    Style::default()
                        .fg(app.theme.notice_color(notice.level))
                        .bg(bg),
                ));
            }
            let hint = format!("{} help ", app.keymap.keys_label(Action::Help));
            let right = vec![Span::styled(hint, Style::default().fg(app.theme.dim).bg(bg))];
            push_right_aligned(&mut spans, right, width, bg);
            Line::from(spans)
        }
    };

    let paragraph = Paragraph::new(line).style(Style::default().bg(bg));
    frame.render_widget(paragraph, area);
}

/// `label` + value + cursor, with a key hint on the right
fn prompt_line<'a>(app: &App, label: &str, value: &str, hint: &'a str, width: usize) -> Line<'a> {
    let bg = app.theme.background;
    let mut spans = vec![
        Span::styled(
            format!("{label}{value}"),
            Style::default().fg(app.theme.text_bright).bg(bg),
        ),
        Span::styled("\u{258C}", Style::default().fg(app.theme.highlight).bg(bg)),
    ];
    let right = vec![Span::styled(hint, Style::default().fg(app.theme.dim).bg(bg))];
    push_right_aligned(&mut spans, right, width, bg);
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::render::test_helpers::*;

    #[test]
    fn newest_notice_is_shown() {
        let mut app = app_with_board(&["Todo"], &[]);
        app.notices.info("first");
        app.notices.error("Failed to save task: store call timed out");
        let out = render_to_string(TERM_W, 1, |frame, area| {
            render_status_row(frame, &app, area);
        });
        assert!(out.contains("Failed to save task"), "{out}");
        assert!(!out.contains("first"));
    }

    #[test]
    fn search_prompt_shows_query() {
        let mut app = app_with_board(&["Todo"], &[]);
        app.mode = Mode::Search;
        app.search_input.set("bug");
        let out = render_to_string(TERM_W, 1, |frame, area| {
            render_status_row(frame, &app, area);
        });
        assert!(out.starts_with("/bug\u{258C}"), "{out}");
        assert!(out.contains("Esc cancel"));
    }
}
