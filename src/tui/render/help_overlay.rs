use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::tui::app::App;
use crate::tui::keymap::{Action, Scope};

use super::helpers::centered_rect;

/// Render the key binding overlay from the live keymap, so remapped keys
/// show up as configured.
pub fn render_help_overlay(frame: &mut Frame, app: &App, area: Rect) {
    let overlay_area = centered_rect(60, 80, area);
    frame.render_widget(Clear, overlay_area);

    let bg = app.theme.background;
    let key_style = Style::default()
        .fg(app.theme.highlight)
        .bg(bg)
        .add_modifier(Modifier::BOLD);
    let desc_style = Style::default().fg(app.theme.text).bg(bg);
    let header_style = Style::default()
        .fg(app.theme.text_bright)
        .bg(bg)
        .add_modifier(Modifier::BOLD);

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(" Key Bindings", header_style)));
    lines.push(Line::from(""));

    for (scope, heading) in [(Scope::Board, " Board"), (Scope::Form, " Task form")] {
        lines.push(Line::from(Span::styled(heading, header_style)));
        for action in Action::all().filter(|a| a.scope() == scope) {
            add_binding(
                &mut lines,
                app.keymap.keys_label(action),
                action.description(),
                key_style,
                desc_style,
            );
        }
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(" Everywhere", header_style)));
    add_binding(
        &mut lines,
        "esc".to_string(),
        "Close / cancel / clear search",
        key_style,
        desc_style,
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.dim).bg(bg))
        .style(Style::default().bg(bg));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(bg))
        .scroll((app.help_scroll, 0));
    frame.render_widget(paragraph, overlay_area);
}

fn add_binding<'a>(
    lines: &mut Vec<Line<'a>>,
    key: String,
    desc: &'a str,
    key_style: Style,
    desc_style: Style,
) {
    let key_width = 16;
    let padded_key = format!(" {:<width$}", key, width = key_width);
    lines.push(Line::from(vec![
        Span::styled(padded_key, key_style),
        Span::styled(desc, desc_style),
    ]));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::render::test_helpers::*;

    #[test]
    fn lists_configured_keys() {
        let app = app_with_board(&["Todo"], &[]);
        let out = render_to_string(100, 60, |frame, area| {
            render_help_overlay(frame, &app, area);
        });
        assert!(out.contains("Key Bindings"), "{out}");
        assert!(out.contains(&app.keymap.keys_label(Action::AddTask)));
        assert!(out.contains(Action::AddTask.description()));
        assert!(out.contains("Task form"));
    }
}
