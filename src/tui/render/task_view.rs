use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::model::TaskReference;
use crate::tui::app::{App, TaskView};
use crate::util::unicode;

use super::helpers::centered_rect;

/// Read-only task detail popup
pub fn render_task_view(frame: &mut Frame, app: &App, area: Rect, view: &TaskView) {
    let rect = centered_rect(70, 80, area);
    frame.render_widget(Clear, rect);

    let bg = app.theme.background;
    let width = rect.width.saturating_sub(4) as usize;
    let key_style = Style::default().fg(app.theme.dim).bg(bg);
    let text_style = Style::default().fg(app.theme.text).bg(bg);
    let header_style = Style::default()
        .fg(app.theme.text_bright)
        .bg(bg)
        .add_modifier(Modifier::BOLD);
    let detail = &view.detail;

    let field = |name: &str, value: String, style: Style| {
        Line::from(vec![
            Span::styled(format!(" {name:<10}"), key_style),
            Span::styled(value, style),
        ])
    };

    let mut lines: Vec<Line> = Vec::new();
    for text in unicode::wrap_to_width(&detail.title, width) {
        lines.push(Line::from(Span::styled(format!(" {text}"), header_style)));
    }
    lines.push(Line::from(""));
    lines.push(field("Column", detail.column_name.clone(), text_style));
    let priority_color = app
        .board
        .priorities
        .iter()
        .find(|p| p.id == detail.priority_id)
        .map_or(app.theme.text, |p| app.theme.stored_color(&p.color));
    lines.push(field(
        "Priority",
        detail.priority.clone(),
        text_style.fg(priority_color),
    ));
    lines.push(field("Type", detail.task_type.clone(), text_style));

    let mut label_spans = vec![Span::styled(format!(" {:<10}", "Labels"), key_style)];
    if detail.labels.is_empty() {
        label_spans.push(Span::styled("none", key_style));
    }
    for label in &detail.labels {
        label_spans.push(Span::styled(
            format!("\u{25CF}{} ", label.name),
            text_style.fg(app.theme.stored_color(&label.color)),
        ));
    }
    lines.push(Line::from(label_spans));
    lines.push(field(
        "Created",
        detail.created_at.format("%Y-%m-%d %H:%M").to_string(),
        key_style,
    ));
    lines.push(field(
        "Updated",
        detail.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        key_style,
    ));
    lines.push(Line::from(""));

    if detail.description.trim().is_empty() {
        lines.push(Line::from(Span::styled(" No description", key_style)));
    } else {
        for text in unicode::wrap_to_width(&detail.description, width) {
            lines.push(Line::from(Span::styled(format!(" {text}"), text_style)));
        }
    }

    push_relations(app, &mut lines, "Parents", &view.parents, true);
    push_relations(app, &mut lines, "Children", &view.children, false);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.highlight).bg(bg))
        .title(Span::styled(format!(" Task #{} ", detail.id), header_style))
        .style(Style::default().bg(bg));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .scroll((view.scroll, 0))
        .style(Style::default().bg(bg));
    frame.render_widget(paragraph, rect);
}

/// `from_child` reads each relation from the child's side
fn push_relations(
    app: &App,
    lines: &mut Vec<Line<'static>>,
    heading: &str,
    refs: &[TaskReference],
    from_child: bool,
) {
    if refs.is_empty() {
        return;
    }
    let bg = app.theme.background;
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(" {heading}"),
        Style::default()
            .fg(app.theme.text_bright)
            .bg(bg)
            .add_modifier(Modifier::BOLD),
    )));
    for r in refs {
        let relation = if from_child {
            &r.relation_type.child_to_parent
        } else {
            &r.relation_type.parent_to_child
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {relation:<12}"),
                Style::default()
                    .fg(app.theme.stored_color(&r.relation_type.color))
                    .bg(bg),
            ),
            Span::styled(
                format!("#{} {}", r.id, r.title),
                Style::default().fg(app.theme.text).bg(bg),
            ),
            Span::styled(
                format!("  {}", r.column_name),
                Style::default().fg(app.theme.dim).bg(bg),
            ),
        ]));
    }
}
