use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::Span;

use crate::util::unicode;

/// Compute total display width of a slice of spans
pub(super) fn spans_width(spans: &[Span]) -> usize {
    spans
        .iter()
        .map(|s| unicode::display_width(&s.content))
        .sum()
}

/// Pad `spans` so `right` ends flush with `width`. `right` is dropped when it
/// does not fit.
pub(super) fn push_right_aligned<'a>(
    spans: &mut Vec<Span<'a>>,
    right: Vec<Span<'a>>,
    width: usize,
    bg: Color,
) {
    let used = spans_width(spans);
    let right_width = spans_width(&right);
    if used + right_width < width {
        spans.push(Span::styled(
            " ".repeat(width - used - right_width),
            Style::default().bg(bg),
        ));
        spans.extend(right);
    }
}

/// Create a centered rectangle of the given percentage of the parent
pub(super) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

pub(super) fn centered_rect_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}

/// Text with a block cursor drawn at byte offset `cursor`, split into lines
pub(super) fn with_cursor(value: &str, cursor: usize, show: bool) -> Vec<String> {
    let mut text = value.to_string();
    if show && text.is_char_boundary(cursor) {
        text.insert(cursor, '\u{258C}');
    }
    text.split('\n').map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cursor_lands_inside_the_right_line() {
        assert_eq!(with_cursor("ab\ncd", 4, true), vec!["ab", "c\u{258C}d"]);
        assert_eq!(with_cursor("ab", 2, false), vec!["ab"]);
    }

    #[test]
    fn fixed_rect_is_clamped_to_area() {
        let area = Rect::new(0, 0, 20, 10);
        assert_eq!(centered_rect_fixed(40, 4, area), Rect::new(0, 3, 20, 4));
    }
}
