use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::util::unicode::{
    next_grapheme_boundary, offset_to_column, prev_grapheme_boundary, word_boundary_left,
};

/// Editable text buffer with a byte-offset cursor kept on grapheme
/// boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    cursor: usize,
    multiline: bool,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.len();
        TextInput {
            value,
            cursor,
            multiline: false,
        }
    }

    pub fn multiline(value: impl Into<String>) -> Self {
        TextInput {
            multiline: true,
            ..TextInput::new(value)
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Display column of the cursor within its line
    pub fn cursor_column(&self) -> usize {
        let line_start = self.value[..self.cursor].rfind('\n').map_or(0, |i| i + 1);
        offset_to_column(&self.value[line_start..], self.cursor - line_start)
    }

    /// Zero-based line the cursor is on
    pub fn cursor_line(&self) -> usize {
        self.value[..self.cursor].matches('\n').count()
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.cursor = self.value.len();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    pub fn insert_str(&mut self, text: &str) {
        let text = if self.multiline {
            text.replace('\r', "")
        } else {
            text.replace(['\n', '\r'], " ")
        };
        self.value.insert_str(self.cursor, &text);
        self.cursor += text.len();
    }

    /// Apply an editing key. Returns false for keys the input does not use,
    /// so the caller can treat them as navigation.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('w') if ctrl => {
                let start = word_boundary_left(&self.value, self.cursor);
                self.value.replace_range(start..self.cursor, "");
                self.cursor = start;
            }
            KeyCode::Char('u') if ctrl => {
                self.value.replace_range(..self.cursor, "");
                self.cursor = 0;
            }
            KeyCode::Char('a') if ctrl => self.cursor = 0,
            KeyCode::Char('e') if ctrl => self.cursor = self.value.len(),
            KeyCode::Char(_) if ctrl || key.modifiers.contains(KeyModifiers::ALT) => return false,
            KeyCode::Char(c) => {
                self.value.insert(self.cursor, c);
                self.cursor += c.len_utf8();
            }
            KeyCode::Enter if self.multiline => {
                self.value.insert(self.cursor, '\n');
                self.cursor += 1;
            }
            KeyCode::Backspace => {
                if let Some(prev) = prev_grapheme_boundary(&self.value, self.cursor) {
                    self.value.replace_range(prev..self.cursor, "");
                    self.cursor = prev;
                }
            }
            KeyCode::Delete => {
                if let Some(next) = next_grapheme_boundary(&self.value, self.cursor) {
                    self.value.replace_range(self.cursor..next, "");
                }
            }
            KeyCode::Left => {
                if let Some(prev) = prev_grapheme_boundary(&self.value, self.cursor) {
                    self.cursor = prev;
                }
            }
            KeyCode::Right => {
                if let Some(next) = next_grapheme_boundary(&self.value, self.cursor) {
                    self.cursor = next;
                }
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.len(),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(input: &mut TextInput, code: KeyCode) -> bool {
        input.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(input: &mut TextInput, s: &str) {
        for c in s.chars() {
            press(input, KeyCode::Char(c));
        }
    }

    #[test]
    fn typing_inserts_at_cursor() {
        let mut input = TextInput::new("ac");
        press(&mut input, KeyCode::Left);
        type_str(&mut input, "b");
        assert_eq!(input.value(), "abc");
        assert_eq!(input.cursor(), 2);
    }

    #[test]
    fn backspace_removes_whole_grapheme() {
        let mut input = TextInput::new("née日");
        press(&mut input, KeyCode::Backspace);
        assert_eq!(input.value(), "née");
        press(&mut input, KeyCode::Backspace);
        assert_eq!(input.value(), "né");
        press(&mut input, KeyCode::Home);
        press(&mut input, KeyCode::Backspace);
        assert_eq!(input.value(), "né");
    }

    #[test]
    fn ctrl_w_deletes_word() {
        let mut input = TextInput::new("write the spec");
        input.handle_key(KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL));
        assert_eq!(input.value(), "write the ");
    }

    #[test]
    fn enter_only_breaks_lines_in_multiline() {
        let mut line = TextInput::new("a");
        assert!(!press(&mut line, KeyCode::Enter));
        assert_eq!(line.value(), "a");

        let mut text = TextInput::multiline("a");
        assert!(press(&mut text, KeyCode::Enter));
        type_str(&mut text, "bc");
        assert_eq!(text.value(), "a\nbc");
        assert_eq!(text.cursor_line(), 1);
        assert_eq!(text.cursor_column(), 2);
    }

    #[test]
    fn paste_flattens_newlines_in_single_line() {
        let mut input = TextInput::new("");
        input.insert_str("one\ntwo");
        assert_eq!(input.value(), "one two");
    }

    #[test]
    fn navigation_keys_are_not_consumed() {
        let mut input = TextInput::new("x");
        assert!(!press(&mut input, KeyCode::Up));
        assert!(!press(&mut input, KeyCode::Tab));
        assert!(!input.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)));
    }
}
