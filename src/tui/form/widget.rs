use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::text_input::TextInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Line,
    Multiline,
}

#[derive(Debug, Clone)]
pub struct FormField {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub input: TextInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Editing,
    /// Submitted; the owner should commit
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMsg {
    Key(KeyEvent),
    Tick,
}

/// A vertical stack of labelled text fields. Enter on a single-line field
/// advances focus; on the last field it completes the form.
#[derive(Debug, Clone)]
pub struct Form {
    pub title: String,
    pub fields: Vec<FormField>,
    pub focus: usize,
    pub state: FormState,
    /// Cursor blink phase, flipped on every tick
    pub cursor_on: bool,
}

impl Form {
    pub fn new(title: impl Into<String>) -> Self {
        Form {
            title: title.into(),
            fields: Vec::new(),
            focus: 0,
            state: FormState::Editing,
            cursor_on: true,
        }
    }

    pub fn line(mut self, key: &'static str, label: &'static str, value: &str) -> Self {
        self.fields.push(FormField {
            key,
            label,
            kind: FieldKind::Line,
            input: TextInput::new(value),
        });
        self
    }

    pub fn multiline(mut self, key: &'static str, label: &'static str, value: &str) -> Self {
        self.fields.push(FormField {
            key,
            label,
            kind: FieldKind::Multiline,
            input: TextInput::multiline(value),
        });
        self
    }

    pub fn value(&self, key: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map_or("", |f| f.input.value())
    }

    pub fn focused(&self) -> Option<&FormField> {
        self.fields.get(self.focus)
    }

    pub fn is_completed(&self) -> bool {
        self.state == FormState::Completed
    }

    /// Force submission, as if Enter had been pressed on the last field
    pub fn complete(&mut self) {
        self.state = FormState::Completed;
    }

    pub fn update(&mut self, msg: FormMsg) {
        match msg {
            FormMsg::Tick => self.cursor_on = !self.cursor_on,
            FormMsg::Key(key) => {
                if self.state != FormState::Editing {
                    return;
                }
                self.cursor_on = true;
                self.handle_key(key);
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let Some(field) = self.fields.get_mut(self.focus) else {
            return;
        };
        if field.input.handle_key(key) {
            return;
        }
        let last = self.fields.len().saturating_sub(1);
        match key.code {
            KeyCode::Enter => {
                if self.focus >= last {
                    self.state = FormState::Completed;
                } else {
                    self.focus += 1;
                }
            }
            KeyCode::Tab if key.modifiers.contains(KeyModifiers::SHIFT) => self.focus_prev(),
            KeyCode::BackTab | KeyCode::Up => self.focus_prev(),
            KeyCode::Tab | KeyCode::Down => {
                if self.focus < last {
                    self.focus += 1;
                }
            }
            _ => {}
        }
    }

    fn focus_prev(&mut self) {
        self.focus = self.focus.saturating_sub(1);
    }
}
