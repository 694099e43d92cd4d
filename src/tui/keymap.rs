//! Key bindings, parsed once into [`Action`]s when the app starts.

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use indexmap::IndexMap;

use crate::io::config_io::ConfigError;
use crate::model::KeySpec;

/// Where an action is looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Board,
    /// Reserved keys inside forms
    Form,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    // Navigation
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    ScrollLeft,
    ScrollRight,
    // Task placement
    MoveTaskLeft,
    MoveTaskRight,
    MoveTaskUp,
    MoveTaskDown,
    // Tasks
    AddTask,
    EditTask,
    DeleteTask,
    ViewTask,
    // Columns
    AddColumn,
    RenameColumn,
    DeleteColumn,
    AddColumnForm,
    EditColumnForm,
    // Projects
    NewProject,
    EditProject,
    NextProject,
    PrevProject,
    // Pickers
    Labels,
    Parents,
    Children,
    Priority,
    TaskType,
    Status,
    // Misc
    Comments,
    Search,
    Help,
    Refresh,
    Quit,
    // Task form
    FormSave,
    FormLabels,
    FormParents,
    FormChildren,
    FormPriority,
    FormType,
    FormHelp,
}

/// (action, config name, description, default keys)
const ACTIONS: &[(Action, &str, &str, &[&str])] = &[
    (Action::MoveLeft, "move_left", "Previous column", &["left", "h"]),
    (Action::MoveRight, "move_right", "Next column", &["right", "l"]),
    (Action::MoveUp, "move_up", "Previous task", &["up", "k"]),
    (Action::MoveDown, "move_down", "Next task", &["down", "j"]),
    (Action::ScrollLeft, "scroll_left", "Scroll columns left", &["<"]),
    (Action::ScrollRight, "scroll_right", "Scroll columns right", &[">"]),
    (Action::MoveTaskLeft, "move_task_left", "Move task to previous column", &["H", "shift+left"]),
    (Action::MoveTaskRight, "move_task_right", "Move task to next column", &["L", "shift+right"]),
    (Action::MoveTaskUp, "move_task_up", "Move task up", &["K", "shift+up"]),
    (Action::MoveTaskDown, "move_task_down", "Move task down", &["J", "shift+down"]),
    (Action::AddTask, "add_task", "New task", &["a"]),
    (Action::EditTask, "edit_task", "Edit task", &["e"]),
    (Action::DeleteTask, "delete_task", "Delete task", &["d"]),
    (Action::ViewTask, "view_task", "View task", &["enter", "v"]),
    (Action::AddColumn, "add_column", "New column (inline)", &["C"]),
    (Action::RenameColumn, "rename_column", "Rename column (inline)", &["R"]),
    (Action::DeleteColumn, "delete_column", "Delete column", &["X"]),
    (Action::AddColumnForm, "add_column_form", "New column (form)", &["+"]),
    (Action::EditColumnForm, "edit_column_form", "Edit column (form)", &["="]),
    (Action::NewProject, "new_project", "New project", &["n"]),
    (Action::EditProject, "edit_project", "Edit project", &["N"]),
    (Action::NextProject, "next_project", "Next project", &["]"]),
    (Action::PrevProject, "prev_project", "Previous project", &["["]),
    (Action::Labels, "labels", "Labels", &["t"]),
    (Action::Parents, "parents", "Parent tasks", &["p"]),
    (Action::Children, "children", "Child tasks", &["P"]),
    (Action::Priority, "priority", "Priority", &["!"]),
    (Action::TaskType, "task_type", "Type", &["T"]),
    (Action::Status, "status", "Move to column", &["s"]),
    (Action::Comments, "comments", "Comments", &["c"]),
    (Action::Search, "search", "Search", &["/"]),
    (Action::Help, "help", "Help", &["?"]),
    (Action::Refresh, "refresh", "Reload from database", &["ctrl+r"]),
    (Action::Quit, "quit", "Quit", &["q", "ctrl+c"]),
    (Action::FormSave, "form_save", "Save now", &["ctrl+s"]),
    (Action::FormLabels, "form_labels", "Labels", &["ctrl+l"]),
    (Action::FormParents, "form_parents", "Parent tasks", &["ctrl+p"]),
    (Action::FormChildren, "form_children", "Child tasks", &["ctrl+o"]),
    (Action::FormPriority, "form_priority", "Priority", &["ctrl+r"]),
    (Action::FormType, "form_type", "Type", &["ctrl+t"]),
    (Action::FormHelp, "form_help", "Help", &["f1"]),
];

impl Action {
    pub fn scope(self) -> Scope {
        match self {
            Action::FormSave
            | Action::FormLabels
            | Action::FormParents
            | Action::FormChildren
            | Action::FormPriority
            | Action::FormType
            | Action::FormHelp => Scope::Form,
            _ => Scope::Board,
        }
    }

    fn entry(self) -> &'static (Action, &'static str, &'static str, &'static [&'static str]) {
        // Every variant has exactly one row
        ACTIONS
            .iter()
            .find(|(a, ..)| *a == self)
            .unwrap_or(&ACTIONS[0])
    }

    pub fn name(self) -> &'static str {
        self.entry().1
    }

    pub fn description(self) -> &'static str {
        self.entry().2
    }

    pub fn from_name(name: &str) -> Option<Action> {
        ACTIONS.iter().find(|(_, n, ..)| *n == name).map(|(a, ..)| *a)
    }

    pub fn all() -> impl Iterator<Item = Action> {
        ACTIONS.iter().map(|(a, ..)| *a)
    }
}

/// A key with modifiers, comparable against normalized key events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

/// Fold terminal quirks into one canonical form: characters carry their own
/// case, so SHIFT is dropped from `Char` keys; BackTab is Tab+SHIFT.
pub fn normalize_key(key: KeyEvent) -> KeyBinding {
    let mut code = key.code;
    let mut modifiers = key.modifiers;
    match code {
        KeyCode::Char(c) if modifiers.contains(KeyModifiers::SHIFT) => {
            if c.is_ascii_lowercase() {
                code = KeyCode::Char(c.to_ascii_uppercase());
            }
            modifiers.remove(KeyModifiers::SHIFT);
        }
        KeyCode::BackTab => {
            code = KeyCode::Tab;
            modifiers.insert(KeyModifiers::SHIFT);
        }
        _ => {}
    }
    KeyBinding { code, modifiers }
}

/// Parse "a", "A", "ctrl+s", "shift+left", "enter", "f1", "<", ...
pub fn parse_key(spec: &str) -> Option<KeyBinding> {
    let spec = spec.trim();
    if spec.is_empty() {
        return None;
    }
    // A bare "+" is the plus key, not a separator
    let (mods, key) = match spec.rsplit_once('+') {
        Some((mods, "")) => (mods.strip_suffix('+').unwrap_or(mods), "+"),
        Some((mods, key)) => (mods, key),
        None => ("", spec),
    };

    let mut modifiers = KeyModifiers::NONE;
    for m in mods.split('+').filter(|m| !m.is_empty()) {
        match m.to_ascii_lowercase().as_str() {
            "ctrl" | "control" => modifiers.insert(KeyModifiers::CONTROL),
            "alt" | "meta" => modifiers.insert(KeyModifiers::ALT),
            "shift" => modifiers.insert(KeyModifiers::SHIFT),
            _ => return None,
        }
    }

    let lower = key.to_ascii_lowercase();
    let code = match lower.as_str() {
        "enter" | "return" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "space" => KeyCode::Char(' '),
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        f if f.len() > 1 && f.starts_with('f') => KeyCode::F(f[1..].parse().ok()?),
        _ => {
            let mut chars = key.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            // ctrl+S and ctrl+s are the same chord
            if modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
                KeyCode::Char(c.to_ascii_lowercase())
            } else {
                KeyCode::Char(c)
            }
        }
    };

    if let KeyCode::Char(c) = code
        && modifiers.contains(KeyModifiers::SHIFT)
    {
        modifiers.remove(KeyModifiers::SHIFT);
        return Some(KeyBinding {
            code: KeyCode::Char(c.to_ascii_uppercase()),
            modifiers,
        });
    }
    Some(KeyBinding { code, modifiers })
}

/// Key → action tables, one per scope
#[derive(Debug, Clone)]
pub struct KeyMap {
    tables: HashMap<Scope, HashMap<KeyBinding, Action>>,
    /// Key names per action, in config order, for help screens
    names: IndexMap<Action, Vec<String>>,
}

impl Default for KeyMap {
    fn default() -> Self {
        let overrides = IndexMap::new();
        // Built-in defaults always parse
        Self::from_config(&overrides).unwrap_or_else(|_| KeyMap {
            tables: HashMap::new(),
            names: IndexMap::new(),
        })
    }
}

impl KeyMap {
    /// Defaults with `[keys]` overrides applied; an override replaces every
    /// default key of that action.
    pub fn from_config(overrides: &IndexMap<String, KeySpec>) -> Result<Self, ConfigError> {
        let mut names: IndexMap<Action, Vec<String>> = ACTIONS
            .iter()
            .map(|(a, _, _, keys)| (*a, keys.iter().map(|k| k.to_string()).collect()))
            .collect();

        for (name, spec) in overrides {
            let action =
                Action::from_name(name).ok_or_else(|| ConfigError::UnknownAction(name.clone()))?;
            names.insert(action, spec.keys().into_iter().map(String::from).collect());
        }

        let mut tables: HashMap<Scope, HashMap<KeyBinding, Action>> = HashMap::new();
        for (action, keys) in &names {
            for key in keys {
                let binding = parse_key(key).ok_or_else(|| ConfigError::InvalidKey {
                    action: action.name().to_string(),
                    key: key.clone(),
                })?;
                tables
                    .entry(action.scope())
                    .or_default()
                    .insert(binding, *action);
            }
        }
        Ok(KeyMap { tables, names })
    }

    pub fn lookup(&self, scope: Scope, key: KeyEvent) -> Option<Action> {
        self.tables.get(&scope)?.get(&normalize_key(key)).copied()
    }

    /// Key names bound to `action`, joined for display ("left/h")
    pub fn keys_label(&self, action: Action) -> String {
        self.names
            .get(&action)
            .map(|keys| keys.join("/"))
            .unwrap_or_default()
    }
}
