use std::time::Duration;

use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;

use crate::model::{Column, ColumnId, Project, TaskId, TaskSummary};
use crate::store::SqliteStore;
use crate::tui::app::{App, Settings};
use crate::tui::keymap::KeyMap;
use crate::tui::sync::SyncClient;
use crate::tui::theme::Theme;

pub const TERM_W: u16 = 80;
pub const TERM_H: u16 = 24;

/// Render into an in-memory buffer and return plain text (no styles).
pub fn render_to_string<F>(w: u16, h: u16, f: F) -> String
where
    F: FnOnce(&mut ratatui::Frame, Rect),
{
    let backend = TestBackend::new(w, h);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal
        .draw(|frame| {
            let area = frame.area();
            f(frame, area);
        })
        .unwrap();

    let buf = terminal.backend().buffer().clone();
    let w = buf.area.width as usize;
    let lines: Vec<String> = buf
        .content
        .chunks(w)
        .map(|row| {
            let s: String = row.iter().map(|cell| cell.symbol()).collect();
            s.trim_end().to_string()
        })
        .collect();

    // Trim trailing blank lines
    let end = lines
        .iter()
        .rposition(|l| !l.is_empty())
        .map_or(0, |i| i + 1);
    lines[..end].join("\n")
}

pub fn summary(id: TaskId, column_id: ColumnId, position: usize, title: &str) -> TaskSummary {
    TaskSummary {
        id,
        column_id,
        title: title.to_string(),
        position,
        labels: Vec::new(),
        priority: "medium".into(),
        priority_color: "#FFD700".into(),
        task_type: "feature".into(),
        is_blocked: false,
    }
}

/// An app over an empty in-memory store with the board filled in by hand:
/// one project "Demo", the named columns, and `(column index, title)` tasks.
pub fn app_with_board(columns: &[&str], tasks: &[(usize, &str)]) -> App {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut app = App::new(
        Box::new(store),
        SyncClient::disabled(),
        KeyMap::default(),
        Theme::default(),
        Settings::default(),
        Duration::from_secs(5),
    );
    app.board.projects = vec![Project {
        id: 1,
        name: "Demo".into(),
        description: String::new(),
    }];
    app.board.project_id = 1;
    for (i, name) in columns.iter().enumerate() {
        let id = i as ColumnId + 1;
        app.board.columns.push(Column {
            id,
            project_id: 1,
            name: name.to_string(),
            prev_id: (i > 0).then(|| id - 1),
            next_id: (i + 1 < columns.len()).then(|| id + 1),
        });
        app.board.tasks.insert(id, Vec::new());
    }
    for (n, (column, title)) in tasks.iter().enumerate() {
        let column_id = *column as ColumnId + 1;
        let list = app.board.tasks.entry(column_id).or_default();
        let position = list.len();
        list.push(summary(n as TaskId + 1, column_id, position, title));
    }
    app
}
