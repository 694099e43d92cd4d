use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::ProjectId;

/// Persisted TUI state, written next to the database on exit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UiState {
    /// Project that was open
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    /// Selected column index
    #[serde(default)]
    pub column: usize,
    /// Selected task index within that column
    #[serde(default)]
    pub task: usize,
    /// First visible column
    #[serde(default)]
    pub offset: usize,
}

/// Read the state file. Missing or malformed files yield None.
pub fn read_ui_state(path: &Path) -> Option<UiState> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

pub fn write_ui_state(path: &Path, state: &UiState) -> Result<(), std::io::Error> {
    let content = serde_json::to_string_pretty(state)?;
    fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lanes.state.json");
        let state = UiState {
            project_id: Some(4),
            column: 2,
            task: 1,
            offset: 1,
        };

        write_ui_state(&path, &state).unwrap();
        assert_eq!(read_ui_state(&path), Some(state));
    }

    #[test]
    fn read_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_ui_state(&dir.path().join("nope.json")).is_none());
    }

    #[test]
    fn read_malformed_json_returns_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "not json {{{").unwrap();
        assert!(read_ui_state(&path).is_none());
    }

    #[test]
    fn serde_defaults_on_empty_object() {
        let state: UiState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, UiState::default());
    }
}
