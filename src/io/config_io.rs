use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::AppConfig;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid key \"{key}\" bound to {action}")]
    InvalidKey { action: String, key: String },
    #[error("unknown action \"{0}\" in [keys]")]
    UnknownAction(String),
}

/// Where the database, journal, log and UI state live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub db: PathBuf,
    pub journal: PathBuf,
    pub log: PathBuf,
    pub state: PathBuf,
}

/// `<config_dir>/lanes/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lanes").join("config.toml"))
}

/// `<data_dir>/lanes`, or `./.lanes` on platforms without a data dir
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("lanes"))
        .unwrap_or_else(|| PathBuf::from(".lanes"))
}

/// Load the config file.
///
/// An explicit `path` must exist. Without one the default location is tried
/// and a missing file means all defaults.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => return Ok(AppConfig::default()),
        },
    };

    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(AppConfig::default());
        }
        Err(source) => return Err(ConfigError::Read { path, source }),
    };
    toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })
}

/// Fill in every path the config leaves unset.
pub fn resolve_paths(config: &AppConfig) -> Paths {
    let data = data_dir();
    let db = config
        .store
        .path
        .clone()
        .unwrap_or_else(|| data.join("lanes.db"));
    let journal = config
        .feed
        .journal
        .clone()
        .unwrap_or_else(|| db.with_extension("events"));
    let log = config
        .log
        .path
        .clone()
        .unwrap_or_else(|| data.join("lanes.log"));
    let state = db.with_extension("state.json");
    Paths {
        db,
        journal,
        log,
        state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::KeySpec;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const SAMPLE: &str = r##"
[store]
path = "/tmp/board.db"
timeout_ms = 500

[feed]
enabled = false
reconnect_attempts = 2

[ui]
column_width = 28

[ui.colors]
accent = "#FF00FF"

[log]
filter = "lanes=debug"

[keys]
add_task = "a"
quit = ["q", "ctrl+c"]
"##;

    #[test]
    fn parses_every_section() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, SAMPLE).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.store.path, Some(PathBuf::from("/tmp/board.db")));
        assert_eq!(config.store.timeout_ms, 500);
        assert!(!config.feed.enabled);
        assert_eq!(config.feed.reconnect_attempts, 2);
        assert_eq!(config.feed.reconnect_backoff_ms, 500);
        assert_eq!(config.ui.column_width, 28);
        assert_eq!(config.ui.notice_ttl_secs, 4);
        assert_eq!(config.ui.colors["accent"], "#FF00FF");
        assert_eq!(config.log.filter.as_deref(), Some("lanes=debug"));
        assert_eq!(config.keys["add_task"], KeySpec::One("a".into()));
        assert_eq!(config.keys["quit"].keys(), vec!["q", "ctrl+c"]);
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.store.timeout_ms, 2000);
        assert!(config.feed.enabled);
        assert_eq!(config.ui.column_width, 32);
        assert!(config.keys.is_empty());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[store\npath = ").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn journal_and_state_follow_the_database() {
        let mut config = AppConfig::default();
        config.store.path = Some(PathBuf::from("/data/work.db"));
        let paths = resolve_paths(&config);
        assert_eq!(paths.journal, PathBuf::from("/data/work.events"));
        assert_eq!(paths.state, PathBuf::from("/data/work.state.json"));
    }
}
