//! Cross-instance change feed.
//!
//! Every instance appends a JSON line to a shared journal file after each
//! successful store mutation. A [`JournalFeed`] watches that file with
//! `notify`, reads whatever was appended since its last offset, and pushes
//! [`FeedEvent`]s into an mpsc channel drained by the TUI loop.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::model::{FeedConfig, NoticeLevel, ProjectId};

/// How long the listener waits for a watch event before re-reading anyway
const POLL_INTERVAL: Duration = Duration::from_secs(1);

pub const RECONNECTED_NOTICE: &str = "Reconnected to event feed";
pub const RECONNECT_FAILED_NOTICE: &str = "Failed to reconnect to event feed";

/// Error type for feed operations
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        source: notify::Error,
    },
    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("journal record error: {0}")]
    Record(#[from] serde_json::Error),
}

/// What the TUI loop receives from a feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Connected,
    ConnectionLost,
    Reconnecting,
    /// Data changed for `project_id` (0 = every project)
    Refresh {
        project_id: ProjectId,
        payload: String,
    },
    Notice {
        level: NoticeLevel,
        message: String,
    },
}

/// A push-style event source the sync client can (re)subscribe to.
pub trait FeedSource {
    /// Start a listener. The returned channel disconnects when the listener
    /// gives up, so a later call starts a fresh one.
    fn subscribe(&mut self) -> Result<Receiver<FeedEvent>, FeedError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Refresh,
    Notice,
}

/// One line of the journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Id of the instance that wrote the record
    pub origin: String,
    #[serde(default)]
    pub project_id: ProjectId,
    pub kind: RecordKind,
    #[serde(default)]
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<NoticeLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JournalRecord {
    fn into_event(self) -> FeedEvent {
        match self.kind {
            RecordKind::Refresh => FeedEvent::Refresh {
                project_id: self.project_id,
                payload: self.payload,
            },
            RecordKind::Notice => FeedEvent::Notice {
                level: self.level.unwrap_or(NoticeLevel::Info),
                message: self.message.unwrap_or_default(),
            },
        }
    }
}

/// Unique-enough id for this process, used to skip our own records.
pub fn instance_origin() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{}-{:x}", std::process::id(), nanos)
}

/// Journal size past which the next append starts the file over
pub const MAX_JOURNAL_BYTES: u64 = 1024 * 1024;

/// Append side of the journal.
///
/// Records only say that something changed, so old ones are worthless once
/// read. When the file grows past `max_bytes` the next append truncates it
/// first; listeners notice the shorter file and read from the start. A
/// listener that was behind at that moment misses those records and catches
/// up on the next one.
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
    origin: String,
    max_bytes: u64,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>, origin: impl Into<String>) -> Self {
        Journal {
            path: path.into(),
            origin: origin.into(),
            max_bytes: MAX_JOURNAL_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn append(&self, record: &JournalRecord) -> Result<(), FeedError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let len = file.metadata()?.len();
        if len > self.max_bytes {
            debug!(path = %self.path.display(), len, "compacting event journal");
            file.set_len(0)?;
        }
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    pub fn publish_refresh(&self, project_id: ProjectId, payload: &str) -> Result<(), FeedError> {
        self.append(&JournalRecord {
            origin: self.origin.clone(),
            project_id,
            kind: RecordKind::Refresh,
            payload: payload.to_string(),
            level: None,
            message: None,
        })
    }

    pub fn publish_notice(&self, level: NoticeLevel, message: &str) -> Result<(), FeedError> {
        self.append(&JournalRecord {
            origin: self.origin.clone(),
            project_id: 0,
            kind: RecordKind::Notice,
            payload: String::new(),
            level: Some(level),
            message: Some(message.to_string()),
        })
    }
}

/// Subscriber side of the journal.
pub struct JournalFeed {
    path: PathBuf,
    origin: String,
    reconnect_attempts: u32,
    reconnect_backoff: Duration,
}

impl JournalFeed {
    pub fn new(path: impl Into<PathBuf>, origin: impl Into<String>, config: &FeedConfig) -> Self {
        JournalFeed {
            path: path.into(),
            origin: origin.into(),
            reconnect_attempts: config.reconnect_attempts,
            reconnect_backoff: Duration::from_millis(config.reconnect_backoff_ms),
        }
    }
}

impl FeedSource for JournalFeed {
    fn subscribe(&mut self) -> Result<Receiver<FeedEvent>, FeedError> {
        ensure_journal(&self.path)?;
        let offset = fs::metadata(&self.path)?.len();
        let (watcher, changes) = watch_journal(&self.path)?;

        let (tx, rx) = mpsc::channel();
        let listener = Listener {
            path: self.path.clone(),
            origin: self.origin.clone(),
            offset,
            reconnect_attempts: self.reconnect_attempts,
            reconnect_backoff: self.reconnect_backoff,
        };
        thread::Builder::new()
            .name("lanes-feed".to_string())
            .spawn(move || listener.run(watcher, changes, tx))?;
        debug!(path = %self.path.display(), offset, "subscribed to event journal");
        Ok(rx)
    }
}

/// What the notify callback tells the listener thread
#[derive(Debug)]
enum WatchSignal {
    Changed,
    Removed,
    Failed(String),
}

fn ensure_journal(path: &Path) -> Result<(), FeedError> {
    OpenOptions::new().create(true).append(true).open(path)?;
    Ok(())
}

fn watch_journal(path: &Path) -> Result<(RecommendedWatcher, Receiver<WatchSignal>), FeedError> {
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = path.file_name().map(|n| n.to_os_string());
    let (tx, rx) = mpsc::channel();

    let watch_err = |source| FeedError::Watch {
        path: path.to_path_buf(),
        source,
    };
    let mut watcher = RecommendedWatcher::new(
        move |result: Result<Event, notify::Error>| {
            let signal = match result {
                Ok(event) => {
                    // The directory is watched; only the journal itself matters
                    if !event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == file_name.as_deref())
                    {
                        return;
                    }
                    match event.kind {
                        EventKind::Remove(_) => WatchSignal::Removed,
                        EventKind::Create(_) | EventKind::Modify(_) => WatchSignal::Changed,
                        _ => return,
                    }
                }
                Err(err) => WatchSignal::Failed(err.to_string()),
            };
            let _ = tx.send(signal);
        },
        Config::default(),
    )
    .map_err(watch_err)?;
    watcher
        .watch(dir, RecursiveMode::NonRecursive)
        .map_err(watch_err)?;
    Ok((watcher, rx))
}

struct Listener {
    path: PathBuf,
    origin: String,
    offset: u64,
    reconnect_attempts: u32,
    reconnect_backoff: Duration,
}

impl Listener {
    fn run(
        mut self,
        mut watcher: RecommendedWatcher,
        mut changes: Receiver<WatchSignal>,
        tx: Sender<FeedEvent>,
    ) {
        if tx.send(FeedEvent::Connected).is_err() {
            return;
        }
        loop {
            let lost = match changes.recv_timeout(POLL_INTERVAL) {
                Ok(WatchSignal::Changed) | Err(RecvTimeoutError::Timeout) => {
                    match self.drain(&tx) {
                        Ok(true) => None,
                        // Subscriber went away
                        Ok(false) => return,
                        Err(err) => Some(err.to_string()),
                    }
                }
                Ok(WatchSignal::Removed) => Some("journal removed".to_string()),
                Ok(WatchSignal::Failed(reason)) => Some(reason),
                Err(RecvTimeoutError::Disconnected) => Some("watcher stopped".to_string()),
            };

            let Some(reason) = lost else { continue };
            warn!(reason, "event feed connection lost");
            drop(watcher);
            if tx.send(FeedEvent::ConnectionLost).is_err() {
                return;
            }
            match self.reconnect(&tx) {
                Some((w, c)) => {
                    watcher = w;
                    changes = c;
                }
                None => return,
            }
        }
    }

    /// Forward complete lines appended since the last read. Returns false
    /// once the receiving side has hung up.
    fn drain(&mut self, tx: &Sender<FeedEvent>) -> Result<bool, FeedError> {
        for event in self.read_new()? {
            if tx.send(event).is_err() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn read_new(&mut self) -> Result<Vec<FeedEvent>, FeedError> {
        let mut file = File::open(&self.path)?;
        let len = file.metadata()?.len();
        if len < self.offset {
            // Truncated or replaced: start over
            self.offset = 0;
        }
        if len == self.offset {
            return Ok(Vec::new());
        }
        file.seek(SeekFrom::Start(self.offset))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;

        // A writer may be mid-line; leave the partial tail for next time
        let Some(end) = buf.iter().rposition(|&b| b == b'\n') else {
            return Ok(Vec::new());
        };
        let complete = &buf[..=end];
        self.offset += complete.len() as u64;

        let mut events = Vec::new();
        for raw in complete.split(|&b| b == b'\n') {
            let Ok(line) = std::str::from_utf8(raw) else {
                warn!(bytes = raw.len(), "skipping journal line that is not UTF-8");
                continue;
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalRecord>(line) {
                Ok(record) if record.origin == self.origin => {}
                Ok(record) => events.push(record.into_event()),
                Err(err) => warn!(error = %err, "skipping malformed journal line"),
            }
        }
        Ok(events)
    }

    fn reconnect(
        &mut self,
        tx: &Sender<FeedEvent>,
    ) -> Option<(RecommendedWatcher, Receiver<WatchSignal>)> {
        for attempt in 1..=self.reconnect_attempts {
            if tx.send(FeedEvent::Reconnecting).is_err() {
                return None;
            }
            thread::sleep(self.reconnect_backoff * attempt);
            match ensure_journal(&self.path).and_then(|_| watch_journal(&self.path)) {
                Ok(pair) => {
                    info!(attempt, "reconnected to event feed");
                    let _ = tx.send(FeedEvent::Connected);
                    let _ = tx.send(FeedEvent::Notice {
                        level: NoticeLevel::Info,
                        message: RECONNECTED_NOTICE.to_string(),
                    });
                    return Some(pair);
                }
                Err(err) => warn!(attempt, error = %err, "event feed reconnect failed"),
            }
        }
        let _ = tx.send(FeedEvent::Notice {
            level: NoticeLevel::Error,
            message: RECONNECT_FAILED_NOTICE.to_string(),
        });
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn listener(path: &Path, origin: &str) -> Listener {
        Listener {
            path: path.to_path_buf(),
            origin: origin.to_string(),
            offset: 0,
            reconnect_attempts: 0,
            reconnect_backoff: Duration::ZERO,
        }
    }

    #[test]
    fn record_serializes_as_one_json_line() {
        let record = JournalRecord {
            origin: "a".into(),
            project_id: 3,
            kind: RecordKind::Refresh,
            payload: "task.created".into(),
            level: None,
            message: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"origin":"a","project_id":3,"kind":"refresh","payload":"task.created"}"#
        );
    }

    #[test]
    fn read_new_skips_own_origin_and_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanes.events");
        let mine = Journal::new(&path, "me");
        let theirs = Journal::new(&path, "them");
        mine.publish_refresh(1, "task.created").unwrap();
        theirs.publish_refresh(2, "column.created").unwrap();
        fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"not json\n")
            .unwrap();
        theirs.publish_notice(NoticeLevel::Warning, "heads up").unwrap();

        let mut l = listener(&path, "me");
        let events = l.read_new().unwrap();
        assert_eq!(
            events,
            vec![
                FeedEvent::Refresh {
                    project_id: 2,
                    payload: "column.created".into()
                },
                FeedEvent::Notice {
                    level: NoticeLevel::Warning,
                    message: "heads up".into()
                },
            ]
        );
        assert!(l.read_new().unwrap().is_empty());
    }

    #[test]
    fn non_utf8_line_is_skipped_and_passed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanes.events");
        fs::write(&path, b"\xff\xfe garbage\n").unwrap();
        Journal::new(&path, "them").publish_refresh(4, "task.moved").unwrap();

        let mut l = listener(&path, "me");
        assert_eq!(
            l.read_new().unwrap(),
            vec![FeedEvent::Refresh {
                project_id: 4,
                payload: "task.moved".into()
            }]
        );
        assert_eq!(l.offset, fs::metadata(&path).unwrap().len());
        assert!(l.read_new().unwrap().is_empty());
    }

    #[test]
    fn oversized_journal_starts_over() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanes.events");
        let theirs = Journal::new(&path, "them").with_max_bytes(200);
        let mut l = listener(&path, "me");
        for i in 0..3 {
            theirs.publish_refresh(i, "task.created").unwrap();
        }
        assert_eq!(l.read_new().unwrap().len(), 3);
        let before = fs::metadata(&path).unwrap().len();
        assert!(before > 200);

        theirs.publish_refresh(9, "column.created").unwrap();
        assert!(fs::metadata(&path).unwrap().len() < before);
        assert_eq!(
            l.read_new().unwrap(),
            vec![FeedEvent::Refresh {
                project_id: 9,
                payload: "column.created".into()
            }]
        );
    }

    #[test]
    fn partial_line_waits_for_its_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanes.events");
        fs::write(&path, r#"{"origin":"x","project_id":1,"kind":"refresh""#).unwrap();

        let mut l = listener(&path, "me");
        assert!(l.read_new().unwrap().is_empty());

        let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b",\"payload\":\"p\"}\n").unwrap();
        assert_eq!(
            l.read_new().unwrap(),
            vec![FeedEvent::Refresh {
                project_id: 1,
                payload: "p".into()
            }]
        );
    }

    #[test]
    fn truncated_journal_is_read_from_the_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanes.events");
        let theirs = Journal::new(&path, "them");
        theirs.publish_refresh(1, "a").unwrap();
        theirs.publish_refresh(1, "b").unwrap();

        let mut l = listener(&path, "me");
        assert_eq!(l.read_new().unwrap().len(), 2);

        fs::write(&path, "").unwrap();
        theirs.publish_refresh(5, "c").unwrap();
        assert_eq!(
            l.read_new().unwrap(),
            vec![FeedEvent::Refresh {
                project_id: 5,
                payload: "c".into()
            }]
        );
    }

    #[test]
    fn reconnect_gives_up_with_failure_notice() {
        let dir = tempfile::tempdir().unwrap();
        // Parent directory does not exist, so the journal cannot be recreated
        let path = dir.path().join("missing").join("lanes.events");
        let mut l = listener(&path, "me");
        l.reconnect_attempts = 2;
        let (tx, rx) = mpsc::channel();

        assert!(l.reconnect(&tx).is_none());
        drop(tx);
        let events: Vec<FeedEvent> = rx.iter().collect();
        assert_eq!(
            events,
            vec![
                FeedEvent::Reconnecting,
                FeedEvent::Reconnecting,
                FeedEvent::Notice {
                    level: NoticeLevel::Error,
                    message: RECONNECT_FAILED_NOTICE.into()
                },
            ]
        );
    }
}
