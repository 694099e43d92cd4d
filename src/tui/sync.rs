//! Keeps the board in step with other instances through the event feed.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::io::feed::{FeedEvent, FeedSource};
use crate::model::{ProjectId, ALL_PROJECTS};

/// Wait before subscribing again after a listener went away
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Reconnecting,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Connected => "live",
            ConnectionState::Disconnected => "offline",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }
}

/// Text patterns some feeds use instead of lifecycle signals
struct NoticePatterns {
    lost: Regex,
    reconnected: Regex,
    failed: Regex,
}

impl NoticePatterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(NoticePatterns {
            lost: Regex::new(r"(?i)\bconnection lost\b")?,
            reconnected: Regex::new(r"(?i)^\s*reconnected\b")?,
            failed: Regex::new(r"(?i)\bfailed to reconnect\b")?,
        })
    }

    fn infer(&self, message: &str) -> Option<ConnectionState> {
        if self.failed.is_match(message) || self.lost.is_match(message) {
            Some(ConnectionState::Disconnected)
        } else if self.reconnected.is_match(message) {
            Some(ConnectionState::Connected)
        } else {
            None
        }
    }
}

pub struct SyncClient {
    source: Option<Box<dyn FeedSource>>,
    rx: Option<Receiver<FeedEvent>>,
    state: ConnectionState,
    subscriptions: usize,
    retry_at: Option<Instant>,
    patterns: Option<NoticePatterns>,
}

impl SyncClient {
    pub fn new(source: Option<Box<dyn FeedSource>>) -> Self {
        let patterns = match NoticePatterns::new() {
            Ok(p) => Some(p),
            Err(err) => {
                warn!(%err, "feed notice patterns failed to compile");
                None
            }
        };
        SyncClient {
            source,
            rx: None,
            state: ConnectionState::Disconnected,
            subscriptions: 0,
            retry_at: None,
            patterns,
        }
    }

    /// A client with no feed; every call is a no-op.
    pub fn disabled() -> Self {
        SyncClient::new(None)
    }

    pub fn is_enabled(&self) -> bool {
        self.source.is_some()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// How many listeners have been started so far
    pub fn subscriptions(&self) -> usize {
        self.subscriptions
    }

    pub fn is_listening(&self) -> bool {
        self.rx.is_some()
    }

    /// Make sure a listener is running. Safe to call any number of times:
    /// an existing listener is kept, and a failed subscribe is retried only
    /// after a delay.
    pub fn listen(&mut self, now: Instant) {
        if self.rx.is_some() {
            return;
        }
        if self.retry_at.is_some_and(|at| now < at) {
            return;
        }
        let Some(source) = self.source.as_mut() else {
            return;
        };
        match source.subscribe() {
            Ok(rx) => {
                self.subscriptions += 1;
                self.retry_at = None;
                self.rx = Some(rx);
                debug!(subscriptions = self.subscriptions, "listening to event feed");
            }
            Err(err) => {
                warn!(%err, "event feed subscribe failed");
                self.state = ConnectionState::Disconnected;
                self.retry_at = Some(now + RESUBSCRIBE_DELAY);
            }
        }
    }

    /// Next pending event, if any. A listener that hung up is dropped so
    /// the next `listen` starts a fresh one.
    pub fn try_next(&mut self, now: Instant) -> Option<FeedEvent> {
        let rx = self.rx.as_ref()?;
        match rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                info!("event feed listener stopped");
                self.rx = None;
                self.state = ConnectionState::Disconnected;
                self.retry_at = Some(now + RESUBSCRIBE_DELAY);
                None
            }
        }
    }

    /// Update the connection state from a received event.
    pub fn observe(&mut self, event: &FeedEvent) {
        let next = match event {
            FeedEvent::Connected => Some(ConnectionState::Connected),
            FeedEvent::ConnectionLost => Some(ConnectionState::Disconnected),
            FeedEvent::Reconnecting => Some(ConnectionState::Reconnecting),
            FeedEvent::Notice { message, .. } => {
                self.patterns.as_ref().and_then(|p| p.infer(message))
            }
            FeedEvent::Refresh { .. } => None,
        };
        if let Some(state) = next
            && state != self.state
        {
            info!(from = ?self.state, to = ?state, "feed connection state changed");
            self.state = state;
        }
    }
}

/// A refresh for `project_id` concerns the open project when it names it
/// or names every project.
pub fn should_refresh(project_id: ProjectId, open: ProjectId) -> bool {
    project_id == open || project_id == ALL_PROJECTS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::feed::FeedError;
    use crate::model::NoticeLevel;
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::sync::mpsc::{self, Sender};

    type Senders = Rc<RefCell<Vec<Sender<FeedEvent>>>>;

    /// Hands out channels and keeps the senders so tests can push events.
    struct FakeSource {
        senders: Senders,
        calls: Rc<Cell<usize>>,
        fail: bool,
    }

    impl FeedSource for FakeSource {
        fn subscribe(&mut self) -> Result<Receiver<FeedEvent>, FeedError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(FeedError::Io(std::io::Error::other("no journal")));
            }
            let (tx, rx) = mpsc::channel();
            self.senders.borrow_mut().push(tx);
            Ok(rx)
        }
    }

    fn client(fail: bool) -> (SyncClient, Senders, Rc<Cell<usize>>) {
        let senders: Senders = Rc::new(RefCell::new(Vec::new()));
        let calls = Rc::new(Cell::new(0));
        let source = FakeSource {
            senders: senders.clone(),
            calls: calls.clone(),
            fail,
        };
        (SyncClient::new(Some(Box::new(source))), senders, calls)
    }

    fn refresh(project_id: ProjectId) -> FeedEvent {
        FeedEvent::Refresh {
            project_id,
            payload: "task.created".into(),
        }
    }

    #[test]
    fn repeated_listen_keeps_one_listener_and_every_message() {
        let (mut sync, senders, calls) = client(false);
        let now = Instant::now();
        for _ in 0..10 {
            sync.listen(now);
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(sync.subscriptions(), 1);

        let tx = senders.borrow()[0].clone();
        for p in 1..=3 {
            tx.send(refresh(p)).unwrap();
        }
        let mut got = Vec::new();
        // subscribe → handle one → resubscribe
        while let Some(event) = sync.try_next(now) {
            got.push(event);
            sync.listen(now);
        }
        assert_eq!(got, vec![refresh(1), refresh(2), refresh(3)]);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn hung_up_listener_is_replaced_after_delay() {
        let (mut sync, senders, calls) = client(false);
        let now = Instant::now();
        sync.listen(now);
        senders.borrow_mut().clear();

        assert_eq!(sync.try_next(now), None);
        assert!(!sync.is_listening());
        assert_eq!(sync.state(), ConnectionState::Disconnected);

        sync.listen(now);
        assert_eq!(calls.get(), 1);
        sync.listen(now + RESUBSCRIBE_DELAY);
        assert_eq!(calls.get(), 2);
        assert!(sync.is_listening());
    }

    #[test]
    fn failed_subscribe_backs_off() {
        let (mut sync, _senders, calls) = client(true);
        let now = Instant::now();
        sync.listen(now);
        sync.listen(now + Duration::from_secs(1));
        assert_eq!(calls.get(), 1);
        assert_eq!(sync.subscriptions(), 0);
        sync.listen(now + RESUBSCRIBE_DELAY);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn lifecycle_signals_drive_state() {
        let mut sync = SyncClient::disabled();
        sync.observe(&FeedEvent::Connected);
        assert_eq!(sync.state(), ConnectionState::Connected);
        sync.observe(&FeedEvent::ConnectionLost);
        assert_eq!(sync.state(), ConnectionState::Disconnected);
        sync.observe(&FeedEvent::Reconnecting);
        assert_eq!(sync.state(), ConnectionState::Reconnecting);
        sync.observe(&refresh(1));
        assert_eq!(sync.state(), ConnectionState::Reconnecting);
    }

    #[test]
    fn notice_text_drives_state() {
        let mut sync = SyncClient::disabled();
        let notice = |m: &str| FeedEvent::Notice {
            level: NoticeLevel::Info,
            message: m.to_string(),
        };
        sync.observe(&notice("Reconnected to event feed"));
        assert_eq!(sync.state(), ConnectionState::Connected);
        sync.observe(&notice("Connection lost to server"));
        assert_eq!(sync.state(), ConnectionState::Disconnected);
        sync.observe(&notice("Reconnected"));
        sync.observe(&notice("Failed to reconnect to event feed"));
        assert_eq!(sync.state(), ConnectionState::Disconnected);
        sync.observe(&notice("Label created"));
        assert_eq!(sync.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn disabled_client_never_subscribes() {
        let mut sync = SyncClient::disabled();
        sync.listen(Instant::now());
        assert!(!sync.is_enabled());
        assert!(!sync.is_listening());
        assert_eq!(sync.try_next(Instant::now()), None);
    }

    #[test]
    fn refresh_filter() {
        assert!(should_refresh(3, 3));
        assert!(should_refresh(ALL_PROJECTS, 3));
        assert!(!should_refresh(4, 3));
    }
}
