use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::model::NoticeLevel;

/// Oldest notices are dropped beyond this many
const MAX_NOTICES: usize = 5;

/// A transient, leveled message shown in the status row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub expires_at: Instant,
}

/// Auto-expiring notification queue
#[derive(Debug, Clone)]
pub struct Notices {
    items: VecDeque<Notice>,
    ttl: Duration,
}

impl Notices {
    pub fn new(ttl: Duration) -> Self {
        Notices {
            items: VecDeque::new(),
            ttl,
        }
    }

    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.push_at(level, message, Instant::now());
    }

    fn push_at(&mut self, level: NoticeLevel, message: impl Into<String>, now: Instant) {
        self.items.push_back(Notice {
            level,
            message: message.into(),
            expires_at: now + self.ttl,
        });
        while self.items.len() > MAX_NOTICES {
            self.items.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message);
    }

    /// Drop everything that has expired by `now`
    pub fn expire(&mut self, now: Instant) {
        self.items.retain(|n| n.expires_at > now);
    }

    /// Newest live notice
    pub fn latest(&self) -> Option<&Notice> {
        self.items.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_is_newest() {
        let mut n = Notices::new(Duration::from_secs(4));
        n.info("one");
        n.error("two");
        let latest = n.latest().unwrap();
        assert_eq!(latest.message, "two");
        assert_eq!(latest.level, NoticeLevel::Error);
    }

    #[test]
    fn notices_expire_after_ttl() {
        let mut n = Notices::new(Duration::from_secs(4));
        let start = Instant::now();
        n.push_at(NoticeLevel::Info, "old", start);
        n.push_at(NoticeLevel::Info, "new", start + Duration::from_secs(3));

        n.expire(start + Duration::from_secs(5));
        let left: Vec<&str> = n.iter().map(|x| x.message.as_str()).collect();
        assert_eq!(left, vec!["new"]);

        n.expire(start + Duration::from_secs(8));
        assert!(n.is_empty());
    }

    #[test]
    fn queue_is_bounded() {
        let mut n = Notices::new(Duration::from_secs(4));
        for i in 0..8 {
            n.warn(format!("w{i}"));
        }
        assert_eq!(n.iter().count(), MAX_NOTICES);
        assert_eq!(n.iter().next().unwrap().message, "w3");
    }
}
