use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5);
const MAX_NOTIFICATIONS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

/// Receiver for user-facing messages. Passed to whatever needs to report
/// something instead of being looked up globally.
pub trait Notifier {
    fn notify(&mut self, level: Level, message: String);
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: u64,
    pub level: Level,
    pub message: String,
    pub read: bool,
    #[serde(skip)]
    pub created: Instant,
}

impl Notification {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created) >= ttl
    }
}

/// Bounded list of recent notifications that expire after a fixed time.
#[derive(Debug)]
pub struct NotificationCenter {
    items: VecDeque<Notification>,
    next_id: u64,
    ttl: Duration,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl NotificationCenter {
    pub fn new(ttl: Duration) -> Self {
        Self {
            items: VecDeque::new(),
            next_id: 1,
            ttl,
        }
    }

    pub fn push(&mut self, level: Level, message: impl Into<String>, now: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        if self.items.len() == MAX_NOTIFICATIONS {
            self.items.pop_front();
        }
        self.items.push_back(Notification {
            id,
            level,
            message: message.into(),
            read: false,
            created: now,
        });
        id
    }

    /// Notifications that have not expired at `now`, oldest first.
    pub fn active(&self, now: Instant) -> impl Iterator<Item = &Notification> {
        let ttl = self.ttl;
        self.items.iter().filter(move |n| !n.is_expired(now, ttl))
    }

    /// Drops expired notifications, returning how many were removed.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.items.len();
        let ttl = self.ttl;
        self.items.retain(|n| !n.is_expired(now, ttl));
        before - self.items.len()
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    pub fn mark_all_read(&mut self) {
        for n in &mut self.items {
            n.read = true;
        }
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        self.items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Notifier for NotificationCenter {
    fn notify(&mut self, level: Level, message: String) {
        self.push(level, message, Instant::now());
    }
}
