use std::{sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, GroupInfo, MessageId},
    ports::ChatBackend,
    Result,
};

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// ChatBackend decorator that spaces out delete requests.
///
/// Telegram still answers with flood waits when it wants to; this only lowers
/// how often that happens on very large cleanups. Reads pass straight through.
pub struct ThrottledBackend {
    inner: Arc<dyn ChatBackend>,
    deletes: Mutex<IntervalLimiter>,
}

impl ThrottledBackend {
    pub fn new(inner: Arc<dyn ChatBackend>, min_interval: Duration) -> Self {
        Self {
            inner,
            deletes: Mutex::new(IntervalLimiter::new(min_interval)),
        }
    }
}

#[async_trait::async_trait]
impl ChatBackend for ThrottledBackend {
    async fn list_groups(&self) -> Result<Vec<GroupInfo>> {
        self.inner.list_groups().await
    }

    async fn own_message_ids(&self, chat: ChatId, limit: usize) -> Result<Vec<MessageId>> {
        self.inner.own_message_ids(chat, limit).await
    }

    async fn delete_messages(&self, chat: ChatId, ids: &[MessageId]) -> Result<usize> {
        let wait = { self.deletes.lock().await.reserve() };
        if wait > Duration::from_millis(0) {
            sleep(wait).await;
        }
        self.inner.delete_messages(chat, ids).await
    }
}
