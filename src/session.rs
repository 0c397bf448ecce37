//! Publishes a signal when the data service reports that the session is no
//! longer authorized.
//!
//! Anything holding session bound state subscribes to [SessionEvents] and
//! resets itself when it hears [SessionEvent::Invalidated].

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::{
    Error,
    date_range::DateRange,
    record::{NewRecord, Record, RecordId, RecordUpdate},
    service::{RecordQuery, RecordService},
};

/// A change to the session that subscribers must react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A request was refused because the session is no longer authorized.
    Invalidated,
}

/// The broadcast channel that session events are published on.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    /// Create a channel with no subscribers.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    /// Listen for session events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Tell every subscriber that the session is no longer valid.
    pub fn invalidate(&self) {
        tracing::warn!("Session invalidated, notifying subscribers.");
        // No subscribers just means nothing needs resetting.
        let _ = self.sender.send(SessionEvent::Invalidated);
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps a [RecordService] and publishes [SessionEvent::Invalidated] whenever
/// the wrapped service returns [Error::Unauthorized].
pub struct SessionGuardedService<S> {
    inner: S,
    events: SessionEvents,
}

impl<S> SessionGuardedService<S> {
    /// Guard `inner`, publishing on `events`.
    pub fn new(inner: S, events: SessionEvents) -> Self {
        Self { inner, events }
    }

    /// The wrapped service.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check<T>(&self, result: Result<T, Error>) -> Result<T, Error> {
        if let Err(Error::Unauthorized) = result {
            self.events.invalidate();
        }

        result
    }
}

#[async_trait]
impl<S: RecordService> RecordService for SessionGuardedService<S> {
    async fn fetch_records(&self, query: &RecordQuery) -> Result<Vec<Record>, Error> {
        self.check(self.inner.fetch_records(query).await)
    }

    async fn fetch_primary_rollup(&self, range: DateRange) -> Result<Vec<Value>, Error> {
        self.check(self.inner.fetch_primary_rollup(range).await)
    }

    async fn fetch_secondary_rollup(
        &self,
        primary_category: &str,
        range: DateRange,
    ) -> Result<Vec<Value>, Error> {
        self.check(
            self.inner
                .fetch_secondary_rollup(primary_category, range)
                .await,
        )
    }

    async fn create_record(&self, new_record: NewRecord) -> Result<Record, Error> {
        self.check(self.inner.create_record(new_record).await)
    }

    async fn update_record(&self, id: &RecordId, update: RecordUpdate) -> Result<Record, Error> {
        self.check(self.inner.update_record(id, update).await)
    }

    async fn delete_record(&self, id: &RecordId) -> Result<(), Error> {
        self.check(self.inner.delete_record(id).await)
    }

    async fn categorize_pending(&self) -> Result<usize, Error> {
        self.check(self.inner.categorize_pending().await)
    }
}
