//! Append-only per-stream event log backing HTTP session resumption.
//!
//! A client that reconnects with a `Last-Event-Id` header gets everything
//! recorded after that id replayed back to it before live traffic resumes.

use async_trait::async_trait;
use chatmcp_protocol::{McpError, McpResult};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

pub type StreamId = String;
pub type EventId = String;

#[derive(Debug, Clone)]
pub struct EventRecord {
    pub event_id: EventId,
    pub stream_id: StreamId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    pub fn new(stream_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            stream_id: stream_id.into(),
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// Storage backend for events. Implementations only need to support point
/// lookup by id and "everything in this event's stream created after it".
#[async_trait]
pub trait EventStoreAdapter: Send + Sync {
    async fn init_schema(&self) -> McpResult<()>;
    async fn insert_event(&self, event: EventRecord) -> McpResult<()>;
    async fn get_event(&self, event_id: &str) -> McpResult<Option<EventRecord>>;
    async fn get_events_after(&self, after_event_id: &str) -> McpResult<Vec<EventRecord>>;
}

/// Append-only log exposed to the session runtime. Wraps an
/// [`EventStoreAdapter`] and adds the stream-id bookkeeping replay needs.
pub struct EventStore {
    adapter: Arc<dyn EventStoreAdapter>,
}

impl EventStore {
    pub fn new(adapter: Arc<dyn EventStoreAdapter>) -> Self {
        Self { adapter }
    }

    pub async fn init(&self) -> McpResult<()> {
        self.adapter.init_schema().await
    }

    /// Append one frame to `stream_id`'s log, returning its new event id.
    pub async fn store_event(&self, stream_id: &str, message: &str) -> McpResult<EventId> {
        let event = EventRecord::new(stream_id, message);
        let event_id = event.event_id.clone();
        self.adapter.insert_event(event).await?;
        Ok(event_id)
    }

    /// Replay every event recorded after `last_event_id`, in order, via
    /// `send`. Returns the stream id `last_event_id` belongs to, or `None`
    /// if `last_event_id` itself is unknown — the caller should then treat
    /// the session as unresumable. A known anchor with nothing new since it
    /// still returns `Some`: the client is caught up, not unresumable, and
    /// `send` is simply never called.
    pub async fn replay_events_after<F>(&self, last_event_id: &str, mut send: F) -> McpResult<Option<StreamId>>
    where
        F: FnMut(&EventRecord) + Send,
    {
        let Some(anchor) = self.adapter.get_event(last_event_id).await? else {
            return Ok(None);
        };
        let events = self.adapter.get_events_after(last_event_id).await?;
        for event in &events {
            send(event);
        }
        Ok(Some(anchor.stream_id))
    }
}

/// In-memory reference adapter: one deque per stream plus a flat id index.
/// Events within a stream are already in arrival order, so "after id" is a
/// filter by `created_at`, not a sort.
#[derive(Default)]
pub struct InMemoryEventStore {
    inner: parking_lot::Mutex<InMemoryState>,
}

#[derive(Default)]
struct InMemoryState {
    streams: HashMap<StreamId, VecDeque<EventRecord>>,
    events: HashMap<EventId, EventRecord>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStoreAdapter for InMemoryEventStore {
    async fn init_schema(&self) -> McpResult<()> {
        Ok(())
    }

    async fn insert_event(&self, event: EventRecord) -> McpResult<()> {
        let mut state = self.inner.lock();
        state
            .streams
            .entry(event.stream_id.clone())
            .or_default()
            .push_back(event.clone());
        state.events.insert(event.event_id.clone(), event);
        Ok(())
    }

    async fn get_event(&self, event_id: &str) -> McpResult<Option<EventRecord>> {
        Ok(self.inner.lock().events.get(event_id).cloned())
    }

    async fn get_events_after(&self, after_event_id: &str) -> McpResult<Vec<EventRecord>> {
        let state = self.inner.lock();
        let Some(anchor) = state.events.get(after_event_id) else {
            return Ok(Vec::new());
        };
        let stream_events = state.streams.get(&anchor.stream_id);
        Ok(stream_events
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.created_at > anchor.created_at)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(feature = "sqlite-events")]
pub mod sqlite {
    use super::*;
    use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
    use sqlx::Row;

    /// Embedded-SQL reference adapter backed by `sqlx`'s SQLite driver.
    pub struct SqliteEventStore {
        pool: SqlitePool,
    }

    impl SqliteEventStore {
        pub async fn connect(database_url: &str) -> McpResult<Self> {
            let pool = SqlitePoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await
                .map_err(|e| McpError::internal(format!("failed to open event store db: {e}")))?;
            Ok(Self { pool })
        }
    }

    #[async_trait]
    impl EventStoreAdapter for SqliteEventStore {
        async fn init_schema(&self) -> McpResult<()> {
            sqlx::query(
                "CREATE TABLE IF NOT EXISTS events (
                    id TEXT PRIMARY KEY,
                    stream_id TEXT NOT NULL,
                    message TEXT NOT NULL,
                    created_at TIMESTAMP NOT NULL
                )",
            )
            .execute(&self.pool)
            .await
            .map_err(|e| McpError::internal(format!("failed to init event store schema: {e}")))?;
            Ok(())
        }

        async fn insert_event(&self, event: EventRecord) -> McpResult<()> {
            sqlx::query("INSERT INTO events (id, stream_id, message, created_at) VALUES (?, ?, ?, ?)")
                .bind(&event.event_id)
                .bind(&event.stream_id)
                .bind(&event.message)
                .bind(event.created_at)
                .execute(&self.pool)
                .await
                .map_err(|e| McpError::internal(format!("failed to insert event: {e}")))?;
            Ok(())
        }

        async fn get_event(&self, event_id: &str) -> McpResult<Option<EventRecord>> {
            let row = sqlx::query("SELECT id, stream_id, message, created_at FROM events WHERE id = ?")
                .bind(event_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| McpError::internal(format!("failed to read event: {e}")))?;
            Ok(row.map(|row| EventRecord {
                event_id: row.get("id"),
                stream_id: row.get("stream_id"),
                message: row.get("message"),
                created_at: row.get("created_at"),
            }))
        }

        async fn get_events_after(&self, after_event_id: &str) -> McpResult<Vec<EventRecord>> {
            let Some(anchor) = self.get_event(after_event_id).await? else {
                tracing::warn!(after_event_id, "replay anchor event not found");
                return Ok(Vec::new());
            };
            let rows = sqlx::query(
                "SELECT id, stream_id, message, created_at FROM events
                 WHERE stream_id = ? AND created_at > ? ORDER BY created_at ASC",
            )
            .bind(&anchor.stream_id)
            .bind(anchor.created_at)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| McpError::internal(format!("failed to replay events: {e}")))?;
            Ok(rows
                .into_iter()
                .map(|row| EventRecord {
                    event_id: row.get("id"),
                    stream_id: row.get("stream_id"),
                    message: row.get("message"),
                    created_at: row.get("created_at"),
                })
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replay_returns_tail_of_owning_stream() {
        let adapter = Arc::new(InMemoryEventStore::new());
        let store = EventStore::new(adapter);
        let first = store.store_event("stream-a", "hello").await.unwrap();
        store.store_event("stream-a", "world").await.unwrap();
        store.store_event("stream-b", "unrelated").await.unwrap();

        let mut replayed = Vec::new();
        let stream = store
            .replay_events_after(&first, |event| replayed.push(event.message.clone()))
            .await
            .unwrap();
        assert_eq!(stream, Some("stream-a".to_string()));
        assert_eq!(replayed, vec!["world".to_string()]);
    }

    #[tokio::test]
    async fn replay_of_unknown_id_returns_none() {
        let adapter = Arc::new(InMemoryEventStore::new());
        let store = EventStore::new(adapter);
        let stream = store.replay_events_after("does-not-exist", |_| {}).await.unwrap();
        assert_eq!(stream, None);
    }

    #[tokio::test]
    async fn replay_of_known_anchor_at_the_tail_is_resumable_with_nothing_new() {
        let adapter = Arc::new(InMemoryEventStore::new());
        let store = EventStore::new(adapter);
        let only = store.store_event("stream-a", "hello").await.unwrap();

        let mut replayed = Vec::new();
        let stream = store.replay_events_after(&only, |event| replayed.push(event.message.clone())).await.unwrap();
        assert_eq!(stream, Some("stream-a".to_string()));
        assert!(replayed.is_empty());
    }
}
