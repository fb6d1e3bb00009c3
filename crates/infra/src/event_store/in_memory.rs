use std::collections::HashMap;
use std::sync::RwLock;

use bistro_core::{AggregateId, ExpectedVersion, TenantId};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Default)]
struct Streams {
    by_key: HashMap<StreamKey, Vec<StoredEvent>>,
    /// Stream keys in the order their first event was appended.
    created: Vec<StreamKey>,
}

/// In-memory append-only event store.
///
/// One write lock covers the version check and the append, so concurrent writers
/// to the same stream are serialized and the loser sees a concurrency error.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<Streams>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }

    fn poisoned() -> EventStoreError {
        EventStoreError::Unavailable("lock poisoned".to_string())
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(first) = events.first() else {
            return Ok(vec![]);
        };

        // All events must target the same tenant + aggregate stream.
        let tenant_id = first.tenant_id;
        let aggregate_id = first.aggregate_id;
        let aggregate_type = first.aggregate_type.clone();

        for (idx, e) in events.iter().enumerate() {
            if e.tenant_id != tenant_id {
                return Err(EventStoreError::TenantIsolation(format!(
                    "batch contains multiple tenant_ids (index {idx})"
                )));
            }
            if e.aggregate_id != aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate_ids (index {idx})"
                )));
            }
            if e.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }

        let key = StreamKey {
            tenant_id,
            aggregate_id,
        };

        let mut guard = self.streams.write().map_err(|_| Self::poisoned())?;
        let streams = &mut *guard;

        let stream = streams.by_key.entry(key).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        if let Some(existing) = stream.first() {
            if existing.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream aggregate_type is '{}', attempted append with '{}'",
                    existing.aggregate_type, aggregate_type
                )));
            }
        } else {
            streams.created.push(key);
        }

        let committed: Vec<StoredEvent> = events
            .into_iter()
            .zip(current + 1..)
            .map(|(e, seq)| StoredEvent::commit(e, seq))
            .collect();
        stream.extend(committed.iter().cloned());

        Ok(committed)
    }

    fn load_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let key = StreamKey {
            tenant_id,
            aggregate_id,
        };

        let streams = self.streams.read().map_err(|_| Self::poisoned())?;
        Ok(streams.by_key.get(&key).cloned().unwrap_or_default())
    }

    fn load_tenant(&self, tenant_id: TenantId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self.streams.read().map_err(|_| Self::poisoned())?;
        Ok(streams
            .created
            .iter()
            .filter(|k| k.tenant_id == tenant_id)
            .filter_map(|k| streams.by_key.get(k))
            .flatten()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn event(tenant_id: TenantId, aggregate_id: AggregateId, aggregate_type: &str) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            tenant_id,
            aggregate_id,
            aggregate_type: aggregate_type.to_string(),
            event_type: "test.event".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: json!({}),
        }
    }

    #[test]
    fn assigns_consecutive_sequence_numbers() {
        let store = InMemoryEventStore::new();
        let (t, a) = (TenantId::new(), AggregateId::new());

        let first = store
            .append(vec![event(t, a, "inventory.item"), event(t, a, "inventory.item")], ExpectedVersion::Exact(0))
            .unwrap();
        let second = store
            .append(vec![event(t, a, "inventory.item")], ExpectedVersion::Exact(2))
            .unwrap();

        assert_eq!(first.iter().map(|e| e.sequence_number).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(second[0].sequence_number, 3);
        assert_eq!(store.load_stream(t, a).unwrap().len(), 3);
    }

    #[test]
    fn stale_expected_version_is_rejected() {
        let store = InMemoryEventStore::new();
        let (t, a) = (TenantId::new(), AggregateId::new());
        store.append(vec![event(t, a, "inventory.item")], ExpectedVersion::Exact(0)).unwrap();

        let err = store
            .append(vec![event(t, a, "inventory.item")], ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
        assert_eq!(store.load_stream(t, a).unwrap().len(), 1);
    }

    #[test]
    fn stream_keeps_its_aggregate_type() {
        let store = InMemoryEventStore::new();
        let (t, a) = (TenantId::new(), AggregateId::new());
        store.append(vec![event(t, a, "menu.item")], ExpectedVersion::Any).unwrap();

        let err = store
            .append(vec![event(t, a, "recipes.recipe")], ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch(_)));
    }

    #[test]
    fn mixed_tenant_batch_is_rejected() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let err = store
            .append(
                vec![event(TenantId::new(), a, "menu.item"), event(TenantId::new(), a, "menu.item")],
                ExpectedVersion::Any,
            )
            .unwrap_err();
        assert!(matches!(err, EventStoreError::TenantIsolation(_)));
    }

    #[test]
    fn tenant_load_is_isolated_and_in_creation_order() {
        let store = InMemoryEventStore::new();
        let (t1, t2) = (TenantId::new(), TenantId::new());
        let (a, b) = (AggregateId::new(), AggregateId::new());

        store.append(vec![event(t1, b, "menu.item")], ExpectedVersion::Any).unwrap();
        store.append(vec![event(t2, a, "menu.item")], ExpectedVersion::Any).unwrap();
        store.append(vec![event(t1, a, "menu.item")], ExpectedVersion::Any).unwrap();
        store.append(vec![event(t1, b, "menu.item")], ExpectedVersion::Any).unwrap();

        let loaded = store.load_tenant(t1).unwrap();
        let order: Vec<_> = loaded.iter().map(|e| (e.aggregate_id, e.sequence_number)).collect();
        assert_eq!(order, vec![(b, 1), (b, 2), (a, 1)]);
        assert!(store.load_stream(t2, b).unwrap().is_empty());
    }
}
