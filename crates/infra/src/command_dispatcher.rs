//! Command execution pipeline.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load events from store (tenant-scoped)
//!   ↓
//! 2. Rehydrate aggregate (apply historical events)
//!   ↓
//! 3. Handle command (pure decision, produces events)
//!   ↓
//! 4. Append to store with ExpectedVersion::Exact(loaded version)
//!   ↓
//! 5. Publish committed events to the bus
//! ```
//!
//! Step 4 is what keeps a stock balance honest under concurrent writers: two
//! movements decided against the same revision cannot both be appended. The
//! loser gets `DispatchError::Concurrency`, and [`CommandDispatcher::dispatch_with_retry`]
//! reloads and decides again.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use bistro_core::{Aggregate, AggregateId, DomainError, ExpectedVersion, TenantId};
use bistro_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Optimistic concurrency failure (the stream moved on since it was loaded).
    #[error("concurrency conflict: {0}")]
    Concurrency(String),
    /// Business-level conflict (e.g. creating something that already exists).
    #[error("conflict: {0}")]
    Conflict(String),
    /// Tenant isolation violation (cross-tenant or cross-aggregate stream mixing).
    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    #[error("not found")]
    NotFound,
    /// Historical payloads could not be decoded into the aggregate's event type.
    #[error("failed to deserialize history: {0}")]
    Deserialize(String),
    #[error(transparent)]
    Store(EventStoreError),
    /// Publication failed after a successful append (at-least-once; the events are stored).
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl DispatchError {
    pub fn is_concurrency(&self) -> bool {
        matches!(self, DispatchError::Concurrency(_))
    }
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            EventStoreError::TenantIsolation(msg) => DispatchError::TenantIsolation(msg),
            EventStoreError::Decode(msg) => DispatchError::Deserialize(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Conflict(msg),
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
        }
    }
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// Generic over the store and bus so tests and the in-memory platform share the
/// exact code path.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
    max_concurrency_retries: u32,
}

impl<S, B> CommandDispatcher<S, B> {
    pub const DEFAULT_MAX_CONCURRENCY_RETRIES: u32 = 5;

    pub fn new(store: S, bus: B) -> Self {
        Self {
            store,
            bus,
            max_concurrency_retries: Self::DEFAULT_MAX_CONCURRENCY_RETRIES,
        }
    }

    pub fn with_max_concurrency_retries(mut self, retries: u32) -> Self {
        self.max_concurrency_retries = retries;
        self
    }

    pub fn max_concurrency_retries(&self) -> u32 {
        self.max_concurrency_retries
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Run one command through load → rehydrate → decide → append → publish.
    ///
    /// Returns the committed events (empty when the command was a no-op). A
    /// concurrent append to the same stream surfaces as
    /// `DispatchError::Concurrency`; nothing is written in that case.
    pub fn dispatch<A>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: &A::Command,
        make_aggregate: impl FnOnce(TenantId, AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: bistro_events::Event + Serialize + DeserializeOwned,
    {
        // 1) Load history (tenant-scoped)
        let history = self.store.load_stream(tenant_id, aggregate_id)?;
        validate_loaded_stream(tenant_id, aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        // 2) Rehydrate aggregate
        let mut aggregate = make_aggregate(tenant_id, aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;

        // 3) Decide events (no mutation)
        let decided = aggregate.handle(command)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        // 4) Persist (append-only, optimistic)
        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(tenant_id, aggregate_id, aggregate_type, Uuid::now_v7(), ev)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;
        debug!(
            tenant_id = %tenant_id,
            aggregate_id = %aggregate_id,
            aggregate_type,
            events = committed.len(),
            version = stream_version(&committed),
            "events committed"
        );

        // 5) Publish committed events (after append)
        self.bus
            .publish_all(committed.iter().map(StoredEvent::to_envelope))
            .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;

        Ok(committed)
    }

    /// [`dispatch`](Self::dispatch), re-run from a fresh load on concurrency conflicts.
    ///
    /// The command is decided again against the new state on every attempt, so a
    /// stock movement always chains onto the balance it was actually appended after.
    /// Gives up after `max_concurrency_retries` retries with the last conflict.
    pub fn dispatch_with_retry<A>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: &A::Command,
        make_aggregate: impl Fn(TenantId, AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: bistro_events::Event + Serialize + DeserializeOwned,
    {
        let mut attempt = 0u32;
        loop {
            match self.dispatch(tenant_id, aggregate_id, aggregate_type, command, &make_aggregate) {
                Err(err) if err.is_concurrency() && attempt < self.max_concurrency_retries => {
                    attempt += 1;
                    warn!(
                        tenant_id = %tenant_id,
                        aggregate_id = %aggregate_id,
                        aggregate_type,
                        attempt,
                        error = %err,
                        "concurrent write, retrying command"
                    );
                }
                other => return other,
            }
        }
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(
    tenant_id: TenantId,
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    // A misbehaving backend must not leak another tenant's events into a decision.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.tenant_id != tenant_id {
            return Err(DispatchError::TenantIsolation(format!(
                "loaded stream contains wrong tenant_id at index {idx}"
            )));
        }
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::TenantIsolation(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        if e.sequence_number != last + 1 {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "gap or reorder in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event = stored.decode()?;
        aggregate.apply(&ev);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use bistro_events::InMemoryEventBus;
    use bistro_menu::{
        AGGREGATE_TYPE, CreateMenuItem, MenuCommand, MenuItem, MenuItemDetails, MenuItemId,
        UpdateMenuItem,
    };
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use crate::event_store::InMemoryEventStore;

    type Dispatcher = CommandDispatcher<Arc<InMemoryEventStore>, Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>>;

    fn setup() -> Dispatcher {
        CommandDispatcher::new(Arc::new(InMemoryEventStore::new()), Arc::new(InMemoryEventBus::new()))
    }

    fn create(tenant_id: TenantId, id: MenuItemId) -> MenuCommand {
        MenuCommand::CreateMenuItem(CreateMenuItem {
            tenant_id,
            menu_item_id: id,
            details: MenuItemDetails::new("Soup", "starters", dec!(6.50)),
            occurred_at: Utc::now(),
        })
    }

    fn make(_: TenantId, id: AggregateId) -> MenuItem {
        MenuItem::empty(MenuItemId::new(id))
    }

    #[test]
    fn dispatch_persists_and_publishes() {
        let dispatcher = setup();
        let sub = dispatcher.bus().subscribe();
        let tenant_id = TenantId::new();
        let id = MenuItemId::new(AggregateId::new());

        let committed = dispatcher
            .dispatch(tenant_id, id.0, AGGREGATE_TYPE, &create(tenant_id, id), make)
            .unwrap();

        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].sequence_number, 1);
        assert_eq!(committed[0].event_type, "menu.item.created");

        let published = sub.try_recv().unwrap();
        assert_eq!(published.aggregate_type(), AGGREGATE_TYPE);
        assert_eq!(published.sequence_number(), 1);
    }

    #[test]
    fn domain_errors_are_mapped_and_nothing_is_stored() {
        let dispatcher = setup();
        let tenant_id = TenantId::new();
        let id = MenuItemId::new(AggregateId::new());

        let update = MenuCommand::UpdateMenuItem(UpdateMenuItem {
            tenant_id,
            menu_item_id: id,
            details: MenuItemDetails::new("Soup", "starters", dec!(7)),
            occurred_at: Utc::now(),
        });
        let err = dispatcher
            .dispatch(tenant_id, id.0, AGGREGATE_TYPE, &update, make)
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound));

        dispatcher
            .dispatch(tenant_id, id.0, AGGREGATE_TYPE, &create(tenant_id, id), make)
            .unwrap();
        let err = dispatcher
            .dispatch(tenant_id, id.0, AGGREGATE_TYPE, &create(tenant_id, id), make)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Conflict(_)));
        assert!(!err.is_concurrency());
        assert_eq!(dispatcher.store().load_stream(tenant_id, id.0).unwrap().len(), 1);
    }

    #[test]
    fn concurrency_error_maps_from_store() {
        let err: DispatchError = EventStoreError::Concurrency("expected 1, found 2".into()).into();
        assert!(err.is_concurrency());
    }
}
