use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;

use bistro_core::{AggregateId, TenantId};
use bistro_events::EventEnvelope;

use crate::event_store::EventStoreError;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to deserialize {aggregate_type} event: {message}")]
    Deserialize {
        aggregate_type: String,
        message: String,
    },

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

    /// The event store could not be read while catching up.
    #[error(transparent)]
    Store(#[from] EventStoreError),
}

impl ProjectionError {
    /// True when the projection missed envelopes and should catch up from the store.
    pub fn is_gap(&self) -> bool {
        matches!(self, ProjectionError::NonMonotonicSequence { .. })
    }
}

/// Tenant+aggregate cursor for at-least-once delivery.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

/// Last applied sequence number per stream.
///
/// Holding the write lock across decode and apply serializes updates within one
/// projection, so two threads delivering the same stream cannot interleave.
#[derive(Debug, Default)]
pub(crate) struct StreamCursors {
    cursors: RwLock<HashMap<CursorKey, u64>>,
}

impl StreamCursors {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Decode and apply `envelope` if it is the next one for its stream.
    ///
    /// Envelopes of other aggregate types are skipped.
    pub(crate) fn apply_next<E, F>(
        &self,
        envelope: &EventEnvelope<JsonValue>,
        aggregate_type: &str,
        apply: F,
    ) -> Result<(), ProjectionError>
    where
        E: DeserializeOwned,
        F: FnOnce(E) -> Result<(), ProjectionError>,
    {
        if envelope.aggregate_type() != aggregate_type {
            return Ok(());
        }

        let mut cursors = self.cursors.write().unwrap_or_else(PoisonError::into_inner);
        let key = CursorKey {
            tenant_id: envelope.tenant_id(),
            aggregate_id: envelope.aggregate_id(),
        };
        let last = cursors.get(&key).copied().unwrap_or(0);
        let seq = envelope.sequence_number();

        if seq != 0 && seq <= last {
            // Duplicate delivery or replay.
            return Ok(());
        }
        if !envelope.follows(last) {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let event: E = serde_json::from_value(envelope.payload().clone()).map_err(|e| {
            ProjectionError::Deserialize {
                aggregate_type: aggregate_type.to_string(),
                message: e.to_string(),
            }
        })?;

        apply(event)?;
        cursors.insert(key, seq);
        Ok(())
    }

    pub(crate) fn clear_tenant(&self, tenant_id: TenantId) {
        let mut cursors = self.cursors.write().unwrap_or_else(PoisonError::into_inner);
        cursors.retain(|k, _| k.tenant_id != tenant_id);
    }
}

/// Event-level tenant must match the envelope's.
pub(crate) fn ensure_tenant(envelope_tenant: TenantId, event_tenant: TenantId) -> Result<(), ProjectionError> {
    if envelope_tenant != event_tenant {
        return Err(ProjectionError::TenantIsolation(
            "event tenant_id does not match envelope tenant_id".to_string(),
        ));
    }
    Ok(())
}

/// Event-level aggregate id must match the envelope's.
pub(crate) fn ensure_aggregate(
    envelope_aggregate: AggregateId,
    event_aggregate: AggregateId,
) -> Result<(), ProjectionError> {
    if envelope_aggregate != event_aggregate {
        return Err(ProjectionError::TenantIsolation(
            "event aggregate id does not match envelope aggregate_id".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn env(tenant_id: TenantId, aggregate_id: AggregateId, seq: u64) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(Uuid::now_v7(), tenant_id, aggregate_id, "t", seq, json!(seq))
    }

    #[test]
    fn applies_in_order_skips_duplicates_and_reports_gaps() {
        let cursors = StreamCursors::new();
        let (t, a) = (TenantId::new(), AggregateId::new());
        let mut seen = Vec::new();

        let mut feed = |seq| {
            cursors.apply_next(&env(t, a, seq), "t", |v: u64| {
                seen.push(v);
                Ok(())
            })
        };

        feed(1).unwrap();
        feed(2).unwrap();
        feed(2).unwrap();
        let err = feed(4).unwrap_err();
        assert!(err.is_gap());
        assert!(feed(0).is_err());
        feed(3).unwrap();

        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn other_aggregate_types_are_ignored() {
        let cursors = StreamCursors::new();
        let (t, a) = (TenantId::new(), AggregateId::new());
        cursors
            .apply_next(&env(t, a, 7), "other", |_: u64| -> Result<(), ProjectionError> {
                panic!("must not be applied")
            })
            .unwrap();
    }

    #[test]
    fn failed_apply_does_not_advance_cursor() {
        let cursors = StreamCursors::new();
        let (t, a) = (TenantId::new(), AggregateId::new());

        let err = cursors.apply_next(&env(t, a, 1), "t", |_: u64| {
            Err(ProjectionError::TenantIsolation("nope".into()))
        });
        assert!(err.is_err());

        let mut applied = false;
        cursors
            .apply_next(&env(t, a, 1), "t", |_: u64| {
                applied = true;
                Ok(())
            })
            .unwrap();
        assert!(applied);
    }
}
