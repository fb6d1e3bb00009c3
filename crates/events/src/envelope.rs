use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bistro_core::{AggregateId, TenantId};

/// A committed event plus the metadata consumers route on.
///
/// The `(tenant_id, aggregate_id, sequence_number)` triple is unique: the
/// sequence number is the event's 1-based position in its stream. Consumers
/// that only care about some streams filter on `aggregate_type` before they
/// decode the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    tenant_id: TenantId,
    aggregate_id: AggregateId,
    aggregate_type: String,
    sequence_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event_type: Option<String>,
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            tenant_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            sequence_number,
            event_type: None,
            payload,
        }
    }

    /// Tag the envelope with the payload's event name (e.g. "menu.item.updated").
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }

    /// True when this envelope directly follows `last` in its stream.
    pub fn follows(&self, last: u64) -> bool {
        self.sequence_number == last + 1
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
