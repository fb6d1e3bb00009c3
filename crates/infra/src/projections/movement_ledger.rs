use serde_json::Value as JsonValue;

use bistro_core::TenantId;
use bistro_events::EventEnvelope;
use bistro_inventory::{AGGREGATE_TYPE, InventoryEvent, InventoryItemId, StockMovement};

use super::Projection;
use super::cursor::{ProjectionError, StreamCursors, ensure_aggregate, ensure_tenant};
use crate::read_model::TenantStore;

/// Movement history per item, oldest first.
///
/// Deleting an item does not remove its history.
#[derive(Debug)]
pub struct MovementLedgerProjection<S>
where
    S: TenantStore<InventoryItemId, Vec<StockMovement>>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> MovementLedgerProjection<S>
where
    S: TenantStore<InventoryItemId, Vec<StockMovement>>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn movements(&self, tenant_id: TenantId, item_id: &InventoryItemId) -> Vec<StockMovement> {
        self.store.get(tenant_id, item_id).unwrap_or_default()
    }

    pub fn last_movement(&self, tenant_id: TenantId, item_id: &InventoryItemId) -> Option<StockMovement> {
        self.movements(tenant_id, item_id).pop()
    }
}

impl<S> Projection for MovementLedgerProjection<S>
where
    S: TenantStore<InventoryItemId, Vec<StockMovement>>,
{
    fn name(&self) -> &'static str {
        "movement_ledger"
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let tenant_id = envelope.tenant_id();
        self.cursors
            .apply_next(envelope, AGGREGATE_TYPE, |event: InventoryEvent| {
                ensure_tenant(tenant_id, event.tenant_id())?;
                ensure_aggregate(envelope.aggregate_id(), event.item_id().0)?;

                if let InventoryEvent::MovementRecorded(e) = event {
                    let item_id = e.movement.item_id;
                    let mut history = self.store.get(tenant_id, &item_id).unwrap_or_default();
                    history.push(e.movement);
                    self.store.upsert(tenant_id, item_id, history);
                }
                Ok(())
            })
    }

    fn reset_tenant(&self, tenant_id: TenantId) {
        self.store.clear_tenant(tenant_id);
        self.cursors.clear_tenant(tenant_id);
    }
}
