use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;

use bistro_core::TenantId;
use bistro_events::EventEnvelope;
use bistro_inventory::{
    AGGREGATE_TYPE, InventoryEvent, InventoryItemId, ItemDetails, Sku, StockStatus, classify,
};
use bistro_recipes::IngredientCosts;

use super::Projection;
use super::cursor::{ProjectionError, StreamCursors, ensure_aggregate, ensure_tenant};
use crate::read_model::{InMemoryTenantStore, TenantStore};

/// Queryable inventory read model: one ingredient with its current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryItemView {
    pub item_id: InventoryItemId,
    pub details: ItemDetails,
    pub current_stock_base: Decimal,
    pub status: StockStatus,
    pub movement_count: u64,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItemView {
    pub fn sku(&self) -> &Sku {
        &self.details.sku
    }

    pub fn cost_per_base_unit(&self) -> Decimal {
        self.details.cost_per_base_unit
    }

    /// Stock value at the current cost per base unit (negative stock counts as zero).
    pub fn stock_value(&self) -> Decimal {
        self.current_stock_base
            .max(Decimal::ZERO)
            .saturating_mul(self.details.cost_per_base_unit)
    }

    fn reclassify(&mut self) {
        self.status = classify(self.current_stock_base, self.details.min_stock_base);
    }
}

/// Inventory stock projection.
///
/// Keeps one view per live item plus a tenant-scoped sku index, which is what
/// recipes (referencing ingredients by sku) and the sku uniqueness check use.
#[derive(Debug)]
pub struct InventoryStockProjection<S>
where
    S: TenantStore<InventoryItemId, InventoryItemView>,
{
    store: S,
    by_sku: InMemoryTenantStore<Sku, InventoryItemId>,
    cursors: StreamCursors,
}

impl<S> InventoryStockProjection<S>
where
    S: TenantStore<InventoryItemId, InventoryItemView>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            by_sku: InMemoryTenantStore::new(),
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, tenant_id: TenantId, item_id: &InventoryItemId) -> Option<InventoryItemView> {
        self.store.get(tenant_id, item_id)
    }

    pub fn get_by_sku(&self, tenant_id: TenantId, sku: &Sku) -> Option<InventoryItemView> {
        let item_id = self.by_sku.get(tenant_id, sku)?;
        self.store.get(tenant_id, &item_id)
    }

    /// All live items of a tenant, ordered by sku.
    pub fn list(&self, tenant_id: TenantId) -> Vec<InventoryItemView> {
        let mut items = self.store.list(tenant_id);
        items.sort_by(|a, b| a.details.sku.cmp(&b.details.sku));
        items
    }

    /// Active items that are low or out of stock.
    pub fn low_stock(&self, tenant_id: TenantId) -> Vec<InventoryItemView> {
        self.list(tenant_id)
            .into_iter()
            .filter(|v| v.details.is_active && v.status.needs_attention())
            .collect()
    }

    /// Ingredient cost lookup for one tenant.
    pub fn costs(&self, tenant_id: TenantId) -> TenantIngredientCosts<'_, S> {
        TenantIngredientCosts {
            projection: self,
            tenant_id,
        }
    }

    fn index_sku(&self, tenant_id: TenantId, sku: &Sku, item_id: InventoryItemId) {
        self.by_sku.upsert(tenant_id, sku.clone(), item_id);
    }

    fn unindex_sku(&self, tenant_id: TenantId, sku: &Sku, item_id: InventoryItemId) {
        if self.by_sku.get(tenant_id, sku) == Some(item_id) {
            self.by_sku.remove(tenant_id, sku);
        }
    }

    fn apply_event(&self, tenant_id: TenantId, event: InventoryEvent) {
        match event {
            InventoryEvent::ItemCreated(e) => {
                self.index_sku(tenant_id, &e.details.sku, e.item_id);
                let mut view = InventoryItemView {
                    item_id: e.item_id,
                    details: e.details,
                    current_stock_base: Decimal::ZERO,
                    status: StockStatus::OutOfStock,
                    movement_count: 0,
                    updated_at: e.occurred_at,
                };
                view.reclassify();
                self.store.upsert(tenant_id, e.item_id, view);
            }
            InventoryEvent::ItemUpdated(e) => {
                let Some(mut view) = self.store.get(tenant_id, &e.item_id) else {
                    return;
                };
                if view.details.sku != e.details.sku {
                    self.unindex_sku(tenant_id, &view.details.sku, e.item_id);
                    self.index_sku(tenant_id, &e.details.sku, e.item_id);
                }
                view.details = e.details;
                view.updated_at = e.occurred_at;
                view.reclassify();
                self.store.upsert(tenant_id, e.item_id, view);
            }
            InventoryEvent::ItemDeleted(e) => {
                if let Some(view) = self.store.remove(tenant_id, &e.item_id) {
                    self.unindex_sku(tenant_id, &view.details.sku, e.item_id);
                }
            }
            InventoryEvent::MovementRecorded(e) => {
                let item_id = e.movement.item_id;
                let Some(mut view) = self.store.get(tenant_id, &item_id) else {
                    return;
                };
                view.current_stock_base = e.movement.balance_after;
                view.movement_count += 1;
                view.updated_at = e.movement.occurred_at;
                view.reclassify();
                self.store.upsert(tenant_id, item_id, view);
            }
        }
    }
}

impl<S> Projection for InventoryStockProjection<S>
where
    S: TenantStore<InventoryItemId, InventoryItemView>,
{
    fn name(&self) -> &'static str {
        "inventory_stock"
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let tenant_id = envelope.tenant_id();
        self.cursors
            .apply_next(envelope, AGGREGATE_TYPE, |event: InventoryEvent| {
                ensure_tenant(tenant_id, event.tenant_id())?;
                ensure_aggregate(envelope.aggregate_id(), event.item_id().0)?;
                self.apply_event(tenant_id, event);
                Ok(())
            })
    }

    fn reset_tenant(&self, tenant_id: TenantId) {
        self.store.clear_tenant(tenant_id);
        self.by_sku.clear_tenant(tenant_id);
        self.cursors.clear_tenant(tenant_id);
    }
}

/// [`IngredientCosts`] backed by one tenant's live inventory.
#[derive(Debug)]
pub struct TenantIngredientCosts<'a, S>
where
    S: TenantStore<InventoryItemId, InventoryItemView>,
{
    projection: &'a InventoryStockProjection<S>,
    tenant_id: TenantId,
}

impl<S> IngredientCosts for TenantIngredientCosts<'_, S>
where
    S: TenantStore<InventoryItemId, InventoryItemView>,
{
    fn cost_per_base_unit(&self, sku: &Sku) -> Option<Decimal> {
        self.projection
            .get_by_sku(self.tenant_id, sku)
            .map(|v| v.details.cost_per_base_unit)
    }
}
