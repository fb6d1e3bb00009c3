use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use bistro_core::{AggregateId, DomainError, TenantId};
use bistro_inventory::{
    AGGREGATE_TYPE, CreateItem, DeleteItem, InventoryCommand, InventoryEvent, InventoryItem,
    InventoryItemId, ItemDetails, MovementDetails, MovementId, MovementType, RecordMovement, Sku,
    StockMovement, UpdateItem,
};

use crate::event_store::StoredEvent;
use crate::projections::{InventoryItemView, TenantIngredientCosts};
use crate::read_model::InMemoryTenantStore;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

fn make_item(_: TenantId, id: AggregateId) -> InventoryItem {
    InventoryItem::empty(InventoryItemId::new(id))
}

/// Ingredient master data and the stock ledger.
#[derive(Debug, Clone)]
pub struct InventoryService {
    ctx: Arc<ServiceContext>,
}

impl InventoryService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Create an ingredient; a non-zero opening stock is booked on the ledger.
    ///
    /// The sku must not be used by another live item of the tenant.
    pub fn create_item(
        &self,
        tenant_id: TenantId,
        details: ItemDetails,
        opening_stock_base: Decimal,
    ) -> ServiceResult<InventoryItemView> {
        self.ensure_sku_free(tenant_id, &details.sku, None)?;

        let item_id = InventoryItemId::new(AggregateId::new());
        let command = InventoryCommand::CreateItem(CreateItem {
            tenant_id,
            item_id,
            details,
            opening_stock_base,
            occurred_at: Utc::now(),
        });
        let committed = self
            .ctx
            .dispatcher
            .dispatch(tenant_id, item_id.0, AGGREGATE_TYPE, &command, make_item)?;
        self.ctx.project(&committed)?;

        info!(tenant_id = %tenant_id, item_id = %item_id, "inventory item created");
        self.require(tenant_id, &item_id)
    }

    /// Replace the item's master data. Stock is only changed through movements.
    pub fn update_item(
        &self,
        tenant_id: TenantId,
        item_id: InventoryItemId,
        details: ItemDetails,
    ) -> ServiceResult<InventoryItemView> {
        self.ensure_sku_free(tenant_id, &details.sku, Some(item_id))?;

        let command = InventoryCommand::UpdateItem(UpdateItem {
            tenant_id,
            item_id,
            details,
            occurred_at: Utc::now(),
        });
        let committed = self
            .ctx
            .dispatcher
            .dispatch_with_retry(tenant_id, item_id.0, AGGREGATE_TYPE, &command, make_item)?;
        self.ctx.project(&committed)?;
        self.require(tenant_id, &item_id)
    }

    pub fn delete_item(&self, tenant_id: TenantId, item_id: InventoryItemId) -> ServiceResult<()> {
        let command = InventoryCommand::DeleteItem(DeleteItem {
            tenant_id,
            item_id,
            occurred_at: Utc::now(),
        });
        let committed = self
            .ctx
            .dispatcher
            .dispatch_with_retry(tenant_id, item_id.0, AGGREGATE_TYPE, &command, make_item)?;
        self.ctx.project(&committed)?;

        info!(tenant_id = %tenant_id, item_id = %item_id, "inventory item deleted");
        Ok(())
    }

    pub fn get_item(&self, tenant_id: TenantId, sku: &Sku) -> Option<InventoryItemView> {
        self.ctx.read_models.inventory.get_by_sku(tenant_id, sku)
    }

    pub fn get_item_by_id(&self, tenant_id: TenantId, item_id: &InventoryItemId) -> Option<InventoryItemView> {
        self.ctx.read_models.inventory.get(tenant_id, item_id)
    }

    pub fn list_items(&self, tenant_id: TenantId) -> Vec<InventoryItemView> {
        self.ctx.read_models.inventory.list(tenant_id)
    }

    pub fn low_stock(&self, tenant_id: TenantId) -> Vec<InventoryItemView> {
        self.ctx.read_models.inventory.low_stock(tenant_id)
    }

    /// Append one movement to the item's ledger and return the recorded entry.
    ///
    /// Concurrent movements on the same item are serialized by the stream
    /// revision; a movement that loses the race is re-decided against the new
    /// balance.
    pub fn record_movement(
        &self,
        tenant_id: TenantId,
        item_id: InventoryItemId,
        movement_type: MovementType,
        quantity_base: Decimal,
        details: MovementDetails,
    ) -> ServiceResult<StockMovement> {
        let command = InventoryCommand::RecordMovement(RecordMovement {
            tenant_id,
            item_id,
            movement_id: MovementId::new(),
            movement_type,
            quantity_base,
            details,
            occurred_at: Utc::now(),
        });
        let committed = self
            .ctx
            .dispatcher
            .dispatch_with_retry(tenant_id, item_id.0, AGGREGATE_TYPE, &command, make_item)?;
        self.ctx.project(&committed)?;

        recorded_movement(&committed)
    }

    /// Ledger of one item, oldest first.
    pub fn movements(&self, tenant_id: TenantId, item_id: &InventoryItemId) -> Vec<StockMovement> {
        self.ctx.read_models.movements.movements(tenant_id, item_id)
    }

    /// Live cost per base unit of the tenant's ingredients, by sku.
    pub fn ingredient_costs(
        &self,
        tenant_id: TenantId,
    ) -> TenantIngredientCosts<'_, Arc<InMemoryTenantStore<InventoryItemId, InventoryItemView>>> {
        self.ctx.read_models.inventory.costs(tenant_id)
    }

    fn ensure_sku_free(
        &self,
        tenant_id: TenantId,
        sku: &Sku,
        owner: Option<InventoryItemId>,
    ) -> ServiceResult<()> {
        match self.ctx.read_models.inventory.get_by_sku(tenant_id, sku) {
            Some(existing) if Some(existing.item_id) != owner => Err(ServiceError::DuplicateSku(sku.clone())),
            _ => Ok(()),
        }
    }

    fn require(&self, tenant_id: TenantId, item_id: &InventoryItemId) -> ServiceResult<InventoryItemView> {
        self.get_item_by_id(tenant_id, item_id)
            .ok_or_else(|| ServiceError::not_found(format!("inventory item {item_id}")))
    }
}

fn recorded_movement(committed: &[StoredEvent]) -> ServiceResult<StockMovement> {
    for stored in committed {
        if let InventoryEvent::MovementRecorded(e) = stored.decode::<InventoryEvent>()? {
            return Ok(e.movement);
        }
    }
    Err(DomainError::invariant("movement command committed no movement").into())
}
