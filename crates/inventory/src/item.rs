use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bistro_core::{Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, TenantId};
use bistro_events::Event;

use crate::movement::{
    MovementDetails, MovementId, MovementType, StockMovement, check_sign, total_cost,
};
use crate::sku::Sku;
use crate::status::{StockStatus, classify};
use crate::units::{Unit, UnitConversion};

/// Stream type for inventory items in the event store.
pub const AGGREGATE_TYPE: &str = "inventory.item";

/// Inventory item identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryItemId(pub AggregateId);

impl InventoryItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InventoryItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Editable master data of an ingredient.
///
/// Everything on the item form except the stock level, which only moves through
/// the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub sku: Sku,
    pub name: String,
    pub category: String,
    pub base_unit: Unit,
    pub purchase_unit: Unit,
    /// Base units per purchase unit.
    pub purchase_to_base_multiplier: Decimal,
    pub min_stock_base: Decimal,
    pub max_stock_base: Option<Decimal>,
    pub cost_per_base_unit: Decimal,
    pub supplier: Option<String>,
    pub lot_code: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub is_active: bool,
}

impl ItemDetails {
    /// Item bought and tracked in the same unit.
    pub fn new(sku: Sku, name: impl Into<String>, base_unit: Unit, cost_per_base_unit: Decimal) -> Self {
        Self {
            sku,
            name: name.into(),
            category: String::new(),
            base_unit,
            purchase_unit: base_unit,
            purchase_to_base_multiplier: Decimal::ONE,
            min_stock_base: Decimal::ZERO,
            max_stock_base: None,
            cost_per_base_unit,
            supplier: None,
            lot_code: None,
            expiry_date: None,
            is_active: true,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_purchase_unit(mut self, purchase_unit: Unit, multiplier: Decimal) -> Self {
        self.purchase_unit = purchase_unit;
        self.purchase_to_base_multiplier = multiplier;
        self
    }

    pub fn with_stock_limits(mut self, min: Decimal, max: Option<Decimal>) -> Self {
        self.min_stock_base = min;
        self.max_stock_base = max;
        self
    }

    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
        self
    }

    pub fn with_lot(mut self, lot_code: impl Into<String>, expiry_date: Option<NaiveDate>) -> Self {
        self.lot_code = Some(lot_code.into());
        self.expiry_date = expiry_date;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn conversion(&self) -> DomainResult<UnitConversion> {
        UnitConversion::new(
            self.purchase_unit,
            self.base_unit,
            self.purchase_to_base_multiplier,
        )
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        self.conversion()?;
        if self.min_stock_base < Decimal::ZERO {
            return Err(DomainError::validation("min_stock_base cannot be negative"));
        }
        if let Some(max) = self.max_stock_base {
            if max < self.min_stock_base {
                return Err(DomainError::validation(
                    "max_stock_base cannot be below min_stock_base",
                ));
            }
        }
        if self.cost_per_base_unit < Decimal::ZERO {
            return Err(DomainError::validation("cost_per_base_unit cannot be negative"));
        }
        Ok(())
    }
}

/// Aggregate root: InventoryItem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    id: InventoryItemId,
    tenant_id: Option<TenantId>,
    details: Option<ItemDetails>,
    current_stock_base: Decimal,
    movement_count: u64,
    deleted: bool,
    version: u64,
}

impl InventoryItem {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InventoryItemId) -> Self {
        Self {
            id,
            tenant_id: None,
            details: None,
            current_stock_base: Decimal::ZERO,
            movement_count: 0,
            deleted: false,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> InventoryItemId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn details(&self) -> Option<&ItemDetails> {
        self.details.as_ref()
    }

    pub fn current_stock_base(&self) -> Decimal {
        self.current_stock_base
    }

    pub fn movement_count(&self) -> u64 {
        self.movement_count
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn status(&self) -> Option<StockStatus> {
        self.details
            .as_ref()
            .map(|d| classify(self.current_stock_base, d.min_stock_base))
    }
}

impl AggregateRoot for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateItem.
///
/// A non-zero `opening_stock_base` is booked as an opening adjustment so the
/// stock level is always the sum of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateItem {
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub details: ItemDetails,
    pub opening_stock_base: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateItem (master data only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItem {
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub details: ItemDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteItem {
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordMovement.
///
/// The caller picks the sign of `quantity_base`. The recorder rejects a negative
/// purchase and a positive sale or waste, and never flips a sign itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMovement {
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub movement_id: MovementId,
    pub movement_type: MovementType,
    pub quantity_base: Decimal,
    pub details: MovementDetails,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryCommand {
    CreateItem(CreateItem),
    UpdateItem(UpdateItem),
    DeleteItem(DeleteItem),
    RecordMovement(RecordMovement),
}

/// Event: ItemCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCreated {
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub details: ItemDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdated {
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub details: ItemDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDeleted {
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MovementRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecorded {
    pub tenant_id: TenantId,
    pub movement: StockMovement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    ItemCreated(ItemCreated),
    ItemUpdated(ItemUpdated),
    ItemDeleted(ItemDeleted),
    MovementRecorded(MovementRecorded),
}

impl InventoryEvent {
    pub fn tenant_id(&self) -> TenantId {
        match self {
            InventoryEvent::ItemCreated(e) => e.tenant_id,
            InventoryEvent::ItemUpdated(e) => e.tenant_id,
            InventoryEvent::ItemDeleted(e) => e.tenant_id,
            InventoryEvent::MovementRecorded(e) => e.tenant_id,
        }
    }

    pub fn item_id(&self) -> InventoryItemId {
        match self {
            InventoryEvent::ItemCreated(e) => e.item_id,
            InventoryEvent::ItemUpdated(e) => e.item_id,
            InventoryEvent::ItemDeleted(e) => e.item_id,
            InventoryEvent::MovementRecorded(e) => e.movement.item_id,
        }
    }
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::ItemCreated(_) => "inventory.item.created",
            InventoryEvent::ItemUpdated(_) => "inventory.item.updated",
            InventoryEvent::ItemDeleted(_) => "inventory.item.deleted",
            InventoryEvent::MovementRecorded(_) => "inventory.item.movement_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::ItemCreated(e) => e.occurred_at,
            InventoryEvent::ItemUpdated(e) => e.occurred_at,
            InventoryEvent::ItemDeleted(e) => e.occurred_at,
            InventoryEvent::MovementRecorded(e) => e.movement.occurred_at,
        }
    }
}

impl Aggregate for InventoryItem {
    type Command = InventoryCommand;
    type Event = InventoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryEvent::ItemCreated(e) => {
                self.id = e.item_id;
                self.tenant_id = Some(e.tenant_id);
                self.details = Some(e.details.clone());
                self.current_stock_base = Decimal::ZERO;
            }
            InventoryEvent::ItemUpdated(e) => {
                self.details = Some(e.details.clone());
            }
            InventoryEvent::ItemDeleted(_) => {
                self.deleted = true;
            }
            InventoryEvent::MovementRecorded(e) => {
                self.current_stock_base = e.movement.balance_after;
                self.movement_count += 1;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InventoryCommand::CreateItem(cmd) => self.handle_create(cmd),
            InventoryCommand::UpdateItem(cmd) => self.handle_update(cmd),
            InventoryCommand::DeleteItem(cmd) => self.handle_delete(cmd),
            InventoryCommand::RecordMovement(cmd) => self.handle_movement(cmd),
        }
    }
}

impl InventoryItem {
    fn ensure_live(&self, tenant_id: TenantId, item_id: InventoryItemId) -> Result<&ItemDetails, DomainError> {
        let details = match &self.details {
            Some(d) if !self.deleted => d,
            _ => return Err(DomainError::not_found()),
        };
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != item_id {
            return Err(DomainError::invariant("item_id mismatch"));
        }
        Ok(details)
    }

    fn handle_create(&self, cmd: &CreateItem) -> Result<Vec<InventoryEvent>, DomainError> {
        if self.details.is_some() {
            return Err(DomainError::conflict("item already exists"));
        }
        cmd.details.validate()?;
        if cmd.opening_stock_base < Decimal::ZERO {
            return Err(DomainError::validation("opening stock cannot be negative"));
        }

        let mut events = vec![InventoryEvent::ItemCreated(ItemCreated {
            tenant_id: cmd.tenant_id,
            item_id: cmd.item_id,
            details: cmd.details.clone(),
            occurred_at: cmd.occurred_at,
        })];

        if !cmd.opening_stock_base.is_zero() {
            let cost = cmd.details.cost_per_base_unit;
            let opening_value = total_cost(cmd.opening_stock_base, Some(cost))?;
            events.push(InventoryEvent::MovementRecorded(MovementRecorded {
                tenant_id: cmd.tenant_id,
                movement: StockMovement {
                    movement_id: MovementId::new(),
                    item_id: cmd.item_id,
                    sku: cmd.details.sku.clone(),
                    movement_type: MovementType::Adjustment,
                    quantity_base: cmd.opening_stock_base,
                    balance_after: cmd.opening_stock_base,
                    cost_per_unit: Some(cost),
                    total_cost: opening_value,
                    reason: Some("opening balance".to_string()),
                    reference: None,
                    notes: None,
                    occurred_at: cmd.occurred_at,
                },
            }));
        }

        Ok(events)
    }

    fn handle_update(&self, cmd: &UpdateItem) -> Result<Vec<InventoryEvent>, DomainError> {
        let current = self.ensure_live(cmd.tenant_id, cmd.item_id)?;
        cmd.details.validate()?;

        if *current == cmd.details {
            return Ok(vec![]);
        }

        Ok(vec![InventoryEvent::ItemUpdated(ItemUpdated {
            tenant_id: cmd.tenant_id,
            item_id: cmd.item_id,
            details: cmd.details.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteItem) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_live(cmd.tenant_id, cmd.item_id)?;

        Ok(vec![InventoryEvent::ItemDeleted(ItemDeleted {
            tenant_id: cmd.tenant_id,
            item_id: cmd.item_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_movement(&self, cmd: &RecordMovement) -> Result<Vec<InventoryEvent>, DomainError> {
        let details = self.ensure_live(cmd.tenant_id, cmd.item_id)?;

        check_sign(cmd.movement_type, cmd.quantity_base)?;
        if let Some(cost) = cmd.details.cost_per_unit {
            if cost < Decimal::ZERO {
                return Err(DomainError::validation("cost_per_unit cannot be negative"));
            }
        }

        let balance_after = self
            .current_stock_base
            .checked_add(cmd.quantity_base)
            .ok_or_else(|| DomainError::validation("stock balance overflow"))?;
        let movement_value = total_cost(cmd.quantity_base, cmd.details.cost_per_unit)?;

        let movement = StockMovement {
            movement_id: cmd.movement_id,
            item_id: cmd.item_id,
            sku: details.sku.clone(),
            movement_type: cmd.movement_type,
            quantity_base: cmd.quantity_base,
            balance_after,
            cost_per_unit: cmd.details.cost_per_unit,
            total_cost: movement_value,
            reason: cmd.details.reason.clone(),
            reference: cmd.details.reference.clone(),
            notes: cmd.details.notes.clone(),
            occurred_at: cmd.occurred_at,
        };

        Ok(vec![InventoryEvent::MovementRecorded(MovementRecorded {
            tenant_id: cmd.tenant_id,
            movement,
        })])
    }
}
