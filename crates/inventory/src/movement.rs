//! Stock movements: the append-only ledger behind every stock level.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bistro_core::{DomainError, DomainResult};

use crate::item::InventoryItemId;
use crate::sku::Sku;

/// Identifier of a single ledger entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementId(pub Uuid);

impl MovementId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for MovementId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for MovementId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Purchase,
    Sale,
    Adjustment,
    Waste,
    Cancel,
    Transfer,
}

impl MovementType {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementType::Purchase => "purchase",
            MovementType::Sale => "sale",
            MovementType::Adjustment => "adjustment",
            MovementType::Waste => "waste",
            MovementType::Cancel => "cancel",
            MovementType::Transfer => "transfer",
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional attributes of a movement, as entered on the admin form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementDetails {
    pub cost_per_unit: Option<Decimal>,
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

impl MovementDetails {
    pub fn with_cost_per_unit(mut self, cost: Decimal) -> Self {
        self.cost_per_unit = Some(cost);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// One immutable ledger entry.
///
/// `quantity_base` is signed (positive = stock in). `balance_after` is the item's
/// stock once this entry is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub movement_id: MovementId,
    pub item_id: InventoryItemId,
    pub sku: Sku,
    pub movement_type: MovementType,
    pub quantity_base: Decimal,
    pub balance_after: Decimal,
    pub cost_per_unit: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn balance_before(&self) -> Decimal {
        self.balance_after - self.quantity_base
    }
}

/// Enforce the sign convention for movement types with a fixed direction.
///
/// Purchases add stock; sales and waste remove it. Adjustments, cancellations and
/// transfers go either way, so the caller's sign is taken as given. Zero is never
/// a movement.
pub fn check_sign(movement_type: MovementType, quantity_base: Decimal) -> DomainResult<()> {
    if quantity_base.is_zero() {
        return Err(DomainError::validation("movement quantity cannot be zero"));
    }

    match movement_type {
        MovementType::Purchase if quantity_base < Decimal::ZERO => Err(DomainError::validation(
            "purchase movements must have a positive quantity",
        )),
        MovementType::Sale | MovementType::Waste if quantity_base > Decimal::ZERO => {
            Err(DomainError::validation(format!(
                "{movement_type} movements must have a negative quantity"
            )))
        }
        _ => Ok(()),
    }
}

/// `|quantity| × cost_per_unit`, when a cost per unit was supplied.
pub fn total_cost(quantity_base: Decimal, cost_per_unit: Option<Decimal>) -> DomainResult<Option<Decimal>> {
    cost_per_unit
        .map(|cost| {
            quantity_base
                .abs()
                .checked_mul(cost)
                .ok_or_else(|| DomainError::validation("movement total cost overflow"))
        })
        .transpose()
}

/// Check that consecutive entries of one item chain their balances.
pub fn verify_balance_chain(movements: &[StockMovement]) -> DomainResult<()> {
    for pair in movements.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.item_id != prev.item_id {
            return Err(DomainError::invariant("movement chain mixes items"));
        }
        if next.balance_before() != prev.balance_after {
            return Err(DomainError::invariant(format!(
                "movement {} starts at {} but previous balance is {}",
                next.movement_id,
                next.balance_before(),
                prev.balance_after
            )));
        }
    }
    Ok(())
}
