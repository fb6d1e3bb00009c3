//! Read model builders.
//!
//! Projections consume committed envelopes and maintain query-friendly views.
//! They are rebuildable from the event store, tenant-isolated, and idempotent
//! under at-least-once delivery thanks to per-stream cursors.

use serde_json::Value as JsonValue;

use bistro_core::TenantId;
use bistro_events::EventEnvelope;

pub mod cursor;
pub mod inventory_stock;
pub mod menu_catalog;
pub mod movement_ledger;
pub mod recipes;

pub use cursor::ProjectionError;
pub use inventory_stock::{InventoryItemView, InventoryStockProjection, TenantIngredientCosts};
pub use menu_catalog::{MenuCatalogProjection, MenuItemView};
pub use movement_ledger::MovementLedgerProjection;
pub use recipes::{RecipeView, RecipesProjection};

/// A read model fed from event envelopes.
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    /// Apply one envelope. Envelopes at or below the stream cursor are ignored;
    /// a gap is reported as [`ProjectionError::NonMonotonicSequence`].
    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError>;

    /// Drop the tenant's records and cursors.
    fn reset_tenant(&self, tenant_id: TenantId);

    /// Rebuild from scratch by replaying envelopes.
    ///
    /// Every tenant present in `envelopes` is reset first. Envelopes are applied
    /// as given, so they must be in store order (each stream in sequence order).
    fn rebuild_from_scratch(
        &self,
        envelopes: Vec<EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionError> {
        let mut tenants = envelopes.iter().map(|e| e.tenant_id()).collect::<Vec<_>>();
        tenants.sort_by_key(|t| *t.as_uuid().as_bytes());
        tenants.dedup();
        for t in tenants {
            self.reset_tenant(t);
        }

        for env in &envelopes {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}
