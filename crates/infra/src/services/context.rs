use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use bistro_core::{AggregateId, TenantId};
use bistro_events::{EventEnvelope, InMemoryEventBus};
use bistro_inventory::{InventoryItemId, StockMovement};
use bistro_menu::MenuItemId;

use crate::command_dispatcher::CommandDispatcher;
use crate::config::PlatformConfig;
use crate::event_store::{EventStore, InMemoryEventStore, StoredEvent};
use crate::projections::{
    InventoryItemView, InventoryStockProjection, MenuCatalogProjection, MenuItemView,
    MovementLedgerProjection, Projection, ProjectionError, RecipeView, RecipesProjection,
};
use crate::read_model::InMemoryTenantStore;

use super::error::ServiceResult;

pub type EnvelopeBus = InMemoryEventBus<EventEnvelope<JsonValue>>;

pub type InMemoryDispatcher = CommandDispatcher<Arc<InMemoryEventStore>, Arc<EnvelopeBus>>;

pub type InventoryProjection =
    InventoryStockProjection<Arc<InMemoryTenantStore<InventoryItemId, InventoryItemView>>>;
pub type LedgerProjection =
    MovementLedgerProjection<Arc<InMemoryTenantStore<InventoryItemId, Vec<StockMovement>>>>;
pub type MenuProjection = MenuCatalogProjection<Arc<InMemoryTenantStore<MenuItemId, MenuItemView>>>;
pub type RecipeProjection = RecipesProjection<Arc<InMemoryTenantStore<MenuItemId, RecipeView>>>;

/// The platform's read models.
#[derive(Debug, Clone)]
pub struct ReadModels {
    pub inventory: Arc<InventoryProjection>,
    pub movements: Arc<LedgerProjection>,
    pub menu: Arc<MenuProjection>,
    pub recipes: Arc<RecipeProjection>,
}

impl Default for ReadModels {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadModels {
    pub fn new() -> Self {
        Self {
            inventory: Arc::new(InventoryStockProjection::new(Arc::new(InMemoryTenantStore::new()))),
            movements: Arc::new(MovementLedgerProjection::new(Arc::new(InMemoryTenantStore::new()))),
            menu: Arc::new(MenuCatalogProjection::new(Arc::new(InMemoryTenantStore::new()))),
            recipes: Arc::new(RecipesProjection::new(Arc::new(InMemoryTenantStore::new()))),
        }
    }

    pub fn all(&self) -> [&dyn Projection; 4] {
        [
            self.inventory.as_ref(),
            self.movements.as_ref(),
            self.menu.as_ref(),
            self.recipes.as_ref(),
        ]
    }

    /// Apply one envelope to every read model.
    ///
    /// A read model that is behind on the envelope's stream (an earlier envelope
    /// has not reached it yet) is caught up from `store` instead of failing.
    pub fn apply_with_catch_up(
        &self,
        store: &impl EventStore,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProjectionError> {
        for projection in self.all() {
            match projection.apply_envelope(envelope) {
                Err(err) if err.is_gap() => {
                    debug!(
                        projection = projection.name(),
                        tenant_id = %envelope.tenant_id(),
                        aggregate_id = %envelope.aggregate_id(),
                        error = %err,
                        "read model behind, catching up from store"
                    );
                    catch_up(projection, store, envelope.tenant_id(), envelope.aggregate_id())?;
                }
                other => other?,
            }
        }
        Ok(())
    }

    /// Drop a tenant's read models and replay its whole history.
    pub fn rebuild_tenant(&self, store: &impl EventStore, tenant_id: TenantId) -> ServiceResult<usize> {
        let envelopes: Vec<_> = store
            .load_tenant(tenant_id)?
            .iter()
            .map(StoredEvent::to_envelope)
            .collect();

        let replayed = envelopes.len();
        for projection in self.all() {
            // A tenant with no events left still has to be emptied.
            projection.reset_tenant(tenant_id);
            projection.rebuild_from_scratch(envelopes.clone())?;
        }
        Ok(replayed)
    }
}

fn catch_up(
    projection: &dyn Projection,
    store: &impl EventStore,
    tenant_id: TenantId,
    aggregate_id: AggregateId,
) -> Result<(), ProjectionError> {
    let stream = store.load_stream(tenant_id, aggregate_id).inspect_err(|e| {
        warn!(projection = projection.name(), error = %e, "catch-up load failed");
    })?;
    for stored in &stream {
        projection.apply_envelope(&stored.to_envelope())?;
    }
    Ok(())
}

/// Everything a service needs: the write path and the read models it keeps current.
#[derive(Debug)]
pub struct ServiceContext {
    pub(crate) dispatcher: InMemoryDispatcher,
    pub(crate) read_models: ReadModels,
    pub(crate) config: PlatformConfig,
}

impl ServiceContext {
    pub fn new(dispatcher: InMemoryDispatcher, read_models: ReadModels, config: PlatformConfig) -> Self {
        Self {
            dispatcher,
            read_models,
            config,
        }
    }

    pub fn dispatcher(&self) -> &InMemoryDispatcher {
        &self.dispatcher
    }

    pub fn read_models(&self) -> &ReadModels {
        &self.read_models
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Apply freshly committed events so the caller reads its own writes.
    pub(crate) fn project(&self, committed: &[StoredEvent]) -> ServiceResult<()> {
        for stored in committed {
            self.read_models
                .apply_with_catch_up(self.dispatcher.store(), &stored.to_envelope())?;
        }
        Ok(())
    }
}
