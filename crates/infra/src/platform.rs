//! In-memory platform wiring: store, bus, dispatcher, read models and services.

use std::io;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::info;

use bistro_core::TenantId;
use bistro_events::{EventEnvelope, InMemoryEventBus};

use crate::command_dispatcher::CommandDispatcher;
use crate::config::{ConfigError, PlatformConfig};
use crate::event_store::InMemoryEventStore;
use crate::projections::ProjectionError;
use crate::services::{
    EnvelopeBus, InventoryService, MenuService, ReadModels, RecipeService, SalesService,
    ServiceContext, ServiceResult,
};
use crate::theme_store::ThemeStore;
use crate::workers::{ProjectionWorker, WorkerHandle};

#[derive(Debug, Clone)]
pub struct Platform {
    ctx: Arc<ServiceContext>,
    store: Arc<InMemoryEventStore>,
    bus: Arc<EnvelopeBus>,
    themes: Arc<ThemeStore>,
    inventory: InventoryService,
    menu: MenuService,
    recipes: RecipeService,
    sales: SalesService,
}

impl Platform {
    pub fn from_config(config: PlatformConfig) -> Self {
        let store = Arc::new(InMemoryEventStore::new());
        let bus: Arc<EnvelopeBus> = Arc::new(InMemoryEventBus::new());
        let dispatcher = CommandDispatcher::new(store.clone(), bus.clone())
            .with_max_concurrency_retries(config.dispatch.max_concurrency_retries);

        let ctx = Arc::new(ServiceContext::new(dispatcher, ReadModels::new(), config));
        let themes = Arc::new(ThemeStore::new());

        let inventory = InventoryService::new(ctx.clone());
        let menu = MenuService::new(ctx.clone(), themes.clone());
        let recipes = RecipeService::new(ctx.clone(), menu.clone());
        let sales = SalesService::new(inventory.clone(), menu.clone(), recipes.clone());

        Self {
            ctx,
            store,
            bus,
            themes,
            inventory,
            menu,
            recipes,
            sales,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_config(PlatformConfig::default())
    }

    /// Load configuration, initialize logging and build the platform.
    pub fn bootstrap(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let config = PlatformConfig::load(config_path)?;
        bistro_observability::init_with(&config.logging);
        info!(
            max_concurrency_retries = config.dispatch.max_concurrency_retries,
            currency_decimal_places = config.costing.currency_decimal_places,
            "platform starting"
        );
        Ok(Self::from_config(config))
    }

    pub fn config(&self) -> &PlatformConfig {
        self.ctx.config()
    }

    pub fn inventory(&self) -> &InventoryService {
        &self.inventory
    }

    pub fn menu(&self) -> &MenuService {
        &self.menu
    }

    pub fn recipes(&self) -> &RecipeService {
        &self.recipes
    }

    pub fn sales(&self) -> &SalesService {
        &self.sales
    }

    pub fn themes(&self) -> &Arc<ThemeStore> {
        &self.themes
    }

    pub fn read_models(&self) -> &ReadModels {
        self.ctx.read_models()
    }

    pub fn event_store(&self) -> &Arc<InMemoryEventStore> {
        &self.store
    }

    pub fn event_bus(&self) -> &Arc<EnvelopeBus> {
        &self.bus
    }

    /// Drop and replay every read model of a tenant from the event store.
    ///
    /// Returns the number of events replayed.
    pub fn rebuild_projections(&self, tenant_id: TenantId) -> ServiceResult<usize> {
        let replayed = self.read_models().rebuild_tenant(&self.store, tenant_id)?;
        info!(tenant_id = %tenant_id, replayed, "read models rebuilt");
        Ok(replayed)
    }

    /// Keep `read_models` current from the bus on a background thread.
    ///
    /// Envelopes that arrive out of order are caught up from the event store.
    pub fn spawn_projection_worker(
        &self,
        read_models: ReadModels,
        tenant_id: Option<TenantId>,
    ) -> io::Result<WorkerHandle> {
        let store = self.store.clone();
        ProjectionWorker::spawn(
            "bistro-projections",
            self.bus.as_ref(),
            tenant_id,
            move |envelope: EventEnvelope<JsonValue>| -> Result<(), ProjectionError> {
                read_models.apply_with_catch_up(&store, &envelope)
            },
        )
    }
}
