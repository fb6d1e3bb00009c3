use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use bistro_core::TenantId;
use bistro_events::EventEnvelope;
use bistro_menu::{AGGREGATE_TYPE, MenuEvent, MenuItemDetails, MenuItemId};

use super::Projection;
use super::cursor::{ProjectionError, StreamCursors, ensure_aggregate, ensure_tenant};
use crate::read_model::TenantStore;

/// Queryable menu read model: price and option structure of one menu item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItemView {
    pub menu_item_id: MenuItemId,
    pub details: MenuItemDetails,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct MenuCatalogProjection<S>
where
    S: TenantStore<MenuItemId, MenuItemView>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> MenuCatalogProjection<S>
where
    S: TenantStore<MenuItemId, MenuItemView>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, tenant_id: TenantId, menu_item_id: &MenuItemId) -> Option<MenuItemView> {
        self.store.get(tenant_id, menu_item_id)
    }

    /// Menu items ordered by category, then name.
    pub fn list(&self, tenant_id: TenantId) -> Vec<MenuItemView> {
        let mut items = self.store.list(tenant_id);
        items.sort_by(|a, b| {
            (&a.details.category, &a.details.name).cmp(&(&b.details.category, &b.details.name))
        });
        items
    }
}

impl<S> Projection for MenuCatalogProjection<S>
where
    S: TenantStore<MenuItemId, MenuItemView>,
{
    fn name(&self) -> &'static str {
        "menu_catalog"
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let tenant_id = envelope.tenant_id();
        self.cursors
            .apply_next(envelope, AGGREGATE_TYPE, |event: MenuEvent| {
                let (event_tenant, occurred_at) = match &event {
                    MenuEvent::MenuItemCreated(e) => (e.tenant_id, e.occurred_at),
                    MenuEvent::MenuItemUpdated(e) => (e.tenant_id, e.occurred_at),
                };
                ensure_tenant(tenant_id, event_tenant)?;
                ensure_aggregate(envelope.aggregate_id(), event.menu_item_id().0)?;

                let menu_item_id = event.menu_item_id();
                self.store.upsert(
                    tenant_id,
                    menu_item_id,
                    MenuItemView {
                        menu_item_id,
                        details: event.details().clone(),
                        updated_at: occurred_at,
                    },
                );
                Ok(())
            })
    }

    fn reset_tenant(&self, tenant_id: TenantId) {
        self.store.clear_tenant(tenant_id);
        self.cursors.clear_tenant(tenant_id);
    }
}
