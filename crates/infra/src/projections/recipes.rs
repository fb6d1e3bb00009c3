use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;

use bistro_core::TenantId;
use bistro_events::EventEnvelope;
use bistro_menu::MenuItemId;
use bistro_recipes::{AGGREGATE_TYPE, RecipeComponent, RecipeEvent, RecipeId};

use super::Projection;
use super::cursor::{ProjectionError, StreamCursors, ensure_aggregate, ensure_tenant};
use crate::read_model::TenantStore;

/// Queryable recipe read model, keyed by the menu item it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeView {
    pub recipe_id: RecipeId,
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub sku: Option<String>,
    pub components: Vec<RecipeComponent>,
    pub total_cost_per_item: Decimal,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct RecipesProjection<S>
where
    S: TenantStore<MenuItemId, RecipeView>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> RecipesProjection<S>
where
    S: TenantStore<MenuItemId, RecipeView>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get_by_menu_item(&self, tenant_id: TenantId, menu_item_id: &MenuItemId) -> Option<RecipeView> {
        self.store.get(tenant_id, menu_item_id)
    }

    pub fn list(&self, tenant_id: TenantId) -> Vec<RecipeView> {
        let mut recipes = self.store.list(tenant_id);
        recipes.sort_by(|a, b| a.name.cmp(&b.name));
        recipes
    }
}

impl<S> Projection for RecipesProjection<S>
where
    S: TenantStore<MenuItemId, RecipeView>,
{
    fn name(&self) -> &'static str {
        "recipes"
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let tenant_id = envelope.tenant_id();
        let version = envelope.sequence_number();
        self.cursors
            .apply_next(envelope, AGGREGATE_TYPE, |event: RecipeEvent| match event {
                RecipeEvent::RecipeSaved(e) => {
                    ensure_tenant(tenant_id, e.tenant_id)?;
                    ensure_aggregate(envelope.aggregate_id(), e.recipe_id.0)?;

                    let menu_item_id = e.details.menu_item_id;
                    self.store.upsert(
                        tenant_id,
                        menu_item_id,
                        RecipeView {
                            recipe_id: e.recipe_id,
                            menu_item_id,
                            name: e.details.name,
                            sku: e.details.sku,
                            components: e.details.components,
                            total_cost_per_item: e.details.total_cost_per_item,
                            version,
                            updated_at: e.occurred_at,
                        },
                    );
                    Ok(())
                }
            })
    }

    fn reset_tenant(&self, tenant_id: TenantId) {
        self.store.clear_tenant(tenant_id);
        self.cursors.clear_tenant(tenant_id);
    }
}
