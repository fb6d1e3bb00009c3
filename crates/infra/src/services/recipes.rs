use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use bistro_core::{DomainError, TenantId};
use bistro_menu::{MenuItemId, Specification};
use bistro_recipes::{
    AGGREGATE_TYPE, Recipe, RecipeCommand, RecipeComponent, RecipeCostSheet, RecipeDetails,
    RecipeId, SaveRecipe, base_cost,
};

use crate::projections::RecipeView;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::menu::MenuService;

/// Result of saving a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub recipe_id: RecipeId,
    /// Stream revision after the save.
    pub version: u64,
    /// False when the same content was already stored.
    pub changed: bool,
}

/// Recipes per menu item and their cost sheets.
#[derive(Debug, Clone)]
pub struct RecipeService {
    ctx: Arc<ServiceContext>,
    menu: MenuService,
}

impl RecipeService {
    pub fn new(ctx: Arc<ServiceContext>, menu: MenuService) -> Self {
        Self { ctx, menu }
    }

    /// Create or replace the recipe of a menu item.
    ///
    /// Components bound to an option must name a specification option the menu
    /// item actually has.
    pub fn save_recipe(
        &self,
        tenant_id: TenantId,
        menu_item_id: MenuItemId,
        name: impl Into<String>,
        components: Vec<RecipeComponent>,
        sku: Option<String>,
        total_cost_per_item: Decimal,
    ) -> ServiceResult<SaveOutcome> {
        let menu_item = self.menu.require(tenant_id, &menu_item_id)?;
        check_bindings(&components, &menu_item.details.specifications)?;

        let recipe_id = RecipeId::for_menu_item(menu_item_id);
        let command = RecipeCommand::SaveRecipe(SaveRecipe {
            tenant_id,
            recipe_id,
            details: RecipeDetails {
                menu_item_id,
                name: name.into(),
                sku,
                components,
                total_cost_per_item,
            },
            occurred_at: Utc::now(),
        });
        let committed = self.ctx.dispatcher.dispatch_with_retry(
            tenant_id,
            recipe_id.0,
            AGGREGATE_TYPE,
            &command,
            |_, id| Recipe::empty(RecipeId(id)),
        )?;
        self.ctx.project(&committed)?;

        let changed = !committed.is_empty();
        let version = match committed.last() {
            Some(last) => last.sequence_number,
            None => self
                .get_recipe_by_menu_item(tenant_id, &menu_item_id)
                .map_or(0, |v| v.version),
        };

        if changed {
            info!(tenant_id = %tenant_id, recipe_id = %recipe_id, version, "recipe saved");
        } else {
            debug!(tenant_id = %tenant_id, recipe_id = %recipe_id, "recipe unchanged");
        }

        Ok(SaveOutcome {
            recipe_id,
            version,
            changed,
        })
    }

    /// [`save_recipe`](Self::save_recipe) with the per-item cost computed from
    /// current inventory costs.
    pub fn save_recipe_costed(
        &self,
        tenant_id: TenantId,
        menu_item_id: MenuItemId,
        name: impl Into<String>,
        components: Vec<RecipeComponent>,
        sku: Option<String>,
    ) -> ServiceResult<SaveOutcome> {
        let costs = self.ctx.read_models.inventory.costs(tenant_id);
        let total = base_cost(&components, &costs).round_dp(self.decimal_places());
        self.save_recipe(tenant_id, menu_item_id, name, components, sku, total)
    }

    pub fn get_recipe_by_menu_item(&self, tenant_id: TenantId, menu_item_id: &MenuItemId) -> Option<RecipeView> {
        self.ctx.read_models.recipes.get_by_menu_item(tenant_id, menu_item_id)
    }

    pub fn list_recipes(&self, tenant_id: TenantId) -> Vec<RecipeView> {
        self.ctx.read_models.recipes.list(tenant_id)
    }

    /// Base and per-option cost and margin of a menu item at current ingredient costs.
    pub fn cost_sheet(&self, tenant_id: TenantId, menu_item_id: &MenuItemId) -> ServiceResult<RecipeCostSheet> {
        let menu_item = self.menu.require(tenant_id, menu_item_id)?;
        let recipe = self
            .get_recipe_by_menu_item(tenant_id, menu_item_id)
            .ok_or_else(|| ServiceError::not_found(format!("recipe for menu item {menu_item_id}")))?;

        let costs = self.ctx.read_models.inventory.costs(tenant_id);
        let sheet = RecipeCostSheet::build(
            &recipe.components,
            menu_item.details.price,
            &menu_item.details.specifications,
            &costs,
        );
        Ok(sheet.rounded(self.decimal_places()))
    }

    fn decimal_places(&self) -> u32 {
        self.ctx.config.costing.currency_decimal_places
    }
}

fn check_bindings(components: &[RecipeComponent], specifications: &[Specification]) -> ServiceResult<()> {
    for binding in components.iter().filter_map(|c| c.for_specification.as_ref()) {
        let known = specifications
            .iter()
            .find(|s| s.id() == &binding.specification_id)
            .is_some_and(|s| s.option(&binding.option_id).is_some());
        if !known {
            return Err(DomainError::validation(format!(
                "component bound to unknown option '{}' of specification '{}'",
                binding.option_id, binding.specification_id
            ))
            .into());
        }
    }
    Ok(())
}
