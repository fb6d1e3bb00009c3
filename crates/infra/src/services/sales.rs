use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use bistro_core::{DomainError, TenantId};
use bistro_inventory::{MovementDetails, MovementType, Sku, StockMovement, check_sign, total_cost};
use bistro_menu::{MenuItemId, Selection, price_with_selections};
use bistro_recipes::{cost_with_selections, ingredient_usage};

use super::error::{ServiceError, ServiceResult};
use super::inventory::InventoryService;
use super::menu::MenuService;
use super::recipes::RecipeService;

/// Stock consumed by one order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleRecord {
    pub menu_item_id: MenuItemId,
    pub servings: Decimal,
    /// Selling price of the line, options included.
    pub revenue: Decimal,
    /// Ingredient cost of the line at current costs.
    pub cost: Decimal,
    pub movements: Vec<StockMovement>,
    /// Recipe ingredients with no inventory item; nothing was booked for them.
    pub skipped: Vec<Sku>,
}

/// Books ingredient consumption for sold menu items.
#[derive(Debug, Clone)]
pub struct SalesService {
    inventory: InventoryService,
    menu: MenuService,
    recipes: RecipeService,
}

impl SalesService {
    pub fn new(inventory: InventoryService, menu: MenuService, recipes: RecipeService) -> Self {
        Self {
            inventory,
            menu,
            recipes,
        }
    }

    /// Record one `sale` movement per ingredient used by `servings` of the item.
    ///
    /// The whole line is validated before anything is booked, including the sign
    /// and amounts of every movement. Each ingredient is then booked on its own
    /// stream, so a storage failure midway leaves the earlier movements recorded.
    pub fn record_sale(
        &self,
        tenant_id: TenantId,
        menu_item_id: MenuItemId,
        selections: &[Selection],
        servings: Decimal,
        reference: Option<String>,
    ) -> ServiceResult<SaleRecord> {
        if servings <= Decimal::ZERO {
            return Err(DomainError::validation("servings must be positive").into());
        }

        let menu_item = self.menu.require(tenant_id, &menu_item_id)?;
        if !menu_item.details.is_available {
            return Err(DomainError::validation(format!(
                "menu item '{}' is not available",
                menu_item.details.name
            ))
            .into());
        }
        let unit_price = price_with_selections(
            menu_item.details.price,
            &menu_item.details.specifications,
            selections,
        )?;

        let recipe = self
            .recipes
            .get_recipe_by_menu_item(tenant_id, &menu_item_id)
            .ok_or_else(|| ServiceError::not_found(format!("recipe for menu item {menu_item_id}")))?;

        let unit_cost = cost_with_selections(
            &recipe.components,
            selections,
            &self.inventory.ingredient_costs(tenant_id),
        );

        let revenue = unit_price
            .checked_mul(servings)
            .ok_or_else(|| DomainError::validation("sale revenue is out of range"))?;
        let cost = unit_cost
            .checked_mul(servings)
            .ok_or_else(|| DomainError::validation("sale cost is out of range"))?;

        let mut bookings = Vec::new();
        let mut skipped = Vec::new();
        for (sku, qty) in ingredient_usage(&recipe.components, selections, servings) {
            if qty.is_zero() {
                continue;
            }
            let Some(item) = self.inventory.get_item(tenant_id, &sku) else {
                warn!(
                    tenant_id = %tenant_id,
                    menu_item_id = %menu_item_id,
                    sku = %sku,
                    "recipe ingredient not in inventory, skipping"
                );
                skipped.push(sku);
                continue;
            };
            let quantity_base = -qty;
            check_sign(MovementType::Sale, quantity_base)
                .map_err(|e| DomainError::validation(format!("ingredient {sku}: {e}")))?;
            total_cost(quantity_base, Some(item.cost_per_base_unit()))?;
            if item.current_stock_base.checked_add(quantity_base).is_none() {
                return Err(DomainError::validation(format!("ingredient {sku}: stock balance overflow")).into());
            }
            bookings.push((item, quantity_base));
        }

        let mut movements = Vec::with_capacity(bookings.len());
        for (item, quantity_base) in bookings {
            let mut details = MovementDetails::default()
                .with_reason("sale")
                .with_cost_per_unit(item.cost_per_base_unit());
            if let Some(reference) = &reference {
                details = details.with_reference(reference.clone());
            }

            let movement =
                self.inventory
                    .record_movement(tenant_id, item.item_id, MovementType::Sale, quantity_base, details)?;
            movements.push(movement);
        }

        info!(
            tenant_id = %tenant_id,
            menu_item_id = %menu_item_id,
            %servings,
            movements = movements.len(),
            skipped = skipped.len(),
            "sale recorded"
        );

        Ok(SaleRecord {
            menu_item_id,
            servings,
            revenue,
            cost,
            movements,
            skipped,
        })
    }
}
