use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bistro_core::{Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, TenantId};
use bistro_events::Event;
use bistro_menu::MenuItemId;

use crate::component::{RecipeComponent, validate_components};

pub const AGGREGATE_TYPE: &str = "recipes.recipe";

/// Recipe identifier.
///
/// Always derived from the menu item it belongs to, so a menu item can only ever
/// have one recipe stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(pub AggregateId);

impl RecipeId {
    pub fn for_menu_item(menu_item_id: MenuItemId) -> Self {
        Self(AggregateId::derived(menu_item_id.0, "recipe"))
    }
}

impl core::fmt::Display for RecipeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDetails {
    pub menu_item_id: MenuItemId,
    pub name: String,
    /// Optional code printed on prep sheets.
    pub sku: Option<String>,
    pub components: Vec<RecipeComponent>,
    /// Cost of one serving without options, as last computed.
    pub total_cost_per_item: Decimal,
}

impl RecipeDetails {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("recipe name cannot be empty"));
        }
        if self.total_cost_per_item < Decimal::ZERO {
            return Err(DomainError::validation("total cost cannot be negative"));
        }
        validate_components(&self.components)
    }

    pub fn base_components(&self) -> impl Iterator<Item = &RecipeComponent> {
        self.components.iter().filter(|c| c.is_base())
    }
}

/// Aggregate root: Recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    id: RecipeId,
    tenant_id: Option<TenantId>,
    details: Option<RecipeDetails>,
    version: u64,
}

impl Recipe {
    /// Create an empty, not-yet-saved aggregate instance for rehydration.
    pub fn empty(id: RecipeId) -> Self {
        Self {
            id,
            tenant_id: None,
            details: None,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> RecipeId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn details(&self) -> Option<&RecipeDetails> {
        self.details.as_ref()
    }
}

impl AggregateRoot for Recipe {
    type Id = RecipeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SaveRecipe (create or replace).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRecipe {
    pub tenant_id: TenantId,
    pub recipe_id: RecipeId,
    pub details: RecipeDetails,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipeCommand {
    SaveRecipe(SaveRecipe),
}

/// Event: RecipeSaved (full snapshot of the recipe).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSaved {
    pub tenant_id: TenantId,
    pub recipe_id: RecipeId,
    pub details: RecipeDetails,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipeEvent {
    RecipeSaved(RecipeSaved),
}

impl Event for RecipeEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RecipeEvent::RecipeSaved(_) => "recipes.recipe.saved",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RecipeEvent::RecipeSaved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Recipe {
    type Command = RecipeCommand;
    type Event = RecipeEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RecipeEvent::RecipeSaved(e) => {
                self.id = e.recipe_id;
                self.tenant_id = Some(e.tenant_id);
                self.details = Some(e.details.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RecipeCommand::SaveRecipe(cmd) => {
                if cmd.recipe_id != RecipeId::for_menu_item(cmd.details.menu_item_id) {
                    return Err(DomainError::invariant(
                        "recipe id does not belong to the menu item",
                    ));
                }
                if let Some(tenant_id) = self.tenant_id {
                    if tenant_id != cmd.tenant_id {
                        return Err(DomainError::invariant("tenant mismatch"));
                    }
                }
                cmd.details.validate()?;

                if self.details.as_ref() == Some(&cmd.details) {
                    return Ok(vec![]);
                }

                Ok(vec![RecipeEvent::RecipeSaved(RecipeSaved {
                    tenant_id: cmd.tenant_id,
                    recipe_id: cmd.recipe_id,
                    details: cmd.details.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::OptionBinding;
    use bistro_events::execute;
    use bistro_inventory::Sku;
    use rust_decimal_macros::dec;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn details(menu_item_id: MenuItemId) -> RecipeDetails {
        RecipeDetails {
            menu_item_id,
            name: "Margherita".into(),
            sku: Some("PZ-MARG".into()),
            components: vec![
                RecipeComponent::base(Sku::parse("DOUGH").unwrap(), dec!(250)),
                RecipeComponent::base(Sku::parse("MOZZ").unwrap(), dec!(120)).with_waste(dec!(5)),
                RecipeComponent::base(Sku::parse("BASIL").unwrap(), dec!(3))
                    .for_option(OptionBinding::new("extras", "basil")),
            ],
            total_cost_per_item: dec!(1.85),
        }
    }

    fn save(tenant_id: TenantId, details: RecipeDetails) -> RecipeCommand {
        RecipeCommand::SaveRecipe(SaveRecipe {
            tenant_id,
            recipe_id: RecipeId::for_menu_item(details.menu_item_id),
            details,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn one_recipe_id_per_menu_item() {
        let menu = MenuItemId::new(AggregateId::new());
        assert_eq!(RecipeId::for_menu_item(menu), RecipeId::for_menu_item(menu));
        assert_ne!(
            RecipeId::for_menu_item(menu),
            RecipeId::for_menu_item(MenuItemId::new(AggregateId::new()))
        );
    }

    #[test]
    fn save_creates_then_replaces() {
        let tenant_id = test_tenant_id();
        let menu = MenuItemId::new(AggregateId::new());
        let mut recipe = Recipe::empty(RecipeId::for_menu_item(menu));

        execute(&mut recipe, &save(tenant_id, details(menu))).unwrap();
        assert_eq!(recipe.version(), 1);
        assert_eq!(recipe.details().unwrap().base_components().count(), 2);

        let mut replaced = details(menu);
        replaced.components.truncate(1);
        replaced.total_cost_per_item = dec!(0.50);
        execute(&mut recipe, &save(tenant_id, replaced.clone())).unwrap();

        assert_eq!(recipe.version(), 2);
        assert_eq!(recipe.details(), Some(&replaced));

        // Saving identical content records nothing.
        let events = execute(&mut recipe, &save(tenant_id, replaced)).unwrap();
        assert!(events.is_empty());
        assert_eq!(recipe.version(), 2);
    }

    #[test]
    fn rejects_foreign_recipe_id() {
        let menu = MenuItemId::new(AggregateId::new());
        let recipe = Recipe::empty(RecipeId::for_menu_item(menu));

        let err = recipe
            .handle(&RecipeCommand::SaveRecipe(SaveRecipe {
                tenant_id: test_tenant_id(),
                recipe_id: RecipeId(AggregateId::new()),
                details: details(menu),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn validation_errors() {
        let menu = MenuItemId::new(AggregateId::new());
        let recipe = Recipe::empty(RecipeId::for_menu_item(menu));

        let mut unnamed = details(menu);
        unnamed.name = " ".into();
        assert!(recipe.handle(&save(test_tenant_id(), unnamed)).is_err());

        let mut negative = details(menu);
        negative.total_cost_per_item = dec!(-0.01);
        assert!(recipe.handle(&save(test_tenant_id(), negative)).is_err());

        let mut zero_qty = details(menu);
        zero_qty.components[0].qty_per_item_base = Decimal::ZERO;
        assert!(recipe.handle(&save(test_tenant_id(), zero_qty)).is_err());
    }

    #[test]
    fn other_tenant_cannot_overwrite() {
        let menu = MenuItemId::new(AggregateId::new());
        let mut recipe = Recipe::empty(RecipeId::for_menu_item(menu));
        execute(&mut recipe, &save(test_tenant_id(), details(menu))).unwrap();

        assert!(recipe.handle(&save(test_tenant_id(), details(menu))).is_err());
    }
}
