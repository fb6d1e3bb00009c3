//! Recipes domain module (event-sourced).
//!
//! One recipe per menu item, listing the ingredients (by sku, in base units) a
//! single serving consumes. Costing and usage are pure functions over a recipe's
//! components; they read ingredient costs through [`IngredientCosts`] and never
//! fail.

pub mod component;
pub mod costing;
pub mod recipe;
pub mod usage;

pub use component::{OptionBinding, RecipeComponent, validate_components};
pub use costing::{
    IngredientCosts, OptionCostRow, RecipeCostSheet, base_cost, component_cost, cost_with_option,
    cost_with_selections, margin_pct, missing_ingredients, option_cost,
};
pub use recipe::{
    AGGREGATE_TYPE, Recipe, RecipeCommand, RecipeDetails, RecipeEvent, RecipeId, RecipeSaved,
    SaveRecipe,
};
pub use usage::ingredient_usage;
