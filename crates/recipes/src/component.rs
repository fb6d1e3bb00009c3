use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bistro_core::{DomainError, DomainResult, ValueObject};
use bistro_inventory::Sku;
use bistro_menu::{OptionId, SpecificationId};

/// Ties a component to one option of one specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionBinding {
    pub specification_id: SpecificationId,
    pub option_id: OptionId,
}

impl OptionBinding {
    pub fn new(specification_id: impl Into<SpecificationId>, option_id: impl Into<OptionId>) -> Self {
        Self {
            specification_id: specification_id.into(),
            option_id: option_id.into(),
        }
    }

    pub fn matches(&self, specification_id: &SpecificationId, option_id: &OptionId) -> bool {
        &self.specification_id == specification_id && &self.option_id == option_id
    }
}

/// One ingredient line of a recipe.
///
/// Components without a binding belong to the base recipe. Bound components are
/// only consumed (and only cost anything) when their option is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeComponent {
    pub ingredient_sku: Sku,
    pub qty_per_item_base: Decimal,
    /// Expected loss during prep, in percent.
    pub waste_pct: Decimal,
    pub for_specification: Option<OptionBinding>,
}

impl ValueObject for RecipeComponent {}

impl RecipeComponent {
    pub fn base(ingredient_sku: Sku, qty_per_item_base: Decimal) -> Self {
        Self {
            ingredient_sku,
            qty_per_item_base,
            waste_pct: Decimal::ZERO,
            for_specification: None,
        }
    }

    pub fn with_waste(mut self, waste_pct: Decimal) -> Self {
        self.waste_pct = waste_pct;
        self
    }

    pub fn for_option(mut self, binding: OptionBinding) -> Self {
        self.for_specification = Some(binding);
        self
    }

    pub fn is_base(&self) -> bool {
        self.for_specification.is_none()
    }

    pub fn is_bound_to(&self, specification_id: &SpecificationId, option_id: &OptionId) -> bool {
        self.for_specification
            .as_ref()
            .is_some_and(|b| b.matches(specification_id, option_id))
    }

    /// Quantity actually drawn from stock per serving, prep waste included.
    ///
    /// Saturates at the `Decimal` range instead of overflowing.
    pub fn gross_qty(&self) -> Decimal {
        let waste_factor = Decimal::ONE.saturating_add(self.waste_pct / Decimal::ONE_HUNDRED);
        self.qty_per_item_base.saturating_mul(waste_factor)
    }
}

/// Structural checks on a component list.
///
/// Waste percentages are not range-checked; costing applies whatever was entered.
pub fn validate_components(components: &[RecipeComponent]) -> DomainResult<()> {
    let mut seen = HashSet::new();
    for component in components {
        if component.qty_per_item_base <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "quantity for {} must be positive",
                component.ingredient_sku
            )));
        }
        if !seen.insert((&component.ingredient_sku, &component.for_specification)) {
            return Err(DomainError::validation(format!(
                "{} is listed twice for the same option",
                component.ingredient_sku
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sku(raw: &str) -> Sku {
        Sku::parse(raw).unwrap()
    }

    #[test]
    fn gross_quantity_includes_waste() {
        let c = RecipeComponent::base(sku("FLOUR"), dec!(200)).with_waste(dec!(5));
        assert_eq!(c.gross_qty(), dec!(210));
    }

    #[test]
    fn binding_matches_exact_option() {
        let c = RecipeComponent::base(sku("CHEESE"), dec!(30))
            .for_option(OptionBinding::new("extras", "cheese"));

        assert!(!c.is_base());
        assert!(c.is_bound_to(&"extras".into(), &"cheese".into()));
        assert!(!c.is_bound_to(&"extras".into(), &"bacon".into()));
    }

    #[test]
    fn rejects_non_positive_quantity_and_duplicates() {
        assert!(validate_components(&[RecipeComponent::base(sku("A"), dec!(0))]).is_err());

        let dup = [
            RecipeComponent::base(sku("A"), dec!(1)),
            RecipeComponent::base(sku("a"), dec!(2)),
        ];
        assert!(validate_components(&dup).is_err());

        // Same sku for base and for an option is fine.
        let split = [
            RecipeComponent::base(sku("A"), dec!(1)),
            RecipeComponent::base(sku("A"), dec!(2)).for_option(OptionBinding::new("size", "large")),
        ];
        assert!(validate_components(&split).is_ok());
    }
}
