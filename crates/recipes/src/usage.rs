use std::collections::BTreeMap;

use rust_decimal::Decimal;

use bistro_inventory::Sku;
use bistro_menu::Selection;

use crate::component::RecipeComponent;

/// Base-unit quantity of each ingredient consumed by `servings` of a menu item.
///
/// Base components are always consumed; bound components only when their option
/// is among `selections`. Prep waste is included, so the result is what leaves
/// the shelf.
pub fn ingredient_usage(
    components: &[RecipeComponent],
    selections: &[Selection],
    servings: Decimal,
) -> BTreeMap<Sku, Decimal> {
    let chosen = |component: &RecipeComponent| match &component.for_specification {
        None => true,
        Some(binding) => selections.iter().any(|s| {
            s.specification_id == binding.specification_id && s.option_ids.contains(&binding.option_id)
        }),
    };

    let mut usage = BTreeMap::new();
    for component in components.iter().filter(|c| chosen(*c)) {
        let total = usage
            .entry(component.ingredient_sku.clone())
            .or_insert(Decimal::ZERO);
        *total = total.saturating_add(component.gross_qty().saturating_mul(servings));
    }
    usage
}
