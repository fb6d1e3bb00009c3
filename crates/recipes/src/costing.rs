//! Recipe cost calculator.
//!
//! Pure functions over a recipe's components and an ingredient cost lookup.
//! Nothing here fails: an ingredient without a known cost contributes zero, a
//! waste percentage outside 0..=100 is applied as given, and amounts beyond the
//! `Decimal` range saturate at its bounds.

use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bistro_inventory::Sku;
use bistro_menu::{OptionId, Selection, Specification, SpecificationId};

use crate::component::RecipeComponent;

/// Lookup of the current cost of one base unit of an ingredient.
pub trait IngredientCosts {
    fn cost_per_base_unit(&self, sku: &Sku) -> Option<Decimal>;
}

impl IngredientCosts for HashMap<Sku, Decimal> {
    fn cost_per_base_unit(&self, sku: &Sku) -> Option<Decimal> {
        self.get(sku).copied()
    }
}

impl<T> IngredientCosts for &T
where
    T: IngredientCosts + ?Sized,
{
    fn cost_per_base_unit(&self, sku: &Sku) -> Option<Decimal> {
        (**self).cost_per_base_unit(sku)
    }
}

/// `qty × cost_per_base_unit × (1 + waste/100)`; zero for unknown ingredients.
pub fn component_cost(component: &RecipeComponent, costs: &impl IngredientCosts) -> Decimal {
    costs
        .cost_per_base_unit(&component.ingredient_sku)
        .map_or(Decimal::ZERO, |unit_cost| component.gross_qty().saturating_mul(unit_cost))
}

/// Cost of one serving with no options chosen.
pub fn base_cost(components: &[RecipeComponent], costs: &impl IngredientCosts) -> Decimal {
    components
        .iter()
        .filter(|c| c.is_base())
        .map(|c| component_cost(c, costs))
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Extra cost of the components bound to one option.
pub fn option_cost(
    components: &[RecipeComponent],
    specification_id: &SpecificationId,
    option_id: &OptionId,
    costs: &impl IngredientCosts,
) -> Decimal {
    components
        .iter()
        .filter(|c| c.is_bound_to(specification_id, option_id))
        .map(|c| component_cost(c, costs))
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

pub fn cost_with_option(
    components: &[RecipeComponent],
    specification_id: &SpecificationId,
    option_id: &OptionId,
    costs: &impl IngredientCosts,
) -> Decimal {
    base_cost(components, costs).saturating_add(option_cost(components, specification_id, option_id, costs))
}

/// Base cost plus every chosen option's extra cost.
///
/// Selections are not checked against the menu item here; an option with no
/// bound components simply adds nothing.
pub fn cost_with_selections(
    components: &[RecipeComponent],
    selections: &[Selection],
    costs: &impl IngredientCosts,
) -> Decimal {
    let extras: Decimal = selections
        .iter()
        .flat_map(|s| s.option_ids.iter().map(move |o| (&s.specification_id, o)))
        .map(|(spec, opt)| option_cost(components, spec, opt, costs))
        .fold(Decimal::ZERO, Decimal::saturating_add);
    base_cost(components, costs).saturating_add(extras)
}

/// Gross margin in percent of the selling price. Zero when the price is not positive.
pub fn margin_pct(price: Decimal, cost: Decimal) -> Decimal {
    if price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let profit = price.saturating_sub(cost);
    match profit.checked_div(price) {
        Some(ratio) => ratio.saturating_mul(Decimal::ONE_HUNDRED),
        None if profit.is_sign_negative() => Decimal::MIN,
        None => Decimal::MAX,
    }
}

/// Skus referenced by the recipe that have no cost, sorted and de-duplicated.
pub fn missing_ingredients(components: &[RecipeComponent], costs: &impl IngredientCosts) -> Vec<Sku> {
    components
        .iter()
        .filter(|c| costs.cost_per_base_unit(&c.ingredient_sku).is_none())
        .map(|c| c.ingredient_sku.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Cost of one option, priced as if it were the only one chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionCostRow {
    pub specification_id: SpecificationId,
    pub specification_name: String,
    pub option_id: OptionId,
    pub option_name: String,
    pub extra_cost: Decimal,
    pub total_cost: Decimal,
    pub price: Decimal,
    pub margin_pct: Decimal,
}

/// Costing report for one menu item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeCostSheet {
    pub base_cost: Decimal,
    pub selling_price: Decimal,
    pub base_margin_pct: Decimal,
    pub options: Vec<OptionCostRow>,
    pub missing_ingredients: Vec<Sku>,
}

impl RecipeCostSheet {
    pub fn build(
        components: &[RecipeComponent],
        selling_price: Decimal,
        specifications: &[Specification],
        costs: &impl IngredientCosts,
    ) -> Self {
        let base = base_cost(components, costs);

        let options = specifications
            .iter()
            .flat_map(|spec| spec.options().iter().map(move |opt| (spec, opt)))
            .map(|(spec, opt)| {
                let extra_cost = option_cost(components, spec.id(), &opt.id, costs);
                let total_cost = base.saturating_add(extra_cost);
                let price = selling_price.saturating_add(opt.price_modifier);
                OptionCostRow {
                    specification_id: spec.id().clone(),
                    specification_name: spec.name().to_string(),
                    option_id: opt.id.clone(),
                    option_name: opt.name.clone(),
                    extra_cost,
                    total_cost,
                    price,
                    margin_pct: margin_pct(price, total_cost),
                }
            })
            .collect();

        Self {
            base_cost: base,
            selling_price,
            base_margin_pct: margin_pct(selling_price, base),
            options,
            missing_ingredients: missing_ingredients(components, costs),
        }
    }

    /// Copy with every amount rounded to `dp` decimal places for display.
    pub fn rounded(&self, dp: u32) -> Self {
        Self {
            base_cost: self.base_cost.round_dp(dp),
            selling_price: self.selling_price.round_dp(dp),
            base_margin_pct: self.base_margin_pct.round_dp(dp),
            options: self
                .options
                .iter()
                .map(|row| OptionCostRow {
                    extra_cost: row.extra_cost.round_dp(dp),
                    total_cost: row.total_cost.round_dp(dp),
                    price: row.price.round_dp(dp),
                    margin_pct: row.margin_pct.round_dp(dp),
                    ..row.clone()
                })
                .collect(),
            missing_ingredients: self.missing_ingredients.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::OptionBinding;
    use bistro_menu::SpecOption;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn sku(raw: &str) -> Sku {
        Sku::parse(raw).unwrap()
    }

    fn costs(entries: &[(&str, Decimal)]) -> HashMap<Sku, Decimal> {
        entries.iter().map(|(s, c)| (sku(s), *c)).collect()
    }

    #[test]
    fn worked_example_cost_and_margin() {
        let prices = costs(&[("SAUCE", dec!(2.00)), ("BUN", dec!(2.00))]);
        let components = vec![
            RecipeComponent::base(sku("SAUCE"), dec!(0.5)).with_waste(dec!(10)),
            RecipeComponent::base(sku("BUN"), dec!(0.5)).with_waste(dec!(10)),
        ];

        assert_eq!(component_cost(&components[0], &prices), dec!(1.10));
        assert_eq!(base_cost(&components, &prices), dec!(2.20));
        assert_eq!(margin_pct(dec!(10.00), dec!(2.20)), dec!(78));
    }

    #[test]
    fn unknown_ingredient_costs_nothing_and_is_reported() {
        let prices = costs(&[("BUN", dec!(0.40))]);
        let components = vec![
            RecipeComponent::base(sku("BUN"), dec!(1)),
            RecipeComponent::base(sku("TRUFFLE"), dec!(5)),
        ];

        assert_eq!(base_cost(&components, &prices), dec!(0.40));
        assert_eq!(missing_ingredients(&components, &prices), vec![sku("TRUFFLE")]);
    }

    #[test]
    fn waste_outside_form_range_is_applied_as_given() {
        let prices = costs(&[("OIL", dec!(1))]);
        let over = RecipeComponent::base(sku("OIL"), dec!(10)).with_waste(dec!(150));
        let under = RecipeComponent::base(sku("OIL"), dec!(10)).with_waste(dec!(-20));

        assert_eq!(component_cost(&over, &prices), dec!(25));
        assert_eq!(component_cost(&under, &prices), dec!(8));
    }

    #[test]
    fn option_components_only_count_when_selected() {
        let prices = costs(&[("PATTY", dec!(2.50)), ("CHEESE", dec!(0.02)), ("BACON", dec!(0.03))]);
        let components = vec![
            RecipeComponent::base(sku("PATTY"), dec!(1)),
            RecipeComponent::base(sku("CHEESE"), dec!(20)).for_option(OptionBinding::new("extras", "cheese")),
            RecipeComponent::base(sku("BACON"), dec!(30)).for_option(OptionBinding::new("extras", "bacon")),
        ];

        assert_eq!(base_cost(&components, &prices), dec!(2.50));
        assert_eq!(
            cost_with_option(&components, &"extras".into(), &"cheese".into(), &prices),
            dec!(2.90)
        );
        assert_eq!(
            cost_with_selections(
                &components,
                &[Selection::new("extras", vec!["cheese".into(), "bacon".into()])],
                &prices
            ),
            dec!(3.80)
        );
    }

    #[test]
    fn margin_guards_non_positive_price() {
        assert_eq!(margin_pct(Decimal::ZERO, dec!(3)), Decimal::ZERO);
        assert_eq!(margin_pct(dec!(-1), dec!(3)), Decimal::ZERO);
        assert_eq!(margin_pct(dec!(4), dec!(5)), dec!(-25));
    }

    #[test]
    fn amounts_beyond_decimal_range_saturate() {
        let huge_qty = Decimal::from(100_000_000_000_000_000i64);
        let prices = costs(&[("TRUFFLE", Decimal::from(10_000_000_000_000_000i64))]);
        let components = vec![
            RecipeComponent::base(sku("TRUFFLE"), huge_qty),
            RecipeComponent::base(sku("TRUFFLE"), huge_qty).for_option(OptionBinding::new("size", "large")),
        ];

        assert_eq!(base_cost(&components, &prices), Decimal::MAX);
        assert_eq!(cost_with_option(&components, &"size".into(), &"large".into(), &prices), Decimal::MAX);
        assert_eq!(margin_pct(dec!(10), Decimal::MAX), Decimal::MIN);
        assert_eq!(margin_pct(dec!(0.0001), Decimal::MAX), Decimal::MIN);

        let sheet = RecipeCostSheet::build(&components, dec!(10), &[], &prices);
        assert_eq!(sheet.base_cost, Decimal::MAX);
    }

    #[test]
    fn cost_sheet_rows_per_option() {
        let prices = costs(&[("PATTY", dec!(2.50)), ("CHEESE", dec!(0.02))]);
        let components = vec![
            RecipeComponent::base(sku("PATTY"), dec!(1)),
            RecipeComponent::base(sku("CHEESE"), dec!(20)).for_option(OptionBinding::new("extras", "cheese")),
            RecipeComponent::base(sku("PICKLE"), dec!(5)),
        ];
        let specs = vec![Specification::MultiSelect {
            id: "extras".into(),
            name: "Extras".into(),
            min_selections: 0,
            max_selections: 2,
            options: vec![
                SpecOption::new("cheese", "Cheese", dec!(1.00)),
                SpecOption::new("onion", "Onion", dec!(0.50)),
            ],
        }];

        let sheet = RecipeCostSheet::build(&components, dec!(9.00), &specs, &prices).rounded(2);

        assert_eq!(sheet.base_cost, dec!(2.50));
        assert_eq!(sheet.base_margin_pct, dec!(72.22));
        assert_eq!(sheet.options.len(), 2);
        assert_eq!(sheet.options[0].extra_cost, dec!(0.40));
        assert_eq!(sheet.options[0].total_cost, dec!(2.90));
        assert_eq!(sheet.options[0].price, dec!(10.00));
        assert_eq!(sheet.options[0].margin_pct, dec!(71.00));
        assert_eq!(sheet.options[1].extra_cost, Decimal::ZERO);
        assert_eq!(sheet.missing_ingredients, vec![sku("PICKLE")]);
    }

    fn amount() -> impl Strategy<Value = Decimal> {
        (0i64..100_000).prop_map(|v| Decimal::new(v, 3))
    }

    fn component_strategy() -> impl Strategy<Value = (usize, Decimal, Decimal, Option<usize>)> {
        (0usize..4, (1i64..10_000).prop_map(|q| Decimal::new(q, 2)), (0i64..100).prop_map(Decimal::from), prop::option::of(0usize..2))
    }

    fn build(raw: Vec<(usize, Decimal, Decimal, Option<usize>)>) -> Vec<RecipeComponent> {
        raw.into_iter()
            .map(|(s, qty, waste, opt)| {
                let c = RecipeComponent::base(sku(&format!("ING-{s}")), qty).with_waste(waste);
                match opt {
                    Some(o) => c.for_option(OptionBinding::new("spec", format!("opt-{o}").as_str())),
                    None => c,
                }
            })
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: base cost is the plain sum over unbound components and ignores bound ones.
        #[test]
        fn base_cost_ignores_option_components(
            raw in prop::collection::vec(component_strategy(), 0..12),
            unit_costs in prop::collection::vec(amount(), 4),
            bump in amount(),
        ) {
            let prices: HashMap<Sku, Decimal> = unit_costs
                .iter()
                .enumerate()
                .map(|(i, c)| (sku(&format!("ING-{i}")), *c))
                .collect();
            let components = build(raw);

            let expected: Decimal = components
                .iter()
                .filter(|c| c.for_specification.is_none())
                .map(|c| c.qty_per_item_base * prices[&c.ingredient_sku] * (Decimal::ONE + c.waste_pct / Decimal::ONE_HUNDRED))
                .sum();
            prop_assert_eq!(base_cost(&components, &prices), expected);

            let mut changed = components.clone();
            for c in changed.iter_mut().filter(|c| !c.is_base()) {
                c.qty_per_item_base += bump;
            }
            prop_assert_eq!(base_cost(&changed, &prices), expected);
        }

        /// Property: with non-negative contributions an option never lowers the cost.
        #[test]
        fn option_cost_never_below_base(
            raw in prop::collection::vec(component_strategy(), 0..12),
            unit_costs in prop::collection::vec(amount(), 4),
            opt in 0usize..2,
        ) {
            let prices: HashMap<Sku, Decimal> = unit_costs
                .iter()
                .enumerate()
                .map(|(i, c)| (sku(&format!("ING-{i}")), *c))
                .collect();
            let components = build(raw);
            let option: OptionId = format!("opt-{opt}").as_str().into();

            prop_assert!(
                cost_with_option(&components, &"spec".into(), &option, &prices)
                    >= base_cost(&components, &prices)
            );
        }

        #[test]
        fn zero_price_margin_is_zero(cost in amount()) {
            prop_assert_eq!(margin_pct(Decimal::ZERO, cost), Decimal::ZERO);
        }
    }
}
