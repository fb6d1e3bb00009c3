//! Integration tests for the full pipeline.
//!
//! Service → CommandDispatcher → EventStore → EventBus → Projections → queries
//!
//! Verifies:
//! - Writes are visible to the writer immediately
//! - Concurrent stock movements serialize into one gap-free ledger
//! - Read models rebuild to the same state from the event store
//! - Tenants never see each other's data

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use bistro_core::TenantId;
    use bistro_inventory::{
        InventoryItemId, ItemDetails, MovementDetails, MovementType, Sku, StockStatus, Unit,
        verify_balance_chain,
    };
    use bistro_menu::{MenuItemDetails, MenuItemId, MenuLayout, Selection, SpecOption, Specification};
    use bistro_recipes::{OptionBinding, RecipeComponent};

    use crate::command_dispatcher::DispatchError;
    use crate::config::PlatformConfig;
    use crate::event_store::EventStore;
    use crate::platform::Platform;
    use crate::services::{ReadModels, ServiceError};

    fn sku(raw: &str) -> Sku {
        Sku::parse(raw).unwrap()
    }

    fn ingredient(tenant_id: TenantId, platform: &Platform, code: &str, opening: Decimal) -> InventoryItemId {
        platform
            .inventory()
            .create_item(
                tenant_id,
                ItemDetails::new(sku(code), code.to_lowercase(), Unit::Gram, dec!(2.00))
                    .with_stock_limits(dec!(5), None),
                opening,
            )
            .unwrap()
            .item_id
    }

    fn pizza() -> MenuItemDetails {
        MenuItemDetails::new("Margherita", "pizza", dec!(10.00)).with_specification(Specification::SingleSelect {
            id: "size".into(),
            name: "Size".into(),
            required: false,
            options: vec![
                SpecOption::new("regular", "Regular", Decimal::ZERO),
                SpecOption::new("large", "Large", dec!(2.00)),
            ],
        })
    }

    fn pizza_components() -> Vec<RecipeComponent> {
        vec![
            RecipeComponent::base(sku("CHEESE"), dec!(0.5)).with_waste(dec!(10)),
            RecipeComponent::base(sku("TOMATO"), dec!(0.5)).with_waste(dec!(10)),
            RecipeComponent::base(sku("CHEESE"), dec!(0.5))
                .with_waste(dec!(10))
                .for_option(OptionBinding::new("size", "large")),
        ]
    }

    /// Tenant with cheese and tomato in stock and a costed Margherita recipe.
    fn pizzeria(platform: &Platform) -> (TenantId, MenuItemId) {
        let tenant_id = TenantId::new();
        ingredient(tenant_id, platform, "CHEESE", dec!(100));
        ingredient(tenant_id, platform, "TOMATO", dec!(50));

        let menu_item_id = platform.menu().create_menu_item(tenant_id, pizza()).unwrap().menu_item_id;
        platform
            .recipes()
            .save_recipe_costed(tenant_id, menu_item_id, "Margherita", pizza_components(), None)
            .unwrap();
        (tenant_id, menu_item_id)
    }

    fn wait_until(mut done: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn created_item_is_readable_with_opening_balance_on_the_ledger() {
        let platform = Platform::in_memory();
        let tenant_id = TenantId::new();
        let item_id = ingredient(tenant_id, &platform, "FLOUR", dec!(100));

        let view = platform.inventory().get_item(tenant_id, &sku("FLOUR")).unwrap();
        assert_eq!(view.item_id, item_id);
        assert_eq!(view.current_stock_base, dec!(100));
        assert_eq!(view.status, StockStatus::Normal);

        let ledger = platform.inventory().movements(tenant_id, &item_id);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].movement_type, MovementType::Adjustment);
        assert_eq!(ledger[0].balance_after, dec!(100));
    }

    #[test]
    fn purchase_chains_onto_the_previous_balance() {
        let platform = Platform::in_memory();
        let tenant_id = TenantId::new();
        let item_id = ingredient(tenant_id, &platform, "FLOUR", dec!(100));

        let movement = platform
            .inventory()
            .record_movement(
                tenant_id,
                item_id,
                MovementType::Purchase,
                dec!(50),
                MovementDetails::default().with_cost_per_unit(dec!(1.50)),
            )
            .unwrap();

        assert_eq!(movement.balance_after, dec!(150));
        assert_eq!(movement.total_cost, Some(dec!(75.00)));

        let ledger = platform.inventory().movements(tenant_id, &item_id);
        assert_eq!(ledger[0].balance_after, dec!(100));
        assert_eq!(ledger[1], movement);
        assert_eq!(
            platform.inventory().get_item_by_id(tenant_id, &item_id).unwrap().current_stock_base,
            dec!(150)
        );
    }

    #[test]
    fn wrong_sign_movement_is_rejected_and_nothing_changes() {
        let platform = Platform::in_memory();
        let tenant_id = TenantId::new();
        let item_id = ingredient(tenant_id, &platform, "FLOUR", dec!(100));

        let err = platform
            .inventory()
            .record_movement(tenant_id, item_id, MovementType::Sale, dec!(5), MovementDetails::default())
            .unwrap_err();

        assert!(matches!(err, ServiceError::Dispatch(DispatchError::Validation(_))));
        assert!(err.is_client_error());
        assert_eq!(platform.inventory().movements(tenant_id, &item_id).len(), 1);
    }

    #[test]
    fn concurrent_movements_serialize_into_a_gap_free_ledger() {
        let mut config = PlatformConfig::default();
        config.dispatch.max_concurrency_retries = 100;
        let platform = Arc::new(Platform::from_config(config));
        let tenant_id = TenantId::new();
        let item_id = ingredient(tenant_id, &platform, "FLOUR", dec!(10));

        const WRITERS: usize = 8;
        let handles: Vec<_> = (0..WRITERS)
            .map(|_| {
                let platform = platform.clone();
                thread::spawn(move || {
                    platform
                        .inventory()
                        .record_movement(
                            tenant_id,
                            item_id,
                            MovementType::Purchase,
                            dec!(1),
                            MovementDetails::default(),
                        )
                        .unwrap()
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let view = platform.inventory().get_item_by_id(tenant_id, &item_id).unwrap();
        assert_eq!(view.current_stock_base, dec!(18));
        assert_eq!(view.movement_count, 1 + WRITERS as u64);

        let ledger = platform.inventory().movements(tenant_id, &item_id);
        assert_eq!(ledger.len(), 1 + WRITERS);
        verify_balance_chain(&ledger).unwrap();
        assert_eq!(ledger.last().unwrap().balance_after, dec!(18));
    }

    #[test]
    fn sku_is_unique_per_tenant_only() {
        let platform = Platform::in_memory();
        let (a, b) = (TenantId::new(), TenantId::new());
        let flour = ingredient(a, &platform, "FLOUR", dec!(1));
        ingredient(b, &platform, "FLOUR", dec!(1));

        let dup = platform
            .inventory()
            .create_item(a, ItemDetails::new(sku("FLOUR"), "flour 2", Unit::Gram, dec!(1)), Decimal::ZERO)
            .unwrap_err();
        assert!(matches!(dup, ServiceError::DuplicateSku(ref s) if s.as_str() == "FLOUR"));

        let sugar = ingredient(a, &platform, "SUGAR", dec!(1));
        let clash = platform
            .inventory()
            .update_item(a, sugar, ItemDetails::new(sku("FLOUR"), "sugar", Unit::Gram, dec!(1)))
            .unwrap_err();
        assert!(matches!(clash, ServiceError::DuplicateSku(_)));

        platform.inventory().delete_item(a, flour).unwrap();
        assert!(platform.inventory().get_item(a, &sku("FLOUR")).is_none());
        platform
            .inventory()
            .update_item(a, sugar, ItemDetails::new(sku("FLOUR"), "sugar", Unit::Gram, dec!(1)))
            .unwrap();
        assert_eq!(platform.inventory().get_item(a, &sku("FLOUR")).unwrap().item_id, sugar);
        assert!(platform.inventory().get_item(a, &sku("SUGAR")).is_none());
    }

    #[test]
    fn tenant_isolation_preserved() {
        let platform = Platform::in_memory();
        let (a, b) = (TenantId::new(), TenantId::new());
        let item_a = ingredient(a, &platform, "FLOUR", dec!(10));

        assert_eq!(platform.inventory().list_items(a).len(), 1);
        assert!(platform.inventory().list_items(b).is_empty());
        assert!(platform.inventory().get_item_by_id(b, &item_a).is_none());

        let err = platform
            .inventory()
            .record_movement(b, item_a, MovementType::Purchase, dec!(1), MovementDetails::default())
            .unwrap_err();
        assert!(matches!(err, ServiceError::Dispatch(DispatchError::NotFound)));
        assert_eq!(
            platform.inventory().get_item_by_id(a, &item_a).unwrap().current_stock_base,
            dec!(10)
        );
        assert!(platform.inventory().movements(b, &item_a).is_empty());
    }

    #[test]
    fn low_stock_follows_movements() {
        let platform = Platform::in_memory();
        let tenant_id = TenantId::new();
        let item_id = ingredient(tenant_id, &platform, "FLOUR", dec!(3));

        let low = platform.inventory().low_stock(tenant_id);
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].status, StockStatus::LowStock);

        platform
            .inventory()
            .record_movement(tenant_id, item_id, MovementType::Purchase, dec!(7), MovementDetails::default())
            .unwrap();
        assert!(platform.inventory().low_stock(tenant_id).is_empty());

        platform
            .inventory()
            .record_movement(tenant_id, item_id, MovementType::Waste, dec!(-12), MovementDetails::default())
            .unwrap();
        let view = platform.inventory().get_item_by_id(tenant_id, &item_id).unwrap();
        assert_eq!(view.current_stock_base, dec!(-2));
        assert_eq!(view.status, StockStatus::OutOfStock);
    }

    #[test]
    fn cost_sheet_prices_base_and_options() {
        let platform = Platform::in_memory();
        let (tenant_id, menu_item_id) = pizzeria(&platform);

        let recipe = platform.recipes().get_recipe_by_menu_item(tenant_id, &menu_item_id).unwrap();
        assert_eq!(recipe.total_cost_per_item, dec!(2.20));

        let sheet = platform.recipes().cost_sheet(tenant_id, &menu_item_id).unwrap();
        assert_eq!(sheet.base_cost, dec!(2.20));
        assert_eq!(sheet.selling_price, dec!(10.00));
        assert_eq!(sheet.base_margin_pct, dec!(78));
        assert!(sheet.missing_ingredients.is_empty());

        let large = sheet.options.iter().find(|r| r.option_id.as_str() == "large").unwrap();
        assert_eq!(large.extra_cost, dec!(1.10));
        assert_eq!(large.total_cost, dec!(3.30));
        assert_eq!(large.price, dec!(12.00));
        assert_eq!(large.margin_pct, dec!(72.50));

        let regular = sheet.options.iter().find(|r| r.option_id.as_str() == "regular").unwrap();
        assert_eq!(regular.total_cost, dec!(2.20));
    }

    #[test]
    fn resaving_identical_recipe_is_a_no_op() {
        let platform = Platform::in_memory();
        let (tenant_id, menu_item_id) = pizzeria(&platform);

        let again = platform
            .recipes()
            .save_recipe(tenant_id, menu_item_id, "Margherita", pizza_components(), None, dec!(2.20))
            .unwrap();
        assert!(!again.changed);
        assert_eq!(again.version, 1);

        let renamed = platform
            .recipes()
            .save_recipe(tenant_id, menu_item_id, "Pizza Margherita", pizza_components(), None, dec!(2.20))
            .unwrap();
        assert!(renamed.changed);
        assert_eq!(renamed.version, 2);
        assert_eq!(renamed.recipe_id, again.recipe_id);
        assert_eq!(
            platform.recipes().get_recipe_by_menu_item(tenant_id, &menu_item_id).unwrap().name,
            "Pizza Margherita"
        );
    }

    #[test]
    fn recipe_rejects_unknown_menu_item_and_unknown_options() {
        let platform = Platform::in_memory();
        let (tenant_id, menu_item_id) = pizzeria(&platform);

        let missing = platform
            .recipes()
            .save_recipe(tenant_id, MenuItemId::new(bistro_core::AggregateId::new()), "x", vec![], None, Decimal::ZERO)
            .unwrap_err();
        assert!(matches!(missing, ServiceError::NotFound(_)));

        let bad_binding = vec![
            RecipeComponent::base(sku("CHEESE"), dec!(1)).for_option(OptionBinding::new("size", "family")),
        ];
        let err = platform
            .recipes()
            .save_recipe(tenant_id, menu_item_id, "Margherita", bad_binding, None, Decimal::ZERO)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(_)));
    }

    #[test]
    fn sale_consumes_ingredients_for_selected_options() {
        let platform = Platform::in_memory();
        let (tenant_id, menu_item_id) = pizzeria(&platform);

        // Basil is on the recipe but not stocked.
        let mut components = pizza_components();
        components.push(RecipeComponent::base(sku("BASIL"), dec!(1)));
        platform
            .recipes()
            .save_recipe_costed(tenant_id, menu_item_id, "Margherita", components, None)
            .unwrap();

        let sale = platform
            .sales()
            .record_sale(
                tenant_id,
                menu_item_id,
                &[Selection::single("size", "large")],
                dec!(2),
                Some("order-42".into()),
            )
            .unwrap();

        assert_eq!(sale.revenue, dec!(24.00));
        assert_eq!(sale.cost, dec!(6.60));
        assert_eq!(sale.skipped, vec![sku("BASIL")]);
        assert_eq!(sale.movements.len(), 2);
        assert!(sale.movements.iter().all(|m| m.movement_type == MovementType::Sale));
        assert!(sale.movements.iter().all(|m| m.reference.as_deref() == Some("order-42")));

        let cheese = platform.inventory().get_item(tenant_id, &sku("CHEESE")).unwrap();
        let tomato = platform.inventory().get_item(tenant_id, &sku("TOMATO")).unwrap();
        assert_eq!(cheese.current_stock_base, dec!(97.8));
        assert_eq!(tomato.current_stock_base, dec!(48.9));

        let sheet = platform.recipes().cost_sheet(tenant_id, &menu_item_id).unwrap();
        assert_eq!(sheet.missing_ingredients, vec![sku("BASIL")]);
    }

    #[test]
    fn sale_validates_before_touching_stock() {
        let platform = Platform::in_memory();
        let (tenant_id, menu_item_id) = pizzeria(&platform);
        let sales = platform.sales();

        assert!(sales.record_sale(tenant_id, menu_item_id, &[], Decimal::ZERO, None).is_err());
        assert!(
            sales
                .record_sale(tenant_id, menu_item_id, &[Selection::single("size", "huge")], dec!(1), None)
                .is_err()
        );

        platform
            .menu()
            .update_menu_item(tenant_id, menu_item_id, pizza().unavailable())
            .unwrap();
        assert!(sales.record_sale(tenant_id, menu_item_id, &[], dec!(1), None).is_err());

        let cheese = platform.inventory().get_item(tenant_id, &sku("CHEESE")).unwrap();
        assert_eq!(cheese.current_stock_base, dec!(100));
        assert_eq!(cheese.movement_count, 1);
    }

    #[test]
    fn sale_with_a_non_consuming_ingredient_books_nothing() {
        let platform = Platform::in_memory();
        let (tenant_id, menu_item_id) = pizzeria(&platform);

        // A waste factor below -100% turns the tomato line into a stock increase.
        let components = vec![
            RecipeComponent::base(sku("CHEESE"), dec!(1)),
            RecipeComponent::base(sku("TOMATO"), dec!(1)).with_waste(dec!(-200)),
        ];
        platform
            .recipes()
            .save_recipe_costed(tenant_id, menu_item_id, "Margherita", components, None)
            .unwrap();

        let err = platform
            .sales()
            .record_sale(tenant_id, menu_item_id, &[], dec!(1), None)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(_)));
        assert!(err.to_string().contains("TOMATO"));

        for code in ["CHEESE", "TOMATO"] {
            let view = platform.inventory().get_item(tenant_id, &sku(code)).unwrap();
            assert_eq!(view.movement_count, 1);
            assert_eq!(platform.inventory().movements(tenant_id, &view.item_id).len(), 1);
        }
    }

    #[test]
    fn overflowing_movement_is_rejected_without_panicking() {
        let platform = Platform::in_memory();
        let tenant_id = TenantId::new();
        let item_id = platform
            .inventory()
            .create_item(
                tenant_id,
                ItemDetails::new(sku("SALT"), "salt", Unit::Gram, Decimal::ZERO),
                Decimal::MAX,
            )
            .unwrap()
            .item_id;

        let err = platform
            .inventory()
            .record_movement(tenant_id, item_id, MovementType::Purchase, dec!(1), MovementDetails::default())
            .unwrap_err();

        assert!(err.is_client_error());
        assert_eq!(platform.inventory().movements(tenant_id, &item_id).len(), 1);
        assert_eq!(
            platform.inventory().get_item_by_id(tenant_id, &item_id).unwrap().current_stock_base,
            Decimal::MAX
        );
    }

    #[test]
    fn rebuild_reproduces_read_models() {
        let platform = Platform::in_memory();
        let (tenant_id, menu_item_id) = pizzeria(&platform);
        platform
            .sales()
            .record_sale(tenant_id, menu_item_id, &[], dec!(3), None)
            .unwrap();

        let items = platform.inventory().list_items(tenant_id);
        let menu = platform.menu().list_menu_items(tenant_id);
        let recipes = platform.recipes().list_recipes(tenant_id);

        let replayed = platform.rebuild_projections(tenant_id).unwrap();
        assert_eq!(replayed, platform.event_store().load_tenant(tenant_id).unwrap().len());

        assert_eq!(platform.inventory().list_items(tenant_id), items);
        assert_eq!(platform.menu().list_menu_items(tenant_id), menu);
        assert_eq!(platform.recipes().list_recipes(tenant_id), recipes);

        let cheese = items.iter().find(|v| v.sku().as_str() == "CHEESE").unwrap();
        verify_balance_chain(&platform.inventory().movements(tenant_id, &cheese.item_id)).unwrap();
    }

    #[test]
    fn deleted_sku_can_be_reused_and_survives_rebuild() {
        let platform = Platform::in_memory();
        let tenant_id = TenantId::new();
        let old_id = ingredient(tenant_id, &platform, "BASIL", dec!(10));
        platform.inventory().delete_item(tenant_id, old_id).unwrap();

        let new_id = ingredient(tenant_id, &platform, "BASIL", dec!(3));
        platform.rebuild_projections(tenant_id).unwrap();

        let view = platform.inventory().get_item(tenant_id, &sku("BASIL")).unwrap();
        assert_eq!(view.item_id, new_id);
        assert_eq!(view.current_stock_base, dec!(3));
        assert!(platform.inventory().get_item_by_id(tenant_id, &old_id).is_none());
    }

    #[test]
    fn background_worker_keeps_a_replica_current() {
        let platform = Platform::in_memory();
        let replica = ReadModels::new();
        let handle = platform.spawn_projection_worker(replica.clone(), None).unwrap();

        let tenant_id = TenantId::new();
        let item_id = ingredient(tenant_id, &platform, "FLOUR", dec!(10));
        platform
            .inventory()
            .record_movement(tenant_id, item_id, MovementType::Purchase, dec!(5), MovementDetails::default())
            .unwrap();

        let caught_up = wait_until(|| {
            replica
                .inventory
                .get(tenant_id, &item_id)
                .is_some_and(|v| v.current_stock_base == dec!(15))
        });
        handle.shutdown();

        assert!(caught_up);
        assert_eq!(replica.movements.movements(tenant_id, &item_id).len(), 2);
    }

    #[test]
    fn menu_theme_is_per_tenant() {
        let platform = Platform::in_memory();
        let (a, b) = (TenantId::new(), TenantId::new());

        platform
            .menu()
            .update_theme(a, |t| Ok(t.with_layout(MenuLayout::List).with_show_prices(false)))
            .unwrap();

        assert_eq!(platform.menu().theme(a).layout(), MenuLayout::List);
        assert!(!platform.menu().theme(a).show_prices());
        assert_eq!(platform.menu().theme(b).layout(), MenuLayout::Grid);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 32,
            ..ProptestConfig::default()
        })]

        /// Any run of adjustments lands on opening + sum, and a rebuild from the
        /// store agrees with the live read model.
        #[test]
        fn adjustments_fold_to_the_same_balance_live_and_rebuilt(
            deltas in prop::collection::vec((-500i64..500i64).prop_filter("non-zero", |d| *d != 0), 1..20)
        ) {
            let platform = Platform::in_memory();
            let tenant_id = TenantId::new();
            let item_id = ingredient(tenant_id, &platform, "SALT", dec!(100));

            for delta in &deltas {
                platform
                    .inventory()
                    .record_movement(tenant_id, item_id, MovementType::Adjustment, Decimal::from(*delta), MovementDetails::default())
                    .unwrap();
            }

            let expected = dec!(100) + deltas.iter().copied().map(Decimal::from).sum::<Decimal>();
            let live = platform.inventory().get_item_by_id(tenant_id, &item_id).unwrap();
            prop_assert_eq!(live.current_stock_base, expected);

            platform.rebuild_projections(tenant_id).unwrap();
            prop_assert_eq!(platform.inventory().get_item_by_id(tenant_id, &item_id).unwrap(), live);
            prop_assert_eq!(platform.inventory().movements(tenant_id, &item_id).len(), deltas.len() + 1);
        }
    }
}
