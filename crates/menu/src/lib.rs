//! Menu domain module (event-sourced).
//!
//! Menu items with their selling price and typed option groups, selection
//! validation and pricing, and the per-venue display theme value.

pub mod menu_item;
pub mod specification;
pub mod theme;

pub use menu_item::{
    AGGREGATE_TYPE, CreateMenuItem, MenuCommand, MenuEvent, MenuItem, MenuItemCreated,
    MenuItemDetails, MenuItemId, MenuItemUpdated, UpdateMenuItem,
};
pub use specification::{
    OptionId, Selection, SpecOption, Specification, SpecificationId, price_with_selections,
    validate_selections, validate_specifications,
};
pub use theme::{HexColor, MenuLayout, MenuTheme, Palette};
