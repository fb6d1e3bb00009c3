//! Inventory domain module (event-sourced).
//!
//! Ingredients tracked in a normalized base unit, the append-only movement
//! ledger that changes their stock, and the stock status used for badges.
//! Deterministic domain logic only (no IO, no storage).

pub mod item;
pub mod movement;
pub mod sku;
pub mod status;
pub mod units;

pub use item::{
    AGGREGATE_TYPE, CreateItem, DeleteItem, InventoryCommand, InventoryEvent, InventoryItem,
    InventoryItemId, ItemCreated, ItemDeleted, ItemDetails, ItemUpdated, MovementRecorded,
    RecordMovement, UpdateItem,
};
pub use movement::{
    MovementDetails, MovementId, MovementType, StockMovement, check_sign, total_cost,
    verify_balance_chain,
};
pub use sku::Sku;
pub use status::{StockStatus, classify};
pub use units::{Dimension, Unit, UnitConversion};
