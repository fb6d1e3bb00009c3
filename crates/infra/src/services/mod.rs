//! Application services: the inventory, menu and recipe stores.
//!
//! Each write goes through the shared [`CommandDispatcher`](crate::command_dispatcher::CommandDispatcher)
//! and the committed events are applied to the read models before returning,
//! so a caller always reads its own writes. The same events are published on
//! the bus for background workers.

pub mod context;
pub mod error;
pub mod inventory;
pub mod menu;
pub mod recipes;
pub mod sales;

pub use context::{EnvelopeBus, InMemoryDispatcher, ReadModels, ServiceContext};
pub use error::{ServiceError, ServiceResult};
pub use inventory::InventoryService;
pub use menu::MenuService;
pub use recipes::{RecipeService, SaveOutcome};
pub use sales::{SaleRecord, SalesService};
