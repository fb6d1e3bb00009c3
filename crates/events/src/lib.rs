//! Domain events and their transport.
//!
//! Every state change in the platform (an item created, a movement recorded, a
//! recipe saved) is an immutable event. This crate holds the event contract, the
//! tenant-scoped envelope events travel in, and the pub/sub bus that fans them out
//! to read-model projections.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_bus;
pub mod tenant;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use handler::execute;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use tenant::TenantScoped;
