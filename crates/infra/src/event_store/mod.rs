//! Append-only event store boundary.
//!
//! Tenant-scoped event streams, one per aggregate instance, with optimistic
//! concurrency on append. Only an in-memory backend ships; the trait keeps the
//! dispatcher and services independent of it.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
