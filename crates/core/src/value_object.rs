//! Value object marker: equality by value, not identity.
//!
//! Skus, unit conversions, specification bindings and display themes are all
//! value objects in this codebase. Two skus with the same normalized text are the
//! same sku; a theme with the same palette and layout is the same theme.
//!
//! Value objects are never mutated in place. "Changing" one produces a new value
//! (see `MenuTheme::with_*`), which is what lets a store hand out shared snapshots
//! without locks on the read path.

/// Marker trait for immutable, value-compared domain types.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
