//! Infrastructure layer: event store, command dispatch, read models and the
//! services built on them.

pub mod command_dispatcher;
pub mod config;
pub mod event_store;
pub mod platform;
pub mod projections;
pub mod read_model;
pub mod services;
pub mod theme_store;
pub mod workers;

pub use platform::Platform;

#[cfg(test)]
mod integration_tests;
