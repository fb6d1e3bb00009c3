//! `bistro-core`: domain building blocks shared by every restaurant module.
//!
//! Pure domain primitives only: identifiers, the domain error model and the
//! aggregate contract. No storage, no IO.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, TenantId};
pub use value_object::ValueObject;
