use thiserror::Error;

use bistro_core::DomainError;
use bistro_inventory::Sku;

use crate::command_dispatcher::DispatchError;
use crate::event_store::EventStoreError;
use crate::projections::ProjectionError;

/// Failure of a service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] EventStoreError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("sku {0} is already used by another item")]
    DuplicateSku(Sku),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::NotFound(what.into())
    }

    /// True for input the caller can fix (bad values, unknown ids, duplicates).
    pub fn is_client_error(&self) -> bool {
        match self {
            ServiceError::NotFound(_) | ServiceError::DuplicateSku(_) => true,
            ServiceError::Domain(e) => e.is_client_error(),
            ServiceError::Dispatch(e) => matches!(
                e,
                DispatchError::Validation(_) | DispatchError::NotFound | DispatchError::Conflict(_)
            ),
            _ => false,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
