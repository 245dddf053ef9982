use thiserror::Error;

use crate::{db_types::ValidationError, traits::OrderStoreError};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Order #{0} does not exist")]
    NotFound(i64),
    #[error("The order store could not complete the request. {0}")]
    PersistenceFailure(String),
    #[error("Invalid order. {0}")]
    ValidationFailure(String),
}

impl From<OrderStoreError> for OrderFlowError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::OrderIdNotFound(id) => Self::NotFound(id),
            e => Self::PersistenceFailure(e.to_string()),
        }
    }
}

impl From<ValidationError> for OrderFlowError {
    fn from(e: ValidationError) -> Self {
        Self::ValidationFailure(e.0)
    }
}

/// Failures while reconciling a gateway payment with the order store.
#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("The payment signature is invalid")]
    SignatureMismatch,
    #[error("Order #{0} does not exist")]
    NotFound(i64),
    #[error("The payment was verified, but the order store could not record it. {0}")]
    PersistenceFailure(String),
    #[error("The payment was verified, but the order details are invalid. {0}")]
    ValidationFailure(String),
}

impl From<OrderFlowError> for ReconciliationError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::NotFound(id) => Self::NotFound(id),
            OrderFlowError::PersistenceFailure(s) => Self::PersistenceFailure(s),
            OrderFlowError::ValidationFailure(s) => Self::ValidationFailure(s),
        }
    }
}

impl From<ValidationError> for ReconciliationError {
    fn from(e: ValidationError) -> Self {
        Self::ValidationFailure(e.0)
    }
}
