use crate::domain::order::{OrderError, OrderStatus, TransitionKind};
use crate::domain::payroll::PayrollError;
use crate::store::StoreError;

// ============================================================================
// Core Error Taxonomy
// ============================================================================
//
// Everything the lifecycle and payroll services return to callers.
// Validation variants are raised before any store call is made; `Store`
// carries the repository's message through untouched.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid order identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Cannot {transition} order {order} in status {from}")]
    InvalidTransition {
        order: String,
        from: OrderStatus,
        transition: TransitionKind,
    },

    #[error("Invalid month {0:?}, expected YYYY-MM")]
    InvalidMonth(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::InvalidIdentifier(_) => "invalid_identifier",
            CoreError::NotFound(_) => "not_found",
            CoreError::InvalidTransition { .. } => "invalid_transition",
            CoreError::InvalidMonth(_) => "invalid_month",
            CoreError::Validation(_) => "validation",
            CoreError::Store(_) => "store",
        }
    }
}

impl From<OrderError> for CoreError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidTransition { order, from, transition } => {
                CoreError::InvalidTransition { order, from, transition }
            }
            other => CoreError::Validation(other.to_string()),
        }
    }
}

impl From<PayrollError> for CoreError {
    fn from(err: PayrollError) -> Self {
        match err {
            PayrollError::InvalidMonth(value) => CoreError::InvalidMonth(value),
            PayrollError::RecordNotFound(id) => CoreError::NotFound(id.to_string()),
            other => CoreError::Validation(other.to_string()),
        }
    }
}
