use super::commands::TransitionKind;
use super::value_objects::OrderStatus;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Cannot {transition} order {order} in status {from}")]
    InvalidTransition {
        order: String,
        from: OrderStatus,
        transition: TransitionKind,
    },

    #[error("Cancel reason cannot be empty")]
    EmptyCancelReason,

    #[error("Customer name cannot be empty")]
    EmptyCustomerName,

    #[error("Invalid quantity {quantity} for service item {item:?}")]
    InvalidQuantity { item: String, quantity: i32 },

    #[error("Negative unit price for service item {0:?}")]
    NegativePrice(String),

    #[error("Order amount overflows at service item {0:?}")]
    AmountOverflow(String),

    #[error("Points deduction cannot be negative")]
    NegativeDeduction,

    #[error("Order patch contains no changes")]
    EmptyPatch,
}
