// ============================================================================
// Payroll Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PayrollError {
    #[error("Invalid month {0:?}, expected YYYY-MM")]
    InvalidMonth(String),

    #[error("User email cannot be empty")]
    EmptyEmail,

    #[error("Payroll amount too large: {0}")]
    AmountOverflow(&'static str),

    #[error("Payroll record not found: {0}")]
    RecordNotFound(uuid::Uuid),
}
