// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// - actor: who is acting, and when
// - identifier: order number / internal id resolution
// - order: lifecycle state machine and OrderLifecycle service
// - payroll: monthly pay computation and PayrollEngine service
//
// Persistence is reached only through the traits in `crate::store`.
//
// ============================================================================

pub mod actor;
pub mod identifier;
pub mod order;
pub mod payroll;
