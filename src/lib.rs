// ============================================================================
// fieldops - order lifecycle & monthly payroll core
// ============================================================================
//
// Two services sit on top of async repository traits:
// - OrderLifecycle: identifier resolution + table-checked state machine
// - PayrollEngine: technician revenue share, support payslips, overrides
//
// Storage, auth and presentation are supplied by the embedding application.
//
// ============================================================================

pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod store;

pub use config::CoreConfig;
pub use domain::actor::{ActingUser, OperationContext, Role};
pub use domain::order::OrderLifecycle;
pub use domain::payroll::PayrollEngine;
pub use error::{CoreError, CoreResult};
