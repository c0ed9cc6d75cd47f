// ============================================================================
// Payroll Domain - monthly technician and support-staff pay
// ============================================================================
//
// - Value objects (Month, CompensationProfile, PayrollRecord, ...)
// - Technician computation (equal split of completed-order revenue)
// - Support payslips (line-item additions and deductions)
// - Payout schedule (salary and bonus dates)
// - Engine (PayrollEngine service: compute, override, persist)
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod support;
pub mod payout;
pub mod technician;
pub mod engine;

pub use value_objects::*;
pub use errors::*;
pub use support::*;
pub use payout::*;
pub use technician::*;
pub use engine::*;
