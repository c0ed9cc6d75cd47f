// ============================================================================
// Order Domain - field-service order lifecycle
// ============================================================================
//
// - Value objects (OrderStatus, ServiceItem, TechnicianRef, ...)
// - Commands (lifecycle steps, drafts, patches)
// - Events (what a validated step writes)
// - Errors (OrderError enum)
// - Aggregate (Order + transition table)
// - Command Handler (OrderLifecycle service)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod command_handler;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use command_handler::*;
