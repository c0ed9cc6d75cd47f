use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::value_objects::{Customer, Payment, Schedule, ServiceItem, TechnicianRef};

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================

/// Lifecycle step requested against an existing order
#[derive(Debug, Clone)]
pub enum OrderCommand {
    Confirm,
    StartWork { at: DateTime<Utc> },
    FinishWork { at: DateTime<Utc> },
    Cancel { reason: String },
}

impl OrderCommand {
    pub fn kind(&self) -> TransitionKind {
        match self {
            OrderCommand::Confirm => TransitionKind::Confirm,
            OrderCommand::StartWork { .. } => TransitionKind::StartWork,
            OrderCommand::FinishWork { .. } => TransitionKind::FinishWork,
            OrderCommand::Cancel { .. } => TransitionKind::Cancel,
        }
    }
}

/// Name of an attempted mutation, reported in transition errors and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Confirm,
    StartWork,
    FinishWork,
    Cancel,
    Update,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionKind::Confirm => "confirm",
            TransitionKind::StartWork => "start_work",
            TransitionKind::FinishWork => "finish_work",
            TransitionKind::Cancel => "cancel",
            TransitionKind::Update => "update",
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for a new order; both identifiers are assigned at creation
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct OrderDraft {
    pub customer: Customer,
    pub schedule: Schedule,
    pub platform: Option<String>,
    pub referrer_code: Option<String>,
    pub member_id: Option<String>,
    pub assigned_technicians: Vec<TechnicianRef>,
    pub service_items: Vec<ServiceItem>,
    pub payment: Payment,
}

/// Descriptive-field changes; status, identifiers and lifecycle stamps are not patchable
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct OrderPatch {
    pub customer: Option<Customer>,
    pub schedule: Option<Schedule>,
    pub platform: Option<String>,
    pub referrer_code: Option<String>,
    pub member_id: Option<String>,
    pub assigned_technicians: Option<Vec<TechnicianRef>>,
    pub service_items: Option<Vec<ServiceItem>>,
    pub payment: Option<Payment>,
    pub service_finished_at: Option<DateTime<Utc>>,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        !self.has_descriptive_changes() && self.service_finished_at.is_none()
    }

    /// Only records when on-site service finished; still accepted on completed orders
    pub fn is_service_finish_only(&self) -> bool {
        self.service_finished_at.is_some() && !self.has_descriptive_changes()
    }

    fn has_descriptive_changes(&self) -> bool {
        self.customer.is_some()
            || self.schedule.is_some()
            || self.platform.is_some()
            || self.referrer_code.is_some()
            || self.member_id.is_some()
            || self.assigned_technicians.is_some()
            || self.service_items.is_some()
            || self.payment.is_some()
    }
}
