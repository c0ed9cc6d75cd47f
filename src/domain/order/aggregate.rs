use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::commands::{OrderCommand, OrderDraft, OrderPatch, TransitionKind};
use super::errors::OrderError;
use super::events::OrderEvent;
use super::value_objects::{Customer, OrderStatus, Payment, Schedule, ServiceItem, TechnicianRef};
use crate::domain::identifier::OrderNumber;

// ============================================================================
// Transition Table
// ============================================================================
//
// Single source of truth for which lifecycle step is legal from which
// status. `handle_command` consults it before emitting anything.
//
// ============================================================================

pub struct TransitionRule {
    pub kind: TransitionKind,
    pub from: &'static [OrderStatus],
    pub to: OrderStatus,
}

pub const TRANSITION_TABLE: [TransitionRule; 4] = [
    TransitionRule {
        kind: TransitionKind::Confirm,
        from: &[OrderStatus::Draft, OrderStatus::Confirmed],
        to: OrderStatus::Confirmed,
    },
    TransitionRule {
        kind: TransitionKind::StartWork,
        from: &[OrderStatus::Confirmed],
        to: OrderStatus::InProgress,
    },
    TransitionRule {
        kind: TransitionKind::FinishWork,
        from: &[OrderStatus::InProgress],
        to: OrderStatus::Completed,
    },
    TransitionRule {
        kind: TransitionKind::Cancel,
        from: &[OrderStatus::Draft, OrderStatus::Confirmed, OrderStatus::InProgress],
        to: OrderStatus::Canceled,
    },
];

pub fn transition_rule(kind: TransitionKind) -> Option<&'static TransitionRule> {
    TRANSITION_TABLE.iter().find(|rule| rule.kind == kind)
}

// ============================================================================
// Order - Domain Logic
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    // Identity
    pub id: Uuid,
    pub order_number: OrderNumber,

    // Customer & scheduling
    pub customer: Customer,
    pub schedule: Schedule,
    pub platform: Option<String>,
    pub referrer_code: Option<String>,
    pub member_id: Option<String>,

    // Work
    pub assigned_technicians: Vec<TechnicianRef>,
    pub service_items: Vec<ServiceItem>,
    pub payment: Payment,

    // Lifecycle
    pub status: OrderStatus,
    pub work_started_at: Option<DateTime<Utc>>,
    pub work_completed_at: Option<DateTime<Utc>>,
    pub service_finished_at: Option<DateTime<Utc>>,
    pub canceled_reason: Option<String>,

    // Audit Trail
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Materialize a validated draft; only stores call this, once, at insert
    pub fn from_draft(id: Uuid, order_number: OrderNumber, draft: OrderDraft, at: DateTime<Utc>) -> Self {
        Self {
            id,
            order_number,
            customer: draft.customer,
            schedule: draft.schedule,
            platform: draft.platform,
            referrer_code: draft.referrer_code,
            member_id: draft.member_id,
            assigned_technicians: dedup_technicians(draft.assigned_technicians),
            service_items: draft.service_items,
            payment: draft.payment,
            status: OrderStatus::Draft,
            work_started_at: None,
            work_completed_at: None,
            service_finished_at: None,
            canceled_reason: None,
            created_at: at,
            updated_at: at,
        }
    }

    /// Validate business rules for a new order
    pub fn validate_draft(draft: &OrderDraft) -> Result<(), OrderError> {
        if draft.customer.name.trim().is_empty() {
            return Err(OrderError::EmptyCustomerName);
        }
        validate_items(&draft.service_items)?;
        validate_payment(&draft.payment)
    }

    /// Amount split across technicians for payroll; saturates rather than overflowing
    pub fn billable_amount(&self) -> Decimal {
        let gross = self.service_items.iter().fold(Decimal::ZERO, |sum, item| {
            sum.saturating_add(item.line_total().unwrap_or(Decimal::MAX))
        });
        gross
            .saturating_sub(self.payment.points_deduct_amount)
            .max(Decimal::ZERO)
    }

    /// Check the transition table and emit the resulting event
    pub fn handle_command(&self, command: &OrderCommand) -> Result<OrderEvent, OrderError> {
        if let OrderCommand::Cancel { reason } = command {
            if reason.trim().is_empty() {
                return Err(OrderError::EmptyCancelReason);
            }
        }

        let kind = command.kind();
        let allowed = transition_rule(kind)
            .map(|rule| rule.from.contains(&self.status))
            .unwrap_or(false);

        if !allowed {
            return Err(OrderError::InvalidTransition {
                order: self.order_number.to_string(),
                from: self.status,
                transition: kind,
            });
        }

        Ok(match command {
            OrderCommand::Confirm => OrderEvent::Confirmed,
            OrderCommand::StartWork { at } => OrderEvent::WorkStarted { at: *at },
            OrderCommand::FinishWork { at } => OrderEvent::WorkFinished { at: *at },
            OrderCommand::Cancel { reason } => OrderEvent::Canceled {
                reason: reason.trim().to_string(),
            },
        })
    }

    /// Apply an already-validated event
    pub fn apply_event(&mut self, event: &OrderEvent, at: DateTime<Utc>) {
        self.updated_at = at;
        self.status = event.resulting_status();

        match event {
            OrderEvent::Confirmed => {}
            OrderEvent::WorkStarted { at } => {
                self.work_started_at = Some(*at);
            }
            OrderEvent::WorkFinished { at } => {
                self.work_completed_at = Some(*at);
            }
            OrderEvent::Canceled { reason } => {
                self.canceled_reason = Some(reason.clone());
            }
        }
    }

    /// Descriptive edits are only accepted while the order is still open.
    /// A completed order still takes a patch that only sets `service_finished_at`.
    pub fn validate_patch(&self, patch: &OrderPatch) -> Result<(), OrderError> {
        let finish_note = self.status == OrderStatus::Completed && patch.is_service_finish_only();
        if self.status.is_terminal() && !finish_note {
            return Err(OrderError::InvalidTransition {
                order: self.order_number.to_string(),
                from: self.status,
                transition: TransitionKind::Update,
            });
        }
        if patch.is_empty() {
            return Err(OrderError::EmptyPatch);
        }
        if let Some(customer) = &patch.customer {
            if customer.name.trim().is_empty() {
                return Err(OrderError::EmptyCustomerName);
            }
        }
        if let Some(items) = &patch.service_items {
            validate_items(items)?;
        }
        if let Some(payment) = &patch.payment {
            validate_payment(payment)?;
        }
        Ok(())
    }

    pub fn apply_patch(&mut self, patch: OrderPatch, at: DateTime<Utc>) {
        if let Some(customer) = patch.customer {
            self.customer = customer;
        }
        if let Some(schedule) = patch.schedule {
            self.schedule = schedule;
        }
        if let Some(platform) = patch.platform {
            self.platform = Some(platform);
        }
        if let Some(referrer_code) = patch.referrer_code {
            self.referrer_code = Some(referrer_code);
        }
        if let Some(member_id) = patch.member_id {
            self.member_id = Some(member_id);
        }
        if let Some(technicians) = patch.assigned_technicians {
            self.assigned_technicians = dedup_technicians(technicians);
        }
        if let Some(items) = patch.service_items {
            self.service_items = items;
        }
        if let Some(payment) = patch.payment {
            self.payment = payment;
        }
        if let Some(finished) = patch.service_finished_at {
            self.service_finished_at = Some(finished);
        }
        self.updated_at = at;
    }
}

fn validate_items(items: &[ServiceItem]) -> Result<(), OrderError> {
    let mut gross = Decimal::ZERO;
    for item in items {
        if item.quantity <= 0 {
            return Err(OrderError::InvalidQuantity {
                item: item.name.clone(),
                quantity: item.quantity,
            });
        }
        if item.unit_price < Decimal::ZERO {
            return Err(OrderError::NegativePrice(item.name.clone()));
        }
        gross = item
            .line_total()
            .and_then(|total| gross.checked_add(total))
            .ok_or_else(|| OrderError::AmountOverflow(item.name.clone()))?;
    }
    Ok(())
}

fn validate_payment(payment: &Payment) -> Result<(), OrderError> {
    if payment.points_deduct_amount < Decimal::ZERO {
        return Err(OrderError::NegativeDeduction);
    }
    Ok(())
}

/// Technician assignment is a set keyed by normalized email
fn dedup_technicians(technicians: Vec<TechnicianRef>) -> Vec<TechnicianRef> {
    let mut seen = std::collections::HashSet::new();
    technicians
        .into_iter()
        .filter(|tech| seen.insert(tech.key()))
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, hour, 0, 0).unwrap()
    }

    fn create_test_draft() -> OrderDraft {
        OrderDraft {
            customer: Customer {
                name: "Chen Mei-Ling".to_string(),
                phone: "0912-345-678".to_string(),
                address: "No. 5, Lane 12, Taipei".to_string(),
            },
            assigned_technicians: vec![TechnicianRef::new("t1@example.com", "T1")],
            service_items: vec![ServiceItem {
                name: "Washer repair".to_string(),
                quantity: 1,
                unit_price: Decimal::new(3000, 0),
            }],
            ..Default::default()
        }
    }

    fn create_test_order() -> Order {
        Order::from_draft(Uuid::new_v4(), OrderNumber::from_sequence(1, 6), create_test_draft(), ts(8))
    }

    fn run(order: &mut Order, command: OrderCommand, at: DateTime<Utc>) -> Result<(), OrderError> {
        let event = order.handle_command(&command)?;
        order.apply_event(&event, at);
        Ok(())
    }

    fn assert_cancel_invariant(order: &Order) {
        assert_eq!(
            order.canceled_reason.as_deref().map(|r| !r.is_empty()).unwrap_or(false),
            order.status == OrderStatus::Canceled
        );
    }

    #[test]
    fn test_new_order_starts_in_draft() {
        let order = create_test_order();
        assert_eq!(order.status, OrderStatus::Draft);
        assert_eq!(order.created_at, order.updated_at);
        assert!(order.work_started_at.is_none());
        assert_cancel_invariant(&order);
    }

    #[test]
    fn test_forward_path() {
        let mut order = create_test_order();

        run(&mut order, OrderCommand::Confirm, ts(9)).unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);

        run(&mut order, OrderCommand::StartWork { at: ts(10) }, ts(10)).unwrap();
        assert_eq!(order.status, OrderStatus::InProgress);
        assert_eq!(order.work_started_at, Some(ts(10)));

        run(&mut order, OrderCommand::FinishWork { at: ts(12) }, ts(12)).unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.work_completed_at, Some(ts(12)));
        assert_eq!(order.updated_at, ts(12));
        assert_cancel_invariant(&order);
    }

    #[test]
    fn test_confirm_is_idempotent() {
        let mut order = create_test_order();
        run(&mut order, OrderCommand::Confirm, ts(9)).unwrap();
        run(&mut order, OrderCommand::Confirm, ts(11)).unwrap();

        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.updated_at, ts(11));
        assert!(order.work_started_at.is_none());
        assert!(order.work_completed_at.is_none());
    }

    #[test]
    fn test_finish_work_twice_fails() {
        let mut order = create_test_order();
        run(&mut order, OrderCommand::Confirm, ts(9)).unwrap();
        run(&mut order, OrderCommand::StartWork { at: ts(10) }, ts(10)).unwrap();
        run(&mut order, OrderCommand::FinishWork { at: ts(12) }, ts(12)).unwrap();

        let result = order.handle_command(&OrderCommand::FinishWork { at: ts(15) });
        assert!(matches!(
            result,
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Completed,
                transition: TransitionKind::FinishWork,
                ..
            })
        ));
        assert_eq!(order.work_completed_at, Some(ts(12)));
    }

    #[test]
    fn test_cannot_skip_predecessor() {
        let order = create_test_order();

        let result = order.handle_command(&OrderCommand::FinishWork { at: ts(9) });
        assert!(matches!(result, Err(OrderError::InvalidTransition { from: OrderStatus::Draft, .. })));

        let result = order.handle_command(&OrderCommand::StartWork { at: ts(9) });
        assert!(matches!(result, Err(OrderError::InvalidTransition { from: OrderStatus::Draft, .. })));
    }

    #[test]
    fn test_no_transition_escapes_terminal_states() {
        let commands = vec![
            OrderCommand::Confirm,
            OrderCommand::StartWork { at: ts(9) },
            OrderCommand::FinishWork { at: ts(9) },
            OrderCommand::Cancel { reason: "again".to_string() },
        ];

        for terminal in [OrderStatus::Completed, OrderStatus::Canceled] {
            let mut order = create_test_order();
            order.status = terminal;
            for command in &commands {
                assert!(
                    order.handle_command(command).is_err(),
                    "{:?} escaped {:?}",
                    command.kind(),
                    terminal
                );
            }
        }
    }

    #[test]
    fn test_cancel_from_each_open_state() {
        for status in [OrderStatus::Draft, OrderStatus::Confirmed, OrderStatus::InProgress] {
            let mut order = create_test_order();
            order.status = status;
            run(&mut order, OrderCommand::Cancel { reason: "  No-show ".to_string() }, ts(9)).unwrap();
            assert_eq!(order.status, OrderStatus::Canceled);
            assert_eq!(order.canceled_reason.as_deref(), Some("No-show"));
            assert_cancel_invariant(&order);
        }
    }

    #[test]
    fn test_cancel_requires_reason() {
        let order = create_test_order();
        let result = order.handle_command(&OrderCommand::Cancel { reason: "   ".to_string() });
        assert!(matches!(result, Err(OrderError::EmptyCancelReason)));
    }

    #[test]
    fn test_transition_table_targets_match_events() {
        let order = create_test_order();
        for rule in TRANSITION_TABLE.iter() {
            let mut probe = order.clone();
            probe.status = rule.from[0];
            let command = match rule.kind {
                TransitionKind::Confirm => OrderCommand::Confirm,
                TransitionKind::StartWork => OrderCommand::StartWork { at: ts(9) },
                TransitionKind::FinishWork => OrderCommand::FinishWork { at: ts(9) },
                TransitionKind::Cancel => OrderCommand::Cancel { reason: "x".to_string() },
                TransitionKind::Update => unreachable!(),
            };
            let event = probe.handle_command(&command).unwrap();
            assert_eq!(event.resulting_status(), rule.to);
        }
    }

    #[test]
    fn test_billable_amount_deducts_points() {
        let mut order = create_test_order();
        order.service_items.push(ServiceItem {
            name: "Filter".to_string(),
            quantity: 2,
            unit_price: Decimal::new(250, 0),
        });
        order.payment.points_deduct_amount = Decimal::new(500, 0);
        assert_eq!(order.billable_amount(), Decimal::new(3000, 0));

        order.payment.points_deduct_amount = Decimal::new(99999, 0);
        assert_eq!(order.billable_amount(), Decimal::ZERO);
    }

    #[test]
    fn test_validate_draft() {
        let mut draft = create_test_draft();
        assert!(Order::validate_draft(&draft).is_ok());

        draft.service_items[0].quantity = 0;
        assert!(matches!(Order::validate_draft(&draft), Err(OrderError::InvalidQuantity { .. })));

        draft.service_items[0].quantity = 1;
        draft.service_items[0].unit_price = Decimal::new(-1, 0);
        assert!(matches!(Order::validate_draft(&draft), Err(OrderError::NegativePrice(_))));

        let mut draft = create_test_draft();
        draft.customer.name = " ".to_string();
        assert!(matches!(Order::validate_draft(&draft), Err(OrderError::EmptyCustomerName)));
    }

    #[test]
    fn test_validate_draft_rejects_overflowing_amounts() {
        let mut draft = create_test_draft();
        draft.service_items[0].unit_price = Decimal::MAX;
        draft.service_items[0].quantity = 2;
        assert!(matches!(Order::validate_draft(&draft), Err(OrderError::AmountOverflow(_))));

        // each line fits, their sum does not
        let mut draft = create_test_draft();
        draft.service_items[0].unit_price = Decimal::MAX;
        draft.service_items.push(ServiceItem {
            name: "Second".to_string(),
            quantity: 1,
            unit_price: Decimal::MAX,
        });
        assert!(matches!(Order::validate_draft(&draft), Err(OrderError::AmountOverflow(_))));
    }

    #[test]
    fn test_negative_points_deduction_rejected() {
        let mut draft = create_test_draft();
        draft.payment.points_deduct_amount = Decimal::new(-100, 0);
        assert!(matches!(Order::validate_draft(&draft), Err(OrderError::NegativeDeduction)));

        let order = create_test_order();
        let patch = OrderPatch {
            payment: Some(Payment {
                points_deduct_amount: Decimal::new(-1, 0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(order.validate_patch(&patch), Err(OrderError::NegativeDeduction)));
    }

    #[test]
    fn test_billable_amount_saturates_for_unvalidated_orders() {
        let mut order = create_test_order();
        order.service_items = vec![ServiceItem {
            name: "Imported".to_string(),
            quantity: 3,
            unit_price: Decimal::MAX,
        }];
        assert_eq!(order.billable_amount(), Decimal::MAX);
    }

    #[test]
    fn test_technicians_deduplicated_by_email() {
        let mut draft = create_test_draft();
        draft.assigned_technicians = vec![
            TechnicianRef::new("t1@example.com", "T1"),
            TechnicianRef::new("T1@Example.com", "T1 again"),
            TechnicianRef::new("t2@example.com", "T2"),
        ];
        let order = Order::from_draft(Uuid::new_v4(), OrderNumber::from_sequence(2, 6), draft, ts(8));
        assert_eq!(order.assigned_technicians.len(), 2);
    }

    #[test]
    fn test_patch_rejected_on_terminal_order() {
        let mut order = create_test_order();
        order.status = OrderStatus::Completed;

        let patch = OrderPatch {
            platform: Some("web".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            order.validate_patch(&patch),
            Err(OrderError::InvalidTransition { transition: TransitionKind::Update, .. })
        ));
    }

    #[test]
    fn test_completed_order_accepts_service_finish_only() {
        let mut order = create_test_order();
        order.status = OrderStatus::Completed;

        let finish = OrderPatch {
            service_finished_at: Some(ts(16)),
            ..Default::default()
        };
        order.validate_patch(&finish).unwrap();
        order.apply_patch(finish.clone(), ts(16));
        assert_eq!(order.service_finished_at, Some(ts(16)));
        assert_eq!(order.status, OrderStatus::Completed);

        let mixed = OrderPatch {
            platform: Some("web".to_string()),
            service_finished_at: Some(ts(17)),
            ..Default::default()
        };
        assert!(order.validate_patch(&mixed).is_err());

        order.status = OrderStatus::Canceled;
        assert!(matches!(
            order.validate_patch(&finish),
            Err(OrderError::InvalidTransition { from: OrderStatus::Canceled, .. })
        ));
    }

    #[test]
    fn test_patch_applies_descriptive_fields_only() {
        let mut order = create_test_order();
        let id = order.id;
        let number = order.order_number.clone();

        let patch = OrderPatch {
            platform: Some("line".to_string()),
            service_finished_at: Some(ts(14)),
            ..Default::default()
        };
        order.validate_patch(&patch).unwrap();
        order.apply_patch(patch, ts(14));

        assert_eq!(order.platform.as_deref(), Some("line"));
        assert_eq!(order.service_finished_at, Some(ts(14)));
        assert_eq!(order.status, OrderStatus::Draft);
        assert_eq!(order.id, id);
        assert_eq!(order.order_number, number);
        assert!(order.validate_patch(&OrderPatch::default()).is_err());
    }
}
