use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::identifier::OrderKey;
use crate::domain::order::{Order, OrderDraft, OrderEvent, OrderPatch, OrderStatus};
use crate::domain::payroll::{Month, PayrollRecord, PayrollScope, Technician};

mod memory;

pub use memory::{InMemoryOrderStore, InMemoryPayrollStore, InMemoryTechnicianDirectory};

// ============================================================================
// Repository Contracts
// ============================================================================
//
// The core never talks to a database directly. These traits are the whole
// surface it needs; an adapter for the real transactional store implements
// them. Stores only ever see an already-resolved `OrderKey`.
//
// ============================================================================

/// Failure reported by an underlying repository; the message is passed through as-is
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct StoreError {
    message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a write guarded by "status must currently be X"
#[derive(Debug, Clone)]
pub enum ConditionalWrite {
    Applied(Order),
    StatusChanged(OrderStatus),
    Missing,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// All orders, newest first
    async fn list(&self) -> StoreResult<Vec<Order>>;

    async fn get(&self, key: &OrderKey) -> StoreResult<Option<Order>>;

    /// Insert a draft under `id`, assigning the next order number atomically
    async fn create(&self, id: Uuid, draft: OrderDraft, at: DateTime<Utc>) -> StoreResult<Order>;

    /// Apply descriptive changes only if the order is still in `expected`
    async fn update(
        &self,
        key: &OrderKey,
        expected: OrderStatus,
        patch: OrderPatch,
        at: DateTime<Utc>,
    ) -> StoreResult<ConditionalWrite>;

    /// Returns false when nothing matched `key`
    async fn delete(&self, key: &OrderKey) -> StoreResult<bool>;

    /// Apply a lifecycle event only if the order is still in `expected`
    async fn apply_transition(
        &self,
        key: &OrderKey,
        expected: OrderStatus,
        event: &OrderEvent,
        at: DateTime<Utc>,
    ) -> StoreResult<ConditionalWrite>;

    /// Completed orders with `work_completed_at` in `[start, end)`
    async fn completed_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> StoreResult<Vec<Order>> {
        let orders = self.list().await?;
        Ok(orders
            .into_iter()
            .filter(|order| order.status == OrderStatus::Completed)
            .filter(|order| {
                order
                    .work_completed_at
                    .map(|at| at >= start && at < end)
                    .unwrap_or(false)
            })
            .collect())
    }
}

#[async_trait]
pub trait PayrollStore: Send + Sync {
    async fn list(&self, scope: &PayrollScope) -> StoreResult<Vec<PayrollRecord>>;

    /// Absent id creates, present id updates; the store stamps `updated_at`
    async fn upsert(&self, record: PayrollRecord) -> StoreResult<PayrollRecord>;

    /// Returns false when no record had this id
    async fn remove(&self, id: Uuid) -> StoreResult<bool>;

    async fn find(&self, email: &str, month: Month) -> StoreResult<Option<PayrollRecord>> {
        let scope = PayrollScope::User(email.trim().to_lowercase());
        let records = self.list(&scope).await?;
        Ok(records.into_iter().find(|record| record.belongs_to(email, month)))
    }
}

/// Compensation-scheme lookup for technicians
#[async_trait]
pub trait TechnicianDirectory: Send + Sync {
    async fn technicians(&self) -> StoreResult<Vec<Technician>>;
}
