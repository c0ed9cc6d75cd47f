use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ConditionalWrite, OrderStore, PayrollStore, StoreError, StoreResult, TechnicianDirectory};
use crate::domain::identifier::{OrderKey, OrderNumber};
use crate::domain::order::{Order, OrderDraft, OrderEvent, OrderPatch, OrderStatus};
use crate::domain::payroll::{PayrollRecord, PayrollScope, Technician};

// ============================================================================
// In-Memory Stores
// ============================================================================
//
// Reference implementations of the repository contracts. Each write runs
// under one lock acquisition, which is what makes the status check and the
// write a single atomic step. Used by the demo binary and the tests.
//
// ============================================================================

struct OrderState {
    orders: BTreeMap<Uuid, Order>,
    next_sequence: u64,
}

impl OrderState {
    fn find(&self, key: &OrderKey) -> Option<&Order> {
        match key {
            OrderKey::InternalId(id) => self.orders.get(id),
            OrderKey::OrderNumber(number) => self
                .orders
                .values()
                .find(|order| &order.order_number == number),
        }
    }

    fn find_mut(&mut self, key: &OrderKey) -> Option<&mut Order> {
        match key {
            OrderKey::InternalId(id) => self.orders.get_mut(id),
            OrderKey::OrderNumber(number) => self
                .orders
                .values_mut()
                .find(|order| &order.order_number == number),
        }
    }

    fn id_for(&self, key: &OrderKey) -> Option<Uuid> {
        self.find(key).map(|order| order.id)
    }
}

pub struct InMemoryOrderStore {
    state: RwLock<OrderState>,
    number_width: usize,
    calls: AtomicUsize,
    outage: RwLock<Option<String>>,
}

impl InMemoryOrderStore {
    pub fn new(number_width: usize) -> Self {
        Self {
            state: RwLock::new(OrderState {
                orders: BTreeMap::new(),
                next_sequence: 1,
            }),
            number_width,
            calls: AtomicUsize::new(0),
            outage: RwLock::new(None),
        }
    }

    /// Number of repository calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every following call fail with `message` (None restores service)
    pub async fn set_outage(&self, message: Option<&str>) {
        *self.outage.write().await = message.map(str::to_string);
    }

    /// Put an order in directly, bypassing the lifecycle (fixtures, imports)
    pub async fn insert(&self, order: Order) {
        let mut state = self.state.write().await;
        state.orders.insert(order.id, order);
    }

    async fn check(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.outage.read().await.as_ref() {
            Some(message) => Err(StoreError::new(message.clone())),
            None => Ok(()),
        }
    }
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::new(6)
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn list(&self) -> StoreResult<Vec<Order>> {
        self.check().await?;
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state.orders.values().cloned().collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.order_number.as_str().cmp(a.order_number.as_str()))
        });
        Ok(orders)
    }

    async fn get(&self, key: &OrderKey) -> StoreResult<Option<Order>> {
        self.check().await?;
        let state = self.state.read().await;
        Ok(state.find(key).cloned())
    }

    async fn create(&self, id: Uuid, draft: OrderDraft, at: DateTime<Utc>) -> StoreResult<Order> {
        self.check().await?;
        let mut state = self.state.write().await;

        if state.orders.contains_key(&id) {
            return Err(StoreError::new(format!("duplicate order id {}", id)));
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;

        let order = Order::from_draft(id, OrderNumber::from_sequence(sequence, self.number_width), draft, at);
        state.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn update(
        &self,
        key: &OrderKey,
        expected: OrderStatus,
        patch: OrderPatch,
        at: DateTime<Utc>,
    ) -> StoreResult<ConditionalWrite> {
        self.check().await?;
        let mut state = self.state.write().await;

        let Some(order) = state.find_mut(key) else {
            return Ok(ConditionalWrite::Missing);
        };
        if order.status != expected {
            return Ok(ConditionalWrite::StatusChanged(order.status));
        }

        order.apply_patch(patch, at);
        Ok(ConditionalWrite::Applied(order.clone()))
    }

    async fn delete(&self, key: &OrderKey) -> StoreResult<bool> {
        self.check().await?;
        let mut state = self.state.write().await;

        match state.id_for(key) {
            Some(id) => Ok(state.orders.remove(&id).is_some()),
            None => Ok(false),
        }
    }

    async fn apply_transition(
        &self,
        key: &OrderKey,
        expected: OrderStatus,
        event: &OrderEvent,
        at: DateTime<Utc>,
    ) -> StoreResult<ConditionalWrite> {
        self.check().await?;
        let mut state = self.state.write().await;

        let Some(order) = state.find_mut(key) else {
            return Ok(ConditionalWrite::Missing);
        };
        if order.status != expected {
            return Ok(ConditionalWrite::StatusChanged(order.status));
        }

        order.apply_event(event, at);
        Ok(ConditionalWrite::Applied(order.clone()))
    }
}

// ============================================================================
// Payroll
// ============================================================================

#[derive(Default)]
pub struct InMemoryPayrollStore {
    records: RwLock<Vec<PayrollRecord>>,
    outage: RwLock<Option<String>>,
}

impl InMemoryPayrollStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_outage(&self, message: Option<&str>) {
        *self.outage.write().await = message.map(str::to_string);
    }

    async fn check(&self) -> StoreResult<()> {
        match self.outage.read().await.as_ref() {
            Some(message) => Err(StoreError::new(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PayrollStore for InMemoryPayrollStore {
    async fn list(&self, scope: &PayrollScope) -> StoreResult<Vec<PayrollRecord>> {
        self.check().await?;
        let records = self.records.read().await;
        let mut visible: Vec<PayrollRecord> = records
            .iter()
            .filter(|record| scope.includes(&record.user_email))
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.month.cmp(&a.month));
        Ok(visible)
    }

    async fn upsert(&self, mut record: PayrollRecord) -> StoreResult<PayrollRecord> {
        self.check().await?;
        let mut records = self.records.write().await;
        record.updated_at = Some(Utc::now());

        match record.id {
            Some(id) => {
                let existing = records
                    .iter_mut()
                    .find(|r| r.id == Some(id))
                    .ok_or_else(|| StoreError::new(format!("payroll record {} not found", id)))?;
                *existing = record.clone();
            }
            None => {
                record.id = Some(Uuid::new_v4());
                records.push(record.clone());
            }
        }

        Ok(record)
    }

    async fn remove(&self, id: Uuid) -> StoreResult<bool> {
        self.check().await?;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|record| record.id != Some(id));
        Ok(records.len() != before)
    }
}

// ============================================================================
// Technician Directory
// ============================================================================

#[derive(Default)]
pub struct InMemoryTechnicianDirectory {
    technicians: RwLock<Vec<Technician>>,
}

impl InMemoryTechnicianDirectory {
    pub fn new(technicians: Vec<Technician>) -> Self {
        Self {
            technicians: RwLock::new(technicians),
        }
    }

    pub async fn add(&self, technician: Technician) {
        self.technicians.write().await.push(technician);
    }
}

#[async_trait]
impl TechnicianDirectory for InMemoryTechnicianDirectory {
    async fn technicians(&self) -> StoreResult<Vec<Technician>> {
        Ok(self.technicians.read().await.clone())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
