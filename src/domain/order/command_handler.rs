use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::actor::OperationContext;
use crate::domain::identifier::{self, OrderKey};
use crate::error::{CoreError, CoreResult};
use crate::metrics::Metrics;
use crate::store::{ConditionalWrite, OrderStore};

use super::aggregate::Order;
use super::commands::{OrderCommand, OrderDraft, OrderPatch, TransitionKind};
use super::errors::OrderError;
use super::value_objects::OrderStatus;

// ============================================================================
// Order Lifecycle Service
// ============================================================================
//
// Orchestrates: Identifier → Store read → Order::handle_command → conditional
// write guarded by the status the decision was made against.
//
// If the store reports the status moved underneath us, the step is rejected
// against the status the store now holds. Nothing is retried.
//
// ============================================================================

pub struct OrderLifecycle {
    store: Arc<dyn OrderStore>,
    metrics: Option<Arc<Metrics>>,
}

impl OrderLifecycle {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validate a draft and insert it; the store assigns the order number
    pub async fn create(&self, ctx: &OperationContext, draft: OrderDraft) -> CoreResult<Order> {
        Order::validate_draft(&draft)?;

        let order = self.store.create(Uuid::new_v4(), draft, ctx.at).await?;

        tracing::info!(
            order_number = %order.order_number,
            order_id = %order.id,
            actor = %ctx.actor.email,
            "✅ Order created"
        );
        Ok(order)
    }

    pub async fn get(&self, ctx: &OperationContext, identifier: &str) -> CoreResult<Order> {
        let key = identifier::resolve(identifier)?;
        tracing::debug!(%key, actor = %ctx.actor.email, "Loading order");
        self.load(&key).await
    }

    /// All orders, newest first
    pub async fn list(&self, ctx: &OperationContext) -> CoreResult<Vec<Order>> {
        let orders = self.store.list().await?;
        tracing::debug!(count = orders.len(), actor = %ctx.actor.email, "Listed orders");
        Ok(orders)
    }

    /// Descriptive edits while the order is still open; completed orders only take `service_finished_at`
    pub async fn update(&self, ctx: &OperationContext, identifier: &str, patch: OrderPatch) -> CoreResult<Order> {
        let key = identifier::resolve(identifier)?;
        let order = self.load(&key).await?;

        if let Err(err) = order.validate_patch(&patch) {
            return Err(self.reject(ctx, &order, TransitionKind::Update, err));
        }

        match self.store.update(&key, order.status, patch, ctx.at).await? {
            ConditionalWrite::Applied(updated) => {
                tracing::info!(
                    order_number = %updated.order_number,
                    order_id = %updated.id,
                    actor = %ctx.actor.email,
                    "✅ Order updated"
                );
                Ok(updated)
            }
            ConditionalWrite::StatusChanged(current) => {
                Err(self.status_moved(ctx, &order, TransitionKind::Update, current))
            }
            ConditionalWrite::Missing => Err(CoreError::NotFound(key.to_string())),
        }
    }

    /// Administrative removal, allowed in any status
    pub async fn delete(&self, ctx: &OperationContext, identifier: &str) -> CoreResult<()> {
        let key = identifier::resolve(identifier)?;

        if !self.store.delete(&key).await? {
            return Err(CoreError::NotFound(key.to_string()));
        }

        tracing::info!(%key, actor = %ctx.actor.email, "✅ Order deleted");
        Ok(())
    }

    pub async fn confirm(&self, ctx: &OperationContext, identifier: &str) -> CoreResult<Order> {
        self.transition(ctx, identifier, OrderCommand::Confirm).await
    }

    pub async fn start_work(&self, ctx: &OperationContext, identifier: &str, at: DateTime<Utc>) -> CoreResult<Order> {
        self.transition(ctx, identifier, OrderCommand::StartWork { at }).await
    }

    pub async fn finish_work(&self, ctx: &OperationContext, identifier: &str, at: DateTime<Utc>) -> CoreResult<Order> {
        self.transition(ctx, identifier, OrderCommand::FinishWork { at }).await
    }

    /// An empty reason is rejected before the identifier is even looked at
    pub async fn cancel(&self, ctx: &OperationContext, identifier: &str, reason: &str) -> CoreResult<Order> {
        if reason.trim().is_empty() {
            let err = CoreError::from(OrderError::EmptyCancelReason);
            self.count_rejection(TransitionKind::Cancel, &err);
            return Err(err);
        }

        self.transition(
            ctx,
            identifier,
            OrderCommand::Cancel {
                reason: reason.to_string(),
            },
        )
        .await
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn load(&self, key: &OrderKey) -> CoreResult<Order> {
        self.store
            .get(key)
            .await?
            .ok_or_else(|| CoreError::NotFound(key.to_string()))
    }

    async fn transition(&self, ctx: &OperationContext, identifier: &str, command: OrderCommand) -> CoreResult<Order> {
        let kind = command.kind();
        let key = identifier::resolve(identifier)?;
        let order = self.load(&key).await?;

        let event = match order.handle_command(&command) {
            Ok(event) => event,
            Err(err) => return Err(self.reject(ctx, &order, kind, err)),
        };

        match self.store.apply_transition(&key, order.status, &event, ctx.at).await? {
            ConditionalWrite::Applied(updated) => {
                tracing::info!(
                    order_number = %updated.order_number,
                    order_id = %updated.id,
                    actor = %ctx.actor.email,
                    transition = %kind,
                    event_type = event.event_type(),
                    from = %order.status,
                    to = %updated.status,
                    "✅ Order transition applied"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_transition(kind.as_str());
                }
                Ok(updated)
            }
            ConditionalWrite::StatusChanged(current) => Err(self.status_moved(ctx, &order, kind, current)),
            ConditionalWrite::Missing => Err(CoreError::NotFound(key.to_string())),
        }
    }

    fn status_moved(
        &self,
        ctx: &OperationContext,
        order: &Order,
        kind: TransitionKind,
        current: OrderStatus,
    ) -> CoreError {
        let err = OrderError::InvalidTransition {
            order: order.order_number.to_string(),
            from: current,
            transition: kind,
        };
        tracing::warn!(
            order_number = %order.order_number,
            actor = %ctx.actor.email,
            read_status = %order.status,
            current_status = %current,
            "Order status changed before the write"
        );
        self.reject(ctx, order, kind, err)
    }

    fn reject(&self, ctx: &OperationContext, order: &Order, kind: TransitionKind, err: OrderError) -> CoreError {
        let err = CoreError::from(err);
        tracing::warn!(
            order_number = %order.order_number,
            order_id = %order.id,
            actor = %ctx.actor.email,
            transition = %kind,
            error = %err,
            "Order transition rejected"
        );
        self.count_rejection(kind, &err);
        err
    }

    fn count_rejection(&self, kind: TransitionKind, err: &CoreError) {
        if let Some(metrics) = &self.metrics {
            metrics.record_rejection(kind.as_str(), err.kind());
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
