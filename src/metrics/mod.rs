use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

// ============================================================================
// Metrics Module - Prometheus counters for the order & payroll core
// ============================================================================
//
// Tracks:
// - lifecycle transitions applied, by transition
// - rejected transitions, by transition and error kind
// - payroll computations, by kind (technician, support, trend)
// - manual records that replaced a computed value
//
// The registry is owned here; exposing it (HTTP scrape, push) is the
// embedding application's job.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Order Lifecycle Metrics
    pub order_transitions: IntCounterVec,
    pub order_transition_rejections: IntCounterVec,

    // Payroll Metrics
    pub payroll_computations: IntCounterVec,
    pub payroll_overrides_applied: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let order_transitions = IntCounterVec::new(
            Opts::new("order_transitions_total", "Order lifecycle transitions applied"),
            &["transition"],
        )?;
        registry.register(Box::new(order_transitions.clone()))?;

        let order_transition_rejections = IntCounterVec::new(
            Opts::new(
                "order_transition_rejections_total",
                "Order lifecycle operations rejected before or at the store",
            ),
            &["transition", "reason"],
        )?;
        registry.register(Box::new(order_transition_rejections.clone()))?;

        let payroll_computations = IntCounterVec::new(
            Opts::new("payroll_computations_total", "Payroll computations run"),
            &["kind"],
        )?;
        registry.register(Box::new(payroll_computations.clone()))?;

        let payroll_overrides_applied = IntCounter::new(
            "payroll_overrides_applied_total",
            "Computed payroll records replaced by a manual record",
        )?;
        registry.register(Box::new(payroll_overrides_applied.clone()))?;

        Ok(Self {
            registry,
            order_transitions,
            order_transition_rejections,
            payroll_computations,
            payroll_overrides_applied,
        })
    }

    /// Get the Prometheus registry for exposing metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_transition(&self, transition: &str) {
        self.order_transitions.with_label_values(&[transition]).inc();
    }

    pub fn record_rejection(&self, transition: &str, reason: &str) {
        self.order_transition_rejections
            .with_label_values(&[transition, reason])
            .inc();
    }

    pub fn record_payroll_computation(&self, kind: &str) {
        self.payroll_computations.with_label_values(&[kind]).inc();
    }

    pub fn record_overrides(&self, count: usize) {
        self.payroll_overrides_applied.inc_by(count as u64);
    }
}
