use futures_util::future::try_join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use super::errors::PayrollError;
use super::payout::PayoutDates;
use super::support::{SupportPayslip, SupportPayslipInput, TrendPoint};
use super::technician::{tally_completed_orders, technician_record};
use super::value_objects::{
    CompensationProfile, ManualEntry, Month, PayrollBreakdown, PayrollRecord, PayrollScope, RecordSource,
};
use crate::config::CoreConfig;
use crate::domain::actor::OperationContext;
use crate::error::CoreResult;
use crate::metrics::Metrics;
use crate::store::{OrderStore, PayrollStore, TechnicianDirectory};

/// Months covered by the net-pay trend, ending at the requested month
pub const TREND_MONTHS: i32 = 6;

// ============================================================================
// Payroll Engine
// ============================================================================
//
// Reads orders, never writes them. Computed technician records stay in
// memory until `persist_computed` is called; a manual record for the same
// (user, month) always wins over the computed one.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollEntry {
    pub record: PayrollRecord,
    pub source: RecordSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyPayroll {
    pub month: Month,
    pub payout: PayoutDates,
    pub entries: Vec<PayrollEntry>,
}

pub struct PayrollEngine {
    orders: Arc<dyn OrderStore>,
    payroll: Arc<dyn PayrollStore>,
    directory: Arc<dyn TechnicianDirectory>,
    config: CoreConfig,
    metrics: Option<Arc<Metrics>>,
}

impl PayrollEngine {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        payroll: Arc<dyn PayrollStore>,
        directory: Arc<dyn TechnicianDirectory>,
        config: CoreConfig,
    ) -> Self {
        Self {
            orders,
            payroll,
            directory,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    // ========================================================================
    // Technician payroll
    // ========================================================================

    /// One computed record per technician, sorted by email; nothing is persisted
    pub async fn compute_technician_payroll(
        &self,
        ctx: &OperationContext,
        month: &str,
    ) -> CoreResult<Vec<PayrollRecord>> {
        let month = Month::parse(month)?;
        self.compute_for(ctx, month).await
    }

    /// Computed records with manual overrides applied, scoped to the acting user
    pub async fn monthly_payroll(&self, ctx: &OperationContext, month: &str) -> CoreResult<MonthlyPayroll> {
        let month = Month::parse(month)?;
        let scope = PayrollScope::for_actor(&ctx.actor);

        let computed = self.compute_for(ctx, month).await?;
        let mut manual: BTreeMap<String, PayrollRecord> = self
            .payroll
            .list(&scope)
            .await?
            .into_iter()
            .filter(|record| record.month == month && record.is_manual())
            .map(|record| (record.user_email.trim().to_lowercase(), record))
            .collect();

        let mut entries = Vec::new();
        let mut overrides = 0;
        for record in computed {
            if !scope.includes(&record.user_email) {
                continue;
            }
            match manual.remove(&record.user_email.to_lowercase()) {
                Some(existing) => {
                    overrides += 1;
                    entries.push(PayrollEntry {
                        record: existing,
                        source: RecordSource::Manual,
                    });
                }
                None => entries.push(PayrollEntry {
                    record,
                    source: RecordSource::Computed,
                }),
            }
        }

        // Manual records for people with no computed row (support staff, ad-hoc entries)
        entries.extend(manual.into_values().map(|record| PayrollEntry {
            record,
            source: RecordSource::Manual,
        }));
        entries.sort_by(|a, b| a.record.user_email.to_lowercase().cmp(&b.record.user_email.to_lowercase()));

        if let Some(metrics) = &self.metrics {
            metrics.record_overrides(overrides);
        }

        tracing::debug!(
            %month,
            actor = %ctx.actor.email,
            entries = entries.len(),
            overrides,
            "Monthly payroll assembled"
        );

        Ok(MonthlyPayroll {
            month,
            payout: self.config.payout.dates(month),
            entries,
        })
    }

    /// Store computed snapshots, leaving manually entered pairs alone
    pub async fn persist_computed(&self, ctx: &OperationContext, month: &str) -> CoreResult<Vec<PayrollRecord>> {
        let month = Month::parse(month)?;
        let computed = self.compute_for(ctx, month).await?;

        let existing: BTreeMap<String, PayrollRecord> = self
            .payroll
            .list(&PayrollScope::All)
            .await?
            .into_iter()
            .filter(|record| record.month == month)
            .map(|record| (record.user_email.trim().to_lowercase(), record))
            .collect();

        let mut pending = Vec::new();
        let mut skipped = 0usize;
        for mut record in computed {
            match existing.get(&record.user_email.to_lowercase()) {
                Some(previous) if previous.is_manual() => {
                    skipped += 1;
                    continue;
                }
                Some(previous) => record.id = previous.id,
                None => {}
            }
            pending.push(self.payroll.upsert(record));
        }

        let persisted = try_join_all(pending).await?;

        tracing::info!(
            %month,
            actor = %ctx.actor.email,
            persisted = persisted.len(),
            skipped_manual = skipped,
            "✅ Computed payroll persisted"
        );
        Ok(persisted)
    }

    /// Administrator flat entry: total = base + bonus
    pub async fn record_manual(
        &self,
        ctx: &OperationContext,
        email: &str,
        month: &str,
        base_salary: Decimal,
        bonus: Decimal,
        note: Option<String>,
    ) -> CoreResult<PayrollRecord> {
        let email = normalized_email(email)?;
        let month = Month::parse(month)?;
        let total = base_salary
            .checked_add(bonus)
            .ok_or(PayrollError::AmountOverflow("manual total"))?;
        let existing = self.payroll.find(&email, month).await?;

        let record = PayrollRecord {
            id: existing.and_then(|record| record.id),
            user_email: email,
            month,
            base_salary,
            bonus,
            revenue_share_rate: Decimal::ZERO,
            total,
            breakdown: Some(PayrollBreakdown::Manual(ManualEntry {
                entered_by: ctx.actor.email.clone(),
                note,
            })),
            updated_at: None,
        };
        let saved = self.payroll.upsert(record).await?;

        tracing::info!(
            user_email = %saved.user_email,
            %month,
            actor = %ctx.actor.email,
            total = %saved.total,
            "✅ Manual payroll recorded"
        );
        Ok(saved)
    }

    // ========================================================================
    // Support-staff payroll
    // ========================================================================

    /// Compute and persist a payslip; an existing record for the pair is updated in place
    pub async fn save_support_payslip(
        &self,
        ctx: &OperationContext,
        email: &str,
        month: &str,
        input: SupportPayslipInput,
    ) -> CoreResult<PayrollRecord> {
        let email = normalized_email(email)?;
        let month = Month::parse(month)?;
        let slip = SupportPayslip::compute(input)?;
        let existing = self.payroll.find(&email, month).await?;

        let record = PayrollRecord {
            id: existing.and_then(|record| record.id),
            user_email: email,
            month,
            base_salary: slip.additions.base_salary,
            bonus: slip.additions.bonus,
            revenue_share_rate: Decimal::ZERO,
            total: slip.net,
            breakdown: Some(PayrollBreakdown::Support(slip)),
            updated_at: None,
        };
        let saved = self.payroll.upsert(record).await?;

        if let Some(metrics) = &self.metrics {
            metrics.record_payroll_computation("support");
        }
        tracing::info!(
            user_email = %saved.user_email,
            %month,
            actor = %ctx.actor.email,
            net = %saved.total,
            "✅ Support payslip saved"
        );
        Ok(saved)
    }

    /// The persisted payslip for a pair, if the acting user may see it
    pub async fn support_payslip(
        &self,
        ctx: &OperationContext,
        email: &str,
        month: &str,
    ) -> CoreResult<Option<SupportPayslip>> {
        let month = Month::parse(month)?;
        if !PayrollScope::for_actor(&ctx.actor).includes(email) {
            return Ok(None);
        }

        let slip = self
            .payroll
            .find(email, month)
            .await?
            .and_then(|record| match record.breakdown {
                Some(PayrollBreakdown::Support(slip)) => Some(slip),
                _ => None,
            });
        Ok(slip)
    }

    /// Net pay for the trailing window ending at `month`, oldest first; absent months are 0
    pub async fn net_trend(&self, ctx: &OperationContext, email: &str, month: &str) -> CoreResult<Vec<TrendPoint>> {
        let month = Month::parse(month)?;
        let months: Vec<Month> = (0..TREND_MONTHS).rev().map(|back| month.shift(-back)).collect();

        if !PayrollScope::for_actor(&ctx.actor).includes(email) {
            return Ok(months
                .into_iter()
                .map(|month| TrendPoint {
                    month,
                    net: Decimal::ZERO,
                })
                .collect());
        }

        let records = try_join_all(months.iter().map(|m| self.payroll.find(email, *m))).await?;
        let trend: Vec<TrendPoint> = months
            .into_iter()
            .zip(records)
            .map(|(month, record)| TrendPoint {
                month,
                net: record.map(|r| r.net()).unwrap_or(Decimal::ZERO),
            })
            .collect();

        if let Some(metrics) = &self.metrics {
            metrics.record_payroll_computation("trend");
        }
        Ok(trend)
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Administrators see everything, everyone else only their own records
    pub async fn list_records(&self, ctx: &OperationContext) -> CoreResult<Vec<PayrollRecord>> {
        let scope = PayrollScope::for_actor(&ctx.actor);
        Ok(self.payroll.list(&scope).await?)
    }

    pub async fn remove_record(&self, ctx: &OperationContext, id: Uuid) -> CoreResult<()> {
        if !self.payroll.remove(id).await? {
            return Err(PayrollError::RecordNotFound(id).into());
        }
        tracing::info!(record_id = %id, actor = %ctx.actor.email, "✅ Payroll record removed");
        Ok(())
    }

    pub fn payout_dates(&self, ctx: &OperationContext, month: &str) -> CoreResult<PayoutDates> {
        let month = Month::parse(month)?;
        let dates = self.config.payout.dates(month);
        tracing::debug!(
            %month,
            actor = %ctx.actor.email,
            salary_date = %dates.salary_date,
            bonus_date = %dates.bonus_date,
            "Payout dates derived"
        );
        Ok(dates)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn compute_for(&self, ctx: &OperationContext, month: Month) -> CoreResult<Vec<PayrollRecord>> {
        let (start, end) = month.bounds(self.config.utc_offset);
        let orders = self.orders.completed_between(start, end).await?;
        let technicians = self.directory.technicians().await?;
        let tallies = tally_completed_orders(&orders, start, end);

        // union of directory and attributed technicians, keyed (and so sorted) by email
        let mut people: BTreeMap<String, (String, Option<CompensationProfile>)> = technicians
            .into_iter()
            .map(|tech| (tech.key(), (tech.name, tech.profile)))
            .collect();
        for (email, tally) in &tallies {
            people
                .entry(email.clone())
                .or_insert_with(|| (tally.name.clone(), None));
        }

        let records: Vec<PayrollRecord> = people
            .into_iter()
            .map(|(email, (name, profile))| {
                let profile = profile.unwrap_or_default();
                technician_record(
                    &email,
                    &name,
                    month,
                    &profile,
                    tallies.get(&email),
                    self.config.currency_decimals,
                )
            })
            .collect();

        if let Some(metrics) = &self.metrics {
            metrics.record_payroll_computation("technician");
        }
        tracing::debug!(
            %month,
            actor = %ctx.actor.email,
            %start,
            %end,
            orders = orders.len(),
            technicians = records.len(),
            "Technician payroll computed"
        );
        Ok(records)
    }
}

fn normalized_email(email: &str) -> CoreResult<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(PayrollError::EmptyEmail.into());
    }
    Ok(email)
}

// ============================================================================
// Unit Tests
// ============================================================================
