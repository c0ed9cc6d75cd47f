use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;

use super::value_objects::{
    CompensationProfile, CompensationScheme, Month, OrderAttribution, PayrollBreakdown,
    PayrollRecord, TechnicianBreakdown,
};
use crate::domain::order::{Order, OrderStatus};

// ============================================================================
// Technician Payroll Computation
// ============================================================================
//
// 1. completed orders whose work_completed_at falls in the month window
// 2. each order's billable amount split evenly across its technicians
// 3. shares summed per technician
// 4. the technician's scheme applied to the sum
//
// ============================================================================

/// Everything attributed to one technician in a month
#[derive(Debug, Clone, Default)]
pub struct TechnicianTally {
    pub name: String,
    pub per_tech_total: Decimal,
    pub attributions: Vec<OrderAttribution>,
}

/// Equal-split attribution of completed work in `[start, end)`, keyed by lowercase email
pub fn tally_completed_orders(
    orders: &[Order],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> BTreeMap<String, TechnicianTally> {
    let mut tallies: BTreeMap<String, TechnicianTally> = BTreeMap::new();

    for order in orders {
        if order.status != OrderStatus::Completed {
            continue;
        }
        let in_window = order
            .work_completed_at
            .map(|at| at >= start && at < end)
            .unwrap_or(false);
        if !in_window || order.assigned_technicians.is_empty() {
            continue;
        }

        let technician_count = order.assigned_technicians.len();
        let billable = order.billable_amount();
        let share = billable / Decimal::from(technician_count as u64);

        for tech in &order.assigned_technicians {
            let tally = tallies.entry(tech.key()).or_default();
            if tally.name.is_empty() {
                tally.name = tech.name.clone();
            }
            tally.per_tech_total = tally.per_tech_total.saturating_add(share);
            tally.attributions.push(OrderAttribution {
                order_number: order.order_number.clone(),
                billable_amount: billable,
                technician_count,
                share,
            });
        }
    }

    tallies
}

/// Half-up rounding to the currency's smallest unit
pub fn round_currency(amount: Decimal, decimals: u32) -> Decimal {
    amount.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

/// Apply a compensation profile to a technician's month.
/// Amounts saturate at `Decimal::MAX` instead of overflowing.
pub fn technician_record(
    email: &str,
    name: &str,
    month: Month,
    profile: &CompensationProfile,
    tally: Option<&TechnicianTally>,
    currency_decimals: u32,
) -> PayrollRecord {
    let per_tech_total = tally.map(|t| t.per_tech_total).unwrap_or(Decimal::ZERO);

    let bonus = match profile.scheme {
        CompensationScheme::Flat => profile.bonus,
        CompensationScheme::RevenueShare => {
            round_currency(profile.revenue_share_rate.saturating_mul(per_tech_total), currency_decimals)
        }
    };

    PayrollRecord {
        id: None,
        user_email: email.to_string(),
        month,
        base_salary: profile.base_salary,
        bonus,
        revenue_share_rate: profile.revenue_share_rate,
        total: profile.base_salary.saturating_add(bonus),
        breakdown: Some(PayrollBreakdown::Technician(TechnicianBreakdown {
            technician_name: name.to_string(),
            scheme: profile.scheme,
            per_tech_total,
            order_count: tally.map(|t| t.attributions.len()).unwrap_or(0),
            attributions: tally.map(|t| t.attributions.clone()).unwrap_or_default(),
        })),
        updated_at: None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
