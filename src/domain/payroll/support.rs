use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::PayrollError;
use super::value_objects::Month;

// ============================================================================
// Support-Staff Payslip
// ============================================================================
//
// Free-form line items entered by an administrator. The whole payslip is
// persisted as the record's breakdown so a historical slip can be shown
// exactly as it was saved.
//
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportAdditions {
    pub base_salary: Decimal,
    pub duty_allowance: Decimal,
    pub overtime_pay: Decimal,
    pub bonus: Decimal,
    pub other_plus: Decimal,
}

impl SupportAdditions {
    /// None if the line items overflow a Decimal
    pub fn sum(&self) -> Option<Decimal> {
        checked_sum(&[
            self.base_salary,
            self.duty_allowance,
            self.overtime_pay,
            self.bonus,
            self.other_plus,
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportDeductions {
    pub labor_insurance: Decimal,
    pub health_insurance: Decimal,
    pub attendance_deduct: Decimal,
    pub other_deduct1: Decimal,
    pub other_deduct2: Decimal,
    pub other_deduct3: Decimal,
}

impl SupportDeductions {
    pub fn sum(&self) -> Option<Decimal> {
        checked_sum(&[
            self.labor_insurance,
            self.health_insurance,
            self.attendance_deduct,
            self.other_deduct1,
            self.other_deduct2,
            self.other_deduct3,
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportPayslipInput {
    pub additions: SupportAdditions,
    pub deductions: SupportDeductions,
}

/// Line items plus derived totals, stored flat like the payslip form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportPayslip {
    #[serde(flatten)]
    pub additions: SupportAdditions,
    #[serde(flatten)]
    pub deductions: SupportDeductions,
    pub gross: Decimal,
    pub total_deduct: Decimal,
    pub net: Decimal,
}

impl SupportPayslip {
    /// Net pay never drops below zero; totals that overflow are rejected
    pub fn compute(input: SupportPayslipInput) -> Result<Self, PayrollError> {
        let gross = input
            .additions
            .sum()
            .ok_or(PayrollError::AmountOverflow("additions"))?;
        let total_deduct = input
            .deductions
            .sum()
            .ok_or(PayrollError::AmountOverflow("deductions"))?;
        let net = gross
            .checked_sub(total_deduct)
            .ok_or(PayrollError::AmountOverflow("net pay"))?
            .max(Decimal::ZERO);

        Ok(Self {
            additions: input.additions,
            deductions: input.deductions,
            gross,
            total_deduct,
            net,
        })
    }
}

fn checked_sum(amounts: &[Decimal]) -> Option<Decimal> {
    amounts
        .iter()
        .try_fold(Decimal::ZERO, |sum, amount| sum.checked_add(*amount))
}

/// One point of the trailing net-pay trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub month: Month,
    pub net: Decimal,
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn d(value: i64) -> Decimal {
        Decimal::from(value)
    }

    #[test]
    fn test_support_payslip_scenario() {
        let slip = SupportPayslip::compute(SupportPayslipInput {
            additions: SupportAdditions {
                base_salary: d(30000),
                ..Default::default()
            },
            deductions: SupportDeductions {
                labor_insurance: d(1000),
                health_insurance: d(500),
                ..Default::default()
            },
        })
        .unwrap();

        assert_eq!(slip.gross, d(30000));
        assert_eq!(slip.total_deduct, d(1500));
        assert_eq!(slip.net, d(28500));
    }

    #[test]
    fn test_net_never_negative() {
        let slip = SupportPayslip::compute(SupportPayslipInput {
            additions: SupportAdditions {
                base_salary: d(1000),
                ..Default::default()
            },
            deductions: SupportDeductions {
                attendance_deduct: d(800),
                other_deduct3: d(5000),
                ..Default::default()
            },
        })
        .unwrap();

        assert_eq!(slip.gross, d(1000));
        assert_eq!(slip.total_deduct, d(5800));
        assert_eq!(slip.net, Decimal::ZERO);
    }

    #[test]
    fn test_net_matches_formula_for_all_line_items() {
        let additions = SupportAdditions {
            base_salary: d(28000),
            duty_allowance: d(1500),
            overtime_pay: Decimal::new(123450, 2),
            bonus: d(2000),
            other_plus: d(300),
        };
        let deductions = SupportDeductions {
            labor_insurance: d(700),
            health_insurance: d(450),
            attendance_deduct: d(100),
            other_deduct1: d(10),
            other_deduct2: d(20),
            other_deduct3: d(30),
        };

        let slip = SupportPayslip::compute(SupportPayslipInput {
            additions: additions.clone(),
            deductions: deductions.clone(),
        })
        .unwrap();

        assert_eq!(slip.gross, Decimal::new(3303450, 2));
        assert_eq!(slip.total_deduct, d(1310));
        assert_eq!(
            slip.net,
            (additions.sum().unwrap() - deductions.sum().unwrap()).max(Decimal::ZERO)
        );
    }

    #[test]
    fn test_huge_additions_and_deductions() {
        let slip = SupportPayslip::compute(SupportPayslipInput {
            additions: SupportAdditions {
                base_salary: Decimal::MAX,
                ..Default::default()
            },
            deductions: SupportDeductions {
                labor_insurance: Decimal::MAX,
                ..Default::default()
            },
        })
        .unwrap();
        assert_eq!(slip.gross, Decimal::MAX);
        assert_eq!(slip.net, Decimal::ZERO);

        let overflowing = SupportPayslip::compute(SupportPayslipInput {
            additions: SupportAdditions {
                base_salary: Decimal::MAX,
                bonus: d(1),
                ..Default::default()
            },
            deductions: SupportDeductions {
                labor_insurance: Decimal::MAX,
                health_insurance: Decimal::MAX,
                ..Default::default()
            },
        });
        assert!(matches!(overflowing, Err(PayrollError::AmountOverflow("additions"))));

        let negative_deductions = SupportPayslip::compute(SupportPayslipInput {
            additions: SupportAdditions {
                base_salary: Decimal::MAX,
                ..Default::default()
            },
            deductions: SupportDeductions {
                other_deduct1: Decimal::MIN,
                ..Default::default()
            },
        });
        assert!(matches!(negative_deductions, Err(PayrollError::AmountOverflow("net pay"))));
    }

    #[test]
    fn test_payslip_serializes_flat() {
        let slip = SupportPayslip::compute(SupportPayslipInput {
            additions: SupportAdditions {
                base_salary: d(30000),
                ..Default::default()
            },
            deductions: SupportDeductions::default(),
        })
        .unwrap();

        let json = serde_json::to_value(&slip).unwrap();
        assert!(json.get("base_salary").is_some());
        assert!(json.get("labor_insurance").is_some());
        assert!(json.get("additions").is_none());

        let back: SupportPayslip = serde_json::from_value(json).unwrap();
        assert_eq!(back, slip);
    }
}
