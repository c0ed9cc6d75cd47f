use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::errors::PayrollError;
use super::support::SupportPayslip;
use crate::domain::actor::ActingUser;
use crate::domain::identifier::OrderNumber;

// ============================================================================
// Month - `YYYY-MM` payroll period
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Result<Self, PayrollError> {
        if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return Err(PayrollError::InvalidMonth(format!("{:04}-{:02}", year, month)));
        }
        Ok(Self { year, month })
    }

    /// Strict `YYYY-MM` parse
    pub fn parse(value: &str) -> Result<Self, PayrollError> {
        let invalid = || PayrollError::InvalidMonth(value.to_string());

        let (year, month) = value.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        if !year.chars().chain(month.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn next(&self) -> Self {
        self.shift(1)
    }

    pub fn prev(&self) -> Self {
        self.shift(-1)
    }

    /// Move by whole months, either direction
    pub fn shift(&self, months: i32) -> Self {
        let index = self.year * 12 + (self.month as i32 - 1) + months;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn days_in_month(&self) -> u32 {
        (self.next().first_day() - self.first_day()).num_days() as u32
    }

    /// `[month start, next month start)` in organization-local time, as UTC instants
    pub fn bounds(&self, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
        (local_midnight(self.first_day(), offset), local_midnight(self.next().first_day(), offset))
    }

    pub fn containing(at: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local = at.with_timezone(&offset);
        Self {
            year: local.year(),
            month: local.month(),
        }
    }
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let naive = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    naive
        .and_local_timezone(offset)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl TryFrom<String> for Month {
    type Error = PayrollError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Month::parse(&value)
    }
}

impl From<Month> for String {
    fn from(month: Month) -> Self {
        month.to_string()
    }
}

// ============================================================================
// Compensation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompensationScheme {
    /// Scheme A: base salary + fixed bonus
    #[default]
    #[serde(alias = "A")]
    Flat,
    /// Scheme B: base salary + share of attributed revenue
    #[serde(alias = "B")]
    RevenueShare,
}

/// Per-technician pay configuration; missing configuration means all zeros
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompensationProfile {
    pub scheme: CompensationScheme,
    pub base_salary: Decimal,
    pub bonus: Decimal,
    pub revenue_share_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technician {
    pub email: String,
    pub name: String,
    pub code: Option<String>,
    pub profile: Option<CompensationProfile>,
}

impl Technician {
    pub fn key(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

// ============================================================================
// Payroll Records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAttribution {
    pub order_number: OrderNumber,
    pub billable_amount: Decimal,
    pub technician_count: usize,
    pub share: Decimal,
}

/// Snapshot of how a technician's computed pay was derived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicianBreakdown {
    pub technician_name: String,
    pub scheme: CompensationScheme,
    pub per_tech_total: Decimal,
    pub order_count: usize,
    pub attributions: Vec<OrderAttribution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualEntry {
    pub entered_by: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PayrollBreakdown {
    Technician(TechnicianBreakdown),
    Support(SupportPayslip),
    Manual(ManualEntry),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollRecord {
    pub id: Option<Uuid>,
    pub user_email: String,
    pub month: Month,
    pub base_salary: Decimal,
    pub bonus: Decimal,
    pub revenue_share_rate: Decimal,
    pub total: Decimal,
    pub breakdown: Option<PayrollBreakdown>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PayrollRecord {
    /// Anything other than a computed technician snapshot was entered by hand
    pub fn is_manual(&self) -> bool {
        !matches!(self.breakdown, Some(PayrollBreakdown::Technician(_)))
    }

    pub fn belongs_to(&self, email: &str, month: Month) -> bool {
        self.month == month && self.user_email.eq_ignore_ascii_case(email.trim())
    }

    /// Net pay: the support payslip's net when present, else the record total
    pub fn net(&self) -> Decimal {
        match &self.breakdown {
            Some(PayrollBreakdown::Support(slip)) => slip.net,
            _ => self.total,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    Computed,
    Manual,
}

/// Which users' records a caller may list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayrollScope {
    All,
    User(String),
}

impl PayrollScope {
    pub fn for_actor(actor: &ActingUser) -> Self {
        if actor.is_admin() {
            PayrollScope::All
        } else {
            PayrollScope::User(actor.email.clone())
        }
    }

    pub fn includes(&self, email: &str) -> bool {
        match self {
            PayrollScope::All => true,
            PayrollScope::User(own) => own.eq_ignore_ascii_case(email.trim()),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actor::Role;
    use chrono::TimeZone;

    fn taipei() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    #[test]
    fn test_month_parse() {
        let month = Month::parse("2024-05").unwrap();
        assert_eq!(month.year(), 2024);
        assert_eq!(month.month(), 5);
        assert_eq!(month.to_string(), "2024-05");
    }

    #[test]
    fn test_month_parse_rejects_malformed() {
        for bad in ["2024-5", "2024-13", "2024-00", "24-05", "2024/05", "", "2024-05-01", "abcd-ef", "+024-05"] {
            assert!(Month::parse(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_month_shift_across_years() {
        let jan = Month::parse("2024-01").unwrap();
        assert_eq!(jan.prev().to_string(), "2023-12");
        assert_eq!(jan.shift(-13).to_string(), "2022-12");
        assert_eq!(Month::parse("2024-12").unwrap().next().to_string(), "2025-01");
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(Month::parse("2024-02").unwrap().days_in_month(), 29);
        assert_eq!(Month::parse("2023-02").unwrap().days_in_month(), 28);
        assert_eq!(Month::parse("2024-04").unwrap().days_in_month(), 30);
        assert_eq!(Month::parse("2024-12").unwrap().days_in_month(), 31);
    }

    #[test]
    fn test_bounds_use_local_midnight() {
        let (start, end) = Month::parse("2024-05").unwrap().bounds(taipei());
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 4, 30, 16, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 5, 31, 16, 0, 0).unwrap());
    }

    #[test]
    fn test_month_containing_local_time() {
        // 2024-05-31 17:00 UTC is already June 1st in UTC+8
        let at = Utc.with_ymd_and_hms(2024, 5, 31, 17, 0, 0).unwrap();
        assert_eq!(Month::containing(at, taipei()).to_string(), "2024-06");
    }

    #[test]
    fn test_month_serde_as_string() {
        let month = Month::parse("2024-05").unwrap();
        assert_eq!(serde_json::to_string(&month).unwrap(), "\"2024-05\"");
        assert!(serde_json::from_str::<Month>("\"2024-13\"").is_err());
    }

    #[test]
    fn test_scheme_aliases() {
        let scheme: CompensationScheme = serde_json::from_str("\"B\"").unwrap();
        assert_eq!(scheme, CompensationScheme::RevenueShare);
        assert_eq!(CompensationProfile::default().scheme, CompensationScheme::Flat);
    }

    #[test]
    fn test_manual_detection() {
        let mut record = PayrollRecord {
            id: None,
            user_email: "t1@example.com".to_string(),
            month: Month::parse("2024-05").unwrap(),
            base_salary: Decimal::new(20000, 0),
            bonus: Decimal::ZERO,
            revenue_share_rate: Decimal::ZERO,
            total: Decimal::new(20000, 0),
            breakdown: None,
            updated_at: None,
        };
        assert!(record.is_manual());

        record.breakdown = Some(PayrollBreakdown::Technician(TechnicianBreakdown {
            technician_name: "T1".to_string(),
            scheme: CompensationScheme::Flat,
            per_tech_total: Decimal::ZERO,
            order_count: 0,
            attributions: vec![],
        }));
        assert!(!record.is_manual());
        assert!(record.belongs_to("T1@example.com", Month::parse("2024-05").unwrap()));
    }

    #[test]
    fn test_scope_for_actor() {
        let admin = ActingUser::new("boss@example.com", Role::Admin);
        let tech = ActingUser::new("t1@example.com", Role::Technician);

        assert_eq!(PayrollScope::for_actor(&admin), PayrollScope::All);
        let scope = PayrollScope::for_actor(&tech);
        assert!(scope.includes("T1@example.com"));
        assert!(!scope.includes("t2@example.com"));
    }
}
