use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::value_objects::Month;

/// Day-of-month rules for paying out a month's salary and bonus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutSchedule {
    pub salary_day: u32,
    pub bonus_day: u32,
}

impl Default for PayoutSchedule {
    fn default() -> Self {
        Self {
            salary_day: 5,
            bonus_day: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutDates {
    pub salary_date: NaiveDate,
    pub bonus_date: NaiveDate,
}

impl PayoutSchedule {
    /// Both dates fall in the month after `month`, clamped to its last day
    pub fn dates(&self, month: Month) -> PayoutDates {
        let payout_month = month.next();
        PayoutDates {
            salary_date: clamped_day(payout_month, self.salary_day),
            bonus_date: clamped_day(payout_month, self.bonus_day),
        }
    }
}

fn clamped_day(month: Month, day: u32) -> NaiveDate {
    let day = day.clamp(1, month.days_in_month());
    NaiveDate::from_ymd_opt(month.year(), month.month(), day).unwrap_or_else(|| month.first_day())
}
