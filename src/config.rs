use chrono::FixedOffset;

use crate::domain::payroll::PayoutSchedule;

const DEFAULT_UTC_OFFSET_SECS: i32 = 8 * 3600;

/// Core configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | FIELDOPS_UTC_OFFSET_MINUTES | 480 | organization-local offset used for month boundaries |
/// | FIELDOPS_SALARY_DAY | 5 | day of the following month salaries are paid |
/// | FIELDOPS_BONUS_DAY | 15 | day of the following month bonuses are paid |
/// | FIELDOPS_CURRENCY_DECIMALS | 0 | decimal places of the currency's smallest unit |
/// | FIELDOPS_ORDER_NUMBER_WIDTH | 6 | zero-padded digits in generated order numbers |
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Organization-local offset; payroll months start at local midnight
    pub utc_offset: FixedOffset,
    pub payout: PayoutSchedule,
    /// 0 for TWD/JPY, 2 for USD/EUR
    pub currency_decimals: u32,
    pub order_number_width: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            utc_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS).expect("default offset is in range"),
            payout: PayoutSchedule::default(),
            currency_decimals: 0,
            order_number_width: 6,
        }
    }
}

impl CoreConfig {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let utc_offset = env_parsed::<i32>("FIELDOPS_UTC_OFFSET_MINUTES")
            .and_then(|minutes| {
                let offset = minutes.checked_mul(60).and_then(FixedOffset::east_opt);
                if offset.is_none() {
                    tracing::warn!(minutes, "UTC offset out of range, using default");
                }
                offset
            })
            .unwrap_or(defaults.utc_offset);

        Self {
            utc_offset,
            payout: PayoutSchedule {
                salary_day: env_parsed("FIELDOPS_SALARY_DAY").unwrap_or(defaults.payout.salary_day),
                bonus_day: env_parsed("FIELDOPS_BONUS_DAY").unwrap_or(defaults.payout.bonus_day),
            },
            currency_decimals: env_parsed("FIELDOPS_CURRENCY_DECIMALS").unwrap_or(defaults.currency_decimals),
            order_number_width: env_parsed("FIELDOPS_ORDER_NUMBER_WIDTH").unwrap_or(defaults.order_number_width),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable config value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.utc_offset.local_minus_utc(), 8 * 3600);
        assert_eq!(config.payout.salary_day, 5);
        assert_eq!(config.payout.bonus_day, 15);
        assert_eq!(config.currency_decimals, 0);
        assert_eq!(config.order_number_width, 6);
    }

    #[test]
    fn test_from_env_overrides_and_falls_back() {
        std::env::set_var("FIELDOPS_SALARY_DAY", "31");
        std::env::set_var("FIELDOPS_CURRENCY_DECIMALS", "two");
        std::env::set_var("FIELDOPS_UTC_OFFSET_MINUTES", "-300");

        let config = CoreConfig::from_env();
        assert_eq!(config.payout.salary_day, 31);
        assert_eq!(config.currency_decimals, 0);
        assert_eq!(config.utc_offset.local_minus_utc(), -5 * 3600);

        std::env::remove_var("FIELDOPS_SALARY_DAY");
        std::env::remove_var("FIELDOPS_CURRENCY_DECIMALS");
        std::env::remove_var("FIELDOPS_UTC_OFFSET_MINUTES");
    }
}
