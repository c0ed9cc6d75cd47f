use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

// ============================================================================
// Identifier Resolution - Order Number vs Internal Id
// ============================================================================
//
// Orders are addressable two ways: the human-facing order number ("O000123")
// and the storage-level UUID. Every store-facing operation goes through
// `resolve` so both forms are classified by exactly one rule.
//
// ============================================================================

static ORDER_NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^O[0-9]+$").expect("order number regex should compile"));

static INTERNAL_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("internal id regex should compile")
});

/// Human-readable sequential order code, `O` followed by digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Format a store sequence value as `O` + zero-padded digits
    pub fn from_sequence(sequence: u64, width: usize) -> Self {
        Self(format!("O{:0width$}", sequence, width = width))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tagged lookup key consumed uniformly by every order store call
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderKey {
    OrderNumber(OrderNumber),
    InternalId(Uuid),
}

impl OrderKey {
    pub fn is_order_number(&self) -> bool {
        matches!(self, OrderKey::OrderNumber(_))
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKey::OrderNumber(number) => write!(f, "{}", number),
            OrderKey::InternalId(id) => write!(f, "{}", id),
        }
    }
}

/// Classify a lookup string as an order number or an internal id
pub fn resolve(candidate: &str) -> CoreResult<OrderKey> {
    let candidate = candidate.trim();

    if ORDER_NUMBER_PATTERN.is_match(candidate) {
        return Ok(OrderKey::OrderNumber(OrderNumber(candidate.to_string())));
    }

    if INTERNAL_ID_PATTERN.is_match(candidate) {
        let id = Uuid::parse_str(candidate)
            .map_err(|_| CoreError::InvalidIdentifier(candidate.to_string()))?;
        return Ok(OrderKey::InternalId(id));
    }

    tracing::debug!(candidate = %candidate, "Identifier matched neither addressing pattern");
    Err(CoreError::InvalidIdentifier(candidate.to_string()))
}

// ============================================================================
// Unit Tests
// ============================================================================
