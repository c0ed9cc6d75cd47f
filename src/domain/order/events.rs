use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value_objects::OrderStatus;

// ============================================================================
// Order Events - facts emitted by a validated lifecycle command
// ============================================================================
//
// The aggregate emits an event after checking the transition table; the
// store applies that same event as one conditional write.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    Confirmed,
    WorkStarted { at: DateTime<Utc> },
    WorkFinished { at: DateTime<Utc> },
    Canceled { reason: String },
}

impl OrderEvent {
    /// Status the order holds once this event is applied
    pub fn resulting_status(&self) -> OrderStatus {
        match self {
            OrderEvent::Confirmed => OrderStatus::Confirmed,
            OrderEvent::WorkStarted { .. } => OrderStatus::InProgress,
            OrderEvent::WorkFinished { .. } => OrderStatus::Completed,
            OrderEvent::Canceled { .. } => OrderStatus::Canceled,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Confirmed => "OrderConfirmed",
            OrderEvent::WorkStarted { .. } => "OrderWorkStarted",
            OrderEvent::WorkFinished { .. } => "OrderWorkFinished",
            OrderEvent::Canceled { .. } => "OrderCanceled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = OrderEvent::Canceled {
            reason: "Customer rescheduled".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Canceled");
        assert_eq!(json["data"]["reason"], "Customer rescheduled");
    }

    #[test]
    fn test_resulting_status() {
        assert_eq!(OrderEvent::Confirmed.resulting_status(), OrderStatus::Confirmed);
        assert_eq!(
            OrderEvent::WorkFinished { at: Utc::now() }.resulting_status(),
            OrderStatus::Completed
        );
    }
}
