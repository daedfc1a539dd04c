//! Typed payloads carried inside event `data` objects and command bodies.

use serde::{Deserialize, Serialize};

/// Kind of accepted money on a credit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditKind {
    /// Coin acceptor credit.
    Coin,

    /// Bill validator credit.
    Bill,
}

/// Payload of a `credit` event: one accepted coin or bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditEvent {
    /// Face value of the accepted coin or bill.
    pub denomination: f64,

    /// Whether a coin or a bill was accepted.
    pub kind: CreditKind,

    /// Acceptor device that produced the credit.
    pub device_id: String,
}

/// Fill-level snapshot of a single change hopper.
///
/// A `hopper_level` event carries a sequence of these under the `hoppers`
/// key of its data object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HopperLevel {
    /// Hopper identifier.
    pub hopper_id: String,

    /// Denomination this hopper dispenses.
    pub denomination: f64,

    /// Current number of coins/bills in the hopper.
    pub current_level: u32,

    /// Maximum capacity of the hopper.
    pub capacity: u32,

    /// Level at or below which the hopper counts as low.
    pub low_threshold: u32,
}

impl HopperLevel {
    /// Returns `true` if the hopper is at or below its low threshold.
    #[must_use]
    pub fn is_low(&self) -> bool {
        self.current_level <= self.low_threshold
    }
}

/// One line of a dispense plan: how many units of one denomination to pay out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseItem {
    /// Denomination to dispense.
    pub denomination: f64,

    /// Number of units of that denomination.
    pub quantity: u32,
}

impl DispenseItem {
    /// Create a plan line.
    #[must_use]
    pub fn new(denomination: f64, quantity: u32) -> Self {
        Self {
            denomination,
            quantity,
        }
    }
}

/// Caller-supplied intent for a `dispense_change` command.
///
/// The client attaches no request identifier; correlation to the eventual
/// `dispense_success`/`dispense_error` event is by event kind only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseRequest {
    /// Denomination/quantity lines to pay out.
    pub plan: Vec<DispenseItem>,

    /// Total amount the plan adds up to.
    pub total_amount: f64,
}

impl DispenseRequest {
    /// Build a request from a plan, computing the total amount.
    ///
    /// The total is accumulated in integer cents so that plans like
    /// three times 0.10 sum to exactly 0.30.
    #[must_use]
    pub fn from_plan(plan: Vec<DispenseItem>) -> Self {
        let cents: i64 = plan
            .iter()
            .map(|item| (item.denomination * 100.0).round() as i64 * i64::from(item.quantity))
            .sum();
        Self {
            plan,
            total_amount: cents as f64 / 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_credit_event_wire_format() {
        let raw = r#"{"denomination": 2.0, "kind": "bill", "deviceId": "bill-validator-1"}"#;
        let credit: CreditEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(credit.kind, CreditKind::Bill);
        assert_eq!(credit.denomination, 2.0);
        assert_eq!(credit.device_id, "bill-validator-1");
    }

    #[rstest]
    #[case(5, 5, true)] // at threshold counts as low
    #[case(4, 5, true)]
    #[case(6, 5, false)]
    fn test_hopper_is_low(#[case] level: u32, #[case] threshold: u32, #[case] low: bool) {
        let hopper = HopperLevel {
            hopper_id: "h1".to_string(),
            denomination: 0.10,
            current_level: level,
            capacity: 100,
            low_threshold: threshold,
        };
        assert_eq!(hopper.is_low(), low);
    }

    #[test]
    fn test_hopper_level_camel_case() {
        let hopper = HopperLevel {
            hopper_id: "h1".to_string(),
            denomination: 0.50,
            current_level: 42,
            capacity: 100,
            low_threshold: 10,
        };
        let json = serde_json::to_string(&hopper).unwrap();
        assert!(json.contains("\"hopperId\""));
        assert!(json.contains("\"currentLevel\""));
        assert!(json.contains("\"lowThreshold\""));
    }

    #[test]
    fn test_dispense_request_total_is_exact() {
        // Naive f64 summation of 0.10 * 3 gives 0.30000000000000004.
        let request = DispenseRequest::from_plan(vec![DispenseItem::new(0.10, 3)]);
        assert_eq!(request.total_amount, 0.30);
    }

    #[test]
    fn test_dispense_request_mixed_plan() {
        let request = DispenseRequest::from_plan(vec![
            DispenseItem::new(1.00, 2),
            DispenseItem::new(0.25, 3),
            DispenseItem::new(0.05, 1),
        ]);
        assert_eq!(request.total_amount, 2.80);
        assert_eq!(request.plan.len(), 3);
    }

    #[test]
    fn test_dispense_request_wire_format() {
        let request = DispenseRequest::from_plan(vec![DispenseItem::new(0.10, 3)]);
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"totalAmount\":0.3"));
        assert!(json.contains("\"quantity\":3"));
    }
}
