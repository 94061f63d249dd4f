use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::market::round_money;

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for OrderSide {
    type Error = String;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            _ => Err(format!("Unknown order side: {}", s)),
        }
    }
}

/// Order status
///
/// PENDING is the only live state; EXECUTED and CANCELED are terminal and
/// an order never leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Executed,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Executed => "EXECUTED",
            OrderStatus::Canceled => "CANCELED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Executed | OrderStatus::Canceled)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Executed)
                | (OrderStatus::Pending, OrderStatus::Canceled)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = String;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(OrderStatus::Pending),
            "EXECUTED" => Ok(OrderStatus::Executed),
            "CANCELED" => Ok(OrderStatus::Canceled),
            _ => Err(format!("Unknown order status: {}", s)),
        }
    }
}

/// A trade request accepted into the book. `price_locked` is the market
/// price snapshotted at placement; settlement never re-reads the live
/// price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub stock_id: i64,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price_locked: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Dollar value of the order at its locked price, rounded to cents.
    pub fn notional(&self) -> Decimal {
        round_money(self.price_locked * self.quantity)
    }
}

/// Result of a settle or cancel attempt. Rejections are soft: the order
/// and ledger are untouched and re-submission is safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum SettleOutcome {
    Executed,
    Canceled,
    Rejected { reason: &'static str },
}

/// Rejection reason strings surfaced to callers.
pub mod reject {
    pub const NOT_PENDING: &str = "not pending";
    pub const INSUFFICIENT_VOLUME: &str = "insufficient market volume";
    pub const INSUFFICIENT_FUNDS: &str = "insufficient funds";
    pub const NOT_ENOUGH_SHARES: &str = "not enough shares";
}

impl SettleOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, SettleOutcome::Rejected { .. })
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            SettleOutcome::Rejected { reason } => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_transitions_are_monotonic() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Executed));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Canceled));

        assert!(!OrderStatus::Executed.can_transition_to(OrderStatus::Canceled));
        assert!(!OrderStatus::Executed.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Canceled.can_transition_to(OrderStatus::Executed));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Executed.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_side_round_trip() {
        assert_eq!(OrderSide::try_from("BUY").unwrap(), OrderSide::Buy);
        assert_eq!(OrderSide::try_from("sell").unwrap(), OrderSide::Sell);
        assert!(OrderSide::try_from("SHORT").is_err());
    }

    #[test]
    fn test_notional_rounds_to_cents() {
        let order = Order {
            id: 1,
            user_id: 1,
            stock_id: 1,
            side: OrderSide::Buy,
            quantity: dec!(0.333333),
            price_locked: dec!(49.99),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            executed_at: None,
            canceled_at: None,
        };

        // 0.333333 * 49.99 = 16.66331667 -> 16.66
        assert_eq!(order.notional(), dec!(16.66));
    }

    #[test]
    fn test_outcome_reason() {
        let outcome = SettleOutcome::Rejected {
            reason: reject::NOT_PENDING,
        };
        assert!(!outcome.is_success());
        assert_eq!(outcome.reason(), Some("not pending"));
        assert!(SettleOutcome::Executed.is_success());
    }
}
