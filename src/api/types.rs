use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{CardBrand, OrderSide, SettleOutcome};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Accounts
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// "admin" requires the configured admin key; anything else registers
    /// a customer.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub admin_key: Option<String>,
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateStockRequest {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
    pub volume: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStockRequest {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub volume: Option<Decimal>,
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub stock_id: i64,
    pub side: OrderSide,
    pub quantity: Decimal,
}

/// Settle/cancel result: soft rejections surface as success=false with
/// the reason, not as an HTTP error.
#[derive(Debug, Serialize)]
pub struct SettleResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl From<SettleOutcome> for SettleResponse {
    fn from(outcome: SettleOutcome) -> Self {
        Self {
            success: outcome.is_success(),
            reason: outcome.reason(),
        }
    }
}

// ============================================================================
// Funds
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub payment_method_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct AddPaymentMethodRequest {
    pub brand: CardBrand,
    pub last4: String,
    pub exp_month: i16,
    pub exp_year: i16,
    pub token: String,
    #[serde(default)]
    pub make_default: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reject;

    #[test]
    fn test_settle_response_from_outcome() {
        let ok: SettleResponse = SettleOutcome::Executed.into();
        assert!(ok.success);
        assert!(ok.reason.is_none());

        let rejected: SettleResponse = SettleOutcome::Rejected {
            reason: reject::NOT_PENDING,
        }
        .into();
        assert!(!rejected.success);
        assert_eq!(rejected.reason, Some("not pending"));
    }

    #[test]
    fn test_place_order_request_parses_side() {
        let req: PlaceOrderRequest =
            serde_json::from_str(r#"{"stock_id": 3, "side": "BUY", "quantity": "10"}"#).unwrap();
        assert_eq!(req.side, OrderSide::Buy);
    }
}
