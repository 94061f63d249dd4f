use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Decimal places for monetary values
pub const MONEY_DP: u32 = 2;
/// Decimal places for share quantities
pub const QUANTITY_DP: u32 = 6;

/// Round a monetary value to 2 decimal places
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp(MONEY_DP)
}

/// Round a share quantity to 6 decimal places
pub fn round_quantity(value: Decimal) -> Decimal {
    value.round_dp(QUANTITY_DP)
}

/// A listed stock: the tradable float lives in `volume`, the market price
/// in `price`. Price moves via admin edits and the price feed; volume via
/// settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stock {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
    pub volume: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Apply one feed tick to a price: `price * (1 + noise + drift)`, rounded
/// to 2 dp and clamped to `floor`. `noise` is a uniform draw the caller
/// makes in `[-noise_bound, +noise_bound]`.
pub fn drifted_price(price: Decimal, noise: f64, drift: f64, floor: Decimal) -> Decimal {
    let factor = Decimal::from_f64(1.0 + noise + drift).unwrap_or(Decimal::ONE);
    let next = round_money(price * factor);
    if next < floor {
        floor
    } else {
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_rounding() {
        assert_eq!(round_money(dec!(499.996)), dec!(500.00));
        assert_eq!(round_money(dec!(499.994)), dec!(499.99));
    }

    #[test]
    fn test_quantity_rounding() {
        assert_eq!(round_quantity(dec!(0.1234561)), dec!(0.123456));
        assert_eq!(round_quantity(dec!(0.1234569)), dec!(0.123457));
    }

    #[test]
    fn test_drifted_price_stays_in_band() {
        let old = dec!(50.00);
        for noise in [-0.01, -0.005, 0.0, 0.005, 0.01] {
            let new = drifted_price(old, noise, 0.0005, dec!(0.01));
            assert!(new >= dec!(0.01));
            // |new/old - 1 - drift| <= noise bound, within rounding tolerance
            let rel = (new / old) - dec!(1) - dec!(0.0005);
            assert!(rel.abs() <= dec!(0.0102), "rel change {rel} out of band");
        }
    }

    #[test]
    fn test_drifted_price_floor() {
        let new = drifted_price(dec!(0.01), -0.01, 0.0005, dec!(0.01));
        assert_eq!(new, dec!(0.01));
    }

    #[test]
    fn test_drifted_price_upward_bias() {
        // zero noise leaves exactly the drift
        let new = drifted_price(dec!(100.00), 0.0, 0.0005, dec!(0.01));
        assert_eq!(new, dec!(100.05));
    }
}
