use thiserror::Error;

/// Main error type for the brokerage core
#[derive(Error, Debug)]
pub enum BourseError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Lookup errors
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    // Order placement errors
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Order {0} is not pending")]
    OrderNotPending(i64),

    // Settlement rejections
    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds {
        needed: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    #[error("Insufficient market volume: need {needed}, available {available}")]
    InsufficientVolume {
        needed: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    #[error("Not enough shares: need {needed}, held {held}")]
    InsufficientShares {
        needed: rust_decimal::Decimal,
        held: rust_decimal::Decimal,
    },

    // Funds ledger errors
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("No payment method on file")]
    NoPaymentMethod,

    // Catalog errors
    #[error("Stock symbol already exists: {0}")]
    DuplicateSymbol(String),

    #[error("Stock {0} is referenced by holdings or orders")]
    StockInUse(i64),

    // Access control
    #[error("Operation requires {required} role")]
    Forbidden { required: &'static str },

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for BourseError
pub type Result<T> = std::result::Result<T, BourseError>;

impl BourseError {
    /// True for failures that reject a request before any mutation,
    /// as opposed to infrastructure faults.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            BourseError::NotFound { .. }
                | BourseError::InvalidQuantity(_)
                | BourseError::OrderNotPending(_)
                | BourseError::InsufficientFunds { .. }
                | BourseError::InsufficientVolume { .. }
                | BourseError::InsufficientShares { .. }
                | BourseError::InvalidAmount(_)
                | BourseError::NoPaymentMethod
                | BourseError::DuplicateSymbol(_)
                | BourseError::StockInUse(_)
                | BourseError::Forbidden { .. }
                | BourseError::Validation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rejections_are_flagged() {
        let err = BourseError::InsufficientFunds {
            needed: dec!(500.00),
            available: dec!(100.00),
        };
        assert!(err.is_rejection());

        let err = BourseError::Internal("pool exhausted".to_string());
        assert!(!err.is_rejection());
    }

    #[test]
    fn test_not_found_message() {
        let err = BourseError::NotFound {
            entity: "order",
            id: 42,
        };
        assert_eq!(err.to_string(), "order 42 not found");
    }
}
