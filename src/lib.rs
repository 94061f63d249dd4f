pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod services;

pub use adapters::PostgresStore;
pub use api::{create_router, AppState};
pub use config::AppConfig;
pub use domain::{
    CardBrand, Holding, Order, OrderSide, OrderStatus, PaymentMethod, Role, SettleOutcome, Stock,
    Transaction, TransactionKind, User,
};
pub use engine::{FundsLedger, OrderEngine};
pub use error::{BourseError, Result};
pub use services::PriceFeed;
