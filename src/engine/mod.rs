pub mod funds;
pub mod order_engine;
pub mod position;

pub use funds::FundsLedger;
pub use order_engine::OrderEngine;
