pub mod market;
pub mod order;
pub mod transaction;
pub mod user;

pub use market::*;
pub use order::*;
pub use transaction::*;
pub use user::*;
