pub mod error;
pub mod money;
pub mod period;
pub mod transaction;

pub use error::CoreError;
pub use money::{Currency, Money};
pub use period::DateRange;
pub use transaction::{NormalizedTransaction, PositionSnapshot, MAX_DESCRIPTION_CHARS};
