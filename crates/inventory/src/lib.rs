//! `bookmart-inventory` — append-only stock ledger.

pub mod stock_log;

pub use stock_log::{StockChangeType, StockLog, StockOperator};
