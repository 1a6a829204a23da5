//! The per-symbol price ladder and matching algorithm.

pub mod order_book;
pub mod price_level;
pub mod side_book;

pub use order_book::{OrderBook, OrderBookSnapshot, Quote};
pub use price_level::PriceLevel;
pub use side_book::SideBook;
