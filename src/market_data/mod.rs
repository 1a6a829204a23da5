//! Market-data publication: periodic snapshot/quote ticks plus immediate
//! trade events, fanned out to per-subscriber channels.

pub mod events;
pub mod publisher;

pub use events::{MarketDataEvent, OrderBookData, PriceLevelView, QuoteData, TradeData};
pub use publisher::{MarketDataPublisher, SubscriberId, SubscriberState};
