use std::time::SystemTime;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::book::{OrderBookSnapshot, Quote};
use crate::domain::{OrderId, Symbol, Trade, TradeId};

/// One level of a market-data order-book payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceLevelView {
    pub price: Decimal,
    pub quantity: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBookData {
    pub symbol: Symbol,
    pub bids: Vec<PriceLevelView>,
    pub asks: Vec<PriceLevelView>,
    pub timestamp: SystemTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteData {
    pub symbol: Symbol,
    pub bid_price: Option<Decimal>,
    pub bid_quantity: Option<u64>,
    pub ask_price: Option<Decimal>,
    pub ask_quantity: Option<u64>,
    pub spread: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeData {
    pub trade_id: TradeId,
    pub symbol: Symbol,
    pub price: Decimal,
    pub quantity: u64,
    pub timestamp: SystemTime,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
}

/// The market-data wire envelope: `{type, symbol, timestamp, data}`.
/// `type` is one of `ORDER_BOOK`/`QUOTE`/`TRADE`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketDataEvent {
    OrderBook {
        symbol: Symbol,
        timestamp: SystemTime,
        data: OrderBookData,
    },
    Quote {
        symbol: Symbol,
        timestamp: SystemTime,
        data: QuoteData,
    },
    Trade {
        symbol: Symbol,
        timestamp: SystemTime,
        data: TradeData,
    },
}

impl MarketDataEvent {
    pub fn symbol(&self) -> &Symbol {
        match self {
            MarketDataEvent::OrderBook { symbol, .. }
            | MarketDataEvent::Quote { symbol, .. }
            | MarketDataEvent::Trade { symbol, .. } => symbol,
        }
    }

    pub fn from_snapshot(symbol: Symbol, snapshot: &OrderBookSnapshot) -> Self {
        let to_levels = |levels: &[(Decimal, u64)]| {
            levels
                .iter()
                .map(|(price, quantity)| PriceLevelView {
                    price: *price,
                    quantity: *quantity,
                })
                .collect::<Vec<_>>()
        };
        MarketDataEvent::OrderBook {
            symbol: symbol.clone(),
            timestamp: snapshot.timestamp,
            data: OrderBookData {
                symbol,
                bids: to_levels(&snapshot.bids),
                asks: to_levels(&snapshot.asks),
                timestamp: snapshot.timestamp,
            },
        }
    }

    pub fn from_quote(symbol: Symbol, quote: &Quote) -> Self {
        let timestamp = SystemTime::now();
        MarketDataEvent::Quote {
            symbol: symbol.clone(),
            timestamp,
            data: QuoteData {
                symbol,
                bid_price: quote.bid.map(|(p, _)| p),
                bid_quantity: quote.bid.map(|(_, q)| q),
                ask_price: quote.ask.map(|(p, _)| p),
                ask_quantity: quote.ask.map(|(_, q)| q),
                spread: quote.spread,
            },
        }
    }

    pub fn from_trade(trade: &Trade) -> Self {
        MarketDataEvent::Trade {
            symbol: trade.symbol.clone(),
            timestamp: trade.timestamp,
            data: TradeData {
                trade_id: trade.trade_id,
                symbol: trade.symbol.clone(),
                price: trade.price,
                quantity: trade.quantity,
                timestamp: trade.timestamp,
                buy_order_id: trade.buy_order_id,
                sell_order_id: trade.sell_order_id,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_book_event_serializes_with_screaming_snake_tag() {
        let symbol: Symbol = "AAPL".parse().unwrap();
        let snapshot = OrderBookSnapshot {
            symbol: symbol.to_string(),
            bids: vec![(Decimal::new(15000, 2), 100)],
            asks: vec![],
            timestamp: SystemTime::now(),
        };
        let event = MarketDataEvent::from_snapshot(symbol, &snapshot);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ORDER_BOOK");
        assert_eq!(json["data"]["bids"][0]["quantity"], 100);
    }

    #[test]
    fn quote_event_uses_camel_case_fields() {
        let symbol: Symbol = "AAPL".parse().unwrap();
        let quote = Quote {
            symbol: symbol.to_string(),
            bid: Some((Decimal::new(14900, 2), 10)),
            ask: None,
            spread: None,
        };
        let event = MarketDataEvent::from_quote(symbol, &quote);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "QUOTE");
        assert!(json["data"]["bidPrice"].is_string() || json["data"]["bidPrice"].is_number());
        assert!(json["data"]["askPrice"].is_null());
    }
}
