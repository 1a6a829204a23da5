use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use rust_decimal::Decimal;

use crate::book::{OrderBook, OrderBookSnapshot, Quote};
use crate::domain::{Order, OrderId, OrderIdGenerator, OrderType, Side, Symbol, Trade, TradeIdGenerator};

/// Request fields for the order-entry boundary.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub client_order_id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Option<Decimal>,
    pub quantity: u64,
    pub client_id: String,
}

/// `(order, trades, error)` returned by `submit`. Validation failures are
/// data here, not `Err`: `order.status` is `Rejected` and `error` carries
/// the human-readable reason.
#[derive(Debug, Clone)]
pub struct OrderResult {
    pub order: Order,
    pub trades: Vec<Trade>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub total_orders: u64,
    pub total_trades: u64,
    pub total_buy_orders: usize,
    pub total_sell_orders: usize,
    pub active_symbols: usize,
}

/// First validation failure for `req`, checked in priority order, or
/// `None` if the request is admissible.
fn first_validation_failure(req: &SubmitRequest) -> Option<String> {
    if req.quantity == 0 {
        return Some("quantity must be > 0".to_string());
    }
    if matches!(req.order_type, OrderType::Limit | OrderType::StopLimit) {
        match req.price {
            Some(p) if p > Decimal::ZERO => {}
            _ => return Some("price must be > 0 for limit orders".to_string()),
        }
    }
    if req.client_order_id.trim().is_empty() {
        return Some("clientOrderId must not be empty".to_string());
    }
    if req.client_id.trim().is_empty() {
        return Some("clientId must not be empty".to_string());
    }
    None
}

/// Multi-symbol registry that validates, routes, and tallies order flow.
/// The `symbol -> Mutex<OrderBook>` map is built once at construction
/// from the configured symbol universe and never mutated afterward, so
/// lookups need no lock of their own.
pub struct MatchingEngine {
    books: HashMap<Symbol, Mutex<OrderBook>>,
    order_ids: Arc<OrderIdGenerator>,
    total_orders: AtomicU64,
    total_trades: AtomicU64,
}

impl MatchingEngine {
    pub fn new(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        let trade_ids = Arc::new(TradeIdGenerator::new());
        let books = symbols
            .into_iter()
            .map(|symbol| {
                let book = Mutex::new(OrderBook::new(symbol.to_string(), Arc::clone(&trade_ids)));
                (symbol, book)
            })
            .collect();
        MatchingEngine {
            books,
            order_ids: Arc::new(OrderIdGenerator::new()),
            total_orders: AtomicU64::new(0),
            total_trades: AtomicU64::new(0),
        }
    }

    fn reject(&self, req: SubmitRequest, reason: &str) -> OrderResult {
        let order = Order::new(
            self.order_ids.next(),
            req.client_order_id,
            req.symbol,
            req.side,
            req.order_type,
            req.price,
            req.quantity,
            req.client_id,
            SystemTime::now(),
        )
        .reject();
        self.total_orders.fetch_add(1, Ordering::Relaxed);
        OrderResult {
            order,
            trades: Vec::new(),
            error: Some(reason.to_string()),
        }
    }

    /// Validates, routes to the symbol's book, and reports the outcome.
    /// Never returns `Err`: validation failures come back as a `Rejected`
    /// order plus a reason, not an exception.
    pub fn submit(&self, req: SubmitRequest) -> OrderResult {
        let Some(book_mutex) = self.books.get(&req.symbol) else {
            return self.reject(req, "Unknown symbol");
        };
        if let Some(reason) = first_validation_failure(&req) {
            return self.reject(req, &reason);
        }

        let order = Order::new(
            self.order_ids.next(),
            req.client_order_id,
            req.symbol,
            req.side,
            req.order_type,
            req.price,
            req.quantity,
            req.client_id,
            SystemTime::now(),
        );
        let order_id = order.order_id;
        let fallback = order.clone();

        let trades = {
            let mut book = book_mutex.lock().unwrap_or_else(|e| e.into_inner());
            book.add(order)
        };
        let updated_order = {
            let book = book_mutex.lock().unwrap_or_else(|e| e.into_inner());
            book.get(order_id).cloned().unwrap_or(fallback)
        };

        self.total_orders.fetch_add(1, Ordering::Relaxed);
        self.total_trades.fetch_add(trades.len() as u64, Ordering::Relaxed);

        OrderResult {
            order: updated_order,
            trades,
            error: None,
        }
    }

    /// `false` on unknown symbol, unknown order, or an order that is no
    /// longer active.
    pub fn cancel(&self, symbol: &Symbol, order_id: OrderId) -> bool {
        let Some(book_mutex) = self.books.get(symbol) else {
            return false;
        };
        let mut book = book_mutex.lock().unwrap_or_else(|e| e.into_inner());
        book.cancel(order_id)
    }

    pub fn snapshot(&self, symbol: &Symbol, depth: usize) -> Option<OrderBookSnapshot> {
        let book = self.books.get(symbol)?.lock().unwrap_or_else(|e| e.into_inner());
        Some(book.snapshot(depth))
    }

    pub fn quote(&self, symbol: &Symbol) -> Option<Quote> {
        let book = self.books.get(symbol)?.lock().unwrap_or_else(|e| e.into_inner());
        Some(book.quote())
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.books.keys()
    }

    pub fn stats(&self) -> EngineStats {
        let (mut total_buy_orders, mut total_sell_orders) = (0, 0);
        for book_mutex in self.books.values() {
            let book = book_mutex.lock().unwrap_or_else(|e| e.into_inner());
            total_buy_orders += book.total_buy_orders();
            total_sell_orders += book.total_sell_orders();
        }
        EngineStats {
            total_orders: self.total_orders.load(Ordering::Relaxed),
            total_trades: self.total_trades.load(Ordering::Relaxed),
            total_buy_orders,
            total_sell_orders,
            active_symbols: self.books.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> MatchingEngine {
        MatchingEngine::new(["AAPL".parse().unwrap()])
    }

    fn req(
        client_order_id: &str,
        symbol: &str,
        side: Side,
        order_type: OrderType,
        price: Option<Decimal>,
        quantity: u64,
    ) -> SubmitRequest {
        SubmitRequest {
            client_order_id: client_order_id.to_string(),
            symbol: symbol.parse().unwrap(),
            side,
            order_type,
            price,
            quantity,
            client_id: "client-1".to_string(),
        }
    }

    #[test]
    fn unknown_symbol_is_rejected() {
        let engine = engine();
        let result = engine.submit(req("c1", "ZZZZ", Side::Buy, OrderType::Market, None, 1));
        assert_eq!(result.order.status, crate::domain::OrderStatus::Rejected);
        assert_eq!(result.error.as_deref(), Some("Unknown symbol"));
    }

    #[test]
    fn zero_quantity_is_rejected_before_reaching_the_book() {
        let engine = engine();
        let result = engine.submit(req("c1", "AAPL", Side::Buy, OrderType::Limit, Some(Decimal::ONE), 0));
        assert_eq!(result.error.as_deref(), Some("quantity must be > 0"));
        assert_eq!(engine.stats().total_buy_orders, 0);
    }

    #[test]
    fn nonpositive_limit_price_is_rejected() {
        let engine = engine();
        let result = engine.submit(req("c1", "AAPL", Side::Buy, OrderType::Limit, Some(Decimal::ZERO), 10));
        assert_eq!(result.error.as_deref(), Some("price must be > 0 for limit orders"));
    }

    #[test]
    fn empty_client_order_id_is_rejected() {
        let engine = engine();
        let result = engine.submit(req("", "AAPL", Side::Buy, OrderType::Limit, Some(Decimal::ONE), 10));
        assert_eq!(result.error.as_deref(), Some("clientOrderId must not be empty"));
    }

    #[test]
    fn submit_routes_to_book_and_updates_stats() {
        let engine = engine();
        let result = engine.submit(req(
            "c1",
            "AAPL",
            Side::Buy,
            OrderType::Limit,
            Some(Decimal::new(15000, 2)),
            100,
        ));
        assert!(result.error.is_none());
        assert!(result.trades.is_empty());
        let stats = engine.stats();
        assert_eq!(stats.total_orders, 1);
        assert_eq!(stats.total_buy_orders, 1);
        assert_eq!(stats.active_symbols, 1);
    }

    #[test]
    fn cancel_roundtrip() {
        let engine = engine();
        let result = engine.submit(req(
            "c1",
            "AAPL",
            Side::Buy,
            OrderType::Limit,
            Some(Decimal::new(15000, 2)),
            100,
        ));
        let symbol: Symbol = "AAPL".parse().unwrap();
        assert!(engine.cancel(&symbol, result.order.order_id));
        assert!(!engine.cancel(&symbol, result.order.order_id));
    }

    #[test]
    fn cancel_on_unknown_symbol_is_false() {
        let engine = engine();
        assert!(!engine.cancel(&"ZZZZ".parse().unwrap(), OrderId(1)));
    }

    #[test]
    fn order_and_trade_ids_are_globally_monotonic_across_symbols() {
        let engine = MatchingEngine::new(["AAPL".parse().unwrap(), "MSFT".parse().unwrap()]);
        let a = engine.submit(req("a", "AAPL", Side::Buy, OrderType::Market, None, 1));
        let b = engine.submit(req("b", "MSFT", Side::Buy, OrderType::Market, None, 1));
        assert!(b.order.order_id.0 > a.order.order_id.0);
    }
}
