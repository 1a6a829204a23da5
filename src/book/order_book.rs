use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Order, OrderId, OrderType, Side, Trade, TradeIdGenerator};

use super::side_book::SideBook;

/// A point-in-time view of the top `N` price levels per side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: String,
    pub bids: Vec<(Decimal, u64)>,
    pub asks: Vec<(Decimal, u64)>,
    pub timestamp: SystemTime,
}

/// Top of book: best bid/ask and the spread between them, when both sides
/// are non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub bid: Option<(Decimal, u64)>,
    pub ask: Option<(Decimal, u64)>,
    pub spread: Option<Decimal>,
}

/// Returns whether an incoming order of `side`/`order_type`/`price` is
/// willing to trade against a resting level at `level_price`. Enforced
/// per-level, before any level is touched, so a non-crossing limit order
/// never walks the opposing book at all.
fn crosses(side: Side, order_type: OrderType, price: Option<Decimal>, level_price: Decimal) -> bool {
    match (side, order_type) {
        (Side::Buy, OrderType::Market) => true,
        (Side::Buy, _) => level_price <= price.expect("limit order must carry a price"),
        (Side::Sell, OrderType::Market) => true,
        (Side::Sell, _) => level_price >= price.expect("limit order must carry a price"),
    }
}

/// One symbol's book: bids, asks, and the `byId` lookup covering every
/// order the book has ever accepted.
pub struct OrderBook {
    symbol: String,
    bids: SideBook,
    asks: SideBook,
    by_id: HashMap<OrderId, Order>,
    /// `Stop`/`StopLimit` orders: accepted, recorded, never matched or
    /// walked by the algorithm.
    pending_stops: HashMap<OrderId, Order>,
    trade_ids: Arc<TradeIdGenerator>,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>, trade_ids: Arc<TradeIdGenerator>) -> Self {
        OrderBook {
            symbol: symbol.into(),
            bids: SideBook::new(Side::Buy),
            asks: SideBook::new(Side::Sell),
            by_id: HashMap::new(),
            pending_stops: HashMap::new(),
            trade_ids,
        }
    }

    pub fn total_buy_orders(&self) -> usize {
        self.bids.order_count()
    }

    pub fn total_sell_orders(&self) -> usize {
        self.asks.order_count()
    }

    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        self.by_id.get(&order_id)
    }

    /// Matches `incoming` against the book, mutating both sides, and
    /// returns the trades it produced.
    pub fn add(&mut self, mut incoming: Order) -> Vec<Trade> {
        if incoming.quantity == 0 {
            return Vec::new();
        }

        let mut trades = Vec::new();

        if incoming.order_type.is_active() {
            let opposite_side = incoming.side.opposite();
            'outer: loop {
                if incoming.remaining_quantity == 0 {
                    break;
                }
                let opposite = match opposite_side {
                    Side::Buy => &mut self.bids,
                    Side::Sell => &mut self.asks,
                };
                let Some(level_price) = opposite.best_price() else {
                    break;
                };
                if !crosses(incoming.side, incoming.order_type, incoming.price, level_price) {
                    break;
                }

                loop {
                    let Some(resting_id) = opposite.level_mut(level_price).and_then(|l| l.front())
                    else {
                        break;
                    };
                    let resting = self
                        .by_id
                        .get(&resting_id)
                        .cloned()
                        .unwrap_or_else(|| {
                            crate::errors::fatal_invariant(&format!(
                                "resting order {resting_id} missing from byId"
                            ))
                        });

                    let delta = incoming.remaining_quantity.min(resting.remaining_quantity);
                    let (buy_order_id, sell_order_id, buy_client_id, sell_client_id) =
                        match incoming.side {
                            Side::Buy => (
                                incoming.order_id,
                                resting.order_id,
                                incoming.client_id.clone(),
                                resting.client_id.clone(),
                            ),
                            Side::Sell => (
                                resting.order_id,
                                incoming.order_id,
                                resting.client_id.clone(),
                                incoming.client_id.clone(),
                            ),
                        };
                    trades.push(Trade {
                        trade_id: self.trade_ids.next(),
                        buy_order_id,
                        sell_order_id,
                        symbol: incoming.symbol.clone(),
                        price: level_price,
                        quantity: delta,
                        timestamp: SystemTime::now(),
                        buy_client_id,
                        sell_client_id,
                    });

                    incoming = incoming.fill(delta);
                    let updated_resting = resting.fill(delta);
                    let level = opposite.level_mut(level_price).unwrap_or_else(|| {
                        crate::errors::fatal_invariant("price level vanished mid-match")
                    });
                    level.reduce_quantity(delta);
                    if updated_resting.remaining_quantity == 0 {
                        level.pop_front();
                    }
                    self.by_id.insert(resting_id, updated_resting);

                    if incoming.remaining_quantity == 0 {
                        opposite.remove_level_if_empty(level_price);
                        break 'outer;
                    }
                }
                opposite.remove_level_if_empty(level_price);
            }
        }

        match incoming.order_type {
            OrderType::Limit if incoming.remaining_quantity > 0 => {
                let price = incoming
                    .price
                    .unwrap_or_else(|| crate::errors::fatal_invariant("limit order missing price"));
                match incoming.side {
                    Side::Buy => self.bids.insert(price, incoming.order_id, incoming.remaining_quantity),
                    Side::Sell => self.asks.insert(price, incoming.order_id, incoming.remaining_quantity),
                }
            }
            OrderType::Stop | OrderType::StopLimit => {
                self.pending_stops.insert(incoming.order_id, incoming.clone());
            }
            _ => {
                // LIMIT fully filled, or MARKET (any residual is discarded
                // without resting).
            }
        }

        self.by_id.insert(incoming.order_id, incoming);
        trades
    }

    /// Cancels an active, resting order. Returns `false` if the order is
    /// unknown, already terminal, or — for `Market` orders — was never a
    /// resting order to begin with.
    pub fn cancel(&mut self, order_id: OrderId) -> bool {
        let Some(order) = self.by_id.get(&order_id).cloned() else {
            return false;
        };
        if !order.is_active() {
            return false;
        }
        let removed = match order.order_type {
            OrderType::Limit => {
                let price = order
                    .price
                    .unwrap_or_else(|| crate::errors::fatal_invariant("resting limit order missing price"));
                match order.side {
                    Side::Buy => self.bids.remove(price, order_id, order.remaining_quantity),
                    Side::Sell => self.asks.remove(price, order_id, order.remaining_quantity),
                }
            }
            OrderType::Stop | OrderType::StopLimit => self.pending_stops.remove(&order_id).is_some(),
            OrderType::Market => false,
        };
        if !removed {
            return false;
        }
        self.by_id.insert(order_id, order.cancel());
        true
    }

    pub fn snapshot(&self, depth: usize) -> OrderBookSnapshot {
        OrderBookSnapshot {
            symbol: self.symbol.clone(),
            bids: self.bids.top_levels(depth),
            asks: self.asks.top_levels(depth),
            timestamp: SystemTime::now(),
        }
    }

    pub fn quote(&self) -> Quote {
        let bid = self.bids.best().map(|level| (level.price, level.total_quantity()));
        let ask = self.asks.best().map(|level| (level.price, level.total_quantity()));
        let spread = match (bid, ask) {
            (Some((bp, _)), Some((ap, _))) => Some(ap - bp),
            _ => None,
        };
        Quote {
            symbol: self.symbol.clone(),
            bid,
            ask,
            spread,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TradeIdGenerator;
    use std::time::SystemTime;

    fn book() -> OrderBook {
        OrderBook::new("AAPL", Arc::new(TradeIdGenerator::new()))
    }

    fn limit(id: u64, side: Side, price: i64, qty: u64) -> Order {
        Order::new(
            OrderId(id),
            format!("c{id}"),
            "AAPL".parse().unwrap(),
            side,
            OrderType::Limit,
            Some(Decimal::new(price, 2)),
            qty,
            format!("client-{id}"),
            SystemTime::now(),
        )
    }

    fn market(id: u64, side: Side, qty: u64) -> Order {
        Order::new(
            OrderId(id),
            format!("c{id}"),
            "AAPL".parse().unwrap(),
            side,
            OrderType::Market,
            None,
            qty,
            format!("client-{id}"),
            SystemTime::now(),
        )
    }

    /// Price-time priority: earlier resting orders at the same price fill first.
    #[test]
    fn price_time_priority() {
        let mut ob = book();
        ob.add(limit(1, Side::Sell, 15000, 100)); // SELL1
        ob.add(limit(2, Side::Sell, 15000, 100)); // SELL2
        let trades = ob.add(limit(3, Side::Buy, 15000, 100));

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].sell_order_id, OrderId(1));
        assert_eq!(trades[0].price, Decimal::new(15000, 2));
        assert_eq!(trades[0].quantity, 100);

        assert_eq!(ob.total_buy_orders(), 0);
        assert_eq!(ob.total_sell_orders(), 1);
        let snap = ob.snapshot(5);
        assert_eq!(snap.asks, vec![(Decimal::new(15000, 2), 100)]);
        assert!(snap.bids.is_empty());
    }

    /// A partial fill rests the remainder at its original price.
    #[test]
    fn partial_fill_rests_remainder() {
        let mut ob = book();
        ob.add(limit(1, Side::Sell, 15000, 100));
        let trades = ob.add(limit(2, Side::Buy, 15000, 150));

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].quantity, 100);
        let resting = ob.get(OrderId(2)).unwrap();
        assert_eq!(resting.remaining_quantity, 50);
        assert_eq!(resting.status, crate::domain::OrderStatus::PartiallyFilled);
    }

    /// A market order takes the best resting price rather than carrying one.
    #[test]
    fn market_order_takes_best_price() {
        let mut ob = book();
        ob.add(limit(1, Side::Sell, 15000, 100));
        let trades = ob.add(market(2, Side::Buy, 50));

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, Decimal::new(15000, 2));
        assert_eq!(trades[0].quantity, 50);
        assert_eq!(ob.get(OrderId(2)).unwrap().status, crate::domain::OrderStatus::Filled);
        assert_eq!(ob.get(OrderId(1)).unwrap().remaining_quantity, 50);
    }

    /// A market order against an empty book produces no trades and never rests.
    #[test]
    fn empty_book_market_order_vanishes() {
        let mut ob = book();
        let trades = ob.add(market(1, Side::Buy, 50));
        assert!(trades.is_empty());
        assert_eq!(ob.get(OrderId(1)).unwrap().status, crate::domain::OrderStatus::New);
        assert_eq!(ob.total_buy_orders(), 0);
    }

    /// Cancelling the same order twice is idempotent.
    #[test]
    fn cancel_is_idempotent() {
        let mut ob = book();
        ob.add(limit(1, Side::Buy, 15000, 100));
        assert!(ob.cancel(OrderId(1)));
        assert!(!ob.cancel(OrderId(1)));
    }

    /// Cancelling an order that has already fully filled returns `false`.
    #[test]
    fn cancel_after_fill_fails() {
        let mut ob = book();
        ob.add(limit(1, Side::Sell, 15000, 100));
        ob.add(limit(2, Side::Buy, 15000, 100));
        assert!(!ob.cancel(OrderId(2)));
        assert!(!ob.cancel(OrderId(1)));
    }

    /// A fill that fully drains the only order at a level must prune the
    /// level instead of leaving an empty entry behind.
    #[test]
    fn full_fill_prunes_the_emptied_level() {
        let mut ob = book();
        ob.add(limit(1, Side::Sell, 15000, 100));
        let trades = ob.add(limit(2, Side::Buy, 15000, 100));

        assert_eq!(trades.len(), 1);
        let quote = ob.quote();
        assert_eq!(quote.ask, None);
        assert!(ob.snapshot(5).asks.is_empty());
    }

    /// Snapshots order bids descending and asks ascending by price.
    #[test]
    fn snapshot_orders_bids_desc_and_asks_asc() {
        let mut ob = book();
        ob.add(limit(1, Side::Buy, 14900, 100));
        ob.add(limit(2, Side::Buy, 14800, 50));
        ob.add(limit(3, Side::Sell, 15100, 100));
        ob.add(limit(4, Side::Sell, 15200, 50));

        let snap = ob.snapshot(5);
        assert_eq!(snap.symbol, "AAPL");
        assert_eq!(
            snap.bids,
            vec![(Decimal::new(14900, 2), 100), (Decimal::new(14800, 2), 50)]
        );
        assert_eq!(
            snap.asks,
            vec![(Decimal::new(15100, 2), 100), (Decimal::new(15200, 2), 50)]
        );
    }

    #[test]
    fn quantity_zero_is_dropped_silently() {
        let mut ob = book();
        let trades = ob.add(limit(1, Side::Buy, 15000, 0));
        assert!(trades.is_empty());
        assert_eq!(ob.total_buy_orders(), 0);
    }

    #[test]
    fn non_crossing_limit_never_touches_opposing_book() {
        let mut ob = book();
        ob.add(limit(1, Side::Sell, 15500, 100));
        // Buy limit below the ask must not match at all.
        let trades = ob.add(limit(2, Side::Buy, 15000, 10));
        assert!(trades.is_empty());
        assert_eq!(ob.total_buy_orders(), 1);
        assert_eq!(ob.total_sell_orders(), 1);
    }

    #[test]
    fn fifo_within_a_price_level() {
        let mut ob = book();
        ob.add(limit(1, Side::Sell, 10000, 4));
        ob.add(limit(2, Side::Sell, 10000, 6));
        let trades = ob.add(market(3, Side::Buy, 9));

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].sell_order_id, OrderId(1));
        assert_eq!(trades[0].quantity, 4);
        assert_eq!(trades[1].sell_order_id, OrderId(2));
        assert_eq!(trades[1].quantity, 5);
        assert_eq!(ob.get(OrderId(2)).unwrap().remaining_quantity, 1);
    }

    #[test]
    fn cancel_restores_level_aggregate_quantity() {
        let mut ob = book();
        ob.add(limit(1, Side::Buy, 14900, 100));
        ob.add(limit(2, Side::Buy, 14900, 50));
        assert!(ob.cancel(OrderId(1)));
        let quote = ob.quote();
        assert_eq!(quote.bid, Some((Decimal::new(14900, 2), 50)));
    }

    #[test]
    fn stop_orders_rest_inactively_and_never_match() {
        let mut ob = book();
        let stop = Order::new(
            OrderId(1),
            "c1".into(),
            "AAPL".parse().unwrap(),
            Side::Buy,
            OrderType::Stop,
            Some(Decimal::new(15000, 2)),
            100,
            "client-1".into(),
            SystemTime::now(),
        );
        ob.add(stop);
        assert_eq!(ob.total_buy_orders(), 0);
        let trades = ob.add(limit(2, Side::Sell, 14000, 100));
        assert!(trades.is_empty());
        assert!(ob.cancel(OrderId(1)));
    }
}
