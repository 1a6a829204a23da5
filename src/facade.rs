use std::sync::Arc;
use std::time::SystemTime;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::book::{OrderBookSnapshot, Quote};
use crate::domain::{OrderId, OrderStatus, Side, Symbol, Trade};
use crate::engine::{EngineStats, MatchingEngine, SubmitRequest};
use crate::market_data::{MarketDataEvent, MarketDataPublisher, SubscriberId};

/// One execution report per submit call, covering the incoming order's
/// final post-match state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub order_id: OrderId,
    pub client_order_id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub total_qty: u64,
    pub remaining_qty: u64,
    pub filled_qty: u64,
    pub average_price: Decimal,
    pub exec_type: char,
    pub order_status: char,
    pub transact_time: SystemTime,
}

/// `(execType, orderStatus)` for each status.
fn status_codes(status: OrderStatus) -> (char, char) {
    match status {
        OrderStatus::New => ('0', '0'),
        OrderStatus::PartiallyFilled => ('1', '1'),
        OrderStatus::Filled => ('2', '2'),
        OrderStatus::Cancelled => ('4', '4'),
        OrderStatus::PendingCancel => ('6', '6'),
        OrderStatus::Rejected => ('8', '8'),
    }
}

/// `Σ(p·q)/Σq` over `trades`, or zero if the list is empty.
fn average_price(trades: &[Trade]) -> Decimal {
    let total_qty: u64 = trades.iter().map(|t| t.quantity).sum();
    if total_qty == 0 {
        return Decimal::ZERO;
    }
    let notional: Decimal = trades
        .iter()
        .map(|t| t.price * Decimal::from(t.quantity))
        .sum();
    notional / Decimal::from(total_qty)
}

/// The engine's single external-facing entry point: wires order-entry and
/// cancellation into the [`MatchingEngine`], publishes resulting trades to
/// the [`MarketDataPublisher`], and shapes the execution-report boundary.
#[derive(Clone)]
pub struct Exchange {
    engine: Arc<MatchingEngine>,
    market_data: Arc<MarketDataPublisher>,
}

impl Exchange {
    pub fn new(engine: Arc<MatchingEngine>, market_data: Arc<MarketDataPublisher>) -> Self {
        Exchange { engine, market_data }
    }

    pub fn submit_order(&self, req: SubmitRequest) -> ExecutionReport {
        let result = self.engine.submit(req);
        for trade in &result.trades {
            self.market_data.publish_trade(trade);
        }
        let (exec_type, order_status) = status_codes(result.order.status);
        ExecutionReport {
            order_id: result.order.order_id,
            client_order_id: result.order.client_order_id,
            symbol: result.order.symbol,
            side: result.order.side,
            total_qty: result.order.quantity,
            remaining_qty: result.order.remaining_quantity,
            filled_qty: result.order.quantity - result.order.remaining_quantity,
            average_price: average_price(&result.trades),
            exec_type,
            order_status,
            transact_time: SystemTime::now(),
        }
    }

    pub fn cancel_order(&self, symbol: &Symbol, order_id: OrderId) -> bool {
        self.engine.cancel(symbol, order_id)
    }

    pub fn snapshot(&self, symbol: &Symbol, depth: usize) -> Option<OrderBookSnapshot> {
        self.engine.snapshot(symbol, depth)
    }

    pub fn quote(&self, symbol: &Symbol) -> Option<Quote> {
        self.engine.quote(symbol)
    }

    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    pub fn subscribe_market_data(&self, symbol: Symbol) -> (SubscriberId, mpsc::Receiver<MarketDataEvent>) {
        self.market_data.subscribe(symbol)
    }

    pub fn unsubscribe_market_data(&self, id: SubscriberId) {
        self.market_data.unsubscribe(id)
    }
}
