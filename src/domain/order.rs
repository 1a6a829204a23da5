use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::symbol::Symbol;

/// Generator for process-wide monotonic order IDs.
///
/// A fresh generator is created per [`crate::engine::MatchingEngine`]
/// instance rather than living behind a single `static`, so constructing a
/// new engine in a test gives that test its own independent ID sequence.
#[derive(Debug, Default)]
pub struct OrderIdGenerator(AtomicU64);

impl OrderIdGenerator {
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub fn next(&self) -> OrderId {
        OrderId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Only `Market` and `Limit` are executed by the matching algorithm.
/// `Stop` and `StopLimit` are accepted and recorded but rest inactive,
/// never walked by the matching loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl OrderType {
    pub fn is_active(self) -> bool {
        matches!(self, OrderType::Market | OrderType::Limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
    PendingCancel,
}

impl OrderStatus {
    pub fn is_active(self) -> bool {
        matches!(self, OrderStatus::New | OrderStatus::PartiallyFilled)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Rejected)
    }
}

/// An immutable order value. Transitions (`fill`, `cancel`, `reject`)
/// consume the current value and produce the next one; identity is
/// preserved via `order_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub client_order_id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Option<Decimal>,
    pub quantity: u64,
    pub remaining_quantity: u64,
    pub client_id: String,
    pub timestamp: SystemTime,
    pub status: OrderStatus,
}

impl Order {
    pub fn new(
        order_id: OrderId,
        client_order_id: String,
        symbol: Symbol,
        side: Side,
        order_type: OrderType,
        price: Option<Decimal>,
        quantity: u64,
        client_id: String,
        timestamp: SystemTime,
    ) -> Self {
        Order {
            order_id,
            client_order_id,
            symbol,
            side,
            order_type,
            price,
            quantity,
            remaining_quantity: quantity,
            client_id,
            timestamp,
            status: OrderStatus::New,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Apply a fill of `delta` shares. Panics (via `fatal_invariant`-style
    /// check) if `delta` exceeds the remaining quantity — that would be a
    /// matching-engine invariant violation, not recoverable order data.
    #[must_use]
    pub fn fill(mut self, delta: u64) -> Self {
        self.remaining_quantity = self
            .remaining_quantity
            .checked_sub(delta)
            .unwrap_or_else(|| {
                crate::errors::fatal_invariant(&format!(
                    "order {} fill delta {} exceeds remaining {}",
                    self.order_id, delta, self.remaining_quantity
                ))
            });
        self.status = if self.remaining_quantity == 0 {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self
    }

    #[must_use]
    pub fn cancel(mut self) -> Self {
        self.status = OrderStatus::Cancelled;
        self
    }

    #[must_use]
    pub fn reject(mut self) -> Self {
        self.status = OrderStatus::Rejected;
        self
    }

    #[must_use]
    pub fn pending_cancel(mut self) -> Self {
        self.status = OrderStatus::PendingCancel;
        self
    }
}
