use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::domain::{OrderId, Side};

use super::price_level::PriceLevel;

/// An ordered mapping from price to a FIFO queue of active orders at that
/// price. Internally always a `BTreeMap` in ascending price order; `side`
/// only determines which direction counts as "best first" when walking
/// levels for matching or snapshotting.
pub struct SideBook {
    side: Side,
    levels: BTreeMap<Decimal, PriceLevel>,
}

impl SideBook {
    pub fn new(side: Side) -> Self {
        SideBook {
            side,
            levels: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Count of active orders resting anywhere on this side.
    pub fn order_count(&self) -> usize {
        self.levels.values().map(|level| level.iter().count()).sum()
    }

    /// Insert an order at the back of its price level's queue, creating the
    /// level if necessary.
    pub fn insert(&mut self, price: Decimal, order_id: OrderId, remaining: u64) {
        self.levels
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
            .push_back(order_id, remaining);
    }

    /// Remove an order from its price level, pruning the level if it is
    /// left empty. Returns `true` if the order was found. `remaining` is
    /// the order's current remaining quantity, used to keep the level's
    /// aggregate quantity in sync.
    pub fn remove(&mut self, price: Decimal, order_id: OrderId, remaining: u64) -> bool {
        let Some(level) = self.levels.get_mut(&price) else {
            return false;
        };
        let found = level.remove(order_id, remaining);
        if level.is_empty() {
            self.levels.remove(&price);
        }
        found
    }

    /// The best (highest bid / lowest ask) non-empty price level, if any.
    pub fn best(&self) -> Option<&PriceLevel> {
        match self.side {
            Side::Buy => self.levels.values().next_back(),
            Side::Sell => self.levels.values().next(),
        }
    }

    pub fn best_price(&self) -> Option<Decimal> {
        self.best().map(|level| level.price)
    }

    /// The level at an exact price, mutably — used during matching.
    pub fn level_mut(&mut self, price: Decimal) -> Option<&mut PriceLevel> {
        self.levels.get_mut(&price)
    }

    pub fn remove_level_if_empty(&mut self, price: Decimal) {
        if self.levels.get(&price).is_some_and(PriceLevel::is_empty) {
            self.levels.remove(&price);
        }
    }

    /// Price levels in priority order: best price first, each level's own
    /// queue already in FIFO (admission) order.
    pub fn levels_in_priority_order(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        match self.side {
            Side::Buy => Box::new(self.levels.values().rev()),
            Side::Sell => Box::new(self.levels.values()),
        }
    }

    /// Top `n` levels in priority order, as `(price, aggregate_quantity)`
    /// pairs, for [`super::order_book::OrderBookSnapshot`] construction.
    pub fn top_levels(&self, n: usize) -> Vec<(Decimal, u64)> {
        self.levels_in_priority_order()
            .take(n)
            .map(|level| (level.price, level.total_quantity()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buy_side_best_is_highest_price() {
        let mut sb = SideBook::new(Side::Buy);
        sb.insert(Decimal::new(100, 0), OrderId(1), 10);
        sb.insert(Decimal::new(105, 0), OrderId(2), 10);
        sb.insert(Decimal::new(99, 0), OrderId(3), 10);
        assert_eq!(sb.best_price(), Some(Decimal::new(105, 0)));
    }

    #[test]
    fn sell_side_best_is_lowest_price() {
        let mut sb = SideBook::new(Side::Sell);
        sb.insert(Decimal::new(100, 0), OrderId(1), 10);
        sb.insert(Decimal::new(95, 0), OrderId(2), 10);
        assert_eq!(sb.best_price(), Some(Decimal::new(95, 0)));
    }

    #[test]
    fn remove_prunes_empty_level() {
        let mut sb = SideBook::new(Side::Buy);
        sb.insert(Decimal::new(100, 0), OrderId(1), 10);
        assert!(sb.remove(Decimal::new(100, 0), OrderId(1), 10));
        assert!(sb.is_empty());
        assert!(!sb.remove(Decimal::new(100, 0), OrderId(1), 10));
    }

    #[test]
    fn top_levels_orders_by_priority() {
        let mut sb = SideBook::new(Side::Buy);
        sb.insert(Decimal::new(149, 0), OrderId(1), 100);
        sb.insert(Decimal::new(148, 0), OrderId(2), 50);
        assert_eq!(
            sb.top_levels(5),
            vec![(Decimal::new(149, 0), 100), (Decimal::new(148, 0), 50)]
        );
    }
}
