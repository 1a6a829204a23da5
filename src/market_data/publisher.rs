use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::{Symbol, Trade};
use crate::engine::MatchingEngine;

use super::events::MarketDataEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

/// A subscriber's connection lifecycle. `Connecting` until its first
/// successful send, `Closed` once its receiver is dropped, at which point
/// the next broadcast sweep prunes it from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    Connecting,
    Active,
    Closed,
}

struct Subscriber {
    symbol: Symbol,
    sender: mpsc::Sender<MarketDataEvent>,
    state: SubscriberState,
}

const CHANNEL_CAPACITY: usize = 64;

/// Publishes per-symbol order-book/quote ticks on a fixed interval and
/// trade events immediately at execution time, to subscribers registered
/// in a lock-free [`DashMap`]. A subscriber with a full channel is
/// skipped for that tick rather than blocking the publisher.
pub struct MarketDataPublisher {
    engine: Arc<MatchingEngine>,
    subscribers: DashMap<SubscriberId, Subscriber>,
    next_id: AtomicU64,
    depth: usize,
    interval: Duration,
}

impl MarketDataPublisher {
    pub fn new(engine: Arc<MatchingEngine>, depth: usize, interval: Duration) -> Self {
        MarketDataPublisher {
            engine,
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(1),
            depth,
            interval,
        }
    }

    /// Registers a new subscriber for `symbol` and returns its receiver.
    pub fn subscribe(&self, symbol: Symbol) -> (SubscriberId, mpsc::Receiver<MarketDataEvent>) {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        self.subscribers.insert(
            id,
            Subscriber {
                symbol,
                sender,
                state: SubscriberState::Connecting,
            },
        );
        (id, receiver)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.remove(&id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Spawns the periodic tick loop; runs until `shutdown` is cancelled.
    pub fn spawn_ticker(self: Arc<Self>, shutdown: CancellationToken) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.publish_tick(),
                    _ = shutdown.cancelled() => break,
                }
            }
        });
    }

    fn publish_tick(&self) {
        for symbol in self.engine.symbols() {
            let Some(snapshot) = self.engine.snapshot(symbol, self.depth) else {
                continue;
            };
            let Some(quote) = self.engine.quote(symbol) else {
                continue;
            };
            self.broadcast(symbol, MarketDataEvent::from_snapshot(symbol.clone(), &snapshot));
            self.broadcast(symbol, MarketDataEvent::from_quote(symbol.clone(), &quote));
        }
    }

    /// Publishes a trade immediately, outside the periodic tick — trade
    /// events are not batched into the next snapshot.
    pub fn publish_trade(&self, trade: &Trade) {
        self.broadcast(&trade.symbol, MarketDataEvent::from_trade(trade));
    }

    fn broadcast(&self, symbol: &Symbol, event: MarketDataEvent) {
        self.subscribers.retain(|_, sub| {
            if &sub.symbol != symbol || sub.state == SubscriberState::Closed {
                return sub.state != SubscriberState::Closed;
            }
            match sub.sender.try_send(event.clone()) {
                Ok(()) => {
                    sub.state = SubscriberState::Active;
                    true
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(%symbol, "market data subscriber lagging, dropping this update");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    sub.state = SubscriberState::Closed;
                    false
                }
            }
        });
    }
}
