use std::sync::Arc;
use std::time::SystemTime;

use criterion::{Criterion, criterion_group, criterion_main};
use rust_decimal::Decimal;

use matching_engine::book::OrderBook;
use matching_engine::domain::{Order, OrderId, OrderType, Side, TradeIdGenerator};

fn limit(id: u64, side: Side, price: i64, qty: u64) -> Order {
    Order::new(
        OrderId(id),
        format!("c{id}"),
        "AAPL".parse().unwrap(),
        side,
        OrderType::Limit,
        Some(Decimal::new(price, 0)),
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

fn setup_order_book(depth: u64, orders_per_level: u64) -> OrderBook {
    let mut ob = OrderBook::new("AAPL", Arc::new(TradeIdGenerator::new()));
    let mut id = 1;
    for price in 1..=depth {
        for _ in 0..orders_per_level {
            ob.add(limit(id, Side::Sell, price as i64, 1));
            id += 1;
            ob.add(limit(id, Side::Buy, price as i64, 1));
            id += 1;
        }
    }
    ob
}

fn bench_match_order(c: &mut Criterion) {
    let depth = 100;
    let orders_per_level = 10;

    c.bench_function("match 1 market order", |b| {
        b.iter_batched(
            || setup_order_book(depth, orders_per_level),
            |mut ob| {
                ob.add(market(1_000_000, Side::Buy, depth * orders_per_level / 2));
            },
            criterion::BatchSize::LargeInput,
        )
    });

    c.bench_function("match 1 limit crossing order", |b| {
        b.iter_batched(
            || setup_order_book(depth, orders_per_level),
            |mut ob| {
                ob.add(limit(
                    1_000_001,
                    Side::Sell,
                    (depth / 2) as i64,
                    depth * orders_per_level,
                ));
            },
            criterion::BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_match_order);
criterion_main!(benches);
