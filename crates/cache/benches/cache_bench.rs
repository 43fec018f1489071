use cache::OrderCache;
use common::{Item, Order, OrderUid};
use criterion::{Criterion, criterion_group, criterion_main};

fn make_order(uid: &str) -> Order {
    Order {
        order_uid: OrderUid::new(uid),
        track_number: "WBILMTESTTRACK".to_string(),
        items: (0..3)
            .map(|i| Item {
                chrt_id: i,
                name: format!("Item {i}"),
                price: 1000,
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

/// Populate a cache with N orders keyed `order-0` .. `order-{N-1}`.
async fn populate_cache(cache: &OrderCache, n: usize) {
    cache
        .load_all((0..n).map(|i| make_order(&format!("order-{i}"))))
        .await;
}

fn bench_get_hit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cache = OrderCache::new();
    rt.block_on(populate_cache(&cache, 10_000));
    let uid = OrderUid::new("order-5000");

    c.bench_function("cache/get_hit_10k_entries", |b| {
        b.iter(|| rt.block_on(cache.get(&uid)));
    });
}

fn bench_get_miss(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cache = OrderCache::new();
    rt.block_on(populate_cache(&cache, 10_000));
    let uid = OrderUid::new("absent");

    c.bench_function("cache/get_miss_10k_entries", |b| {
        b.iter(|| rt.block_on(cache.get(&uid)));
    });
}

fn bench_set(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cache = OrderCache::new();
    let order = make_order("order-set");

    c.bench_function("cache/set_overwrite", |b| {
        b.iter(|| rt.block_on(cache.set(order.order_uid.clone(), order.clone())));
    });
}

fn bench_load_all(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("cache/load_all_1000_orders", |b| {
        b.iter(|| {
            rt.block_on(async {
                let cache = OrderCache::new();
                populate_cache(&cache, 1000).await;
            });
        });
    });
}

criterion_group!(
    benches,
    bench_get_hit,
    bench_get_miss,
    bench_set,
    bench_load_all
);
criterion_main!(benches);
