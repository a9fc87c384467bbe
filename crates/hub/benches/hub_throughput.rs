//! Benchmarks for the broadcast hub
//!
//! Run with: cargo bench --package hub
//!
//! Measures publish cost with no subscribers and with several attached
//! subscribers, plus the cost of attaching to a full backlog.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hub::{BroadcastHub, HubConfig, ReplayMode};

fn bounded_hub(capacity: usize) -> BroadcastHub<u64> {
    BroadcastHub::new(
        HubConfig::default()
            .with_replay(ReplayMode::all(capacity))
            .with_live_capacity(1024),
    )
}

fn bench_publish_no_subscribers(c: &mut Criterion) {
    let hub = bounded_hub(256);
    let mut i = 0u64;

    c.bench_function("publish_no_subscribers", |b| {
        b.iter(|| {
            i += 1;
            black_box(hub.publish(black_box(i)).unwrap())
        })
    });
}

fn bench_publish_with_subscribers(c: &mut Criterion) {
    let hub = bounded_hub(256);
    let mut subscriptions: Vec<_> = (0..8).map(|_| hub.subscribe()).collect();
    let mut i = 0u64;

    c.bench_function("publish_8_subscribers", |b| {
        b.iter(|| {
            i += 1;
            hub.publish(black_box(i)).unwrap();
            for subscription in subscriptions.iter_mut() {
                black_box(subscription.try_recv());
            }
        })
    });
}

fn bench_subscribe_full_backlog(c: &mut Criterion) {
    let hub = bounded_hub(256);
    for i in 0..256 {
        hub.publish(i).unwrap();
    }

    c.bench_function("subscribe_full_backlog", |b| {
        b.iter(|| black_box(hub.subscribe()))
    });
}

criterion_group!(
    benches,
    bench_publish_no_subscribers,
    bench_publish_with_subscribers,
    bench_subscribe_full_backlog
);
criterion_main!(benches);
