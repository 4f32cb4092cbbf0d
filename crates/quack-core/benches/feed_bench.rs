//! # Feed Benchmarks
//!
//! Performance benchmarks for feed composition and engagement.
//!
//! Run with: `cargo bench -p quack-core`

use chrono::{Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use quack_core::{
    ContentStore, FeedComposer, FollowGraph, IdentityStore, MemoryStore, Role, Timestamp, Username,
};
use std::hint::black_box;

fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// A viewer following `followees` users who each uploaded `posts_each` posts.
fn create_network(followees: usize, posts_each: usize) -> MemoryStore {
    let mut store = MemoryStore::new();
    IdentityStore::register(&mut store, "viewer", "", "pw", Role::Regular).expect("register");
    let viewer = Username::new("viewer");

    for i in 0..followees {
        let name = format!("user{}", i);
        IdentityStore::register(&mut store, &name, "", "pw", Role::Regular).expect("register");
        let owner = Username::new(name);
        FollowGraph::follow(&mut store, &viewer, &owner).expect("follow");
        for j in 0..posts_each {
            let at = t0() + Duration::minutes((i * posts_each + j) as i64);
            ContentStore::create_post(&mut store, &owner, "p.png", "", at).expect("post");
        }
    }

    store
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_compose_feed(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose_feed");
    let viewer = Username::new("viewer");

    for followees in [10, 100, 500].iter() {
        let store = create_network(*followees, 5);
        group.bench_with_input(
            BenchmarkId::from_parameter(followees),
            followees,
            |b, _| b.iter(|| black_box(FeedComposer::compose_feed(&store, &viewer))),
        );
    }

    group.finish();
}

fn bench_toggle_like(c: &mut Criterion) {
    let mut store = create_network(1, 1);
    let post = ContentStore::all_posts(&store)
        .expect("posts")
        .into_iter()
        .next()
        .expect("one post");
    let viewer = Username::new("viewer");

    c.bench_function("toggle_like", |b| {
        b.iter(|| black_box(ContentStore::toggle_like(&mut store, &post.id, &viewer)))
    });
}

criterion_group!(benches, bench_compose_feed, bench_toggle_like);
criterion_main!(benches);
