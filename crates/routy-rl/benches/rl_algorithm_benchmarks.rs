//! Sequencing Agent Benchmarks
//!
//! Benchmarks for the hot paths of route sequencing and training:
//! - Value network forward pass and training step
//! - Heuristic and learned route construction
//! - Environment stepping
//! - Full training calls
//!
//! ## Hot Paths Identified
//! 1. SequencingAgent::predict() - Called for every route optimization request
//! 2. ValueNetwork::train_step() - Called once per environment step while training
//! 3. learned_route() - O(k²) traffic refresh plus one Dijkstra per leg
//!
//! ## Performance Targets
//! - Heuristic route: < 10µs for 50 orders
//! - Training step: < 50µs for a 4 -> 32 -> 32 -> 8 network

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use routy_core::network::DEFAULT_LOCATIONS;
use routy_core::{NoCongestion, Order, RoadNetwork};
use routy_rl::agent::{heuristic_route, learned_route};
use routy_rl::environment::{AssignAction, DEFAULT_VEHICLE_ID};
use routy_rl::{AgentConfig, Environment, SequencingAgent, TourEnvironment, ValueNetwork};

// ============================================================================
// Test Data Generators
// ============================================================================

fn generate_orders(count: usize) -> Vec<Order> {
    (0..count)
        .map(|i| {
            let from = DEFAULT_LOCATIONS[i % DEFAULT_LOCATIONS.len()];
            let to = DEFAULT_LOCATIONS[(i * 7 + 3) % DEFAULT_LOCATIONS.len()];
            Order::new(i as i64, from, to).with_priority((i % 10) as u8 + 1)
        })
        .collect()
}

fn seeded_network(outputs: usize) -> ValueNetwork {
    let mut rng = StdRng::seed_from_u64(42);
    ValueNetwork::new(4, 32, outputs, &mut rng)
}

// ============================================================================
// Value Network Benchmarks
// ============================================================================

fn bench_value_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("value/forward_by_outputs");
    for outputs in [2, 8, 32, 128] {
        let net = seeded_network(outputs);
        let input = [3.0, 5.0, 2.0, 1.5];
        group.bench_with_input(BenchmarkId::from_parameter(outputs), &net, |b, net| {
            b.iter(|| net.forward(black_box(&input)))
        });
    }
    group.finish();
}

fn bench_value_train_step(c: &mut Criterion) {
    let mut net = seeded_network(8);
    let input = [3.0, 5.0, 2.0, 1.5];
    let target = [0.5, 1.0, -1.0, 0.0, 0.2, 0.3, 0.1, 0.9];

    c.bench_function("value/train_step", |b| {
        b.iter(|| net.train_step(black_box(&input), black_box(&target), 0.01))
    });
}

// ============================================================================
// Route Construction Benchmarks
// ============================================================================

fn bench_heuristic_route(c: &mut Criterion) {
    let mut group = c.benchmark_group("route/heuristic");
    for count in [5, 20, 50, 200] {
        let orders = generate_orders(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &orders, |b, orders| {
            b.iter(|| heuristic_route(black_box(orders)))
        });
    }
    group.finish();
}

fn bench_learned_route(c: &mut Criterion) {
    let mut group = c.benchmark_group("route/learned");
    for count in [5, 20, 50] {
        let orders = generate_orders(count);
        let mut net = RoadNetwork::with_default_network();
        group.bench_with_input(BenchmarkId::from_parameter(count), &orders, |b, orders| {
            b.iter(|| learned_route(&mut net, &NoCongestion, black_box(orders)))
        });
    }
    group.finish();
}

// ============================================================================
// Environment and Training Benchmarks
// ============================================================================

fn bench_environment_step(c: &mut Criterion) {
    let mut env = TourEnvironment::new(generate_orders(20));
    let action = AssignAction::new(3, DEFAULT_VEHICLE_ID);

    c.bench_function("environment/step", |b| {
        b.iter(|| {
            env.reset();
            env.step(black_box(&action))
        })
    });
}

fn bench_training_call(c: &mut Criterion) {
    let mut group = c.benchmark_group("agent/train_episodes");
    group.sample_size(10);
    for episodes in [1, 10] {
        group.bench_with_input(
            BenchmarkId::from_parameter(episodes),
            &episodes,
            |b, &episodes| {
                b.iter(|| {
                    let mut agent = SequencingAgent::new(AgentConfig {
                        seed: Some(7),
                        ..AgentConfig::default()
                    });
                    let mut env = TourEnvironment::new(generate_orders(5));
                    agent.train(&mut env, episodes, 0.01)
                })
            },
        );
    }
    group.finish();
}

criterion_group!(
    name = value_benchmarks;
    config = Criterion::default();
    targets =
        bench_value_forward,
        bench_value_train_step
);

criterion_group!(
    name = route_benchmarks;
    config = Criterion::default();
    targets =
        bench_heuristic_route,
        bench_learned_route
);

criterion_group!(
    name = training_benchmarks;
    config = Criterion::default();
    targets =
        bench_environment_step,
        bench_training_call
);

criterion_main!(value_benchmarks, route_benchmarks, training_benchmarks);
