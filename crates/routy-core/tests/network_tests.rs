//! Integration tests for the road network
//! Complements the inline unit tests in src/network.rs

#![allow(clippy::float_cmp)]

use routy_core::network::{DEFAULT_EDGES, DEFAULT_LOCATIONS};
use routy_core::RoadNetwork;

#[test]
fn test_triangle_inequality_on_seed_network() {
    let mut net = RoadNetwork::with_default_network();
    // Uneven traffic so the check is not only over base weights
    net.update_traffic("Köln", "Frankfurt", 0.8);
    net.update_traffic("Berlin", "Leipzig", 0.3);
    net.update_traffic("Frankfurt", "Stuttgart", 1.0);

    for a in DEFAULT_LOCATIONS {
        for b in DEFAULT_LOCATIONS {
            for c in DEFAULT_LOCATIONS {
                let (Some(ab), Some(bc)) = (
                    net.shortest_path_length(a, b),
                    net.shortest_path_length(b, c),
                ) else {
                    continue;
                };
                let ac = net
                    .shortest_path_length(a, c)
                    .expect("a reaches c through b");
                assert!(
                    ac <= ab + bc + 1e-9,
                    "{a}->{c} ({ac}) exceeds {a}->{b}->{c} ({})",
                    ab + bc
                );
            }
        }
    }
}

#[test]
fn test_weight_invariant_after_update_sequences() {
    let mut net = RoadNetwork::with_default_network();
    let factors = [0.0, 0.35, 1.0, 0.1, 0.75];

    for (round, factor) in factors.iter().enumerate() {
        for (i, (start, end, _)) in DEFAULT_EDGES.iter().enumerate() {
            if (i + round) % 2 == 0 {
                net.update_traffic(start, end, *factor);
            }
        }
    }

    // Replay to know the last factor applied to each edge
    let mut last = vec![0.0; DEFAULT_EDGES.len()];
    for (round, factor) in factors.iter().enumerate() {
        for (i, slot) in last.iter_mut().enumerate() {
            if (i + round) % 2 == 0 {
                *slot = *factor;
            }
        }
    }

    for (edge, expected) in net.get_all_edges().iter().zip(last) {
        assert!((edge.weight - edge.base_weight * (1.0 + expected)).abs() < 1e-9);
        assert!((edge.delay_factor - expected).abs() < 1e-9);
    }
}

#[test]
fn test_path_length_matches_sum_of_edge_weights() {
    let mut net = RoadNetwork::with_default_network();
    net.update_traffic("Dortmund", "Köln", 0.5);

    let path = net.shortest_path("Hamburg", "Stuttgart").unwrap();
    let summed: f64 = path
        .windows(2)
        .map(|w| net.edge_weight(&w[0], &w[1]).unwrap())
        .sum();
    assert_eq!(net.shortest_path_length("Hamburg", "Stuttgart"), Some(summed));
    assert_eq!(path.first().map(String::as_str), Some("Hamburg"));
    assert_eq!(path.last().map(String::as_str), Some("Stuttgart"));
}

#[test]
fn test_added_edges_extend_the_seed() {
    let mut net = RoadNetwork::with_default_network();
    assert!(net.shortest_path("Leipzig", "Dresden").is_none());

    net.add_edge("Leipzig", "Dresden", 90.0).unwrap();
    assert_eq!(net.shortest_path_length("Leipzig", "Dresden"), Some(90.0));
    assert_eq!(net.shortest_path_length("Berlin", "Dresden"), Some(210.0));
}

#[test]
fn test_congested_routes_is_subsequence_of_all_edges() {
    let mut net = RoadNetwork::with_default_network();
    net.update_traffic("Berlin", "Hamburg", 0.9);
    net.update_traffic("Köln", "Düsseldorf", 0.5);
    net.update_traffic("München", "Stuttgart", 0.49);

    let all = net.get_all_edges();
    let congested = net.get_congested_routes(0.5);
    assert_eq!(congested.len(), 2);

    let mut cursor = all.iter();
    for edge in &congested {
        assert!(cursor.any(|e| e == edge), "order must follow get_all_edges");
    }
    assert!(net.get_congested_routes(0.0).len() == all.len());
}
