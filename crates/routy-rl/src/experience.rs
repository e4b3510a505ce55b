//! One-step transitions used for TD updates

use serde::{Deserialize, Serialize};

use crate::state::Reward;

/// A single experience tuple (s, a, r, s', done) over feature vectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub state: Vec<f64>,
    /// Index into the environment's action list
    pub action: usize,
    pub reward: Reward,
    pub next_state: Vec<f64>,
    pub done: bool,
}

impl Experience {
    pub fn new(
        state: Vec<f64>,
        action: usize,
        reward: Reward,
        next_state: Vec<f64>,
        done: bool,
    ) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            done,
        }
    }

    /// TD target given the value estimates of `next_state`
    pub fn target(&self, discount: f64, next_values: &[f64]) -> f64 {
        if self.done {
            return self.reward;
        }
        let best_next = next_values
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if best_next.is_finite() {
            self.reward + discount * best_next
        } else {
            self.reward
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experience_creation() {
        let exp = Experience::new(vec![0.0; 4], 2, 1.0, vec![1.0; 4], false);
        assert_eq!(exp.reward, 1.0);
        assert_eq!(exp.action, 2);
        assert!(!exp.done);
    }

    #[test]
    fn test_target_bootstraps_from_best_next_value() {
        let exp = Experience::new(vec![], 0, 0.5, vec![], false);
        assert!((exp.target(0.9, &[1.0, 2.0, -3.0]) - 2.3).abs() < 1e-12);
    }

    #[test]
    fn test_terminal_target_is_reward() {
        let exp = Experience::new(vec![], 0, -1.0, vec![], true);
        assert_eq!(exp.target(0.9, &[10.0]), -1.0);
    }

    #[test]
    fn test_target_without_next_values() {
        let exp = Experience::new(vec![], 0, 0.25, vec![], false);
        assert_eq!(exp.target(0.9, &[]), 0.25);
    }
}
