//! One-step temporal-difference learning over the value network

use rand::rngs::StdRng;
use rand::Rng;

use crate::experience::Experience;
use crate::value::ValueNetwork;

/// Epsilon-greedy TD(0) learner. Epsilon and discount stay fixed for the
/// learner's lifetime.
#[derive(Debug, Clone)]
pub struct TdLearner {
    network: ValueNetwork,
    epsilon: f64,
    discount: f64,
    rng: StdRng,
    total_loss: f64,
    updates: u64,
}

impl TdLearner {
    pub fn new(
        inputs: usize,
        hidden: usize,
        outputs: usize,
        epsilon: f64,
        discount: f64,
        mut rng: StdRng,
    ) -> Self {
        let network = ValueNetwork::new(inputs, hidden, outputs, &mut rng);
        Self {
            network,
            epsilon,
            discount,
            rng,
            total_loss: 0.0,
            updates: 0,
        }
    }

    pub fn name(&self) -> &str {
        "dqn"
    }

    pub fn network(&self) -> &ValueNetwork {
        &self.network
    }

    /// `(inputs, outputs)` fixed at construction
    pub fn dimensions(&self) -> (usize, usize) {
        (self.network.input_dim(), self.network.output_dim())
    }

    /// Highest-valued action; ties go to the lowest index
    pub fn greedy_action(&self, features: &[f64]) -> usize {
        let values = self.network.forward(features);
        let mut best = 0;
        for (idx, value) in values.iter().enumerate() {
            if value.total_cmp(&values[best]).is_gt() {
                best = idx;
            }
        }
        best
    }

    /// Epsilon-greedy action selection
    pub fn select_action(&mut self, features: &[f64]) -> usize {
        let n = self.network.output_dim();
        if n > 0 && self.rng.gen::<f64>() < self.epsilon {
            self.rng.gen_range(0..n)
        } else {
            self.greedy_action(features)
        }
    }

    /// Move `Q(s, a)` towards `r + discount * max Q(s')`, leaving the other
    /// actions' targets at their current estimates. Returns the loss.
    pub fn td_update(&mut self, experience: &Experience, learning_rate: f64) -> f64 {
        let next_values = if experience.done {
            Vec::new()
        } else {
            self.network.forward(&experience.next_state)
        };
        let target_value = experience.target(self.discount, &next_values);

        let mut target = self.network.forward(&experience.state);
        if let Some(slot) = target.get_mut(experience.action) {
            *slot = target_value;
        }

        let loss = self
            .network
            .train_step(&experience.state, &target, learning_rate);
        self.total_loss += loss;
        self.updates += 1;
        loss
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Get algorithm parameters as JSON
    pub fn get_params(&self) -> serde_json::Value {
        let shape = self.network.shape();
        serde_json::json!({
            "algorithm": self.name(),
            "epsilon": self.epsilon,
            "discount_factor": self.discount,
            "inputs": shape.inputs,
            "hidden_units": shape.hidden,
            "outputs": shape.outputs,
            "updates": self.updates,
            "average_loss": if self.updates > 0 {
                self.total_loss / self.updates as f64
            } else {
                0.0
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn learner(epsilon: f64) -> TdLearner {
        TdLearner::new(4, 16, 3, epsilon, 0.9, StdRng::seed_from_u64(5))
    }

    #[test]
    fn test_dimensions() {
        assert_eq!(learner(0.1).dimensions(), (4, 3));
        assert_eq!(learner(0.1).name(), "dqn");
    }

    #[test]
    fn test_zero_epsilon_is_greedy() {
        let mut l = learner(0.0);
        let features = [1.0, 2.0, 0.0, 0.5];
        let greedy = l.greedy_action(&features);
        for _ in 0..20 {
            assert_eq!(l.select_action(&features), greedy);
        }
    }

    #[test]
    fn test_full_epsilon_explores() {
        let mut l = learner(1.0);
        let features = [1.0, 2.0, 0.0, 0.5];
        let mut seen = [false; 3];
        for _ in 0..200 {
            seen[l.select_action(&features)] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_td_update_moves_towards_target() {
        let mut l = learner(0.0);
        let state = vec![0.0, 3.0, 0.0, 0.0];
        let exp = Experience::new(state.clone(), 1, 1.0, vec![1.0, 2.0, 1.0, 1.0], true);

        let before = l.network().forward(&state)[1];
        for _ in 0..100 {
            l.td_update(&exp, 0.01);
        }
        let after = l.network().forward(&state)[1];
        assert!((after - 1.0).abs() < (before - 1.0).abs());
        assert_eq!(l.updates(), 100);
    }

    #[test]
    fn test_params() {
        let l = learner(0.2);
        let params = l.get_params();
        assert_eq!(params["algorithm"], "dqn");
        assert_eq!(params["epsilon"], 0.2);
        assert_eq!(params["hidden_units"], 16);
        assert_eq!(params["updates"], 0);
    }
}
