//! Feed-forward value network
//!
//! `inputs -> hidden -> hidden -> outputs` with ReLU on the hidden layers and
//! a linear output, trained with Adam on mean squared error. Weights are
//! initialized uniformly in `±1/sqrt(fan_in)`.

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;

pub const DEFAULT_HIDDEN_UNITS: usize = 32;

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-8;

#[derive(Debug, Clone)]
struct Dense {
    weights: Array2<f64>,
    bias: Array1<f64>,
    // Adam moments
    m_w: Array2<f64>,
    v_w: Array2<f64>,
    m_b: Array1<f64>,
    v_b: Array1<f64>,
}

impl Dense {
    fn new(inputs: usize, outputs: usize, rng: &mut StdRng) -> Self {
        let bound = 1.0 / (inputs.max(1) as f64).sqrt();
        Self {
            weights: Array2::from_shape_fn((outputs, inputs), |_| rng.gen_range(-bound..bound)),
            bias: Array1::from_shape_fn(outputs, |_| rng.gen_range(-bound..bound)),
            m_w: Array2::zeros((outputs, inputs)),
            v_w: Array2::zeros((outputs, inputs)),
            m_b: Array1::zeros(outputs),
            v_b: Array1::zeros(outputs),
        }
    }

    fn forward(&self, input: &Array1<f64>) -> Array1<f64> {
        self.weights.dot(input) + &self.bias
    }

    fn adam_step(&mut self, grad_w: &Array2<f64>, grad_b: &Array1<f64>, lr: f64, t: i32) {
        let bias1 = 1.0 - ADAM_BETA1.powi(t);
        let bias2 = 1.0 - ADAM_BETA2.powi(t);

        self.m_w = &self.m_w * ADAM_BETA1 + grad_w * (1.0 - ADAM_BETA1);
        self.v_w = &self.v_w * ADAM_BETA2 + &(grad_w * grad_w) * (1.0 - ADAM_BETA2);
        self.m_b = &self.m_b * ADAM_BETA1 + grad_b * (1.0 - ADAM_BETA1);
        self.v_b = &self.v_b * ADAM_BETA2 + &(grad_b * grad_b) * (1.0 - ADAM_BETA2);

        let step_w = (&self.m_w / bias1) / ((&self.v_w / bias2).mapv(f64::sqrt) + ADAM_EPSILON);
        let step_b = (&self.m_b / bias1) / ((&self.v_b / bias2).mapv(f64::sqrt) + ADAM_EPSILON);
        self.weights = &self.weights - &(step_w * lr);
        self.bias = &self.bias - &(step_b * lr);
    }
}

fn relu(x: &Array1<f64>) -> Array1<f64> {
    x.mapv(|v| v.max(0.0))
}

/// Shape summary reported by the agent status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkShape {
    pub inputs: usize,
    pub hidden: usize,
    pub outputs: usize,
}

/// Three-layer perceptron estimating one value per action
#[derive(Debug, Clone)]
pub struct ValueNetwork {
    layers: [Dense; 3],
    shape: NetworkShape,
    steps: i32,
}

impl ValueNetwork {
    pub fn new(inputs: usize, hidden: usize, outputs: usize, rng: &mut StdRng) -> Self {
        Self {
            layers: [
                Dense::new(inputs, hidden, rng),
                Dense::new(hidden, hidden, rng),
                Dense::new(hidden, outputs, rng),
            ],
            shape: NetworkShape {
                inputs,
                hidden,
                outputs,
            },
            steps: 0,
        }
    }

    pub fn shape(&self) -> NetworkShape {
        self.shape
    }

    pub fn input_dim(&self) -> usize {
        self.shape.inputs
    }

    pub fn output_dim(&self) -> usize {
        self.shape.outputs
    }

    /// Number of optimizer steps taken
    pub fn steps(&self) -> u64 {
        u64::try_from(self.steps).unwrap_or_default()
    }

    /// Value estimates for every action
    pub fn forward(&self, input: &[f64]) -> Vec<f64> {
        let x = Array1::from(input.to_vec());
        let h1 = relu(&self.layers[0].forward(&x));
        let h2 = relu(&self.layers[1].forward(&h1));
        self.layers[2].forward(&h2).to_vec()
    }

    /// One Adam step towards `target` under mean squared error. Returns the
    /// loss before the update.
    pub fn train_step(&mut self, input: &[f64], target: &[f64], lr: f64) -> f64 {
        let x = Array1::from(input.to_vec());
        let z1 = self.layers[0].forward(&x);
        let h1 = relu(&z1);
        let z2 = self.layers[1].forward(&h1);
        let h2 = relu(&z2);
        let out = self.layers[2].forward(&h2);

        let target = Array1::from(target.to_vec());
        let diff = &out - &target;
        let n = diff.len().max(1) as f64;
        let loss = diff.mapv(|d| d * d).sum() / n;

        // dL/dout for L = mean((out - target)^2)
        let delta3 = diff * (2.0 / n);
        let delta2 = self.layers[2].weights.t().dot(&delta3) * z2.mapv(relu_grad);
        let delta1 = self.layers[1].weights.t().dot(&delta2) * z1.mapv(relu_grad);

        let grads = [
            (outer(&delta1, &x), delta1),
            (outer(&delta2, &h1), delta2),
            (outer(&delta3, &h2), delta3),
        ];

        self.steps += 1;
        for (layer, (grad_w, grad_b)) in self.layers.iter_mut().zip(grads.iter()) {
            layer.adam_step(grad_w, grad_b, lr, self.steps);
        }

        loss
    }
}

fn relu_grad(z: f64) -> f64 {
    if z > 0.0 {
        1.0
    } else {
        0.0
    }
}

fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    a.view()
        .insert_axis(Axis(1))
        .dot(&b.view().insert_axis(Axis(0)))
}
