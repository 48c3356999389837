use crate::{activation::activation::Activation, math::matrix::Matrix};
use rand::rngs::StdRng;

/// One fully-connected transformation.
///
/// `weights` has shape `(outputs, inputs)`, one row per output unit; this
/// is the layout the persisted model format stores. The layer holds no
/// forward-pass state: the training loop keeps the per-batch traces it
/// needs for backpropagation.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Matrix,
    pub bias: Vec<f64>,
    pub activation: Activation,
}

impl Layer {
    /// Creates a layer with Xavier-initialized weights and biases drawn
    /// from the same small-magnitude normal.
    pub fn new(outputs: usize, inputs: usize, activation: Activation, rng: &mut StdRng) -> Layer {
        let weights = Matrix::xavier(outputs, inputs, rng);
        let std_dev = (1.0 / inputs as f64).sqrt();
        let bias = (0..outputs)
            .map(|_| Matrix::standard_normal(rng) * std_dev)
            .collect();

        Layer {
            inputs,
            outputs,
            weights,
            bias,
            activation,
        }
    }

    /// Rebuilds a layer from already-validated parts (model loading).
    pub fn from_parts(weights: Matrix, bias: Vec<f64>, activation: Activation) -> Layer {
        Layer {
            inputs: weights.cols,
            outputs: weights.rows,
            weights,
            bias,
            activation,
        }
    }

    /// Batch forward pass over `(batch, inputs)` rows.
    ///
    /// Returns `(z, a)` where `z = X·Wᵀ + b` holds the pre-activations the
    /// backward pass needs for σ'(z), and `a = activation(z)`. Both are
    /// `(batch, outputs)`.
    pub fn forward(&self, input: &Matrix) -> (Matrix, Matrix) {
        let mut z = input.clone() * self.weights.transpose();
        for row in z.data.iter_mut() {
            for (j, value) in row.iter_mut().enumerate() {
                *value += self.bias[j];
            }
        }
        let a = self.activation.apply(&z);
        (z, a)
    }
}
