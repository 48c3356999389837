use crate::{layers::dense::Layer, math::matrix::Matrix};

/// Mini-batch gradient descent with momentum and L2 regularization.
///
/// Per parameter: `v = momentum·v - learning_rate·(g + l2·w)` followed by
/// `w += v`. The L2 term applies to weights only, never to biases.
#[derive(Debug, Clone, Copy)]
pub struct Sgd {
    pub learning_rate: f64,
    pub momentum: f64,
    pub l2: f64,
}

/// Momentum accumulator for one layer, shaped like the layer's parameters.
/// Velocities persist across mini-batches and epochs within a training run
/// and start at zero whenever a fresh run begins.
#[derive(Debug, Clone)]
pub struct Velocity {
    pub weights: Matrix,
    pub bias: Vec<f64>,
}

impl Velocity {
    pub fn zeros_like(layer: &Layer) -> Velocity {
        Velocity {
            weights: Matrix::zeros(layer.outputs, layer.inputs),
            bias: vec![0.0; layer.outputs],
        }
    }
}

impl Sgd {
    pub fn new(learning_rate: f64, momentum: f64, l2: f64) -> Sgd {
        Sgd {
            learning_rate,
            momentum,
            l2,
        }
    }

    /// Applies one update to a layer given its batch-averaged gradients.
    pub fn step(
        &self,
        layer: &mut Layer,
        velocity: &mut Velocity,
        weights_grad: &Matrix,
        bias_grad: &[f64],
    ) {
        for i in 0..layer.weights.rows {
            for j in 0..layer.weights.cols {
                let g = weights_grad.data[i][j] + self.l2 * layer.weights.data[i][j];
                velocity.weights.data[i][j] =
                    self.momentum * velocity.weights.data[i][j] - self.learning_rate * g;
                layer.weights.data[i][j] += velocity.weights.data[i][j];
            }
        }
        for j in 0..layer.bias.len() {
            velocity.bias[j] = self.momentum * velocity.bias[j] - self.learning_rate * bias_grad[j];
            layer.bias[j] += velocity.bias[j];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::Activation;

    fn unit_layer(weight: f64, bias: f64) -> Layer {
        Layer::from_parts(
            Matrix::from_data(vec![vec![weight]]),
            vec![bias],
            Activation::Linear,
        )
    }

    #[test]
    fn step_without_momentum_is_plain_descent() {
        let sgd = Sgd::new(0.1, 0.0, 0.0);
        let mut layer = unit_layer(1.0, 0.5);
        let mut velocity = Velocity::zeros_like(&layer);
        sgd.step(
            &mut layer,
            &mut velocity,
            &Matrix::from_data(vec![vec![2.0]]),
            &[1.0],
        );
        assert!((layer.weights.data[0][0] - 0.8).abs() < 1e-12);
        assert!((layer.bias[0] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn l2_decays_weights_but_not_biases() {
        let sgd = Sgd::new(0.1, 0.0, 0.5);
        let mut layer = unit_layer(2.0, 2.0);
        let mut velocity = Velocity::zeros_like(&layer);
        sgd.step(
            &mut layer,
            &mut velocity,
            &Matrix::from_data(vec![vec![0.0]]),
            &[0.0],
        );
        // Weight: 2.0 - 0.1 * (0 + 0.5 * 2.0) = 1.9; bias untouched.
        assert!((layer.weights.data[0][0] - 1.9).abs() < 1e-12);
        assert_eq!(layer.bias[0], 2.0);
    }

    #[test]
    fn momentum_accumulates_across_steps() {
        let sgd = Sgd::new(0.1, 0.5, 0.0);
        let mut layer = unit_layer(0.0, 0.0);
        let mut velocity = Velocity::zeros_like(&layer);
        let grad = Matrix::from_data(vec![vec![1.0]]);

        sgd.step(&mut layer, &mut velocity, &grad, &[0.0]);
        // v1 = -0.1, w = -0.1
        assert!((layer.weights.data[0][0] + 0.1).abs() < 1e-12);

        sgd.step(&mut layer, &mut velocity, &grad, &[0.0]);
        // v2 = 0.5 * -0.1 - 0.1 = -0.15, w = -0.25
        assert!((velocity.weights.data[0][0] + 0.15).abs() < 1e-12);
        assert!((layer.weights.data[0][0] + 0.25).abs() < 1e-12);
    }
}
