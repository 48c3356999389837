use crate::activation::activation::Activation;

/// Numerical floor inside log() so a saturated output cannot produce an
/// infinite loss or a division by zero in the gradient.
const EPS: f64 = 1e-12;

/// Selects which loss the training loops use.
///
/// The pairing is fixed by the output activation:
/// - `Mse`: mean-squared error, for a linear output (regression) and for
///   autoencoder reconstruction.
/// - `CrossEntropy`: categorical cross-entropy, for a softmax output.
/// - `BinaryCrossEntropy`: binary cross-entropy, for a sigmoid output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossKind {
    Mse,
    CrossEntropy,
    BinaryCrossEntropy,
}

impl LossKind {
    /// The loss implied by an output-layer activation.
    pub fn for_output(activation: Activation) -> LossKind {
        match activation {
            Activation::Linear => LossKind::Mse,
            Activation::Softmax => LossKind::CrossEntropy,
            Activation::Sigmoid => LossKind::BinaryCrossEntropy,
        }
    }

    /// Scalar loss for one sample: mean over outputs for `Mse` and
    /// `BinaryCrossEntropy`, unnormalized sum for `CrossEntropy`.
    pub fn loss(&self, predicted: &[f64], expected: &[f64]) -> f64 {
        let pairs = predicted.iter().zip(expected.iter());
        match self {
            LossKind::Mse => {
                let sum: f64 = pairs.map(|(p, e)| (p - e) * (p - e)).sum();
                sum / predicted.len() as f64
            }
            LossKind::CrossEntropy => pairs.map(|(p, e)| -e * (p + EPS).ln()).sum(),
            LossKind::BinaryCrossEntropy => {
                let sum: f64 = pairs
                    .map(|(p, y)| y * (p + EPS).ln() + (1.0 - y) * (1.0 - p + EPS).ln())
                    .sum();
                -sum / predicted.len() as f64
            }
        }
    }

    /// Per-output gradient for one sample, in the space the backward pass
    /// expects.
    ///
    /// `Mse` differentiates with respect to the linear outputs;
    /// `CrossEntropy` is the combined softmax+CE gradient with respect to
    /// the pre-softmax logits. Both reduce to `predicted - expected`, and
    /// softmax's own derivative step is identity so the combined gradient
    /// is never double-applied.
    pub fn derivative(&self, predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        predicted
            .iter()
            .zip(expected.iter())
            .map(|(&p, &e)| match self {
                LossKind::Mse | LossKind::CrossEntropy => p - e,
                LossKind::BinaryCrossEntropy => (p - e) / ((p + EPS) * (1.0 - p + EPS)),
            })
            .collect()
    }
}
