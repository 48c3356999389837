use crate::math::matrix::Matrix;
use std::f64::consts::E;

/// Activation applied by a layer to its pre-activations.
///
/// The set is closed on purpose: hidden layers are always sigmoid, and the
/// output layer picks the variant matching the target type (linear for
/// regression, sigmoid for binary, softmax for multiclass).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Linear,
    Sigmoid,
    /// Softmax is a vector-valued activation; it is applied row-wise at the
    /// matrix level in `apply()`, never element-wise. The element-wise
    /// `function()` path is therefore unreachable for this variant.
    Softmax,
}

impl Activation {
    /// Element-wise activation. For `Softmax`, call `apply()` which
    /// normalizes a full row; this path should not be reached.
    pub fn function(&self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            Activation::Softmax => {
                // Softmax cannot be applied element-wise; apply() handles it.
                panic!(
                    "Activation::Softmax::function() must not be called directly; \
                     use Activation::apply() which normalizes the full row."
                )
            }
        }
    }

    /// Element-wise derivative of the activation.
    ///
    /// For `Softmax`, the output layer pairs it with categorical
    /// cross-entropy and the combined gradient is `predicted - expected`
    /// (already computed by `LossKind::derivative`). Returning `1.0` here
    /// lets the backward pass carry that delta through unchanged without
    /// double-applying the Jacobian.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            Activation::Linear => 1.0,
            Activation::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            }
            Activation::Softmax => 1.0,
        }
    }

    /// Applies the activation to a whole pre-activation matrix, one sample
    /// per row. Softmax is normalized within each row.
    pub fn apply(&self, z: &Matrix) -> Matrix {
        match self {
            Activation::Softmax => {
                Matrix::from_data(z.data.iter().map(|row| softmax_row(row)).collect())
            }
            _ => z.map(|x| self.function(x)),
        }
    }

    /// Lowercase tag used by the persisted model format.
    pub fn tag(&self) -> &'static str {
        match self {
            Activation::Linear => "linear",
            Activation::Sigmoid => "sigmoid",
            Activation::Softmax => "softmax",
        }
    }

    /// Inverse of [`Activation::tag`]. `None` for unrecognized tags.
    pub fn from_tag(tag: &str) -> Option<Activation> {
        match tag {
            "linear" => Some(Activation::Linear),
            "sigmoid" => Some(Activation::Sigmoid),
            "softmax" => Some(Activation::Softmax),
            _ => None,
        }
    }
}

/// Numerically stable softmax over one row: shifts by the row maximum
/// before exponentiating so large pre-activations cannot overflow.
fn softmax_row(row: &[f64]) -> Vec<f64> {
    let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = row.iter().map(|&v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
