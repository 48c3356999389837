use crate::layers::dense::Layer;
use crate::loss::loss_type::LossKind;
use crate::math::matrix::Matrix;
use crate::optim::sgd::{Sgd, Velocity};

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Runs one full epoch of mini-batch gradient descent over a layer stack
/// and returns the mean loss over all samples.
///
/// Rows are visited in their stored order, first to last, with the final
/// mini-batch simply shorter when the row count is not a multiple of
/// `batch_size`. No shuffling happens here: with identical parameters,
/// data and velocities, two calls produce bitwise-identical results.
///
/// # Arguments
/// - `layers`:     the stack to update, outermost input first
/// - `velocities`: one momentum accumulator per layer, updated in place
/// - `inputs`:     `(rows, layers[0].inputs)` sample matrix
/// - `targets`:    `(rows, last.outputs)` target matrix
/// - `loss`:       loss paired with the stack's output activation
/// - `optimizer`:  carries learning rate, momentum and L2 strength
///
/// # Panics
/// Panics if `inputs` is empty, row counts mismatch, `batch_size == 0`,
/// or `velocities` does not line up with `layers`.
pub fn train_epoch(
    layers: &mut [Layer],
    velocities: &mut [Velocity],
    inputs: &Matrix,
    targets: &Matrix,
    loss: LossKind,
    optimizer: &Sgd,
    batch_size: usize,
) -> f64 {
    assert!(inputs.rows > 0, "inputs must not be empty");
    assert_eq!(
        inputs.rows, targets.rows,
        "inputs and targets must have equal row counts"
    );
    assert!(batch_size > 0, "batch_size must be at least 1");
    assert_eq!(
        layers.len(),
        velocities.len(),
        "one velocity per layer is required"
    );

    let n = inputs.rows;
    let mut total_loss = 0.0;

    for batch_start in (0..n).step_by(batch_size) {
        let batch_end = (batch_start + batch_size).min(n);
        let batch_rows = (batch_end - batch_start) as f64;
        let x = inputs.row_slice(batch_start, batch_end);
        let y = targets.row_slice(batch_start, batch_end);

        // Forward, keeping every pre-activation and activation for backprop.
        // post[i] is the input of layer i; post[layers.len()] is the output.
        let mut pre: Vec<Matrix> = Vec::with_capacity(layers.len());
        let mut post: Vec<Matrix> = Vec::with_capacity(layers.len() + 1);
        post.push(x);
        for (i, layer) in layers.iter().enumerate() {
            let (z, a) = layer.forward(&post[i]);
            pre.push(z);
            post.push(a);
        }

        // Loss and its gradient at the output, one sample per row.
        let output = &post[layers.len()];
        let mut delta_rows = Vec::with_capacity(output.rows);
        for (predicted, expected) in output.data.iter().zip(y.data.iter()) {
            total_loss += loss.loss(predicted, expected);
            delta_rows.push(loss.derivative(predicted, expected));
        }
        let mut delta = Matrix::from_data(delta_rows);

        // Backward pass. `delta` enters each iteration as ∂L/∂a for layer i;
        // the next delta must be computed from the weights before they move.
        for i in (0..layers.len()).rev() {
            let act_derivative = pre[i].map(|z| layers[i].activation.derivative(z));
            let delta_z = delta.hadamard(&act_derivative);

            let w_grad =
                (delta_z.transpose() * post[i].clone()).map(|g| g / batch_rows);
            let b_grad: Vec<f64> = (0..layers[i].outputs)
                .map(|j| delta_z.data.iter().map(|row| row[j]).sum::<f64>() / batch_rows)
                .collect();

            if i > 0 {
                delta = delta_z.clone() * layers[i].weights.clone();
            }

            optimizer.step(&mut layers[i], &mut velocities[i], &w_grad, &b_grad);
        }
    }

    total_loss / n as f64
}

/// Feeds a batch through the whole stack and returns the output activations.
pub fn forward_stack(layers: &[Layer], input: &Matrix) -> Matrix {
    let mut current = input.clone();
    for layer in layers {
        current = layer.forward(&current).1;
    }
    current
}

/// Mean loss over a full dataset without any parameter updates.
pub fn eval_loss(layers: &[Layer], inputs: &Matrix, targets: &Matrix, loss: LossKind) -> f64 {
    if inputs.rows == 0 {
        return 0.0;
    }
    let output = forward_stack(layers, inputs);
    let total: f64 = output
        .data
        .iter()
        .zip(targets.data.iter())
        .map(|(predicted, expected)| loss.loss(predicted, expected))
        .sum();
    total / inputs.rows as f64
}

/// Fraction of samples whose argmax matches the target's argmax.
/// Meaningful for one-hot multiclass targets.
pub fn accuracy(layers: &[Layer], inputs: &Matrix, targets: &Matrix) -> f64 {
    if inputs.rows == 0 {
        return 0.0;
    }
    let output = forward_stack(layers, inputs);
    let correct = output
        .data
        .iter()
        .zip(targets.data.iter())
        .filter(|(predicted, expected)| argmax(predicted) == argmax(expected))
        .count();
    correct as f64 / inputs.rows as f64
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Index of the maximum element in a slice.
fn argmax(v: &[f64]) -> usize {
    v.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
