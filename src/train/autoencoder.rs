use rand::rngs::StdRng;
use tracing::debug;

use crate::activation::activation::Activation;
use crate::layers::dense::Layer;
use crate::loss::loss_type::LossKind;
use crate::math::matrix::Matrix;
use crate::optim::sgd::{Sgd, Velocity};
use crate::train::loop_fn::train_epoch;

/// Greedy layer-wise autoencoder pretraining over a layer stack.
///
/// Stage `i` trains a two-layer autoencoder on the activations the already
/// pretrained prefix `layers[..i]` produces from `inputs`: the encoder is
/// `layers[i]` itself and the decoder is a throwaway linear layer mapping
/// back to the stage's input width. The pair minimizes reconstruction MSE
/// (plus whatever L2 the optimizer carries); afterwards the encoder weights
/// are kept and the decoder is dropped.
///
/// The final transition of the stack is never pretrained. It is the
/// supervised output layer, paired with the target loss, and reconstructing
/// its input would pull it away from that objective. A stack of `k` layers
/// therefore runs at most `k - 1` stages; `depth` caps the count further
/// (`None` means all, `Some(0)` disables pretraining entirely).
///
/// Momentum velocities start at zero for every stage. Returns the final
/// reconstruction loss of each stage that ran, in stage order.
pub fn pretrain_stack(
    layers: &mut [Layer],
    inputs: &Matrix,
    depth: Option<usize>,
    epochs: usize,
    optimizer: &Sgd,
    batch_size: usize,
    rng: &mut StdRng,
) -> Vec<f64> {
    let hidden = layers.len().saturating_sub(1);
    let stages = depth.map_or(hidden, |d| d.min(hidden));

    let mut stage_losses = Vec::with_capacity(stages);
    let mut x = inputs.clone();

    for i in 0..stages {
        let decoder = Layer::new(layers[i].inputs, layers[i].outputs, Activation::Linear, rng);
        let mut pair = vec![layers[i].clone(), decoder];
        let mut velocities: Vec<Velocity> = pair.iter().map(Velocity::zeros_like).collect();

        let mut reconstruction = 0.0;
        for _ in 0..epochs {
            reconstruction = train_epoch(
                &mut pair,
                &mut velocities,
                &x,
                &x,
                LossKind::Mse,
                optimizer,
                batch_size,
            );
        }
        debug!(stage = i, reconstruction, "autoencoder stage finished");

        // Keep the encoder, drop the decoder, and move the stage input
        // forward through the freshly pretrained layer.
        layers[i] = pair.swap_remove(0);
        x = layers[i].forward(&x).1;
        stage_losses.push(reconstruction);
    }

    stage_losses
}
