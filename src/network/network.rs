use std::path::{Path, PathBuf};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::activation::activation::Activation;
use crate::config::{Hyperparams, NetConfig};
use crate::data::dataset::Dataset;
use crate::data::formula::{self, FormulaSpec};
use crate::error::{Error, Result};
use crate::layers::dense::Layer;
use crate::loss::loss_type::LossKind;
use crate::math::matrix::Matrix;
use crate::network::schema;
use crate::optim::sgd::{Sgd, Velocity};
use crate::train::autoencoder::pretrain_stack;
use crate::train::loop_fn::{eval_loss, forward_stack, train_epoch};

/// Lifecycle of a network within one run. Training operations are gated on
/// having data bound; everything else is advisory bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    DataBound,
    Pretrained,
    FineTuned,
    /// The model has been written out via [`Network::save`].
    Serialized,
}

/// Matrices extracted from a dataset by [`Network::bind_data`], plus the
/// formula resolution that produced them.
#[derive(Debug)]
struct BoundData {
    spec: FormulaSpec,
    inputs: Matrix,
    targets: Matrix,
}

/// A feed-forward network together with its training state.
///
/// Hidden transitions are always sigmoid; the output transition carries
/// the activation of the configured target kind, which also fixes the
/// training loss. The layer stack is public so callers can inspect (or
/// deliberately corrupt, in tests) the parameters; [`Network::check`]
/// guards against the latter.
#[derive(Debug)]
pub struct Network {
    pub layers: Vec<Layer>,
    hyper: Hyperparams,
    formula: Option<String>,
    bound: Option<BoundData>,
    phase: Phase,
    pretrain_depth: Option<usize>,
    checkpoint: Option<PathBuf>,
    seed: Option<u64>,
}

impl Network {
    /// Builds a freshly initialized network from a validated configuration.
    pub fn new(config: &NetConfig) -> Result<Network> {
        config.validate()?;
        let mut rng = seed_rng(config.seed);
        let transitions = config.structure.len() - 1;
        let mut layers = Vec::with_capacity(transitions);
        for (i, pair) in config.structure.windows(2).enumerate() {
            let activation = if i == transitions - 1 {
                config.target.activation()
            } else {
                Activation::Sigmoid
            };
            layers.push(Layer::new(pair[1], pair[0], activation, &mut rng));
        }
        Ok(Network {
            layers,
            hyper: config.hyper,
            formula: None,
            bound: None,
            phase: Phase::Uninitialized,
            pretrain_depth: config.pretrain_depth,
            checkpoint: None,
            seed: config.seed,
        })
    }

    /// Rebuilds a network from persisted parts. The result has no data
    /// bound and starts from `Phase::Uninitialized`.
    pub(crate) fn from_parts(
        layers: Vec<Layer>,
        hyper: Hyperparams,
        formula: Option<String>,
    ) -> Network {
        Network {
            layers,
            hyper,
            formula,
            bound: None,
            phase: Phase::Uninitialized,
            pretrain_depth: None,
            checkpoint: None,
            seed: None,
        }
    }

    /// Resolves `formula_text` against the dataset, validates the resulting
    /// widths against the outermost layers, and extracts the input and
    /// target matrices. Rebinding replaces any previously bound data and
    /// resets the phase to `DataBound`.
    pub fn bind_data(&mut self, data: &Dataset, formula_text: &str) -> Result<()> {
        let spec = formula::resolve(formula_text, &data.names())?;

        let first = &self.layers[0];
        if first.inputs != spec.inputs.len() {
            return Err(Error::ShapeMismatch {
                context: format!("input layer width vs columns resolved by '{}'", spec.raw),
                expected: first.inputs,
                actual: spec.inputs.len(),
            });
        }
        let last = &self.layers[self.layers.len() - 1];
        if last.outputs != spec.targets.len() {
            return Err(Error::ShapeMismatch {
                context: format!("output layer width vs targets resolved by '{}'", spec.raw),
                expected: last.outputs,
                actual: spec.targets.len(),
            });
        }

        let inputs = data.matrix_of(&spec.inputs)?;
        let targets = data.matrix_of(&spec.targets)?;
        info!(
            rows = inputs.rows,
            inputs = spec.inputs.len(),
            targets = spec.targets.len(),
            "data bound"
        );

        self.formula = Some(spec.raw.clone());
        self.bound = Some(BoundData {
            spec,
            inputs,
            targets,
        });
        self.phase = Phase::DataBound;
        Ok(())
    }

    /// Validates structural invariants: declared layer shapes against their
    /// storage, adjacency between consecutive layers, parameter finiteness,
    /// and agreement with the bound data. Read-only and idempotent; `epoch`
    /// is diagnostic context only.
    pub fn check(&self, epoch: usize) -> Result<()> {
        if self.bound.is_none() {
            return Err(Error::NotReady(
                "check requires bound data; call bind_data first",
            ));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.weights.rows != layer.outputs || layer.weights.cols != layer.inputs {
                return Err(Error::Validation {
                    layer: i,
                    reason: format!(
                        "weight matrix is {}x{}, declared {}x{}",
                        layer.weights.rows, layer.weights.cols, layer.outputs, layer.inputs
                    ),
                });
            }
            if layer.weights.data.len() != layer.weights.rows {
                return Err(Error::Validation {
                    layer: i,
                    reason: format!(
                        "weight storage holds {} rows, header says {}",
                        layer.weights.data.len(),
                        layer.weights.rows
                    ),
                });
            }
            for (r, row) in layer.weights.data.iter().enumerate() {
                if row.len() != layer.weights.cols {
                    return Err(Error::Validation {
                        layer: i,
                        reason: format!(
                            "weight row {} has {} values, header says {}",
                            r,
                            row.len(),
                            layer.weights.cols
                        ),
                    });
                }
                for (c, value) in row.iter().enumerate() {
                    if !value.is_finite() {
                        return Err(Error::Validation {
                            layer: i,
                            reason: format!("non-finite weight at ({}, {})", r, c),
                        });
                    }
                }
            }
            if layer.bias.len() != layer.outputs {
                return Err(Error::Validation {
                    layer: i,
                    reason: format!(
                        "bias length {} does not match {} outputs",
                        layer.bias.len(),
                        layer.outputs
                    ),
                });
            }
            if let Some(j) = layer.bias.iter().position(|b| !b.is_finite()) {
                return Err(Error::Validation {
                    layer: i,
                    reason: format!("non-finite bias at {}", j),
                });
            }
            if i > 0 && self.layers[i - 1].outputs != layer.inputs {
                return Err(Error::Validation {
                    layer: i,
                    reason: format!(
                        "input width {} does not match the previous layer's {} outputs",
                        layer.inputs,
                        self.layers[i - 1].outputs
                    ),
                });
            }
        }
        if let Some(bound) = &self.bound {
            if bound.inputs.cols != self.layers[0].inputs {
                return Err(Error::Validation {
                    layer: 0,
                    reason: format!(
                        "bound inputs have {} columns, the first layer expects {}",
                        bound.inputs.cols, self.layers[0].inputs
                    ),
                });
            }
            let last = self.layers.len() - 1;
            if bound.targets.cols != self.layers[last].outputs {
                return Err(Error::Validation {
                    layer: last,
                    reason: format!(
                        "bound targets have {} columns, the last layer produces {}",
                        bound.targets.cols, self.layers[last].outputs
                    ),
                });
            }
            if bound.inputs.rows != bound.targets.rows {
                return Err(Error::Validation {
                    layer: 0,
                    reason: format!(
                        "{} input rows vs {} target rows",
                        bound.inputs.rows, bound.targets.rows
                    ),
                });
            }
        }
        debug!(epoch, "invariant check passed");
        Ok(())
    }

    /// Greedy layer-wise autoencoder pretraining on the bound inputs.
    ///
    /// Covers every transition except the last, capped by the configured
    /// pretraining depth; see [`pretrain_stack`] for the stage mechanics
    /// and for why the output layer is excluded. Optional: `train` may be
    /// called directly on a data-bound network.
    pub fn pretrain(&mut self, epochs: usize) -> Result<()> {
        let bound = match &self.bound {
            Some(bound) => bound,
            None => {
                return Err(Error::NotReady(
                    "pretrain requires bound data; call bind_data first",
                ))
            }
        };
        self.hyper.validate()?;

        let optimizer = Sgd::new(self.hyper.learning, self.hyper.momentum, self.hyper.regularize);
        let mut rng = seed_rng(self.seed);
        let stage_losses = pretrain_stack(
            &mut self.layers,
            &bound.inputs,
            self.pretrain_depth,
            epochs,
            &optimizer,
            self.hyper.batch,
            &mut rng,
        );
        info!(stages = stage_losses.len(), epochs, "pretraining finished");

        self.phase = Phase::Pretrained;
        Ok(())
    }

    /// Supervised mini-batch fine-tuning of the whole stack on the bound
    /// data. Returns the mean loss of the last completed epoch.
    ///
    /// Momentum velocities start at zero on every call. Invariants are
    /// checked on entry and again at each progress interval, right before
    /// the progress line is logged and the checkpoint (if configured) is
    /// written. A failed checkpoint write is logged and training carries
    /// on; a failed check aborts with the validation error.
    pub fn train(&mut self, epochs: usize, progress_interval: usize) -> Result<f64> {
        let (x, y) = match &self.bound {
            Some(bound) => (&bound.inputs, &bound.targets),
            None => {
                return Err(Error::NotReady(
                    "train requires bound data; call bind_data first",
                ))
            }
        };
        self.hyper.validate()?;
        self.check(0)?;

        let kind = LossKind::for_output(self.output_activation());
        let optimizer = Sgd::new(self.hyper.learning, self.hyper.momentum, self.hyper.regularize);
        let batch = self.hyper.batch;
        let every = progress_interval.max(1);

        let mut velocities: Vec<Velocity> =
            self.layers.iter().map(Velocity::zeros_like).collect();
        let mut last_loss = 0.0;
        let started = Instant::now();

        for epoch in 1..=epochs {
            last_loss = train_epoch(
                &mut self.layers,
                &mut velocities,
                x,
                y,
                kind,
                &optimizer,
                batch,
            );
            if epoch % every == 0 {
                self.check(epoch)?;
                info!(
                    epoch,
                    total = epochs,
                    loss = last_loss,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "fine-tuning progress"
                );
                if let Some(path) = &self.checkpoint {
                    if let Err(err) = schema::save_yaml(self, path) {
                        warn!(%err, path = %path.display(), "checkpoint write failed; training continues");
                    }
                }
            }
        }

        self.phase = Phase::FineTuned;
        Ok(last_loss)
    }

    /// Mean loss of the current parameters on the bound data; no updates.
    pub fn evaluate(&self) -> Result<f64> {
        let bound = self.bound.as_ref().ok_or(Error::NotReady(
            "evaluate requires bound data; call bind_data first",
        ))?;
        Ok(eval_loss(
            &self.layers,
            &bound.inputs,
            &bound.targets,
            LossKind::for_output(self.output_activation()),
        ))
    }

    /// Forward pass over arbitrary rows, one sample per row. Usable in any
    /// phase, including on freshly loaded models.
    pub fn predict(&self, input: &Matrix) -> Result<Matrix> {
        let first = &self.layers[0];
        if input.cols != first.inputs {
            return Err(Error::ShapeMismatch {
                context: "prediction input columns vs input layer width".into(),
                expected: first.inputs,
                actual: input.cols,
            });
        }
        Ok(forward_stack(&self.layers, input))
    }

    /// Writes the model to `path` as a YAML document and moves the phase
    /// to `Serialized`, the end of the lifecycle. The free
    /// [`schema::save_yaml`] writes the same document without touching the
    /// phase; `train` uses it for interval checkpoints.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        schema::save_yaml(self, path)?;
        self.phase = Phase::Serialized;
        Ok(())
    }

    pub fn set_learning(&mut self, learning: f64) {
        self.hyper.learning = learning;
    }

    pub fn set_momentum(&mut self, momentum: f64) {
        self.hyper.momentum = momentum;
    }

    pub fn set_regularizer(&mut self, regularize: f64) {
        self.hyper.regularize = regularize;
    }

    pub fn set_batch_size(&mut self, batch: usize) {
        self.hyper.batch = batch;
    }

    pub fn set_pretrain_depth(&mut self, depth: Option<usize>) {
        self.pretrain_depth = depth;
    }

    /// Registers a path that `train` overwrites with the current model at
    /// every progress interval.
    pub fn set_checkpoint(&mut self, path: PathBuf) {
        self.checkpoint = Some(path);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn hyper(&self) -> Hyperparams {
        self.hyper
    }

    /// The formula this model was bound (or loaded) with, if any.
    pub fn formula(&self) -> Option<&str> {
        self.formula.as_deref()
    }

    /// The resolved column partition of the currently bound data.
    pub fn formula_spec(&self) -> Option<&FormulaSpec> {
        self.bound.as_ref().map(|bound| &bound.spec)
    }

    fn output_activation(&self) -> Activation {
        self.layers[self.layers.len() - 1].activation
    }
}

fn seed_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(value) => StdRng::seed_from_u64(value),
        None => StdRng::from_entropy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetKind;
    use crate::data::dataset::{Column, ColumnKind, Dataset};

    fn toy_table() -> Dataset {
        Dataset::from_columns(vec![
            Column::new("a", ColumnKind::Double, vec![1.0, 2.0, 3.0, 4.0]),
            Column::new("b", ColumnKind::Double, vec![5.0, 6.0, 7.0, 8.0]),
            Column::new("y", ColumnKind::Integer, vec![0.0, 1.0, 0.0, 1.0]),
        ])
        .unwrap()
    }

    fn toy_network() -> Network {
        let mut config = NetConfig::new(vec![2, 3, 1], TargetKind::Binary);
        config.seed = Some(42);
        Network::new(&config).unwrap()
    }

    #[test]
    fn new_networks_have_sigmoid_hidden_layers_and_a_target_output() {
        let net = toy_network();
        assert_eq!(net.layers.len(), 2);
        assert_eq!(net.layers[0].inputs, 2);
        assert_eq!(net.layers[0].outputs, 3);
        assert_eq!(net.layers[0].activation, Activation::Sigmoid);
        assert_eq!(net.layers[1].inputs, 3);
        assert_eq!(net.layers[1].outputs, 1);
        assert_eq!(net.layers[1].activation, Activation::Sigmoid);
        assert_eq!(net.phase(), Phase::Uninitialized);

        let mut config = NetConfig::new(vec![4, 5, 3], TargetKind::Multiclass);
        config.seed = Some(1);
        let multi = Network::new(&config).unwrap();
        assert_eq!(multi.layers[0].activation, Activation::Sigmoid);
        assert_eq!(multi.layers[1].activation, Activation::Softmax);
    }

    #[test]
    fn operations_are_gated_until_data_is_bound() {
        let mut net = toy_network();
        assert!(matches!(net.check(0), Err(Error::NotReady(_))));
        assert!(matches!(net.pretrain(1), Err(Error::NotReady(_))));
        assert!(matches!(net.train(1, 1), Err(Error::NotReady(_))));
        assert!(matches!(net.evaluate(), Err(Error::NotReady(_))));
    }

    #[test]
    fn the_phase_advances_through_the_lifecycle() {
        let mut net = toy_network();
        net.bind_data(&toy_table(), "y ~ *").unwrap();
        assert_eq!(net.phase(), Phase::DataBound);
        assert_eq!(net.formula(), Some("y ~ *"));

        net.pretrain(3).unwrap();
        assert_eq!(net.phase(), Phase::Pretrained);

        net.train(2, 1).unwrap();
        assert_eq!(net.phase(), Phase::FineTuned);
    }

    #[test]
    fn training_works_without_pretraining() {
        let mut net = toy_network();
        net.bind_data(&toy_table(), "y ~ *").unwrap();
        let loss = net.train(2, 1).unwrap();
        assert!(loss.is_finite());
        assert_eq!(net.phase(), Phase::FineTuned);
    }

    #[test]
    fn bind_data_rejects_mismatched_widths() {
        // 3 input columns against an input layer of width 2.
        let wide = Dataset::from_columns(vec![
            Column::new("a", ColumnKind::Double, vec![1.0]),
            Column::new("b", ColumnKind::Double, vec![2.0]),
            Column::new("c", ColumnKind::Double, vec![3.0]),
            Column::new("y", ColumnKind::Integer, vec![1.0]),
        ])
        .unwrap();
        let mut net = toy_network();
        let err = net.bind_data(&wide, "y ~ *").unwrap_err();
        assert!(matches!(
            err,
            Error::ShapeMismatch {
                expected: 2,
                actual: 3,
                ..
            }
        ));
        assert_eq!(net.phase(), Phase::Uninitialized);

        // Two targets against an output layer of width 1, with the input
        // widths still agreeing so the output check is what fires.
        let two_targets = Dataset::from_columns(vec![
            Column::new("a", ColumnKind::Double, vec![1.0]),
            Column::new("b", ColumnKind::Double, vec![2.0]),
            Column::new("y", ColumnKind::Integer, vec![1.0]),
            Column::new("z", ColumnKind::Integer, vec![0.0]),
        ])
        .unwrap();
        let mut net = toy_network();
        let err = net.bind_data(&two_targets, "y + z ~ *").unwrap_err();
        assert!(matches!(
            err,
            Error::ShapeMismatch {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn check_is_idempotent_and_flags_corruption() {
        let mut net = toy_network();
        net.bind_data(&toy_table(), "y ~ *").unwrap();
        assert!(net.check(0).is_ok());
        assert!(net.check(0).is_ok());

        net.layers[1].weights.data[0][2] = f64::NAN;
        for _ in 0..2 {
            match net.check(5) {
                Err(Error::Validation { layer, ref reason }) => {
                    assert_eq!(layer, 1);
                    assert!(reason.contains("non-finite"));
                }
                other => panic!("expected a validation error, got {:?}", other),
            }
        }
    }

    #[test]
    fn evaluate_reports_the_bound_data_loss() {
        let mut net = toy_network();
        net.bind_data(&toy_table(), "y ~ *").unwrap();
        let loss = net.evaluate().unwrap();
        assert!(loss.is_finite() && loss > 0.0);
    }

    #[test]
    fn predict_validates_the_input_width() {
        let net = toy_network();
        let err = net.predict(&Matrix::zeros(1, 3)).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: 2, .. }));
        let out = net.predict(&Matrix::zeros(5, 2)).unwrap();
        assert_eq!(out.rows, 5);
        assert_eq!(out.cols, 1);
    }

    #[test]
    fn setters_update_the_stored_hyperparameters() {
        let mut net = toy_network();
        net.set_learning(0.02);
        net.set_momentum(0.9);
        net.set_regularizer(1e-4);
        net.set_batch_size(4);
        let hyper = net.hyper();
        assert_eq!(hyper.learning, 0.02);
        assert_eq!(hyper.momentum, 0.9);
        assert_eq!(hyper.regularize, 1e-4);
        assert_eq!(hyper.batch, 4);
    }

    #[test]
    fn rebinding_resets_the_phase() {
        let mut net = toy_network();
        net.bind_data(&toy_table(), "y ~ *").unwrap();
        net.train(1, 1).unwrap();
        assert_eq!(net.phase(), Phase::FineTuned);
        net.bind_data(&toy_table(), "y ~ * -a").unwrap_err();
        // A failed rebind leaves the old binding in place.
        assert!(net.evaluate().is_ok());
        net.bind_data(&toy_table(), "y ~ *").unwrap();
        assert_eq!(net.phase(), Phase::DataBound);
    }
}
