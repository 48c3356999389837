use crate::activation::activation::Activation;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// What the target columns represent; fixes the output-layer activation
/// (and through it the training loss).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Continuous targets: linear output, mean-squared error.
    Regress,
    /// One-hot class targets: softmax output, categorical cross-entropy.
    Multiclass,
    /// 0/1 targets: sigmoid output, binary cross-entropy.
    Binary,
}

impl TargetKind {
    pub fn activation(self) -> Activation {
        match self {
            TargetKind::Regress => Activation::Linear,
            TargetKind::Multiclass => Activation::Softmax,
            TargetKind::Binary => Activation::Sigmoid,
        }
    }
}

/// Training hyperparameters. Shared by both training phases and persisted
/// with the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparams {
    /// Gradient descent learning rate.
    pub learning: f64,
    /// Momentum coefficient in [0, 1).
    pub momentum: f64,
    /// L2 penalty strength on weights.
    pub regularize: f64,
    /// Mini-batch size.
    pub batch: usize,
}

impl Default for Hyperparams {
    fn default() -> Hyperparams {
        Hyperparams {
            learning: 0.1,
            momentum: 0.5,
            regularize: 1e-5,
            batch: 10,
        }
    }
}

impl Hyperparams {
    pub fn validate(&self) -> Result<()> {
        if !(self.learning.is_finite() && self.learning > 0.0) {
            return Err(Error::Config(format!(
                "learning rate must be positive, got {}",
                self.learning
            )));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(Error::Config(format!(
                "momentum must lie in [0, 1), got {}",
                self.momentum
            )));
        }
        if !(self.regularize.is_finite() && self.regularize >= 0.0) {
            return Err(Error::Config(format!(
                "regularization strength must be non-negative, got {}",
                self.regularize
            )));
        }
        if self.batch == 0 {
            return Err(Error::Config("batch size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Everything needed to build a fresh [`Network`](crate::network::Network).
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Layer widths from input to output, at least two entries.
    pub structure: Vec<usize>,
    pub target: TargetKind,
    pub hyper: Hyperparams,
    /// How many transitions autoencoder pretraining may touch;
    /// `None` means all but the output layer.
    pub pretrain_depth: Option<usize>,
    /// Seed for reproducible initialization; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl NetConfig {
    pub fn new(structure: Vec<usize>, target: TargetKind) -> NetConfig {
        NetConfig {
            structure,
            target,
            hyper: Hyperparams::default(),
            pretrain_depth: None,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.structure.len() < 2 {
            return Err(Error::Config(format!(
                "a network needs at least an input and an output width, got {} entries",
                self.structure.len()
            )));
        }
        if let Some(width) = self.structure.iter().find(|&&w| w == 0) {
            return Err(Error::Config(format!(
                "layer widths must be positive, got {}",
                width
            )));
        }
        self.hyper.validate()
    }
}

/// Optional YAML run configuration. Any field present here overrides the
/// corresponding command-line flag.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigDoc {
    pub formula: Option<String>,
    pub structure: Option<Vec<usize>>,
    pub learning: Option<f64>,
    pub momentum: Option<f64>,
    pub regularize: Option<f64>,
    pub batch: Option<usize>,
    pub epochs: Option<usize>,
}

impl ConfigDoc {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ConfigDoc> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_yaml::from_reader(reader)?)
    }
}
