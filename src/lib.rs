pub mod activation;
pub mod config;
pub mod data;
pub mod error;
pub mod layers;
pub mod loss;
pub mod math;
pub mod network;
pub mod optim;
pub mod train;

// Convenience re-exports
pub use activation::activation::Activation;
pub use config::{ConfigDoc, Hyperparams, NetConfig, TargetKind};
pub use data::{Column, ColumnKind, Dataset, FormulaSpec};
pub use error::{Error, Result};
pub use layers::dense::Layer;
pub use loss::loss_type::LossKind;
pub use math::matrix::Matrix;
pub use network::{load_yaml, save_yaml, ModelDoc, Network, Phase};
pub use optim::sgd::Sgd;
