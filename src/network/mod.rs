pub mod network;
pub mod schema;

pub use network::{Network, Phase};
pub use schema::{load_yaml, save_yaml, LayerDoc, ModelDoc};
