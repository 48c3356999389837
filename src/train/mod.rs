pub mod autoencoder;
pub mod loop_fn;

pub use autoencoder::pretrain_stack;
pub use loop_fn::{accuracy, eval_loss, forward_stack, train_epoch};
