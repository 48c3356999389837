use thiserror::Error;

/// Errors raised by the training engine.
///
/// Every failure carries enough context to act on: the offending layer
/// index, column name, or formula fragment. The engine never retries and
/// never swallows a failure; mapping kinds to exit codes is the caller's
/// job.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or unsatisfiable column formula.
    #[error("formula error: {0}")]
    Formula(String),

    /// Layer and data dimensionality disagree.
    #[error("shape mismatch ({context}): expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// An invariant check failed (NaN/Inf parameter or broken shape).
    #[error("validation failed at layer {layer}: {reason}")]
    Validation { layer: usize, reason: String },

    /// An operation was invoked out of state-machine order.
    #[error("not ready: {0}")]
    NotReady(&'static str),

    /// A persisted model's metadata disagrees with its payload.
    #[error("corrupt model: {0}")]
    CorruptModel(String),

    /// A persisted model names an activation this engine does not know.
    #[error("unsupported activation tag '{tag}'")]
    UnsupportedActivation { tag: String },

    /// Malformed hyperparameters or network structure.
    #[error("bad configuration: {0}")]
    Config(String),

    /// A column table violated its construction invariants.
    #[error("bad dataset: {0}")]
    Dataset(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
