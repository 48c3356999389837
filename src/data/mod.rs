pub mod csv;
pub mod dataset;
pub mod formula;

pub use dataset::{Column, ColumnKind, Dataset};
pub use formula::FormulaSpec;
