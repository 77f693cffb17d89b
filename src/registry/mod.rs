mod named;
mod set;

pub use named::{NamedAccumulator, Summary};
pub use set::AccumulatorSet;
