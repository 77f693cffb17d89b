mod accumulator;
mod full_binning;
mod log_binning;
mod mean;
mod no_binning;

pub use accumulator::{Accumulator, AccumulatorResult};
pub use full_binning::{FullBinningAccumulator, FullBinningResult};
pub use log_binning::{LogBinningAccumulator, LogBinningResult};
pub use mean::{MeanAccumulator, MeanResult};
pub use no_binning::{NoBinningAccumulator, NoBinningResult};
