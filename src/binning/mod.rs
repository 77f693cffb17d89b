mod full_binner;
mod log_binner;

pub use full_binner::FullBinner;
pub use log_binner::{LevelSummary, LogBinner};

pub(crate) use log_binner::plateau_error;
