mod measurement;
mod sink;
mod table;

pub use measurement::Measurement;
pub use sink::{NullSink, ReportSink};
pub use table::{ReportTable, TableFormat};
